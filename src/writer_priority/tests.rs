use super::*;
use crate::util::test::assert_send_sync;

mod loom;

#[cfg(not(loom))]
mod sequential;


#[test]
fn guard_is_send_sync() {
    assert_send_sync::<WriterPriority>();
}

#[test]
fn write_section_is_send_sync() {
    assert_send_sync::<WriteSection<'_>>();
}
