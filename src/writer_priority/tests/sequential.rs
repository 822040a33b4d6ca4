//! Tests that don't require threads.
use super::*;
use crate::util::test::trace_init;

#[test]
fn default_is_one() {
    assert_eq!(WriterPriority::default().read(), 1);
}

#[test]
fn write_returns_new_value() {
    let _trace = trace_init();
    let guard = WriterPriority::new(1);
    assert_eq!(guard.write(|x| x * 2), 2);
    assert_eq!(guard.write(|x| x * 2), 4);
    assert_eq!(guard.read(), 4);
    assert_eq!(guard.read_with(|x| x - 1), 3);
}

#[test]
fn enter_write_closes_admission() {
    let _trace = trace_init();
    let guard = WriterPriority::new(1);
    assert!(!guard.is_admission_closed());
    assert_eq!(guard.try_read(), Some(1));

    let mut section = guard.enter_write();
    assert!(guard.is_admission_closed());
    assert_eq!(guard.active_writers(), 1);
    assert_eq!(guard.try_read(), None);

    assert_eq!(section.read(), 1);
    assert_eq!(guard.perform_write(&mut section, |x| x + 10), Ok(11));
    assert_eq!(section.write(|x| x * 2), 22);
    assert_eq!(guard.try_read(), None);

    assert_eq!(guard.exit_write(section), Ok(()));
    assert!(!guard.is_admission_closed());
    assert_eq!(guard.active_writers(), 0);
    assert_eq!(guard.try_read(), Some(22));
}

#[test]
fn readers_are_counted_only_while_reading() {
    let _trace = trace_init();
    let guard = WriterPriority::new(4);

    let active = guard.read_with(|value| {
        assert_eq!(value, 4);
        guard.active_readers()
    });
    assert_eq!(active, 1);
    assert_eq!(guard.active_readers(), 0);

    // Reads nest, since admission is only held while registering.
    let nested = guard.read_with(|outer| guard.read_with(|inner| (outer, inner)));
    assert_eq!(nested, (4, 4));
    assert_eq!(guard.active_readers(), 0);
}

#[test]
fn foreign_section() {
    let _trace = trace_init();
    let a = WriterPriority::new(1);
    let b = WriterPriority::new(2);

    let mut section = b.enter_write();
    assert_eq!(
        a.perform_write(&mut section, |_| unreachable!()),
        Err(ProtocolViolation::ForeignSection)
    );
    assert_eq!(b.perform_write(&mut section, |x| x + 1), Ok(3));

    // `a` never saw a writer.
    assert!(!a.is_admission_closed());
    assert_eq!(a.try_read(), Some(1));

    // Exiting through the wrong guard is reported, but the section is still
    // exited from the guard that issued it.
    assert_eq!(a.exit_write(section), Err(ProtocolViolation::ForeignSection));
    assert_eq!(b.active_writers(), 0);
    assert!(!b.is_admission_closed());
    assert_eq!(b.try_read(), Some(3));
}
