#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg, doc_cfg_hide))]
#![cfg_attr(docsrs, doc(cfg_hide(docsrs, loom)))]
#![warn(missing_docs, missing_debug_implementations)]

pub(crate) mod loom;

#[macro_use]
pub mod util;

pub mod blocking;
pub mod cell;
pub mod error;
pub mod guard;
pub mod reader_priority;
pub mod spin;
pub mod task;
pub mod writer_priority;

#[doc(inline)]
pub use self::cell::{SharedCell, Value};
#[doc(inline)]
pub use self::error::ProtocolViolation;
#[doc(inline)]
pub use self::guard::{Guard, Policy};
#[doc(inline)]
pub use self::reader_priority::{ReadSection, ReaderPriority};
#[doc(inline)]
pub use self::task::{Event, EventLog, Role, Task};
#[doc(inline)]
pub use self::writer_priority::{WriteSection, WriterPriority};
