#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg, doc_cfg_hide))]
#![cfg_attr(docsrs, doc(cfg_hide(docsrs, loom)))]
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs, missing_debug_implementations, rustdoc::broken_intra_doc_links)]

pub(crate) mod loom;

#[macro_use]
pub mod util;

pub mod blocking;
pub mod profile;
pub mod spin;

#[doc(inline)]
pub use self::blocking::{Mutex, MutexGuard};
#[doc(inline)]
pub use self::profile::{LockId, LockProfiler, Unprofiled};
#[doc(inline)]
pub use self::spin::Spinlock;
