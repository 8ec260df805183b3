//! Blocking mutual exclusion built on the raw spinlock.
//!
//! The [`spin`](crate::spin) module provides the raw locking primitive; this
//! module provides the shape most callers actually want: a [`Mutex`] that
//! owns the data it protects and hands out RAII [`MutexGuard`]s, so that the
//! unlock can never be forgotten or mismatched.
//!
//! [`Mutex`] is generic over a [`RawMutex`] implementation, defaulting to
//! [`Spinlock`](crate::spin::Spinlock). Other lock implementations (a
//! profiled spinlock, or something else entirely) slot in through the same
//! trait.

mod mutex;

pub use self::mutex::{ConstInit, Mutex, MutexGuard, RawMutex};
