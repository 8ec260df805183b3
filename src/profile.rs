//! Contention profiling for spinlocks.
//!
//! A lock is *contended* when an acquisition attempt finds it already held.
//! A [`Spinlock`](crate::spin::Spinlock) reports those events to the
//! [`LockProfiler`] it was constructed with, tagged with a [`LockId`] naming
//! the lock. The profiler is an injected capability, not an ambient
//! singleton: the lock type is generic over it, so an unprofiled lock
//! ([`Unprofiled`], the default) carries no state and makes no calls.
//!
//! Reporting is fire-and-forget. This module only emits events; aggregating
//! them (per-lock counts, hot-lock ranking) belongs to whatever consumes
//! the reports, such as a [`tracing`] subscriber when using
//! `TraceProfiler`.
//!
//! [`tracing`]: https://docs.rs/tracing

use core::fmt;

#[cfg(not(loom))]
use crate::blocking::ConstInit;

/// Receives contention reports from locks configured with this profiler.
///
/// Implementations should be cheap and must not attempt to acquire the lock
/// they are reporting on.
pub trait LockProfiler {
    /// Reports that an acquisition attempt found `lock` held elsewhere.
    ///
    /// A spinning [`lock`](crate::spin::Spinlock::lock) call reports at most
    /// once, when it first observes contention; a failed
    /// [`try_lock`](crate::spin::Spinlock::try_lock) reports on every call.
    fn occupied(&self, lock: LockId);
}

/// A [`LockProfiler`] that records nothing.
///
/// This is the default profiler. It is zero-sized and its
/// [`occupied`](LockProfiler::occupied) is an empty inline function, so a
/// `Spinlock<Unprofiled>` compiles to exactly the same code as a lock with
/// no profiling support at all.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Unprofiled;

/// A [`LockProfiler`] that forwards contention events to [`tracing`].
///
/// Events are emitted at trace level under the `rawspin::contention`
/// target, carrying the reported [`LockId`].
#[cfg(feature = "tracing")]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TraceProfiler;

/// The identity of a lock in contention reports.
///
/// Derived from the lock's address: stable for the lock's lifetime, unique
/// among locks that are alive at the same time, and meaningless once the
/// lock has been dropped.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct LockId(usize);

// === impl LockProfiler ===

impl<'a, P: LockProfiler> LockProfiler for &'a P {
    #[inline]
    fn occupied(&self, lock: LockId) {
        (**self).occupied(lock)
    }
}

// === impl Unprofiled ===

impl LockProfiler for Unprofiled {
    #[inline(always)]
    fn occupied(&self, _: LockId) {}
}

#[cfg(not(loom))]
impl ConstInit for Unprofiled {
    const INIT: Self = Self;
}

// === impl TraceProfiler ===

#[cfg(feature = "tracing")]
impl LockProfiler for TraceProfiler {
    #[inline]
    fn occupied(&self, lock: LockId) {
        tracing::trace!(target: "rawspin::contention", lock = %lock, "occupied");
    }
}

#[cfg(all(feature = "tracing", not(loom)))]
impl ConstInit for TraceProfiler {
    const INIT: Self = Self;
}

// === impl LockId ===

impl LockId {
    pub(crate) fn of<T>(lock: &T) -> Self {
        Self(lock as *const T as usize)
    }
}

impl fmt::Debug for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockId({:#x})", self.0)
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::spin::Spinlock;

    #[test]
    fn lock_id_is_the_lock_address() {
        let lock = Spinlock::new();
        let id = lock.id();
        assert_eq!(format!("{id}"), format!("{:#x}", &lock as *const _ as usize));
        assert_eq!(format!("{id:?}"), format!("LockId({:#x})", &lock as *const _ as usize));
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn trace_profiler_reports_contention() {
        let _trace = crate::util::test::trace_init();
        let lock = Spinlock::with_profiler(TraceProfiler);
        lock.lock();
        assert!(!lock.try_lock());
        unsafe { lock.unlock() };
        assert!(lock.try_lock());
        unsafe { lock.unlock() };
    }
}
