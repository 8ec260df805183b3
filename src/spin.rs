//! The raw test-and-set spinlock.
//!
//! This module provides [`Spinlock`], the primitive the rest of the crate is
//! built on. It guards no data of its own: [`lock`](Spinlock::lock) returns
//! `()` once the flag is held, and releasing is the caller's obligation. Use
//! [`blocking::Mutex`](crate::blocking::Mutex) when the lock should own the
//! data it protects.

use crate::{
    blocking::RawMutex,
    loom::sync::atomic::{AtomicBool, Ordering::*},
    profile::{LockId, LockProfiler, Unprofiled},
    util::Backoff,
};
use core::fmt;

#[cfg(not(loom))]
use crate::blocking::ConstInit;

/// A [test-and-set] spinlock.
///
/// The lock is a single atomic flag. Acquiring it means atomically swapping
/// the flag to `true` and observing that the previous value was `false`;
/// releasing it means storing `false`. While contended,
/// [`lock`](Self::lock) retries the swap under a [`Backoff`]: a pause
/// instruction between attempts, and one cooperative yield after every
/// [`Backoff::SPIN_BUDGET`] consecutive failures so that the holder can run
/// on oversubscribed or single-core systems.
///
/// Contended acquisitions are reported to the lock's [`LockProfiler`] type
/// parameter `P`. The default, [`Unprofiled`], reports nothing and costs
/// nothing; see the [`profile`](crate::profile) module for alternatives.
///
/// # Fairness
///
/// This is *not* a fair lock: waiters acquire in no particular order, and a
/// waiter can starve under adversarial scheduling.
///
/// # Reentrancy
///
/// The lock tracks no owner and is not reentrant. A thread calling
/// [`lock`](Self::lock) while already holding this lock deadlocks against
/// itself, and there is no timeout or cancellation to rescue it. Callers
/// needing bounded waits should poll [`try_lock`](Self::try_lock).
///
/// # Loom-specific behavior
///
/// When `cfg(loom)` is enabled, this lock uses Loom's simulated atomics and
/// treats every backoff step as a model yield point.
///
/// [test-and-set]: https://en.wikipedia.org/wiki/Test-and-set
pub struct Spinlock<P = Unprofiled> {
    locked: AtomicBool,
    profiler: P,
}

// === impl Spinlock ===

impl Spinlock {
    loom_const_fn! {
        /// Returns a new `Spinlock` in the unlocked state, with profiling
        /// disabled.
        ///
        /// # Examples
        ///
        /// ```
        /// use rawspin::spin::Spinlock;
        ///
        /// let lock = Spinlock::new();
        /// assert!(!lock.is_locked());
        /// ```
        #[must_use]
        pub fn new() -> Self {
            Self {
                locked: AtomicBool::new(false),
                profiler: Unprofiled,
            }
        }
    }
}

impl<P: LockProfiler> Spinlock<P> {
    loom_const_fn! {
        /// Returns a new unlocked `Spinlock` that reports contention to
        /// `profiler`.
        ///
        /// # Examples
        ///
        /// ```
        /// use rawspin::{profile::{LockId, LockProfiler}, spin::Spinlock};
        /// use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
        ///
        /// #[derive(Debug, Default)]
        /// struct Counter(AtomicUsize);
        ///
        /// impl LockProfiler for Counter {
        ///     fn occupied(&self, lock: LockId) {
        ///         println!("lock {lock} is busy");
        ///         self.0.fetch_add(1, Relaxed);
        ///     }
        /// }
        ///
        /// let lock = Spinlock::with_profiler(Counter::default());
        /// lock.lock();
        /// assert!(!lock.try_lock()); // reports once
        /// unsafe { lock.unlock() };
        /// ```
        #[must_use]
        pub fn with_profiler(profiler: P) -> Self {
            Self {
                locked: AtomicBool::new(false),
                profiler,
            }
        }
    }

    /// Acquires the lock, spinning until it is held.
    ///
    /// Returns once the calling thread has exclusive ownership of the lock;
    /// there is no timeout, so this can block forever if the current holder
    /// never releases. The acquiring swap has acquire ordering, so all
    /// writes the previous holder made before its
    /// [`unlock`](Self::unlock) are visible after this call returns.
    ///
    /// If the first attempt finds the lock held, one contention event is
    /// reported to the profiler; later retries within the same call are
    /// not reported again.
    #[cfg_attr(test, track_caller)]
    pub fn lock(&self) {
        let mut boff = Backoff::new();
        let mut reported = false;
        while test_dbg!(self.locked.swap(true, Acquire)) {
            if !reported {
                reported = true;
                self.profiler.occupied(self.id());
            }
            boff.spin();
        }
    }

    /// Makes exactly one attempt to acquire the lock, without spinning.
    ///
    /// Returns `true` if the lock was free and is now held by the caller,
    /// `false` if it was already held elsewhere. A `false` result is
    /// reported to the profiler before returning.
    #[must_use]
    #[cfg_attr(test, track_caller)]
    pub fn try_lock(&self) -> bool {
        if test_dbg!(self.locked.swap(true, Acquire)) {
            self.profiler.occupied(self.id());
            false
        } else {
            true
        }
    }

    /// Releases the lock.
    ///
    /// The clearing store has release ordering: everything the holder wrote
    /// inside the critical section is visible to the next acquirer.
    ///
    /// # Safety
    ///
    /// The calling context must hold this lock, via a successful
    /// [`lock`](Self::lock) or [`try_lock`](Self::try_lock). Releasing a
    /// lock held by someone else silently breaks mutual exclusion for
    /// whatever the lock was protecting.
    #[cfg_attr(test, track_caller)]
    pub unsafe fn unlock(&self) {
        test_dbg!(self.locked.store(false, Release));
    }

    /// Returns `true` if the lock is currently held.
    ///
    /// This is a relaxed snapshot for diagnostics: by the time the caller
    /// inspects the result, the lock may have changed state. It must not be
    /// used to elide a [`try_lock`](Self::try_lock).
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Relaxed)
    }

    /// Restores the unlocked state, regardless of who holds the lock.
    ///
    /// This is best-effort cleanup for recycling a lock whose users are
    /// known to be done with it: the store is relaxed and establishes no
    /// synchronization, and no attempt is made to detect a live holder.
    /// Calling it on an already-unlocked lock is a no-op, and it may be
    /// called any number of times.
    pub fn reset(&self) {
        self.locked.store(false, Relaxed);
    }

    /// Returns the identity under which this lock appears in contention
    /// reports.
    #[inline]
    #[must_use]
    pub fn id(&self) -> LockId {
        LockId::of(self)
    }
}

impl<P: LockProfiler + Default> Default for Spinlock<P> {
    fn default() -> Self {
        Self::with_profiler(P::default())
    }
}

impl<P: fmt::Debug> fmt::Debug for Spinlock<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spinlock")
            .field("locked", &self.locked.load(Relaxed))
            .field("profiler", &self.profiler)
            .finish()
    }
}

unsafe impl<P: LockProfiler> RawMutex for Spinlock<P> {
    #[cfg_attr(test, track_caller)]
    fn lock(&self) {
        Spinlock::lock(self)
    }

    #[cfg_attr(test, track_caller)]
    #[inline]
    fn try_lock(&self) -> bool {
        Spinlock::try_lock(self)
    }

    #[cfg_attr(test, track_caller)]
    #[inline]
    unsafe fn unlock(&self) {
        Spinlock::unlock(self)
    }

    #[inline]
    fn is_locked(&self) -> bool {
        Spinlock::is_locked(self)
    }
}

#[cfg(not(loom))]
impl<P: LockProfiler + ConstInit> ConstInit for Spinlock<P> {
    // The whole point of this constant is to create a *new*, unlocked lock
    // every time it is used.
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self {
        locked: AtomicBool::new(false),
        profiler: P::INIT,
    };
}
