use crate::{
    loom::cell::{MutPtr, UnsafeCell},
    spin::Spinlock,
};
use core::{
    fmt,
    ops::{Deref, DerefMut},
};

/// Trait abstracting over raw mutual-exclusion implementations.
///
/// A `RawMutex` guards no data; it only provides the locking protocol that
/// [`Mutex`] builds its RAII layer on.
///
/// # Safety
///
/// Implementations must actually be mutually exclusive: [`lock`] and a
/// `true` return from [`try_lock`] must mean no other context currently
/// holds the mutex, until the matching [`unlock`].
///
/// [`lock`]: RawMutex::lock
/// [`try_lock`]: RawMutex::try_lock
/// [`unlock`]: RawMutex::unlock
pub unsafe trait RawMutex {
    /// Acquires the mutex, blocking the current thread or CPU core until it
    /// is able to do so.
    fn lock(&self);

    /// Attempts to acquire the mutex without blocking. Returns `true` if it
    /// was acquired and `false` otherwise.
    #[must_use]
    fn try_lock(&self) -> bool;

    /// Unlocks the mutex.
    ///
    /// # Safety
    ///
    /// This may only be called if the mutex is held in the current context,
    /// i.e. it must be paired with a successful [`lock`](RawMutex::lock) or
    /// [`try_lock`](RawMutex::try_lock).
    unsafe fn unlock(&self);

    /// Returns `true` if the mutex is currently locked.
    fn is_locked(&self) -> bool;
}

/// Trait for lock types that can be constructed in `const` contexts.
pub trait ConstInit {
    /// A fresh, unlocked instance.
    ///
    /// Each use of this constant produces a distinct value; it exists so
    /// that locks can initialize `static`s.
    ///
    /// # Examples
    ///
    /// ```
    /// use rawspin::{blocking::ConstInit, spin::Spinlock};
    ///
    /// static LOCK: Spinlock = Spinlock::INIT;
    ///
    /// assert!(LOCK.try_lock());
    /// unsafe { LOCK.unlock() };
    /// ```
    const INIT: Self;
}

/// A blocking mutual exclusion lock protecting shared data.
///
/// Each mutex has a type parameter which represents the data that it is
/// protecting. The data can only be accessed through the RAII guards
/// returned from [`lock`] and [`try_lock`], which guarantees that the data
/// is only ever accessed when the mutex is locked.
///
/// The `Lock` type parameter selects the raw locking implementation; by
/// default it is [`Spinlock`], so this is a spinning mutex with the backoff
/// behavior described on that type, and it inherits that type's caveats: it
/// is not fair and not reentrant.
///
/// # Loom-specific behavior
///
/// When `cfg(loom)` is enabled, this mutex uses Loom's simulated atomics and
/// checked `UnsafeCell`.
///
/// [`lock`]: Mutex::lock
/// [`try_lock`]: Mutex::try_lock
pub struct Mutex<T, Lock = Spinlock> {
    lock: Lock,
    data: UnsafeCell<T>,
}

/// An RAII implementation of a "scoped lock" of a mutex. When this structure
/// is dropped (falls out of scope), the lock will be unlocked.
///
/// The data protected by the mutex can be accessed through this guard via
/// its [`Deref`] and [`DerefMut`] implementations.
///
/// This structure is created by the [`lock`] and [`try_lock`] methods on
/// [`Mutex`].
///
/// [`lock`]: Mutex::lock
/// [`try_lock`]: Mutex::try_lock
#[must_use = "if unused, the `Mutex` will immediately unlock"]
pub struct MutexGuard<'a, T, Lock: RawMutex = Spinlock> {
    ptr: MutPtr<T>,
    lock: &'a Lock,
}

// === impl Mutex ===

impl<T> Mutex<T> {
    loom_const_fn! {
        /// Returns a new `Mutex` protecting the provided `data`.
        ///
        /// The returned `Mutex` is in an unlocked state, ready for use.
        ///
        /// # Examples
        ///
        /// ```
        /// use rawspin::blocking::Mutex;
        ///
        /// let mutex = Mutex::new(0);
        /// ```
        #[must_use]
        pub fn new(data: T) -> Self {
            Self {
                lock: Spinlock::new(),
                data: UnsafeCell::new(data),
            }
        }
    }
}

impl<T, Lock> Mutex<T, Lock> {
    loom_const_fn! {
        /// Returns a new `Mutex` protecting `data`, using `lock` as the raw
        /// mutex implementation.
        ///
        /// This constructor overrides the default [`Spinlock`], for example
        /// to use a lock that reports contention:
        ///
        /// ```
        /// use rawspin::{blocking::Mutex, spin::Spinlock, LockId, LockProfiler};
        ///
        /// #[derive(Debug)]
        /// struct Stderr;
        ///
        /// impl LockProfiler for Stderr {
        ///     fn occupied(&self, lock: LockId) {
        ///         eprintln!("lock {lock} is busy");
        ///     }
        /// }
        ///
        /// let mutex = Mutex::with_raw_mutex(0, Spinlock::with_profiler(Stderr));
        /// *mutex.lock() += 1;
        /// ```
        #[must_use]
        pub fn with_raw_mutex(data: T, lock: Lock) -> Self {
            Self {
                lock,
                data: UnsafeCell::new(data),
            }
        }
    }

    /// Consumes this `Mutex`, returning the guarded data.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T, Lock: RawMutex> Mutex<T, Lock> {
    fn guard(&self) -> MutexGuard<'_, T, Lock> {
        MutexGuard {
            ptr: self.data.get_mut(),
            lock: &self.lock,
        }
    }

    /// Attempts to acquire this lock without spinning.
    ///
    /// If the lock could not be acquired at this time, then [`None`] is
    /// returned. Otherwise, an RAII guard is returned. The lock will be
    /// unlocked when the guard is dropped.
    ///
    /// This function will never spin.
    #[must_use]
    #[cfg_attr(test, track_caller)]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T, Lock>> {
        if self.lock.try_lock() {
            Some(self.guard())
        } else {
            None
        }
    }

    /// Acquires the mutex, spinning until it is locked.
    ///
    /// This function will spin until the mutex is available to lock. Upon
    /// returning, the thread is the only thread with the lock held. An RAII
    /// guard is returned to allow scoped unlock of the lock. When the guard
    /// goes out of scope, the mutex will be unlocked.
    #[cfg_attr(test, track_caller)]
    pub fn lock(&self) -> MutexGuard<'_, T, Lock> {
        self.lock.lock();
        self.guard()
    }

    /// Acquires the mutex and runs `f` with exclusive access to the data,
    /// unlocking when `f` returns.
    #[cfg_attr(test, track_caller)]
    pub fn with<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        let mut guard = self.lock();
        f(&mut *guard)
    }

    /// Forcibly unlock the mutex.
    ///
    /// If a lock is currently held, it will be released, regardless of who's
    /// holding it.
    ///
    /// # Safety
    ///
    /// This deliberately violates mutual exclusion.
    ///
    /// Only call this method when it is _guaranteed_ that no stack frame
    /// that has previously locked the mutex will ever continue executing,
    /// such as when every other thread that could hold the lock has already
    /// been torn down.
    pub unsafe fn force_unlock(&self) {
        self.lock.unlock()
    }

    /// Returns a mutable reference to the underlying data.
    ///
    /// Since this call borrows the `Mutex` mutably, no actual locking needs
    /// to take place: the mutable borrow statically guarantees no guards
    /// exist.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.with_mut(|ptr| unsafe {
            // Safety: the mutable borrow of the mutex means no guard can be
            // live, so nothing else can access the data.
            &mut *ptr
        })
    }
}

unsafe impl<T: Send, Lock: Send> Send for Mutex<T, Lock> {}
unsafe impl<T: Send, Lock: Sync> Sync for Mutex<T, Lock> {}

impl<T, Lock: RawMutex + fmt::Debug> fmt::Debug for Mutex<T, Lock> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

// === impl MutexGuard ===

impl<'a, T, Lock: RawMutex> Deref for MutexGuard<'a, T, Lock> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &Self::Target {
        unsafe {
            // Safety: we are holding the lock, so it is okay to dereference
            // the mut pointer.
            &*self.ptr.deref()
        }
    }
}

impl<'a, T, Lock: RawMutex> DerefMut for MutexGuard<'a, T, Lock> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe {
            // Safety: we are holding the lock, so it is okay to dereference
            // the mut pointer.
            self.ptr.deref()
        }
    }
}

impl<'a, T, Lock: RawMutex> Drop for MutexGuard<'a, T, Lock> {
    #[inline]
    fn drop(&mut self) {
        unsafe {
            // Safety: a guard is only constructed after acquiring the lock.
            self.lock.unlock()
        }
    }
}

impl<'a, T: fmt::Debug, Lock: RawMutex> fmt::Debug for MutexGuard<'a, T, Lock> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deref().fmt(f)
    }
}

impl<'a, T: fmt::Display, Lock: RawMutex> fmt::Display for MutexGuard<'a, T, Lock> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deref().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loom::{self, thread};
    use std::prelude::v1::*;
    use std::sync::Arc;

    #[test]
    fn multithreaded() {
        loom::model(|| {
            let mutex = Arc::new(Mutex::new(String::new()));
            let mutex2 = mutex.clone();

            let t1 = thread::spawn(move || {
                test_debug!("t1: locking...");
                let mut lock = mutex2.lock();
                test_debug!("t1: locked");
                lock.push_str("bbbbb");
                test_debug!("t1: dropping...");
            });

            {
                test_debug!("t2: locking...");
                let mut lock = mutex.lock();
                test_debug!("t2: locked");
                lock.push_str("bbbbb");
                test_debug!("t2: dropping...");
            }
            t1.join().unwrap();

            let lock = mutex.lock();
            assert_eq!(lock.len(), 10);
        });
    }

    #[test]
    fn try_lock() {
        loom::model(|| {
            let mutex = Mutex::new(42);
            // First lock succeeds
            let a = mutex.try_lock();
            assert_eq!(a.as_ref().map(|r| **r), Some(42));

            // Additional lock fails
            let b = mutex.try_lock();
            assert!(b.is_none());

            // After dropping lock, it succeeds again
            ::core::mem::drop(a);
            let c = mutex.try_lock();
            assert_eq!(c.as_ref().map(|r| **r), Some(42));
        });
    }

    #[test]
    fn with_unlocks_on_return() {
        loom::model(|| {
            let mutex = Mutex::new(1);
            let doubled = mutex.with(|v| {
                *v *= 2;
                *v
            });
            assert_eq!(doubled, 2);

            let guard = mutex.try_lock();
            assert_eq!(guard.as_ref().map(|g| **g), Some(2));
        });
    }

    #[test]
    #[cfg(not(loom))]
    fn concurrent_increments() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 1_000;

        let _trace = crate::util::test::trace_init();
        let mutex = Arc::new(Mutex::new(0_usize));
        let threads: Vec<_> = (0..THREADS)
            .map(|_| {
                let mutex = mutex.clone();
                std::thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        *mutex.lock() += 1;
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(*mutex.lock(), THREADS * PER_THREAD);
    }

    #[test]
    #[cfg(not(loom))]
    fn const_init_static() {
        static MUTEX: Mutex<usize> = Mutex::with_raw_mutex(0, Spinlock::INIT);

        *MUTEX.lock() += 1;
        assert_eq!(*MUTEX.lock(), 1);
    }

    #[test]
    #[cfg(not(loom))]
    fn get_mut_and_into_inner() {
        let mut mutex = Mutex::new(10);
        *mutex.get_mut() += 1;
        assert_eq!(mutex.into_inner(), 11);
    }
}
