/// A bounded busy-wait backoff for spin loops.
///
/// This is a helper struct for spinning on a contended resource without
/// either monopolizing the processor or paying a scheduler round-trip on
/// every failed attempt. Each call to [`spin`](Self::spin) consumes one unit
/// of a fixed budget of busy attempts ([`Self::SPIN_BUDGET`]), issuing a CPU
/// spin-loop hint. When the budget is exhausted, the next call yields the
/// processor once instead, and the budget is rearmed.
///
/// The effect is that a waiter burns through a short burst of cheap retries
/// first (the expected case for a lock guarding a few instructions), and
/// only escalates to the scheduler when the holder is clearly not about to
/// finish. On single-core or oversubscribed systems the yield is what lets
/// the holder run at all.
///
/// The backoff is deliberately *not* exponential: the burst length is a
/// small constant, matching the microsecond-scale critical sections this
/// crate is intended for.
#[derive(Debug, Copy, Clone)]
pub struct Backoff {
    budget: u8,
}

// === impl Backoff ===

impl Backoff {
    /// The number of consecutive busy-spin attempts made before the
    /// processor is yielded.
    pub const SPIN_BUDGET: u8 = 5;

    /// Returns a new backoff with a full spin budget.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            budget: Self::SPIN_BUDGET,
        }
    }

    /// Backs off once: a spin-loop hint while the budget lasts, a single
    /// cooperative yield (rearming the budget) when it runs out.
    ///
    /// Without the `std` feature there is no scheduler to yield to, so the
    /// escalation step degrades to a longer burst of spin-loop hints.
    #[inline(always)]
    pub fn spin(&mut self) {
        match self.budget.checked_sub(1) {
            Some(remaining) => {
                self.budget = remaining;
                spin_hint();
            }
            None => {
                self.budget = Self::SPIN_BUDGET;
                yield_now();
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
fn spin_hint() {
    #[cfg(not(loom))]
    crate::loom::hint::spin_loop();

    // Loom cannot model a busy-wait; every spin must be a yield point so
    // that the model can schedule the thread holding the lock.
    #[cfg(loom)]
    {
        test_debug!("spin");
        crate::loom::thread::yield_now();
    }
}

#[inline(always)]
fn yield_now() {
    #[cfg(loom)]
    crate::loom::thread::yield_now();

    #[cfg(all(not(loom), feature = "std"))]
    std::thread::yield_now();

    #[cfg(all(not(loom), not(feature = "std")))]
    for _ in 0..32 {
        crate::loom::hint::spin_loop();
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn budget_counts_down_then_rearms() {
        let mut boff = Backoff::new();
        for remaining in (0..Backoff::SPIN_BUDGET).rev() {
            boff.spin();
            assert_eq!(boff.budget, remaining);
        }
        // budget exhausted: the next spin yields and rearms it
        boff.spin();
        assert_eq!(boff.budget, Backoff::SPIN_BUDGET);
    }

    #[test]
    fn default_starts_with_a_full_budget() {
        assert_eq!(Backoff::default().budget, Backoff::SPIN_BUDGET);
    }
}
