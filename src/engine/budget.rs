use std::time::{Duration, Instant};

/// Fractions of the total wall-clock budget granted to each phase.
/// Must sum to 1.
#[derive(Clone, Copy, Debug)]
pub struct BudgetShares {
    pub init: f64,
    pub explore: f64,
    pub commit: f64,
}

impl Default for BudgetShares {
    fn default() -> Self {
        BudgetShares {
            init: 0.10,
            explore: 0.70,
            commit: 0.20,
        }
    }
}

/// Splits one total wall-clock budget across initialization, the per-k
/// exploration loops, and the final fixed-aisle solve.
///
/// Deadlines are absolute instants; callers pass the shrinking remaining
/// time into every solver call so a single slow solve can overrun the
/// budget by at most one call.
pub struct BudgetAllocator {
    start: Instant,
    total: Duration,
    shares: BudgetShares,
}

impl BudgetAllocator {
    pub fn new(total: Duration, shares: BudgetShares) -> Self {
        debug_assert!((shares.init + shares.explore + shares.commit - 1.0).abs() < 1e-9);
        BudgetAllocator {
            start: Instant::now(),
            total,
            shares,
        }
    }

    pub fn init_deadline(&self) -> Instant {
        self.start + self.total.mul_f64(self.shares.init)
    }

    pub fn explore_deadline(&self) -> Instant {
        self.start + self.total.mul_f64(self.shares.init + self.shares.explore)
    }

    pub fn final_deadline(&self) -> Instant {
        self.start + self.total
    }

    /// Per-k sub-budgets over the exploration share, weighted `1/rank` and
    /// normalized: the first-ranked k gets the largest slice.
    pub fn k_slices(&self, num_k: usize) -> Vec<Duration> {
        if num_k == 0 {
            return Vec::new();
        }
        let weights: Vec<f64> = (1..=num_k).map(|rank| 1.0 / rank as f64).collect();
        let norm: f64 = weights.iter().sum();
        let explore = self.total.mul_f64(self.shares.explore);
        weights
            .into_iter()
            .map(|w| explore.mul_f64(w / norm))
            .collect()
    }

    /// Time left until `deadline`, or `None` once it has passed.
    pub fn remaining(deadline: Instant) -> Option<Duration> {
        let now = Instant::now();
        if now >= deadline {
            None
        } else {
            Some(deadline - now)
        }
    }
}
