use std::time::Instant;

use itertools::Itertools;

use crate::engine::instance::Instance;
use crate::engine::pattern::{OrderMask, Pattern};

/// Seeds the column pool for one aisle-count before any pricing happens.
///
/// Implementations return early with whatever they have once `deadline`
/// passes; a partial (even empty) seed set is a valid result, never an
/// error.
pub trait SeedStrategy {
    fn seed_columns(&self, instance: &Instance, k: usize, deadline: Instant) -> Vec<Pattern>;
}

/// Greedy fill, the seeding rule of the reference heuristic: per aisle,
/// orders are taken in descending volume while they fit the remaining
/// per-item capacity and the wave's upper bound.
pub struct GreedyFill;

impl GreedyFill {
    /// Fill one aisle set greedily. Returns the (possibly empty) served
    /// mask and its volume.
    fn fill(&self, instance: &Instance, aisles: &[usize], by_volume: &[usize]) -> (OrderMask, u64) {
        let mut cap = instance.combined_supply(aisles);
        let mut mask = OrderMask::new(instance.orders());
        let mut total = 0u64;

        'orders: for &o in by_volume {
            let units = instance.order_units(o);
            if total + units > instance.ub() {
                continue;
            }
            for (i, slot) in cap.iter().enumerate() {
                if instance.demand(o, i) > *slot {
                    continue 'orders;
                }
            }
            mask.set(o);
            total += units;
            for (i, slot) in cap.iter_mut().enumerate() {
                *slot -= instance.demand(o, i);
            }
            if total == instance.ub() {
                break;
            }
        }
        (mask, total)
    }

    /// A zero-volume seed is kept only when the aisle genuinely has no
    /// feasible alternative: no single order fits it within the bound.
    fn aisle_serves_nothing(&self, instance: &Instance, aisle: usize) -> bool {
        (0..instance.orders()).all(|o| {
            instance.order_units(o) > instance.ub()
                || (0..instance.items()).any(|i| instance.demand(o, i) > instance.supply(aisle, i))
        })
    }
}

impl SeedStrategy for GreedyFill {
    fn seed_columns(&self, instance: &Instance, k: usize, deadline: Instant) -> Vec<Pattern> {
        let by_volume: Vec<usize> = (0..instance.orders())
            .sorted_by_key(|&o| std::cmp::Reverse(instance.order_units(o)))
            .collect();

        let mut seeds = Vec::new();
        let mut hopeless: Vec<usize> = Vec::new();
        for a in 0..instance.aisles() {
            if Instant::now() >= deadline {
                return seeds;
            }
            let (mask, units) = self.fill(instance, &[a], &by_volume);
            if units > 0 {
                seeds.push(Pattern::new(instance, vec![a], mask));
            } else if self.aisle_serves_nothing(instance, a) {
                hopeless.push(a);
            }
        }

        // zero-volume placeholders only while nonempty seeds fall short of k
        if seeds.len() < k {
            for a in hopeless {
                seeds.push(Pattern::new(
                    instance,
                    vec![a],
                    OrderMask::new(instance.orders()),
                ));
            }
        }

        // Single aisles may all be too narrow; retry with aisle pairs
        // before giving up on nonempty seeds.
        if seeds.iter().all(|p| p.orders().is_empty()) && instance.aisles() >= 2 {
            for pair in (0..instance.aisles()).combinations(2) {
                if Instant::now() >= deadline {
                    break;
                }
                let (mask, units) = self.fill(instance, &pair, &by_volume);
                if units > 0 {
                    seeds.push(Pattern::new(instance, pair, mask));
                }
            }
        }

        seeds
    }
}
