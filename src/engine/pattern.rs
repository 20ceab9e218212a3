use std::fmt::{Debug, Formatter};

use crate::engine::instance::Instance;

/// Fixed-width bitset over order indices.
///
/// Doubles as the dedup key for generated patterns, so it hashes and
/// compares by content.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OrderMask {
    len: usize,
    words: Vec<u64>,
}

impl OrderMask {
    pub fn new(len: usize) -> Self {
        OrderMask {
            len,
            words: vec![0; len.div_ceil(64)],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn set(&mut self, order: usize) {
        debug_assert!(order < self.len);
        self.words[order / 64] |= 1 << (order % 64);
    }

    pub fn contains(&self, order: usize) -> bool {
        order < self.len && self.words[order / 64] & (1 << (order % 64)) != 0
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Iterate the indices of the served orders, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(word_idx, word)| {
            let mut bits = *word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(word_idx * 64 + bit)
            })
        })
    }
}

impl FromIterator<usize> for OrderMask {
    /// Collect order indices; the mask width is sized to the largest index.
    /// Prefer [`OrderMask::new`] + `set` when the order count is known.
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let indices: Vec<usize> = iter.into_iter().collect();
        let len = indices.iter().max().map_or(0, |m| m + 1);
        let mut mask = OrderMask::new(len);
        for o in indices {
            mask.set(o);
        }
        mask
    }
}

impl Debug for OrderMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.ones()).finish()
    }
}

/// One candidate way to serve a subset of orders from a set of aisles.
///
/// Patterns are immutable after creation; a pricing round that wants a
/// different order subset produces a new pattern rather than editing one.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    aisles: Vec<usize>,
    orders: OrderMask,
    units: u64,
}

impl Pattern {
    /// Assemble a pattern, sorting the aisle set and precomputing its total
    /// volume from the instance.
    pub fn new(instance: &Instance, mut aisles: Vec<usize>, orders: OrderMask) -> Self {
        aisles.sort_unstable();
        aisles.dedup();
        debug_assert!(!aisles.is_empty(), "pattern without aisles");
        let units = instance.units_of_mask(&orders);

        #[cfg(feature = "validity_assertions")]
        {
            assert!(instance.mask_fits(&orders, &aisles));
            assert!(units <= instance.ub());
        }

        Pattern {
            aisles,
            orders,
            units,
        }
    }

    pub fn aisles(&self) -> &[usize] {
        &self.aisles
    }

    pub fn orders(&self) -> &OrderMask {
        &self.orders
    }

    pub fn units(&self) -> u64 {
        self.units
    }

    /// Number of aisles the pattern occupies; its coefficient in the
    /// cardinality row of the master problem.
    pub fn aisle_count(&self) -> usize {
        self.aisles.len()
    }

    /// Net per-item coefficient for the aggregated capacity row:
    /// served demand minus combined supply.
    pub fn item_balance(&self, instance: &Instance, item: usize) -> f64 {
        let wanted: u64 = self.orders.ones().map(|o| instance.demand(o, item)).sum();
        let stocked: u64 = self.aisles.iter().map(|&a| instance.supply(a, item)).sum();
        wanted as f64 - stocked as f64
    }
}

impl Debug for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "aisles={:?} orders={:?} units={}",
            self.aisles, self.orders, self.units
        )
    }
}
