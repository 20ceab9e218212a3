/// Dual prices of one relaxed master solve, one block per constraint family.
///
/// Produced immediately before pricing and discarded afterwards; never
/// persisted across rounds.
#[derive(Clone, Debug, Default)]
pub struct DualPrices {
    pub cardinality: f64,
    pub orders: Vec<f64>,
    /// Combined dual of the two volume rows (`>= LB` and `<= UB`).
    pub volume: f64,
    pub items: Vec<f64>,
    /// Per-aisle single-use rows; empty when multiple columns may share an
    /// aisle.
    pub aisles: Vec<f64>,
}

impl DualPrices {
    /// Backends disagree on the dual sign convention for `<=` rows in a
    /// maximization. The master formulation expects nonnegative
    /// order-coverage duals; when a strict majority of the nonzero order
    /// duals comes back negative, the whole vector is flipped. Returns
    /// whether a flip happened so the caller can surface the diagnostic.
    pub fn normalize_signs(&mut self, tolerance: f64) -> bool {
        let negative = self.orders.iter().filter(|d| **d < -tolerance).count();
        let positive = self.orders.iter().filter(|d| **d > tolerance).count();
        if negative <= positive {
            return false;
        }

        self.cardinality = -self.cardinality;
        self.volume = -self.volume;
        for dual in self
            .orders
            .iter_mut()
            .chain(self.items.iter_mut())
            .chain(self.aisles.iter_mut())
        {
            *dual = -*dual;
        }
        true
    }

    pub fn order(&self, o: usize) -> f64 {
        self.orders.get(o).copied().unwrap_or(0.0)
    }

    pub fn item(&self, i: usize) -> f64 {
        self.items.get(i).copied().unwrap_or(0.0)
    }

    pub fn aisle(&self, a: usize) -> f64 {
        self.aisles.get(a).copied().unwrap_or(0.0)
    }
}
