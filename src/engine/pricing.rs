use std::time::Duration;

use crate::engine::duals::DualPrices;
use crate::engine::instance::Instance;
use crate::engine::model::{ConstrSense, LpModel, VarType};
use crate::engine::pattern::{OrderMask, Pattern};
use crate::engine::{ExplorerConfig, PricingAisles};
use crate::misc::HashSet;

/// Searches, over the full order and aisle universe, for a column whose
/// reduced cost under the current duals is worth adding to the master.
///
/// One instance lives per explored aisle-count and remembers every pattern
/// it has handed out (and every seed it was told about), so an exact
/// duplicate terminates the search instead of cycling.
pub struct Pricing {
    seen: HashSet<Pattern>,
}

impl Pricing {
    pub fn new() -> Self {
        Pricing {
            seen: HashSet::default(),
        }
    }

    /// Register a pattern that is already in the pool (e.g. a seed) so it
    /// can never be rediscovered.
    pub fn note_seen(&mut self, pattern: &Pattern) {
        self.seen.insert(pattern.clone());
    }

    /// Build and solve the auxiliary model; `None` is the termination
    /// signal (reduced cost below tolerance, solver found nothing in time,
    /// or the optimum duplicates an already-seen pattern).
    ///
    /// `excluded_aisles` are forced out of the search so one master
    /// iteration can collect several distinct improving columns.
    pub fn price<M: LpModel>(
        &mut self,
        instance: &Instance,
        duals: &DualPrices,
        k: usize,
        excluded_aisles: &[usize],
        remaining: Duration,
        config: &ExplorerConfig,
        env: &mut M::Env,
    ) -> Option<Pattern> {
        let mut model = M::new("pricing", env);

        let aisle_target = match config.pricing_aisles {
            PricingAisles::Single => 1.0,
            PricingAisles::ExactlyK => k as f64,
        };
        let aisle_count = model.add_constr("aisle_count", ConstrSense::Equal, aisle_target);

        let item_rows: Vec<M::Constr> = (0..instance.items())
            .map(|i| model.add_constr(&format!("item_{i}"), ConstrSense::Less, 0.0))
            .collect();

        // columns accumulate toward LB in the master, so only UB binds here
        let volume = model.add_constr("volume_ub", ConstrSense::Less, instance.ub() as f64);

        let aisle_vars: Vec<M::Var> = (0..instance.aisles())
            .map(|a| {
                let mut constrs = vec![aisle_count.clone()];
                let mut coeffs = vec![1.0];
                for (i, row) in item_rows.iter().enumerate() {
                    let supply = instance.supply(a, i);
                    if supply > 0 {
                        constrs.push(row.clone());
                        coeffs.push(-(supply as f64));
                    }
                }
                let supply_credit: f64 = (0..instance.items())
                    .map(|i| duals.item(i) * instance.supply(a, i) as f64)
                    .sum();
                let obj = supply_credit - duals.aisle(a) - duals.cardinality;
                let ub = if excluded_aisles.contains(&a) { 0.0 } else { 1.0 };
                model.add_var(&format!("y_{a}"), VarType::Binary, obj, 0.0, ub, &constrs, &coeffs)
            })
            .collect();

        let order_vars: Vec<M::Var> = (0..instance.orders())
            .map(|o| {
                let units = instance.order_units(o) as f64;
                let mut constrs = vec![volume.clone()];
                let mut coeffs = vec![units];
                for (i, row) in item_rows.iter().enumerate() {
                    let demand = instance.demand(o, i);
                    if demand > 0 {
                        constrs.push(row.clone());
                        coeffs.push(demand as f64);
                    }
                }
                let dual_load: f64 = (0..instance.items())
                    .map(|i| duals.item(i) * instance.demand(o, i) as f64)
                    .sum();
                let obj = units * (1.0 - duals.volume) - duals.order(o) - dual_load;
                model.add_var(&format!("z_{o}"), VarType::Binary, obj, 0.0, 1.0, &constrs, &coeffs)
            })
            .collect();

        model.set_time_limit(remaining.as_secs_f64());
        if !model.optimize().has_solution() {
            return None;
        }
        if model.objective() <= config.tolerance {
            // no improving column exists for these duals
            return None;
        }

        let aisles: Vec<usize> = model
            .x_list(&aisle_vars)
            .iter()
            .enumerate()
            .filter(|(_, x)| **x > 0.5)
            .map(|(a, _)| a)
            .collect();
        if aisles.is_empty() {
            return None;
        }

        let mut mask = OrderMask::new(instance.orders());
        for (o, x) in model.x_list(&order_vars).iter().enumerate() {
            if *x > 0.5 {
                mask.set(o);
            }
        }
        if mask.is_empty() {
            return None;
        }

        let pattern = Pattern::new(instance, aisles, mask);
        if !self.seen.insert(pattern.clone()) {
            return None;
        }
        Some(pattern)
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Pricing::new()
    }
}
