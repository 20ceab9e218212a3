use std::time::Duration;

use crate::engine::column_pool::{Column, ColumnId, ColumnPool};
use crate::engine::duals::DualPrices;
use crate::engine::instance::Instance;
use crate::engine::model::{ConstrSense, LpModel, SolveStatus, VarType};
use crate::engine::{AisleUse, CardinalityMode, ExplorerConfig};
use crate::misc::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RmpMode {
    /// Continuous selection variables; duals are meaningful.
    Relaxed,
    /// Binary selection variables with exact cardinality; the commit solve.
    Integral,
}

/// Restricted master problem over the current column pool for one
/// aisle-count.
///
/// Every constraint handle is kept so later columns land into the existing
/// rows through `append_column`; rows are widened, never rewritten. Any
/// pool eviction invalidates the model, which is then rebuilt from scratch
/// (rebuild or append-only, nothing in between).
pub struct Rmp<M: LpModel> {
    model: M,
    mode: RmpMode,
    cardinality: M::Constr,
    orders: Vec<M::Constr>,
    volume_lb: M::Constr,
    volume_ub: M::Constr,
    items: Vec<M::Constr>,
    aisles: Vec<M::Constr>,
    vars: HashMap<ColumnId, M::Var>,
}

impl<M: LpModel> Rmp<M> {
    pub fn build(
        instance: &Instance,
        k: usize,
        pool: &ColumnPool,
        mode: RmpMode,
        config: &ExplorerConfig,
        env: &mut M::Env,
    ) -> Self {
        let mut model = M::new(&format!("rmp_k{k}"), env);

        let cardinality_sense = match (mode, config.relaxed_cardinality) {
            (RmpMode::Integral, _) | (_, CardinalityMode::Exact) => ConstrSense::Equal,
            (RmpMode::Relaxed, CardinalityMode::AtMost) => ConstrSense::Less,
        };
        let cardinality = model.add_constr("cardinality", cardinality_sense, k as f64);

        let orders = (0..instance.orders())
            .map(|o| model.add_constr(&format!("order_{o}"), ConstrSense::Less, 1.0))
            .collect();

        let volume_lb = model.add_constr("volume_lb", ConstrSense::Greater, instance.lb() as f64);
        let volume_ub = model.add_constr("volume_ub", ConstrSense::Less, instance.ub() as f64);

        let items = (0..instance.items())
            .map(|i| model.add_constr(&format!("item_{i}"), ConstrSense::Less, 0.0))
            .collect();

        let aisles = match config.aisle_use {
            AisleUse::SingleColumnPerAisle => (0..instance.aisles())
                .map(|a| model.add_constr(&format!("aisle_{a}"), ConstrSense::Less, 1.0))
                .collect(),
            AisleUse::MultiColumnPerAisle => Vec::new(),
        };

        let mut rmp = Rmp {
            model,
            mode,
            cardinality,
            orders,
            volume_lb,
            volume_ub,
            items,
            aisles,
            vars: HashMap::default(),
        };
        for column in pool.iter() {
            rmp.append_column(instance, column, config);
        }
        rmp
    }

    /// Incrementally add one column: a fresh variable whose coefficients
    /// extend the existing rows.
    pub fn append_column(&mut self, instance: &Instance, column: &Column, config: &ExplorerConfig) {
        let pattern = &column.pattern;

        let mut constrs: Vec<M::Constr> = Vec::new();
        let mut coeffs: Vec<f64> = Vec::new();

        constrs.push(self.cardinality.clone());
        coeffs.push(pattern.aisle_count() as f64);

        for o in pattern.orders().ones() {
            constrs.push(self.orders[o].clone());
            coeffs.push(1.0);
        }

        let units = pattern.units() as f64;
        constrs.push(self.volume_lb.clone());
        coeffs.push(units);
        constrs.push(self.volume_ub.clone());
        coeffs.push(units);

        for (i, item_constr) in self.items.iter().enumerate() {
            let balance = pattern.item_balance(instance, i);
            if balance != 0.0 {
                constrs.push(item_constr.clone());
                coeffs.push(balance);
            }
        }

        if !self.aisles.is_empty() {
            for &a in pattern.aisles() {
                constrs.push(self.aisles[a].clone());
                coeffs.push(1.0);
            }
        }

        let vtype = match self.mode {
            RmpMode::Relaxed => VarType::Continuous,
            RmpMode::Integral => VarType::Binary,
        };
        // small bonus per activated column against degenerate ties
        let obj = units + config.tie_break_bonus;

        let var = self.model.add_var(
            &format!("column_{}", column.id.0),
            vtype,
            obj,
            0.0,
            1.0,
            &constrs,
            &coeffs,
        );
        self.vars.insert(column.id, var);
    }

    pub fn num_columns(&self) -> usize {
        self.vars.len()
    }

    pub fn solve(&mut self, remaining: Duration) -> SolveStatus {
        self.model.set_time_limit(remaining.as_secs_f64());
        self.model.optimize()
    }

    pub fn objective(&self) -> f64 {
        self.model.objective()
    }

    /// Per-column activation values of the incumbent.
    pub fn activations(&self) -> HashMap<ColumnId, f64> {
        let ids: Vec<ColumnId> = self.vars.keys().copied().collect();
        let vars: Vec<M::Var> = ids.iter().map(|id| self.vars[id].clone()).collect();
        ids.into_iter()
            .zip(self.model.x_list(&vars))
            .collect()
    }

    /// Pull the dual blocks of a relaxed solve. The two volume rows are
    /// collapsed into one price since both carry the same column
    /// coefficient.
    pub fn extract_duals(&self) -> DualPrices {
        debug_assert_eq!(self.mode, RmpMode::Relaxed);

        let cardinality = self.model.dual_list(&[self.cardinality.clone()])[0];
        let orders = self.model.dual_list(&self.orders);
        let volume: f64 = self
            .model
            .dual_list(&[self.volume_lb.clone(), self.volume_ub.clone()])
            .iter()
            .sum();
        let items = self.model.dual_list(&self.items);
        let aisles = self.model.dual_list(&self.aisles);

        DualPrices {
            cardinality,
            orders,
            volume,
            items,
            aisles,
        }
    }
}
