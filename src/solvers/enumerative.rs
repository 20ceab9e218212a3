use std::time::{Duration, Instant};

use crate::engine::model::{ConstrSense, LpEnv, LpModel, SolveStatus, VarType};

const FEAS_TOL: f64 = 1e-6;
/// Upper bound on two-valued variables swept exhaustively; larger models
/// get a partial sweep over a prefix of the lattice.
const MAX_FREE_VARS: usize = 24;

/// Backend without an external solver: exhaustively evaluates the {0, 1}
/// lattice of the model's variables. Exact for the integral models this
/// engine builds and for relaxations whose optimum happens to be integral;
/// it reports zero duals, so generation on top of it degrades to
/// volume-driven pricing. Models beyond [`MAX_FREE_VARS`] free variables
/// are swept partially (remaining variables pinned to zero) and reported
/// as `Feasible`/`TimedOut`, never `Optimal`. Intended for small instances
/// and tests.
pub struct EnumerativeEnv {
    _seed: i32,
}

impl LpEnv for EnumerativeEnv {
    fn with_seed(seed: i32) -> Self {
        EnumerativeEnv { _seed: seed }
    }
}

struct VarData {
    obj: f64,
    lb: f64,
    ub: f64,
}

struct RowData {
    sense: ConstrSense,
    rhs: f64,
    terms: Vec<(usize, f64)>,
}

#[derive(Clone, Copy, Debug)]
pub struct EnumVar(usize);

#[derive(Clone, Copy, Debug)]
pub struct EnumConstr(usize);

pub struct EnumerativeModel {
    vars: Vec<VarData>,
    rows: Vec<RowData>,
    time_limit: Option<f64>,
    incumbent: Option<(f64, Vec<f64>)>,
}

impl EnumerativeModel {
    fn row_ok(row: &RowData, x: &[f64]) -> bool {
        let lhs: f64 = row.terms.iter().map(|&(v, c)| c * x[v]).sum();
        match row.sense {
            ConstrSense::Less => lhs <= row.rhs + FEAS_TOL,
            ConstrSense::Greater => lhs >= row.rhs - FEAS_TOL,
            ConstrSense::Equal => (lhs - row.rhs).abs() <= FEAS_TOL,
        }
    }
}

impl LpModel for EnumerativeModel {
    type Env = EnumerativeEnv;
    type Var = EnumVar;
    type Constr = EnumConstr;

    fn new(_name: &str, _env: &mut Self::Env) -> Self {
        EnumerativeModel {
            vars: Vec::new(),
            rows: Vec::new(),
            time_limit: None,
            incumbent: None,
        }
    }

    fn add_constr(&mut self, _name: &str, sense: ConstrSense, rhs: f64) -> Self::Constr {
        self.rows.push(RowData {
            sense,
            rhs,
            terms: Vec::new(),
        });
        EnumConstr(self.rows.len() - 1)
    }

    fn add_var(
        &mut self,
        _name: &str,
        _vtype: VarType,
        obj: f64,
        lb: f64,
        ub: f64,
        constrs: &[Self::Constr],
        coeffs: &[f64],
    ) -> Self::Var {
        let idx = self.vars.len();
        self.vars.push(VarData { obj, lb, ub });
        for (constr, &coeff) in constrs.iter().zip(coeffs) {
            if coeff != 0.0 {
                self.rows[constr.0].terms.push((idx, coeff));
            }
        }
        // adding a variable invalidates the incumbent
        self.incumbent = None;
        EnumVar(idx)
    }

    fn set_time_limit(&mut self, seconds: f64) {
        self.time_limit = Some(seconds);
    }

    fn optimize(&mut self) -> SolveStatus {
        self.incumbent = None;
        let deadline = self
            .time_limit
            .map(|s| Instant::now() + Duration::from_secs_f64(s.max(0.0)));

        // per-variable lattice points admitted by the bounds
        let mut fixed = vec![0.0; self.vars.len()];
        let mut free: Vec<usize> = Vec::new();
        for (idx, var) in self.vars.iter().enumerate() {
            let zero_ok = var.lb <= FEAS_TOL;
            let one_ok = var.ub >= 1.0 - FEAS_TOL;
            match (zero_ok, one_ok) {
                (true, true) => free.push(idx),
                (true, false) => fixed[idx] = 0.0,
                (false, true) => fixed[idx] = 1.0,
                (false, false) => return SolveStatus::Infeasible,
            }
        }
        // oversized lattice: sweep a prefix, the tail stays pinned to zero
        let truncated = free.len() > MAX_FREE_VARS;
        if truncated {
            free.truncate(MAX_FREE_VARS);
        }

        let mut timed_out = false;
        let combinations = 1u64 << free.len();
        for assignment in 0..combinations {
            if assignment % 1024 == 0 {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        timed_out = true;
                        break;
                    }
                }
            }

            let mut x = fixed.clone();
            for (bit, &idx) in free.iter().enumerate() {
                x[idx] = ((assignment >> bit) & 1) as f64;
            }
            if !self.rows.iter().all(|row| Self::row_ok(row, &x)) {
                continue;
            }

            let obj: f64 = self
                .vars
                .iter()
                .zip(&x)
                .map(|(var, &value)| var.obj * value)
                .sum();
            if self
                .incumbent
                .as_ref()
                .map_or(true, |(best, _)| obj > *best)
            {
                self.incumbent = Some((obj, x));
            }
        }

        match (&self.incumbent, timed_out || truncated) {
            (Some(_), false) => SolveStatus::Optimal,
            (Some(_), true) => SolveStatus::Feasible,
            (None, false) => SolveStatus::Infeasible,
            (None, true) => SolveStatus::TimedOut,
        }
    }

    fn x_list(&self, vars: &[Self::Var]) -> Vec<f64> {
        let (_, x) = self
            .incumbent
            .as_ref()
            .expect("x_list called without a solution");
        vars.iter().map(|var| x[var.0]).collect()
    }

    fn dual_list(&self, constrs: &[Self::Constr]) -> Vec<f64> {
        vec![0.0; constrs.len()]
    }

    fn objective(&self) -> f64 {
        self.incumbent
            .as_ref()
            .expect("objective called without a solution")
            .0
    }
}
