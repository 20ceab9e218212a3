/// Factory used for LP models
pub trait LpEnv: Sized {
    fn with_seed(seed: i32) -> Self;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstrSense {
    Less,
    Greater,
    Equal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarType {
    Binary,
    Continuous,
}

/// Outcome of one solver call, as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    /// Stopped before proving optimality but holding an incumbent.
    Feasible,
    Infeasible,
    /// Stopped on its internal time limit without any incumbent.
    TimedOut,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// Trait for a maximizing linear programming model.
///
/// The engine never edits an existing constraint in place: rows are created
/// up front with `add_constr` and widened later by `add_var`, whose
/// coefficient list lands the new column into already existing rows. This
/// append-only contract is what lets the master problem grow incrementally
/// across generation rounds.
///
/// Panics on backend errors.
pub trait LpModel: Sized {
    type Env: LpEnv;
    type Var: Clone;
    type Constr: Clone;

    fn new(name: &str, env: &mut Self::Env) -> Self;

    /// Add an empty constraint row `0 <sense> rhs`; coefficients arrive with
    /// later variables.
    fn add_constr(&mut self, name: &str, sense: ConstrSense, rhs: f64) -> Self::Constr;

    /// Add a variable with objective coefficient `obj`, bounds `[lb, ub]`,
    /// and the given coefficients in the given constraints.
    #[allow(clippy::too_many_arguments)]
    fn add_var(
        &mut self,
        name: &str,
        vtype: VarType,
        obj: f64,
        lb: f64,
        ub: f64,
        constrs: &[Self::Constr],
        coeffs: &[f64],
    ) -> Self::Var;

    /// Internal time limit for the next `optimize` call, in seconds.
    fn set_time_limit(&mut self, seconds: f64);

    /// Run optimization.
    fn optimize(&mut self) -> SolveStatus;

    /// Return solution coefficients for the list of variables.
    fn x_list(&self, vars: &[Self::Var]) -> Vec<f64>;

    /// Return dual values for the list of constraints (relaxed solves only;
    /// a backend without duals reports zeros).
    fn dual_list(&self, constrs: &[Self::Constr]) -> Vec<f64>;

    /// Objective value of the incumbent.
    fn objective(&self) -> f64;
}
