use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use binary_heap_plus::BinaryHeap;
use compare::Compare;

use crate::engine::budget::BudgetAllocator;
use crate::engine::column_pool::{ColumnId, ColumnPool};
use crate::engine::factory::{GreedyFill, SeedStrategy};
use crate::engine::instance::Instance;
use crate::engine::model::{LpEnv, LpModel, SolveStatus};
use crate::engine::pricing::Pricing;
use crate::engine::rmp::{Rmp, RmpMode};
use crate::misc::{FullHashMap, HashMap, IdSet};
use crate::ui::{LpIterationUIState, PricingUIState, UISender, UIUserMessage, UI};

pub mod budget;
pub mod column_pool;
pub mod duals;
pub mod factory;
pub mod instance;
pub mod model;
pub mod pattern;
pub mod pricing;
pub mod rmp;

/// Integer tolerance for activation rounding
pub const INT_FEAS_TOL: f64 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AisleUse {
    /// At most one activated column may occupy any given aisle.
    SingleColumnPerAisle,
    /// Several columns may draw on the same aisle; the aggregated item
    /// rows are the only capacity coupling.
    MultiColumnPerAisle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PricingAisles {
    /// The auxiliary model picks exactly one aisle per column.
    Single,
    /// The auxiliary model picks exactly k aisles per column.
    ExactlyK,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardinalityMode {
    /// Exploratory relaxation may use fewer than k aisles.
    AtMost,
    Exact,
}

#[derive(Clone)]
pub struct ExplorerConfig {
    /// Rolling activation-history length N for eviction.
    pub history_window: usize,
    /// Maximum columns evicted per round; 0 disables eviction.
    pub eviction_cap: usize,
    pub tolerance: f64,
    /// Objective bonus per activated column against LP degeneracy.
    pub tie_break_bonus: f64,
    pub aisle_use: AisleUse,
    pub pricing_aisles: PricingAisles,
    pub relaxed_cardinality: CardinalityMode,
    /// Compare candidates by units per used aisle instead of raw units.
    pub normalize_per_aisle: bool,
    /// Pricing attempts per master iteration; attempts after the first
    /// exclude the aisles already found (diversification).
    pub pricing_rounds: usize,
    pub budget_shares: budget::BudgetShares,
    pub seed: i32,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig {
            history_window: 5,
            eviction_cap: 20,
            tolerance: INT_FEAS_TOL,
            tie_break_bonus: 1e-3,
            aisle_use: AisleUse::SingleColumnPerAisle,
            pricing_aisles: PricingAisles::Single,
            relaxed_cardinality: CardinalityMode::AtMost,
            normalize_per_aisle: true,
            pricing_rounds: 2,
            budget_shares: budget::BudgetShares::default(),
            seed: 0,
        }
    }
}

/// One candidate aisle-count with its ranking score.
#[derive(Clone, Copy, Debug)]
pub struct KCandidate {
    pub k: usize,
    pub score: u64,
}

/// Orders the aisle-counts the explorer should try. Returned unordered;
/// the explorer's priority queue decides the processing order by score.
pub trait KRanking {
    fn rank(&self, instance: &Instance) -> Vec<KCandidate>;
}

/// Rank k by the cumulative capacity of the k highest-capacity aisles.
pub struct CapacityRanking;

impl KRanking for CapacityRanking {
    fn rank(&self, instance: &Instance) -> Vec<KCandidate> {
        let mut capacities: Vec<u64> = (0..instance.aisles())
            .map(|a| instance.aisle_capacity(a))
            .collect();
        capacities.sort_unstable_by(|a, b| b.cmp(a));

        let mut cumulative = 0u64;
        capacities
            .iter()
            .enumerate()
            .map(|(idx, cap)| {
                cumulative += cap;
                KCandidate {
                    k: idx + 1,
                    score: cumulative,
                }
            })
            .collect()
    }
}

// higher score first; smaller k wins ties
#[derive(Clone)]
struct KCandidateOrder;

impl Compare<KCandidate> for KCandidateOrder {
    fn compare(&self, l: &KCandidate, r: &KCandidate) -> std::cmp::Ordering {
        l.score.cmp(&r.score).then(r.k.cmp(&l.k))
    }
}

/// Decides which stale columns leave the pool between generation rounds.
pub trait EvictionPolicy {
    fn evict(&self, pool: &mut ColumnPool, protected: &IdSet<ColumnId>) -> usize;
}

/// Evict columns inactive for a full history window, capped per call so
/// the pool is never starved in one sweep.
pub struct InactiveRun {
    pub cap: usize,
}

impl EvictionPolicy for InactiveRun {
    fn evict(&self, pool: &mut ColumnPool, protected: &IdSet<ColumnId>) -> usize {
        pool.evict_stale(self.cap, protected)
    }
}

/// Diagnostic counters accumulated over one exploration run.
#[derive(Clone, Debug, Default)]
pub struct SearchStats {
    pub lp_solves: u32,
    pub pricing_rounds: u32,
    pub columns_generated: usize,
    pub columns_evicted: usize,
    pub dual_sign_flips: u32,
    pub k_explored: usize,
    pub hit_time_limit: bool,
}

/// The unit of comparison across aisle-counts and across the relaxed and
/// integral phases.
#[derive(Clone, Debug)]
pub struct CandidateResult {
    pub objective: f64,
    pub orders: BTreeSet<usize>,
    pub aisles: BTreeSet<usize>,
    pub stats: SearchStats,
}

impl CandidateResult {
    /// The fallback returned when no feasible wave was found in budget.
    pub fn empty() -> Self {
        CandidateResult {
            objective: 0.0,
            orders: BTreeSet::new(),
            aisles: BTreeSet::new(),
            stats: SearchStats::default(),
        }
    }

    /// Derive a candidate from the rounded support of a solve: columns
    /// activated above 0.5 contribute their orders and aisles. The union
    /// is validated against the wave invariants; a support that violates
    /// them yields no candidate. Also returns the supporting column ids
    /// so the caller can protect them from eviction.
    fn from_support(
        instance: &Instance,
        pool: &ColumnPool,
        activations: &HashMap<ColumnId, f64>,
        normalize_per_aisle: bool,
    ) -> Option<(CandidateResult, Vec<ColumnId>)> {
        let support: Vec<ColumnId> = activations
            .iter()
            .filter(|(_, x)| **x > 0.5)
            .map(|(id, _)| *id)
            .collect();

        let mut orders = BTreeSet::new();
        let mut aisles = BTreeSet::new();
        for id in &support {
            let column = pool.get(*id)?;
            orders.extend(column.pattern.orders().ones());
            aisles.extend(column.pattern.aisles().iter().copied());
        }
        if orders.is_empty() || !instance.selection_feasible(&orders, &aisles) {
            return None;
        }

        let units: u64 = orders.iter().map(|&o| instance.order_units(o)).sum();
        let objective = if normalize_per_aisle {
            units as f64 / aisles.len() as f64
        } else {
            units as f64
        };

        Some((
            CandidateResult {
                objective,
                orders,
                aisles,
                stats: SearchStats::default(),
            },
            support,
        ))
    }
}

/// Anytime aisle-count exploration: runs the column-generation inner loop
/// for candidate k values under per-k sub-budgets, then re-solves the
/// winner integrally with its aisle set fixed.
///
/// Strictly sequential: one column pool per k, one running best, no model
/// mutation beyond append (eviction forces a rebuild).
pub struct Explorer<'a, M: LpModel> {
    instance: &'a Instance,
    config: ExplorerConfig,
    ranking: Box<dyn KRanking>,
    seeder: Box<dyn SeedStrategy>,
    eviction: Box<dyn EvictionPolicy>,
    env: M::Env,
    ui: UISender,
}

impl<'a, M: LpModel> Explorer<'a, M> {
    pub fn new(instance: &'a Instance, config: ExplorerConfig, ui: &UI) -> Self {
        let env = M::Env::with_seed(config.seed);
        let eviction_cap = config.eviction_cap;
        Explorer {
            instance,
            config,
            ranking: Box::new(CapacityRanking),
            seeder: Box::new(GreedyFill),
            eviction: Box::new(InactiveRun { cap: eviction_cap }),
            env,
            ui: ui.get_sender(),
        }
    }

    pub fn with_ranking(mut self, ranking: Box<dyn KRanking>) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_seeder(mut self, seeder: Box<dyn SeedStrategy>) -> Self {
        self.seeder = seeder;
        self
    }

    pub fn with_eviction(mut self, eviction: Box<dyn EvictionPolicy>) -> Self {
        self.eviction = eviction;
        self
    }

    /// Engine entry point: best candidate found within `total_budget`, or
    /// the zero-objective empty fallback.
    pub fn explore(&mut self, total_budget: Duration) -> CandidateResult {
        let budget = BudgetAllocator::new(total_budget, self.config.budget_shares);
        let mut stats = SearchStats::default();

        let ranked = self.ranking.rank(self.instance);
        let slices = budget.k_slices(ranked.len());

        // init phase: one seeded pool per candidate, highest rank first,
        // all charged against the init share of the budget
        let init_deadline = budget.init_deadline();
        let mut by_rank = ranked.clone();
        by_rank.sort_by(|l, r| KCandidateOrder.compare(r, l));
        let mut prepared: FullHashMap<usize, (ColumnPool, Pricing)> = FullHashMap::default();
        for candidate in &by_rank {
            if BudgetAllocator::remaining(init_deadline).is_none() {
                break;
            }
            let mut pool = ColumnPool::new(self.config.history_window);
            let mut pricing = Pricing::new();
            for pattern in self
                .seeder
                .seed_columns(self.instance, candidate.k, init_deadline)
            {
                pricing.note_seen(&pattern);
                pool.add(pattern);
            }
            prepared.insert(candidate.k, (pool, pricing));
        }

        let mut queue = BinaryHeap::from_vec_cmp(ranked, KCandidateOrder);
        self.ui.send(UIUserMessage::StartExplore {
            num_k: queue.len(),
            budget_secs: total_budget.as_secs_f64(),
        });

        let mut best: Option<CandidateResult> = None;
        let mut best_k: Option<usize> = None;
        let mut pools: FullHashMap<usize, ColumnPool> = FullHashMap::default();

        let mut rank_pos = 0usize;
        while let Some(candidate_k) = queue.pop() {
            let Some(remaining) = BudgetAllocator::remaining(budget.explore_deadline()) else {
                stats.hit_time_limit = true;
                self.ui.send(UIUserMessage::TimeLimitReached);
                break;
            };
            let slice = slices[rank_pos].min(remaining);
            rank_pos += 1;

            let k = candidate_k.k;
            let deadline = Instant::now() + slice;
            let seeded = prepared.remove(&k);
            let (pool, found) = self.explore_k(k, slice, deadline, seeded, &mut stats);
            pools.insert(k, pool);
            stats.k_explored += 1;

            if let Some(candidate) = found {
                if best.as_ref().map_or(true, |b| candidate.objective > b.objective) {
                    self.ui.send(UIUserMessage::NewBest {
                        obj: candidate.objective,
                        k,
                    });
                    best = Some(candidate);
                    best_k = Some(k);
                }
            }
        }

        if let (Some(incumbent), Some(source_k)) = (&best, best_k) {
            if let Some(committed) =
                self.commit(incumbent, &pools, source_k, budget.final_deadline(), &mut stats)
            {
                if committed.objective > incumbent.objective {
                    self.ui.send(UIUserMessage::NewBest {
                        obj: committed.objective,
                        k: committed.aisles.len(),
                    });
                    best = Some(committed);
                }
            }
        }

        let mut result = best.unwrap_or_else(CandidateResult::empty);
        result.stats = stats;
        self.ui.send(UIUserMessage::Log(format!(
            "finished with objective {:.3} over {} aisles",
            result.objective,
            result.aisles.len(),
        )));
        self.ui.send(UIUserMessage::ExitUi);
        result
    }

    /// Inner column-generation loop for one aisle-count: seed, then
    /// build/solve the relaxation, record activations, evict, price, and
    /// append until pricing dries up or the sub-budget ends.
    fn explore_k(
        &mut self,
        k: usize,
        slice: Duration,
        deadline: Instant,
        seeded: Option<(ColumnPool, Pricing)>,
        stats: &mut SearchStats,
    ) -> (ColumnPool, Option<CandidateResult>) {
        // the init share may run out before every candidate is seeded; the
        // stragglers seed inside their own slice
        let (mut pool, mut pricing) = match seeded {
            Some(seeded) => seeded,
            None => {
                let mut pool = ColumnPool::new(self.config.history_window);
                let mut pricing = Pricing::new();
                for pattern in self.seeder.seed_columns(self.instance, k, deadline) {
                    pricing.note_seen(&pattern);
                    pool.add(pattern);
                }
                (pool, pricing)
            }
        };
        self.ui.send(UIUserMessage::StartK {
            k,
            budget_secs: slice.as_secs_f64(),
            num_seeds: pool.count(),
        });
        if pool.is_empty() {
            return (pool, None);
        }

        let mut master: Option<Rmp<M>> = None;
        let mut best: Option<CandidateResult> = None;
        let mut protected: IdSet<ColumnId> = IdSet::default();
        let mut iteration = 0u32;

        loop {
            let Some(remaining) = BudgetAllocator::remaining(deadline) else {
                stats.hit_time_limit = true;
                self.ui.send(UIUserMessage::TimeLimitReached);
                break;
            };

            if master.is_none() {
                master = Some(Rmp::build(
                    self.instance,
                    k,
                    &pool,
                    RmpMode::Relaxed,
                    &self.config,
                    &mut self.env,
                ));
            }
            let rmp = master.as_mut().unwrap();

            iteration += 1;
            let lp_start = Instant::now();
            let status = rmp.solve(remaining);
            stats.lp_solves += 1;
            if !status.has_solution() {
                // infeasible for this k (or solver gave up): not an error,
                // just no candidate from here
                self.ui.send(UIUserMessage::LogS("relaxation has no solution"));
                break;
            }

            self.ui.send(UIUserMessage::LpIterationFinish(LpIterationUIState {
                k,
                iteration,
                obj: rmp.objective(),
                num_columns: rmp.num_columns(),
                lp_runtime: lp_start.elapsed().as_secs_f64(),
            }));

            let activations = rmp.activations();
            pool.record_activation(&activations, self.config.tolerance);

            if let Some((candidate, support)) = CandidateResult::from_support(
                self.instance,
                &pool,
                &activations,
                self.config.normalize_per_aisle,
            ) {
                if best.as_ref().map_or(true, |b| candidate.objective > b.objective) {
                    protected = support.into_iter().collect();
                    best = Some(candidate);
                }
            }

            let mut duals = rmp.extract_duals();
            if duals.normalize_signs(self.config.tolerance) {
                stats.dual_sign_flips += 1;
                self.ui.send(UIUserMessage::DualSignFlip { k });
            }

            let evicted = self.eviction.evict(&mut pool, &protected);
            if evicted > 0 {
                stats.columns_evicted += evicted;
                self.ui.send(UIUserMessage::Evicted { k, count: evicted });
                // existing rows reference evicted columns; rebuild next round
                master = None;
            }

            let mut added = false;
            let mut excluded: Vec<usize> = Vec::new();
            for _ in 0..self.config.pricing_rounds.max(1) {
                let Some(remaining) = BudgetAllocator::remaining(deadline) else {
                    stats.hit_time_limit = true;
                    break;
                };
                let price_start = Instant::now();
                let found = pricing.price::<M>(
                    self.instance,
                    &duals,
                    k,
                    &excluded,
                    remaining,
                    &self.config,
                    &mut self.env,
                );
                stats.pricing_rounds += 1;
                self.ui.send(UIUserMessage::PricingFinish(PricingUIState {
                    k,
                    runtime: price_start.elapsed().as_secs_f64(),
                    accepted: found.is_some(),
                }));
                let Some(pattern) = found else { break };

                excluded.extend_from_slice(pattern.aisles());
                if let Some(id) = pool.add(pattern) {
                    stats.columns_generated += 1;
                    added = true;
                    if let (Some(rmp), Some(column)) = (master.as_mut(), pool.get(id)) {
                        rmp.append_column(self.instance, column, &self.config);
                    }
                }
            }

            if !added {
                // pricing returned nothing improving: this k is exhausted
                break;
            }
        }

        (pool, best)
    }

    /// Commit phase: integral re-solve with the winning aisle set fixed
    /// and cardinality exact, over that k's retained columns only.
    fn commit(
        &mut self,
        incumbent: &CandidateResult,
        pools: &FullHashMap<usize, ColumnPool>,
        source_k: usize,
        deadline: Instant,
        stats: &mut SearchStats,
    ) -> Option<CandidateResult> {
        let remaining = BudgetAllocator::remaining(deadline)?;
        let pool = pools.get(&source_k)?;

        let mut commit_pool = ColumnPool::new(self.config.history_window);
        for column in pool.iter() {
            if column
                .pattern
                .aisles()
                .iter()
                .all(|a| incumbent.aisles.contains(a))
            {
                commit_pool.add(column.pattern.clone());
            }
        }
        if commit_pool.is_empty() {
            return None;
        }

        let k = incumbent.aisles.len();
        self.ui.send(UIUserMessage::CommitStart { k });

        // exact cardinality needs disjoint aisle usage regardless of the
        // exploratory setting
        let mut config = self.config.clone();
        config.aisle_use = AisleUse::SingleColumnPerAisle;

        let mut rmp = Rmp::<M>::build(
            self.instance,
            k,
            &commit_pool,
            RmpMode::Integral,
            &config,
            &mut self.env,
        );
        stats.lp_solves += 1;
        let status = rmp.solve(remaining);
        if status == SolveStatus::Infeasible || !status.has_solution() {
            return None;
        }

        let activations = rmp.activations();
        CandidateResult::from_support(
            self.instance,
            &commit_pool,
            &activations,
            self.config.normalize_per_aisle,
        )
        .map(|(candidate, _)| candidate)
    }
}
