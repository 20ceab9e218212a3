// Scenarios based on the SBPO wave order picking challenge instances

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use wave_colgen::budget::{BudgetAllocator, BudgetShares};
    use wave_colgen::column_pool::{ColumnId, ColumnPool};
    use wave_colgen::duals::DualPrices;
    use wave_colgen::factory::{GreedyFill, SeedStrategy};
    use wave_colgen::instance::{Instance, ParseError};
    use wave_colgen::misc::{HashMap, IdSet};
    use wave_colgen::model::LpEnv;
    use wave_colgen::pattern::{OrderMask, Pattern};
    use wave_colgen::pricing::Pricing;
    use wave_colgen::rmp::{Rmp, RmpMode};
    use wave_colgen::solvers::{EnumerativeEnv, EnumerativeModel};
    use wave_colgen::{
        CapacityRanking, Explorer, ExplorerConfig, KRanking, UI,
    };

    /// Two aisles, three orders, two items. Aisle 0 alone can serve orders
    /// 0 and 1 for 5 units; nothing better exists.
    fn small_instance() -> Instance {
        Instance::new(
            vec![vec![2, 0], vec![0, 3], vec![1, 1]],
            vec![vec![3, 3], vec![0, 3]],
            1,
            10,
        )
    }

    fn mask(orders: &[usize], len: usize) -> OrderMask {
        let mut mask = OrderMask::new(len);
        for &o in orders {
            mask.set(o);
        }
        mask
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[test]
    fn parses_the_challenge_text_format() {
        let input = "3 2 2\n\
                     1 0 2\n\
                     1 1 3\n\
                     2 0 1 1 1\n\
                     2 0 3 1 3\n\
                     1 1 3\n\
                     1 10\n";
        let instance: Instance = input.parse().unwrap();

        assert_eq!(instance.orders(), 3);
        assert_eq!(instance.items(), 2);
        assert_eq!(instance.aisles(), 2);
        assert_eq!(instance.demand(0, 0), 2);
        assert_eq!(instance.demand(2, 1), 1);
        assert_eq!(instance.supply(0, 1), 3);
        assert_eq!(instance.supply(1, 0), 0);
        assert_eq!(instance.order_units(1), 3);
        assert_eq!((instance.lb(), instance.ub()), (1, 10));
    }

    #[test]
    fn parser_rejects_malformed_input() {
        assert!(matches!(
            "1 1 1\n1 0 2\n1 0 3\n5 2".parse::<Instance>(),
            Err(ParseError::InvertedBounds { lb: 5, ub: 2 })
        ));
        assert!(matches!(
            "2 1 1\n1 0 2\n".parse::<Instance>(),
            Err(ParseError::MissingLine(_))
        ));
        assert!(matches!(
            "1 1 1\n1 0 x\n1 0 3\n0 5".parse::<Instance>(),
            Err(ParseError::InvalidInteger { .. })
        ));
        assert!(matches!(
            "1 1 1\n1 5 2\n1 0 3\n0 5".parse::<Instance>(),
            Err(ParseError::ItemOutOfRange { item: 5, .. })
        ));
        // an absurd declared entry count must not feed any arithmetic
        assert!(matches!(
            "1 1 1\n18446744073709551615 0 2\n1 0 3\n0 5".parse::<Instance>(),
            Err(ParseError::FieldCount { .. })
        ));
    }

    #[test]
    fn order_mask_spans_multiple_words() {
        let mut mask = OrderMask::new(70);
        mask.set(0);
        mask.set(63);
        mask.set(65);

        assert!(mask.contains(0) && mask.contains(63) && mask.contains(65));
        assert!(!mask.contains(1));
        assert_eq!(mask.count(), 3);
        assert_eq!(mask.ones().collect::<Vec<_>>(), vec![0, 63, 65]);
    }

    #[test]
    fn capacity_ranking_scores_cumulative_top_aisles() {
        let instance = Instance::new(
            vec![vec![1]],
            vec![vec![2], vec![5], vec![3]],
            0,
            10,
        );
        let ranked = CapacityRanking.rank(&instance);

        assert_eq!(ranked.len(), 3);
        assert_eq!((ranked[0].k, ranked[0].score), (1, 5));
        assert_eq!((ranked[1].k, ranked[1].score), (2, 8));
        assert_eq!((ranked[2].k, ranked[2].score), (3, 10));
    }

    #[test]
    fn budget_slices_favor_the_first_rank_and_cover_the_share() {
        let shares = BudgetShares::default();
        let allocator = BudgetAllocator::new(Duration::from_secs(10), shares);
        let slices = allocator.k_slices(3);

        assert_eq!(slices.len(), 3);
        assert!(slices[0] > slices[1] && slices[1] > slices[2]);
        let total: Duration = slices.iter().sum();
        let explore = Duration::from_secs(10).mul_f64(shares.explore);
        assert!((total.as_secs_f64() - explore.as_secs_f64()).abs() < 1e-3);
    }

    #[test]
    fn remaining_is_none_past_the_deadline() {
        assert!(BudgetAllocator::remaining(Instant::now()).is_none());
        assert!(BudgetAllocator::remaining(far_deadline()).is_some());
    }

    #[test]
    fn dual_sign_flip_needs_a_negative_majority() {
        let mut duals = DualPrices {
            cardinality: 1.0,
            orders: vec![-1.0, -2.0, 0.5],
            volume: 0.5,
            items: vec![3.0],
            aisles: vec![],
        };
        assert!(duals.normalize_signs(1e-5));
        assert_eq!(duals.orders, vec![1.0, 2.0, -0.5]);
        assert_eq!(duals.cardinality, -1.0);
        assert_eq!(duals.items, vec![-3.0]);

        let mut balanced = DualPrices {
            orders: vec![1.0, -1.0],
            ..DualPrices::default()
        };
        assert!(!balanced.normalize_signs(1e-5));
        assert_eq!(balanced.orders, vec![1.0, -1.0]);
    }

    #[test]
    fn pool_rejects_duplicate_patterns_even_after_eviction() {
        let instance = small_instance();
        let p0 = Pattern::new(&instance, vec![0], mask(&[0, 1], 3));
        let p1 = Pattern::new(&instance, vec![1], mask(&[1], 3));

        let mut pool = ColumnPool::new(2);
        let id0 = pool.add(p0.clone()).unwrap();
        let id1 = pool.add(p1.clone()).unwrap();
        assert!(pool.add(p0.clone()).is_none());
        assert_eq!(pool.count(), 2);

        // only p0 active for a full window of two rounds
        let mut activations: HashMap<ColumnId, f64> = HashMap::default();
        activations.insert(id0, 1.0);
        pool.record_activation(&activations, 1e-5);
        assert_eq!(pool.evict_stale(10, &IdSet::default()), 0);
        pool.record_activation(&activations, 1e-5);

        let evicted = pool.evict_stale(10, &IdSet::default());
        assert_eq!(evicted, 1);
        assert!(pool.get(id1).is_none());
        assert!(pool.get(id0).is_some());

        // the pattern key survives the eviction
        assert!(pool.add(p1).is_none());
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn protected_columns_survive_eviction() {
        let instance = small_instance();
        let mut pool = ColumnPool::new(1);
        let id = pool
            .add(Pattern::new(&instance, vec![1], mask(&[1], 3)))
            .unwrap();

        pool.record_activation(&HashMap::default(), 1e-5);
        let mut protected = IdSet::default();
        protected.insert(id);
        assert_eq!(pool.evict_stale(10, &protected), 0);
        assert!(pool.get(id).is_some());
    }

    #[test]
    fn greedy_fill_takes_orders_by_volume_within_capacity() {
        let instance = small_instance();
        let seeds = GreedyFill.seed_columns(&instance, 1, far_deadline());

        assert_eq!(seeds.len(), 2);
        // aisle 0 takes order 1 (3 units) then order 0; order 2 no longer fits
        assert_eq!(seeds[0].aisles(), &[0]);
        assert_eq!(seeds[0].orders().ones().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(seeds[0].units(), 5);
        // aisle 1 stocks item 1 only
        assert_eq!(seeds[1].aisles(), &[1]);
        assert_eq!(seeds[1].orders().ones().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn greedy_fill_respects_the_upper_bound() {
        let instance = Instance::new(
            vec![vec![2, 0], vec![0, 3], vec![1, 1]],
            vec![vec![3, 3]],
            0,
            3,
        );
        let seeds = GreedyFill.seed_columns(&instance, 1, far_deadline());
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].orders().ones().collect::<Vec<_>>(), vec![1]);
        assert_eq!(seeds[0].units(), 3);
    }

    #[test]
    fn greedy_fill_keeps_a_placeholder_only_for_hopeless_aisles() {
        // the single order exceeds the aisle stock in its only item
        let instance = Instance::new(vec![vec![5]], vec![vec![3]], 0, 5);
        let seeds = GreedyFill.seed_columns(&instance, 1, far_deadline());
        assert_eq!(seeds.len(), 1);
        assert!(seeds[0].orders().is_empty());
        assert_eq!(seeds[0].units(), 0);
    }

    #[test]
    fn placeholders_fill_only_up_to_the_aisle_count() {
        // aisle 1 can serve nothing; aisle 0 already yields a nonempty seed
        let instance = Instance::new(
            vec![vec![2, 0]],
            vec![vec![2, 0], vec![0, 1]],
            0,
            10,
        );

        let one = GreedyFill.seed_columns(&instance, 1, far_deadline());
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].aisles(), &[0]);

        let two = GreedyFill.seed_columns(&instance, 2, far_deadline());
        assert_eq!(two.len(), 2);
        assert!(two.iter().any(|p| p.aisles() == [1] && p.orders().is_empty()));
    }

    #[test]
    fn greedy_fill_stops_at_the_deadline() {
        let instance = small_instance();
        let seeds = GreedyFill.seed_columns(&instance, 1, Instant::now());
        assert!(seeds.is_empty());
    }

    #[test]
    fn orders_too_wide_for_one_aisle_seed_from_aisle_pairs() {
        // each aisle stocks one item; the only order needs both
        let instance = Instance::new(
            vec![vec![2, 2]],
            vec![vec![2, 0], vec![0, 2]],
            0,
            10,
        );
        let seeds = GreedyFill.seed_columns(&instance, 2, far_deadline());
        assert!(seeds
            .iter()
            .any(|p| p.aisles() == [0, 1] && p.units() == 4));
    }

    #[test]
    fn pricing_finds_the_best_column_and_never_repeats_it() {
        let instance = small_instance();
        let config = ExplorerConfig::default();
        let mut env = EnumerativeEnv::with_seed(0);
        let mut pricing = Pricing::new();
        let duals = DualPrices::default();

        let found = pricing
            .price::<EnumerativeModel>(
                &instance,
                &duals,
                1,
                &[],
                Duration::from_secs(5),
                &config,
                &mut env,
            )
            .unwrap();
        assert_eq!(found.aisles(), &[0]);
        assert_eq!(found.orders().ones().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(found.units(), 5);

        // excluding aisle 0 diverts the search to aisle 1
        let diverted = pricing
            .price::<EnumerativeModel>(
                &instance,
                &duals,
                1,
                &[0],
                Duration::from_secs(5),
                &config,
                &mut env,
            )
            .unwrap();
        assert_eq!(diverted.aisles(), &[1]);
        assert_eq!(diverted.orders().ones().collect::<Vec<_>>(), vec![1]);

        // the unrestricted optimum is now a known duplicate
        assert!(pricing
            .price::<EnumerativeModel>(
                &instance,
                &duals,
                1,
                &[],
                Duration::from_secs(5),
                &config,
                &mut env,
            )
            .is_none());
    }

    #[test]
    fn pricing_terminates_once_duals_cover_every_order() {
        let instance = small_instance();
        let config = ExplorerConfig::default();
        let mut env = EnumerativeEnv::with_seed(0);
        let mut pricing = Pricing::new();
        let duals = DualPrices {
            orders: vec![10.0, 10.0, 10.0],
            ..DualPrices::default()
        };

        assert!(pricing
            .price::<EnumerativeModel>(
                &instance,
                &duals,
                1,
                &[],
                Duration::from_secs(5),
                &config,
                &mut env,
            )
            .is_none());
    }

    #[test]
    fn master_objective_never_drops_when_columns_are_appended() {
        let instance = small_instance();
        let config = ExplorerConfig::default();
        let mut env = EnumerativeEnv::with_seed(0);

        let mut pool = ColumnPool::new(0);
        pool.add(Pattern::new(&instance, vec![1], mask(&[1], 3)));
        let mut master = Rmp::<EnumerativeModel>::build(
            &instance,
            2,
            &pool,
            RmpMode::Relaxed,
            &config,
            &mut env,
        );
        assert!(master.solve(Duration::from_secs(5)).has_solution());
        let before = master.objective();

        let id = pool
            .add(Pattern::new(&instance, vec![0], mask(&[0, 1], 3)))
            .unwrap();
        master.append_column(&instance, pool.get(id).unwrap(), &config);
        assert!(master.solve(Duration::from_secs(5)).has_solution());
        assert!(master.objective() >= before - 1e-9);
    }

    #[test]
    fn master_respects_single_use_aisles() {
        let instance = small_instance();
        let config = ExplorerConfig::default();
        let mut env = EnumerativeEnv::with_seed(0);

        // two columns on aisle 0 with disjoint orders
        let mut pool = ColumnPool::new(0);
        pool.add(Pattern::new(&instance, vec![0], mask(&[0], 3)));
        pool.add(Pattern::new(&instance, vec![0], mask(&[1], 3)));
        let mut master = Rmp::<EnumerativeModel>::build(
            &instance,
            2,
            &pool,
            RmpMode::Relaxed,
            &config,
            &mut env,
        );
        assert!(master.solve(Duration::from_secs(5)).has_solution());

        let active: usize = master
            .activations()
            .values()
            .filter(|x| **x > 0.5)
            .count();
        assert_eq!(active, 1);
    }

    #[test]
    fn explorer_serves_the_best_wave_of_the_small_instance() {
        let instance = small_instance();
        let ui = UI::new();
        let mut explorer =
            Explorer::<EnumerativeModel>::new(&instance, ExplorerConfig::default(), &ui);
        let result = explorer.explore(Duration::from_secs(5));

        assert_eq!(result.aisles.iter().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(result.orders.iter().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert!((result.objective - 5.0).abs() < 1e-9);
        assert!(instance.selection_feasible(&result.orders, &result.aisles));
        assert!(result.stats.lp_solves > 0);
        assert!(result.stats.k_explored >= 1);
    }

    #[test]
    fn explorer_falls_back_to_the_empty_wave_when_nothing_fits() {
        // one order of 5 units, one aisle stocking 3, bounds pinned to 5
        let instance = Instance::new(vec![vec![5]], vec![vec![3]], 5, 5);
        let ui = UI::new();
        let mut explorer =
            Explorer::<EnumerativeModel>::new(&instance, ExplorerConfig::default(), &ui);
        let result = explorer.explore(Duration::from_secs(5));

        assert_eq!(result.objective, 0.0);
        assert!(result.orders.is_empty());
        assert!(result.aisles.is_empty());
    }

    #[test]
    fn commit_uses_exactly_the_winning_aisle_count() {
        // the only order spans both aisles and the lower bound forces it in
        let instance = Instance::new(
            vec![vec![2, 2]],
            vec![vec![2, 0], vec![0, 2]],
            4,
            10,
        );
        let ui = UI::new();
        let mut explorer =
            Explorer::<EnumerativeModel>::new(&instance, ExplorerConfig::default(), &ui);
        let result = explorer.explore(Duration::from_secs(5));

        assert_eq!(result.aisles.iter().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(result.aisles.len(), 2);
        assert_eq!(result.orders.iter().copied().collect::<Vec<_>>(), vec![0]);
        assert!((result.objective - 2.0).abs() < 1e-9);
        assert!(instance.selection_feasible(&result.orders, &result.aisles));
    }

    #[test]
    fn explorer_absorbs_oversized_pricing_models() {
        // 25 orders push the pricing model past the backend's exhaustive
        // sweep range; the run must still end in a valid result
        let demand: Vec<Vec<u64>> = (0..25).map(|_| vec![1]).collect();
        let instance = Instance::new(demand, vec![vec![30]], 0, 30);
        let ui = UI::new();
        let mut explorer =
            Explorer::<EnumerativeModel>::new(&instance, ExplorerConfig::default(), &ui);
        let result = explorer.explore(Duration::from_millis(600));

        assert!(instance.selection_feasible(&result.orders, &result.aisles));
        assert!(result.objective > 0.0);
    }

    struct RecordingSeeder {
        deadlines: Arc<Mutex<Vec<Instant>>>,
    }

    impl SeedStrategy for RecordingSeeder {
        fn seed_columns(&self, _instance: &Instance, _k: usize, deadline: Instant) -> Vec<Pattern> {
            self.deadlines.lock().unwrap().push(deadline);
            Vec::new()
        }
    }

    #[test]
    fn seeding_is_charged_to_the_init_share() {
        let instance = small_instance();
        let deadlines = Arc::new(Mutex::new(Vec::new()));
        let ui = UI::new();
        let start = Instant::now();
        let mut explorer =
            Explorer::<EnumerativeModel>::new(&instance, ExplorerConfig::default(), &ui)
                .with_seeder(Box::new(RecordingSeeder {
                    deadlines: deadlines.clone(),
                }));
        explorer.explore(Duration::from_secs(60));

        // 10% init share of a 60s budget; the first per-k slice would land
        // tens of seconds later
        let recorded = deadlines.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        for deadline in recorded.iter() {
            assert!(*deadline <= start + Duration::from_secs(7));
        }
    }

    #[test]
    fn sends_after_shutdown_are_dropped() {
        let ui = UI::new();
        let sender = ui.get_sender();
        sender.send(wave_colgen::UIUserMessage::ExitUi);
        std::thread::sleep(Duration::from_millis(50));
        // printer is gone; this must be a no-op, not a panic
        sender.send(wave_colgen::UIUserMessage::LogS("late message"));
    }

    #[test]
    fn explorer_honors_a_spent_budget() {
        let instance = small_instance();
        let ui = UI::new();
        let mut explorer =
            Explorer::<EnumerativeModel>::new(&instance, ExplorerConfig::default(), &ui);
        let result = explorer.explore(Duration::from_secs(0));

        assert!(result.stats.hit_time_limit);
        assert_eq!(result.objective, 0.0);
    }

    #[test]
    fn explorer_results_satisfy_the_wave_invariants_on_random_instances() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..5 {
            let orders = rng.gen_range(2..5);
            let aisles = rng.gen_range(1..4);
            let items = rng.gen_range(1..3);
            let demand: Vec<Vec<u64>> = (0..orders)
                .map(|_| (0..items).map(|_| rng.gen_range(0..3)).collect())
                .collect();
            let supply: Vec<Vec<u64>> = (0..aisles)
                .map(|_| (0..items).map(|_| rng.gen_range(0..4)).collect())
                .collect();
            let ub: u64 = demand.iter().flatten().sum::<u64>().max(1);
            let instance = Instance::new(demand, supply, 0, ub);

            let ui = UI::new();
            let mut explorer =
                Explorer::<EnumerativeModel>::new(&instance, ExplorerConfig::default(), &ui);
            let result = explorer.explore(Duration::from_millis(500));

            assert!(instance.selection_feasible(&result.orders, &result.aisles));
            if result.orders.is_empty() {
                assert_eq!(result.objective, 0.0);
            } else {
                let units: u64 = result.orders.iter().map(|&o| instance.order_units(o)).sum();
                let expected = units as f64 / result.aisles.len() as f64;
                assert!((result.objective - expected).abs() < 1e-9);
                assert!(units <= instance.ub());
            }
        }
    }
}
