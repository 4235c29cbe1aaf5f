mod common;

use common::GlvBuilder;
use microsim_lib::{
    generate_coupling_matrices, simulate_glv, simulate_hubbell, CouplingConfig, InteractionConfig,
    InteractionDistribution, RateDistribution, RngStream,
};
use proptest::prelude::*;

prop_compose! {
    fn arb_interaction_config()(
        n_species in 2usize..12,
        diagonal in -2.0f64..0.0,
        connectance in 0.0f64..=1.0,
        scale in 0.01f64..1.0,
        symmetric in any::<bool>()
    ) -> InteractionConfig {
        InteractionConfig {
            n_species,
            diagonal,
            connectance,
            distribution: InteractionDistribution::PowerLawNormal { scale, alpha: 0.0 },
            symmetric,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_generated_diagonal_is_exact(config in arb_interaction_config(), seed in any::<u64>()) {
        let a = config.generate(&mut RngStream::new(seed)).unwrap();
        prop_assert_eq!(a.n_species(), config.n_species);
        prop_assert!(a.diagonal().iter().all(|&d| d == config.diagonal));
        if config.symmetric {
            for i in 0..config.n_species {
                for j in 0..config.n_species {
                    prop_assert_eq!(a.get(i, j), a.get(j, i));
                }
            }
        }
    }

    #[test]
    fn test_connectance_converges(connectance in 0.05f64..0.95, seed in any::<u64>()) {
        let config = InteractionConfig {
            n_species: 60,
            connectance,
            ..InteractionConfig::default()
        };
        let a = config.generate(&mut RngStream::new(seed)).unwrap();
        // 3540 slots put one standard deviation below 0.009
        prop_assert!((a.connectance() - connectance).abs() < 0.05,
            "realized {} for target {}", a.connectance(), connectance);
    }

    #[test]
    fn test_coupling_is_non_negative_and_feeds_everyone(
        n_species in 1usize..10,
        n_resources in 1usize..8,
        mean_production in 0.0f64..2.0,
        seed in any::<u64>()
    ) {
        let mut rng = RngStream::new(seed);
        let c = generate_coupling_matrices(n_species, n_resources, 1.0, mean_production, &mut rng)
            .unwrap();
        prop_assert!(c.consumption().iter().all(|&v| v >= 0.0));
        prop_assert!(c.production().iter().all(|&v| v >= 0.0));
        for i in 0..n_species {
            prop_assert!((0..n_resources).any(|k| c.consumes(i, k)));
        }
    }

    #[test]
    fn test_beta_rates_stay_below_one(mean in 0.05f64..0.95, seed in any::<u64>()) {
        let config = CouplingConfig {
            n_species: 5,
            n_resources: 4,
            mean_consumption: mean,
            mean_production: 0.0,
            distribution: RateDistribution::Beta { concentration: 10.0 },
            ..CouplingConfig::default()
        };
        let c = config.generate(&mut RngStream::new(seed)).unwrap();
        prop_assert!(c.consumption().iter().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn test_stochastic_glv_stays_non_negative(
        sigma in 0.0f64..0.5,
        threshold in 0.0f64..1e-3,
        seed in any::<u64>()
    ) {
        let params = GlvBuilder::interactions(&[
            vec![-1.0, 0.3, -0.2],
            vec![-0.4, -1.0, 0.2],
            vec![0.1, -0.3, -1.0],
        ])
        .with_growth(&[0.6, 0.5, 0.4])
        .with_x0(&[0.2, 0.2, 0.2])
        .with_time(10.0, 10)
        .stochastic(sigma)
        .with_params(|p| p.boundary.extinction_threshold = threshold)
        .build();
        let t = simulate_glv(&params, &mut RngStream::new(seed)).unwrap();
        prop_assert!(t.min_value() >= 0.0);
        prop_assert!(t
            .species
            .iter()
            .all(|&x| x == 0.0 || x >= threshold));
    }

    #[test]
    fn test_normalized_hubbell_sums_to_one(
        n_species in 2usize..6,
        capacity in 10u64..200,
        migration_p in 0.0f64..0.5,
        seed in any::<u64>()
    ) {
        let mut params = common::hubbell(n_species, n_species + 2, capacity, 200, migration_p);
        params.norm = true;
        let t = simulate_hubbell(&params, &mut RngStream::new(seed)).unwrap();
        for total in t.column_totals() {
            prop_assert!((total - 1.0).abs() < 1e-12);
        }
    }
}
