mod common;

use common::GlvBuilder;
use microsim_lib::{simulate_glv, RngStream, SimError, Termination};

/// Closed-form logistic solution of a single gLV species with `A_ii < 0`.
fn logistic(r: f64, a: f64, x0: f64, t: f64) -> f64 {
    let k = -r / a;
    k / (1.0 + (k / x0 - 1.0) * (-r * t).exp())
}

#[test]
fn test_two_species_converge_towards_equilibrium() {
    let params = GlvBuilder::diagonal(&[-0.5, -0.5])
        .with_growth(&[0.1, 0.1])
        .with_x0(&[1.0, 1.0])
        .with_time(10.0, 5)
        .build();
    let mut rng = RngStream::new(0);
    let t = simulate_glv(&params, &mut rng).unwrap();

    assert_eq!(t.time, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    for species in 0..2 {
        let series = t.series(species);
        for (point, &x) in series.iter().enumerate() {
            assert_close!(x, logistic(0.1, -0.5, 1.0, t.time[point]), 1e-6);
        }
        // strictly approaching 0.2 from above
        assert!(series.windows(2).all(|w| w[1] < w[0] && w[1] > 0.2));
    }
}

#[test]
fn test_long_run_reaches_equilibrium() {
    let params = GlvBuilder::diagonal(&[-0.5, -0.5])
        .with_growth(&[0.1, 0.1])
        .with_time(400.0, 4)
        .build();
    let mut rng = RngStream::new(0);
    let t = simulate_glv(&params, &mut rng).unwrap();
    for &x in t.final_species().unwrap().iter() {
        assert_close!(x, 0.2, 1e-9);
    }
}

#[test]
fn test_zero_interactions_grow_exponentially() {
    let params = GlvBuilder::diagonal(&[0.0, 0.0, 0.0])
        .with_growth(&[0.1, 0.2, 0.05])
        .with_time(20.0, 20)
        .build();
    let mut rng = RngStream::new(0);
    let t = simulate_glv(&params, &mut rng).unwrap();
    for (species, rate) in [0.1, 0.2, 0.05].into_iter().enumerate() {
        let series = t.series(species);
        assert!(series.windows(2).all(|w| w[1] > w[0]));
        let expected = (rate * 20.0_f64).exp();
        assert_close!(series[20] / expected, 1.0, 1e-7);
    }
}

#[test]
fn test_normalized_columns_sum_to_one() {
    let params = GlvBuilder::interactions(&[
        vec![-1.0, 0.2, -0.1],
        vec![-0.3, -1.0, 0.1],
        vec![0.05, -0.2, -1.0],
    ])
    .with_growth(&[0.5, 0.4, 0.3])
    .with_x0(&[0.1, 0.5, 2.0])
    .with_time(30.0, 30)
    .normalized()
    .build();
    let mut rng = RngStream::new(0);
    let t = simulate_glv(&params, &mut rng).unwrap();
    assert!(t.metadata.normalized);
    assert_column_totals!(t, 1.0, 1e-12);
}

#[test]
fn test_extinct_species_stays_extinct() {
    let params = GlvBuilder::diagonal(&[-1.0, -1.0])
        .with_growth(&[1.0, -1.0])
        .with_x0(&[0.5, 0.5])
        .with_time(50.0, 50)
        .with_params(|p| p.boundary.extinction_threshold = 1e-3)
        .build();
    let mut rng = RngStream::new(0);
    let t = simulate_glv(&params, &mut rng).unwrap();
    let declining = t.series(1);
    let first_zero = declining
        .iter()
        .position(|&x| x == 0.0)
        .expect("species 1 goes extinct");
    assert!(declining[first_zero..].iter().all(|&x| x == 0.0));
    assert!(t.metadata.stats.extinctions >= 1);
    assert_non_negative!(t);
}

#[test]
fn test_runaway_growth_returns_partial_trajectory() {
    let params = GlvBuilder::diagonal(&[0.0])
        .with_growth(&[5.0])
        .with_time(20.0, 20)
        .build();
    let mut rng = RngStream::new(0);
    let err = simulate_glv(&params, &mut rng).unwrap_err();
    let SimError::NumericalDivergence { time, partial } = err else {
        panic!("expected divergence");
    };
    // e^(5t) passes 1e8 just before t = 3.7
    assert!(time > 3.0 && time < 4.0);
    assert!(matches!(
        partial.metadata.termination,
        Termination::Diverged { .. }
    ));
    assert!(partial.time.windows(2).all(|w| w[1] > w[0]));
    assert!(partial.species.iter().all(|&x| x.is_finite() && x <= 1e8));
}
