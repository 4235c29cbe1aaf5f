use criterion::{black_box, criterion_group, criterion_main, Criterion};
use microsim_core::continuous::glv::GlvField;
use microsim_core::continuous::{rk4, VectorField};
use microsim_core::{
    generate_interaction_matrix, simulate_glv, GlvParams, InteractionDistribution, RngStream,
    TimeConfig,
};
use nalgebra::DVector;

fn community(n: usize) -> GlvParams {
    let mut rng = RngStream::new(5);
    let interactions = generate_interaction_matrix(
        n,
        -1.0,
        0.2,
        &InteractionDistribution::PowerLawNormal {
            scale: 0.1,
            alpha: 0.0,
        },
        &mut rng,
    )
    .unwrap_or_else(|e| panic!("interaction matrix: {e}"));
    let mut params = GlvParams::new(interactions);
    params.growth_rates = vec![0.5; n];
    params.x0 = vec![0.1; n];
    params.time = TimeConfig {
        t_start: 0.0,
        t_end: 100.0,
        t_store: 100,
    };
    params
}

fn bench_rk4_step(c: &mut Criterion) {
    let params = community(50);
    let field = GlvField::new(&params.growth_rates, &params.interactions);
    let x = DVector::from_element(50, 0.1);

    c.bench_function("glv_rk4_step_50", |b| {
        b.iter(|| black_box(rk4(&field, black_box(&x), 0.1)))
    });
    c.bench_function("glv_derivative_50", |b| {
        b.iter(|| black_box(field.derivative(black_box(&x))))
    });
}

fn bench_glv_run(c: &mut Criterion) {
    let deterministic = community(20);
    c.bench_function("glv_run_20_species", |b| {
        b.iter(|| {
            let mut rng = RngStream::new(1);
            black_box(simulate_glv(&deterministic, &mut rng).ok())
        })
    });

    let mut stochastic = community(20);
    stochastic.stochastic = true;
    c.bench_function("glv_run_20_species_stochastic", |b| {
        b.iter(|| {
            let mut rng = RngStream::new(1);
            black_box(simulate_glv(&stochastic, &mut rng).ok())
        })
    });
}

criterion_group!(benches, bench_rk4_step, bench_glv_run);
criterion_main!(benches);
