use criterion::{black_box, criterion_group, criterion_main, Criterion};
use microsim_core::{
    generate_simulations, simulate_hubbell, simulate_soi, HubbellParams, InteractionMatrix,
    ModelParams, ParamSweep, RngStream, SoiParams, TimeConfig,
};

fn hubbell() -> HubbellParams {
    let mut params = HubbellParams::new(20, 40, 1000, 10_000);
    params.migration_p = 0.05;
    params.time = TimeConfig {
        t_start: 0.0,
        t_end: 100.0,
        t_store: 100,
    };
    params
}

fn bench_hubbell(c: &mut Criterion) {
    let params = hubbell();
    c.bench_function("hubbell_10k_events", |b| {
        b.iter(|| {
            let mut rng = RngStream::new(3);
            black_box(simulate_hubbell(&params, &mut rng).ok())
        })
    });
}

fn bench_soi(c: &mut Criterion) {
    let mut params = SoiParams::new(InteractionMatrix::from_diagonal(&[-0.5; 10]), 500);
    params.time = TimeConfig {
        t_start: 0.0,
        t_end: 20.0,
        t_store: 20,
    };
    c.bench_function("soi_10_species", |b| {
        b.iter(|| {
            let mut rng = RngStream::new(3);
            black_box(simulate_soi(&params, &mut rng).ok())
        })
    });
}

fn bench_batch(c: &mut Criterion) {
    let base = ModelParams::Hubbell(hubbell());
    let sweep = ParamSweep::new();
    c.bench_function("hubbell_batch_16", |b| {
        b.iter(|| black_box(generate_simulations(&base, &sweep, 16, 9).ok()))
    });
}

criterion_group!(benches, bench_hubbell, bench_soi, bench_batch);
criterion_main!(benches);
