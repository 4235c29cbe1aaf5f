pub mod macros;

use microsim_lib::{
    Amplitude, GlvParams, HubbellParams, InteractionMatrix, SoiParams, TimeConfig,
};

#[allow(dead_code)]
pub struct GlvBuilder {
    params: GlvParams,
}

#[allow(dead_code)]
impl GlvBuilder {
    /// Independent species with the given self-interaction terms.
    pub fn diagonal(values: &[f64]) -> Self {
        Self {
            params: GlvParams::new(InteractionMatrix::from_diagonal(values)),
        }
    }

    pub fn interactions(rows: &[Vec<f64>]) -> Self {
        let matrix = InteractionMatrix::from_rows(rows).expect("valid interaction rows");
        Self {
            params: GlvParams::new(matrix),
        }
    }

    pub fn with_growth(mut self, growth: &[f64]) -> Self {
        self.params.growth_rates = growth.to_vec();
        self
    }

    pub fn with_x0(mut self, x0: &[f64]) -> Self {
        self.params.x0 = x0.to_vec();
        self
    }

    pub fn with_time(mut self, t_end: f64, t_store: usize) -> Self {
        self.params.time = TimeConfig {
            t_start: 0.0,
            t_end,
            t_store,
        };
        self
    }

    pub fn stochastic(mut self, sigma: f64) -> Self {
        self.params.stochastic = true;
        self.params.noise.sigma_drift = Amplitude::Uniform(sigma);
        self
    }

    pub fn normalized(mut self) -> Self {
        self.params.norm = true;
        self
    }

    pub fn with_params<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut GlvParams),
    {
        modifier(&mut self.params);
        self
    }

    pub fn build(self) -> GlvParams {
        self.params
    }
}

/// Hubbell community on a `[0, t_end]` window with `t_store` intervals.
#[allow(dead_code)]
pub fn hubbell(
    n_species: usize,
    metacommunity: usize,
    capacity: u64,
    k_events: u64,
    migration_p: f64,
) -> HubbellParams {
    let mut p = HubbellParams::new(n_species, metacommunity, capacity, k_events);
    p.migration_p = migration_p;
    p.time = TimeConfig {
        t_start: 0.0,
        t_end: 100.0,
        t_store: 100,
    };
    p
}

#[allow(dead_code)]
pub fn soi(n_species: usize, capacity: u64) -> SoiParams {
    let mut p = SoiParams::new(
        InteractionMatrix::from_diagonal(&vec![-0.5; n_species]),
        capacity,
    );
    p.time = TimeConfig {
        t_start: 0.0,
        t_end: 50.0,
        t_store: 50,
    };
    p
}
