//! Run counters and logging setup.
//!
//! `RunMetrics` is owned by a single run and ends up in the trajectory
//! metadata. `BatchMetrics` is shared across worker threads of a batch and
//! only logs.

use microsim_data::{ModelKind, RunStats};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per-run counters.
#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    stats: RunStats,
}

impl RunMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed step and the events it fired.
    pub fn record_step(&mut self, events: u64) {
        self.stats.steps += 1;
        self.stats.events += events;
    }

    pub fn record_extinction(&mut self, species: usize) {
        self.stats.extinctions += 1;
        tracing::trace!(species, "extinction clamped");
    }

    pub fn record_migration(&mut self, species: usize) {
        self.stats.migrations += 1;
        tracing::trace!(species, "migrant seeded");
    }

    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn log_summary(&self, model: ModelKind, points: usize) {
        tracing::debug!(
            model = %model,
            steps = self.stats.steps,
            events = self.stats.events,
            extinctions = self.stats.extinctions,
            migrations = self.stats.migrations,
            points,
            "run finished"
        );
    }
}

/// Batch-wide counters, safe to update from rayon workers.
pub struct BatchMetrics {
    completed: AtomicU64,
    diverged: AtomicU64,
    start_time: Instant,
}

impl Default for BatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            completed: AtomicU64::new(0),
            diverged: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_diverged(&self) {
        self.diverged.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn diverged(&self) -> u64 {
        self.diverged.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn log_summary(&self, model: ModelKind) {
        tracing::info!(
            model = %model,
            completed = self.completed(),
            diverged = self.diverged(),
            duration_ms = self.elapsed().as_millis() as u64,
            "batch finished"
        );
    }
}

/// Initialize tracing subscriber for logging.
///
/// Honours `RUST_LOG`; defaults to `info`.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .ok();
}
