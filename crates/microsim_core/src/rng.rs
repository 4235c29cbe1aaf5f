//! Per-run random number streams.
//!
//! Every run draws from its own `RngStream`. A stream is a ChaCha8 generator
//! keyed by `(seed, stream)`, so batch runs sharing a seed still get
//! independent, reproducible sequences without any global random state.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RngStream {
    rng: ChaCha8Rng,
    seed: u64,
    stream: u64,
}

impl RngStream {
    /// Stream 0 of the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_stream(seed, 0)
    }

    #[must_use]
    pub fn with_stream(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Self { rng, seed, stream }
    }

    /// Fresh seed from the OS, for runs that need no replay.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn stream(&self) -> u64 {
        self.stream
    }

    /// Stable identifier for the run drawing from this stream.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        Uuid::from_u128((u128::from(self.seed) << 64) | u128::from(self.stream))
    }
}

impl RngCore for RngStream {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RngStream::new(42);
        let mut b = RngStream::new(42);
        let xs: Vec<f64> = (0..8).map(|_| a.gen()).collect();
        let ys: Vec<f64> = (0..8).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_streams_are_independent() {
        let mut a = RngStream::with_stream(42, 0);
        let mut b = RngStream::with_stream(42, 1);
        let xs: Vec<u64> = (0..4).map(|_| a.gen()).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.gen()).collect();
        assert_ne!(xs, ys);
        assert_ne!(a.run_id(), b.run_id());
    }
}
