//! Datagram-loss simulator for demos and testing.
//!
//! Real networks drop packets.  To exercise the retry path without depending
//! on actual network conditions, [`LossSimulator`] decides per outbound
//! datagram whether it should be silently discarded instead of sent.
//!
//! The random source is owned by the simulator and can be seeded, so a test
//! run with a fixed seed always drops the same datagrams.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default probability that an outbound datagram is dropped.
pub const DEFAULT_LOSS_RATE: f64 = 0.20;

/// Decides which outbound datagrams are dropped.
#[derive(Debug, Clone)]
pub struct LossSimulator {
    loss_rate: f64,
    rng: StdRng,
}

impl LossSimulator {
    /// Simulator drawing from OS entropy.
    ///
    /// `loss_rate` is clamped to `[0.0, 1.0]`.
    pub fn new(loss_rate: f64) -> Self {
        Self::with_rng(loss_rate, StdRng::from_os_rng())
    }

    /// Reproducible simulator for tests.
    pub fn seeded(loss_rate: f64, seed: u64) -> Self {
        Self::with_rng(loss_rate, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(loss_rate: f64, rng: StdRng) -> Self {
        let loss_rate = if loss_rate.is_nan() {
            0.0
        } else {
            loss_rate.clamp(0.0, 1.0)
        };
        Self { loss_rate, rng }
    }

    /// Pass-through simulator: never drops.
    pub fn disabled() -> Self {
        Self::seeded(0.0, 0)
    }

    pub fn loss_rate(&self) -> f64 {
        self.loss_rate
    }

    /// Draw once: `true` means the caller should not transmit.
    pub fn should_drop(&mut self) -> bool {
        self.loss_rate > 0.0 && self.rng.random_bool(self.loss_rate)
    }
}

impl Default for LossSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_LOSS_RATE)
    }
}
