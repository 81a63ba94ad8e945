//! Client session parameters.

use std::time::Duration;

use crate::dispatcher::RetryPolicy;
use crate::error::ClientError;
use crate::simulator::{LossSimulator, DEFAULT_LOSS_RATE};

pub const DEFAULT_SERVER: &str = "127.0.0.1:8080";
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Adjustable session parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// `host:port` of the server, resolved once at connect.
    pub server: String,
    /// How long each exchange attempt waits for its response.
    pub exchange_timeout: Duration,
    /// Receive timeout of a single poll in monitor mode.
    pub poll_interval: Duration,
    /// Total sends per exchange, including the first.
    pub max_attempts: u32,
    /// Probability of dropping an outbound datagram (`0.0` disables).
    pub loss_rate: f64,
    /// Seed for reproducible loss; `None` draws from OS entropy.
    pub loss_seed: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            loss_rate: DEFAULT_LOSS_RATE,
            loss_seed: None,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ClientError> {
        if !(0.0..=1.0).contains(&self.loss_rate) {
            return Err(ClientError::Config(format!(
                "loss rate {} is outside [0, 1]",
                self.loss_rate
            )));
        }
        if self.max_attempts == 0 {
            return Err(ClientError::Config("max attempts must be at least 1".into()));
        }
        if self.exchange_timeout.is_zero() || self.poll_interval.is_zero() {
            return Err(ClientError::Config("timeouts must be non-zero".into()));
        }
        if self.server.is_empty() {
            return Err(ClientError::Config("server address is empty".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            timeout: self.exchange_timeout,
        }
    }

    pub fn loss_simulator(&self) -> LossSimulator {
        match self.loss_seed {
            Some(seed) => LossSimulator::seeded(self.loss_rate, seed),
            None => LossSimulator::new(self.loss_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_parameters() {
        let config = ClientConfig::default();
        assert_eq!(config.exchange_timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.loss_rate, 0.20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_loss_rate() {
        let config = ClientConfig {
            loss_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));

        let config = ClientConfig {
            loss_rate: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_attempts_and_timeouts() {
        let zero_attempts = ClientConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(zero_attempts.validate().is_err());

        let zero_poll = ClientConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(zero_poll.validate().is_err());
    }

    #[test]
    fn seeded_config_builds_reproducible_simulator() {
        let config = ClientConfig {
            loss_rate: 0.5,
            loss_seed: Some(11),
            ..Default::default()
        };
        let mut a = config.loss_simulator();
        let mut b = config.loss_simulator();
        for _ in 0..32 {
            assert_eq!(a.should_drop(), b.should_drop());
        }
    }
}
