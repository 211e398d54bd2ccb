//! Engine configuration.
//!
//! All tunables of the consensus subsystem live in [`EngineConfig`]: the
//! trust-score weights, the history window, the trust floor, the committee
//! cap, and the timing profile. The host parses its node configuration file
//! and hands a validated `EngineConfig` to the engine at construction;
//! invalid configurations never produce a running engine.

use crate::profile::{ProfileError, ProfileId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default weight of the success-rate component
pub const DEFAULT_SUCCESS_WEIGHT: f64 = 0.4;

/// Default weight of the stake-fraction component
pub const DEFAULT_STAKE_WEIGHT: f64 = 0.3;

/// Default weight of the response-speed component
pub const DEFAULT_SPEED_WEIGHT: f64 = 0.3;

/// Default number of outcomes retained per validator
pub const DEFAULT_HISTORY_WINDOW: usize = 100;

/// Default trust floor for committee admission and proposal acceptance
pub const DEFAULT_MIN_TRUST: f64 = 0.6;

/// Default committee size cap
pub const DEFAULT_MAX_COMMITTEE: usize = 100;

/// Tolerance when checking that the trust weights sum to one
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Errors produced when validating the engine configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The trust weights do not sum to one
    #[error("trust weights must sum to 1.0, got {sum}")]
    WeightSum {
        /// Actual sum of the configured weights
        sum: f64,
    },

    /// A trust weight is outside `[0, 1]` or not finite
    #[error("trust weight {name} out of range: {value}")]
    WeightRange {
        /// Name of the offending weight
        name: &'static str,
        /// Configured value
        value: f64,
    },

    /// The history window was configured as zero
    #[error("history window must be positive")]
    ZeroHistoryWindow,

    /// The trust floor is outside `[0, 1]` or not finite
    #[error("trust floor out of range: {0}")]
    TrustFloorRange(f64),

    /// The committee cap was configured as zero
    #[error("committee cap must be positive")]
    ZeroCommittee,

    /// The selected profile failed validation
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Weights combining the trust-score components.
///
/// The total score is `success * success_rate + stake * stake_weight +
/// speed * response_speed`; the three weights must sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustWeights {
    /// Weight of the success-rate component
    pub success: f64,
    /// Weight of the stake-fraction component
    pub stake: f64,
    /// Weight of the response-speed component
    pub speed: f64,
}

impl TrustWeights {
    /// Creates a weight set from its three components.
    pub const fn new(success: f64, stake: f64, speed: f64) -> Self {
        Self {
            success,
            stake,
            speed,
        }
    }

    /// Validates the weight set: each component finite and in `[0, 1]`,
    /// summing to one within [`WEIGHT_SUM_TOLERANCE`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("success", self.success),
            ("stake", self.stake),
            ("speed", self.speed),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::WeightRange { name, value });
            }
        }

        let sum = self.success + self.stake + self.speed;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }

        Ok(())
    }
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self::new(
            DEFAULT_SUCCESS_WEIGHT,
            DEFAULT_STAKE_WEIGHT,
            DEFAULT_SPEED_WEIGHT,
        )
    }
}

/// Configuration of the consensus engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trust-score component weights
    pub weights: TrustWeights,

    /// Number of outcomes retained per validator
    pub history_window: usize,

    /// Trust floor for committee admission and proposal acceptance
    pub min_trust: f64,

    /// Committee size cap
    pub max_committee: usize,

    /// Timing profile driving the external phase scheduler
    pub profile: ProfileId,

    /// Response time credited to a proposer in the begin-block hook.
    ///
    /// The hook has no round-trip measurement of its own, so the host
    /// supplies the value to credit; the default matches the historical
    /// behaviour of crediting two seconds.
    pub proposer_response: Duration,
}

impl EngineConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;

        if self.history_window == 0 {
            return Err(ConfigError::ZeroHistoryWindow);
        }

        if !self.min_trust.is_finite() || !(0.0..=1.0).contains(&self.min_trust) {
            return Err(ConfigError::TrustFloorRange(self.min_trust));
        }

        if self.max_committee == 0 {
            return Err(ConfigError::ZeroCommittee);
        }

        self.profile.profile().validate()?;

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: TrustWeights::default(),
            history_window: DEFAULT_HISTORY_WINDOW,
            min_trust: DEFAULT_MIN_TRUST,
            max_committee: DEFAULT_MAX_COMMITTEE,
            profile: ProfileId::default(),
            proposer_response: Duration::from_secs(2),
        }
    }
}
