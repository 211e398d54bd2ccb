//! Named timing and committee-size profiles.
//!
//! A [`Profile`] bundles the four phase timeouts together with the committee
//! bounds the engine runs under. Three named profiles are shipped: the tPBFT
//! default tuned for high-frequency workloads, and Raft-style / HotStuff-style
//! profiles used when benchmarking the comparative engines against the same
//! host. The timeouts are advisory to the external scheduler that drives view
//! changes; the engine itself only reads the committee bounds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Errors produced when validating a profile
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// A phase timeout was configured as zero
    #[error("profile timeout {name} must be positive")]
    ZeroTimeout {
        /// Name of the offending timeout field
        name: &'static str,
    },

    /// Committee bounds are inverted
    #[error("profile committee bounds inverted: min {min} > max {max}")]
    BoundsInverted {
        /// Configured minimum committee size
        min: usize,
        /// Configured maximum committee size
        max: usize,
    },
}

/// Identifier of a shipped profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileId {
    /// Trust-enhanced PBFT profile (default)
    #[default]
    Tpbft,
    /// Raft-style profile for comparison runs
    RaftStyle,
    /// HotStuff-style profile for comparison runs
    HotstuffStyle,
}

impl ProfileId {
    /// Resolves the identifier to its profile values.
    pub fn profile(self) -> Profile {
        match self {
            ProfileId::Tpbft => Profile::tpbft(),
            ProfileId::RaftStyle => Profile::raft_style(),
            ProfileId::HotstuffStyle => Profile::hotstuff_style(),
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileId::Tpbft => write!(f, "tpbft"),
            ProfileId::RaftStyle => write!(f, "raft-style"),
            ProfileId::HotstuffStyle => write!(f, "hotstuff-style"),
        }
    }
}

/// Timing and committee parameters for a consensus run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Timeout for the propose phase
    pub timeout_propose: Duration,
    /// Timeout for the prevote phase
    pub timeout_prevote: Duration,
    /// Timeout for the precommit phase
    pub timeout_precommit: Duration,
    /// Timeout for the commit phase
    pub timeout_commit: Duration,
    /// Minimum committee size
    pub min_validators: usize,
    /// Maximum committee size
    pub max_validators: usize,
}

impl Profile {
    /// The tPBFT profile tuned for high-frequency workloads.
    pub fn tpbft() -> Self {
        Self {
            timeout_propose: Duration::from_millis(1000),
            timeout_prevote: Duration::from_millis(500),
            timeout_precommit: Duration::from_millis(500),
            timeout_commit: Duration::from_millis(500),
            min_validators: 4,
            max_validators: 7,
        }
    }

    /// A Raft-style profile with a much longer commit window.
    pub fn raft_style() -> Self {
        Self {
            timeout_propose: Duration::from_millis(3000),
            timeout_prevote: Duration::from_millis(1000),
            timeout_precommit: Duration::from_millis(1000),
            timeout_commit: Duration::from_millis(5000),
            min_validators: 3,
            max_validators: 7,
        }
    }

    /// A HotStuff-style profile with intermediate timings.
    pub fn hotstuff_style() -> Self {
        Self {
            timeout_propose: Duration::from_millis(2000),
            timeout_prevote: Duration::from_millis(800),
            timeout_precommit: Duration::from_millis(800),
            timeout_commit: Duration::from_millis(2000),
            min_validators: 4,
            max_validators: 7,
        }
    }

    /// Validates the profile values.
    ///
    /// All timeouts must be positive and the committee bounds must not be
    /// inverted.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for (name, value) in [
            ("timeout_propose", self.timeout_propose),
            ("timeout_prevote", self.timeout_prevote),
            ("timeout_precommit", self.timeout_precommit),
            ("timeout_commit", self.timeout_commit),
        ] {
            if value.is_zero() {
                return Err(ProfileError::ZeroTimeout { name });
            }
        }

        if self.min_validators > self.max_validators {
            return Err(ProfileError::BoundsInverted {
                min: self.min_validators,
                max: self.max_validators,
            });
        }

        Ok(())
    }

    /// Checks whether the minimum committee can tolerate `f` Byzantine
    /// validators, requiring `min_validators >= 3f + 1`.
    pub fn supports_faults(&self, f: usize) -> bool {
        self.min_validators >= 3 * f + 1
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::tpbft()
    }
}
