//! # Trust scoring for validators
//!
//! This module implements the trust model at the core of the tPBFT engine.
//! Every validator accumulates a bounded window of participation outcomes
//! (success bits plus response durations), and a normalised trust score is
//! recomputed from that window on every update.
//!
//! ## Trust Formula
//!
//! ```text
//! TrustScore = (
//!     0.4 × SuccessRate +
//!     0.3 × StakeWeight +
//!     0.3 × ResponseSpeed
//! )
//! ```
//!
//! ## Components
//!
//! - **Success rate (40%)**: fraction of successful participations in the
//!   retained window
//! - **Stake weight (30%)**: the validator's fraction of total bonded stake
//! - **Response speed (30%)**: 1.0 at or under 100 ms average response,
//!   decaying linearly to 0.1 at 1 s and above
//!
//! Validators never scored before receive a synthetic medium-trust default
//! of 0.7, so fresh nodes can join a committee without history.
//!
//! ## Example
//!
//! ```rust
//! use hcp_consensus::trust::TrustScorer;
//! use hcp_types::Address;
//! use std::time::Duration;
//!
//! let scorer = TrustScorer::default();
//! let validator = Address::new([1u8; 20]);
//!
//! scorer.update(validator, true, Duration::from_millis(100), 1_000.0, 10_000.0);
//!
//! let score = scorer.score(&validator);
//! assert!((score.total - 0.73).abs() < 1e-9);
//! ```

use crate::config::{ConfigError, TrustWeights, DEFAULT_HISTORY_WINDOW};
use hcp_types::Address;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::trace;

/// Average response time that earns the full speed score
pub const IDEAL_RESPONSE: Duration = Duration::from_millis(100);

/// Average response time at or beyond which the speed score bottoms out
pub const MAX_RESPONSE: Duration = Duration::from_millis(1000);

/// Speed score assigned at [`MAX_RESPONSE`] and beyond
pub const MIN_SPEED_SCORE: f64 = 0.1;

/// Total score returned for validators that were never scored
pub const DEFAULT_TRUST_TOTAL: f64 = 0.7;

/// Trust evaluation for a single validator.
///
/// All components and the total are normalised to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustScore {
    /// The validator this score belongs to
    pub validator: Address,
    /// Fraction of successful participations in the retained window
    pub success_rate: f64,
    /// Fraction of total bonded stake held by the validator
    pub stake_weight: f64,
    /// Normalised response-speed component
    pub response_speed: f64,
    /// Weighted total score
    pub total: f64,
    /// When the score was last recomputed
    pub last_updated: Instant,
}

impl TrustScore {
    /// The synthetic default returned for unknown validators: full success
    /// and speed, no stake, medium total trust.
    fn synthetic(validator: Address) -> Self {
        Self {
            validator,
            success_rate: 1.0,
            stake_weight: 0.0,
            response_speed: 1.0,
            total: DEFAULT_TRUST_TOTAL,
            last_updated: Instant::now(),
        }
    }
}

/// Bounded participation history for a single validator.
///
/// The two queues always have identical length; the oldest entry of each is
/// evicted together once the window is full.
#[derive(Debug, Clone, Default)]
struct ValidatorHistory {
    outcomes: VecDeque<bool>,
    responses: VecDeque<Duration>,
}

impl ValidatorHistory {
    fn push(&mut self, success: bool, response: Duration, window: usize) {
        self.outcomes.push_back(success);
        self.responses.push_back(response);
        while self.outcomes.len() > window {
            self.outcomes.pop_front();
            self.responses.pop_front();
        }
        debug_assert_eq!(self.outcomes.len(), self.responses.len());
    }

    /// Fraction of successful outcomes; a fresh node defaults to trusted.
    fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 1.0;
        }
        let successes = self.outcomes.iter().filter(|s| **s).count();
        successes as f64 / self.outcomes.len() as f64
    }

    /// Normalised speed score derived from the average response time.
    ///
    /// At or under [`IDEAL_RESPONSE`] the score is 1.0; at or beyond
    /// [`MAX_RESPONSE`] it is [`MIN_SPEED_SCORE`]; in between it decays
    /// linearly.
    fn speed_score(&self) -> f64 {
        if self.responses.is_empty() {
            return 1.0;
        }

        let total: Duration = self.responses.iter().sum();
        let avg = total / self.responses.len() as u32;

        if avg <= IDEAL_RESPONSE {
            1.0
        } else if avg >= MAX_RESPONSE {
            MIN_SPEED_SCORE
        } else {
            let ratio = (avg - IDEAL_RESPONSE).as_secs_f64()
                / (MAX_RESPONSE - IDEAL_RESPONSE).as_secs_f64();
            1.0 - (1.0 - MIN_SPEED_SCORE) * ratio
        }
    }

    fn len(&self) -> usize {
        self.outcomes.len()
    }
}

#[derive(Debug, Default)]
struct ScorerState {
    scores: HashMap<Address, TrustScore>,
    history: HashMap<Address, ValidatorHistory>,
    /// Validators in first-update order, for deterministic ranking snapshots
    roster: Vec<Address>,
}

/// Calculates and maintains trust scores for all validators.
///
/// A single reader/writer lock protects the score and history maps; updates
/// take the lock exclusively, reads share it. The lock is never held across
/// calls into other components.
#[derive(Debug)]
pub struct TrustScorer {
    weights: TrustWeights,
    window: usize,
    state: RwLock<ScorerState>,
}

impl TrustScorer {
    /// Creates a scorer with the given weights and history window.
    ///
    /// Returns a configuration error if the weights do not sum to one or the
    /// window is zero.
    pub fn new(weights: TrustWeights, window: usize) -> Result<Self, ConfigError> {
        weights.validate()?;
        if window == 0 {
            return Err(ConfigError::ZeroHistoryWindow);
        }

        Ok(Self {
            weights,
            window,
            state: RwLock::new(ScorerState::default()),
        })
    }

    /// Returns the configured history window.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Returns the configured component weights.
    pub fn weights(&self) -> TrustWeights {
        self.weights
    }

    /// Records one participation outcome and recomputes the score.
    ///
    /// Appends `success` and `response` to the validator's history (evicting
    /// the oldest entries once the window is full), derives the three score
    /// components, and stores the recomputed total atomically under the
    /// write lock. A validator unseen so far gets its history created here.
    ///
    /// # Panics
    ///
    /// Panics if `stake_amount` or `total_stake` is not finite; passing NaN
    /// or infinity is a caller error.
    pub fn update(
        &self,
        validator: Address,
        success: bool,
        response: Duration,
        stake_amount: f64,
        total_stake: f64,
    ) {
        assert!(
            stake_amount.is_finite() && total_stake.is_finite(),
            "stake inputs must be finite"
        );

        let mut state = self.state.write();

        if !state.history.contains_key(&validator) {
            state.roster.push(validator);
        }

        let history = state.history.entry(validator).or_default();
        history.push(success, response, self.window);

        let success_rate = history.success_rate();
        let response_speed = history.speed_score();
        let stake_weight = if total_stake > 0.0 {
            stake_amount / total_stake
        } else {
            0.0
        };

        let total = success_rate * self.weights.success
            + stake_weight * self.weights.stake
            + response_speed * self.weights.speed;

        trace!(
            validator = %validator,
            success = success,
            success_rate = success_rate,
            stake_weight = stake_weight,
            response_speed = response_speed,
            total = total,
            "Recomputed trust score"
        );

        state.scores.insert(
            validator,
            TrustScore {
                validator,
                success_rate,
                stake_weight,
                response_speed,
                total,
                last_updated: Instant::now(),
            },
        );
    }

    /// Returns the stored trust score for a validator.
    ///
    /// Unknown validators get the synthetic medium-trust default; the
    /// default is not inserted into the map.
    pub fn score(&self, validator: &Address) -> TrustScore {
        let state = self.state.read();
        state
            .scores
            .get(validator)
            .cloned()
            .unwrap_or_else(|| TrustScore::synthetic(*validator))
    }

    /// Returns up to `n` validator addresses ranked by total score
    /// descending.
    ///
    /// Ties keep the order in which validators were first scored, so the
    /// ranking is reproducible for a given update sequence.
    pub fn top(&self, n: usize) -> Vec<Address> {
        let state = self.state.read();

        let mut ranked: Vec<(Address, f64)> = state
            .roster
            .iter()
            .filter_map(|addr| state.scores.get(addr).map(|s| (*addr, s.total)))
            .collect();

        // Stable sort preserves first-update order among equal totals.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(n);
        ranked.into_iter().map(|(addr, _)| addr).collect()
    }

    /// Number of validators with recorded history.
    pub fn tracked(&self) -> usize {
        self.state.read().history.len()
    }

    /// Length of a validator's retained history (zero if unseen).
    pub fn history_len(&self, validator: &Address) -> usize {
        self.state
            .read()
            .history
            .get(validator)
            .map(|h| h.len())
            .unwrap_or(0)
    }
}

impl Default for TrustScorer {
    fn default() -> Self {
        Self {
            weights: TrustWeights::default(),
            window: DEFAULT_HISTORY_WINDOW,
            state: RwLock::new(ScorerState::default()),
        }
    }
}
