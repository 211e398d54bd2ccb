//! # Trust-ranked committee selection
//!
//! This module picks the active committee for the next epoch from the full
//! candidate set, using the trust scores maintained by
//! [`TrustScorer`](crate::trust::TrustScorer).
//!
//! ## How It Works
//!
//! 1. Candidates below the trust floor are filtered out
//! 2. If too few candidates survive, the full list is used instead
//!    (liveness wins over the floor)
//! 3. Survivors are ranked by total score, ties broken by address
//! 4. 70% of the committee is taken deterministically from the top of the
//!    ranking; the rest is sampled uniformly from the remaining candidates
//!
//! The random tail keeps a small cluster of top scorers from monopolising
//! the committee while the deterministic head still biases heavily toward
//! trust. The sampler runs on a ChaCha20 RNG that the host can seed for
//! reproducible committees.

use crate::trust::TrustScorer;
use hcp_types::Address;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;
use tracing::{debug, trace};

/// Fraction of the committee filled deterministically from the top ranks
pub const HIGH_TRUST_FRACTION: f64 = 0.7;

/// Selects committee members by trust rank with a randomised tail.
pub struct ValidatorSelector {
    scorer: Arc<TrustScorer>,
    min_trust: f64,
    max_committee: usize,
    rng: Mutex<ChaCha20Rng>,
}

impl ValidatorSelector {
    /// Creates a selector drawing randomness from OS entropy.
    pub fn new(scorer: Arc<TrustScorer>, min_trust: f64, max_committee: usize) -> Self {
        Self {
            scorer,
            min_trust,
            max_committee,
            rng: Mutex::new(ChaCha20Rng::from_entropy()),
        }
    }

    /// Creates a selector with a deterministic, host-seeded RNG.
    ///
    /// Two selectors built from the same seed and fed the same update
    /// sequence produce identical committees.
    pub fn with_seed(
        scorer: Arc<TrustScorer>,
        min_trust: f64,
        max_committee: usize,
        seed: [u8; 32],
    ) -> Self {
        Self {
            scorer,
            min_trust,
            max_committee,
            rng: Mutex::new(ChaCha20Rng::from_seed(seed)),
        }
    }

    /// The trust floor candidates must clear.
    pub fn min_trust(&self) -> f64 {
        self.min_trust
    }

    /// The configured committee size cap.
    pub fn max_committee(&self) -> usize {
        self.max_committee
    }

    /// Selects up to `target` committee members from `candidates`.
    ///
    /// The result always has `min(target, candidates.len())` entries and
    /// contains each candidate at most once (candidates are assumed
    /// distinct). The top `⌊0.7 · target⌋` ranked candidates are always
    /// included; the remainder is sampled without replacement from the
    /// ranked suffix.
    pub fn select(&self, candidates: &[Address], target: usize) -> Vec<Address> {
        let mut qualified: Vec<Address> = candidates
            .iter()
            .filter(|addr| self.scorer.score(addr).total >= self.min_trust)
            .copied()
            .collect();

        // Liveness over the floor: with too few qualified validators the
        // whole candidate set stays eligible.
        if qualified.len() < target {
            trace!(
                qualified = qualified.len(),
                target = target,
                "Too few validators above the trust floor, falling back to full set"
            );
            qualified = candidates.to_vec();
        }

        let mut ranked = self.rank_by_trust(qualified);

        if ranked.len() <= target {
            debug!(
                selected = ranked.len(),
                target = target,
                "Committee selected without sampling"
            );
            return ranked;
        }

        let head = (target as f64 * HIGH_TRUST_FRACTION) as usize;
        let mut selected: Vec<Address> = ranked[..head].to_vec();

        // Partial Fisher-Yates over the suffix: a uniform sample without
        // replacement for the randomised tail.
        let tail = target - head;
        let suffix = &mut ranked[head..];
        let mut rng = self.rng.lock();
        for i in 0..tail {
            let j = rng.gen_range(i..suffix.len());
            suffix.swap(i, j);
        }
        selected.extend_from_slice(&suffix[..tail]);

        debug!(
            selected = selected.len(),
            ranked_head = head,
            sampled_tail = tail,
            "Committee selected"
        );

        selected
    }

    /// Sorts candidates by total trust score descending; ties fall back to
    /// address order so every node ranks identically.
    fn rank_by_trust(&self, candidates: Vec<Address>) -> Vec<Address> {
        let mut scored: Vec<(Address, f64)> = candidates
            .into_iter()
            .map(|addr| {
                let total = self.scorer.score(&addr).total;
                (addr, total)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        scored.into_iter().map(|(addr, _)| addr).collect()
    }
}
