//! # tPBFT Consensus Engine
//!
//! The engine binds the trust scorer, the committee selector, and the PBFT
//! state machine behind the host-facing engine contract:
//!
//! - [`ConsensusEngine::start`] / [`ConsensusEngine::stop`] run an owned
//!   maintenance ticker
//! - [`TpbftEngine::handle_message`] routes wire messages to the state
//!   machine, rejecting Pre-Prepares from proposers below the trust floor
//! - [`ConsensusEngine::begin_block`] credits the block proposer in the
//!   trust model
//! - [`ConsensusEngine::end_block`] scores every signer of the last commit,
//!   then emits the refreshed committee
//!
//! The block hooks degrade silently while no staking view is wired, which
//! keeps the engine usable during bootstrap, and individual validators that
//! cannot be resolved are skipped rather than failing the block.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hcp_types::{Address, AddressCodec};
use tracing::{debug, info, trace, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::message::{ConsensusMessage, MessageKind};
use crate::node::{NodeError, NodeIntent, PbftNode};
use crate::profile::Profile;
use crate::selector::ValidatorSelector;
use crate::staking::{
    BlockCtx, CommitteeUpdate, PubkeyAdapter, StakingView, Validator, DEFAULT_POWER_REDUCTION,
};
use crate::ticker::Ticker;
use crate::trust::TrustScorer;

/// Period of the engine's background maintenance ticker
pub const MAINTENANCE_PERIOD: Duration = Duration::from_secs(1);

/// Errors surfaced by the engine contract
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine is already running
    #[error("consensus engine already running")]
    AlreadyRunning,

    /// The engine is not running
    #[error("consensus engine not running")]
    NotRunning,

    /// A Pre-Prepare came from a proposer below the trust floor
    #[error("proposer trust score too low: {score:.3}")]
    ProposerUntrusted {
        /// The proposer's total trust score
        score: f64,
    },

    /// The message sender could not be resolved to an operator address
    #[error("malformed sender: {0}")]
    MalformedSender(String),

    /// The state machine rejected the message
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// The engine contract shared by every consensus engine in the node.
///
/// The host drives the lifecycle around its block pipeline: `begin_block`
/// ahead of transaction execution, `end_block` after it, collecting any
/// committee updates to apply.
pub trait ConsensusEngine: Send + Sync {
    /// Starts the engine's background maintenance.
    fn start(&self) -> Result<(), EngineError>;

    /// Stops the background maintenance; idempotent.
    fn stop(&self);

    /// Per-block hook invoked before transaction execution.
    fn begin_block(&self, ctx: &BlockCtx);

    /// Per-block hook invoked after transaction execution; returns the
    /// committee updates to apply (empty means no change).
    fn end_block(&self, ctx: &BlockCtx) -> Vec<CommitteeUpdate>;
}

/// The trust-enhanced PBFT consensus engine.
///
/// Owns the [`TrustScorer`], the [`ValidatorSelector`], and the local
/// [`PbftNode`] exclusively; hosts interact only through the engine's
/// operations.
pub struct TpbftEngine {
    config: EngineConfig,
    codec: AddressCodec,
    scorer: Arc<TrustScorer>,
    selector: ValidatorSelector,
    node: PbftNode,
    staking: Option<Arc<dyn StakingView>>,
    pubkeys: Arc<dyn PubkeyAdapter>,
    power_reduction: u128,
    ticker: Ticker,
}

impl TpbftEngine {
    /// Creates an engine from a validated configuration.
    ///
    /// The selector draws its randomness from OS entropy; use
    /// [`TpbftEngine::with_selector_seed`] for reproducible committees.
    pub fn new(
        config: EngineConfig,
        codec: AddressCodec,
        node: PbftNode,
        pubkeys: Arc<dyn PubkeyAdapter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let scorer = Arc::new(TrustScorer::new(config.weights, config.history_window)?);
        let selector =
            ValidatorSelector::new(Arc::clone(&scorer), config.min_trust, config.max_committee);

        Ok(Self {
            config,
            codec,
            scorer,
            selector,
            node,
            staking: None,
            pubkeys,
            power_reduction: DEFAULT_POWER_REDUCTION,
            ticker: Ticker::new(),
        })
    }

    /// Creates an engine whose selector RNG is seeded by the host.
    pub fn with_selector_seed(
        config: EngineConfig,
        codec: AddressCodec,
        node: PbftNode,
        pubkeys: Arc<dyn PubkeyAdapter>,
        seed: [u8; 32],
    ) -> Result<Self, ConfigError> {
        let mut engine = Self::new(config, codec, node, pubkeys)?;
        engine.selector = ValidatorSelector::with_seed(
            Arc::clone(&engine.scorer),
            engine.config.min_trust,
            engine.config.max_committee,
            seed,
        );
        Ok(engine)
    }

    /// Wires the staking view; the block hooks stay no-ops until this is
    /// called.
    pub fn set_staking_view(&mut self, staking: Arc<dyn StakingView>) {
        self.staking = Some(staking);
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The timing profile the engine was configured with.
    pub fn profile(&self) -> Profile {
        self.config.profile.profile()
    }

    /// The trust scorer owned by the engine.
    pub fn scorer(&self) -> &Arc<TrustScorer> {
        &self.scorer
    }

    /// The committee selector owned by the engine.
    pub fn selector(&self) -> &ValidatorSelector {
        &self.selector
    }

    /// The local PBFT node owned by the engine.
    pub fn node(&self) -> &PbftNode {
        &self.node
    }

    /// Whether the maintenance ticker is running.
    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    /// Drains the outbound intents queued by the state machine.
    pub fn drain_intents(&self) -> Vec<NodeIntent> {
        self.node.drain_intents()
    }

    /// Routes a wire message into the state machine.
    ///
    /// Pre-Prepares additionally pass the trust gate: the sender must
    /// resolve to an operator address whose total trust score clears the
    /// configured floor, otherwise the message is rejected with
    /// [`EngineError::ProposerUntrusted`] and no state changes.
    pub fn handle_message(&self, msg: &ConsensusMessage) -> Result<(), EngineError> {
        if msg.kind == MessageKind::PrePrepare {
            let proposer = self
                .codec
                .decode_operator(&msg.sender)
                .map_err(|err| EngineError::MalformedSender(err.to_string()))?;

            let score = self.scorer.score(&proposer);
            if score.total < self.selector.min_trust() {
                warn!(
                    proposer = %msg.sender,
                    score = score.total,
                    floor = self.selector.min_trust(),
                    "Rejecting pre-prepare from untrusted proposer"
                );
                return Err(EngineError::ProposerUntrusted { score: score.total });
            }
        }

        self.node.handle_message(msg)?;
        Ok(())
    }
}

impl ConsensusEngine for TpbftEngine {
    fn start(&self) -> Result<(), EngineError> {
        if !self.ticker.start(MAINTENANCE_PERIOD, || {
            // Periodic maintenance slot (trust decay hook).
            trace!("tPBFT maintenance tick");
        }) {
            return Err(EngineError::AlreadyRunning);
        }
        info!("tPBFT engine started");
        Ok(())
    }

    fn stop(&self) {
        if self.ticker.stop() {
            info!("tPBFT engine stopped");
        }
    }

    fn begin_block(&self, ctx: &BlockCtx) {
        let Some(staking) = &self.staking else {
            trace!(height = ctx.height, "begin_block skipped, staking view not wired");
            return;
        };

        // Snapshot everything the scorer needs before it locks.
        let validator = match staking.validator_by_cons_addr(&ctx.proposer) {
            Ok(validator) => validator,
            Err(err) => {
                debug!(
                    height = ctx.height,
                    proposer = %ctx.proposer,
                    error = %err,
                    "Proposer not resolvable, skipping trust credit"
                );
                return;
            }
        };
        let total_stake = staking.total_bonded_tokens().unwrap_or(0) as f64;

        self.scorer.update(
            validator.operator,
            true,
            self.config.proposer_response,
            validator.tokens as f64,
            total_stake,
        );
    }

    fn end_block(&self, ctx: &BlockCtx) -> Vec<CommitteeUpdate> {
        let Some(staking) = &self.staking else {
            trace!(height = ctx.height, "end_block skipped, staking view not wired");
            return Vec::new();
        };

        let total_stake = staking.total_bonded_tokens().unwrap_or(0) as f64;

        // Score every signer of the previous commit; a vote that made it in
        // counts as a success, an absent one as a failure.
        for vote in &ctx.votes {
            match staking.validator_by_cons_addr(&vote.validator) {
                Ok(validator) => self.scorer.update(
                    validator.operator,
                    vote.committed,
                    Duration::ZERO,
                    validator.tokens as f64,
                    total_stake,
                ),
                Err(err) => {
                    debug!(
                        height = ctx.height,
                        validator = %vote.validator,
                        error = %err,
                        "Vote signer not resolvable, skipping"
                    );
                }
            }
        }

        let all = match staking.all_validators() {
            Ok(validators) => validators,
            Err(err) => {
                warn!(height = ctx.height, error = %err, "Validator listing failed, keeping committee");
                return Vec::new();
            }
        };

        let by_operator: HashMap<Address, &Validator> =
            all.iter().map(|v| (v.operator, v)).collect();
        let candidates: Vec<Address> = all.iter().map(|v| v.operator).collect();
        let target = self.selector.max_committee().min(candidates.len());

        let selected = self.selector.select(&candidates, target);

        let mut updates = Vec::with_capacity(selected.len());
        for operator in selected {
            let Some(validator) = by_operator.get(&operator) else {
                continue;
            };
            match self.pubkeys.to_wire_pubkey(&validator.cons_pubkey) {
                Ok(pubkey) => updates.push(CommitteeUpdate {
                    pubkey,
                    power: validator.consensus_power(self.power_reduction),
                }),
                Err(err) => {
                    warn!(
                        operator = %operator,
                        error = %err,
                        "Consensus key not convertible, dropping from committee"
                    );
                }
            }
        }

        info!(
            height = ctx.height,
            candidates = candidates.len(),
            committee = updates.len(),
            "Committee refreshed"
        );

        updates
    }
}
