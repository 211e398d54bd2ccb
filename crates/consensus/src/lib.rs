//! # HCP Consensus
//!
//! Trust-enhanced PBFT (tPBFT) consensus engine for the HCP chain.
//!
//! This crate fuses classical three-phase PBFT agreement with a continuously
//! recomputed trust score per validator. The score filters and ranks the
//! validators admitted to the active committee each epoch, and proposals
//! from leaders below the trust floor are rejected outright.
//!
//! ## Consensus Flow
//!
//! ```text
//! Sequence s, View v:
//!
//! ┌──────────────┐
//! │ PRE-PREPARE  │  leader broadcasts PrePrepare{v, s, digest, payload}
//! │              │  replicas check: leader(v), digest == hash(payload),
//! │              │  proposer trust >= floor
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   PREPARE    │  every node broadcasts Prepare{v, s, digest}
//! │              │  ON 2f+1 matching prepares: prepared[s] = true
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │    COMMIT    │  broadcast Commit{v, s, digest}
//! │              │  ON 2f+1 matching commits: committed[s] = true,
//! │              │  hand payload to execution
//! └──────────────┘
//! ```
//!
//! ## Trust Model
//!
//! Each block feeds evidence into the [`trust::TrustScorer`]: the proposer
//! is credited in `begin_block`, every signer of the previous commit is
//! scored in `end_block`. The [`selector::ValidatorSelector`] then rebuilds
//! the committee (70% highest-trust validators, the rest sampled randomly)
//! so the committee never fossilises.
//!
//! ## Fault Tolerance
//!
//! With `N = 3f + 1` nodes the protocol tolerates `f` Byzantine validators
//! and requires `Q = 2f + 1` matching votes per phase transition.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hcp_consensus::{
//!     ConsensusEngine, EngineConfig, PbftNode, Sha256Hasher, TpbftEngine,
//! };
//! use hcp_consensus::staking::LengthPrefixAdapter;
//! use hcp_types::AddressCodec;
//! use std::sync::Arc;
//!
//! let codec = AddressCodec::new("hcpvaloper", "hcpvalcons");
//! let leader = Arc::new(|_view: u64| "hcpvaloper1...".to_string());
//! let node = PbftNode::new(
//!     "hcpvaloper1...".to_string(),
//!     vec![/* peers */],
//!     leader,
//!     Arc::new(Sha256Hasher),
//! )?;
//!
//! let engine = TpbftEngine::new(
//!     EngineConfig::default(),
//!     codec,
//!     node,
//!     Arc::new(LengthPrefixAdapter),
//! )?;
//! engine.start()?;
//! ```
//!
//! Two comparison baselines, [`raft::RaftEngine`] and
//! [`hotstuff::HotStuffEngine`], share the [`ConsensusEngine`] contract for
//! benchmarking runs; the named [`profile::Profile`]s carry their timing
//! parameters.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod hotstuff;
pub mod message;
pub mod node;
pub mod profile;
pub mod raft;
pub mod selector;
pub mod staking;
mod ticker;
pub mod trust;

// Re-export main types at crate root for convenience
pub use config::{
    ConfigError, EngineConfig, TrustWeights, DEFAULT_HISTORY_WINDOW, DEFAULT_MAX_COMMITTEE,
    DEFAULT_MIN_TRUST, DEFAULT_SPEED_WEIGHT, DEFAULT_STAKE_WEIGHT, DEFAULT_SUCCESS_WEIGHT,
    WEIGHT_SUM_TOLERANCE,
};
pub use engine::{ConsensusEngine, EngineError, TpbftEngine, MAINTENANCE_PERIOD};
pub use hotstuff::HotStuffEngine;
pub use message::{ClientReply, ClientRequest, ConsensusMessage, MessageKind, NodeId};
pub use node::{
    LeaderSchedule, NodeError, NodeIntent, PayloadHasher, PbftNode, Sha256Hasher,
};
pub use profile::{Profile, ProfileError, ProfileId};
pub use raft::{RaftEngine, RaftRole};
pub use selector::{ValidatorSelector, HIGH_TRUST_FRACTION};
pub use staking::{
    BlockCtx, CommitteeUpdate, LengthPrefixAdapter, PubkeyAdapter, StakingError, StakingView,
    Validator, VoteInfo, WirePublicKey, DEFAULT_POWER_REDUCTION,
};
pub use trust::{
    TrustScore, TrustScorer, DEFAULT_TRUST_TOTAL, IDEAL_RESPONSE, MAX_RESPONSE, MIN_SPEED_SCORE,
};
