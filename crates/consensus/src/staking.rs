//! Host-facing interfaces: staking reads, pubkey conversion, block context.
//!
//! The engine only needs four read operations from the staking module, so
//! that surface is captured as the narrow [`StakingView`] capability and
//! injected at wiring time. Likewise, converting a consensus public key to
//! its wire representation is behind [`PubkeyAdapter`]; the engine never
//! touches key material beyond passing bytes through.

use hcp_types::{Address, ConsAddress};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Default divisor turning bonded tokens into consensus power
pub const DEFAULT_POWER_REDUCTION: u128 = 1_000_000;

/// Errors surfaced by the injected host capabilities
#[derive(Debug, thiserror::Error)]
pub enum StakingError {
    /// No validator is known under the queried address
    #[error("validator not found")]
    NotFound,

    /// The staking module cannot serve reads right now
    #[error("staking view unavailable")]
    Unavailable,

    /// The consensus public key uses a scheme the adapter does not support
    #[error("unsupported consensus key ({0} bytes)")]
    UnsupportedKey(usize),
}

/// A bonded validator as seen by the consensus subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Operator (staking) address
    pub operator: Address,
    /// Bonded token amount
    pub tokens: u128,
    /// Raw consensus public key bytes
    pub cons_pubkey: Vec<u8>,
}

impl Validator {
    /// Creates a validator record.
    pub fn new(operator: Address, tokens: u128, cons_pubkey: Vec<u8>) -> Self {
        Self {
            operator,
            tokens,
            cons_pubkey,
        }
    }

    /// The consensus address derived from the validator's consensus key.
    pub fn cons_address(&self) -> ConsAddress {
        ConsAddress::from_pubkey(&self.cons_pubkey)
    }

    /// Voting power: bonded tokens divided by the power reduction.
    pub fn consensus_power(&self, power_reduction: u128) -> i64 {
        if power_reduction == 0 {
            return 0;
        }
        (self.tokens / power_reduction) as i64
    }
}

/// Read access to the staking module.
///
/// Implementations may block; the engine takes whatever snapshot it needs
/// before acquiring its own locks.
pub trait StakingView: Send + Sync {
    /// Looks up a validator by consensus address.
    fn validator_by_cons_addr(&self, cons_addr: &ConsAddress) -> Result<Validator, StakingError>;

    /// Looks up a validator by operator address.
    fn validator_by_operator(&self, operator: &Address) -> Result<Validator, StakingError>;

    /// Lists all known validators.
    fn all_validators(&self) -> Result<Vec<Validator>, StakingError>;

    /// Total bonded tokens across all validators.
    fn total_bonded_tokens(&self) -> Result<u128, StakingError>;
}

/// A consensus public key in its wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WirePublicKey {
    /// Ed25519 key (32 bytes)
    Ed25519(Vec<u8>),
    /// Secp256k1 compressed key (33 bytes)
    Secp256k1(Vec<u8>),
}

/// Converts raw consensus key bytes into their wire representation.
pub trait PubkeyAdapter: Send + Sync {
    /// Converts `cons_pubkey` to a [`WirePublicKey`].
    fn to_wire_pubkey(&self, cons_pubkey: &[u8]) -> Result<WirePublicKey, StakingError>;
}

/// The default adapter: treats every 32-byte key as Ed25519 and every
/// 33-byte key as compressed Secp256k1.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthPrefixAdapter;

impl PubkeyAdapter for LengthPrefixAdapter {
    fn to_wire_pubkey(&self, cons_pubkey: &[u8]) -> Result<WirePublicKey, StakingError> {
        match cons_pubkey.len() {
            32 => Ok(WirePublicKey::Ed25519(cons_pubkey.to_vec())),
            33 => Ok(WirePublicKey::Secp256k1(cons_pubkey.to_vec())),
            len => Err(StakingError::UnsupportedKey(len)),
        }
    }
}

/// A committee membership change emitted by the end-block hook.
///
/// An empty update list means "no change".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeUpdate {
    /// Wire form of the member's consensus public key
    pub pubkey: WirePublicKey,
    /// Voting power granted to the member
    pub power: i64,
}

/// One validator's signing record for the last block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    /// Consensus address of the voting validator
    pub validator: ConsAddress,
    /// Whether the validator's signature made it into the commit
    pub committed: bool,
}

/// Per-block context handed to the engine's block hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockCtx {
    /// Consensus address of the block proposer
    pub proposer: ConsAddress,
    /// Signing records for the previous block's commit
    pub votes: Vec<VoteInfo>,
    /// Block height
    pub height: u64,
    /// Block timestamp
    pub time: SystemTime,
}

impl BlockCtx {
    /// Creates a block context.
    pub fn new(proposer: ConsAddress, votes: Vec<VoteInfo>, height: u64, time: SystemTime) -> Self {
        Self {
            proposer,
            votes,
            height,
            time,
        }
    }
}
