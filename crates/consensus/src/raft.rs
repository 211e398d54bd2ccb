//! Raft-style comparison engine.
//!
//! A minimal leader-based engine sharing the
//! [`ConsensusEngine`](crate::engine::ConsensusEngine) contract, used to
//! benchmark the tPBFT engine against a Raft-flavoured baseline under the
//! same host. It keeps the term/role bookkeeping and the heartbeat ticker;
//! log replication stays out of scope.

use crate::engine::{ConsensusEngine, EngineError};
use crate::message::NodeId;
use crate::staking::{BlockCtx, CommitteeUpdate};
use crate::ticker::Ticker;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, trace};

/// Default election timeout
pub const DEFAULT_ELECTION_TIMEOUT: Duration = Duration::from_millis(150);

/// Default heartbeat interval
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Role a Raft node can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaftRole {
    /// Passive node replicating the leader
    #[default]
    Follower,
    /// Node campaigning for leadership
    Candidate,
    /// Elected leader sending heartbeats
    Leader,
}

#[derive(Debug, Default)]
struct RaftState {
    term: u64,
    voted_for: Option<NodeId>,
    role: RaftRole,
}

/// Raft-style consensus engine.
pub struct RaftEngine {
    election_timeout: Duration,
    heartbeat_interval: Duration,
    state: Arc<RwLock<RaftState>>,
    ticker: Ticker,
}

impl RaftEngine {
    /// Creates a Raft engine with the default timing.
    pub fn new() -> Self {
        Self {
            election_timeout: DEFAULT_ELECTION_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            state: Arc::new(RwLock::new(RaftState::default())),
            ticker: Ticker::new(),
        }
    }

    /// The configured election timeout.
    pub fn election_timeout(&self) -> Duration {
        self.election_timeout
    }

    /// The node's current term.
    pub fn term(&self) -> u64 {
        self.state.read().term
    }

    /// The node's current role.
    pub fn role(&self) -> RaftRole {
        self.state.read().role
    }

    /// The candidate this node voted for in the current term, if any.
    pub fn voted_for(&self) -> Option<NodeId> {
        self.state.read().voted_for.clone()
    }

    /// Whether the heartbeat ticker is running.
    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }
}

impl Default for RaftEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsensusEngine for RaftEngine {
    fn start(&self) -> Result<(), EngineError> {
        let state = Arc::clone(&self.state);
        if !self.ticker.start(self.heartbeat_interval, move || {
            let state = state.read();
            match state.role {
                RaftRole::Leader => trace!(term = state.term, "Raft heartbeat"),
                _ => trace!(term = state.term, "Raft election timer check"),
            }
        }) {
            return Err(EngineError::AlreadyRunning);
        }
        info!("Raft engine started");
        Ok(())
    }

    fn stop(&self) {
        if self.ticker.stop() {
            info!("Raft engine stopped");
        }
    }

    fn begin_block(&self, _ctx: &BlockCtx) {}

    fn end_block(&self, _ctx: &BlockCtx) -> Vec<CommitteeUpdate> {
        Vec::new()
    }
}
