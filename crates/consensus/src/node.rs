//! # Three-phase PBFT state machine
//!
//! This module implements the per-node message log and phase tracking for
//! the Pre-Prepare → Prepare → Commit pipeline.
//!
//! ## Consensus Flow
//!
//! For each sequence slot within the current view:
//!
//! ```text
//! Idle ── valid PrePrepare ──▶ (log own Prepare, broadcast intent)
//!      ── Q matching Prepares ──▶ Prepared (log own Commit, broadcast intent)
//!      ── Q matching Commits ───▶ Committed (execute intent)
//! ```
//!
//! With `N = peers + 1` nodes the protocol tolerates `f = ⌊(N−1)/3⌋`
//! Byzantine nodes and requires a quorum of `Q = 2f + 1` matching votes.
//! Only votes whose digest equals the slot's Pre-Prepare digest count toward
//! a quorum, and each sender contributes at most one vote per slot and
//! phase. The node's own Prepare/Commit are logged like any peer's and count
//! toward quorum: in a solo network (`N = 1`, `Q = 1`) a node commits on
//! its own messages alone.
//!
//! The node never talks to the network itself: every outbound action is
//! queued as a [`NodeIntent`] for the host to drain and dispatch.
//!
//! ## Safety
//!
//! The `prepared`/`committed` flags are one-shot per sequence: they flip on
//! the exact message arrival that completes the quorum and never revert
//! within a view. `committed` can only follow `prepared`; Commit votes
//! arriving early stay logged and are re-tallied once the Prepare quorum
//! lands. Messages from older views are rejected without touching state.

use crate::message::{ConsensusMessage, MessageKind, NodeId};
use hcp_types::H256;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Errors surfaced while handling a consensus message
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Message belongs to a view older than the node's current view
    #[error("stale view {view}, node is at view {current}")]
    ViewStale {
        /// View carried by the message
        view: u64,
        /// The node's current view
        current: u64,
    },

    /// Pre-Prepare view does not match the node's current view
    #[error("pre-prepare view {view} does not match current view {current}")]
    WrongView {
        /// View carried by the message
        view: u64,
        /// The node's current view
        current: u64,
    },

    /// Pre-Prepare sender is not the designated leader for the view
    #[error("pre-prepare sender {sender} is not the leader for view {view}")]
    NotLeader {
        /// Sender of the rejected message
        sender: NodeId,
        /// View the message addressed
        view: u64,
    },

    /// Pre-Prepare digest does not match its payload under the configured hash
    #[error("pre-prepare digest does not match payload")]
    DigestMismatch,

    /// Message carried no sender identifier
    #[error("message carries an empty sender id")]
    MissingSender,

    /// Message kind is not dispatched by the state machine
    #[error("unexpected message kind: {0}")]
    UnexpectedKind(MessageKind),

    /// Node was constructed with an unusable peer set
    #[error("invalid peer set: {0}")]
    InvalidPeers(String),
}

/// Designates the leader for each view.
///
/// Leader rotation policy is the host's concern; the node only asks who may
/// issue Pre-Prepares for the view it is in.
pub trait LeaderSchedule: Send + Sync {
    /// Returns the node id of the leader for `view`.
    fn leader(&self, view: u64) -> NodeId;
}

impl<F> LeaderSchedule for F
where
    F: Fn(u64) -> NodeId + Send + Sync,
{
    fn leader(&self, view: u64) -> NodeId {
        self(view)
    }
}

/// Produces the digest a Pre-Prepare payload must match.
pub trait PayloadHasher: Send + Sync {
    /// Digests a proposal payload.
    fn digest(&self, payload: &[u8]) -> H256;
}

/// The default payload hasher: plain SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl PayloadHasher for Sha256Hasher {
    fn digest(&self, payload: &[u8]) -> H256 {
        let digest = Sha256::digest(payload);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        H256::new(bytes)
    }
}

/// An outbound action queued by the state machine for the host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIntent {
    /// Broadcast the message to all peers
    Broadcast(ConsensusMessage),
    /// Hand the committed payload to the execution layer
    Execute {
        /// Committed sequence slot
        sequence: u64,
        /// Digest the quorum agreed on
        digest: H256,
        /// Payload from the slot's Pre-Prepare
        payload: Vec<u8>,
    },
}

/// Message log keyed by `(sequence, view, kind)`, one message per sender.
///
/// Re-inserting for the same sender overwrites the previous entry, so
/// replayed votes never inflate a tally.
#[derive(Debug, Default)]
struct MessageLog {
    slots: HashMap<(u64, u64, MessageKind), HashMap<NodeId, ConsensusMessage>>,
}

impl MessageLog {
    fn insert(&mut self, msg: ConsensusMessage) {
        self.slots
            .entry((msg.sequence, msg.view, msg.kind))
            .or_default()
            .insert(msg.sender.clone(), msg);
    }

    fn pre_prepare(&self, sequence: u64, view: u64) -> Option<&ConsensusMessage> {
        self.slots
            .get(&(sequence, view, MessageKind::PrePrepare))
            .and_then(|senders| senders.values().next())
    }

    /// Number of logged messages of `kind` whose digest matches `digest`.
    fn count_matching(&self, sequence: u64, view: u64, kind: MessageKind, digest: &H256) -> usize {
        self.slots
            .get(&(sequence, view, kind))
            .map(|senders| senders.values().filter(|m| m.digest == *digest).count())
            .unwrap_or(0)
    }

    fn count(&self, sequence: u64, view: u64, kind: MessageKind) -> usize {
        self.slots
            .get(&(sequence, view, kind))
            .map(|senders| senders.len())
            .unwrap_or(0)
    }

    /// Drops every entry below `view`.
    fn prune_below_view(&mut self, view: u64) {
        self.slots.retain(|(_, v, _), _| *v >= view);
    }
}

#[derive(Debug, Default)]
struct NodeState {
    view: u64,
    sequence: u64,
    log: MessageLog,
    prepared: HashSet<u64>,
    committed: HashSet<u64>,
    outbox: VecDeque<NodeIntent>,
}

/// A single node's view of the tPBFT protocol.
///
/// One reader/writer lock covers the log, the phase flags, and the outbound
/// queue; `handle_message` holds it exclusively for the whole dispatch, so
/// concurrent deliveries serialise and each one-shot transition fires on
/// exactly one arrival.
pub struct PbftNode {
    id: NodeId,
    peers: Vec<NodeId>,
    quorum: usize,
    leader: Arc<dyn LeaderSchedule>,
    hasher: Arc<dyn PayloadHasher>,
    state: RwLock<NodeState>,
}

impl std::fmt::Debug for PbftNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PbftNode")
            .field("id", &self.id)
            .field("peers", &self.peers)
            .field("quorum", &self.quorum)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PbftNode {
    /// Creates a node with the given identity, peer set, leader schedule,
    /// and payload hasher.
    ///
    /// Returns an error if the id is empty or the peer set repeats an entry
    /// or contains the node itself.
    pub fn new(
        id: impl Into<NodeId>,
        peers: Vec<NodeId>,
        leader: Arc<dyn LeaderSchedule>,
        hasher: Arc<dyn PayloadHasher>,
    ) -> Result<Self, NodeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(NodeError::InvalidPeers("node id is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for peer in &peers {
            if peer == &id {
                return Err(NodeError::InvalidPeers(format!(
                    "peer set contains the node itself ({id})"
                )));
            }
            if !seen.insert(peer.clone()) {
                return Err(NodeError::InvalidPeers(format!("duplicate peer {peer}")));
            }
        }

        let total = peers.len() + 1;
        let faulty = (total - 1) / 3;
        assert!(total >= 3 * faulty + 1, "quorum math requires N >= 3f + 1");

        Ok(Self {
            id,
            peers,
            quorum: 2 * faulty + 1,
            leader,
            hasher,
            state: RwLock::new(NodeState::default()),
        })
    }

    /// The node's identifier.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// The node's peers (itself excluded).
    pub fn peers(&self) -> &[NodeId] {
        &self.peers
    }

    /// Total network size, the node included.
    pub fn total_nodes(&self) -> usize {
        self.peers.len() + 1
    }

    /// Number of Byzantine nodes the network tolerates.
    pub fn max_faulty(&self) -> usize {
        (self.total_nodes() - 1) / 3
    }

    /// Votes required for a phase transition (`2f + 1`).
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// The view the node is currently in.
    pub fn view(&self) -> u64 {
        self.state.read().view
    }

    /// Highest sequence slot seen in a valid Pre-Prepare.
    pub fn sequence(&self) -> u64 {
        self.state.read().sequence
    }

    /// Whether the slot reached its Prepare quorum.
    pub fn is_prepared(&self, sequence: u64) -> bool {
        self.state.read().prepared.contains(&sequence)
    }

    /// Whether the slot reached its Commit quorum.
    pub fn is_committed(&self, sequence: u64) -> bool {
        self.state.read().committed.contains(&sequence)
    }

    /// Number of logged messages for a slot and phase (diagnostics).
    pub fn message_count(&self, sequence: u64, view: u64, kind: MessageKind) -> usize {
        self.state.read().log.count(sequence, view, kind)
    }

    /// Drains the queued outbound intents.
    pub fn drain_intents(&self) -> Vec<NodeIntent> {
        self.state.write().outbox.drain(..).collect()
    }

    /// Processes an incoming consensus message.
    ///
    /// Messages from views older than the node's are rejected without state
    /// change; Pre-Prepares are validated (view, leader, digest) before
    /// anything is logged; Prepare/Commit votes are logged and tallied.
    pub fn handle_message(&self, msg: &ConsensusMessage) -> Result<(), NodeError> {
        if msg.sender.is_empty() {
            return Err(NodeError::MissingSender);
        }

        let mut state = self.state.write();

        if msg.view < state.view {
            trace!(
                view = msg.view,
                current = state.view,
                sender = %msg.sender,
                "Dropping stale-view message"
            );
            return Err(NodeError::ViewStale {
                view: msg.view,
                current: state.view,
            });
        }

        match msg.kind {
            MessageKind::PrePrepare => self.on_pre_prepare(&mut state, msg),
            MessageKind::Prepare => {
                state.log.insert(msg.clone());
                self.tally_prepares(&mut state, msg.sequence, msg.view);
                Ok(())
            }
            MessageKind::Commit => {
                state.log.insert(msg.clone());
                self.tally_commits(&mut state, msg.sequence, msg.view);
                Ok(())
            }
            MessageKind::Request | MessageKind::Reply => {
                Err(NodeError::UnexpectedKind(msg.kind))
            }
        }
    }

    /// Advances the node to `view`, dropping all logged messages from older
    /// views. A no-op if `view` is not ahead of the current one.
    ///
    /// View rotation policy itself (when to advance, and to whom) is driven
    /// externally.
    pub fn advance_view(&self, view: u64) {
        let mut state = self.state.write();
        if view <= state.view {
            return;
        }
        debug!(from = state.view, to = view, "Advancing view");
        state.view = view;
        state.log.prune_below_view(view);
    }

    fn on_pre_prepare(&self, state: &mut NodeState, msg: &ConsensusMessage) -> Result<(), NodeError> {
        if msg.view != state.view {
            return Err(NodeError::WrongView {
                view: msg.view,
                current: state.view,
            });
        }

        let leader = self.leader.leader(msg.view);
        if msg.sender != leader {
            return Err(NodeError::NotLeader {
                sender: msg.sender.clone(),
                view: msg.view,
            });
        }

        if self.hasher.digest(&msg.payload) != msg.digest {
            return Err(NodeError::DigestMismatch);
        }

        state.log.insert(msg.clone());
        state.sequence = state.sequence.max(msg.sequence);

        debug!(
            node = %self.id,
            sequence = msg.sequence,
            view = msg.view,
            digest = %msg.digest.short_hex(),
            "Accepted pre-prepare"
        );

        // Answer with our own prepare; it is logged like any peer's and
        // counts toward the quorum.
        let prepare = ConsensusMessage::prepare(msg.view, msg.sequence, msg.digest, self.id.clone());
        state.log.insert(prepare.clone());
        state.outbox.push_back(NodeIntent::Broadcast(prepare));

        self.tally_prepares(state, msg.sequence, msg.view);
        Ok(())
    }

    fn tally_prepares(&self, state: &mut NodeState, sequence: u64, view: u64) {
        let Some(digest) = state.log.pre_prepare(sequence, view).map(|m| m.digest) else {
            return;
        };

        let votes = state
            .log
            .count_matching(sequence, view, MessageKind::Prepare, &digest);
        if votes < self.quorum || state.prepared.contains(&sequence) {
            return;
        }

        state.prepared.insert(sequence);
        debug!(
            node = %self.id,
            sequence = sequence,
            view = view,
            votes = votes,
            quorum = self.quorum,
            "Prepare quorum reached"
        );

        let commit = ConsensusMessage::commit(view, sequence, digest, self.id.clone());
        state.log.insert(commit.clone());
        state.outbox.push_back(NodeIntent::Broadcast(commit));

        // Commits may have arrived ahead of the prepare quorum.
        self.tally_commits(state, sequence, view);
    }

    fn tally_commits(&self, state: &mut NodeState, sequence: u64, view: u64) {
        // A slot only commits once its prepare quorum has been observed.
        if !state.prepared.contains(&sequence) || state.committed.contains(&sequence) {
            return;
        }

        let Some(digest) = state.log.pre_prepare(sequence, view).map(|m| m.digest) else {
            return;
        };

        let votes = state
            .log
            .count_matching(sequence, view, MessageKind::Commit, &digest);
        if votes < self.quorum {
            return;
        }

        state.committed.insert(sequence);

        let payload = state
            .log
            .pre_prepare(sequence, view)
            .map(|m| m.payload.clone())
            .unwrap_or_default();

        info!(
            node = %self.id,
            sequence = sequence,
            view = view,
            votes = votes,
            digest = %digest.short_hex(),
            "Commit quorum reached"
        );

        state.outbox.push_back(NodeIntent::Execute {
            sequence,
            digest,
            payload,
        });
    }
}
