//! Wire message types for the tPBFT protocol.
//!
//! This module defines the messages exchanged between consensus nodes:
//! - [`MessageKind`] - the protocol phase a message belongs to
//! - [`ConsensusMessage`] - the generic envelope carried by every phase
//! - [`ClientRequest`] / [`ClientReply`] - the client-facing message bodies
//!
//! Encoding on the wire is the host's concern; the state machine only relies
//! on the typed fields and on byte equality of digests.

use hcp_types::H256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier a node is known by on the consensus network.
///
/// Node identifiers live in the same namespace as rendered operator
/// addresses, so the engine can recover a proposer's staking identity from
/// the sender of a message.
pub type NodeId = String;

/// The protocol phase a consensus message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Leader's proposal announcement for a sequence slot
    PrePrepare,
    /// Acknowledgement that a valid proposal was seen
    Prepare,
    /// Commitment after a prepare quorum was observed
    Commit,
    /// Client request (not dispatched by the state machine)
    Request,
    /// Reply to a client (not dispatched by the state machine)
    Reply,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::PrePrepare => write!(f, "pre-prepare"),
            MessageKind::Prepare => write!(f, "prepare"),
            MessageKind::Commit => write!(f, "commit"),
            MessageKind::Request => write!(f, "request"),
            MessageKind::Reply => write!(f, "reply"),
        }
    }
}

/// A generic tPBFT message.
///
/// Every phase shares the same envelope: the phase tag, the `(view,
/// sequence)` slot it addresses, the proposal digest, the sender, an opaque
/// signature, and an opaque payload (only Pre-Prepare carries one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusMessage {
    /// Protocol phase
    pub kind: MessageKind,
    /// Leader epoch the message belongs to
    pub view: u64,
    /// Proposal slot within the view
    pub sequence: u64,
    /// Digest of the proposal payload
    pub digest: H256,
    /// Sender node identifier
    pub sender: NodeId,
    /// Sender's signature over the message (verified by the host)
    pub signature: Vec<u8>,
    /// Proposal payload (block bytes for Pre-Prepare, empty otherwise)
    pub payload: Vec<u8>,
}

impl ConsensusMessage {
    /// Creates a Pre-Prepare announcing `payload` with `digest` for the slot.
    pub fn pre_prepare(
        view: u64,
        sequence: u64,
        digest: H256,
        sender: impl Into<NodeId>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            kind: MessageKind::PrePrepare,
            view,
            sequence,
            digest,
            sender: sender.into(),
            signature: Vec::new(),
            payload,
        }
    }

    /// Creates a Prepare vote for the slot.
    pub fn prepare(view: u64, sequence: u64, digest: H256, sender: impl Into<NodeId>) -> Self {
        Self {
            kind: MessageKind::Prepare,
            view,
            sequence,
            digest,
            sender: sender.into(),
            signature: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Creates a Commit vote for the slot.
    pub fn commit(view: u64, sequence: u64, digest: H256, sender: impl Into<NodeId>) -> Self {
        Self {
            kind: MessageKind::Commit,
            view,
            sequence,
            digest,
            sender: sender.into(),
            signature: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Attaches a signature to the message.
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = signature;
        self
    }
}

/// A client request submitted for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Opaque operation bytes
    pub operation: Vec<u8>,
    /// Client-side timestamp for request uniqueness
    pub timestamp: i64,
    /// Identifier of the submitting client
    pub client_id: String,
}

/// A reply returned to a client once its request executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientReply {
    /// View in which the request executed
    pub view: u64,
    /// Timestamp echoed from the request
    pub timestamp: i64,
    /// Identifier of the client being answered
    pub client_id: String,
    /// Identifier of the replying node
    pub node_id: NodeId,
    /// Execution result bytes
    pub result: Vec<u8>,
}
