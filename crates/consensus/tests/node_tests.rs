//! Integration tests for the PBFT state machine.

use hcp_consensus::message::{ConsensusMessage, MessageKind};
use hcp_consensus::node::{NodeError, NodeIntent, PayloadHasher, PbftNode, Sha256Hasher};
use hcp_types::H256;
use std::sync::Arc;

const PAYLOAD: &[u8] = b"block-data";

fn digest_of(payload: &[u8]) -> H256 {
    Sha256Hasher.digest(payload)
}

fn node_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("node{i}")).collect()
}

/// Builds `n` fully-meshed nodes with `node0` as the fixed leader.
fn make_nodes(n: usize) -> Vec<PbftNode> {
    let ids = node_ids(n);
    ids.iter()
        .map(|id| {
            let peers: Vec<String> = ids.iter().filter(|p| *p != id).cloned().collect();
            PbftNode::new(
                id.clone(),
                peers,
                Arc::new(|_view: u64| "node0".to_string()),
                Arc::new(Sha256Hasher),
            )
            .unwrap()
        })
        .collect()
}

fn pre_prepare(seq: u64) -> ConsensusMessage {
    ConsensusMessage::pre_prepare(0, seq, digest_of(PAYLOAD), "node0", PAYLOAD.to_vec())
}

#[test]
fn test_quorum_math() {
    let nodes = make_nodes(4);
    assert_eq!(nodes[0].total_nodes(), 4);
    assert_eq!(nodes[0].max_faulty(), 1);
    assert_eq!(nodes[0].quorum(), 3);

    let seven = make_nodes(7);
    assert_eq!(seven[0].max_faulty(), 2);
    assert_eq!(seven[0].quorum(), 5);
}

#[test]
fn test_solo_node_commits_alone() {
    // N = 1, f = 0, Q = 1: the node's own messages complete every quorum
    let node = PbftNode::new(
        "solo".to_string(),
        vec![],
        Arc::new(|_view: u64| "solo".to_string()),
        Arc::new(Sha256Hasher),
    )
    .unwrap();
    assert_eq!(node.quorum(), 1);

    let msg = ConsensusMessage::pre_prepare(0, 1, digest_of(PAYLOAD), "solo", PAYLOAD.to_vec());
    node.handle_message(&msg).unwrap();

    assert!(node.is_prepared(1));
    assert!(node.is_committed(1));

    let intents = node.drain_intents();
    assert_eq!(intents.len(), 3);
    assert!(matches!(&intents[0], NodeIntent::Broadcast(m) if m.kind == MessageKind::Prepare));
    assert!(matches!(&intents[1], NodeIntent::Broadcast(m) if m.kind == MessageKind::Commit));
    assert!(matches!(
        &intents[2],
        NodeIntent::Execute { sequence: 1, payload, .. } if payload == PAYLOAD
    ));
}

#[test]
fn test_four_node_happy_path() {
    let nodes = make_nodes(4);
    let digest = digest_of(PAYLOAD);
    let (seq, view) = (1u64, 0u64);

    // Leader announcement reaches everyone
    for node in &nodes {
        node.handle_message(&pre_prepare(seq)).unwrap();
    }

    let n3 = &nodes[3];
    // Only its own prepare is logged so far
    assert!(!n3.is_prepared(seq));

    // Prepares from node0 and node1 complete the quorum of three
    n3.handle_message(&ConsensusMessage::prepare(view, seq, digest, "node0"))
        .unwrap();
    assert!(!n3.is_prepared(seq));
    n3.handle_message(&ConsensusMessage::prepare(view, seq, digest, "node1"))
        .unwrap();
    assert!(n3.is_prepared(seq));
    assert!(!n3.is_committed(seq));

    // Commits from node0 and node1 plus its own reach the quorum
    n3.handle_message(&ConsensusMessage::commit(view, seq, digest, "node0"))
        .unwrap();
    n3.handle_message(&ConsensusMessage::commit(view, seq, digest, "node1"))
        .unwrap();
    assert!(n3.is_committed(seq));
    assert!(n3.message_count(seq, view, MessageKind::Commit) >= 3);

    let intents = n3.drain_intents();
    assert!(intents
        .iter()
        .any(|i| matches!(i, NodeIntent::Execute { sequence, .. } if *sequence == seq)));
}

#[test]
fn test_digest_mismatch_blocks_quorum() {
    let nodes = make_nodes(4);
    let n3 = &nodes[3];
    let good = digest_of(PAYLOAD);
    let bad = digest_of(b"forged");

    n3.handle_message(&pre_prepare(1)).unwrap();

    // One more matching prepare (two with its own), two for a different digest
    n3.handle_message(&ConsensusMessage::prepare(0, 1, good, "node1"))
        .unwrap();
    n3.handle_message(&ConsensusMessage::prepare(0, 1, bad, "node0"))
        .unwrap();
    n3.handle_message(&ConsensusMessage::prepare(0, 1, bad, "node2"))
        .unwrap();

    // Neither digest reached the quorum of three
    assert!(!n3.is_prepared(1));
    assert_eq!(n3.message_count(1, 0, MessageKind::Prepare), 4);
}

#[test]
fn test_replayed_prepare_does_not_inflate_tally() {
    let nodes = make_nodes(4);
    let n3 = &nodes[3];
    let digest = digest_of(PAYLOAD);

    n3.handle_message(&pre_prepare(1)).unwrap();

    let prepare = ConsensusMessage::prepare(0, 1, digest, "node0");
    n3.handle_message(&prepare).unwrap();
    n3.handle_message(&prepare).unwrap();
    n3.handle_message(&prepare).unwrap();

    // node3 + node0 is still only two distinct senders
    assert!(!n3.is_prepared(1));
    assert_eq!(n3.message_count(1, 0, MessageKind::Prepare), 2);
}

#[test]
fn test_prepared_transition_fires_once() {
    let nodes = make_nodes(4);
    let n3 = &nodes[3];
    let digest = digest_of(PAYLOAD);

    n3.handle_message(&pre_prepare(1)).unwrap();
    n3.handle_message(&ConsensusMessage::prepare(0, 1, digest, "node0"))
        .unwrap();
    n3.handle_message(&ConsensusMessage::prepare(0, 1, digest, "node1"))
        .unwrap();
    assert!(n3.is_prepared(1));

    // Further prepares must not re-fire the transition or re-queue commits
    n3.handle_message(&ConsensusMessage::prepare(0, 1, digest, "node2"))
        .unwrap();

    let commits = n3
        .drain_intents()
        .into_iter()
        .filter(|i| matches!(i, NodeIntent::Broadcast(m) if m.kind == MessageKind::Commit))
        .count();
    assert_eq!(commits, 1);
}

#[test]
fn test_commits_wait_for_prepare_quorum() {
    let nodes = make_nodes(4);
    let n3 = &nodes[3];
    let digest = digest_of(PAYLOAD);

    n3.handle_message(&pre_prepare(1)).unwrap();

    // A full commit quorum arrives before any peer prepare
    for sender in ["node0", "node1", "node2"] {
        n3.handle_message(&ConsensusMessage::commit(0, 1, digest, sender))
            .unwrap();
    }
    assert!(!n3.is_committed(1));

    // Once the prepare quorum lands, the logged commits are re-tallied
    n3.handle_message(&ConsensusMessage::prepare(0, 1, digest, "node0"))
        .unwrap();
    n3.handle_message(&ConsensusMessage::prepare(0, 1, digest, "node1"))
        .unwrap();
    assert!(n3.is_prepared(1));
    assert!(n3.is_committed(1));
}

#[test]
fn test_stale_view_message_changes_nothing() {
    let nodes = make_nodes(4);
    let n3 = &nodes[3];
    n3.advance_view(2);

    let msg = ConsensusMessage::prepare(1, 1, digest_of(PAYLOAD), "node0");
    let err = n3.handle_message(&msg).unwrap_err();
    assert!(matches!(err, NodeError::ViewStale { view: 1, current: 2 }));

    assert_eq!(n3.message_count(1, 1, MessageKind::Prepare), 0);
    assert!(n3.drain_intents().is_empty());
}

#[test]
fn test_pre_prepare_from_non_leader_rejected() {
    let nodes = make_nodes(4);
    let n3 = &nodes[3];

    let msg = ConsensusMessage::pre_prepare(0, 1, digest_of(PAYLOAD), "node2", PAYLOAD.to_vec());
    let err = n3.handle_message(&msg).unwrap_err();
    assert!(matches!(err, NodeError::NotLeader { .. }));

    // Nothing was stored and no prepare was queued
    assert_eq!(n3.message_count(1, 0, MessageKind::PrePrepare), 0);
    assert!(n3.drain_intents().is_empty());
}

#[test]
fn test_pre_prepare_digest_must_match_payload() {
    let nodes = make_nodes(4);
    let msg =
        ConsensusMessage::pre_prepare(0, 1, digest_of(b"other"), "node0", PAYLOAD.to_vec());
    let err = nodes[0].handle_message(&msg).unwrap_err();
    assert!(matches!(err, NodeError::DigestMismatch));
    assert!(!nodes[0].is_prepared(1));
}

#[test]
fn test_pre_prepare_for_future_view_rejected() {
    let nodes = make_nodes(4);
    let msg = ConsensusMessage::pre_prepare(3, 1, digest_of(PAYLOAD), "node0", PAYLOAD.to_vec());
    let err = nodes[0].handle_message(&msg).unwrap_err();
    assert!(matches!(err, NodeError::WrongView { view: 3, current: 0 }));
}

#[test]
fn test_client_kinds_not_dispatched() {
    let nodes = make_nodes(4);
    let mut msg = ConsensusMessage::prepare(0, 1, digest_of(PAYLOAD), "node0");
    msg.kind = MessageKind::Request;

    let err = nodes[0].handle_message(&msg).unwrap_err();
    assert!(matches!(err, NodeError::UnexpectedKind(MessageKind::Request)));
    assert_eq!(nodes[0].message_count(1, 0, MessageKind::Request), 0);
}

#[test]
fn test_empty_sender_rejected() {
    let nodes = make_nodes(4);
    let msg = ConsensusMessage::prepare(0, 1, digest_of(PAYLOAD), "");
    assert!(matches!(
        nodes[0].handle_message(&msg),
        Err(NodeError::MissingSender)
    ));
}

#[test]
fn test_invalid_peer_sets() {
    let leader = Arc::new(|_view: u64| "node0".to_string());

    // The node itself may not appear in its peer set
    let err = PbftNode::new(
        "node0".to_string(),
        vec!["node0".to_string(), "node1".to_string()],
        leader.clone(),
        Arc::new(Sha256Hasher),
    )
    .unwrap_err();
    assert!(matches!(err, NodeError::InvalidPeers(_)));

    // Duplicate peers are rejected
    let err = PbftNode::new(
        "node0".to_string(),
        vec!["node1".to_string(), "node1".to_string()],
        leader,
        Arc::new(Sha256Hasher),
    )
    .unwrap_err();
    assert!(matches!(err, NodeError::InvalidPeers(_)));
}

#[test]
fn test_sequence_tracks_highest_pre_prepare() {
    let node = PbftNode::new(
        "solo".to_string(),
        vec![],
        Arc::new(|_view: u64| "solo".to_string()),
        Arc::new(Sha256Hasher),
    )
    .unwrap();

    for seq in [3u64, 1, 7] {
        let msg =
            ConsensusMessage::pre_prepare(0, seq, digest_of(PAYLOAD), "solo", PAYLOAD.to_vec());
        node.handle_message(&msg).unwrap();
    }
    assert_eq!(node.sequence(), 7);
}
