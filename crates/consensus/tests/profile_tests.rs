//! Integration tests for the named consensus profiles.

use hcp_consensus::profile::{Profile, ProfileError, ProfileId};
use std::time::Duration;

#[test]
fn test_tpbft_profile_values() {
    let profile = Profile::tpbft();
    assert_eq!(profile.timeout_propose, Duration::from_millis(1000));
    assert_eq!(profile.timeout_prevote, Duration::from_millis(500));
    assert_eq!(profile.timeout_precommit, Duration::from_millis(500));
    assert_eq!(profile.timeout_commit, Duration::from_millis(500));
    assert_eq!(profile.min_validators, 4);
    assert_eq!(profile.max_validators, 7);
    profile.validate().unwrap();
}

#[test]
fn test_comparison_profiles_are_slower() {
    let tpbft = Profile::tpbft();
    let raft = Profile::raft_style();
    let hotstuff = Profile::hotstuff_style();

    raft.validate().unwrap();
    hotstuff.validate().unwrap();

    assert!(raft.timeout_commit > tpbft.timeout_commit);
    assert!(hotstuff.timeout_commit > tpbft.timeout_commit);
    assert_eq!(raft.timeout_commit, Duration::from_millis(5000));
    assert_eq!(raft.min_validators, 3);
    assert_eq!(hotstuff.timeout_propose, Duration::from_millis(2000));
}

#[test]
fn test_default_profile_is_tpbft() {
    assert_eq!(ProfileId::default(), ProfileId::Tpbft);
    assert_eq!(Profile::default(), Profile::tpbft());
    assert_eq!(ProfileId::Tpbft.profile(), Profile::tpbft());
    assert_eq!(ProfileId::RaftStyle.profile(), Profile::raft_style());
    assert_eq!(ProfileId::HotstuffStyle.profile(), Profile::hotstuff_style());
}

#[test]
fn test_zero_timeout_rejected() {
    let profile = Profile {
        timeout_prevote: Duration::ZERO,
        ..Profile::tpbft()
    };
    assert!(matches!(
        profile.validate(),
        Err(ProfileError::ZeroTimeout { name: "timeout_prevote" })
    ));
}

#[test]
fn test_inverted_bounds_rejected() {
    let profile = Profile {
        min_validators: 9,
        max_validators: 7,
        ..Profile::tpbft()
    };
    assert!(matches!(
        profile.validate(),
        Err(ProfileError::BoundsInverted { min: 9, max: 7 })
    ));
}

#[test]
fn test_fault_tolerance_bounds() {
    // min = 4 covers one Byzantine validator, not two
    let tpbft = Profile::tpbft();
    assert!(tpbft.supports_faults(0));
    assert!(tpbft.supports_faults(1));
    assert!(!tpbft.supports_faults(2));

    // min = 3 cannot cover any Byzantine validator
    let raft = Profile::raft_style();
    assert!(raft.supports_faults(0));
    assert!(!raft.supports_faults(1));
}

#[test]
fn test_profile_id_serde_kebab_case() {
    assert_eq!(serde_json::to_string(&ProfileId::Tpbft).unwrap(), "\"tpbft\"");
    assert_eq!(
        serde_json::to_string(&ProfileId::RaftStyle).unwrap(),
        "\"raft-style\""
    );
    assert_eq!(
        serde_json::to_string(&ProfileId::HotstuffStyle).unwrap(),
        "\"hotstuff-style\""
    );

    let parsed: ProfileId = serde_json::from_str("\"hotstuff-style\"").unwrap();
    assert_eq!(parsed, ProfileId::HotstuffStyle);
}
