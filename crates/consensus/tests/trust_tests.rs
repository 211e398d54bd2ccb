//! Integration tests for the trust scoring module.

use hcp_consensus::trust::{TrustScorer, DEFAULT_TRUST_TOTAL, MIN_SPEED_SCORE};
use hcp_consensus::TrustWeights;
use hcp_types::Address;
use std::time::Duration;

fn addr(n: u8) -> Address {
    Address::new([n; 20])
}

#[test]
fn test_unknown_validator_gets_default() {
    let scorer = TrustScorer::default();
    let validator = addr(1);

    let score = scorer.score(&validator);
    assert_eq!(score.total, DEFAULT_TRUST_TOTAL);
    assert_eq!(score.success_rate, 1.0);
    assert_eq!(score.stake_weight, 0.0);
    assert_eq!(score.response_speed, 1.0);

    // The synthetic default is not inserted
    assert_eq!(scorer.tracked(), 0);
    assert_eq!(scorer.history_len(&validator), 0);
}

#[test]
fn test_score_convergence() {
    let scorer = TrustScorer::default();
    let validator = addr(1);

    // 100% success over a full window at the ideal response time,
    // holding 10% of the total stake
    for _ in 0..100 {
        scorer.update(
            validator,
            true,
            Duration::from_millis(100),
            1_000.0,
            10_000.0,
        );
    }

    let score = scorer.score(&validator);
    assert!((score.success_rate - 1.0).abs() < f64::EPSILON);
    assert!((score.stake_weight - 0.1).abs() < f64::EPSILON);
    assert!((score.response_speed - 1.0).abs() < f64::EPSILON);
    // 0.4 * 1.0 + 0.3 * 0.1 + 0.3 * 1.0
    assert!((score.total - 0.73).abs() < 1e-9);
}

#[test]
fn test_history_window_eviction() {
    let scorer = TrustScorer::new(TrustWeights::default(), 5).unwrap();
    let validator = addr(1);

    for _ in 0..5 {
        scorer.update(validator, true, Duration::from_millis(100), 1_000.0, 10_000.0);
    }
    assert_eq!(scorer.history_len(&validator), 5);

    // One failure pushes out the oldest success: [T,T,T,T,F]
    scorer.update(validator, false, Duration::from_millis(100), 1_000.0, 10_000.0);
    assert_eq!(scorer.history_len(&validator), 5);

    let score = scorer.score(&validator);
    assert!((score.success_rate - 0.8).abs() < f64::EPSILON);
}

#[test]
fn test_zero_total_stake() {
    let scorer = TrustScorer::default();
    let validator = addr(1);

    scorer.update(validator, true, Duration::from_millis(100), 1_000.0, 0.0);

    let score = scorer.score(&validator);
    assert_eq!(score.stake_weight, 0.0);
    // Success and speed still contribute
    assert!((score.total - 0.7).abs() < 1e-9);
}

#[test]
fn test_speed_score_linear_decay() {
    let scorer = TrustScorer::default();
    let validator = addr(1);

    // 550 ms sits halfway between the 100 ms ideal and the 1 s cutoff
    scorer.update(validator, true, Duration::from_millis(550), 0.0, 0.0);

    let score = scorer.score(&validator);
    assert!((score.response_speed - 0.55).abs() < 1e-9);
}

#[test]
fn test_speed_score_floor() {
    let scorer = TrustScorer::default();
    let validator = addr(1);

    scorer.update(validator, true, Duration::from_secs(2), 0.0, 0.0);

    let score = scorer.score(&validator);
    assert!((score.response_speed - MIN_SPEED_SCORE).abs() < f64::EPSILON);
}

#[test]
fn test_scores_stay_normalised() {
    let scorer = TrustScorer::new(TrustWeights::default(), 20).unwrap();

    // A deterministic mix of outcomes, speeds, and stakes
    for i in 0..250u64 {
        let validator = addr((i % 3) as u8);
        let success = i % 4 != 0;
        let response = Duration::from_millis((i * 37) % 1_500);
        let stake = (i % 11) as f64 * 100.0;
        scorer.update(validator, success, response, stake, 1_000.0);

        let score = scorer.score(&validator);
        assert!((0.0..=1.0).contains(&score.success_rate));
        assert!((0.0..=1.0).contains(&score.stake_weight));
        assert!((0.0..=1.0).contains(&score.response_speed));
        assert!((0.0..=1.0).contains(&score.total));
        assert!(scorer.history_len(&validator) <= 20);
    }
}

#[test]
fn test_top_ranks_by_total() {
    let scorer = TrustScorer::default();
    let (good, bad, mid) = (addr(1), addr(2), addr(3));

    for i in 0..10 {
        scorer.update(good, true, Duration::ZERO, 0.0, 0.0);
        scorer.update(bad, false, Duration::ZERO, 0.0, 0.0);
        scorer.update(mid, i % 2 == 0, Duration::ZERO, 0.0, 0.0);
    }

    assert_eq!(scorer.top(2), vec![good, mid]);
    assert_eq!(scorer.top(10), vec![good, mid, bad]);
    assert!(scorer.top(0).is_empty());
}

#[test]
fn test_top_ties_keep_first_update_order() {
    let scorer = TrustScorer::default();
    let (first, second) = (addr(9), addr(1));

    scorer.update(first, true, Duration::ZERO, 0.0, 0.0);
    scorer.update(second, true, Duration::ZERO, 0.0, 0.0);

    // Identical totals: ranking keeps the order validators first appeared
    assert_eq!(scorer.top(2), vec![first, second]);
}

#[test]
#[should_panic(expected = "finite")]
fn test_non_finite_stake_panics() {
    let scorer = TrustScorer::default();
    scorer.update(addr(1), true, Duration::ZERO, f64::NAN, 100.0);
}
