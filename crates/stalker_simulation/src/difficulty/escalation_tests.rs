//! Tests for DifficultyEscalation: tier selection, notifications, validation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use proptest::prelude::*;

use super::escalation::*;
use crate::error::ConfigurationError;
use crate::stats::{DifficultyTier, StatProfile};

fn profile(name: &str, move_speed: f32) -> StatProfile {
    StatProfile {
        name: name.to_string(),
        move_speed,
        ..default()
    }
}

fn three_tiers() -> Vec<DifficultyTier> {
    vec![
        DifficultyTier::new(0, 0.0, profile("A", 3.0)),
        DifficultyTier::new(1, 100.0, profile("B", 4.0)),
        DifficultyTier::new(2, 300.0, profile("C", 5.0)),
    ]
}

fn escalation() -> DifficultyEscalation {
    DifficultyEscalation::new(three_tiers()).expect("valid tiers")
}

fn counting_listener(escalation: &mut DifficultyEscalation) -> (Arc<AtomicUsize>, ListenerId) {
    let counter = Arc::new(AtomicUsize::new(0));
    let inner = counter.clone();
    let id = escalation.subscribe(Box::new(move |_change: &TierChanged| {
        inner.fetch_add(1, Ordering::SeqCst);
    }));
    (counter, id)
}

#[test]
fn test_starts_at_lowest_tier() {
    let escalation = escalation();
    assert_eq!(escalation.score(), 0.0);
    assert_eq!(escalation.current_tier().rank, 0);
    assert_eq!(escalation.current_stats().name, "A");
}

#[test]
fn test_set_points_selects_highest_reached_tier() {
    let mut escalation = escalation();
    let (counter, _) = counting_listener(&mut escalation);

    let change = escalation.set_points(250.0).expect("A → B");
    assert_eq!(change.previous_rank, 0);
    assert_eq!(change.tier.rank, 1);
    assert_eq!(escalation.current_stats().name, "B");
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let change = escalation.set_points(300.0).expect("B → C");
    assert_eq!(change.previous_rank, 1);
    assert_eq!(escalation.current_stats().name, "C");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_no_notification_within_same_tier() {
    let mut escalation = escalation();
    let (counter, _) = counting_listener(&mut escalation);

    assert!(escalation.add_points(50.0).is_none());
    assert!(escalation.add_points(49.0).is_none());
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    assert!(escalation.add_points(1.0).is_some());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(escalation.drain_pending().len() == 1);
}

#[test]
fn test_jump_over_tier_notifies_once() {
    let mut escalation = escalation();
    let (counter, _) = counting_listener(&mut escalation);

    let change = escalation.add_points(1000.0).expect("A → C");
    assert_eq!(change.tier.rank, 2);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_add_points_ignores_non_positive() {
    let mut escalation = escalation();
    escalation.add_points(120.0);

    assert!(escalation.add_points(0.0).is_none());
    assert!(escalation.add_points(-50.0).is_none());
    assert!(escalation.add_points(f32::NAN).is_none());
    assert!(escalation.add_points(f32::INFINITY).is_none());
    assert_eq!(escalation.score(), 120.0);
}

#[test]
fn test_set_points_clamps_negative() {
    let mut escalation = escalation();
    escalation.set_points(500.0);

    let change = escalation.set_points(-20.0).expect("C → A");
    assert_eq!(change.tier.rank, 0);
    assert_eq!(escalation.score(), 0.0);
}

#[test]
fn test_reset_returns_to_lowest() {
    let mut escalation = escalation();
    escalation.set_points(400.0);
    escalation.drain_pending();

    let change = escalation.reset().expect("C → A");
    assert_eq!(change.previous_rank, 2);
    assert_eq!(escalation.current_tier().rank, 0);
    assert_eq!(escalation.score(), 0.0);

    // Повторный reset — уже на нижнем tier
    assert!(escalation.reset().is_none());
    assert_eq!(escalation.drain_pending().len(), 1);
}

#[test]
fn test_unsubscribe_stops_notifications() {
    let mut escalation = escalation();
    let (counter, id) = counting_listener(&mut escalation);

    assert!(escalation.unsubscribe(id));
    assert!(!escalation.unsubscribe(id));

    escalation.set_points(150.0);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn test_listener_receives_new_profile() {
    let mut escalation = escalation();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let inner = seen.clone();
    escalation.subscribe(Box::new(move |change: &TierChanged| {
        inner.lock().unwrap().push(change.tier.profile.name.clone());
    }));

    escalation.set_points(100.0);
    escalation.set_points(350.0);

    assert_eq!(*seen.lock().unwrap(), vec!["B".to_string(), "C".to_string()]);
}

#[test]
fn test_stats_for_level_is_pure_lookup() {
    let escalation = escalation();

    assert_eq!(escalation.stats_for_level(2).map(|p| p.name.clone()), Some("C".to_string()));
    assert!(escalation.stats_for_level(7).is_none());
    assert_eq!(escalation.current_tier().rank, 0);
}

#[test]
fn test_unsorted_tiers_are_sorted_by_baseline() {
    let mut tiers = three_tiers();
    tiers.reverse();

    let mut escalation = DifficultyEscalation::new(tiers).expect("valid tiers");
    let baselines: Vec<f32> = escalation.tiers().iter().map(|t| t.baseline).collect();
    assert_eq!(baselines, vec![0.0, 100.0, 300.0]);

    escalation.set_points(150.0);
    assert_eq!(escalation.current_tier().rank, 1);
}

#[test]
fn test_score_below_every_baseline_uses_lowest_tier() {
    let escalation = DifficultyEscalation::new(vec![
        DifficultyTier::new(5, 50.0, profile("low", 3.0)),
        DifficultyTier::new(6, 80.0, profile("high", 4.0)),
    ])
    .expect("valid tiers");

    assert_eq!(escalation.current_tier().rank, 5);
}

#[test]
fn test_new_rejects_invalid_tables() {
    assert!(matches!(
        DifficultyEscalation::new(Vec::new()),
        Err(ConfigurationError::NoTiers)
    ));

    let duplicate = vec![
        DifficultyTier::new(1, 0.0, StatProfile::default()),
        DifficultyTier::new(1, 10.0, StatProfile::default()),
    ];
    assert!(matches!(
        DifficultyEscalation::new(duplicate),
        Err(ConfigurationError::DuplicateRank(1))
    ));

    let negative = vec![DifficultyTier::new(3, -1.0, StatProfile::default())];
    assert!(matches!(
        DifficultyEscalation::new(negative),
        Err(ConfigurationError::InvalidBaseline { rank: 3, .. })
    ));
}

proptest! {
    #[test]
    fn prop_add_points_keeps_score_monotonic_and_tier_consistent(
        amounts in prop::collection::vec(-50.0f32..200.0, 1..40)
    ) {
        let mut escalation = escalation();
        let mut previous = escalation.score();

        for amount in amounts {
            escalation.add_points(amount);
            prop_assert!(escalation.score() >= previous);
            previous = escalation.score();

            let score = escalation.score();
            let expected = escalation
                .tiers()
                .iter()
                .filter(|tier| tier.baseline <= score)
                .map(|tier| tier.rank)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(escalation.current_tier().rank, expected);
        }
    }
}
