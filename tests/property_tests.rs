//! Property-based tests for the transition engine.
//!
//! These tests use proptest to verify the engine's contract over many
//! randomly generated transition tables.

use proptest::prelude::*;
use std::collections::HashMap;
use turnstile::{Machine, TransitionDesc, TransitionError};

fn state_name() -> impl Strategy<Value = String> {
    (0..4u8).prop_map(|i| format!("s{i}"))
}

fn event_name() -> impl Strategy<Value = String> {
    (0..4u8).prop_map(|i| format!("e{i}"))
}

prop_compose! {
    fn arbitrary_desc()(
        name in event_name(),
        sources in prop::collection::vec(state_name(), 1..3),
        destination in state_name(),
    ) -> TransitionDesc {
        TransitionDesc::new(name, sources, destination)
    }
}

fn arbitrary_table() -> impl Strategy<Value = Vec<TransitionDesc>> {
    prop::collection::vec(arbitrary_desc(), 0..8)
}

/// The destination the table resolves for `(event, source)`: the last
/// matching descriptor wins.
fn expected_destination(descs: &[TransitionDesc], event: &str, source: &str) -> Option<String> {
    descs
        .iter()
        .rev()
        .find(|d| d.name == event && d.sources.iter().any(|s| s == source))
        .map(|d| d.destination.clone())
}

proptest! {
    #[test]
    fn new_instance_starts_where_told(
        descs in arbitrary_table(),
        initial in state_name(),
    ) {
        let machine = Machine::new(descs, HashMap::new());
        let instance = machine.new_instance(&initial);
        prop_assert_eq!(instance.current(), initial);
    }

    #[test]
    fn transition_outcome_matches_the_table(
        descs in arbitrary_table(),
        initial in state_name(),
        event in event_name(),
    ) {
        let machine = Machine::new(descs.clone(), HashMap::new());
        let instance = machine.new_instance(&initial);

        let expected = expected_destination(&descs, &event, &initial);
        let event_exists = descs.iter().any(|d| d.name == event);

        match instance.transition(&machine, &event, Vec::new()) {
            Ok(()) => {
                prop_assert_eq!(Some(instance.current()), expected);
            }
            Err(TransitionError::NoTransition(_)) => {
                prop_assert_eq!(expected.as_deref(), Some(initial.as_str()));
                prop_assert_eq!(instance.current(), initial.clone());
            }
            Err(TransitionError::InvalidEvent { .. }) => {
                prop_assert!(expected.is_none());
                prop_assert!(event_exists);
                prop_assert_eq!(instance.current(), initial.clone());
            }
            Err(TransitionError::UnknownEvent { .. }) => {
                prop_assert!(!event_exists);
                prop_assert_eq!(instance.current(), initial.clone());
            }
            Err(other) => {
                prop_assert!(false, "unexpected error: {}", other);
            }
        }
    }

    #[test]
    fn queries_never_mutate(
        descs in arbitrary_table(),
        initial in state_name(),
        event in event_name(),
    ) {
        let machine = Machine::new(descs, HashMap::new());
        let instance = machine.new_instance(&initial);

        let can_first = instance.can(&machine, &event);
        for _ in 0..3 {
            prop_assert_eq!(instance.current(), initial.clone());
            prop_assert!(instance.is(&initial));
            prop_assert_eq!(instance.can(&machine, &event), can_first);
        }
    }

    #[test]
    fn available_transitions_agree_with_can(
        descs in arbitrary_table(),
        initial in state_name(),
    ) {
        let machine = Machine::new(descs, HashMap::new());
        let instance = machine.new_instance(&initial);

        for event in instance.available_transitions(&machine) {
            prop_assert!(instance.can(&machine, &event));
        }
    }

    #[test]
    fn desc_roundtrip_serialization(desc in arbitrary_desc()) {
        let json = serde_json::to_string(&desc).unwrap();
        let deserialized: TransitionDesc = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(desc, deserialized);
    }

    #[test]
    fn completed_transitions_always_reach_the_log(
        descs in arbitrary_table(),
        initial in state_name(),
        events in prop::collection::vec(event_name(), 0..6),
    ) {
        let machine = Machine::new(descs, HashMap::new());
        let instance = machine.new_instance(&initial);

        let mut completed = 0usize;
        for event in &events {
            if instance.transition(&machine, event, Vec::new()).is_ok() {
                completed += 1;
            }
        }

        let log = instance.history();
        prop_assert_eq!(log.len(), completed);
        for record in log.records() {
            prop_assert_ne!(&record.from, &record.to);
        }
    }
}
