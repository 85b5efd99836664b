//! Transition table: the immutable `(event, source) -> destination` mapping.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Declarative description of one named transition.
///
/// A transition has one or more legal source states and a single destination.
/// If the instance is in one of the sources when the event fires, it ends up
/// in the destination, with all matching callbacks run along the way.
///
/// Descriptors are serde-derived so transition tables can be loaded from
/// declarative config:
///
/// ```rust
/// use turnstile::TransitionDesc;
///
/// let desc: TransitionDesc = serde_json::from_str(
///     r#"{"name": "open", "sources": ["closed"], "destination": "open"}"#,
/// ).unwrap();
/// assert_eq!(desc.name, "open");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDesc {
    /// Event name used when requesting the transition.
    pub name: String,
    /// Source states the instance must be in for the event to apply.
    pub sources: Vec<String>,
    /// State the instance ends up in when the transition completes.
    pub destination: String,
}

impl TransitionDesc {
    /// Convenience constructor for building tables in code.
    pub fn new<N, S, I, D>(name: N, sources: I, destination: D) -> Self
    where
        N: Into<String>,
        S: Into<String>,
        I: IntoIterator<Item = S>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            sources: sources.into_iter().map(Into::into).collect(),
            destination: destination.into(),
        }
    }
}

/// Key identifying one legal transition: an event fired from one source state.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TransitionKey {
    pub(crate) event: String,
    pub(crate) source: String,
}

/// Immutable lookup structure built once from a list of descriptors.
///
/// Also retains the sets of all event and state names seen during the build;
/// callback classification and builder target validation run against those.
#[derive(Default)]
pub(crate) struct TransitionTable {
    map: HashMap<TransitionKey, String>,
    events: HashSet<String>,
    states: HashSet<String>,
}

impl TransitionTable {
    /// Build the table. Duplicate `(event, source)` pairs are legal; the
    /// last descriptor wins.
    pub(crate) fn build(descriptors: Vec<TransitionDesc>) -> Self {
        let mut table = Self::default();
        for desc in descriptors {
            for source in &desc.sources {
                table.map.insert(
                    TransitionKey {
                        event: desc.name.clone(),
                        source: source.clone(),
                    },
                    desc.destination.clone(),
                );
                table.states.insert(source.clone());
            }
            table.states.insert(desc.destination.clone());
            table.events.insert(desc.name);
        }
        table
    }

    pub(crate) fn destination(&self, event: &str, source: &str) -> Option<&str> {
        self.map
            .get(&TransitionKey {
                event: event.to_string(),
                source: source.to_string(),
            })
            .map(String::as_str)
    }

    pub(crate) fn has_event(&self, event: &str) -> bool {
        self.events.contains(event)
    }

    pub(crate) fn has_state(&self, state: &str) -> bool {
        self.states.contains(state)
    }

    /// Event names legal from the given state, in no particular order.
    pub(crate) fn events_from(&self, state: &str) -> Vec<String> {
        self.map
            .keys()
            .filter(|key| key.source == state)
            .map(|key| key.event.clone())
            .collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&TransitionKey, &str)> {
        self.map.iter().map(|(key, dst)| (key, dst.as_str()))
    }
}
