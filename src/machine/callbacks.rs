//! Callback registry: routing lifecycle hooks to events and states.

use crate::instance::{Instance, TransitionContext};
use crate::machine::table::TransitionTable;
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle callback invoked during a transition attempt.
///
/// Callbacks receive the instance being transitioned and the mutable context
/// of the attempt. Before and leave hooks may call
/// [`TransitionContext::cancel`] or (leave hooks only, meaningfully)
/// [`TransitionContext::mark_async`] on the context.
///
/// Reference-counted so a staged deferred completion can hold on to the
/// enter/after hooks it still has to run.
pub type Callback = Arc<dyn Fn(&Instance, &mut TransitionContext) + Send + Sync>;

/// Wrap a closure as a [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&Instance, &mut TransitionContext) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The point in the transition protocol at which a callback fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Before any state change, may cancel.
    BeforeTransition,
    /// While still in the source state, may cancel or defer.
    LeaveState,
    /// After the swap to the destination state.
    EnterState,
    /// Last, after enter hooks.
    AfterTransition,
}

/// Registry key: a hook kind plus its target event or state name.
/// `target == ""` is the generic, untargeted form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CallbackKey {
    pub(crate) target: String,
    pub(crate) kind: CallbackKind,
}

impl CallbackKey {
    pub(crate) fn targeted(target: &str, kind: CallbackKind) -> Self {
        Self {
            target: target.to_string(),
            kind,
        }
    }

    pub(crate) fn generic(kind: CallbackKind) -> Self {
        Self {
            target: String::new(),
            kind,
        }
    }
}

/// Immutable mapping from [`CallbackKey`] to callback.
#[derive(Default)]
pub(crate) struct CallbackRegistry {
    callbacks: HashMap<CallbackKey, Callback>,
}

impl CallbackRegistry {
    /// Classify a string-keyed callback map against the table's known event
    /// and state names.
    ///
    /// Recognized shapes: `before_<event>`, `before_transition`,
    /// `leave_<state>`, `leave_state`, `enter_<state>`, `enter_state`,
    /// `after_<event>`, `after_transition`, a bare state name (enter hook)
    /// or a bare event name (after hook). Anything else never fires; those
    /// raw names are returned, sorted, so callers can surface a diagnostic.
    pub(crate) fn classify(
        raw: HashMap<String, Callback>,
        table: &TransitionTable,
    ) -> (Self, Vec<String>) {
        let mut registry = Self::default();
        let mut ignored = Vec::new();

        for (name, cb) in raw {
            match classify_name(&name, table) {
                Some(key) => {
                    registry.callbacks.insert(key, cb);
                }
                None => ignored.push(name),
            }
        }

        ignored.sort();
        (registry, ignored)
    }

    pub(crate) fn insert(&mut self, key: CallbackKey, cb: Callback) {
        self.callbacks.insert(key, cb);
    }

    pub(crate) fn get(&self, target: &str, kind: CallbackKind) -> Option<&Callback> {
        self.callbacks.get(&CallbackKey::targeted(target, kind))
    }

    pub(crate) fn get_generic(&self, kind: CallbackKind) -> Option<&Callback> {
        self.callbacks.get(&CallbackKey::generic(kind))
    }
}

fn classify_name(name: &str, table: &TransitionTable) -> Option<CallbackKey> {
    if let Some(rest) = name.strip_prefix("before_") {
        return prefixed_key(rest, "transition", CallbackKind::BeforeTransition, |t| {
            table.has_event(t)
        });
    }
    if let Some(rest) = name.strip_prefix("leave_") {
        return prefixed_key(rest, "state", CallbackKind::LeaveState, |t| {
            table.has_state(t)
        });
    }
    if let Some(rest) = name.strip_prefix("enter_") {
        return prefixed_key(rest, "state", CallbackKind::EnterState, |t| {
            table.has_state(t)
        });
    }
    if let Some(rest) = name.strip_prefix("after_") {
        return prefixed_key(rest, "transition", CallbackKind::AfterTransition, |t| {
            table.has_event(t)
        });
    }

    // Bare names: states bind tighter than events.
    if table.has_state(name) {
        Some(CallbackKey::targeted(name, CallbackKind::EnterState))
    } else if table.has_event(name) {
        Some(CallbackKey::targeted(name, CallbackKind::AfterTransition))
    } else {
        None
    }
}

fn prefixed_key(
    rest: &str,
    sentinel: &str,
    kind: CallbackKind,
    known: impl Fn(&str) -> bool,
) -> Option<CallbackKey> {
    if rest == sentinel {
        Some(CallbackKey::generic(kind))
    } else if known(rest) {
        Some(CallbackKey::targeted(rest, kind))
    } else {
        None
    }
}
