//! Structured machine construction with validated hook targets.
//!
//! [`Machine::new`] classifies callbacks by parsing their raw names, and
//! drops anything it cannot place. This builder is the strict alternative:
//! hooks are registered against an explicit kind and target, and `build`
//! rejects targets that no transition mentions.

pub mod error;

pub use error::BuildError;

use crate::machine::callbacks::{Callback, CallbackKey, CallbackKind, CallbackRegistry};
use crate::machine::table::{TransitionDesc, TransitionTable};
use crate::machine::Machine;

enum HookTarget {
    Targeted(CallbackKind, String),
    Generic(CallbackKind),
}

/// Fluent builder for a [`Machine`].
///
/// # Example
///
/// ```rust
/// use turnstile::{callback, Machine};
///
/// let machine = Machine::builder()
///     .transition("open", ["closed"], "open")
///     .transition("close", ["open"], "closed")
///     .before("open", callback(|_, _| println!("about to open")))
///     .on_enter_any(callback(|instance, _| {
///         println!("now {}", instance.current());
///     }))
///     .build()
///     .unwrap();
///
/// let door = machine.new_instance("closed");
/// door.transition(&machine, "open", Vec::new()).unwrap();
/// ```
#[derive(Default)]
pub struct MachineBuilder {
    transitions: Vec<TransitionDesc>,
    hooks: Vec<(HookTarget, Callback)>,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a transition: `event` moves any of `sources` to `destination`.
    pub fn transition<N, S, I, D>(mut self, event: N, sources: I, destination: D) -> Self
    where
        N: Into<String>,
        S: Into<String>,
        I: IntoIterator<Item = S>,
        D: Into<String>,
    {
        self.transitions
            .push(TransitionDesc::new(event, sources, destination));
        self
    }

    /// Add a pre-built descriptor, e.g. one deserialized from config.
    pub fn add_transition(mut self, desc: TransitionDesc) -> Self {
        self.transitions.push(desc);
        self
    }

    /// Add multiple descriptors at once.
    pub fn transitions<I>(mut self, descs: I) -> Self
    where
        I: IntoIterator<Item = TransitionDesc>,
    {
        self.transitions.extend(descs);
        self
    }

    /// Hook run before `event` fires; may cancel.
    pub fn before(self, event: &str, cb: Callback) -> Self {
        self.targeted(CallbackKind::BeforeTransition, event, cb)
    }

    /// Hook run before every transition; may cancel.
    pub fn before_any(self, cb: Callback) -> Self {
        self.generic(CallbackKind::BeforeTransition, cb)
    }

    /// Hook run when leaving `state`; may cancel or defer.
    pub fn on_leave(self, state: &str, cb: Callback) -> Self {
        self.targeted(CallbackKind::LeaveState, state, cb)
    }

    /// Hook run when leaving any state; may cancel or defer.
    pub fn on_leave_any(self, cb: Callback) -> Self {
        self.generic(CallbackKind::LeaveState, cb)
    }

    /// Hook run after entering `state`.
    pub fn on_enter(self, state: &str, cb: Callback) -> Self {
        self.targeted(CallbackKind::EnterState, state, cb)
    }

    /// Hook run after entering any state.
    pub fn on_enter_any(self, cb: Callback) -> Self {
        self.generic(CallbackKind::EnterState, cb)
    }

    /// Hook run after `event` completes.
    pub fn after(self, event: &str, cb: Callback) -> Self {
        self.targeted(CallbackKind::AfterTransition, event, cb)
    }

    /// Hook run after any transition completes.
    pub fn after_any(self, cb: Callback) -> Self {
        self.generic(CallbackKind::AfterTransition, cb)
    }

    fn targeted(mut self, kind: CallbackKind, target: &str, cb: Callback) -> Self {
        self.hooks
            .push((HookTarget::Targeted(kind, target.to_string()), cb));
        self
    }

    fn generic(mut self, kind: CallbackKind, cb: Callback) -> Self {
        self.hooks.push((HookTarget::Generic(kind), cb));
        self
    }

    /// Build the machine, validating every hook target.
    ///
    /// Registering the same kind and target twice keeps the last hook, as in
    /// [`Machine::new`].
    pub fn build(self) -> Result<Machine, BuildError> {
        let table = TransitionTable::build(self.transitions);
        let mut registry = CallbackRegistry::default();

        for (target, cb) in self.hooks {
            let key = match target {
                HookTarget::Generic(kind) => CallbackKey::generic(kind),
                HookTarget::Targeted(kind, name) => {
                    validate_target(&table, kind, &name)?;
                    CallbackKey::targeted(&name, kind)
                }
            };
            registry.insert(key, cb);
        }

        Ok(Machine::from_parts(table, registry, Vec::new()))
    }
}

fn validate_target(
    table: &TransitionTable,
    kind: CallbackKind,
    name: &str,
) -> Result<(), BuildError> {
    match kind {
        CallbackKind::BeforeTransition | CallbackKind::AfterTransition => {
            if table.has_event(name) {
                Ok(())
            } else {
                Err(BuildError::UnknownEvent {
                    event: name.to_string(),
                })
            }
        }
        CallbackKind::LeaveState | CallbackKind::EnterState => {
            if table.has_state(name) {
                Ok(())
            } else {
                Err(BuildError::UnknownState {
                    state: name.to_string(),
                })
            }
        }
    }
}
