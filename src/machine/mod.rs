//! The machine blueprint: transition table plus callback registry.
//!
//! A [`Machine`] is built once, is immutable afterwards, and is safely shared
//! read-only by any number of [`Instance`](crate::Instance)s across threads.

pub(crate) mod callbacks;
pub(crate) mod table;

pub use callbacks::{callback, Callback, CallbackKind};
pub use table::TransitionDesc;

use crate::builder::MachineBuilder;
use crate::instance::Instance;
use callbacks::CallbackRegistry;
use std::collections::HashMap;
use table::{TransitionKey, TransitionTable};

/// Shared, read-only blueprint of a state machine.
///
/// Holds the immutable `(event, source) -> destination` table and the
/// callback registry. Construct one with [`Machine::new`] (string-keyed
/// callback map, classified by name) or [`Machine::builder`] (structured
/// registration, validated at build time), then stamp out instances with
/// [`Machine::new_instance`].
///
/// # Example
///
/// ```rust
/// use turnstile::{Machine, TransitionDesc};
/// use std::collections::HashMap;
///
/// let machine = Machine::new(
///     vec![
///         TransitionDesc::new("open", ["closed"], "open"),
///         TransitionDesc::new("close", ["open"], "closed"),
///     ],
///     HashMap::new(),
/// );
///
/// let door = machine.new_instance("closed");
/// door.transition(&machine, "open", Vec::new()).unwrap();
/// assert_eq!(door.current(), "open");
/// ```
pub struct Machine {
    table: TransitionTable,
    registry: CallbackRegistry,
    ignored: Vec<String>,
}

impl Machine {
    /// Build a machine from transition descriptors and a callback map keyed
    /// by raw name (`before_<event>`, `leave_<state>`, `enter_state`, a bare
    /// state or event name, and so on).
    ///
    /// Construction never fails. Duplicate `(event, source)` descriptors let
    /// the last one win, and callback names that classify to nothing are
    /// dropped; the dropped names stay inspectable through
    /// [`ignored_callbacks`](Machine::ignored_callbacks). Prefer
    /// [`Machine::builder`] when the callback wiring is known at compile
    /// time; it rejects unknown targets instead of dropping them.
    pub fn new(transitions: Vec<TransitionDesc>, callbacks: HashMap<String, Callback>) -> Self {
        let table = TransitionTable::build(transitions);
        let (registry, ignored) = CallbackRegistry::classify(callbacks, &table);
        Self {
            table,
            registry,
            ignored,
        }
    }

    /// Start a structured builder. See [`MachineBuilder`].
    pub fn builder() -> MachineBuilder {
        MachineBuilder::new()
    }

    pub(crate) fn from_parts(
        table: TransitionTable,
        registry: CallbackRegistry,
        ignored: Vec<String>,
    ) -> Self {
        Self {
            table,
            registry,
            ignored,
        }
    }

    /// Create an independent instance of this machine in the given state.
    ///
    /// Instances hold no reference back to the machine; pass the machine
    /// into every operation that needs the table or registry.
    pub fn new_instance(&self, initial: &str) -> Instance {
        Instance::new(initial)
    }

    /// Callback names from [`Machine::new`] that failed classification and
    /// will never fire, sorted. Empty for builder-constructed machines.
    pub fn ignored_callbacks(&self) -> &[String] {
        &self.ignored
    }

    pub(crate) fn destination(&self, event: &str, source: &str) -> Option<&str> {
        self.table.destination(event, source)
    }

    pub(crate) fn has_event(&self, event: &str) -> bool {
        self.table.has_event(event)
    }

    pub(crate) fn events_from(&self, state: &str) -> Vec<String> {
        self.table.events_from(state)
    }

    pub(crate) fn hook(&self, target: &str, kind: CallbackKind) -> Option<&Callback> {
        self.registry.get(target, kind)
    }

    pub(crate) fn generic_hook(&self, kind: CallbackKind) -> Option<&Callback> {
        self.registry.get_generic(kind)
    }

    pub(crate) fn transition_edges(&self) -> impl Iterator<Item = (&TransitionKey, &str)> {
        self.table.iter()
    }
}
