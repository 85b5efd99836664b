//! Per-instance runtime state and the transition protocol.
//!
//! An [`Instance`] owns one machine's mutable runtime: the current state, an
//! optional staged deferred transition, a keyed metadata store and the
//! transition log. It is internally synchronized, so shared references may be
//! used from many threads at once.
//!
//! Three independent lock domains, never held while acquiring another:
//!
//! - the event-serialization mutex, held for a whole `transition` or
//!   `complete_deferred_transition` call, so at most one attempt per instance
//!   runs callbacks at a time;
//! - the state lock, taken briefly for reads and for the instant of the swap;
//! - the metadata lock, a leaf guarding only the key/value store.
//!
//! Callbacks run with only the event mutex held and may freely query state
//! and metadata on their instance. They must not start another transition on
//! the same instance; the event mutex is not reentrant.

mod context;
pub(crate) mod transitioner;

pub use context::TransitionContext;

use crate::error::{BoxError, TransitionError};
use crate::history::{TransitionLog, TransitionRecord};
use crate::machine::{CallbackKind, Machine};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use transitioner::{CompletionHooks, PendingTransition, SyncTransitioner, Transitioner};
use uuid::Uuid;

/// Opaque value stored in instance metadata or passed as a transition
/// argument. Reads hand out clones of the `Arc`; downcast to recover the
/// concrete type.
pub type MetadataValue = Arc<dyn Any + Send + Sync>;

/// Wrap a value as a [`MetadataValue`].
pub fn metadata_value<T: Any + Send + Sync>(value: T) -> MetadataValue {
    Arc::new(value)
}

/// One FSM instance: the mutable counterpart of a shared [`Machine`].
///
/// Created with [`Machine::new_instance`]. Instances hold no reference to
/// their machine; every operation that consults the transition table or the
/// callback registry takes the machine explicitly.
///
/// # Example
///
/// ```rust
/// use turnstile::{Machine, TransitionDesc};
/// use std::collections::HashMap;
///
/// let machine = Machine::new(
///     vec![TransitionDesc::new("start", ["idle"], "running")],
///     HashMap::new(),
/// );
/// let worker = machine.new_instance("idle");
///
/// assert!(worker.can(&machine, "start"));
/// worker.transition(&machine, "start", Vec::new()).unwrap();
/// assert!(worker.is("running"));
/// ```
pub struct Instance {
    id: Uuid,
    current: RwLock<String>,
    event_mu: Mutex<()>,
    pending: Mutex<Option<PendingTransition>>,
    metadata: RwLock<HashMap<String, MetadataValue>>,
    log: Mutex<TransitionLog>,
    transitioner: Box<dyn Transitioner>,
}

impl Instance {
    pub(crate) fn new(initial: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            current: RwLock::new(initial.to_string()),
            event_mu: Mutex::new(()),
            pending: Mutex::new(None),
            metadata: RwLock::new(HashMap::new()),
            log: Mutex::new(TransitionLog::new()),
            transitioner: Box::new(SyncTransitioner),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_transitioner(&mut self, transitioner: Box<dyn Transitioner>) {
        self.transitioner = transitioner;
    }

    /// Identifier distinguishing this instance from others of the same
    /// machine.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The current state.
    pub fn current(&self) -> String {
        self.current.read().clone()
    }

    /// Whether `state` is the current state.
    pub fn is(&self, state: &str) -> bool {
        *self.current.read() == state
    }

    /// Force-set the current state, bypassing all hooks.
    ///
    /// An escape hatch, not a transition: nothing fires and nothing is
    /// recorded in the log.
    pub fn set_state(&self, state: &str) {
        *self.current.write() = state.to_string();
    }

    /// Whether `event` can fire right now: it must be legal from the current
    /// state and no deferred transition may be pending.
    pub fn can(&self, machine: &Machine, event: &str) -> bool {
        let current = self.current.read().clone();
        machine.destination(event, &current).is_some() && self.pending.lock().is_none()
    }

    /// Event names legal from the current state, in no particular order.
    pub fn available_transitions(&self, machine: &Machine) -> Vec<String> {
        let current = self.current.read().clone();
        machine.events_from(&current)
    }

    /// Event name of the staged deferred transition, if one is parked.
    pub fn pending_event(&self) -> Option<String> {
        self.pending
            .lock()
            .as_ref()
            .map(|pending| pending.ctx.event.clone())
    }

    /// Store a value under `key`, replacing any previous one.
    pub fn set_metadata(&self, key: &str, value: MetadataValue) {
        self.metadata.write().insert(key.to_string(), value);
    }

    /// Fetch the value stored under `key`.
    pub fn get_metadata(&self, key: &str) -> Option<MetadataValue> {
        self.metadata.read().get(key).cloned()
    }

    /// Ordered record of completed transitions on this instance.
    pub fn history(&self) -> TransitionLog {
        self.log.lock().clone()
    }

    /// Drive the instance through the named transition.
    ///
    /// Resolves the destination in the machine's table, runs before hooks
    /// (targeted then generic, either may cancel), then leave hooks (either
    /// may cancel or defer), then swaps the state and runs enter and after
    /// hooks. `args` are passed through to every callback on the context.
    ///
    /// Returns `Ok(())` on a completed transition with a clean context. See
    /// [`TransitionError`] for the failure and not-quite-failure outcomes;
    /// in particular [`Async`](TransitionError::Async) means the transition
    /// is parked awaiting [`complete_deferred_transition`](Self::complete_deferred_transition),
    /// and [`NoTransition`](TransitionError::NoTransition) means a legal
    /// self-loop changed nothing.
    pub fn transition(
        &self,
        machine: &Machine,
        event: &str,
        args: Vec<MetadataValue>,
    ) -> Result<(), TransitionError> {
        let _serial = self.event_mu.lock();

        // Stable for the whole attempt: only event-mutex holders write it.
        let current = self.current.read().clone();

        if self.pending.lock().is_some() {
            return Err(TransitionError::InTransition {
                event: event.to_string(),
            });
        }

        let dst = match machine.destination(event, &current) {
            Some(dst) => dst.to_string(),
            None if machine.has_event(event) => {
                return Err(TransitionError::InvalidEvent {
                    event: event.to_string(),
                    state: current,
                });
            }
            None => {
                return Err(TransitionError::UnknownEvent {
                    event: event.to_string(),
                });
            }
        };

        let mut ctx = TransitionContext::new(event, current, dst, args);

        self.before_hooks(machine, &mut ctx)?;

        if ctx.src == ctx.dst {
            self.after_hooks(machine, &mut ctx);
            return Err(TransitionError::NoTransition(ctx.err.take()));
        }

        if let Err(outcome) = self.leave_hooks(machine, &mut ctx) {
            if matches!(outcome, TransitionError::Async(_)) {
                self.stage(machine, ctx);
            }
            return Err(outcome);
        }

        self.stage(machine, ctx);
        match self.transitioner.complete(self) {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(TransitionError::Callback(err)),
            Err(_) => Err(TransitionError::Internal),
        }
    }

    /// Finish a transition parked by a leave hook's
    /// [`mark_async`](TransitionContext::mark_async).
    ///
    /// Swaps the state and fires the enter and after hooks exactly once. May
    /// be called from any thread, any amount of time after the transition
    /// was parked. Fails with
    /// [`NotInTransition`](TransitionError::NotInTransition) when nothing is
    /// pending.
    pub fn complete_deferred_transition(&self) -> Result<(), TransitionError> {
        let _serial = self.event_mu.lock();
        match self.transitioner.complete(self)? {
            None => Ok(()),
            Some(err) => Err(TransitionError::Callback(err)),
        }
    }

    fn before_hooks(
        &self,
        machine: &Machine,
        ctx: &mut TransitionContext,
    ) -> Result<(), TransitionError> {
        let event = ctx.event.clone();
        let hooks = [
            machine.hook(&event, CallbackKind::BeforeTransition),
            machine.generic_hook(CallbackKind::BeforeTransition),
        ];
        for cb in hooks.into_iter().flatten() {
            (cb.as_ref())(self, ctx);
            if ctx.is_canceled() {
                return Err(TransitionError::Canceled(ctx.err.take()));
            }
        }
        Ok(())
    }

    /// Runs leave hooks, checking for cancellation or deferral after each;
    /// a targeted hook that defers preempts the generic one.
    fn leave_hooks(
        &self,
        machine: &Machine,
        ctx: &mut TransitionContext,
    ) -> Result<(), TransitionError> {
        let src = ctx.src.clone();
        let hooks = [
            machine.hook(&src, CallbackKind::LeaveState),
            machine.generic_hook(CallbackKind::LeaveState),
        ];
        for cb in hooks.into_iter().flatten() {
            (cb.as_ref())(self, ctx);
            if ctx.is_canceled() {
                return Err(TransitionError::Canceled(ctx.err.take()));
            }
            if ctx.is_async() {
                return Err(TransitionError::Async(ctx.err.take()));
            }
        }
        Ok(())
    }

    fn after_hooks(&self, machine: &Machine, ctx: &mut TransitionContext) {
        let event = ctx.event.clone();
        let hooks = [
            machine.hook(&event, CallbackKind::AfterTransition),
            machine.generic_hook(CallbackKind::AfterTransition),
        ];
        for cb in hooks.into_iter().flatten() {
            (cb.as_ref())(self, ctx);
        }
    }

    /// Resolve the enter/after hooks for this attempt and park it.
    fn stage(&self, machine: &Machine, ctx: TransitionContext) {
        let hooks = CompletionHooks {
            enter_target: machine.hook(&ctx.dst, CallbackKind::EnterState).cloned(),
            enter_generic: machine.generic_hook(CallbackKind::EnterState).cloned(),
            after_target: machine
                .hook(&ctx.event, CallbackKind::AfterTransition)
                .cloned(),
            after_generic: machine.generic_hook(CallbackKind::AfterTransition).cloned(),
        };
        *self.pending.lock() = Some(PendingTransition { ctx, hooks });
    }

    pub(crate) fn take_pending(&self) -> Option<PendingTransition> {
        self.pending.lock().take()
    }

    /// Swap to the destination state, record the transition, then run the
    /// staged enter and after hooks. Enter/after hooks observe the new state.
    pub(crate) fn run_completion(&self, pending: PendingTransition) -> Option<BoxError> {
        let PendingTransition { mut ctx, hooks } = pending;

        *self.current.write() = ctx.dst.clone();
        self.log.lock().record(TransitionRecord::of(&ctx));

        let ordered = [
            hooks.enter_target,
            hooks.enter_generic,
            hooks.after_target,
            hooks.after_generic,
        ];
        for cb in ordered.into_iter().flatten() {
            (cb.as_ref())(self, &mut ctx);
        }

        ctx.err.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{callback, Callback, TransitionDesc};
    use std::sync::Arc;

    type CallLog = Arc<Mutex<Vec<String>>>;

    fn recording(calls: &CallLog, label: &str) -> Callback {
        let calls = Arc::clone(calls);
        let label = label.to_string();
        callback(move |_, _| calls.lock().push(label.clone()))
    }

    fn door_machine(callbacks: HashMap<String, Callback>) -> Machine {
        Machine::new(
            vec![
                TransitionDesc::new("open", ["closed"], "open"),
                TransitionDesc::new("close", ["open"], "closed"),
            ],
            callbacks,
        )
    }

    #[test]
    fn concrete_door_scenario() {
        let machine = door_machine(HashMap::new());
        let door = machine.new_instance("closed");

        door.transition(&machine, "open", Vec::new()).unwrap();
        assert_eq!(door.current(), "open");

        door.transition(&machine, "close", Vec::new()).unwrap();
        assert_eq!(door.current(), "closed");

        let err = door.transition(&machine, "close", Vec::new()).unwrap_err();
        match err {
            TransitionError::InvalidEvent { event, state } => {
                assert_eq!(event, "close");
                assert_eq!(state, "closed");
            }
            other => panic!("expected InvalidEvent, got {other}"),
        }
        assert_eq!(door.current(), "closed");
    }

    #[test]
    fn unknown_event_leaves_state_unchanged() {
        let machine = door_machine(HashMap::new());
        let door = machine.new_instance("closed");

        let err = door.transition(&machine, "warp", Vec::new()).unwrap_err();
        assert!(matches!(err, TransitionError::UnknownEvent { .. }));
        assert_eq!(door.current(), "closed");
    }

    #[test]
    fn hooks_fire_in_contract_order() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut raw = HashMap::new();
        for name in [
            "before_open",
            "before_transition",
            "leave_closed",
            "leave_state",
            "enter_open",
            "enter_state",
            "after_open",
            "after_transition",
        ] {
            raw.insert(name.to_string(), recording(&calls, name));
        }

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");
        door.transition(&machine, "open", Vec::new()).unwrap();

        assert_eq!(
            *calls.lock(),
            vec![
                "before_open",
                "before_transition",
                "leave_closed",
                "leave_state",
                "enter_open",
                "enter_state",
                "after_open",
                "after_transition",
            ]
        );
    }

    #[test]
    fn leave_hooks_see_old_state_enter_hooks_see_new() {
        let observed: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut raw = HashMap::new();

        let obs = Arc::clone(&observed);
        raw.insert(
            "leave_state".to_string(),
            callback(move |instance, _| obs.lock().push(format!("leave:{}", instance.current()))),
        );
        let obs = Arc::clone(&observed);
        raw.insert(
            "enter_state".to_string(),
            callback(move |instance, _| obs.lock().push(format!("enter:{}", instance.current()))),
        );

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");
        door.transition(&machine, "open", Vec::new()).unwrap();

        assert_eq!(*observed.lock(), vec!["leave:closed", "enter:open"]);
    }

    #[test]
    fn before_hook_cancel_aborts_everything() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut raw = HashMap::new();
        raw.insert(
            "before_open".to_string(),
            callback(|_, ctx: &mut TransitionContext| ctx.cancel()),
        );
        raw.insert("before_transition".to_string(), recording(&calls, "generic"));
        raw.insert("leave_closed".to_string(), recording(&calls, "leave"));
        raw.insert("after_transition".to_string(), recording(&calls, "after"));

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");

        let err = door.transition(&machine, "open", Vec::new()).unwrap_err();
        assert!(matches!(err, TransitionError::Canceled(None)));
        assert_eq!(door.current(), "closed");
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn cancel_with_error_is_wrapped() {
        let mut raw = HashMap::new();
        raw.insert(
            "before_transition".to_string(),
            callback(|_, ctx: &mut TransitionContext| ctx.cancel_with_error("door is welded shut")),
        );

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");

        let err = door.transition(&machine, "open", Vec::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "transition canceled with error: door is welded shut"
        );
    }

    #[test]
    fn leave_hook_cancel_aborts_and_clears_nothing_pending() {
        let mut raw = HashMap::new();
        raw.insert(
            "leave_closed".to_string(),
            callback(|_, ctx: &mut TransitionContext| ctx.cancel()),
        );

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");

        let err = door.transition(&machine, "open", Vec::new()).unwrap_err();
        assert!(matches!(err, TransitionError::Canceled(None)));
        assert_eq!(door.current(), "closed");
        assert!(door.pending_event().is_none());
        assert!(door.can(&machine, "open"));
    }

    #[test]
    fn deferred_transition_parks_then_completes() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut raw = HashMap::new();
        raw.insert(
            "leave_closed".to_string(),
            callback(|_, ctx: &mut TransitionContext| ctx.mark_async()),
        );
        raw.insert("enter_open".to_string(), recording(&calls, "enter_open"));
        raw.insert("after_open".to_string(), recording(&calls, "after_open"));

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");

        let err = door.transition(&machine, "open", Vec::new()).unwrap_err();
        assert!(matches!(err, TransitionError::Async(None)));
        assert_eq!(door.current(), "closed");
        assert_eq!(door.pending_event(), Some("open".to_string()));
        assert!(calls.lock().is_empty());

        door.complete_deferred_transition().unwrap();
        assert_eq!(door.current(), "open");
        assert_eq!(*calls.lock(), vec!["enter_open", "after_open"]);
        assert!(door.pending_event().is_none());

        // The staged completion ran exactly once.
        let err = door.complete_deferred_transition().unwrap_err();
        assert!(matches!(err, TransitionError::NotInTransition));
    }

    #[test]
    fn targeted_leave_deferral_preempts_generic_leave() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut raw = HashMap::new();
        raw.insert(
            "leave_closed".to_string(),
            callback(|_, ctx: &mut TransitionContext| ctx.mark_async()),
        );
        raw.insert("leave_state".to_string(), recording(&calls, "generic_leave"));

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");

        let err = door.transition(&machine, "open", Vec::new()).unwrap_err();
        assert!(matches!(err, TransitionError::Async(None)));
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn pending_transition_blocks_new_events() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut raw = HashMap::new();
        raw.insert(
            "leave_closed".to_string(),
            callback(|_, ctx: &mut TransitionContext| ctx.mark_async()),
        );
        raw.insert(
            "before_transition".to_string(),
            recording(&calls, "before"),
        );

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");

        door.transition(&machine, "open", Vec::new()).unwrap_err();
        let before_count = calls.lock().len();

        let err = door.transition(&machine, "open", Vec::new()).unwrap_err();
        match err {
            TransitionError::InTransition { event } => assert_eq!(event, "open"),
            other => panic!("expected InTransition, got {other}"),
        }
        // The guard fires before any callback.
        assert_eq!(calls.lock().len(), before_count);
        assert!(!door.can(&machine, "open"));
    }

    #[test]
    fn self_loop_reports_no_transition_and_runs_after_hooks() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut raw = HashMap::new();
        raw.insert("after_transition".to_string(), recording(&calls, "after"));
        raw.insert("leave_state".to_string(), recording(&calls, "leave"));
        raw.insert("enter_state".to_string(), recording(&calls, "enter"));

        let machine = Machine::new(
            vec![TransitionDesc::new("ping", ["idle"], "idle")],
            raw,
        );
        let pinger = machine.new_instance("idle");

        let err = pinger.transition(&machine, "ping", Vec::new()).unwrap_err();
        assert!(matches!(err, TransitionError::NoTransition(None)));
        assert_eq!(pinger.current(), "idle");
        assert_eq!(*calls.lock(), vec!["after"]);
        assert!(pinger.history().is_empty());
    }

    #[test]
    fn callback_error_from_enter_hook_is_returned() {
        let mut raw = HashMap::new();
        raw.insert(
            "enter_open".to_string(),
            callback(|_, ctx: &mut TransitionContext| {
                ctx.err = Some("hinge snapped".to_string().into());
            }),
        );

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");

        let err = door.transition(&machine, "open", Vec::new()).unwrap_err();
        assert!(matches!(err, TransitionError::Callback(_)));
        assert_eq!(err.to_string(), "hinge snapped");
        // The state swap already happened; the error is advisory.
        assert_eq!(door.current(), "open");
    }

    #[test]
    fn broken_strategy_surfaces_internal_error() {
        struct EmptySlotTransitioner;
        impl Transitioner for EmptySlotTransitioner {
            fn complete(&self, _instance: &Instance) -> Result<Option<BoxError>, TransitionError> {
                Err(TransitionError::NotInTransition)
            }
        }

        let machine = door_machine(HashMap::new());
        let mut door = machine.new_instance("closed");
        door.set_transitioner(Box::new(EmptySlotTransitioner));

        let err = door.transition(&machine, "open", Vec::new()).unwrap_err();
        assert!(matches!(err, TransitionError::Internal));
        assert_eq!(err.to_string(), "internal error on state transition");
    }

    #[test]
    fn args_reach_every_callback() {
        let seen: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut raw = HashMap::new();
        for name in ["before_transition", "enter_state"] {
            let seen = Arc::clone(&seen);
            raw.insert(
                name.to_string(),
                callback(move |_, ctx: &mut TransitionContext| {
                    let arg = ctx.args[0]
                        .downcast_ref::<&str>()
                        .expect("arg should be a &str");
                    seen.lock().push(arg.to_string());
                }),
            );
        }

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");
        door.transition(&machine, "open", vec![metadata_value("gently")])
            .unwrap();

        assert_eq!(*seen.lock(), vec!["gently", "gently"]);
    }

    #[test]
    fn metadata_crosses_hook_invocations() {
        let mut raw = HashMap::new();
        raw.insert(
            "leave_closed".to_string(),
            callback(|instance: &Instance, _: &mut TransitionContext| {
                instance.set_metadata("who", metadata_value("leave hook".to_string()));
            }),
        );

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");
        door.transition(&machine, "open", Vec::new()).unwrap();

        let value = door.get_metadata("who").expect("metadata should be set");
        assert_eq!(
            value.downcast_ref::<String>().map(String::as_str),
            Some("leave hook")
        );
        assert!(door.get_metadata("missing").is_none());
    }

    #[test]
    fn set_state_bypasses_hooks() {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut raw = HashMap::new();
        raw.insert("enter_state".to_string(), recording(&calls, "enter"));

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");

        door.set_state("open");
        assert_eq!(door.current(), "open");
        assert!(calls.lock().is_empty());
        assert!(door.history().is_empty());
    }

    #[test]
    fn queries_do_not_mutate() {
        let machine = door_machine(HashMap::new());
        let door = machine.new_instance("closed");

        for _ in 0..3 {
            assert_eq!(door.current(), "closed");
            assert!(door.is("closed"));
            assert!(door.can(&machine, "open"));
            assert!(!door.can(&machine, "close"));
            assert_eq!(
                door.available_transitions(&machine),
                vec!["open".to_string()]
            );
        }
    }

    #[test]
    fn history_records_completed_transitions_in_order() {
        let machine = door_machine(HashMap::new());
        let door = machine.new_instance("closed");

        door.transition(&machine, "open", Vec::new()).unwrap();
        door.transition(&machine, "close", Vec::new()).unwrap();

        let log = door.history();
        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event, "open");
        assert_eq!(records[0].from, "closed");
        assert_eq!(records[0].to, "open");
        assert_eq!(records[1].event, "close");
        assert!(records[0].at <= records[1].at);
    }

    #[test]
    fn canceled_attempt_leaves_no_history() {
        let mut raw = HashMap::new();
        raw.insert(
            "before_open".to_string(),
            callback(|_, ctx: &mut TransitionContext| ctx.cancel()),
        );

        let machine = door_machine(raw);
        let door = machine.new_instance("closed");
        door.transition(&machine, "open", Vec::new()).unwrap_err();
        assert!(door.history().is_empty());
    }
}
