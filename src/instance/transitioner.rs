//! Completion strategy seam and the staged form of a deferred transition.
//!
//! A parked transition is plain data: the owned context plus the enter/after
//! hooks resolved at staging time. That keeps the parked state inspectable
//! and lets completion run without a machine argument, possibly from a
//! different thread.

use crate::error::{BoxError, TransitionError};
use crate::instance::{Instance, TransitionContext};
use crate::machine::Callback;

/// Enter/after hooks cloned out of the machine when a transition is staged.
pub(crate) struct CompletionHooks {
    pub(crate) enter_target: Option<Callback>,
    pub(crate) enter_generic: Option<Callback>,
    pub(crate) after_target: Option<Callback>,
    pub(crate) after_generic: Option<Callback>,
}

/// A staged transition: everything needed to swap state and fire the
/// remaining hooks.
pub(crate) struct PendingTransition {
    pub(crate) ctx: TransitionContext,
    pub(crate) hooks: CompletionHooks,
}

/// Strategy that performs the state-swap-and-hook-firing step.
///
/// The default runs it synchronously in place; tests substitute a
/// controllable stand-in to drive the engine's internal-error path.
pub(crate) trait Transitioner: Send + Sync {
    /// Consume the instance's pending transition and run it to the end.
    /// Returns the context's final error slot, or `NotInTransition` if
    /// nothing was staged.
    fn complete(&self, instance: &Instance) -> Result<Option<BoxError>, TransitionError>;
}

/// Default strategy: pop the pending slot and finish immediately.
pub(crate) struct SyncTransitioner;

impl Transitioner for SyncTransitioner {
    fn complete(&self, instance: &Instance) -> Result<Option<BoxError>, TransitionError> {
        let pending = instance
            .take_pending()
            .ok_or(TransitionError::NotInTransition)?;
        Ok(instance.run_completion(pending))
    }
}
