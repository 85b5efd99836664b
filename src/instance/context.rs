//! Per-attempt transition context handed to every callback.

use crate::error::BoxError;
use crate::instance::MetadataValue;

/// Ephemeral value describing one transition attempt.
///
/// A fresh context is created for every call to
/// [`Instance::transition`](crate::Instance::transition) and passed mutably
/// to each callback the attempt fires. Before and leave hooks may
/// [`cancel`](TransitionContext::cancel) the attempt; leave hooks may
/// [`mark_async`](TransitionContext::mark_async) to park it for later
/// completion. The context owns no borrow of the instance (the instance is
/// the callback's first argument), which is what allows a deferred attempt
/// to be staged on the instance and finished from another thread.
pub struct TransitionContext {
    /// Name of the event driving the attempt.
    pub event: String,
    /// State before the transition.
    pub src: String,
    /// State after the transition, once it completes.
    pub dst: String,
    /// Error slot; set through [`cancel_with_error`](Self::cancel_with_error)
    /// or directly by any hook. Returned to the transition caller.
    pub err: Option<BoxError>,
    /// Opaque arguments passed through from the transition call.
    pub args: Vec<MetadataValue>,

    canceled: bool,
    asynchronous: bool,
}

impl TransitionContext {
    pub(crate) fn new(event: &str, src: String, dst: String, args: Vec<MetadataValue>) -> Self {
        Self {
            event: event.to_string(),
            src,
            dst,
            err: None,
            args,
            canceled: false,
            asynchronous: false,
        }
    }

    /// Cancel the transition before it happens.
    ///
    /// Only meaningful from a before or leave hook; the attempt aborts with
    /// [`TransitionError::Canceled`](crate::TransitionError::Canceled) and no
    /// further hooks run.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    /// Cancel with a reason. Overwrites any error already on the context.
    pub fn cancel_with_error(&mut self, err: impl Into<BoxError>) {
        self.canceled = true;
        self.err = Some(err.into());
    }

    /// Ask for deferred completion.
    ///
    /// Only meaningful from a leave hook: the attempt returns
    /// [`TransitionError::Async`](crate::TransitionError::Async) with the
    /// state unchanged, and stays parked until
    /// [`complete_deferred_transition`](crate::Instance::complete_deferred_transition)
    /// is called.
    pub fn mark_async(&mut self) {
        self.asynchronous = true;
    }

    /// Whether a hook has canceled this attempt.
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Whether a hook has requested deferred completion.
    pub fn is_async(&self) -> bool {
        self.asynchronous
    }
}
