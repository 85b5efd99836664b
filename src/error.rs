//! Error taxonomy for transition attempts.
//!
//! Every failure mode is a value returned to the caller. The engine never
//! panics on client misuse, never retries, and never logs.

use thiserror::Error;

/// Boxed error supplied by a callback, carried through the transition context.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned from [`transition`](crate::Instance::transition) and
/// [`complete_deferred_transition`](crate::Instance::complete_deferred_transition).
///
/// Two variants are not true failures: [`Async`](TransitionError::Async)
/// signals that the transition was parked by a leave hook and awaits
/// completion, and [`NoTransition`](TransitionError::NoTransition) signals a
/// legal self-loop where nothing changed.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The event is not defined on the machine at all.
    #[error("event {event} does not exist")]
    UnknownEvent { event: String },

    /// The event exists, but not from the instance's current state.
    #[error("event {event} inappropriate in current state {state}")]
    InvalidEvent { event: String, state: String },

    /// A deferred transition is already pending on this instance.
    #[error("event {event} inappropriate because previous transition did not complete")]
    InTransition { event: String },

    /// Completion was requested but nothing is pending.
    #[error("transition inappropriate because no transition is in progress")]
    NotInTransition,

    /// A before or leave hook canceled the transition, optionally with a
    /// reason.
    #[error("transition canceled{}", cause_suffix(.0))]
    Canceled(Option<BoxError>),

    /// A leave hook deferred the transition; it stays parked until
    /// [`complete_deferred_transition`](crate::Instance::complete_deferred_transition)
    /// is called.
    #[error("async started{}", cause_suffix(.0))]
    Async(Option<BoxError>),

    /// The event resolved to the current state; after hooks ran but no state
    /// change happened.
    #[error("no transition{}", cause_suffix(.0))]
    NoTransition(Option<BoxError>),

    /// An enter or after hook left an error on the context.
    #[error("{0}")]
    Callback(BoxError),

    /// The completion strategy reported an empty pending slot during a
    /// synchronous completion. Indicates a bug in the engine or a broken
    /// custom strategy, not client misuse.
    #[error("internal error on state transition")]
    Internal,
}

impl TransitionError {
    /// The callback-supplied error wrapped by `Canceled`, `Async`,
    /// `NoTransition` or `Callback`, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync)> {
        match self {
            Self::Canceled(cause) | Self::Async(cause) | Self::NoTransition(cause) => {
                cause.as_deref()
            }
            Self::Callback(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

fn cause_suffix(cause: &Option<BoxError>) -> String {
    match cause {
        Some(err) => format!(" with error: {err}"),
        None => String::new(),
    }
}
