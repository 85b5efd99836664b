//! Build errors for the structured machine builder.

use thiserror::Error;

/// Errors from [`MachineBuilder::build`](crate::MachineBuilder::build).
///
/// The builder validates every hook target against the names collected from
/// the transition table, so a typo fails loudly here instead of silently
/// never firing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("hook targets event {event} which no transition defines")]
    UnknownEvent { event: String },

    #[error("hook targets state {state} which no transition mentions")]
    UnknownState { state: String },
}
