//! Ordered record of completed transitions on one instance.

use crate::instance::TransitionContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed transition: event fired, states moved between, and when.
///
/// Records are appended at the moment of the state swap, so canceled
/// attempts, self-loops and still-parked deferred transitions never appear.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Event that drove the transition.
    pub event: String,
    /// State before.
    pub from: String,
    /// State after.
    pub to: String,
    /// When the swap happened.
    pub at: DateTime<Utc>,
}

impl TransitionRecord {
    pub(crate) fn of(ctx: &TransitionContext) -> Self {
        Self {
            event: ctx.event.clone(),
            from: ctx.src.clone(),
            to: ctx.dst.clone(),
            at: Utc::now(),
        }
    }
}

/// Append-only log of an instance's completed transitions.
///
/// Serde-derived so a run can be exported for inspection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionLog {
    records: Vec<TransitionRecord>,
}

impl TransitionLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, record: TransitionRecord) {
        self.records.push(record);
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    /// The most recent record.
    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
