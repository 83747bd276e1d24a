//! Bookkeeping for in-flight synchronous calls.

use envelope::{CorrelationId, Value};
use std::collections::HashMap;

/// State of one synchronous call.
///
/// `AwaitingReply` is the only state in which the caller is blocked;
/// the other three are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum CallState {
    /// Request sent, caller blocked
    AwaitingReply,
    /// Reply arrived with its single return value
    Fulfilled(Value),
    /// The connection failed before a reply arrived
    Failed(String),
    /// The configured deadline elapsed
    TimedOut,
}

/// Table of pending synchronous calls, keyed by correlation id.
///
/// Owned exclusively by one bridge; entries are created immediately
/// before the synchronous send and removed once the caller observes
/// the terminal state.
#[derive(Debug, Default)]
pub struct PendingCallTable {
    calls: HashMap<CorrelationId, CallState>,
}

impl PendingCallTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fresh call in `AwaitingReply`
    pub fn insert(&mut self, id: CorrelationId) {
        self.calls.insert(id, CallState::AwaitingReply);
    }

    /// Resolves an awaiting call with its reply value.
    ///
    /// Returns false if the call is unknown or already resolved; a
    /// late or duplicate reply must not overwrite a terminal state.
    pub fn fulfill(&mut self, id: CorrelationId, value: Value) -> bool {
        match self.calls.get_mut(&id) {
            Some(state @ CallState::AwaitingReply) => {
                *state = CallState::Fulfilled(value);
                true
            }
            _ => false,
        }
    }

    /// Resolves an awaiting call as timed out
    pub fn time_out(&mut self, id: CorrelationId) -> bool {
        match self.calls.get_mut(&id) {
            Some(state @ CallState::AwaitingReply) => {
                *state = CallState::TimedOut;
                true
            }
            _ => false,
        }
    }

    /// Fails every awaiting call with the same reason.
    ///
    /// Called on disconnection so no blocked caller is ever left
    /// hanging. Returns how many calls were failed.
    pub fn fail_all(&mut self, reason: &str) -> usize {
        let mut failed = 0;
        for state in self.calls.values_mut() {
            if *state == CallState::AwaitingReply {
                *state = CallState::Failed(reason.to_string());
                failed += 1;
            }
        }
        failed
    }

    /// Removes a call, returning its final state
    pub fn take(&mut self, id: CorrelationId) -> Option<CallState> {
        self.calls.remove(&id)
    }

    /// Checks whether a call is still blocked
    pub fn is_awaiting(&self, id: CorrelationId) -> bool {
        self.calls.get(&id) == Some(&CallState::AwaitingReply)
    }

    /// Counts calls still blocked
    pub fn awaiting(&self) -> usize {
        self.calls
            .values()
            .filter(|state| **state == CallState::AwaitingReply)
            .count()
    }
}
