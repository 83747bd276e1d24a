//! Envelope structure and correlation ids.

use crate::channel;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Links a synchronous request to its reply.
///
/// Positive integer, unique per connection for the lifetime of the
/// pending call; the bridge allocates them from a counter and may
/// reuse an id after its call resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Creates a correlation id from a raw counter value.
    ///
    /// Zero is reserved as "absent" on wires that cannot express an
    /// option; allocators start at one.
    pub fn new(raw: u64) -> Self {
        debug_assert!(raw > 0, "correlation ids are positive");
        Self(raw)
    }

    /// Returns the raw integer
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Corr({})", self.0)
    }
}

/// One addressed message unit: a channel tag, a positional payload,
/// and, for synchronous traffic, a correlation id.
///
/// Invariant: every synchronous request envelope carries a correlation
/// id; every reply carries the same id as its request; an envelope
/// without one is never treated as a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Logical stream identifier (see [`crate::channel`])
    pub channel: String,
    /// Positional payload
    pub arguments: Vec<Value>,
    /// Request/reply pairing, present only for synchronous traffic
    pub correlation_id: Option<CorrelationId>,
}

impl Envelope {
    /// Creates an uncorrelated envelope
    pub fn new(channel: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            channel: channel.into(),
            arguments,
            correlation_id: None,
        }
    }

    /// Sets the correlation id
    pub fn with_correlation(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Checks if this envelope is part of a synchronous exchange
    pub fn is_correlated(&self) -> bool {
        self.correlation_id.is_some()
    }

    /// Checks if this envelope travels on the control stream
    pub fn is_control(&self) -> bool {
        channel::is_control(&self.channel)
    }
}
