//! # Bridge Contract Tests
//!
//! This crate provides "golden" tests for the wire and behavior
//! contracts of the messaging bridge, so they don't drift accidentally
//! over time.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: reserved channel tags and envelope
//!   shape are written down as tests
//! - **Testability first**: contract tests fail when the wire format
//!   or delivery semantics change
//! - **Script the peer**: scenarios run a real endpoint pair and drive
//!   the far side by hand where determinism matters
//!
//! ## Structure
//!
//! - `wire`: codec bijection and on-the-wire shape
//! - `delivery`: ordering, routing, and one-shot semantics
//! - `sync_calls`: the blocking round-trip and its failure modes
//! - `control`: the allow-listed local operation stream

pub mod control;
pub mod delivery;
pub mod sync_calls;
pub mod wire;

/// Common helpers for contract scenarios
pub mod test_helpers {
    use envelope::{channel, Envelope, Value};

    /// Builds a fire-and-forget application envelope
    pub fn async_event(args: Vec<Value>) -> Envelope {
        Envelope::new(channel::GENERIC_ASYNC, args)
    }

    /// Builds a host-directed envelope
    pub fn host_event(args: Vec<Value>) -> Envelope {
        Envelope::new(channel::HOST_DIRECTED, args)
    }

    /// Shorthand for a text value
    pub fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }
}
