//! Structured fault reporting for the delivery loop.
//!
//! Faults local to one envelope are collected as values and handed to
//! the connection owner with each pump step, never logged away or
//! dropped: a swallowed decode failure could hide the loss of a reply
//! someone is blocked on.

use thiserror::Error;

/// A non-fatal failure observed while delivering one envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFault {
    /// Inbound bytes did not decode to an envelope
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// Human-readable cause
        reason: String,
    },

    /// A control envelope named an operation nobody exposes
    #[error("unknown control operation: {op}")]
    UnknownControlOp {
        /// Operation name
        op: String,
    },

    /// A control envelope was structurally valid but its payload was not
    #[error("bad control payload: {reason}")]
    BadControlPayload {
        /// Human-readable cause
        reason: String,
    },

    /// An allow-listed local operation ran and failed
    #[error("local operation '{op}' failed: {reason}")]
    LocalOpFailed {
        /// Operation name
        op: String,
        /// Human-readable cause
        reason: String,
    },
}

/// Outcome of one pump step.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PumpReport {
    /// Handler invocations performed
    pub delivered: usize,
    /// Per-envelope faults, in observation order
    pub faults: Vec<DeliveryFault>,
    /// True if the transport reported terminal disconnection
    pub disconnected: bool,
}

impl PumpReport {
    /// Checks that the step saw no faults and no disconnect
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty() && !self.disconnected
    }
}
