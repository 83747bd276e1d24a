//! # Transport
//!
//! This crate defines the duplex channel between exactly two bridge
//! endpoints, and an in-process reference implementation.
//!
//! ## Philosophy
//!
//! - **Reliable and ordered**: envelopes arrive exactly once, in send
//!   order, per direction
//! - **No application semantics**: the transport moves envelopes; it
//!   never inspects channel tags or correlation ids
//! - **Disconnection is terminal and loud**: every blocked receiver is
//!   woken with [`TransportError::Disconnected`], never left hanging
//!
//! ## Architecture
//!
//! [`Transport`] is the seam the bridge is generic over. The concrete
//! [`MemoryTransport`] carries *encoded* frames between two in-process
//! endpoints, so the codec sits on the delivery path exactly as it
//! would over a real medium.

pub mod memory;

use envelope::{Envelope, MalformedEnvelope};
use std::time::Duration;
use thiserror::Error;

pub use memory::{MemorySender, MemoryTransport};

/// Transport failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer endpoint is gone; terminal for the connection.
    #[error("transport disconnected")]
    Disconnected,

    /// An inbound frame did not decode. Local to one frame; the
    /// connection stays open.
    #[error(transparent)]
    Malformed(#[from] MalformedEnvelope),

    /// An outbound envelope could not be serialized.
    #[error("envelope could not be encoded: {0}")]
    Encode(String),
}

/// A cloneable handle that can push envelopes toward the peer.
///
/// Dispatch hands one of these to every handler invocation, so a
/// handler can reply without owning the transport.
pub trait EnvelopeSender: Clone {
    /// Queues an envelope for delivery to the peer.
    fn send_envelope(&self, envelope: Envelope) -> Result<(), TransportError>;
}

/// Duplex, reliable, ordered delivery of envelopes between exactly two
/// endpoints.
pub trait Transport {
    /// Handle type passed to handlers for replies.
    type Sender: EnvelopeSender;

    /// Queues an envelope for the peer. Non-blocking.
    fn send(&mut self, envelope: Envelope) -> Result<(), TransportError>;

    /// Takes the next inbound envelope.
    ///
    /// `wait = None` polls and returns immediately; `wait = Some(d)`
    /// blocks up to `d`. `Ok(None)` means nothing arrived in time.
    /// Frames already queued are drained even after the peer
    /// disconnects; only then does this return
    /// [`TransportError::Disconnected`].
    fn receive(&mut self, wait: Option<Duration>) -> Result<Option<Envelope>, TransportError>;

    /// Returns a reply handle for this endpoint.
    fn sender(&self) -> Self::Sender;

    /// Checks whether the peer is still attached.
    fn is_connected(&self) -> bool;
}
