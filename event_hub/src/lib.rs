//! # Event Hub
//!
//! This crate routes inbound envelopes to registered handlers by
//! channel tag.
//!
//! ## Philosophy
//!
//! - **Set semantics**: any number of persistent handlers per channel;
//!   all fire, in registration order
//! - **One-shot means once**: a one-shot registration is removed
//!   before its handler runs, so it can never double-fire
//! - **Unknown tags are a no-op**: unhandled application channels are
//!   dropped silently for forward compatibility; unhandled `control:*`
//!   tags are an error, because a lost control message is a bug on one
//!   side of the connection
//!
//! The sender handle reaches every handler as an explicit argument on
//! [`EventContext`], never as a field stamped onto shared state.

use envelope::{channel, CorrelationId, Envelope, Value};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    /// Creates a new random registration ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reg({})", self.0)
    }
}

/// Registration lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Lives until explicitly unregistered
    Persistent,
    /// Removed atomically before its first invocation
    OneShot,
}

/// Per-invocation context handed to every handler.
#[derive(Debug)]
pub struct EventContext<'a, S> {
    /// Handle for sending envelopes back to the peer that sent this one
    pub sender: &'a S,
    /// Channel tag the envelope arrived on
    pub channel: &'a str,
    /// Correlation id, present for synchronous traffic
    pub correlation_id: Option<CorrelationId>,
}

/// Handler invocation function
pub type Handler<S> = Box<dyn FnMut(&EventContext<'_, S>, &[Value]) + Send>;

/// Dispatch failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A `control:*` envelope arrived for an operation nobody listens
    /// on. Reported to the connection owner; non-fatal.
    #[error("unknown control operation: {op}")]
    UnknownControlOp {
        /// Operation name from the channel tag
        op: String,
    },
}

struct Registration<S> {
    id: RegistrationId,
    channel: String,
    mode: DeliveryMode,
    handler: Handler<S>,
}

/// Mapping from channel tag to registered handlers.
pub struct EventHub<S> {
    registrations: Vec<Registration<S>>,
}

impl<S> EventHub<S> {
    /// Creates an empty hub
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Registers a handler for a channel tag
    pub fn register(
        &mut self,
        channel: impl Into<String>,
        mode: DeliveryMode,
        handler: Handler<S>,
    ) -> RegistrationId {
        let id = RegistrationId::new();
        self.registrations.push(Registration {
            id,
            channel: channel.into(),
            mode,
            handler,
        });
        id
    }

    /// Removes a registration. Returns false if it was already gone.
    pub fn unregister(&mut self, id: RegistrationId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|entry| entry.id != id);
        self.registrations.len() != before
    }

    /// Counts live registrations for a channel tag
    pub fn handler_count(&self, channel: &str) -> usize {
        self.registrations
            .iter()
            .filter(|entry| entry.channel == channel)
            .count()
    }

    /// Counts all live registrations
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Checks if no handlers are registered
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Delivers an envelope to every handler registered for its
    /// channel, in registration order.
    ///
    /// Returns the number of handlers that fired. Zero handlers on an
    /// application channel is a forward-compatible no-op; zero
    /// handlers on a `control:*` channel is
    /// [`DispatchError::UnknownControlOp`].
    pub fn dispatch(&mut self, sender: &S, envelope: &Envelope) -> Result<usize, DispatchError> {
        let matching: Vec<RegistrationId> = self
            .registrations
            .iter()
            .filter(|entry| entry.channel == envelope.channel)
            .map(|entry| entry.id)
            .collect();

        if matching.is_empty() {
            if let Some(op) = channel::control_op(&envelope.channel) {
                return Err(DispatchError::UnknownControlOp { op: op.to_string() });
            }
            return Ok(0);
        }

        let context = EventContext {
            sender,
            channel: &envelope.channel,
            correlation_id: envelope.correlation_id,
        };

        let mut fired = 0;
        for id in matching {
            let Some(position) = self.registrations.iter().position(|entry| entry.id == id)
            else {
                continue;
            };
            match self.registrations[position].mode {
                DeliveryMode::OneShot => {
                    // Removed before invocation: re-registration inside
                    // the handler can never double-fire for this
                    // envelope.
                    let mut entry = self.registrations.remove(position);
                    (entry.handler)(&context, &envelope.arguments);
                }
                DeliveryMode::Persistent => {
                    (self.registrations[position].handler)(&context, &envelope.arguments);
                }
            }
            fired += 1;
        }
        Ok(fired)
    }
}

impl<S> Default for EventHub<S> {
    fn default() -> Self {
        Self::new()
    }
}
