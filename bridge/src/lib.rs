//! # Bridge
//!
//! This crate exposes the client-facing messaging API between an
//! untrusted execution context and its privileged host: fire-and-forget
//! sends, blocking synchronous round-trips, and host-directed events,
//! multiplexed over one transport.
//!
//! ## Philosophy
//!
//! - **Blocking without reentrancy**: a synchronous call pumps the
//!   transport for its own reply and *queues* everything else; queued
//!   envelopes are dispatched, in arrival order, by the next normal
//!   pump step
//! - **No caller left behind**: disconnection resolves every pending
//!   synchronous call with an error; a blocked caller gets a normal
//!   error result, never a silent hang
//! - **Faults are values**: per-envelope failures are collected into
//!   the pump report for the connection owner, and never abort
//!   delivery of subsequent envelopes
//!
//! ## Architecture
//!
//! A [`Bridge`] owns its transport endpoint, an event hub for inbound
//! dispatch, and a pending-call table. The reserved control stream
//! (`control:invoke-local-method`) invokes operations from the
//! [`LocalOps`] allow-list; nothing outside the list is reachable from
//! the wire.

pub mod local_ops;
pub mod pending;
pub mod report;

use envelope::{channel, CorrelationId, Envelope, Value};
use event_hub::{DeliveryMode, DispatchError, EventContext, EventHub, RegistrationId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use transport::{EnvelopeSender, Transport, TransportError};

pub use local_ops::{LocalOpError, LocalOps, NoLocalOps, OpFn, OpTable};
pub use pending::{CallState, PendingCallTable};
pub use report::{DeliveryFault, PumpReport};

/// Bridge failure taxonomy for the calling side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The connection failed while a synchronous call was pending
    #[error("synchronous call failed: {reason}")]
    SyncCallFailed {
        /// Human-readable cause
        reason: String,
    },

    /// No reply arrived within the configured deadline
    #[error("synchronous call timed out after {timeout:?}")]
    SyncCallTimeout {
        /// The deadline that elapsed
        timeout: Duration,
    },

    /// The transport rejected an outbound envelope
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Tunables for one bridge instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Deadline for synchronous calls.
    ///
    /// A peer that never replies fails the call with
    /// [`BridgeError::SyncCallTimeout`] instead of blocking the caller
    /// forever.
    pub sync_timeout: Duration,
}

impl BridgeConfig {
    /// Sets the synchronous call deadline
    pub fn with_sync_timeout(mut self, sync_timeout: Duration) -> Self {
        self.sync_timeout = sync_timeout;
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sync_timeout: Duration::from_secs(5),
        }
    }
}

/// One side of the messaging bridge.
///
/// Each process owns exactly one `Bridge` per connection; the two
/// bridges share nothing but the transport between them.
pub struct Bridge<T: Transport> {
    transport: T,
    hub: EventHub<T::Sender>,
    pending: PendingCallTable,
    deferred: VecDeque<Envelope>,
    faults: Arc<Mutex<Vec<DeliveryFault>>>,
    next_correlation: u64,
    config: BridgeConfig,
}

impl<T: Transport> Bridge<T> {
    /// Creates a bridge with the default configuration
    pub fn new(transport: T, local_ops: impl LocalOps + Send + 'static) -> Self {
        Self::with_config(transport, local_ops, BridgeConfig::default())
    }

    /// Creates a bridge with explicit configuration
    pub fn with_config(
        transport: T,
        mut local_ops: impl LocalOps + Send + 'static,
        config: BridgeConfig,
    ) -> Self {
        let faults = Arc::new(Mutex::new(Vec::new()));
        let mut hub = EventHub::new();

        // The bridge's own listener on the reserved control stream:
        // payload is [operation name, args...]; failures become
        // reported faults so a bad operation cannot corrupt delivery
        // of later envelopes.
        let sink = Arc::clone(&faults);
        hub.register(
            channel::control(channel::INVOKE_LOCAL_METHOD),
            DeliveryMode::Persistent,
            Box::new(move |_context, args| {
                let fault = match args.split_first() {
                    Some((Value::Text(op), op_args)) => match local_ops.invoke(op, op_args) {
                        Ok(()) => None,
                        Err(LocalOpError::Unknown(op)) => {
                            Some(DeliveryFault::UnknownControlOp { op })
                        }
                        Err(LocalOpError::Failed { op, reason }) => {
                            Some(DeliveryFault::LocalOpFailed { op, reason })
                        }
                    },
                    _ => Some(DeliveryFault::BadControlPayload {
                        reason: "payload must start with an operation name".to_string(),
                    }),
                };
                if let Some(fault) = fault {
                    lock(&sink).push(fault);
                }
            }),
        );

        Self {
            transport,
            hub,
            pending: PendingCallTable::new(),
            deferred: VecDeque::new(),
            faults,
            next_correlation: 0,
            config,
        }
    }

    /// Fire-and-forget send on the generic application stream.
    ///
    /// Returns once the envelope is handed to the transport; delivery
    /// order relative to other `send`/`send_sync` calls is preserved.
    pub fn send(&mut self, args: Vec<Value>) -> Result<(), BridgeError> {
        self.transport
            .send(Envelope::new(channel::GENERIC_ASYNC, args))?;
        Ok(())
    }

    /// Like [`Bridge::send`], but addressed to the direct embedding
    /// context; the peer routes these to a distinct handler set.
    pub fn send_to_host(&mut self, args: Vec<Value>) -> Result<(), BridgeError> {
        self.transport
            .send(Envelope::new(channel::HOST_DIRECTED, args))?;
        Ok(())
    }

    /// Blocking synchronous round-trip.
    ///
    /// Sends a correlated request and blocks until the matching reply
    /// arrives, the transport disconnects
    /// ([`BridgeError::SyncCallFailed`]), or the configured deadline
    /// elapses ([`BridgeError::SyncCallTimeout`]). Unrelated envelopes
    /// arriving meanwhile are queued, not dispatched; the next
    /// [`Bridge::pump`] delivers them in original arrival order.
    pub fn send_sync(&mut self, args: Vec<Value>) -> Result<Value, BridgeError> {
        let id = self.allocate_correlation();
        self.pending.insert(id);

        let request = Envelope::new(channel::GENERIC_SYNC, args).with_correlation(id);
        if let Err(err) = self.transport.send(request) {
            self.pending.take(id);
            if err == TransportError::Disconnected {
                self.pending.fail_all("transport disconnected");
                return Err(BridgeError::SyncCallFailed {
                    reason: "transport disconnected before the request was sent".to_string(),
                });
            }
            return Err(err.into());
        }

        let deadline = Instant::now() + self.config.sync_timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                self.pending.time_out(id);
                self.pending.take(id);
                return Err(BridgeError::SyncCallTimeout {
                    timeout: self.config.sync_timeout,
                });
            }

            match self.transport.receive(Some(deadline - now)) {
                Ok(Some(reply))
                    if reply.channel == channel::GENERIC_SYNC
                        && reply.correlation_id == Some(id) =>
                {
                    match unwrap_reply(reply) {
                        Ok(value) => {
                            self.pending.fulfill(id, value);
                        }
                        Err(err) => {
                            self.pending.take(id);
                            return Err(err);
                        }
                    }
                    return match self.pending.take(id) {
                        Some(CallState::Fulfilled(value)) => Ok(value),
                        _ => Err(BridgeError::SyncCallFailed {
                            reason: "pending call bookkeeping lost the reply".to_string(),
                        }),
                    };
                }
                Ok(Some(unrelated)) => self.deferred.push_back(unrelated),
                Ok(None) => {}
                Err(TransportError::Malformed(err)) => {
                    lock(&self.faults).push(DeliveryFault::MalformedEnvelope { reason: err.reason });
                }
                Err(TransportError::Disconnected) => {
                    self.pending.fail_all("transport disconnected");
                    let reason = match self.pending.take(id) {
                        Some(CallState::Failed(reason)) => reason,
                        _ => "transport disconnected".to_string(),
                    };
                    return Err(BridgeError::SyncCallFailed { reason });
                }
                Err(err) => {
                    self.pending.take(id);
                    return Err(err.into());
                }
            }
        }
    }

    /// Registers a persistent listener on a channel tag
    pub fn on(
        &mut self,
        channel: impl Into<String>,
        handler: impl FnMut(&EventContext<'_, T::Sender>, &[Value]) + Send + 'static,
    ) -> RegistrationId {
        self.hub
            .register(channel, DeliveryMode::Persistent, Box::new(handler))
    }

    /// Registers a one-shot listener on a channel tag
    pub fn once(
        &mut self,
        channel: impl Into<String>,
        handler: impl FnMut(&EventContext<'_, T::Sender>, &[Value]) + Send + 'static,
    ) -> RegistrationId {
        self.hub
            .register(channel, DeliveryMode::OneShot, Box::new(handler))
    }

    /// Removes a listener. Returns false if it was already gone.
    pub fn remove_listener(&mut self, id: RegistrationId) -> bool {
        self.hub.unregister(id)
    }

    /// Counts live listeners for a channel tag
    pub fn listener_count(&self, channel: &str) -> usize {
        self.hub.handler_count(channel)
    }

    /// Counts synchronous calls still blocked
    pub fn pending_sync_calls(&self) -> usize {
        self.pending.awaiting()
    }

    /// Checks whether the peer is still attached
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// The normal event-loop step: delivers everything queued while a
    /// synchronous call was blocked, then everything available from
    /// the transport, and reports per-envelope faults.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();
        report.faults.append(&mut lock(&self.faults));

        let backlog: Vec<Envelope> = self.deferred.drain(..).collect();
        for envelope in backlog {
            self.deliver(envelope, &mut report);
        }

        loop {
            match self.transport.receive(None) {
                Ok(Some(envelope)) => self.deliver(envelope, &mut report),
                Ok(None) => break,
                Err(TransportError::Malformed(err)) => report
                    .faults
                    .push(DeliveryFault::MalformedEnvelope { reason: err.reason }),
                Err(TransportError::Disconnected) => {
                    report.disconnected = true;
                    self.pending.fail_all("transport disconnected");
                    break;
                }
                Err(TransportError::Encode(reason)) => {
                    report
                        .faults
                        .push(DeliveryFault::MalformedEnvelope { reason });
                }
            }
        }
        report
    }

    fn deliver(&mut self, envelope: Envelope, report: &mut PumpReport) {
        let sender = self.transport.sender();
        match self.hub.dispatch(&sender, &envelope) {
            Ok(fired) => report.delivered += fired,
            Err(DispatchError::UnknownControlOp { op }) => {
                report.faults.push(DeliveryFault::UnknownControlOp { op });
            }
        }
        report.faults.append(&mut lock(&self.faults));
    }

    fn allocate_correlation(&mut self) -> CorrelationId {
        self.next_correlation = self.next_correlation.wrapping_add(1);
        if self.next_correlation == 0 {
            self.next_correlation = 1;
        }
        CorrelationId::new(self.next_correlation)
    }
}

/// Builds and sends the correlated reply to a synchronous request.
///
/// For use inside a `generic-sync` handler on the serving side; the
/// reply carries exactly one value.
pub fn sync_reply<S: EnvelopeSender>(
    context: &EventContext<'_, S>,
    value: Value,
) -> Result<(), ReplyError> {
    let id = context
        .correlation_id
        .ok_or(ReplyError::MissingCorrelation)?;
    context
        .sender
        .send_envelope(Envelope::new(channel::GENERIC_SYNC, vec![value]).with_correlation(id))?;
    Ok(())
}

/// Failure to reply to a synchronous request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    /// The envelope being answered carried no correlation id
    #[error("cannot reply to an uncorrelated envelope")]
    MissingCorrelation,

    /// The transport rejected the reply
    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn unwrap_reply(reply: Envelope) -> Result<Value, BridgeError> {
    let mut args = reply.arguments;
    if args.len() != 1 {
        return Err(BridgeError::SyncCallFailed {
            reason: format!("reply carried {} values, expected exactly one", args.len()),
        });
    }
    Ok(args.remove(0))
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
