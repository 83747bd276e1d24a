//! Wire codec for envelopes.
//!
//! JSON over the envelope's derived serialization. The enum tags on
//! [`crate::Value`] travel with the payload, so integer/float identity
//! and map key order survive the round trip: `decode(encode(e)) == e`
//! for every encodable envelope.

use crate::message::Envelope;
use crate::value::Value;
use thiserror::Error;

/// An envelope that could not be serialized.
///
/// The only inputs that reach this today are non-finite floats in the
/// payload, which JSON cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("envelope could not be encoded: {reason}")]
pub struct CodecError {
    /// Human-readable cause
    pub reason: String,
}

/// Inbound bytes that do not decode to a structurally valid envelope.
///
/// Always surfaced to the connection owner: a silently dropped reply
/// would leave a blocked synchronous caller waiting on its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed envelope: {reason}")]
pub struct MalformedEnvelope {
    /// Human-readable cause
    pub reason: String,
}

/// Serializes an envelope for transmission.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    // serde_json would quietly render a non-finite float as `null`,
    // which breaks the round trip on the far side. Reject it here.
    for value in &envelope.arguments {
        check_encodable(value)?;
    }
    serde_json::to_vec(envelope).map_err(|err| CodecError {
        reason: err.to_string(),
    })
}

fn check_encodable(value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Float(x) if !x.is_finite() => Err(CodecError {
            reason: format!("non-finite float {} has no wire representation", x),
        }),
        Value::List(items) => items.iter().try_for_each(check_encodable),
        Value::Map(entries) => entries
            .iter()
            .try_for_each(|(_, nested)| check_encodable(nested)),
        _ => Ok(()),
    }
}

/// Deserializes an envelope received from the wire.
pub fn decode(bytes: &[u8]) -> Result<Envelope, MalformedEnvelope> {
    serde_json::from_slice(bytes).map_err(|err| MalformedEnvelope {
        reason: err.to_string(),
    })
}
