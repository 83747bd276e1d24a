//! # Envelope
//!
//! This crate defines the unit of transmission between the two ends of
//! a messaging bridge: the [`Envelope`], its [`Value`] payload model,
//! the reserved channel tags, and the wire codec.
//!
//! ## Philosophy
//!
//! - **Messages, not shared memory**: everything that crosses the
//!   process boundary is an explicit, self-describing envelope
//! - **Structure survives the wire**: `decode(encode(e)) == e` — the
//!   codec is a bijection over every encodable envelope
//! - **Correlated, not guessed**: request/reply pairing is an explicit
//!   correlation id, never inferred from timing
//!
//! ## Architecture
//!
//! An [`Envelope`] carries:
//! - A channel tag multiplexing logical streams over one transport
//! - A positional sequence of [`Value`] arguments
//! - An optional [`CorrelationId`] linking a synchronous request to
//!   its reply

pub mod channel;
pub mod codec;
pub mod message;
pub mod value;

pub use codec::{decode, encode, CodecError, MalformedEnvelope};
pub use message::{CorrelationId, Envelope};
pub use value::Value;
