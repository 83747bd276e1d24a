//! Wire contract tests.
//!
//! These pin the reserved channel tags and the envelope's on-the-wire
//! shape. A failure here means the two ends of an existing deployment
//! can no longer talk.
