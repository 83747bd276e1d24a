//! Synchronous call contract tests: the blocking round-trip, its
//! ordering guarantees while blocked, and its failure modes.
//!
//! The deadline on synchronous calls is a safety net, not something
//! the wire protocol requires; the timeout tests below pin it so it
//! cannot regress to an indefinite block.
