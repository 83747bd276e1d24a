//! Reserved channel tags.
//!
//! A channel tag names one logical message stream multiplexed over the
//! shared transport. Application code may use arbitrary tags; the
//! bridge reserves four.

/// Fire-and-forget application messages.
pub const GENERIC_ASYNC: &str = "generic-async";

/// Synchronous request/reply pairs, always correlated.
pub const GENERIC_SYNC: &str = "generic-sync";

/// Messages addressed to the direct embedding context rather than the
/// top-level privileged process.
pub const HOST_DIRECTED: &str = "host-directed";

/// Prefix for internal control streams (`control:<op>`).
pub const CONTROL_PREFIX: &str = "control:";

/// The one built-in control operation: invoke a named, host-approved
/// operation on the receiving execution context.
pub const INVOKE_LOCAL_METHOD: &str = "invoke-local-method";

/// Builds the channel tag for a control operation.
pub fn control(op: &str) -> String {
    format!("{}{}", CONTROL_PREFIX, op)
}

/// Checks whether a tag belongs to the control stream.
pub fn is_control(tag: &str) -> bool {
    tag.starts_with(CONTROL_PREFIX)
}

/// Extracts the operation name from a control tag.
pub fn control_op(tag: &str) -> Option<&str> {
    tag.strip_prefix(CONTROL_PREFIX)
}
