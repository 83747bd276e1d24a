//! The execution-context collaborator: host-approved local operations.
//!
//! A `control:invoke-local-method` envelope names an operation and
//! carries its arguments. The bridge looks the name up in a fixed
//! allow-list exposed by this trait and invokes it; nothing outside the
//! list is reachable from the wire.

use envelope::Value;
use thiserror::Error;

/// Local operation failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalOpError {
    /// The operation name is not in the allow-list
    #[error("unknown local operation: {0}")]
    Unknown(String),

    /// The operation ran and failed
    #[error("local operation '{op}' failed: {reason}")]
    Failed {
        /// Operation name
        op: String,
        /// Human-readable cause
        reason: String,
    },
}

/// A set of named operations the host may invoke on this execution
/// context.
///
/// The bridge neither defines nor validates these beyond name lookup.
pub trait LocalOps {
    /// Invokes a named operation with positional arguments
    fn invoke(&mut self, op: &str, args: &[Value]) -> Result<(), LocalOpError>;
}

/// An execution context exposing no operations at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalOps;

impl LocalOps for NoLocalOps {
    fn invoke(&mut self, op: &str, _args: &[Value]) -> Result<(), LocalOpError> {
        Err(LocalOpError::Unknown(op.to_string()))
    }
}

/// Operation implementation function
pub type OpFn = Box<dyn FnMut(&[Value]) -> Result<(), String> + Send>;

/// A concrete allow-list: operation name to implementation.
#[derive(Default)]
pub struct OpTable {
    ops: Vec<(String, OpFn)>,
}

impl OpTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation to the allow-list
    pub fn register(&mut self, name: impl Into<String>, op: OpFn) {
        self.ops.push((name.into(), op));
    }

    /// Checks whether a name is allow-listed
    pub fn contains(&self, name: &str) -> bool {
        self.ops.iter().any(|(registered, _)| registered == name)
    }
}

impl LocalOps for OpTable {
    fn invoke(&mut self, op: &str, args: &[Value]) -> Result<(), LocalOpError> {
        let Some((_, implementation)) = self
            .ops
            .iter_mut()
            .find(|(registered, _)| registered.as_str() == op)
        else {
            return Err(LocalOpError::Unknown(op.to_string()));
        };
        implementation(args).map_err(|reason| LocalOpError::Failed {
            op: op.to_string(),
            reason,
        })
    }
}
