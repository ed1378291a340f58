//! Bridge contract: the typed boundary between native operations and an
//! embedding runtime.
//!
//! A bridge is a host object with a stable identity tag, a declared spec key,
//! and a fixed operation set. The embedding side talks JSON; implementations
//! unmarshal arguments into native types, run the typed operation, and
//! marshal the result back. Bridges hold no mutable state between calls, so
//! one instance is shared read-only across all callers for the lifetime of
//! the embedding context.

use crate::boundary::HostInfo;
use crate::spec::{BridgeTag, OperationId, SpecKey};
use serde_json::Value;
use std::fmt;

pub mod foundation;
pub mod registry;

pub use foundation::FoundationModels;
pub use registry::BridgeRegistry;

/// A capability bridge: named, typed operations behind a stable identity tag.
///
/// Implementations must be pure functions of their arguments so invocations
/// can run concurrently and repeat with identical results.
pub trait CapabilityBridge: Send + Sync {
    /// Stable, non-empty identity tag, fixed at construction.
    fn tag(&self) -> &str;

    /// Key of the versioned spec this bridge implements.
    fn spec_key(&self) -> SpecKey;

    /// Implementation version recorded alongside the tag.
    fn version(&self) -> &str {
        "1"
    }

    /// Operation ids this bridge answers, in declaration order.
    fn operations(&self) -> Vec<OperationId>;

    /// Whether the bridge can serve calls on the given host.
    ///
    /// Pure-compute bridges are available everywhere; bridges wrapping
    /// platform services override this to gate dispatch.
    fn available(&self, host: &HostInfo) -> bool {
        let _ = host;
        true
    }

    /// Unmarshal `args`, run the named operation, and marshal the result.
    fn invoke(&self, operation: &OperationId, args: &Value) -> Result<Value, InvokeError>;
}

/// Errors crossing the invocation boundary.
///
/// Each variant carries a machine-readable code so records stay greppable;
/// the marshaling-level variants map to the `rejected` record status and
/// never reach the typed operation bodies.
#[derive(Debug)]
pub enum InvokeError {
    UnknownOperation {
        operation: OperationId,
    },
    ArgumentParsing {
        operation: OperationId,
        detail: String,
    },
    Unavailable {
        tag: BridgeTag,
    },
    Execution {
        operation: OperationId,
        detail: String,
    },
}

impl InvokeError {
    pub fn code(&self) -> &'static str {
        match self {
            InvokeError::UnknownOperation { .. } => "UNKNOWN_OPERATION",
            InvokeError::ArgumentParsing { .. } => "ARGUMENT_PARSING_ERROR",
            InvokeError::Unavailable { .. } => "BRIDGE_UNAVAILABLE",
            InvokeError::Execution { .. } => "EXECUTION_ERROR",
        }
    }

    /// Record status this error maps to: `rejected` when the call never
    /// reached the operation body, `error` otherwise.
    pub fn status(&self) -> &'static str {
        match self {
            InvokeError::UnknownOperation { .. }
            | InvokeError::ArgumentParsing { .. }
            | InvokeError::Unavailable { .. } => "rejected",
            InvokeError::Execution { .. } => "error",
        }
    }
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::UnknownOperation { operation } => {
                write!(f, "unknown operation: {}", operation.0)
            }
            InvokeError::ArgumentParsing { operation, detail } => {
                write!(f, "failed to parse arguments for {}: {detail}", operation.0)
            }
            InvokeError::Unavailable { tag } => {
                write!(f, "bridge {} is unavailable on this host", tag.0)
            }
            InvokeError::Execution { operation, detail } => {
                write!(f, "operation {} failed: {detail}", operation.0)
            }
        }
    }
}

impl std::error::Error for InvokeError {}
