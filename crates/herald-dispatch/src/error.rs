//! Error types for the dispatch core.

use crate::capability::{describe, CapabilitySet};

/// Error raised by a handler. Any `std::error::Error` converts into it.
pub type HandlerFault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Validation errors raised synchronously by the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Duplicate action name: '{name}' collides with '{existing}'")]
    DuplicateName { name: String, existing: String },
    #[error("Insert index {index} out of range for {len} actions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Action not registered: {0}")]
    NotFound(String),
}

/// Errors returned from a dispatch to its caller.
///
/// Gate refusals are not errors; they are reported as outcomes. A handler
/// fault only surfaces here when no observer is installed.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Handler for '{action}' failed: {source}")]
    Handler {
        action: String,
        #[source]
        source: HandlerFault,
    },
}

/// Capabilities a subject is missing, as reported by a policy provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing capabilities: {}", describe(.missing))]
pub struct CapabilityDenied {
    pub missing: CapabilitySet,
}

/// Handler panic converted into a fault for observers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Handler panicked: {0}")]
pub struct HandlerPanic(pub String);
