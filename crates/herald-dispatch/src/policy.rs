//! Boundaries to the hosting application.
//!
//! The dispatcher does not know how modules are toggled, how access levels
//! are assigned, or how messages reach the platform. It asks a
//! [`PolicyProvider`] and speaks through a [`Responder`].

use crate::capability::CapabilitySet;
use crate::error::CapabilityDenied;
use crate::invocation::Invocation;
use crate::node::AccessLevel;

/// Whose capabilities are being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    /// The member who triggered the invocation.
    Actor,
    /// The bot itself.
    Agent,
}

/// Answers policy questions for workspace invocations.
pub trait PolicyProvider: Send + Sync {
    /// Whether `module` is enabled where the invocation happened.
    fn module_enabled(&self, invocation: &Invocation, module: &str) -> bool;

    /// Whether the invoking actor meets `level`.
    fn has_access(&self, invocation: &Invocation, level: AccessLevel) -> bool;

    /// Check that `subject` holds every capability in `required`.
    fn check_capabilities(
        &self,
        subject: Subject,
        invocation: &Invocation,
        required: &CapabilitySet,
    ) -> Result<(), CapabilityDenied>;
}

/// Policy that admits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PolicyProvider for AllowAll {
    fn module_enabled(&self, _invocation: &Invocation, _module: &str) -> bool {
        true
    }

    fn has_access(&self, _invocation: &Invocation, _level: AccessLevel) -> bool {
        true
    }

    fn check_capabilities(
        &self,
        _subject: Subject,
        _invocation: &Invocation,
        _required: &CapabilitySet,
    ) -> Result<(), CapabilityDenied> {
        Ok(())
    }
}

/// Sends user-visible messages. Fire-and-forget: delivery failures are the
/// responder's concern.
pub trait Responder: Send + Sync {
    fn send(&self, invocation: &Invocation, message: &str);
}

/// Responder that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentResponder;

impl Responder for SilentResponder {
    fn send(&self, invocation: &Invocation, message: &str) {
        tracing::trace!(invocation = %invocation.id, message, "Dropping reply");
    }
}
