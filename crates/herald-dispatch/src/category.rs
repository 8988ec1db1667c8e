//! Category gates.
//!
//! A category groups related actions and may carry a predicate that must
//! hold for an invocation before any action in the category runs. A
//! category without a predicate is a plain marker and always admits.

use std::fmt;
use std::sync::Arc;

use crate::invocation::Invocation;

type Predicate = Arc<dyn Fn(&Invocation) -> bool + Send + Sync>;

/// Message used when a failing category has no message of its own.
pub const DEFAULT_FAILURE_MESSAGE: &str = "You cannot use that command here.";

/// A named precondition shared by a group of actions.
#[derive(Clone)]
pub struct Category {
    name: String,
    failure_message: Option<String>,
    predicate: Option<Predicate>,
}

impl Category {
    /// Create a marker category that always admits.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure_message: None,
            predicate: None,
        }
    }

    /// Set the message sent when the predicate refuses an invocation.
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    /// Attach a predicate evaluated once per invocation.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Invocation) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }

    /// Whether this category carries a predicate at all.
    pub fn is_conditional(&self) -> bool {
        self.predicate.is_some()
    }

    /// Evaluate the gate for an invocation.
    pub fn test(&self, invocation: &Invocation) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(invocation),
            None => true,
        }
    }

    /// The message to show when `test` returns false.
    pub fn refusal_message(&self) -> &str {
        self.failure_message
            .as_deref()
            .unwrap_or(DEFAULT_FAILURE_MESSAGE)
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Category")
            .field("name", &self.name)
            .field("failure_message", &self.failure_message)
            .field("conditional", &self.predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::types::{ActorId, SurfaceId};

    fn invocation(actor: u64) -> Invocation {
        Invocation::text(ActorId(actor), SurfaceId(1), "music", "")
    }

    #[test]
    fn test_marker_category_always_admits() {
        let category = Category::new("Fun");
        assert!(!category.is_conditional());
        assert!(category.test(&invocation(1)));
    }

    #[test]
    fn test_predicate_is_evaluated_per_invocation() {
        let category = Category::new("Music")
            .with_failure_message("Join a voice channel first.")
            .with_predicate(|inv| inv.actor == ActorId(7));
        assert!(category.is_conditional());
        assert!(category.test(&invocation(7)));
        assert!(!category.test(&invocation(8)));
        assert_eq!(category.refusal_message(), "Join a voice channel first.");
    }

    #[test]
    fn test_default_refusal_message() {
        let category = Category::new("Admin").with_predicate(|_| false);
        assert_eq!(category.failure_message(), None);
        assert_eq!(category.refusal_message(), DEFAULT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_equality_is_by_name() {
        let a = Category::new("Mod").with_predicate(|_| true);
        let b = Category::new("Mod");
        assert_eq!(a, b);
        assert_ne!(a, Category::new("Fun"));
    }
}
