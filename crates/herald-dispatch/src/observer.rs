//! Outcome reporting.
//!
//! Every dispatch that reaches a node ends in exactly one [`Outcome`]:
//! completed, terminated by a gate, or failed inside the handler. A help
//! responder that succeeds reports nothing. Plain,
//! message-context and actor-context actions share this one shape and are
//! told apart by `kind`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::engine::gates::Refusal;
use crate::error::HandlerFault;
use crate::invocation::Invocation;
use crate::node::{ActionKind, ActionNode};

/// How a dispatch ended.
#[derive(Debug)]
pub enum OutcomeStatus {
    Completed,
    Terminated(Refusal),
    Failed(HandlerFault),
}

/// A finished dispatch.
#[derive(Debug)]
pub struct Outcome {
    pub kind: ActionKind,
    pub node: Arc<ActionNode>,
    pub invocation: Invocation,
    pub status: OutcomeStatus,
    pub finished_at: DateTime<Utc>,
}

impl Outcome {
    pub(crate) fn new(node: Arc<ActionNode>, invocation: Invocation, status: OutcomeStatus) -> Self {
        Self {
            kind: node.kind(),
            node,
            invocation,
            status,
            finished_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Completed)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.status, OutcomeStatus::Terminated(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed(_))
    }

    pub fn refusal(&self) -> Option<&Refusal> {
        match &self.status {
            OutcomeStatus::Terminated(refusal) => Some(refusal),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&HandlerFault> {
        match &self.status {
            OutcomeStatus::Failed(fault) => Some(fault),
            _ => None,
        }
    }
}

/// Consumer of dispatch outcomes.
///
/// Installing an observer also changes fault handling: with an observer,
/// handler faults are reported here and the dispatch returns normally.
pub trait Observer: Send + Sync {
    fn on_outcome(&self, outcome: &Outcome);
}

/// Observer that writes each outcome to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_outcome(&self, outcome: &Outcome) {
        let action = outcome.node.name();
        let invocation = outcome.invocation.id.to_string();
        match &outcome.status {
            OutcomeStatus::Completed => {
                tracing::info!(action, kind = %outcome.kind, invocation = %invocation, "Action completed");
            }
            OutcomeStatus::Terminated(refusal) => {
                tracing::info!(
                    action,
                    kind = %outcome.kind,
                    invocation = %invocation,
                    gate = %refusal.gate,
                    message = %refusal.message,
                    "Action refused"
                );
            }
            OutcomeStatus::Failed(fault) => {
                tracing::warn!(action, kind = %outcome.kind, invocation = %invocation, error = %fault, "Action failed");
            }
        }
    }
}
