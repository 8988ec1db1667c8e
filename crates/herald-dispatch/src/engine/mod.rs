//! Dispatch engine.
//!
//! Drives one invocation through child resolution, the gate pipeline and
//! the handler, then reports the outcome. The first failing gate ends the
//! dispatch. Refusals are sent through the [`Responder`] and reported to
//! the observer; they are never errors.

pub mod gates;

pub use gates::{Gate, Refusal, Step};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{DispatchError, HandlerFault, HandlerPanic};
use crate::handler::{CommandContext, Handler};
use crate::invocation::Invocation;
use crate::node::ActionNode;
use crate::observer::{Outcome, OutcomeStatus};
use crate::policy::{AllowAll, PolicyProvider, Responder, SilentResponder};
use crate::registry::Registry;

/// How a dispatch ended, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The handler ran and returned `Ok`.
    Completed,
    /// A gate refused the invocation.
    Terminated(Refusal),
    /// The handler faulted and the fault went to the observer.
    Failed,
    /// The help keyword was handled by the node's help responder.
    HelpShown,
    /// No registered action matches the invocation's path.
    Unknown,
}

/// Stateless engine over a shared registry and injected policy.
pub struct Dispatcher {
    registry: Arc<Registry>,
    policy: Arc<dyn PolicyProvider>,
    responder: Arc<dyn Responder>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        policy: Arc<dyn PolicyProvider>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            registry,
            policy,
            responder,
        }
    }

    /// Dispatcher that admits every policy check and drops replies.
    pub fn with_defaults(registry: Arc<Registry>) -> Self {
        Self::new(registry, Arc::new(AllowAll), Arc::new(SilentResponder))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Dispatch one invocation.
    ///
    /// Returns `Err` only for a handler fault while no observer is
    /// installed. A panicking handler with no observer unwinds through
    /// this call.
    pub fn dispatch(&self, invocation: Invocation) -> Result<Dispatch, DispatchError> {
        let Some((root, mut node, mut action)) = self.locate(&invocation) else {
            debug!(path = ?invocation.path, "No action matches invocation");
            return Ok(Dispatch::Unknown);
        };
        let mut invocation = invocation;
        let help_word = self.registry.help_word();

        let mut admitted = false;
        let mut step = gates::resolve(&node, &invocation, help_word);
        loop {
            step = match step {
                Step::Delegate(child, rest) => {
                    invocation = invocation.delegate(child.name(), rest);
                    action.push(' ');
                    action.push_str(child.name());
                    node = child;
                    admitted = false;
                    gates::resolve(&node, &invocation, help_word)
                }
                Step::Help(responder) => {
                    debug!(action = %action, "Showing help");
                    return self.execute(&root, node, &action, invocation, responder, Run::Help);
                }
                Step::Terminate(refusal) => {
                    self.responder.send(&invocation, &refusal.message);
                    self.notify(Outcome::new(
                        node,
                        invocation,
                        OutcomeStatus::Terminated(refusal.clone()),
                    ));
                    return Ok(Dispatch::Terminated(refusal));
                }
                Step::Proceed if !admitted => {
                    admitted = true;
                    gates::admit(
                        &node,
                        &action,
                        &invocation,
                        self.registry.settings(),
                        self.policy.as_ref(),
                        self.registry.cooldowns(),
                    )
                }
                Step::Proceed => break,
            };
        }

        let handler = Arc::clone(node.handler());
        self.execute(&root, node, &action, invocation, handler, Run::Action)
    }

    /// Find the top-level node and the node addressed by the invocation's
    /// path, along with the node's qualified name.
    ///
    /// Aliases only apply to text invocations. Structured paths were
    /// registered with the platform by name.
    fn locate(&self, invocation: &Invocation) -> Option<(Arc<ActionNode>, Arc<ActionNode>, String)> {
        let (first, rest) = invocation.path.split_first()?;
        let by_alias = invocation.args.is_text();
        let root = self.registry.find(first, by_alias)?;
        let mut node = Arc::clone(&root);
        let mut action = root.name().to_string();
        for segment in rest {
            let child = if by_alias {
                node.child(segment)
            } else {
                node.children().iter().find(|c| c.matches_name(segment))
            };
            node = Arc::clone(child?);
            action.push(' ');
            action.push_str(node.name());
        }
        Some((root, node, action))
    }

    fn execute(
        &self,
        root: &ActionNode,
        node: Arc<ActionNode>,
        action: &str,
        invocation: Invocation,
        handler: Arc<dyn Handler>,
        run: Run,
    ) -> Result<Dispatch, DispatchError> {
        let ctx = CommandContext::new(
            invocation,
            Arc::clone(&node),
            Arc::clone(&self.registry),
            Arc::clone(&self.responder),
        );
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&ctx)));
        let invocation = ctx.into_invocation();

        let fault: HandlerFault = match result {
            Ok(Ok(())) if run == Run::Help => return Ok(Dispatch::HelpShown),
            Ok(Ok(())) => {
                self.registry.record_usage(root.name());
                debug!(action, "Action completed");
                self.notify(Outcome::new(node, invocation, OutcomeStatus::Completed));
                return Ok(Dispatch::Completed);
            }
            Ok(Err(fault)) => fault,
            Err(payload) => {
                if self.registry.observer().is_none() {
                    panic::resume_unwind(payload);
                }
                Box::new(HandlerPanic(panic_message(payload.as_ref())))
            }
        };

        match self.registry.observer() {
            Some(observer) => {
                warn!(action, error = %fault, "Handler fault reported to observer");
                observer.on_outcome(&Outcome::new(node, invocation, OutcomeStatus::Failed(fault)));
                Ok(Dispatch::Failed)
            }
            None => Err(DispatchError::Handler {
                action: action.to_string(),
                source: fault,
            }),
        }
    }

    fn notify(&self, outcome: Outcome) {
        if let Some(observer) = self.registry.observer() {
            observer.on_outcome(&outcome);
        }
    }
}

/// What `execute` is running. Help responders neither count usage nor
/// report completion; their faults are reported like any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
    Action,
    Help,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
