//! Handler contract for action authors.
//!
//! A handler receives the resolved [`CommandContext`] once every gate has
//! admitted the invocation. Returning `Err` (or panicking) is a handler
//! fault; see [`crate::engine`] for how faults are reported.

use std::sync::Arc;

use crate::error::HandlerFault;
use crate::invocation::{Arguments, Invocation};
use crate::node::ActionNode;
use crate::policy::Responder;
use crate::registry::Registry;

/// Everything a handler needs about the invocation it is running for.
pub struct CommandContext {
    invocation: Invocation,
    node: Arc<ActionNode>,
    registry: Arc<Registry>,
    responder: Arc<dyn Responder>,
}

impl CommandContext {
    pub(crate) fn new(
        invocation: Invocation,
        node: Arc<ActionNode>,
        registry: Arc<Registry>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            invocation,
            node,
            registry,
            responder,
        }
    }

    pub(crate) fn into_invocation(self) -> Invocation {
        self.invocation
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// The node being executed (a child when resolution delegated).
    pub fn node(&self) -> &ActionNode {
        &self.node
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn args(&self) -> &Arguments {
        &self.invocation.args
    }

    /// Argument text left after child resolution.
    pub fn args_text(&self) -> &str {
        self.invocation.args.text()
    }

    /// Send a message back to where the invocation came from.
    pub fn reply(&self, message: &str) {
        self.responder.send(&self.invocation, message);
    }
}

/// Business logic bound to an action node.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &CommandContext) -> Result<(), HandlerFault>;
}

impl<F> Handler for F
where
    F: Fn(&CommandContext) -> Result<(), HandlerFault> + Send + Sync,
{
    fn handle(&self, ctx: &CommandContext) -> Result<(), HandlerFault> {
        self(ctx)
    }
}

/// Wrap a closure as a handler, pinning its argument type so the closure
/// signature is inferred without annotations.
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&CommandContext) -> Result<(), HandlerFault> + Send + Sync + 'static,
{
    f
}

/// Handler that does nothing. Useful for pure router nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl Handler for NoopHandler {
    fn handle(&self, _ctx: &CommandContext) -> Result<(), HandlerFault> {
        Ok(())
    }
}

pub fn noop() -> NoopHandler {
    NoopHandler
}
