//! Gate pipeline.
//!
//! Each check is a pure function of the node, the invocation and the
//! injected policy, returning a [`Step`]. The engine drives the steps; the
//! functions here never send messages or notify observers.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::capability::describe;
use crate::cooldown::CooldownStore;
use crate::handler::Handler;
use crate::invocation::{split_head, Arguments, Invocation};
use crate::node::{same_name, ActionNode};
use crate::policy::{PolicyProvider, Subject};
use crate::registry::ClientSettings;

pub const NOT_OWNER: &str = "Only the bot owner can use this command.";
pub const WORKSPACE_REQUIRED: &str = "This command cannot be used in direct messages.";
pub const ADULT_SURFACE_REQUIRED: &str = "This command can only be used in age-restricted channels.";
pub const ACCESS_DENIED: &str = "You do not have the access level required to use this command.";

/// The check that refused an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Owner,
    Category,
    AdultSurface,
    Module,
    AccessLevel,
    ActorCapabilities,
    AgentCapabilities,
    WorkspaceRequired,
    Cooldown,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gate::Owner => "owner",
            Gate::Category => "category",
            Gate::AdultSurface => "adult_surface",
            Gate::Module => "module",
            Gate::AccessLevel => "access_level",
            Gate::ActorCapabilities => "actor_capabilities",
            Gate::AgentCapabilities => "agent_capabilities",
            Gate::WorkspaceRequired => "workspace_required",
            Gate::Cooldown => "cooldown",
        };
        f.write_str(name)
    }
}

/// A user-facing refusal produced by a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    pub gate: Gate,
    pub message: String,
}

impl Refusal {
    pub fn new(gate: Gate, message: impl Into<String>) -> Self {
        Self {
            gate,
            message: message.into(),
        }
    }
}

/// Decision taken at one point of the pipeline.
pub enum Step {
    /// Continue to the next check, or run the handler after the last one.
    Proceed,
    /// Stop with a refusal.
    Terminate(Refusal),
    /// Re-run the whole pipeline on a child with the remaining text.
    Delegate(Arc<ActionNode>, String),
    /// Run the node's help responder instead of its handler.
    Help(Arc<dyn Handler>),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Proceed => f.write_str("Proceed"),
            Step::Terminate(refusal) => f.debug_tuple("Terminate").field(refusal).finish(),
            Step::Delegate(child, rest) => f
                .debug_tuple("Delegate")
                .field(&child.name())
                .field(rest)
                .finish(),
            Step::Help(_) => f.write_str("Help"),
        }
    }
}

/// Child resolution for text invocations.
///
/// Structured invocations were routed by the platform and always proceed.
pub fn resolve(node: &ActionNode, invocation: &Invocation, help_word: &str) -> Step {
    let text = match &invocation.args {
        Arguments::Text(text) => text,
        Arguments::Structured(_) => return Step::Proceed,
    };
    let (head, rest) = split_head(text);
    if head.is_empty() {
        return Step::Proceed;
    }

    if same_name(head, help_word) {
        if let Some(responder) = node.help_responder() {
            return Step::Help(Arc::clone(responder));
        }
    }

    match node.child(head) {
        Some(child) => {
            debug!(action = node.name(), child = child.name(), "Delegating to child action");
            Step::Delegate(Arc::clone(child), rest.to_string())
        }
        None => Step::Proceed,
    }
}

/// Run the owner, category, origin and cooldown checks in order.
///
/// `action` is the fully qualified action name used for cooldown keys.
/// On a pass the node's cooldown is applied before returning.
pub fn admit(
    node: &ActionNode,
    action: &str,
    invocation: &Invocation,
    settings: &ClientSettings,
    policy: &dyn PolicyProvider,
    cooldowns: &CooldownStore,
) -> Step {
    let is_owner = settings.is_owner(invocation.actor);

    let refusal = check_owner(node, is_owner)
        .or_else(|| check_category(node, invocation))
        .or_else(|| check_origin(node, invocation, policy))
        .or_else(|| check_cooldown(node, action, invocation, is_owner, cooldowns));

    match refusal {
        Some(refusal) => {
            debug!(action, gate = %refusal.gate, "Invocation refused");
            Step::Terminate(refusal)
        }
        None => Step::Proceed,
    }
}

fn check_owner(node: &ActionNode, is_owner: bool) -> Option<Refusal> {
    (node.owner_only() && !is_owner).then(|| Refusal::new(Gate::Owner, NOT_OWNER))
}

fn check_category(node: &ActionNode, invocation: &Invocation) -> Option<Refusal> {
    let category = node.category()?;
    (!category.test(invocation)).then(|| Refusal::new(Gate::Category, category.refusal_message()))
}

fn check_origin(
    node: &ActionNode,
    invocation: &Invocation,
    policy: &dyn PolicyProvider,
) -> Option<Refusal> {
    if !invocation.is_workspace() {
        return node
            .origin_restricted()
            .then(|| Refusal::new(Gate::WorkspaceRequired, WORKSPACE_REQUIRED));
    }

    if node.adult_surface_only() && !invocation.adult_surface {
        return Some(Refusal::new(Gate::AdultSurface, ADULT_SURFACE_REQUIRED));
    }
    if let Some(module) = node.module() {
        if !policy.module_enabled(invocation, module) {
            return Some(Refusal::new(
                Gate::Module,
                format!("The {} module is disabled here.", module),
            ));
        }
    }
    if !node.access_level().is_everyone() && !policy.has_access(invocation, node.access_level()) {
        return Some(Refusal::new(Gate::AccessLevel, ACCESS_DENIED));
    }
    if !node.actor_capabilities().is_empty() {
        if let Err(denied) =
            policy.check_capabilities(Subject::Actor, invocation, node.actor_capabilities())
        {
            return Some(Refusal::new(
                Gate::ActorCapabilities,
                format!(
                    "You need the following permissions to use this command: {}",
                    describe(&denied.missing)
                ),
            ));
        }
    }
    if !node.agent_capabilities().is_empty() {
        if let Err(denied) =
            policy.check_capabilities(Subject::Agent, invocation, node.agent_capabilities())
        {
            return Some(Refusal::new(
                Gate::AgentCapabilities,
                format!(
                    "I need the following permissions to run this command: {}",
                    describe(&denied.missing)
                ),
            ));
        }
    }
    None
}

fn check_cooldown(
    node: &ActionNode,
    action: &str,
    invocation: &Invocation,
    is_owner: bool,
    cooldowns: &CooldownStore,
) -> Option<Refusal> {
    if is_owner || node.cooldown() == 0 {
        return None;
    }
    let key = node.cooldown_scope().key_for(action, invocation);
    let remaining = cooldowns.remaining(&key.key);
    if remaining > 0 {
        return Some(Refusal::new(Gate::Cooldown, key.refusal_message(remaining)));
    }
    if key.fell_back() {
        debug!(
            action,
            requested = %key.requested,
            effective = %key.effective,
            "Cooldown scope fell back"
        );
    }
    cooldowns.apply(&key.key, node.cooldown());
    None
}
