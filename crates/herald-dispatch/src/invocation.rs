//! Inbound invocations.
//!
//! An invocation is what the platform client hands the dispatcher: who
//! triggered which action, where, and with what arguments. Text-triggered
//! invocations carry their arguments as free text and are resolved through
//! child actions by the dispatcher; structured invocations arrive already
//! routed to a leaf by the platform and carry typed options.

use std::collections::BTreeMap;

use herald_core::types::{ActorId, InvocationId, MessageId, Origin, ShardInfo, SurfaceId, WorkspaceId};
use serde::{Deserialize, Serialize};

use crate::node::ActionKind;

/// Arguments attached to an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arguments {
    /// Free text following the action name.
    Text(String),
    /// Typed options keyed by option name.
    Structured(BTreeMap<String, serde_json::Value>),
}

impl Arguments {
    pub fn is_text(&self) -> bool {
        matches!(self, Arguments::Text(_))
    }

    /// Remaining free text, or an empty string for structured arguments.
    pub fn text(&self) -> &str {
        match self {
            Arguments::Text(text) => text,
            Arguments::Structured(_) => "",
        }
    }

    pub fn option(&self, name: &str) -> Option<&serde_json::Value> {
        match self {
            Arguments::Text(_) => None,
            Arguments::Structured(options) => options.get(name),
        }
    }
}

/// Target of a context action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextTarget {
    Message(MessageId),
    Actor(ActorId),
}

/// One inbound, user-triggered action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    pub id: InvocationId,
    pub kind: ActionKind,
    pub actor: ActorId,
    pub origin: Origin,
    pub workspace: Option<WorkspaceId>,
    pub surface: SurfaceId,
    pub shard: Option<ShardInfo>,
    /// Whether the surface is flagged for adult content.
    pub adult_surface: bool,
    pub args: Arguments,
    /// Names from the top-level action down to the addressed node.
    pub path: Vec<String>,
    pub target: Option<ContextTarget>,
}

impl Invocation {
    fn base(kind: ActionKind, actor: ActorId, surface: SurfaceId, path: Vec<String>, args: Arguments) -> Self {
        Self {
            id: InvocationId::new(),
            kind,
            actor,
            origin: Origin::Direct,
            workspace: None,
            surface,
            shard: None,
            adult_surface: false,
            args,
            path,
            target: None,
        }
    }

    /// A text-triggered invocation of top-level action `name`.
    pub fn text(actor: ActorId, surface: SurfaceId, name: &str, args: &str) -> Self {
        Self::base(
            ActionKind::Text,
            actor,
            surface,
            vec![name.to_string()],
            Arguments::Text(args.to_string()),
        )
    }

    /// A structured invocation the platform has already routed to `path`.
    pub fn structured<I, S>(
        actor: ActorId,
        surface: SurfaceId,
        path: I,
        options: BTreeMap<String, serde_json::Value>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::base(
            ActionKind::Text,
            actor,
            surface,
            path.into_iter().map(Into::into).collect(),
            Arguments::Structured(options),
        )
    }

    /// A context action invoked on a message.
    pub fn message_context(actor: ActorId, surface: SurfaceId, name: &str, message: MessageId) -> Self {
        let mut invocation = Self::base(
            ActionKind::MessageContext,
            actor,
            surface,
            vec![name.to_string()],
            Arguments::Structured(BTreeMap::new()),
        );
        invocation.target = Some(ContextTarget::Message(message));
        invocation
    }

    /// A context action invoked on another actor.
    pub fn actor_context(actor: ActorId, surface: SurfaceId, name: &str, target: ActorId) -> Self {
        let mut invocation = Self::base(
            ActionKind::ActorContext,
            actor,
            surface,
            vec![name.to_string()],
            Arguments::Structured(BTreeMap::new()),
        );
        invocation.target = Some(ContextTarget::Actor(target));
        invocation
    }

    /// Mark the invocation as happening inside `workspace`.
    pub fn in_workspace(mut self, workspace: WorkspaceId) -> Self {
        self.origin = Origin::Workspace;
        self.workspace = Some(workspace);
        self
    }

    pub fn on_shard(mut self, shard: ShardInfo) -> Self {
        self.shard = Some(shard);
        self
    }

    pub fn on_adult_surface(mut self) -> Self {
        self.adult_surface = true;
        self
    }

    pub fn is_workspace(&self) -> bool {
        self.origin == Origin::Workspace
    }

    /// Name of the top-level action addressed, if any.
    pub fn root_name(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    /// Copy of this invocation re-targeted at a child action with the
    /// remaining argument text.
    pub(crate) fn delegate(&self, child: &str, rest: String) -> Self {
        let mut next = self.clone();
        next.path.push(child.to_string());
        next.args = Arguments::Text(rest);
        next
    }
}

/// Split text at its first run of whitespace into `(head, rest)`.
///
/// Leading whitespace is ignored; `rest` has its leading whitespace
/// removed and is empty when there is nothing after `head`.
pub fn split_head(text: &str) -> (&str, &str) {
    let trimmed = text.trim_start();
    match trimmed.find(char::is_whitespace) {
        Some(at) => (&trimmed[..at], trimmed[at..].trim_start()),
        None => (trimmed, ""),
    }
}

/// Strip the first matching prefix from `content` and split the remainder
/// into an action name and its argument text.
///
/// Returns `None` when no prefix matches or nothing follows the prefix.
pub fn parse_prefixed<'a>(content: &'a str, prefixes: &[&str]) -> Option<(&'a str, &'a str)> {
    let body = prefixes
        .iter()
        .filter(|prefix| !prefix.is_empty())
        .find_map(|prefix| content.strip_prefix(prefix))?;
    let (name, rest) = split_head(body);
    if name.is_empty() {
        None
    } else {
        Some((name, rest))
    }
}
