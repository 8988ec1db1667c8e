//! Action nodes.
//!
//! An action node declares one invocable action: its identity, the gates
//! guarding it, its children, and the handler that runs it. Nodes are
//! built once at startup with [`ActionNodeBuilder`] and never change
//! afterwards.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilitySet};
use crate::category::Category;
use crate::cooldown::CooldownScope;
use crate::handler::Handler;

/// The platform surface an action is exposed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Typed command, triggered by text or as a structured command.
    #[default]
    Text,
    /// Context menu action on a message.
    MessageContext,
    /// Context menu action on a user.
    ActorContext,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Text => write!(f, "text"),
            ActionKind::MessageContext => write!(f, "message_context"),
            ActionKind::ActorContext => write!(f, "actor_context"),
        }
    }
}

/// Ordinal access level. Higher levels grant more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AccessLevel(pub u8);

impl AccessLevel {
    pub const EVERYONE: AccessLevel = AccessLevel(0);

    pub fn is_everyone(self) -> bool {
        self == Self::EVERYONE
    }
}

/// Declarative description of one invocable action.
#[derive(Clone)]
pub struct ActionNode {
    name: String,
    kind: ActionKind,
    help: String,
    arguments: Option<String>,
    aliases: Vec<String>,
    children: Vec<Arc<ActionNode>>,
    origin_restricted: bool,
    actor_capabilities: CapabilitySet,
    agent_capabilities: CapabilitySet,
    owner_only: bool,
    cooldown: u64,
    cooldown_scope: CooldownScope,
    category: Option<Category>,
    access_level: AccessLevel,
    module: Option<String>,
    adult_surface_only: bool,
    handler: Arc<dyn Handler>,
    help_responder: Option<Arc<dyn Handler>>,
}

impl ActionNode {
    pub fn builder(name: impl Into<String>, handler: impl Handler + 'static) -> ActionNodeBuilder {
        ActionNodeBuilder::new(name, handler)
    }

    /// Case-insensitive match against the name or any alias.
    pub fn matches(&self, token: &str) -> bool {
        self.identifiers().any(|id| same_name(id, token))
    }

    /// Case-insensitive match against the name only.
    pub fn matches_name(&self, token: &str) -> bool {
        same_name(&self.name, token)
    }

    /// Name followed by aliases.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// First child matching `token` by name or alias.
    pub fn child(&self, token: &str) -> Option<&Arc<ActionNode>> {
        self.children.iter().find(|child| child.matches(token))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn arguments(&self) -> Option<&str> {
        self.arguments.as_deref()
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn children(&self) -> &[Arc<ActionNode>] {
        &self.children
    }

    /// A node with children routes to them before running itself.
    pub fn is_router(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn origin_restricted(&self) -> bool {
        self.origin_restricted
    }

    pub fn actor_capabilities(&self) -> &CapabilitySet {
        &self.actor_capabilities
    }

    pub fn agent_capabilities(&self) -> &CapabilitySet {
        &self.agent_capabilities
    }

    pub fn owner_only(&self) -> bool {
        self.owner_only
    }

    /// Cooldown length in seconds. Zero disables the cooldown gate.
    pub fn cooldown(&self) -> u64 {
        self.cooldown
    }

    pub fn cooldown_scope(&self) -> CooldownScope {
        self.cooldown_scope
    }

    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn adult_surface_only(&self) -> bool {
        self.adult_surface_only
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn help_responder(&self) -> Option<&Arc<dyn Handler>> {
        self.help_responder.as_ref()
    }

    /// Copy inheritable attributes from `parent` where this node left them
    /// at their defaults, then do the same for this node's children.
    fn inherit_from(&mut self, parent: &ActionNode) {
        if self.actor_capabilities.is_empty() {
            self.actor_capabilities = parent.actor_capabilities.clone();
        }
        if self.agent_capabilities.is_empty() {
            self.agent_capabilities = parent.agent_capabilities.clone();
        }
        if self.access_level.is_everyone() {
            self.access_level = parent.access_level;
        }
        if self.module.is_none() {
            self.module = parent.module.clone();
        }
        self.backfill_children();
    }

    fn backfill_children(&mut self) {
        let parent = self.clone();
        for child in &mut self.children {
            Arc::make_mut(child).inherit_from(&parent);
        }
    }
}

impl fmt::Debug for ActionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("aliases", &self.aliases)
            .field("children", &self.children)
            .field("owner_only", &self.owner_only)
            .field("cooldown", &self.cooldown)
            .field("cooldown_scope", &self.cooldown_scope)
            .field("category", &self.category)
            .field("access_level", &self.access_level)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ActionNode`].
pub struct ActionNodeBuilder {
    node: ActionNode,
}

impl ActionNodeBuilder {
    pub fn new(name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self {
            node: ActionNode {
                name: name.into(),
                kind: ActionKind::Text,
                help: String::new(),
                arguments: None,
                aliases: Vec::new(),
                children: Vec::new(),
                origin_restricted: false,
                actor_capabilities: CapabilitySet::new(),
                agent_capabilities: CapabilitySet::new(),
                owner_only: false,
                cooldown: 0,
                cooldown_scope: CooldownScope::User,
                category: None,
                access_level: AccessLevel::EVERYONE,
                module: None,
                adult_surface_only: false,
                handler: Arc::new(handler),
                help_responder: None,
            },
        }
    }

    pub fn kind(mut self, kind: ActionKind) -> Self {
        self.node.kind = kind;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.node.help = help.into();
        self
    }

    pub fn arguments(mut self, arguments: impl Into<String>) -> Self {
        self.node.arguments = Some(arguments.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.node.aliases.push(alias.into());
        self
    }

    pub fn child(mut self, child: ActionNode) -> Self {
        self.node.children.push(Arc::new(child));
        self
    }

    /// Only runnable inside a shared workspace.
    pub fn workspace_only(mut self) -> Self {
        self.node.origin_restricted = true;
        self
    }

    pub fn actor_capability(mut self, capability: Capability) -> Self {
        self.node.actor_capabilities.insert(capability);
        self
    }

    pub fn agent_capability(mut self, capability: Capability) -> Self {
        self.node.agent_capabilities.insert(capability);
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.node.owner_only = true;
        self
    }

    pub fn cooldown(mut self, seconds: u64, scope: CooldownScope) -> Self {
        self.node.cooldown = seconds;
        self.node.cooldown_scope = scope;
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.node.category = Some(category);
        self
    }

    pub fn access_level(mut self, level: AccessLevel) -> Self {
        self.node.access_level = level;
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.node.module = Some(module.into());
        self
    }

    pub fn adult_surface_only(mut self) -> Self {
        self.node.adult_surface_only = true;
        self
    }

    pub fn help_responder(mut self, responder: impl Handler + 'static) -> Self {
        self.node.help_responder = Some(Arc::new(responder));
        self
    }

    /// Finish the node, back-filling inheritable attributes into children.
    pub fn build(mut self) -> ActionNode {
        self.node.backfill_children();
        self.node
    }
}

/// Case fold used for every name and alias comparison and index key.
pub fn fold_name(name: &str) -> String {
    name.chars().flat_map(char::to_lowercase).collect()
}

/// Whether two identifiers are equal under [`fold_name`].
pub fn same_name(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::noop;

    #[test]
    fn test_name_folding_covers_non_ascii() {
        assert_eq!(fold_name("Éclair"), "éclair");
        assert!(same_name("ÉCLAIR", "éclair"));
        assert!(!same_name("eclair", "éclair"));

        let node = ActionNode::builder("Straße", noop()).alias("Ärger").build();
        assert!(node.matches("straße"));
        assert!(node.matches("ärger"));
        assert!(node.matches_name("STRAßE"));
    }

    fn leaf(name: &str) -> ActionNode {
        ActionNode::builder(name, noop()).build()
    }

    #[test]
    fn test_matches_is_case_insensitive_over_name_and_aliases() {
        let node = ActionNode::builder("ban", noop())
            .alias("hammer")
            .alias("b")
            .build();
        assert!(node.matches("ban"));
        assert!(node.matches("BAN"));
        assert!(node.matches("Hammer"));
        assert!(node.matches("b"));
        assert!(!node.matches("kick"));
        assert!(node.matches_name("Ban"));
        assert!(!node.matches_name("hammer"));
    }

    #[test]
    fn test_identifiers_lists_name_then_aliases() {
        let node = ActionNode::builder("ban", noop()).alias("hammer").build();
        let ids: Vec<&str> = node.identifiers().collect();
        assert_eq!(ids, vec!["ban", "hammer"]);
    }

    #[test]
    fn test_defaults() {
        let node = leaf("ping");
        assert_eq!(node.kind(), ActionKind::Text);
        assert!(!node.is_router());
        assert!(!node.owner_only());
        assert!(!node.origin_restricted());
        assert_eq!(node.cooldown(), 0);
        assert_eq!(node.cooldown_scope(), CooldownScope::User);
        assert!(node.access_level().is_everyone());
        assert!(node.module().is_none());
        assert!(node.category().is_none());
        assert!(node.help_responder().is_none());
    }

    #[test]
    fn test_child_lookup() {
        let parent = ActionNode::builder("mod", noop())
            .child(leaf("a"))
            .child(ActionNode::builder("b", noop()).alias("bee").build())
            .build();
        assert!(parent.is_router());
        assert_eq!(parent.child("A").map(|c| c.name()), Some("a"));
        assert_eq!(parent.child("BEE").map(|c| c.name()), Some("b"));
        assert!(parent.child("c").is_none());
    }

    #[test]
    fn test_children_inherit_defaulted_attributes() {
        let parent = ActionNode::builder("mod", noop())
            .actor_capability(Capability::BanMembers)
            .agent_capability(Capability::BanMembers)
            .access_level(AccessLevel(3))
            .module("moderation")
            .child(leaf("ban"))
            .child(
                ActionNode::builder("purge", noop())
                    .actor_capability(Capability::ManageMessages)
                    .access_level(AccessLevel(1))
                    .module("cleanup")
                    .build(),
            )
            .build();

        let ban = parent.child("ban").unwrap();
        assert!(ban.actor_capabilities().contains(&Capability::BanMembers));
        assert!(ban.agent_capabilities().contains(&Capability::BanMembers));
        assert_eq!(ban.access_level(), AccessLevel(3));
        assert_eq!(ban.module(), Some("moderation"));

        let purge = parent.child("purge").unwrap();
        assert!(purge.actor_capabilities().contains(&Capability::ManageMessages));
        assert!(!purge.actor_capabilities().contains(&Capability::BanMembers));
        assert!(purge.agent_capabilities().contains(&Capability::BanMembers));
        assert_eq!(purge.access_level(), AccessLevel(1));
        assert_eq!(purge.module(), Some("cleanup"));
    }

    #[test]
    fn test_inheritance_reaches_grandchildren() {
        let parent = ActionNode::builder("config", noop())
            .module("settings")
            .child(
                ActionNode::builder("role", noop())
                    .child(leaf("add"))
                    .build(),
            )
            .build();
        let add = parent.child("role").and_then(|r| r.child("add")).unwrap();
        assert_eq!(add.module(), Some("settings"));
    }

    #[test]
    fn test_owner_only_and_cooldown_are_not_inherited() {
        let parent = ActionNode::builder("admin", noop())
            .owner_only()
            .cooldown(30, CooldownScope::Global)
            .child(leaf("eval"))
            .build();
        let eval = parent.child("eval").unwrap();
        assert!(!eval.owner_only());
        assert_eq!(eval.cooldown(), 0);
    }

    #[test]
    fn test_access_level_ordering() {
        assert!(AccessLevel(2) > AccessLevel(1));
        assert_eq!(AccessLevel::default(), AccessLevel::EVERYONE);
    }
}
