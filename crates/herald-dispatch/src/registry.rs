//! Action registry.
//!
//! Owns the top-level action nodes, the cooldown store, per-action usage
//! counters, the active observer, and the client settings read by the
//! gates. All methods take `&self`; the registry is shared behind an `Arc`
//! by every in-flight dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use herald_core::config::HeraldConfig;
use herald_core::types::{ActorId, WorkspaceId};
use tracing::{debug, info};

use crate::cooldown::CooldownStore;
use crate::error::RegistryError;
use crate::node::{fold_name, same_name, ActionNode};
use crate::observer::Observer;

/// Default number of top-level actions above which lookups use an index.
pub const DEFAULT_INDEX_THRESHOLD: usize = 20;

/// Process-lifetime client settings.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub owner: ActorId,
    pub co_owners: Vec<ActorId>,
    pub help_word: String,
    pub forced_workspace: Option<WorkspaceId>,
    pub dev_workspaces: Vec<WorkspaceId>,
    pub manual_publish: bool,
    pub index_threshold: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            owner: ActorId(0),
            co_owners: Vec::new(),
            help_word: "help".to_string(),
            forced_workspace: None,
            dev_workspaces: Vec::new(),
            manual_publish: false,
            index_threshold: DEFAULT_INDEX_THRESHOLD,
        }
    }
}

impl ClientSettings {
    pub fn from_config(config: &HeraldConfig) -> Self {
        let client = &config.client;
        Self {
            owner: ActorId(client.owner_id),
            co_owners: client.co_owner_ids.iter().copied().map(ActorId).collect(),
            help_word: client.help_word.clone(),
            forced_workspace: client.forced_workspace_id.map(WorkspaceId),
            dev_workspaces: client
                .dev_workspace_ids
                .iter()
                .copied()
                .map(WorkspaceId)
                .collect(),
            manual_publish: client.manual_publish,
            index_threshold: config.registry.index_threshold,
        }
    }

    /// Whether `actor` is the owner or a co-owner.
    pub fn is_owner(&self, actor: ActorId) -> bool {
        actor == self.owner || self.co_owners.contains(&actor)
    }
}

/// Top-level nodes with an optional name index.
struct NodeIndex {
    list: Vec<Arc<ActionNode>>,
    /// Folded identifier -> (position, is_alias). Only built above the
    /// threshold.
    by_name: Option<HashMap<String, (usize, bool)>>,
    threshold: usize,
}

impl NodeIndex {
    fn new(threshold: usize) -> Self {
        Self {
            list: Vec::new(),
            by_name: None,
            threshold,
        }
    }

    fn position(&self, token: &str, include_aliases: bool) -> Option<usize> {
        match &self.by_name {
            Some(map) => map
                .get(&fold_name(token))
                .filter(|(_, is_alias)| include_aliases || !is_alias)
                .map(|(pos, _)| *pos),
            None => self.list.iter().position(|node| {
                if include_aliases {
                    node.matches(token)
                } else {
                    node.matches_name(token)
                }
            }),
        }
    }

    fn reindex(&mut self) {
        if self.list.len() <= self.threshold {
            self.by_name = None;
            return;
        }
        let mut map = HashMap::new();
        for (pos, node) in self.list.iter().enumerate() {
            map.insert(fold_name(node.name()), (pos, false));
            for alias in node.aliases() {
                map.insert(fold_name(alias), (pos, true));
            }
        }
        self.by_name = Some(map);
    }
}

/// Owner of registered actions and their shared runtime state.
pub struct Registry {
    nodes: RwLock<NodeIndex>,
    usage: RwLock<HashMap<String, AtomicU64>>,
    cooldowns: CooldownStore,
    observer: RwLock<Option<Arc<dyn Observer>>>,
    settings: ClientSettings,
}

impl Registry {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            nodes: RwLock::new(NodeIndex::new(settings.index_threshold)),
            usage: RwLock::new(HashMap::new()),
            cooldowns: CooldownStore::new(),
            observer: RwLock::new(None),
            settings,
        }
    }

    // ---- registration ----

    /// Register a top-level action at the end of the list.
    pub fn register(&self, node: ActionNode) -> Result<Arc<ActionNode>, RegistryError> {
        self.register_at(node, None)
    }

    /// Register a top-level action, optionally at a given position.
    ///
    /// Fails if the node's name or any alias collides with a sibling, or if
    /// the node's own subtree contains colliding siblings.
    pub fn register_at(
        &self,
        node: ActionNode,
        index: Option<usize>,
    ) -> Result<Arc<ActionNode>, RegistryError> {
        validate_subtree(&node)?;

        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let len = nodes.list.len();
        let index = index.unwrap_or(len);
        if index > len {
            return Err(RegistryError::IndexOutOfRange { index, len });
        }
        for existing in &nodes.list {
            check_collision(&node, existing)?;
        }

        let node = Arc::new(node);
        nodes.list.insert(index, Arc::clone(&node));
        nodes.reindex();
        drop(nodes);

        self.usage
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(fold_name(node.name()))
            .or_insert_with(|| AtomicU64::new(0));

        info!(action = node.name(), index, kind = %node.kind(), "Action registered");
        Ok(node)
    }

    /// Remove a top-level action by name.
    pub fn unregister(&self, name: &str) -> Result<Arc<ActionNode>, RegistryError> {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let pos = nodes
            .position(name, false)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let removed = nodes.list.remove(pos);
        nodes.reindex();
        drop(nodes);

        self.usage
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&fold_name(removed.name()));

        info!(action = removed.name(), "Action unregistered");
        Ok(removed)
    }

    // ---- lookup ----

    /// Find a top-level action by name, and by alias when `include_aliases`.
    pub fn find(&self, token: &str, include_aliases: bool) -> Option<Arc<ActionNode>> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes
            .position(token, include_aliases)
            .map(|pos| Arc::clone(&nodes.list[pos]))
    }

    /// Resolve a path of names from a top-level action down through its
    /// children. Returns the top-level node and the addressed node.
    pub fn resolve_path(
        &self,
        path: &[String],
        include_aliases: bool,
    ) -> Option<(Arc<ActionNode>, Arc<ActionNode>)> {
        let (first, rest) = path.split_first()?;
        let root = self.find(first, include_aliases)?;
        let mut node = Arc::clone(&root);
        for segment in rest {
            let next = if include_aliases {
                node.child(segment).cloned()
            } else {
                node.children()
                    .iter()
                    .find(|child| child.matches_name(segment))
                    .cloned()
            };
            node = next?;
        }
        debug!(path = ?path, resolved = node.name(), "Resolved action path");
        Some((root, node))
    }

    /// Snapshot of the top-level actions in registration order.
    pub fn nodes(&self) -> Vec<Arc<ActionNode>> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .list
            .clone()
    }

    pub fn len(&self) -> usize {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .list
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether lookups currently go through the name index.
    pub fn is_indexed(&self) -> bool {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_name
            .is_some()
    }

    // ---- observer ----

    pub fn set_observer(&self, observer: Arc<dyn Observer>) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    pub fn clear_observer(&self) -> Option<Arc<dyn Observer>> {
        self.observer
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn observer(&self) -> Option<Arc<dyn Observer>> {
        self.observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ---- cooldowns ----

    pub fn apply_cooldown(&self, key: &str, seconds: u64) {
        self.cooldowns.apply(key, seconds);
    }

    pub fn remaining_cooldown(&self, key: &str) -> u64 {
        self.cooldowns.remaining(key)
    }

    pub fn sweep_expired_cooldowns(&self) -> usize {
        self.cooldowns.sweep()
    }

    pub fn cooldowns(&self) -> &CooldownStore {
        &self.cooldowns
    }

    // ---- usage ----

    /// Completed dispatches attributed to top-level action `name`.
    pub fn usage_count(&self, name: &str) -> u64 {
        self.usage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&fold_name(name))
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub(crate) fn record_usage(&self, name: &str) {
        if let Some(count) = self
            .usage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&fold_name(name))
        {
            count.fetch_add(1, Ordering::Relaxed);
        }
    }

    // ---- settings ----

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn owner_id(&self) -> ActorId {
        self.settings.owner
    }

    pub fn co_owner_ids(&self) -> &[ActorId] {
        &self.settings.co_owners
    }

    pub fn forced_workspace(&self) -> Option<WorkspaceId> {
        self.settings.forced_workspace
    }

    pub fn dev_workspaces(&self) -> &[WorkspaceId] {
        &self.settings.dev_workspaces
    }

    pub fn manual_publish(&self) -> bool {
        self.settings.manual_publish
    }

    pub fn help_word(&self) -> &str {
        &self.settings.help_word
    }
}

fn check_collision(node: &ActionNode, existing: &ActionNode) -> Result<(), RegistryError> {
    for id in node.identifiers() {
        if let Some(taken) = existing.identifiers().find(|other| same_name(other, id)) {
            return Err(RegistryError::DuplicateName {
                name: id.to_string(),
                existing: taken.to_string(),
            });
        }
    }
    Ok(())
}

/// Reject subtrees whose siblings share a name or alias.
fn validate_subtree(node: &ActionNode) -> Result<(), RegistryError> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for child in node.children() {
        for id in child.identifiers() {
            if let Some(existing) = seen.insert(fold_name(id), id) {
                return Err(RegistryError::DuplicateName {
                    name: id.to_string(),
                    existing: existing.to_string(),
                });
            }
        }
        validate_subtree(child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::noop;
    use crate::observer::TracingObserver;

    fn leaf(name: &str) -> ActionNode {
        ActionNode::builder(name, noop()).build()
    }

    fn registry() -> Registry {
        Registry::new(ClientSettings::default())
    }

    #[test]
    fn test_register_appends_in_order() {
        let reg = registry();
        reg.register(leaf("ping")).unwrap();
        reg.register(leaf("pong")).unwrap();
        let names: Vec<String> = reg.nodes().iter().map(|n| n.name().to_string()).collect();
        assert_eq!(names, vec!["ping", "pong"]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_register_at_index() {
        let reg = registry();
        reg.register(leaf("a")).unwrap();
        reg.register(leaf("c")).unwrap();
        reg.register_at(leaf("b"), Some(1)).unwrap();
        reg.register_at(leaf("z"), Some(0)).unwrap();
        let names: Vec<String> = reg.nodes().iter().map(|n| n.name().to_string()).collect();
        assert_eq!(names, vec!["z", "a", "b", "c"]);
    }

    #[test]
    fn test_register_index_out_of_range() {
        let reg = registry();
        reg.register(leaf("a")).unwrap();
        let err = reg.register_at(leaf("b"), Some(2)).unwrap_err();
        assert_eq!(err, RegistryError::IndexOutOfRange { index: 2, len: 1 });
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_duplicate_name_is_case_insensitive() {
        let reg = registry();
        reg.register(leaf("ban")).unwrap();
        let err = reg.register(leaf("Ban")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_non_ascii_duplicates_are_rejected() {
        for threshold in [64, 0] {
            let reg = Registry::new(ClientSettings {
                index_threshold: threshold,
                ..ClientSettings::default()
            });
            reg.register(leaf("Éclair")).unwrap();
            let err = reg.register(leaf("éclair")).unwrap_err();
            assert_eq!(
                err,
                RegistryError::DuplicateName {
                    name: "éclair".to_string(),
                    existing: "Éclair".to_string(),
                }
            );
            assert_eq!(reg.len(), 1);
            assert_eq!(reg.find("ÉCLAIR", false).unwrap().name(), "Éclair");
        }

        let node = ActionNode::builder("menu", noop())
            .child(leaf("Crème"))
            .child(leaf("CRÈME"))
            .build();
        assert!(matches!(
            registry().register(node),
            Err(RegistryError::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_alias_collisions_are_rejected() {
        let reg = registry();
        reg.register(ActionNode::builder("ban", noop()).alias("hammer").build())
            .unwrap();

        let err = reg.register(leaf("HAMMER")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateName {
                name: "HAMMER".to_string(),
                existing: "hammer".to_string(),
            }
        );

        let err = reg
            .register(ActionNode::builder("kick", noop()).alias("Ban").build())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));
    }

    #[test]
    fn test_duplicate_children_are_rejected() {
        let reg = registry();
        let node = ActionNode::builder("mod", noop())
            .child(leaf("ban"))
            .child(ActionNode::builder("kick", noop()).alias("BAN").build())
            .build();
        assert!(matches!(
            reg.register(node),
            Err(RegistryError::DuplicateName { .. })
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_unregister_removes_and_reindexes() {
        let reg = registry();
        reg.register(leaf("a")).unwrap();
        reg.register(leaf("b")).unwrap();
        let removed = reg.unregister("A").unwrap();
        assert_eq!(removed.name(), "a");
        assert!(reg.find("a", true).is_none());
        assert_eq!(reg.find("b", false).map(|n| n.name().to_string()), Some("b".into()));
        assert_eq!(
            reg.unregister("a").unwrap_err(),
            RegistryError::NotFound("a".to_string())
        );
        // The freed name can be registered again.
        reg.register(leaf("a")).unwrap();
    }

    #[test]
    fn test_find_respects_alias_flag() {
        let reg = registry();
        reg.register(ActionNode::builder("ban", noop()).alias("hammer").build())
            .unwrap();
        assert!(reg.find("HAMMER", true).is_some());
        assert!(reg.find("hammer", false).is_none());
        assert!(reg.find("BAN", false).is_some());
    }

    #[test]
    fn test_index_is_built_above_threshold() {
        let settings = ClientSettings {
            index_threshold: 3,
            ..ClientSettings::default()
        };
        let reg = Registry::new(settings);
        for name in ["a", "b", "c"] {
            reg.register(leaf(name)).unwrap();
        }
        assert!(!reg.is_indexed());

        reg.register(ActionNode::builder("d", noop()).alias("dee").build())
            .unwrap();
        assert!(reg.is_indexed());
        assert_eq!(reg.find("D", false).unwrap().name(), "d");
        assert_eq!(reg.find("DEE", true).unwrap().name(), "d");
        assert!(reg.find("dee", false).is_none());
        assert!(matches!(
            reg.register(leaf("Dee")),
            Err(RegistryError::DuplicateName { .. })
        ));

        reg.unregister("a").unwrap();
        assert!(!reg.is_indexed());
        assert_eq!(reg.find("c", false).unwrap().name(), "c");
    }

    #[test]
    fn test_index_positions_stay_correct_after_insert() {
        let settings = ClientSettings {
            index_threshold: 1,
            ..ClientSettings::default()
        };
        let reg = Registry::new(settings);
        reg.register(leaf("x")).unwrap();
        reg.register(leaf("y")).unwrap();
        reg.register_at(leaf("w"), Some(0)).unwrap();
        assert_eq!(reg.find("x", false).unwrap().name(), "x");
        assert_eq!(reg.find("y", false).unwrap().name(), "y");
        assert_eq!(reg.find("w", false).unwrap().name(), "w");
    }

    #[test]
    fn test_resolve_path_through_children() {
        let reg = registry();
        reg.register(
            ActionNode::builder("mod", noop())
                .child(ActionNode::builder("ban", noop()).alias("b").build())
                .build(),
        )
        .unwrap();

        let path = vec!["MOD".to_string(), "Ban".to_string()];
        let (root, node) = reg.resolve_path(&path, false).unwrap();
        assert_eq!(root.name(), "mod");
        assert_eq!(node.name(), "ban");

        let alias_path = vec!["mod".to_string(), "b".to_string()];
        assert!(reg.resolve_path(&alias_path, false).is_none());
        assert!(reg.resolve_path(&alias_path, true).is_some());
        assert!(reg.resolve_path(&[], true).is_none());
    }

    #[test]
    fn test_usage_counts() {
        let reg = registry();
        reg.register(leaf("ping")).unwrap();
        assert_eq!(reg.usage_count("ping"), 0);
        reg.record_usage("ping");
        reg.record_usage("PING");
        assert_eq!(reg.usage_count("Ping"), 2);
        assert_eq!(reg.usage_count("unknown"), 0);
        reg.record_usage("unknown");
        assert_eq!(reg.usage_count("unknown"), 0);
    }

    #[test]
    fn test_observer_set_get_clear() {
        let reg = registry();
        assert!(reg.observer().is_none());
        reg.set_observer(Arc::new(TracingObserver));
        assert!(reg.observer().is_some());
        assert!(reg.clear_observer().is_some());
        assert!(reg.observer().is_none());
    }

    #[test]
    fn test_cooldown_passthrough() {
        let reg = registry();
        reg.apply_cooldown("ping|U:1", 10);
        let remaining = reg.remaining_cooldown("ping|U:1");
        assert!(remaining > 0 && remaining <= 10);
        assert_eq!(reg.sweep_expired_cooldowns(), 0);
        assert_eq!(reg.cooldowns().len(), 1);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = HeraldConfig::default();
        config.client.owner_id = 5;
        config.client.co_owner_ids = vec![6];
        config.client.forced_workspace_id = Some(7);
        config.client.dev_workspace_ids = vec![8, 9];
        config.client.manual_publish = true;
        config.client.help_word = "aide".to_string();
        config.registry.index_threshold = 4;

        let reg = Registry::new(ClientSettings::from_config(&config));
        assert_eq!(reg.owner_id(), ActorId(5));
        assert_eq!(reg.co_owner_ids(), &[ActorId(6)]);
        assert_eq!(reg.forced_workspace(), Some(WorkspaceId(7)));
        assert_eq!(reg.dev_workspaces(), &[WorkspaceId(8), WorkspaceId(9)]);
        assert!(reg.manual_publish());
        assert_eq!(reg.help_word(), "aide");
        assert_eq!(reg.settings().index_threshold, 4);
        assert!(reg.settings().is_owner(ActorId(5)));
        assert!(reg.settings().is_owner(ActorId(6)));
        assert!(!reg.settings().is_owner(ActorId(7)));
    }
}
