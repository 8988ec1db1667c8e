//! Built-in command tree for the console host.

use std::sync::Arc;

use herald_dispatch::{
    handler_fn, noop, ActionNode, Capability, Category, CooldownScope, HandlerFault, Invocation,
    Responder,
};
use tokio::sync::Notify;

const MODERATION_OUTSIDE_SERVER: &str = "Moderation is only available inside a server.";

/// Responder that prints replies to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleResponder;

impl Responder for ConsoleResponder {
    fn send(&self, invocation: &Invocation, message: &str) {
        println!("[{}] {}", invocation.surface, message);
    }
}

/// Build every top-level command. `shutdown` is notified by the owner-only
/// `shutdown` command.
pub fn build(shutdown: Arc<Notify>) -> Vec<ActionNode> {
    vec![ping(), echo(), commands(), moderation(), stop(shutdown)]
}

fn ping() -> ActionNode {
    ActionNode::builder(
        "ping",
        handler_fn(|ctx| {
            ctx.reply("Pong!");
            Ok(())
        }),
    )
    .help("Check that the bot is responding.")
    .cooldown(3, CooldownScope::User)
    .build()
}

fn echo() -> ActionNode {
    ActionNode::builder(
        "echo",
        handler_fn(|ctx| {
            let text = ctx.args_text();
            if text.is_empty() {
                return Err("nothing to echo".into());
            }
            ctx.reply(text);
            Ok(())
        }),
    )
    .help("Repeat the given text.")
    .arguments("<text>")
    .alias("say")
    .build()
}

/// Lists top-level commands with their usage counts.
fn commands() -> ActionNode {
    ActionNode::builder(
        "commands",
        handler_fn(|ctx| {
            let registry = ctx.registry();
            let mut lines = Vec::new();
            for node in registry.nodes() {
                lines.push(format!(
                    "{} {} ({} uses) {}",
                    node.name(),
                    node.arguments().unwrap_or(""),
                    registry.usage_count(node.name()),
                    node.help()
                ));
            }
            ctx.reply(&lines.join("\n"));
            Ok(())
        }),
    )
    .help("List available commands.")
    .alias("list")
    .build()
}

fn moderation() -> ActionNode {
    let usage = |ctx: &herald_dispatch::CommandContext| -> Result<(), HandlerFault> {
        let children: Vec<&str> = ctx.node().children().iter().map(|c| c.name()).collect();
        ctx.reply(&format!("Usage: mod <{}> <member>", children.join("|")));
        Ok(())
    };

    // Children resolve before any gate runs and do not inherit the
    // workspace restriction or category, so each one carries its own.
    ActionNode::builder("mod", handler_fn(usage))
        .help("Moderation tools.")
        .workspace_only()
        .module("moderation")
        .category(moderation_category())
        .help_responder(handler_fn(usage))
        .child(
            ActionNode::builder("ban", handler_fn(|ctx| punish(ctx, "Banned")))
                .arguments("<member>")
                .workspace_only()
                .category(moderation_category())
                .actor_capability(Capability::BanMembers)
                .agent_capability(Capability::BanMembers)
                .cooldown(10, CooldownScope::UserGuild)
                .build(),
        )
        .child(
            ActionNode::builder("kick", handler_fn(|ctx| punish(ctx, "Kicked")))
                .arguments("<member>")
                .workspace_only()
                .category(moderation_category())
                .actor_capability(Capability::KickMembers)
                .agent_capability(Capability::KickMembers)
                .build(),
        )
        .child(
            ActionNode::builder("noop", noop())
                .help("Does nothing.")
                .workspace_only()
                .category(moderation_category())
                .build(),
        )
        .build()
}

fn moderation_category() -> Category {
    Category::new("moderation")
        .with_predicate(|inv| inv.workspace.is_some())
        .with_failure_message(MODERATION_OUTSIDE_SERVER)
}

fn punish(ctx: &herald_dispatch::CommandContext, verb: &str) -> Result<(), HandlerFault> {
    let target = herald_dispatch::split_head(ctx.args_text()).0;
    if target.is_empty() {
        return Err(format!("{} needs a member", ctx.node().name()).into());
    }
    ctx.reply(&format!("{} {}.", verb, target));
    Ok(())
}

fn stop(shutdown: Arc<Notify>) -> ActionNode {
    ActionNode::builder(
        "shutdown",
        handler_fn(move |ctx| {
            ctx.reply("Shutting down.");
            shutdown.notify_one();
            Ok(())
        }),
    )
    .help("Stop the bot.")
    .owner_only()
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::types::{ActorId, SurfaceId, WorkspaceId};
    use herald_dispatch::{AllowAll, ClientSettings, Dispatch, Dispatcher, Gate, Registry};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl Responder for Collect {
        fn send(&self, _invocation: &Invocation, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn setup() -> (Dispatcher, Arc<Collect>, Arc<Notify>) {
        let settings = ClientSettings {
            owner: ActorId(1),
            ..ClientSettings::default()
        };
        let registry = Arc::new(Registry::new(settings));
        let shutdown = Arc::new(Notify::new());
        for node in build(Arc::clone(&shutdown)) {
            registry.register(node).unwrap();
        }
        let collect = Arc::new(Collect::default());
        let engine = Dispatcher::new(registry, Arc::new(AllowAll), collect.clone());
        (engine, collect, shutdown)
    }

    #[test]
    fn test_tree_registers_without_collisions() {
        let (engine, _, _) = setup();
        assert_eq!(engine.registry().len(), 5);
    }

    #[test]
    fn test_mod_ban_in_workspace() {
        let (engine, collect, _) = setup();
        let inv = Invocation::text(ActorId(5), SurfaceId(1), "mod", "ban troll spamming")
            .in_workspace(WorkspaceId(9));
        assert_eq!(engine.dispatch(inv).unwrap(), Dispatch::Completed);
        assert_eq!(*collect.0.lock().unwrap(), vec!["Banned troll.".to_string()]);
        assert_eq!(engine.registry().usage_count("mod"), 1);
    }

    #[test]
    fn test_mod_refused_in_direct_conversation() {
        let (engine, collect, _) = setup();
        let inv = Invocation::text(ActorId(5), SurfaceId(1), "mod", "kick troll");
        let result = engine.dispatch(inv).unwrap();
        assert!(matches!(result, Dispatch::Terminated(ref r) if r.gate == Gate::Category));
        assert_eq!(
            *collect.0.lock().unwrap(),
            vec![MODERATION_OUTSIDE_SERVER.to_string()]
        );
    }

    #[test]
    fn test_every_mod_action_refused_in_direct_conversation() {
        let (engine, collect, _) = setup();
        for args in ["", "ban troll", "KICK troll", "noop"] {
            let inv = Invocation::text(ActorId(5), SurfaceId(1), "mod", args);
            let result = engine.dispatch(inv).unwrap();
            assert!(
                matches!(result, Dispatch::Terminated(ref r) if r.gate == Gate::Category),
                "mod {:?} was not refused: {:?}",
                args,
                result
            );
        }
        assert_eq!(collect.0.lock().unwrap().len(), 4);
        assert_eq!(engine.registry().usage_count("mod"), 0);
        assert!(engine.registry().cooldowns().is_empty());
    }

    #[test]
    fn test_shutdown_is_owner_only() {
        let (engine, _, _) = setup();
        let inv = Invocation::text(ActorId(5), SurfaceId(1), "shutdown", "");
        assert!(matches!(
            engine.dispatch(inv).unwrap(),
            Dispatch::Terminated(ref r) if r.gate == Gate::Owner
        ));
        let inv = Invocation::text(ActorId(1), SurfaceId(1), "shutdown", "");
        assert_eq!(engine.dispatch(inv).unwrap(), Dispatch::Completed);
    }

    #[test]
    fn test_echo_without_text_faults() {
        let (engine, _, _) = setup();
        let inv = Invocation::text(ActorId(5), SurfaceId(1), "say", "");
        let err = engine.dispatch(inv).unwrap_err();
        assert_eq!(err.to_string(), "Handler for 'echo' failed: nothing to echo");
    }
}
