//! Herald console host.
//!
//! Composition root: loads config, installs logging, registers the
//! built-in command tree, spawns the cooldown sweeper, and dispatches
//! prefixed lines read from stdin as text invocations.

mod cli;
mod commands;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use herald_core::config::HeraldConfig;
use herald_core::types::{ActorId, SurfaceId, WorkspaceId};
use herald_dispatch::{
    parse_prefixed, AllowAll, ClientSettings, CooldownSweeper, Dispatch, Dispatcher, Invocation,
    Registry, TracingObserver,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;

use cli::CliArgs;
use commands::ConsoleResponder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = HeraldConfig::load_or_default(&config_file);

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    tracing::info!("Starting Herald v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Registry and command tree.
    let registry = Arc::new(Registry::new(ClientSettings::from_config(&config)));
    registry.set_observer(Arc::new(TracingObserver));

    let shutdown = Arc::new(Notify::new());
    for node in commands::build(Arc::clone(&shutdown)) {
        registry.register(node)?;
    }
    tracing::info!(commands = registry.len(), "Command tree registered");

    let engine = Dispatcher::new(
        Arc::clone(&registry),
        Arc::new(AllowAll),
        Arc::new(ConsoleResponder),
    );

    // === Background tasks ===

    let sweeper = Arc::new(CooldownSweeper::new(
        Arc::clone(&registry),
        Duration::from_secs(config.cooldowns.sweep_interval_secs.max(1)),
    ));
    let sweeper_task = tokio::spawn({
        let sweeper = Arc::clone(&sweeper);
        async move { sweeper.run().await }
    });

    // === Console loop ===

    let actor = ActorId(args.actor.unwrap_or(config.client.owner_id));
    let surface = SurfaceId(args.surface);
    let workspace = args.workspace.map(WorkspaceId);

    let mut prefixes = vec![config.client.prefix.as_str()];
    if let Some(alt) = config.client.alt_prefix.as_deref() {
        prefixes.push(alt);
    }
    tracing::info!(actor = %actor, prefix = %config.client.prefix, "Reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.notified() => break,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(line) = line else { break };

        let Some((name, rest)) = parse_prefixed(line.trim(), &prefixes) else {
            continue;
        };
        let mut invocation = Invocation::text(actor, surface, name, rest);
        if let Some(workspace) = workspace {
            invocation = invocation.in_workspace(workspace);
        }

        match engine.dispatch(invocation) {
            Ok(Dispatch::Unknown) => println!("Unknown command: {}", name),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Dispatch failed"),
        }
    }

    tracing::info!("Shutting down");
    sweeper.shutdown();
    sweeper_task.await?;

    Ok(())
}
