//! Stuffing sample host
//!
//! A host binary containing two app families, "first" and "second". The
//! active family is persisted in a state directory; `switch` changes it and
//! restarts the process into the `route` flow, which brings up the active
//! family's entry point.
//!
//! # Usage
//! ```bash
//! stuffing-host route
//! stuffing-host switch second
//! stuffing-host status --json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stuffing_core::{
    AppDelegate, AppFamilyConfig, AppFamilyRegistry, AppShell, DynamicAppConfig,
    DynamicAppManager, EntryPoint, ExecRestarter, FileIdentityStore, LaunchRequest, LaunchRouter,
    MapEntryPointResolver,
};

/// Stuffing sample host - two applications behind one binary
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the persisted identity state
    #[arg(long, value_name = "DIR", default_value = ".stuffing")]
    state_dir: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active app family and its launch target
    Status {
        /// Output in JSON format for integrations
        #[arg(long)]
        json: bool,
    },

    /// Switch the active app family and restart into it
    Switch {
        /// Target app family name
        family: String,

        /// Persist the new identity without restarting the process
        #[arg(long)]
        no_restart: bool,
    },

    /// Boot-time routing into the active family's entry point
    Route {
        /// Inbound request payload entries, as KEY=VALUE pairs
        #[arg(long, value_name = "KEY=VALUE")]
        payload: Vec<String>,
    },

    /// Return to the default app family (persist only)
    Reset,

    /// Dispatch a named app event
    Event { name: String },
}

struct FirstApp;

impl AppDelegate for FirstApp {
    fn on_create(&mut self) -> stuffing_core::Result<()> {
        tracing::info!("first application created");
        Ok(())
    }

    fn on_low_memory(&mut self) {
        tracing::warn!("first application releasing caches");
    }
}

struct SecondApp;

impl AppDelegate for SecondApp {
    fn on_create(&mut self) -> stuffing_core::Result<()> {
        tracing::info!("second application created");
        Ok(())
    }
}

fn build_manager(state_dir: &Path) -> anyhow::Result<DynamicAppManager> {
    let store = Arc::new(
        FileIdentityStore::open(state_dir.join("identity.json"))
            .context("opening identity store")?,
    );

    let registry = AppFamilyRegistry::new([
        AppFamilyConfig::new("first")
            .with_launch_target("first.main")
            .with_switch_screen("switch_interstitial")
            .with_warm_up(|| tracing::info!("warming up first application"))
            .with_delegate(|| Box::new(FirstApp)),
        AppFamilyConfig::new("second")
            .with_launch_target("second.main")
            .with_switch_screen("switch_interstitial")
            .with_warm_up(|| tracing::info!("warming up second application"))
            .with_delegate(|| Box::new(SecondApp)),
    ])?;

    let config = DynamicAppConfig::new()
        .with_event("cold_start", || tracing::info!("cold start event received"));

    // Relaunch straight into the boot routing flow after a switch.
    let restarter = Arc::new(ExecRestarter::with_args([
        "--state-dir".to_string(),
        state_dir.display().to_string(),
        "route".to_string(),
    ]));

    let manager = DynamicAppManager::multi(registry, "first", config, store, restarter)?
        .with_switch_hook(|from: &str, to: &str| -> anyhow::Result<()> {
            tracing::info!(%from, %to, "about to switch app families");
            Ok(())
        });

    Ok(manager)
}

fn build_resolver() -> Arc<MapEntryPointResolver> {
    Arc::new(
        MapEntryPointResolver::new()
            .with_entry_point(EntryPoint::new("first.main", |request| {
                println!("[first] main screen up (request {})", request.id);
            }))
            .with_entry_point(EntryPoint::new("second.main", |request| {
                println!("[second] main screen up (request {})", request.id);
            })),
    )
}

fn parse_payload(entries: &[String]) -> anyhow::Result<Option<LaunchRequest>> {
    if entries.is_empty() {
        return Ok(None);
    }

    let mut request = LaunchRequest::new("launcher");
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("payload entry '{entry}' is not KEY=VALUE"))?;
        request = request.with_payload(key, serde_json::Value::String(value.to_string()));
    }
    Ok(Some(request))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false)
            .init();
    }

    let manager = Arc::new(build_manager(&cli.state_dir)?);
    manager.initialize().context("initializing app manager")?;

    match cli.command {
        Commands::Status { json } => {
            let family = manager.application_family();
            let launch_target = manager.default_launch_target().ok();
            let previous = manager.previous_family()?;

            if json {
                let status = serde_json::json!({
                    "application_family": family,
                    "default_family": manager.default_family(),
                    "default_launch_target": launch_target,
                    "previous_family": previous,
                    "pending_family_change": manager.has_pending_family_change_signal(),
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("application family : {family}");
                println!("default family     : {}", manager.default_family());
                println!(
                    "launch target      : {}",
                    launch_target.as_deref().unwrap_or("-")
                );
                println!(
                    "previous family    : {}",
                    previous.as_deref().unwrap_or("-")
                );
                println!(
                    "pending change     : {}",
                    manager.has_pending_family_change_signal()
                );
            }
        }

        Commands::Switch { family, no_restart } => {
            manager.switch_to_family(
                &family,
                !no_restart,
                Some(Box::new(move || {
                    println!("switched; restart the host to enter the new family");
                })),
            )?;
        }

        Commands::Route { payload } => {
            if manager.has_pending_family_change_signal() {
                tracing::info!("first session after an app family change");
                manager.consume_family_change_signal()?;
            }

            let shell = AppShell::new(manager.clone());
            shell.on_create().context("bringing up application")?;

            let inbound = parse_payload(&payload)?;
            let routed = LaunchRouter::new(manager, build_resolver())
                .route(inbound.as_ref())
                .context("routing launch")?;
            routed.entry_point.launch(&routed.request);
        }

        Commands::Reset => {
            manager.return_to_default_family()?;
            println!(
                "returned to default family '{}'; restart the host to enter it",
                manager.default_family()
            );
        }

        Commands::Event { name } => {
            manager.on_event(&name);
        }
    }

    Ok(())
}
