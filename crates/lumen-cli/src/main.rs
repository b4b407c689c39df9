//! Lumen CLI - the `lumen` command.
//!
//! This is the main entry point for running `.rhai` scripts with live
//! reload.
//!
//! # Architecture
//!
//! The CLI binary orchestrates the following modular crates:
//!
//! - **lumen-core**: resource resolution, version history, reload/rollback
//! - **lumen-std**: embedded default assets for packaged builds

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use lumen_core::{
    AssetStore, RefreshManager, Resource, ResourceScope, RhaiEvaluator, Script, Settings,
};

/// Lumen - live-reloading script player
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A live-reloading script player", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a .rhai script
    Run {
        /// Logical path of the script to execute
        #[arg(value_name = "FILE")]
        file: String,

        /// Keep running and reload the script when it changes
        #[arg(short, long)]
        watch: bool,

        /// Project directory tried first during resolution
        #[arg(short, long, value_name = "DIR", default_value = "data/")]
        project_root: PathBuf,

        /// Quiet time required after a change before reloading
        #[arg(long, value_name = "DURATION", default_value = "25ms")]
        grace_period: String,

        /// Sleep between refresh polls in watch mode
        #[arg(long, value_name = "DURATION", default_value = "150ms")]
        poll_interval: String,

        /// Number of content versions retained per file
        #[arg(long, value_name = "N", default_value_t = 8)]
        history_depth: usize,

        /// Show an external diff when a reload fails and rolls back
        #[arg(long)]
        diff: bool,

        /// Diff command template; <oldFile> and <newFile> are substituted
        #[arg(long, value_name = "TEMPLATE")]
        diff_command: Option<String>,
    },

    /// List the resources under a directory
    List {
        /// Directory to enumerate
        #[arg(value_name = "DIR")]
        dir: String,

        /// Project directory tried first during resolution
        #[arg(short, long, value_name = "DIR", default_value = "data/")]
        project_root: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Run {
            file,
            watch,
            project_root,
            grace_period,
            poll_interval,
            history_depth,
            diff,
            diff_command,
        } => {
            let mut settings = Settings::default();
            settings.set_project_root(&project_root);
            settings.file_modify_grace_period = humantime::parse_duration(&grace_period)
                .context("Invalid --grace-period duration")?;
            settings.refresh_poll_interval = humantime::parse_duration(&poll_interval)
                .context("Invalid --poll-interval duration")?;
            settings.file_history_depth = history_depth;
            settings.diff_enabled = diff;
            if let Some(template) = diff_command {
                settings.diff_command = template;
            }

            run_script(file, watch, settings)
        }
        Commands::List { dir, project_root } => {
            let mut settings = Settings::default();
            settings.set_project_root(&project_root);
            list_resources(dir, settings)
        }
        Commands::Version => {
            let mut store = AssetStore::new();
            let embedded = lumen_std::register_embedded(&mut store);

            println!("lumen {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("A live-reloading script player");
            println!();
            println!("Modular architecture:");
            println!("  - lumen-core: resource resolution, versioning, live reload");
            println!("  - lumen-std:  embedded default assets ({} files)", embedded);
            Ok(())
        }
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
}

fn run_script(file: String, watch: bool, settings: Settings) -> Result<()> {
    init_logger();

    let mut assets = AssetStore::new();
    let embedded = lumen_std::register_embedded(&mut assets);
    log::debug!("Registered {} embedded asset(s)", embedded);

    // Host functions available to scripts
    let started = Instant::now();
    let mut engine = rhai::Engine::new();
    engine.register_fn("elapsed", move || started.elapsed().as_secs_f64());

    let evaluator = Arc::new(RhaiEvaluator::with_engine(engine));
    let mut script = Script::from_path(&file, evaluator, &settings, &assets);

    if !script.resource().exists() {
        anyhow::bail!("File not found: {}", file);
    }

    log::info!("Loading: {}", script.resource().resolved_path().display());

    match script.load() {
        Ok(_) => log::info!("Script running"),
        Err(e) if watch => {
            // edit-and-retry: stay up and wait for a corrected file
            log::error!("Initial load failed: {}", e);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to load {}", file));
        }
    }

    if !watch {
        return Ok(());
    }

    let mut manager = RefreshManager::new();
    manager.register(script);

    log::info!("Watch mode enabled - monitoring file for changes");
    log::info!("(Press Ctrl+C to exit)");

    ctrlc::set_handler(move || {
        log::info!("Interrupted by user (Ctrl+C)");
        log::info!("Exiting...");
        std::process::exit(0);
    })
    .expect("Error setting Ctrl-C handler");

    loop {
        std::thread::sleep(settings.refresh_poll_interval);

        let report = manager.poll();
        if report.rolled_back > 0 {
            log::warn!("Reload failed, previous version restored");
        }
        if report.reloaded > 0 {
            log::info!("Reload successful");
        }
    }
}

fn list_resources(dir: String, settings: Settings) -> Result<()> {
    init_logger();

    let assets = AssetStore::new();
    let resource = Resource::resolve(&dir, &settings, &assets);

    if !resource.is_dir() {
        anyhow::bail!("Not a directory: {}", dir);
    }

    let mut children = resource.list(&settings, &assets);
    if children.is_empty() {
        println!("(empty)");
        return Ok(());
    }

    for child in &mut children {
        let kind = if child.is_dir() { "dir " } else { "file" };
        let scope = match child.scope() {
            ResourceScope::Mutable => "",
            ResourceScope::Immutable => " (embedded)",
        };
        println!("{}  {:>9}  {}{}", kind, child.len(), child.name(), scope);
    }

    Ok(())
}
