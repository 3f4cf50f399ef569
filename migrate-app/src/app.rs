//! Command line front end

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::unbounded;
use tokio_util::sync::CancellationToken;

use migrate_core::migrate::{
    discover_engines, engine_version, MigrationRequest, Platform, PluginDescriptor, RunOptions,
};

use crate::config::MigratorConfig;
use crate::console;
use crate::logging;
use crate::runner::MigrationRunner;

/// RunUAT exited non-zero, was cancelled, or could not be launched
const EXIT_MIGRATION_FAILED: u8 = 1;
/// Nothing was launched: bad input, missing RunUAT, unusable destination
const EXIT_PRECONDITION: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "uplugin-migrate",
    version,
    about = "Package an Unreal Engine plugin with RunUAT BuildPlugin"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and package a plugin into <DESTINATION>/Migrated
    Migrate(MigrateArgs),
    /// List engine installations that ship RunUAT
    Engines {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// The plugin's .uplugin descriptor
    #[arg(short, long)]
    plugin: PathBuf,
    /// Folder that receives the Migrated subfolder
    #[arg(short, long)]
    destination: PathBuf,
    /// Engine root folder; defaults to the configured or newest discovered engine
    #[arg(short, long)]
    engine: Option<PathBuf>,
    /// Kill RunUAT after this many seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
}

pub fn launch() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("uplugin-migrate: {:#}", e);
            ExitCode::from(EXIT_PRECONDITION)
        }
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    let config = MigratorConfig::load()?;

    let _guard = match logging::init(&config.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: file logging disabled: {:#}", e);
            None
        }
    };

    match cli.command {
        Commands::Migrate(args) => migrate(args, &config),
        Commands::Engines { json } => list_engines(&config, json),
    }
}

/// `--engine`, then the configured engine, then the newest discovered one
fn resolve_engine_root(explicit: Option<PathBuf>, config: &MigratorConfig) -> Option<PathBuf> {
    explicit
        .or_else(|| config.engine_root.clone())
        .or_else(|| {
            discover_engines(&config.engine_search_paths, Platform::current())
                .into_iter()
                .find(|engine| engine.is_default)
                .map(|engine| engine.path)
        })
}

fn migrate(args: MigrateArgs, config: &MigratorConfig) -> Result<ExitCode> {
    let engine_root = resolve_engine_root(args.engine, config).unwrap_or_default();
    let request = match MigrationRequest::new(args.plugin, args.destination, engine_root) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("⚠ {}", e);
            return Ok(ExitCode::from(EXIT_PRECONDITION));
        }
    };

    {
        let mut stdout = io::stdout().lock();
        for line in describe_request(&request) {
            writeln!(stdout, "{}", line)?;
        }
    }

    let cancel = CancellationToken::new();
    let options = RunOptions {
        timeout: args
            .timeout
            .map(std::time::Duration::from_secs)
            .or_else(|| config.timeout()),
        cancel: Some(cancel.clone()),
    };

    // Render on a separate thread so slow terminals never stall the reader
    let (event_tx, event_rx) = unbounded();
    let renderer = thread::spawn(move || -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        for event in event_rx.iter() {
            console::render_event(&event, &mut stdout)?;
            stdout.flush()?;
        }
        Ok(())
    });

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let result = rt.block_on(async {
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling migration");
                interrupt.cancel();
            }
        });

        MigrationRunner::new(event_tx).migrate(&request, options).await
    });

    match renderer.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Console output failed: {}", e),
        Err(_) => return Err(anyhow!("Console renderer panicked")),
    }

    Ok(match result {
        Ok(outcome) if outcome.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_MIGRATION_FAILED),
        Err(_) => ExitCode::from(EXIT_PRECONDITION),
    })
}

/// The "selected" lines printed before a run
fn describe_request(request: &MigrationRequest) -> Vec<String> {
    let plugin = request.plugin_descriptor_path();
    let descriptor = match PluginDescriptor::read(plugin) {
        Ok(descriptor) => Some(descriptor),
        Err(e) => {
            tracing::warn!("{:#}", anyhow::Error::from(e));
            None
        }
    };
    let plugin_label = descriptor
        .as_ref()
        .map(|descriptor| descriptor.label(plugin))
        .unwrap_or_else(|| "descriptor unreadable".to_string());

    let engine_root = request.engine_root_path();
    let mut engine_label = engine_version(engine_root)
        .map(|version| format!("UE {}", version))
        .unwrap_or_else(|| "unknown version".to_string());
    if let Some(target) = descriptor.and_then(|descriptor| descriptor.engine_version) {
        engine_label.push_str(&format!(", plugin targets {}", target));
    }

    vec![
        format!("✓ Plugin selected: {} ({})", plugin.display(), plugin_label),
        format!(
            "✓ Destination selected: {}",
            request.destination_root_path().display()
        ),
        format!("✓ UE Root selected: {} ({})", engine_root.display(), engine_label),
    ]
}

fn list_engines(config: &MigratorConfig, json: bool) -> Result<ExitCode> {
    let engines = discover_engines(&config.engine_search_paths, Platform::current());
    let mut stdout = io::stdout().lock();

    if json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&engines)?)?;
    } else if engines.is_empty() {
        writeln!(stdout, "No engine installations found")?;
    } else {
        for engine in &engines {
            let marker = if engine.is_default { "*" } else { " " };
            writeln!(
                stdout,
                "{} {:<16} {}",
                marker,
                engine.display_name,
                engine.path.display()
            )?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
