use anyhow::Result;
use clap::{Parser, Subcommand};
use svckit::runtime::{check, run, RunOptions, ShutdownOptions};
use svckit::{FactoryCatalog, ManifestLoader, ReloadOptions};
use svckit_bootstrap::{AppConfig, CliArgs};

use std::path::PathBuf;
use std::sync::Arc;

mod registered_services;

/// Svchost Server - hot-reloadable service container
#[derive(Parser)]
#[command(name = "svchost-server")]
#[command(about = "Svchost Server - hot-reloadable service container")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of service definition files (overrides config)
    #[arg(short, long)]
    services_dir: Option<PathBuf>,

    /// Do not watch the services directory for changes
    #[arg(long)]
    no_hot_reload: bool,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the container and serve until SIGINT/SIGTERM
    Run,
    /// Discover services, validate the dependency graph and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        services_dir: cli
            .services_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string()),
        no_hot_reload: cli.no_hot_reload,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // 1) defaults -> 2) YAML (if provided) -> 3) env (APP__*) -> 4) CLI overrides
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    svckit_bootstrap::logging::init_logging_unified(&logging_config, &config.home_dir());

    let catalog = Arc::new(FactoryCatalog::discover()?);
    tracing::info!(factories = ?catalog.names(), "Svchost Server starting");
    let loader = Arc::new(ManifestLoader::new(catalog));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, loader).await,
        Commands::Check => check_services(config, loader).await,
    }
}

async fn run_server(config: AppConfig, loader: Arc<ManifestLoader>) -> Result<()> {
    let opts = RunOptions {
        services_dir: config.services.dir_path(),
        loader,
        hot_reload: config.services.hot_reload,
        reload: ReloadOptions {
            debounce: config.services.debounce,
        },
        shutdown: ShutdownOptions::Signals,
    };

    if let Err(e) = run(opts).await {
        tracing::error!(error = ?e, "Svchost Server failed");
        return Err(e);
    }
    Ok(())
}

async fn check_services(config: AppConfig, loader: Arc<ManifestLoader>) -> Result<()> {
    let dir = config.services.dir_path();
    let store = check(&dir, loader.as_ref()).await?;

    println!("Services in {}: all dependencies resolvable", dir.display());
    for (name, refs) in svckit::resolution_order(&store) {
        let deps = store
            .find(&name)
            .map(|d| d.dependencies().join(", "))
            .unwrap_or_default();
        println!("  {name:<20} refs={refs:<3} deps=[{deps}]");
    }
    Ok(())
}
