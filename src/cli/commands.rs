use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::app::ApplicationBuilder;
use crate::config::{self, AppConfig};
use crate::logging::{init_logging, LogConfig};
use crate::runtime_config::RuntimeConfig;

/// Command-line interface for tagroute applications
#[derive(Parser, Debug)]
#[command(name = "tagroute")]
#[command(about = "REST dispatcher driven by doc-comment tags", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Where to read the configuration from.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Configuration environment
    #[arg(short, long = "env")]
    pub environment: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the configured routes over HTTP
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        /// Listen address
        #[arg(short, long)]
        bind: Option<String>,

        /// Number of HTTP worker threads
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Print the compiled route table
    Routes {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Validate routes, services and their metadata
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Parse the process arguments and run.
///
/// # Errors
///
/// Configuration, bootstrap or server failures.
pub fn run(builder: ApplicationBuilder) -> Result<()> {
    run_cli(Cli::parse(), builder)
}

/// Run an already parsed command line.
///
/// # Errors
///
/// See [`run`].
pub fn run_cli(cli: Cli, builder: ApplicationBuilder) -> Result<()> {
    let runtime = RuntimeConfig::from_env();
    match cli.command {
        Commands::Serve {
            config,
            bind,
            workers,
        } => {
            let app_config = load_config(&config, &runtime)?;
            let _guard = init_logging(&LogConfig::from_settings(&app_config.settings.logging))?;
            let app = builder.build(app_config)?;
            let bind = bind.unwrap_or(runtime.bind);
            let workers = workers.unwrap_or(runtime.workers);
            info!(bind = %bind, workers, "Starting server");
            app.serve(&bind, workers)
        }
        Commands::Routes { config } => {
            let app_config = load_config(&config, &runtime)?;
            let table = app_config.route_table()?;
            table.dump_routes();
            Ok(())
        }
        Commands::Check { config } => {
            let app_config = load_config(&config, &runtime)?;
            let routes = app_config.services.len();
            let app = builder.build(app_config)?;
            let built = app.preload().context("Metadata check failed")?;
            println!("{routes} routes, {built} service methods: ok");
            Ok(())
        }
    }
}

fn load_config(args: &ConfigArgs, runtime: &RuntimeConfig) -> Result<AppConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| runtime.config_path.clone())
        .ok_or_else(|| anyhow!("No configuration file given (use --config or TAGROUTE_CONFIG)"))?;
    let environment = args
        .environment
        .as_deref()
        .unwrap_or(runtime.environment.as_str());
    config::load(&path, Some(environment))
        .with_context(|| format!("Failed to load configuration {}", path.display()))
}
