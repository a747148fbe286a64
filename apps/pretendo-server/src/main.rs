//! CLI entrypoint: loads configuration, wires up the shared state, and runs
//! (or just validates) the server, mirroring the teacher's
//! `clap`-derive-plus-`tokio::main` shape.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pretendo_auth::AuthService;
use pretendo_config::{AdapterKind, CliOverrides, PretendoConfig};
use pretendo_db::Database;
use pretendo_logs::LogStore;
use pretendo_persistence::{Adapter, FileJsonAdapter, MemoryAdapter};
use pretendo_server::script::RhaiSandbox;
use pretendo_server::server;
use pretendo_server::state::AppState;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "pretendo", about = "Declarative mock REST API server")]
struct Cli {
    /// Path to the YAML configuration document.
    #[arg(short, long, default_value = "pretendo.yaml")]
    config: PathBuf,
    #[arg(short, long)]
    port: Option<u16>,
    #[arg(long)]
    host: Option<String>,
    /// Prints the fully-resolved configuration and exits.
    #[arg(long)]
    print_config: bool,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Starts the server (the default when no subcommand is given).
    Run,
    /// Loads and validates configuration without binding a port.
    Check,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = PretendoConfig::load_layered(&cli.config)?;
    config.apply_cli_overrides(&CliOverrides {
        port: cli.port,
        host: cli.host.clone(),
    });

    init_logging(cli.verbose);

    if cli.print_config {
        println!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Check => {
            tracing::info!(resources = config.resources.len(), "configuration is valid");
            Ok(())
        }
        Commands::Run => run_server(config).await,
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_server(config: PretendoConfig) -> Result<()> {
    let config = Arc::new(config);

    let db_opts = config.options.database.clone();
    let adapter: Arc<dyn Adapter> = match db_opts.as_ref().map(|d| d.adapter).unwrap_or_default() {
        AdapterKind::Memory => Arc::new(MemoryAdapter::new()),
        AdapterKind::File => {
            let path = db_opts
                .as_ref()
                .and_then(|d| d.db_path.clone())
                .or_else(|| config.options.db_path.clone())
                .unwrap_or_else(|| "pretendo-db.json".to_string());
            Arc::new(FileJsonAdapter::new(path))
        }
    };

    let db = Arc::new(Database::init(config.clone(), adapter).await?);

    let auth_ttl = config.options.auth.as_ref().map(|a| a.token_ttl_seconds).unwrap_or(3600);
    let auth = Arc::new(AuthService::new(Duration::from_secs(auth_ttl)));
    let logs = Arc::new(LogStore::new(config.options.log_max_entries));
    let sandbox = Arc::new(RhaiSandbox::default());
    let cancel = CancellationToken::new();

    if let Some(opts) = &db_opts {
        if opts.auto_save && matches!(opts.adapter, AdapterKind::File) {
            db.spawn_autosave(Duration::from_millis(opts.save_interval), cancel.clone());
        }
    }

    let state = AppState::new(db, auth, logs, config, sandbox, cancel.clone());

    let handle = server::start(state).await?;
    tracing::info!(url = %handle.url(), "pretendo listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    handle.stop().await?;
    Ok(())
}
