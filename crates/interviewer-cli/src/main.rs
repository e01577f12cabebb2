//! Interviewer CLI
//!
//! Main entry point for the interview server.

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use interviewer_engine::{
    create_router, AppState, Config, DeadlineEvaluator, Evaluator, GeminiClient, InterviewService,
    LlmEvaluator, ReportSinks, StorageMode,
};
use interviewer_store::{JsonFileStore, SheetExporter};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Default port for the HTTP API server.
const DEFAULT_PORT: u16 = 8000;

/// Interviewer - AI interview server
///
/// Runs multi-question interviews against a job description, scores each
/// answer with a generative model, and produces a hiring report.
#[derive(Parser, Debug)]
#[command(name = "interviewer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: interviewer.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port for the HTTP API server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Where finished interviews are written: local, sheets, both, none
    #[arg(long, env = "STORAGE_MODE", value_name = "MODE")]
    storage_mode: Option<StorageMode>,

    /// Name of the sheet interviews are exported to
    #[arg(long, env = "INTERVIEW_SHEET_NAME", value_name = "NAME")]
    sheet_name: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Interviewer starting");
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }
    tracing::debug!(config = ?args.config, "Config file");

    match run_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs the interview server until Ctrl+C.
///
/// 1. Load config and apply CLI overrides
/// 2. Build the evaluator
/// 3. Open the configured sinks
/// 4. Probe the evaluator and start the idle sweeper
/// 5. Serve HTTP and WebSocket traffic
async fn run_server(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(mode) = args.storage_mode {
        config.storage_mode = mode;
    }
    if let Some(ref sheet_name) = args.sheet_name {
        config.sheet_name.clone_from(sheet_name);
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    let evaluator = build_evaluator(&config)?;
    let sinks = build_sinks(&config).await?;

    let service = Arc::new(InterviewService::new(evaluator, sinks));
    service.probe_evaluator().await;

    let sweeper = config
        .session_ttl()
        .map(|ttl| service.spawn_idle_sweeper(ttl, config.sweep_interval()));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}:{}': {e}", args.host, args.port))?;

    let router = create_router(AppState::new(config, Arc::clone(&service)));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!();
    println!("Interview server running on http://{addr}");
    println!("Press Ctrl+C to stop");
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {e}"))?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    tracing::info!(
        active_sessions = service.registry().len().await,
        "Interviewer stopped"
    );
    Ok(())
}

/// Loads configuration from the given path or the current directory.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load_from_dir(Path::new(".")).map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Builds the Gemini-backed evaluator with the configured per-call deadline.
fn build_evaluator(config: &Config) -> anyhow::Result<Arc<dyn Evaluator>> {
    let api_key = config.evaluator.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "{} is not set\n\nSuggestion: Export {} or add it to a .env file",
            config.evaluator.api_key_env,
            config.evaluator.api_key_env
        )
    })?;

    let client = GeminiClient::new(&config.evaluator, api_key).map_err(|e| anyhow::anyhow!("{e}"))?;
    tracing::info!(model = %client.model(), "Evaluator configured");

    Ok(Arc::new(DeadlineEvaluator::new(
        LlmEvaluator::new(client),
        config.evaluator.timeout(),
    )))
}

/// Opens the persistence store and exporter selected by `storageMode`.
async fn build_sinks(config: &Config) -> anyhow::Result<ReportSinks> {
    let mut sinks = ReportSinks::none();

    if config.storage_mode.uses_local() {
        let store = JsonFileStore::open(&config.storage_dir).await.map_err(|e| {
            anyhow::anyhow!(
                "Failed to open storage directory '{}': {e}",
                config.storage_dir
            )
        })?;
        tracing::info!(dir = %config.storage_dir, "Local storage enabled");
        sinks = sinks.with_store(Arc::new(store));
    }

    if config.storage_mode.uses_sheets() {
        let exporter = SheetExporter::new(&config.export_dir);
        tracing::info!(
            dir = %config.export_dir,
            sheet = %config.sheet_name,
            "Sheet export enabled"
        );
        sinks = sinks.with_export(Arc::new(exporter), config.sheet_name.clone());
    }

    if config.storage_mode == StorageMode::None {
        tracing::warn!("Storage disabled; finished interviews are not persisted");
    }

    Ok(sinks)
}

/// Resolves when Ctrl+C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    println!();
    println!("Shutting down...");
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Model: {}", config.evaluator.model);
    println!("  Questions per interview: {}", config.total_questions);
    println!("  Evaluator timeout: {}s", config.evaluator.timeout_seconds);
    println!("  Storage mode: {}", config.storage_mode);
    if config.storage_mode.uses_local() {
        println!("  Storage directory: {}", config.storage_dir);
    }
    if config.storage_mode.uses_sheets() {
        println!("  Sheet: {} (in {})", config.sheet_name, config.export_dir);
    }
    match config.session_ttl() {
        Some(ttl) => println!("  Idle session expiry: {}s", ttl.as_secs()),
        None => println!("  Idle session expiry: disabled"),
    }
}
