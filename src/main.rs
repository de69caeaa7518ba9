/// Version injected at compile time via CRUDBOARD_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CRUDBOARD_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crudboard::api::{self, AppState};
use crudboard::config::Config;
use crudboard::notification::NotificationLog;
use crudboard::resource::{ModelShape, Registry, ResourceConfig, DEMO_DATA};
use crudboard::store::{DataProvider, HttpStore, MemoryStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Admin-panel backend for resources and dashboard cards
#[derive(Parser, Debug)]
#[command(name = "crudboard", version, about, long_about = None)]
struct Args {
    /// Config file (defaults to <config dir>/crudboard/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<String>,

    /// Resource definition file (.json/.yaml); repeatable
    #[arg(short, long = "definitions")]
    definitions: Vec<PathBuf>,

    /// Seed data for the in-memory store
    #[arg(long)]
    data: Option<PathBuf>,

    /// Remote JSON store base URL
    #[arg(long)]
    store_url: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let Some(log_path) = log_file else {
        // RUST_LOG wins over --log-level for finer per-module control
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(tracing_level.to_string().to_lowercase()));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
        return Ok(None);
    };

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn load_registry(definitions: &[PathBuf]) -> Result<Registry> {
    let config = if definitions.is_empty() {
        tracing::info!("No resource definitions configured, using the embedded demo");
        ResourceConfig::embedded()?
    } else {
        ResourceConfig::load_files(definitions)?
    };
    Registry::from_config(&config)
}

fn build_store(config: &Config, args: &Args, registry: &Registry) -> Result<Arc<dyn DataProvider>> {
    if let Some(url) = config.effective_store_url(args.store_url.as_deref()) {
        tracing::info!(store_url = %url, "using remote store");
        let store = registry.iter().fold(HttpStore::new(&url)?, |store, resource| {
            let relations = resource.relations.iter().map(|r| r.name.clone());
            store.with_shape(&resource.name, ModelShape::new(relations))
        });
        return Ok(Arc::new(store));
    }

    let seed = match config.effective_data(args.data.as_deref()) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read seed data {}", path.display()))?,
        None => DEMO_DATA.to_string(),
    };
    let seed: serde_json::Value = serde_json::from_str(&seed).context("Failed to parse seed data")?;

    Ok(Arc::new(MemoryStore::from_json(&seed)?.with_resources(registry)))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_error) = match Config::load(args.config.as_deref()) {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };

    let log_file = config.effective_log_file(args.log_file.as_deref());
    let _log_guard = setup_logging(args.log_level, log_file.as_deref())?;
    tracing::info!("crudboard {} starting with log level: {:?}", VERSION, args.log_level);
    if let Some(err) = config_error {
        tracing::warn!("Ignoring config, using defaults: {:#}", err);
    }

    let registry = load_registry(&config.effective_definitions(&args.definitions))?;
    let store = build_store(&config, &args, &registry)?;

    let state = AppState::new(registry, store)
        .with_limits(config.page_limits())
        .with_card_settings(config.card_settings())
        .with_notifications(Arc::new(NotificationLog::default()));

    let bind_addr = config.effective_bind_addr(args.bind.as_deref());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!(bind_addr = %bind_addr, "crudboard listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
