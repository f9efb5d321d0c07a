//! Walk-in Queue TUI Entry Point

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use queue_client::client::QueueClient;
use queue_client::config::ClientConfig;
use queue_client::navigation::Route;
use queue_client::storage::FileStore;
use queue_tui::prelude::*;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Screen to open on start
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StartScreen {
    Login,
    Staff,
    Display,
}

impl From<StartScreen> for Route {
    fn from(screen: StartScreen) -> Self {
        match screen {
            StartScreen::Login => Route::Login,
            StartScreen::Staff => Route::Staff,
            StartScreen::Display => Route::Display,
        }
    }
}

/// Walk-in Queue - staff dashboard and public display
#[derive(Parser, Debug)]
#[command(name = "queue-tui")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE", default_value = "queue.toml")]
    config: PathBuf,

    /// Queue service base URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Screen to open on start
    #[arg(long, value_enum, default_value_t = StartScreen::Staff)]
    screen: StartScreen,
}

/// Precedence: CLI > environment > file > defaults
fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut config = ClientConfig::load_or_default(&args.config)?.with_env_override();
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Tracing goes to the log file only; without one the terminal stays clean.
fn init_tracing(config: &ClientConfig) -> Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;
    init_tracing(&config)?;

    tracing::info!("Walk-in Queue TUI v{}", queue_client::VERSION);
    tracing::info!(
        base_url = %config.base_url,
        poll_interval_ms = config.poll_interval_ms,
        session_file = %config.session_file.display(),
        fetch_ordering = ?config.fetch_ordering,
        "Configuration loaded"
    );

    let store = Arc::new(FileStore::new(config.session_file.clone()));
    let client = QueueClient::with_store(config, store, args.screen.into())?;

    let mut app = TuiApp::new(client)?;
    app.run().await?;

    Ok(())
}
