//! Jornada - a terminal front end for the weekly family journal.

mod cli;
mod commands;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jornada_core::{ApiClient, Config, Credentials, QueryCache};

use cli::{Cli, Command};
use commands::Session;

const LOG_FILE: &str = "jornada.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a file in the cache directory so they don't mix with command
/// output; stderr is the fallback when that file can't be opened. Use the
/// RUST_LOG env var to control the level (e.g., RUST_LOG=debug).
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = Config::log_dir().ok().and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(LOG_FILE)
            .build(dir)
            .ok()
    });

    match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing();
    info!("jornada starting");

    let today = Local::now().date_naive();

    // The catalog and the settings file need no backend
    let command = match cli.command {
        Command::Catalog { level, all_lives } => {
            commands::catalog(today, level, all_lives);
            return Ok(());
        }
        Command::Config { action } => return commands::config(action),
        command => command,
    };

    let config = Config::load().context("Falha ao carregar a configuração")?;
    let credentials = Credentials::from_env()?;

    let mut client =
        ApiClient::new(&credentials.url, &credentials.anon_key).context("Falha ao criar o cliente da API")?;
    if let Some(token) = &credentials.access_token {
        client = client.with_token(token.clone());
    }

    let user_id = cli.user.or_else(|| config.resolve_user_id(&credentials));
    let session = Session {
        cache: QueryCache::new(),
        backend: Arc::new(client),
        user_id,
        config,
        today,
    };

    let result = commands::run(&session, command).await;
    info!("jornada shutting down");
    result
}
