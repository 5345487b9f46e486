//! dcr-bot - DOC/DOCX to PDF batch relay
//!
//! Receives Telegram updates on `/webhook`, converts uploaded documents with
//! LibreOffice as they arrive, and returns the whole batch as one ZIP of PDFs
//! when the user sends `/done`.

use anyhow::{Context, Result};
use clap::Parser;
use dcr_bot::archive::ZipArchiveBuilder;
use dcr_bot::batch::MemoryBatchStore;
use dcr_bot::config::{example_toml, BotConfig, CliArgs};
use dcr_bot::convert::soffice::SofficeConverter;
use dcr_bot::relay::Relay;
use dcr_bot::transport::TelegramClient;
use dcr_bot::{build_router, drain_background_tasks, AppState};
use dcr_common::config::write_toml_config;
use dcr_common::logging::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Extra time on top of the conversion timeout for downloads and replies
const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();

    if let Some(path) = &cli.write_example_config {
        write_toml_config(&example_toml(), path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Example config written to {}", path.display());
        return Ok(());
    }

    // TOML carries the log settings, so it is read before tracing exists and
    // anything worth reporting is logged after init_tracing
    let (toml_config, mut notices) = cli.load_toml().context("Failed to load config")?;
    let config = BotConfig::resolve(&cli, &toml_config)?;
    notices.extend(config.notices.iter().cloned());

    init_tracing(&config.logging)?;

    info!(
        "Starting dcr-bot v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("DCR_GIT_HASH"),
        env!("DCR_BUILD_TIMESTAMP"),
        env!("DCR_BUILD_PROFILE")
    );
    for notice in &notices {
        warn!("{}", notice);
    }
    if let Some(path) = cli.config_path().filter(|p| p.exists()) {
        info!("Config file: {}", path.display());
    }
    info!(
        max_file_size_bytes = config.max_file_size_bytes,
        converter = %config.converter_command,
        timeout_secs = config.conversion_timeout.as_secs(),
        "Relay settings"
    );

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("Failed to create work dir {}", config.work_dir.display()))?;
    info!("Work dir: {}", config.work_dir.display());

    let telegram = Arc::new(TelegramClient::new(
        config.telegram_api_base.clone(),
        config.bot_token.clone(),
    )?);

    if let Some(url) = &config.webhook_url {
        match telegram.set_webhook(url).await {
            Ok(()) => info!("✓ Webhook registered: {}", url),
            Err(e) => error!("Failed to register webhook {}: {}", url, e),
        }
    } else {
        warn!("No webhook URL configured; Telegram must already know where to deliver updates");
    }

    let bot_username = match telegram.get_me().await {
        Ok(username) => {
            info!("Bot username: @{}", username);
            Some(username)
        }
        Err(e) => {
            warn!("Could not fetch bot username, accepting commands addressed to any bot: {}", e);
            None
        }
    };

    let relay = Relay::new(
        Arc::new(MemoryBatchStore::new()),
        Arc::new(SofficeConverter::new(config.converter_command.clone())),
        Arc::new(ZipArchiveBuilder::new()),
        telegram,
        config.relay_settings(),
    );

    let mut state = AppState::new(Arc::new(relay));
    if let Some(username) = bot_username {
        state = state.with_bot_username(username);
    }
    let tasks = state.tasks.clone();
    let app = build_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("dcr-bot listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // In-flight conversions are bounded by the conversion timeout
    let grace = config.conversion_timeout + SHUTDOWN_GRACE;
    info!(pending = tasks.len(), "Waiting up to {}s for in-flight updates", grace.as_secs());
    if drain_background_tasks(&tasks, grace).await {
        info!("In-flight updates finished");
    } else {
        warn!(pending = tasks.len(), "Shutdown grace elapsed with updates still running");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
