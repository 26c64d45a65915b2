//! Photo-booth uploader CLI
//!
//! Plays the role of the app's share button: reads a composed snapshot from
//! disk, runs the OAuth authorization if the session has no credential yet,
//! and uploads the image to the configured Drive endpoint.
//!
//! The authorization redirect comes back through a loopback listener; the
//! authorize URL is printed for the user to open in their browser.

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booth_auth::LoopbackTransport;
use booth_upload::UploadOrchestrator;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // CLI: [--config <path>] <image-file>
    let mut cli_config_path = None;
    let mut image_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            cli_config_path = args.next();
        } else {
            image_path = Some(arg);
        }
    }
    let image_path =
        image_path.context("usage: booth-uploader [--config config.toml] <image-file>")?;

    let config_path = Config::resolve_path(cli_config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let payload = tokio::fs::read(&image_path)
        .await
        .with_context(|| format!("failed to read image file {image_path}"))?;
    info!(bytes = payload.len(), path = %image_path, "loaded snapshot");

    let transport = LoopbackTransport::bind(config.callback.listen_addr, |authorize_url| {
        println!("Open this URL in your browser to authorize the upload:\n");
        println!("  {authorize_url}\n");
    })
    .await
    .context("failed to start the loopback redirect listener")?;

    let orchestrator = UploadOrchestrator::new(
        config.oauth_config(),
        config.upload_target(),
        Arc::new(transport),
    );

    match orchestrator.upload(payload).await {
        Ok(response) => {
            info!(status = response.status, "upload succeeded");
            println!("Successfully uploaded!");
            println!("{}", response.body);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "upload failed");
            anyhow::bail!("upload failed: {e}")
        }
    }
}
