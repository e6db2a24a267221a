use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use screenshot_relay::config::RelayConfig;
use screenshot_relay::error::classify;
use screenshot_relay::logging::{default_log_dir, init_logging};
use screenshot_relay::{
    CaptureScheduler, DeliveryOutcome, ImageBudgeter, StopReason, WebhookClient, send_test_image,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Capture the screen on an adaptive schedule and post each capture to a
/// webhook.
#[derive(Parser, Debug)]
#[command(name = "shotrelay")]
#[command(about = "📸 Capture screenshots and relay them to a webhook")]
#[command(long_about = "Capture screenshots at randomized intervals, compress them under the \
upload limit, and post them to a webhook. Backs off on failures, skips captures under \
memory or CPU pressure, and stops after repeated failures.")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json", help = "Path to the JSON configuration file")]
    config: PathBuf,

    /// Write a sample configuration and exit
    #[arg(long, help = "Create a sample configuration file at --config and exit")]
    create_config: bool,

    /// Send one test image and exit
    #[arg(long, help = "Send a test image to the configured webhook and exit")]
    test_webhook: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.create_config {
        RelayConfig::write_sample(&args.config)
            .with_context(|| format!("writing {}", args.config.display()))?;
        println!("Sample configuration written to {}", args.config.display());
        println!("Edit it and set your webhook URL before starting the relay.");
        return Ok(ExitCode::SUCCESS);
    }

    let loaded = match RelayConfig::load(&args.config) {
        Ok(loaded) => loaded,
        Err(e) if classify::is_fatal(&e) => {
            if let Err(fallback) = RelayConfig::from_file(&args.config) {
                eprintln!("Warning: {}", fallback);
            }
            eprintln!("Configuration error: {}", e);
            eprintln!("Run with --create-config to create a sample configuration file.");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let config = loaded.config;
    let _log_guard = init_logging(Path::new(default_log_dir()), &config.log_level)?;
    if let Some(fallback) = &loaded.fallback {
        fallback.log();
    }

    if args.test_webhook {
        return test_webhook(&config).await;
    }

    info!(
        webhook = %config.redacted_webhook(),
        min_interval = config.min_interval,
        max_interval = config.max_interval,
        screenshot_dir = %config.screenshot_dir.display(),
        low_power = config.low_power_mode,
        "Starting screenshot relay"
    );

    let shutdown = CancellationToken::new();
    let mut scheduler = CaptureScheduler::builder(&config)
        .with_shutdown(shutdown.clone())
        .build()
        .context("setting up the capture loop")?;

    tokio::spawn(wait_for_signal(shutdown));

    let summary = scheduler.run().await;
    match summary.reason {
        StopReason::HardStop => error!(
            failed = summary.failed,
            "Stopped after repeated failures; check the webhook and screen access"
        ),
        StopReason::Shutdown => info!("Shut down cleanly"),
    }
    Ok(ExitCode::SUCCESS)
}

async fn test_webhook(config: &RelayConfig) -> Result<ExitCode> {
    let client = WebhookClient::from_config(config)?;
    let mut budgeter = ImageBudgeter::from_config(config);

    match send_test_image(&client, &mut budgeter).await? {
        DeliveryOutcome::Success { status } => {
            println!("✓ Webhook test successful (HTTP {})", status);
            Ok(ExitCode::SUCCESS)
        }
        DeliveryOutcome::RemoteRejected { status, body } => {
            println!("✗ Webhook test failed: HTTP {} {}", status, body);
            Ok(ExitCode::FAILURE)
        }
        DeliveryOutcome::TransientFailure { reason } => {
            println!("✗ Webhook test failed: {}", reason);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Cancel `shutdown` on Ctrl-C or, on Unix, SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "Cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received, finishing current capture");
    shutdown.cancel();
}
