//! hotkeys-daemon: registers global hot keys and logs every firing
//!
//! The bindings come from `HOTKEYS_BINDINGS` (see `config`). On Windows the
//! native binding service is used. Elsewhere the simulated service stands in
//! and shortcuts typed on stdin (e.g. `ALT+A`) are treated as key presses.

mod config;
mod lifecycle;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hotkeys::{HotKey, HotKeyEvent, HotKeyManager, Platform};

use crate::config::Config;
use crate::lifecycle::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "hotkeys-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(
        bindings = config.bindings.len(),
        register_timeout = ?config.register_timeout,
        "configuration loaded"
    );

    serve(config).await?;

    info!("hotkeys-daemon stopped");
    Ok(())
}

#[cfg(target_os = "windows")]
async fn serve(config: Config) -> Result<()> {
    let platform = Arc::new(hotkeys::NativePlatform::new());
    let manager = register_all(platform, &config).await?;

    ShutdownSignal::new().wait().await?;
    info!("shutdown signal received");

    shutdown(manager).await
}

#[cfg(not(target_os = "windows"))]
async fn serve(config: Config) -> Result<()> {
    use hotkeys::platform::simulated::SimulatedPlatform;
    use tokio::io::{AsyncBufReadExt, BufReader};

    warn!("no native binding service on this platform, using the simulated one");
    let platform = Arc::new(SimulatedPlatform::new());
    let manager = register_all(Arc::clone(&platform), &config).await?;

    info!("type a shortcut (e.g. ALT+A) and press Enter to simulate a key press");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let simulate_input = async {
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse() {
                Ok(shortcut) => {
                    if !platform.fire(shortcut) {
                        info!(%shortcut, "no hot key bound to this combination");
                    }
                }
                Err(e) => warn!(error = %e, "not a shortcut"),
            }
        }
        // stdin closed; keep running until a signal arrives
        std::future::pending::<()>().await
    };

    let shutdown_signal = ShutdownSignal::new();
    tokio::select! {
        result = shutdown_signal.wait() => {
            result?;
            info!("shutdown signal received");
        }
        _ = simulate_input => {}
    }

    shutdown(manager).await
}

/// Register every configured binding; failures are logged, not fatal
async fn register_all<P: Platform>(
    platform: Arc<P>,
    config: &Config,
) -> Result<Arc<HotKeyManager<P>>> {
    let manager = Arc::new(HotKeyManager::with_config(platform, config.manager_config()));

    for binding in &config.bindings {
        let hot_key = HotKey::from_shortcut(binding.id.clone(), binding.shortcut);
        let task_manager = Arc::clone(&manager);

        // Registration blocks until the listener thread reports
        let result = tokio::task::spawn_blocking(move || {
            task_manager.add_hot_key(hot_key, |event: &HotKeyEvent| {
                info!(
                    id = %event.hot_key().id(),
                    shortcut = %event.hot_key(),
                    "hot key detected"
                );
            })
        })
        .await
        .context("registration task failed")?;

        match result {
            Ok(true) => info!(id = %binding.id, shortcut = %binding.shortcut, "hot key active"),
            Ok(false) => warn!(
                id = %binding.id,
                shortcut = %binding.shortcut,
                "hot key could not be registered - combination may be in use"
            ),
            Err(e) => error!(id = %binding.id, error = %e, "hot key registration failed"),
        }
    }

    Ok(manager)
}

/// Unregister everything and report stale platform resources
async fn shutdown<P: Platform>(manager: Arc<HotKeyManager<P>>) -> Result<()> {
    info!("shutting down...");
    let reports = tokio::task::spawn_blocking(move || manager.shutdown())
        .await
        .context("shutdown task failed")?;

    for report in reports.iter().filter(|r| !r.is_clean()) {
        warn!(
            id = %report.id(),
            failures = ?report.errors(),
            "hot key left stale platform resources"
        );
    }
    Ok(())
}
