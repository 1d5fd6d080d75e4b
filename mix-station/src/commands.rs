//! Subcommand implementations

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use mix_printer::{RawPrintClient, read_recipe_file, to_windows_1252};
use mix_scale::SerialScaleDriver;
use mix_scale::serial::TokioSerialOpener;
use shared::RecipeDocument;
use std::sync::Arc;

use crate::core::{Station, StationConfig};

/// Period of the background task health check while running
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Run until Ctrl-C
pub async fn run(config: StationConfig) -> anyhow::Result<()> {
    let mut station = Station::new(config);
    station.start().await?;

    let mut health = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    health.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    health.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            _ = health.tick() => {
                station.check_health();
            }
        }
    }
    tracing::info!("Shutdown requested");

    station.stop().await;
    Ok(())
}

/// Serial ports visible to the serial driver
pub fn ports(config: &StationConfig) -> Vec<String> {
    let scale = config.scale_config();
    let driver = SerialScaleDriver::new(
        scale.serial_settings(),
        scale.protocol,
        Arc::new(TokioSerialOpener),
    );
    driver.list_ports()
}

/// Recipe held in a spool file
pub async fn parse(file: &Path) -> anyhow::Result<RecipeDocument> {
    match read_recipe_file(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?
    {
        Some(recipe) => Ok(recipe),
        None => bail!("no recipe found in {}", file.display()),
    }
}

/// Send a captured job; returns the bytes sent
pub async fn replay(file: &Path, addr: &str) -> anyhow::Result<usize> {
    let raw = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let data = to_windows_1252(&raw);

    let client = RawPrintClient::from_addr(addr)?;
    client
        .send(&data)
        .await
        .with_context(|| format!("failed to send job to {addr}"))?;
    Ok(data.len())
}
