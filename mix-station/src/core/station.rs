//! Station wiring
//!
//! Owns one scale driver, the virtual printer and the tasks forwarding
//! their events to the log.

use std::fmt;
use std::net::SocketAddr;

use anyhow::Context;
use mix_printer::VirtualPrinterServer;
use mix_scale::{ScaleDriver, create_driver};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::config::StationConfig;
use super::tasks::{BackgroundTasks, TaskKind};

/// Running scale and printer pair
pub struct Station {
    config: StationConfig,
    scale: Box<dyn ScaleDriver>,
    printer: VirtualPrinterServer,
    tasks: BackgroundTasks,
}

impl Station {
    pub fn new(config: StationConfig) -> Self {
        let scale = create_driver(&config.scale_config());
        let printer = VirtualPrinterServer::new(config.printer_config());
        Self {
            config,
            scale,
            printer,
            tasks: BackgroundTasks::new(),
        }
    }

    pub fn scale(&self) -> &dyn ScaleDriver {
        self.scale.as_ref()
    }

    pub fn printer(&self) -> &VirtualPrinterServer {
        &self.printer
    }

    /// Start forwarders, the printer and the scale
    ///
    /// Fails only if the printer cannot listen. A missing scale is reported
    /// through its events and retried by the driver.
    pub async fn start(&mut self) -> anyhow::Result<SocketAddr> {
        let token = self.tasks.shutdown_token();
        self.tasks.spawn(
            "scale_events",
            TaskKind::Listener,
            forward_events("scale", self.scale.subscribe(), token.clone()),
        );
        self.tasks.spawn(
            "printer_events",
            TaskKind::Listener,
            forward_events("printer", self.printer.subscribe(), token),
        );

        let addr = self
            .printer
            .start()
            .await
            .context("failed to start virtual printer")?;

        self.scale.start(self.config.scale_target_grams).await;
        tracing::info!(
            scale = self.scale.name(),
            connected = self.scale.is_connected(),
            printer = %addr,
            "Station started"
        );
        self.tasks.log_summary();
        Ok(addr)
    }

    /// Number of background tasks that stopped while the station runs
    pub fn check_health(&self) -> usize {
        self.tasks.check_health()
    }

    /// Stop the scale, the printer and the forwarders
    pub async fn stop(self) {
        self.scale.stop().await;
        self.printer.stop().await;
        self.tasks.shutdown().await;
        tracing::info!("Station stopped");
    }
}

/// Log every event of one channel as a JSON payload
async fn forward_events<T>(
    source: &'static str,
    mut rx: broadcast::Receiver<T>,
    shutdown: CancellationToken,
) where
    T: Serialize + Clone + fmt::Display + Send + 'static,
{
    loop {
        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = rx.recv() => received,
        };

        match received {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(payload) => tracing::info!(source, event = %event, %payload, "Hardware event"),
                Err(e) => tracing::warn!(source, error = %e, "Failed to serialize event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(source, skipped, "Event forwarder lagged")
            }
            Err(RecvError::Closed) => break,
        }
    }
}
