//! Scale driver abstraction and config-driven factory

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared::{ScaleConnectionState, ScaleEvent};
use tokio::sync::broadcast;

use crate::error::ScaleError;
use crate::hid::{HidScaleDriver, default_backend};
use crate::mock::MockScaleDriver;
use crate::serial::{SerialScaleDriver, SerialSettings, TokioSerialOpener};

/// Common behaviour of every scale variant
///
/// Drivers run on their own once started and push [`ScaleEvent`]s to every
/// subscriber. `stop()` is idempotent and releases device handles and timers.
#[async_trait]
pub trait ScaleDriver: Send + Sync {
    /// Short variant name for logs
    fn name(&self) -> &'static str;

    /// Open the device. Returns `false` when no device could be opened.
    async fn connect(&self) -> bool;

    /// Connect if needed and begin streaming weight samples
    async fn start(&self, target_weight: f64);

    /// Stop streaming and close the device
    async fn stop(&self);

    /// Latest decoded weight in grams
    fn current_weight(&self) -> f64;

    /// Target passed to the last `start()`
    fn target_weight(&self) -> f64;

    fn connection_state(&self) -> ScaleConnectionState;

    fn is_connected(&self) -> bool {
        self.connection_state() == ScaleConnectionState::Connected
    }

    /// Receive events emitted after this call
    fn subscribe(&self) -> broadcast::Receiver<ScaleEvent>;
}

/// Which driver variant to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScaleMode {
    Hid,
    #[default]
    Serial,
    Mock,
}

impl FromStr for ScaleMode {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hid" | "usb" => Ok(Self::Hid),
            "serial" | "rs232" => Ok(Self::Serial),
            "mock" | "sim" => Ok(Self::Mock),
            other => Err(ScaleError::InvalidConfig(format!(
                "unknown scale mode '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hid => write!(f, "hid"),
            Self::Serial => write!(f, "serial"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

/// Serial sub-protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SerialProtocol {
    /// MT-SICS: the host polls with `SI` and the scale answers one line
    #[default]
    SicsPolling,
    /// The scale streams lines on its own (Toledo continuous output)
    Continuous,
}

impl FromStr for SerialProtocol {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sics" | "polling" | "sics_polling" => Ok(Self::SicsPolling),
            "continuous" | "toledo" => Ok(Self::Continuous),
            other => Err(ScaleError::InvalidConfig(format!(
                "unknown serial protocol '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SerialProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SicsPolling => write!(f, "sics"),
            Self::Continuous => write!(f, "continuous"),
        }
    }
}

/// Default serial device name for the current platform
pub fn default_serial_port() -> &'static str {
    if cfg!(windows) { "COM3" } else { "/dev/ttyUSB0" }
}

/// Driver configuration
#[derive(Debug, Clone)]
pub struct ScaleConfig {
    pub mode: ScaleMode,
    pub port: String,
    pub baud_rate: u32,
    pub protocol: SerialProtocol,
    /// HID hot-plug discovery period
    pub hotplug_interval: Duration,
    /// SICS `SI` poll period
    pub poll_interval: Duration,
}

impl ScaleConfig {
    pub const DEFAULT_BAUD: u32 = 9600;
    pub const HOTPLUG_INTERVAL: Duration = Duration::from_secs(3);
    pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

    pub fn new(mode: ScaleMode) -> Self {
        Self {
            mode,
            port: default_serial_port().to_string(),
            baud_rate: Self::DEFAULT_BAUD,
            protocol: SerialProtocol::default(),
            hotplug_interval: Self::HOTPLUG_INTERVAL,
            poll_interval: Self::POLL_INTERVAL,
        }
    }

    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
        }
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self::new(ScaleMode::default())
    }
}

/// Build the driver variant selected by `config.mode`
pub fn create_driver(config: &ScaleConfig) -> Box<dyn ScaleDriver> {
    tracing::info!(mode = %config.mode, "Creating scale driver");
    match config.mode {
        ScaleMode::Hid => Box::new(
            HidScaleDriver::new(default_backend()).with_hotplug_interval(config.hotplug_interval),
        ),
        ScaleMode::Serial => Box::new(
            SerialScaleDriver::new(
                config.serial_settings(),
                config.protocol,
                Arc::new(TokioSerialOpener),
            )
            .with_poll_interval(config.poll_interval),
        ),
        ScaleMode::Mock => Box::new(MockScaleDriver::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_mode_from_str() {
        assert_eq!("HID".parse::<ScaleMode>().unwrap(), ScaleMode::Hid);
        assert_eq!("serial".parse::<ScaleMode>().unwrap(), ScaleMode::Serial);
        assert_eq!(" mock ".parse::<ScaleMode>().unwrap(), ScaleMode::Mock);
        assert!("bluetooth".parse::<ScaleMode>().is_err());
    }

    #[test]
    fn test_serial_protocol_from_str() {
        assert_eq!(
            "sics".parse::<SerialProtocol>().unwrap(),
            SerialProtocol::SicsPolling
        );
        assert_eq!(
            "Continuous".parse::<SerialProtocol>().unwrap(),
            SerialProtocol::Continuous
        );
        assert!("modbus".parse::<SerialProtocol>().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = ScaleConfig::default();
        assert_eq!(config.mode, ScaleMode::Serial);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.protocol, SerialProtocol::SicsPolling);
        assert_eq!(config.poll_interval, Duration::from_millis(200));
        assert_eq!(config.hotplug_interval, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_factory_selects_variant() {
        let mock = create_driver(&ScaleConfig::new(ScaleMode::Mock));
        assert_eq!(mock.name(), "mock");

        let serial = create_driver(&ScaleConfig::new(ScaleMode::Serial));
        assert_eq!(serial.name(), "serial");
        assert!(!serial.is_connected());

        let hid = create_driver(&ScaleConfig::new(ScaleMode::Hid));
        assert_eq!(hid.name(), "hid");
    }
}
