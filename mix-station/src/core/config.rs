use std::time::Duration;

use mix_printer::PrinterServerConfig;
use mix_scale::{ScaleConfig, ScaleMode, SerialProtocol};

/// Station configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | SCALE_MODE | serial | hid, serial or mock |
/// | SCALE_PORT | /dev/ttyUSB0 (COM3 on Windows) | serial device |
/// | SCALE_BAUD | 9600 | serial baud rate |
/// | SCALE_PROTOCOL | sics | sics (polling) or continuous |
/// | SCALE_TARGET_GRAMS | 0 | target weight passed to the driver |
/// | PRINTER_HOST | 0.0.0.0 | virtual printer bind host |
/// | PRINTER_PORT | 9100 | virtual printer port |
/// | PRINTER_IDLE_MS | 800 | silence that ends a print job |
/// | LOG_LEVEL | info | log level |
/// | LOG_JSON | false | JSON log lines |
/// | LOG_DIR | - | daily rolling log directory |
///
/// # Example
///
/// ```ignore
/// SCALE_MODE=mock PRINTER_PORT=9101 cargo run -p mix-station
/// ```
#[derive(Debug, Clone)]
pub struct StationConfig {
    pub scale_mode: ScaleMode,
    pub scale_port: String,
    pub scale_baud: u32,
    pub scale_protocol: SerialProtocol,
    pub scale_target_grams: f64,

    pub printer_host: String,
    pub printer_port: u16,
    pub printer_idle_ms: u64,

    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl StationConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup (environment, map in tests)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let scale = ScaleConfig::default();
        let printer = PrinterServerConfig::default();

        Self {
            scale_mode: lookup("SCALE_MODE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(scale.mode),
            scale_port: lookup("SCALE_PORT").unwrap_or(scale.port),
            scale_baud: lookup("SCALE_BAUD")
                .and_then(|v| v.parse().ok())
                .unwrap_or(scale.baud_rate),
            scale_protocol: lookup("SCALE_PROTOCOL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(scale.protocol),
            scale_target_grams: lookup("SCALE_TARGET_GRAMS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),

            printer_host: lookup("PRINTER_HOST").unwrap_or(printer.host),
            printer_port: lookup("PRINTER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(printer.port),
            printer_idle_ms: lookup("PRINTER_IDLE_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(printer.idle_timeout.as_millis() as u64),

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: lookup("LOG_JSON")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            log_dir: lookup("LOG_DIR").filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn scale_config(&self) -> ScaleConfig {
        ScaleConfig {
            mode: self.scale_mode,
            port: self.scale_port.clone(),
            baud_rate: self.scale_baud,
            protocol: self.scale_protocol,
            ..ScaleConfig::default()
        }
    }

    pub fn printer_config(&self) -> PrinterServerConfig {
        PrinterServerConfig::new(self.printer_host.clone(), self.printer_port)
            .with_idle_timeout(Duration::from_millis(self.printer_idle_ms))
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> StationConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StationConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = StationConfig::default();
        assert_eq!(config.scale_mode, ScaleMode::Serial);
        assert_eq!(config.scale_baud, 9600);
        assert_eq!(config.scale_protocol, SerialProtocol::SicsPolling);
        assert_eq!(config.printer_host, "0.0.0.0");
        assert_eq!(config.printer_port, 9100);
        assert_eq!(config.printer_idle_ms, 800);
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("SCALE_MODE", "mock"),
            ("SCALE_PORT", "/dev/ttyS1"),
            ("SCALE_BAUD", "4800"),
            ("SCALE_PROTOCOL", "continuous"),
            ("SCALE_TARGET_GRAMS", "250.5"),
            ("PRINTER_PORT", "9101"),
            ("PRINTER_IDLE_MS", "1500"),
            ("LOG_JSON", "true"),
            ("LOG_DIR", "/var/log/mix"),
        ]);
        assert_eq!(config.scale_mode, ScaleMode::Mock);
        assert_eq!(config.scale_target_grams, 250.5);

        let scale = config.scale_config();
        assert_eq!(scale.port, "/dev/ttyS1");
        assert_eq!(scale.baud_rate, 4800);
        assert_eq!(scale.protocol, SerialProtocol::Continuous);

        let printer = config.printer_config();
        assert_eq!(printer.port, 9101);
        assert_eq!(printer.idle_timeout, Duration::from_millis(1500));
        assert!(config.log_json);
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/mix"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_map(&[("SCALE_MODE", "bluetooth"), ("PRINTER_PORT", "http")]);
        assert_eq!(config.scale_mode, ScaleMode::Serial);
        assert_eq!(config.printer_port, 9100);
    }
}
