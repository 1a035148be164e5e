use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrinterKind {
    /// In-memory sink, for development without hardware
    #[default]
    Mock,
    /// Raw ESC/POS over TCP (port 9100 style)
    Network,
    /// Append ESC/POS bytes to a device node or shared file
    File,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrinterConfig {
    #[serde(default)]
    pub kind: PrinterKind,
    #[serde(default = "default_printer_host")]
    pub host: String,
    #[serde(default = "default_printer_port")]
    pub port: u16,
    /// Required if kind is `File`
    pub path: Option<String>,
    #[serde(default = "default_printer_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            kind: PrinterKind::default(),
            host: default_printer_host(),
            port: default_printer_port(),
            path: None,
            timeout_ms: default_printer_timeout_ms(),
        }
    }
}

fn default_printer_host() -> String {
    "127.0.0.1".to_string()
}
fn default_printer_port() -> u16 {
    9100
}
fn default_printer_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScannerKind {
    #[default]
    Simulated,
    Serial,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScannerConfig {
    #[serde(default)]
    pub kind: ScannerKind,
    /// Serial device, e.g. `/dev/ttyS1` or `COM3`
    #[serde(default = "default_scanner_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Type tag reported for framed serial reads
    #[serde(default = "default_record_type")]
    pub record_type: u8,
    /// Simulated scanner: time between generated payloads
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Simulated scanner: payloads to cycle through
    #[serde(default = "default_sample_codes")]
    pub samples: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            kind: ScannerKind::default(),
            port: default_scanner_port(),
            baud_rate: default_baud_rate(),
            record_type: default_record_type(),
            interval_ms: default_interval_ms(),
            samples: default_sample_codes(),
        }
    }
}

fn default_scanner_port() -> String {
    "/dev/ttyS1".to_string()
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_record_type() -> u8 {
    1
}
fn default_interval_ms() -> u64 {
    2000
}
fn default_sample_codes() -> Vec<String> {
    vec![
        "4006381333931".to_string(),
        "5901234123457".to_string(),
        "https://example.com/item/42".to_string(),
    ]
}

/// External program that plays the foreground capture activity.
/// Without one, soft scans report `BackendNotFound`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CaptureConfig {
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerKind {
    /// Notifications come only from the host channel
    #[default]
    Manual,
    /// Poll `/sys/class/power_supply/<supply>`
    Sysfs,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PowerConfig {
    #[serde(default)]
    pub kind: PowerKind,
    #[serde(default = "default_supply")]
    pub supply: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            kind: PowerKind::default(),
            supply: default_supply(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_supply() -> String {
    "BAT0".to_string()
}
fn default_poll_interval() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BridgeConfig {
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default = "default_request_code_base")]
    pub request_code_base: i32,
}

fn default_request_code_base() -> i32 {
    0x124
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            printer: PrinterConfig::default(),
            scanner: ScannerConfig::default(),
            capture: CaptureConfig::default(),
            power: PowerConfig::default(),
            request_code_base: default_request_code_base(),
        }
    }
}

impl BridgeConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::load_with_mode(config_dir, &run_mode)
    }

    pub fn load_with_mode(config_dir: &str, run_mode: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Required so a missing install never starts with silent defaults
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. BRIDGE__PRINTER__HOST=10.0.0.7)
            .add_source(Environment::with_prefix("BRIDGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("bridge-config-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.printer.kind, PrinterKind::Mock);
        assert_eq!(config.scanner.baud_rate, 115_200);
        assert_eq!(config.request_code_base, 0x124);
        assert!(config.capture.command.is_none());
    }

    #[test]
    fn test_load_layers_run_mode_over_default() {
        let dir = temp_dir("layers");
        fs::write(
            dir.join("default.toml"),
            r#"
[printer]
kind = "Network"
host = "10.0.0.7"

[scanner]
kind = "Serial"
port = "/dev/ttyUSB0"
"#,
        )
        .unwrap();
        fs::write(
            dir.join("bench.toml"),
            r#"
[printer]
port = 9101
"#,
        )
        .unwrap();

        let config = BridgeConfig::load_with_mode(dir.to_str().unwrap(), "bench").unwrap();
        assert_eq!(config.printer.kind, PrinterKind::Network);
        assert_eq!(config.printer.host, "10.0.0.7");
        assert_eq!(config.printer.port, 9101);
        assert_eq!(config.scanner.kind, ScannerKind::Serial);
        assert_eq!(config.scanner.port, "/dev/ttyUSB0");
        assert_eq!(config.scanner.baud_rate, 115_200);
        assert_eq!(config.power.kind, PowerKind::Manual);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_default_file_is_an_error() {
        let dir = temp_dir("missing");
        assert!(BridgeConfig::load_with_mode(dir.to_str().unwrap(), "development").is_err());
        fs::remove_dir_all(dir).ok();
    }
}
