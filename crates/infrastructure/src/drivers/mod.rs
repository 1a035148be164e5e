mod serial_reader;
mod simulated_reader;

pub use serial_reader::{SerialDecodeReader, SerialReaderConfig};
pub use simulated_reader::{SimulatedDecodeReader, SimulatorConfig};

use anyhow::{Context, Result};
use domain::driver::{CaptureLauncher, DecodeReader, PowerSource, PrinterDriver};

use crate::capture::{ProcessCaptureLauncher, UnavailableCaptureLauncher};
use crate::config::{BridgeConfig, PowerKind, PrinterKind, ScannerKind};
use crate::power::{ManualPowerSource, SysfsPowerSource};
use crate::printer::{FilePrinter, MockPrinter, NetworkPrinter};

/// Driver result codes. Negative, so they never collide with a success.
pub const ERR_OPEN_FAILED: i32 = -1;
pub const ERR_ALREADY_OPEN: i32 = -2;
pub const ERR_NOT_OPEN: i32 = -3;
pub const ERR_READER_STOPPED: i32 = -4;
pub const ERR_INVALID_CONFIG: i32 = -5;

/// Frame a decoded payload as `[type, length, payload..]`.
/// Payloads longer than 255 bytes are truncated to fit the length byte.
pub fn format_record(record_type: u8, payload: &[u8]) -> Vec<u8> {
    let len = payload.len().min(usize::from(u8::MAX));
    let mut record = Vec::with_capacity(len + 2);
    record.push(record_type);
    record.push(len as u8);
    record.extend_from_slice(&payload[..len]);
    record
}

/// The full set of drivers a bridge needs
pub struct DriverSet {
    pub printer: Box<dyn PrinterDriver>,
    pub decoder: Box<dyn DecodeReader>,
    pub launcher: Box<dyn CaptureLauncher>,
    pub power: Box<dyn PowerSource>,
}

/// Factory for creating drivers from configuration
pub struct DriverFactory;

impl DriverFactory {
    pub fn create_printer(config: &BridgeConfig) -> Result<Box<dyn PrinterDriver>> {
        let printer = &config.printer;
        let driver: Box<dyn PrinterDriver> = match printer.kind {
            PrinterKind::Mock => Box::new(MockPrinter::new()),
            PrinterKind::Network => Box::new(
                NetworkPrinter::new(&printer.host, printer.port)
                    .with_timeout(std::time::Duration::from_millis(printer.timeout_ms)),
            ),
            PrinterKind::File => {
                let path = printer
                    .path
                    .as_deref()
                    .context("printer.path is required for a File printer")?;
                Box::new(FilePrinter::new(path))
            }
        };
        Ok(driver)
    }

    pub fn create_decoder(config: &BridgeConfig) -> Box<dyn DecodeReader> {
        let scanner = &config.scanner;
        match scanner.kind {
            ScannerKind::Serial => Box::new(SerialDecodeReader::new(SerialReaderConfig {
                record_type: scanner.record_type,
                ..SerialReaderConfig::new(scanner.port.clone())
            })),
            ScannerKind::Simulated => Box::new(SimulatedDecodeReader::new(SimulatorConfig {
                interval_ms: scanner.interval_ms,
                samples: scanner.samples.clone(),
                record_type: scanner.record_type,
            })),
        }
    }

    pub fn create_launcher(config: &BridgeConfig) -> Box<dyn CaptureLauncher> {
        match &config.capture.command {
            Some(command) => Box::new(ProcessCaptureLauncher::new(
                command.clone(),
                config.capture.args.clone(),
            )),
            None => Box::new(UnavailableCaptureLauncher),
        }
    }

    pub fn create(config: &BridgeConfig) -> Result<DriverSet> {
        let power: Box<dyn PowerSource> = match config.power.kind {
            PowerKind::Manual => Box::new(ManualPowerSource::new()),
            PowerKind::Sysfs => Box::new(SysfsPowerSource::new(
                &config.power.supply,
                std::time::Duration::from_secs(config.power.poll_interval_secs.max(1)),
            )),
        };

        Ok(DriverSet {
            printer: Self::create_printer(config)?,
            decoder: Self::create_decoder(config),
            launcher: Self::create_launcher(config),
            power,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_record() {
        assert_eq!(format_record(1, b"ABC"), vec![1, 3, b'A', b'B', b'C']);
        assert_eq!(format_record(2, b""), vec![2, 0]);

        let long = vec![b'9'; 300];
        let record = format_record(1, &long);
        assert_eq!(record[1], 255);
        assert_eq!(record.len(), 257);
    }

    #[test]
    fn test_file_printer_requires_path() {
        let mut config = BridgeConfig::default();
        config.printer.kind = PrinterKind::File;
        assert!(DriverFactory::create_printer(&config).is_err());

        config.printer.path = Some("/tmp/receipts.bin".to_string());
        assert!(DriverFactory::create_printer(&config).is_ok());
    }

    #[test]
    fn test_default_drivers_start_closed() {
        let drivers = DriverFactory::create(&BridgeConfig::default()).unwrap();
        assert!(!drivers.printer.is_open());
    }

    #[test]
    fn test_sysfs_power_with_zero_interval() {
        let mut config = BridgeConfig::default();
        config.power.kind = PowerKind::Sysfs;
        config.power.poll_interval_secs = 0;
        assert!(DriverFactory::create(&config).is_ok());
    }
}
