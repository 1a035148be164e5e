use thiserror::Error;

use crate::printer::PrinterError;

/// Errors surfaced by the bridge to its callers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Battery is low, print job rejected")]
    LowBattery,

    #[error("Soft decoding app not found")]
    BackendNotFound,

    #[error("A scanner backend is already open")]
    AlreadyOpen,

    #[error("No scanner backend is open")]
    NotOpen,

    #[error("Failed to open hard scanner, result code: {0}")]
    OpenFailed(i32),

    #[error("Failed to close scanner, result code: {0}")]
    CloseFailed(i32),

    #[error("Failed to read scanner, result code: {0}")]
    ReadFailed(i32),

    #[error("Invalid scan result buffer")]
    InvalidScanResult,

    #[error("Scan failed or returned no data")]
    ScanFailed,

    #[error("Scan request was cancelled")]
    ScanCancelled,

    #[error("Timed out waiting for scan data")]
    ScanTimeout,

    #[error("Host context is gone")]
    ContextGone,

    #[error("Device unavailable: printer is not connected")]
    DeviceUnavailable,

    #[error("Printer error: {0}")]
    Printer(#[from] PrinterError),

    #[error("Bridge is shut down")]
    BridgeClosed,
}

impl BridgeError {
    /// Stable error code reported alongside the message on the command surface
    pub fn code(&self) -> &'static str {
        match self {
            Self::LowBattery => "LOW_BATTERY",
            Self::BackendNotFound => "BACKEND_NOT_FOUND",
            Self::AlreadyOpen => "ALREADY_OPEN",
            Self::NotOpen => "NOT_OPEN",
            Self::OpenFailed(_) => "OPEN_FAILED",
            Self::CloseFailed(_) => "CLOSE_FAILED",
            Self::ReadFailed(_) => "READ_FAILED",
            Self::InvalidScanResult => "INVALID_SCAN_RESULT",
            Self::ScanFailed => "SCAN_FAILED",
            Self::ScanCancelled => "SCAN_CANCELLED",
            Self::ScanTimeout => "SCAN_TIMEOUT",
            Self::ContextGone => "CONTEXT_GONE",
            Self::DeviceUnavailable => "DEVICE_UNAVAILABLE",
            Self::Printer(_) => "PRINTER_ERROR",
            Self::BridgeClosed => "BRIDGE_CLOSED",
        }
    }
}

/// Raw non-zero return code reported by a peripheral driver
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("driver returned code {0}")]
pub struct DriverCode(pub i32);

/// Failure to launch the foreground capture mechanism
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("capture mechanism is not installed")]
    NotFound,

    #[error("failed to launch capture: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(BridgeError::LowBattery.code(), "LOW_BATTERY");
        assert_eq!(BridgeError::OpenFailed(-3).code(), "OPEN_FAILED");
        assert_eq!(BridgeError::ContextGone.code(), "CONTEXT_GONE");
        assert_eq!(
            BridgeError::Printer(PrinterError::NoPaper).code(),
            "PRINTER_ERROR"
        );
    }

    #[test]
    fn test_driver_code_surfaces_verbatim() {
        let err = BridgeError::OpenFailed(DriverCode(-7).0);
        assert_eq!(err.to_string(), "Failed to open hard scanner, result code: -7");
    }
}
