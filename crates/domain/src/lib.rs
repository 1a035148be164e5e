//! Domain layer - Pure peripheral-bridge types with no I/O
//!
//! This crate contains:
//! - Session state (ConnectionState, BatteryState, ScanBackend)
//! - Value objects (PrintJob, ScanEvent, ScanRecord, HostContext)
//! - Power and activity-result notifications
//! - Driver interfaces (traits) implemented by infrastructure
//!
//! Principles:
//! - No dependencies on infrastructure or a runtime
//! - State rules (battery threshold, scan buffer layout) enforced here
//! - Testable in isolation

pub mod battery;
pub mod context;
pub mod driver;
pub mod error;
pub mod printer;
pub mod scan;

// Re-export commonly used types
pub use battery::{BatteryState, BatteryStatus, PowerNotification};
pub use context::{ContextId, HostContext};
pub use driver::ConnectionState;
pub use error::{BridgeError, DriverCode, LaunchError};
pub use printer::{Alignment, PrintElement, PrintJob, PrinterError, PrinterStatus, StatusReport};
pub use scan::{
    ActivityResult, CaptureRequest, CaptureTarget, DecodeMode, Disposition, ScanBackend,
    ScanEvent, ScanRecord,
};
