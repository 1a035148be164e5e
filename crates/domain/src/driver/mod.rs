mod capture_launcher;
mod connection_state;
mod decode_reader;
mod power_source;
mod printer_driver;

pub use capture_launcher::{CaptureLauncher, CaptureResultListener};
pub use connection_state::ConnectionState;
pub use decode_reader::{DecodeReader, ScanListener};
pub use power_source::{PowerListener, PowerSource};
pub use printer_driver::PrinterDriver;
