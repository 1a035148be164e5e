pub mod session;
pub use session::{ScannerSession, ScannerState};
