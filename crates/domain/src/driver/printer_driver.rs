use async_trait::async_trait;

use crate::printer::{PrintJob, PrinterError, PrinterStatus};

/// Thermal printer session provided by the vendor driver
#[async_trait]
pub trait PrinterDriver: Send + Sync {
    /// Open the printer session
    async fn open(&mut self) -> Result<(), PrinterError>;

    /// Close the printer session
    async fn close(&mut self) -> Result<(), PrinterError>;

    /// Check if the session is currently open
    fn is_open(&self) -> bool;

    /// Query device-level status (paper, temperature)
    async fn check_status(&mut self) -> Result<PrinterStatus, PrinterError>;

    /// Render and send a complete job
    async fn print(&mut self, job: &PrintJob) -> Result<(), PrinterError>;
}
