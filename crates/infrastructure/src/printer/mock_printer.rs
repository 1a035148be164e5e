use async_trait::async_trait;
use domain::driver::PrinterDriver;
use domain::{PrintJob, PrinterError, PrinterStatus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::escpos;

/// In-memory printer for running the bridge without hardware
#[derive(Clone)]
pub struct MockPrinter {
    pub open: bool,
    pub status: PrinterStatus,
    pub sent_data: Arc<Mutex<Vec<u8>>>,
}

impl MockPrinter {
    pub fn new() -> Self {
        Self {
            open: false,
            status: PrinterStatus::Ok,
            sent_data: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for MockPrinter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrinterDriver for MockPrinter {
    async fn open(&mut self) -> Result<(), PrinterError> {
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PrinterError> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn check_status(&mut self) -> Result<PrinterStatus, PrinterError> {
        if !self.open {
            return Err(PrinterError::NotConnected);
        }
        Ok(self.status)
    }

    async fn print(&mut self, job: &PrintJob) -> Result<(), PrinterError> {
        if !self.open {
            return Err(PrinterError::NotConnected);
        }
        let commands = escpos::encode(job);
        info!(job_id = %job.id, bytes = commands.len(), "Mock printer received job");
        self.sent_data.lock().await.extend_from_slice(&commands);
        Ok(())
    }
}
