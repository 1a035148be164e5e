use async_trait::async_trait;
use domain::driver::PrinterDriver;
use domain::{PrintJob, PrinterError, PrinterStatus};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use super::escpos;

/// Appends rendered jobs to a device node or a shared spool file
pub struct FilePrinter {
    path: PathBuf,
    open: bool,
}

impl FilePrinter {
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            open: false,
        }
    }
}

#[async_trait]
impl PrinterDriver for FilePrinter {
    async fn open(&mut self) -> Result<(), PrinterError> {
        info!(path = ?self.path, "Preparing to print to file");
        // The handle is reopened per job so network shares never stay locked
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| PrinterError::ConnectionFailed(e.to_string()))?;
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
        // A spool file has no sensors
        Ok(PrinterStatus::Ok)
    }

    async fn print(&mut self, job: &PrintJob) -> Result<(), PrinterError> {
        if !self.open {
            return Err(PrinterError::NotConnected);
        }

        let commands = escpos::encode(job);
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
        {
            Ok(mut file) => {
                if let Err(e) = file.write_all(&commands).await {
                    error!(path = ?self.path, error = %e, "Failed to write to printer file");
                    return Err(PrinterError::WriteFailed(e.to_string()));
                }
                if let Err(e) = file.flush().await {
                    error!(path = ?self.path, error = %e, "Failed to flush printer file");
                    return Err(PrinterError::WriteFailed(e.to_string()));
                }
                Ok(())
            }
            Err(e) => {
                error!(path = ?self.path, error = %e, "Failed to open printer file");
                Err(PrinterError::ConnectionFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::PrintElement;

    #[tokio::test]
    async fn test_jobs_are_appended() {
        let path = std::env::temp_dir().join(format!("bridge-spool-{}.bin", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let mut printer = FilePrinter::new(path.to_str().unwrap());

        let job = PrintJob::new(vec![PrintElement::WalkPaper { steps: 1 }]);
        assert_eq!(printer.print(&job).await, Err(PrinterError::NotConnected));

        printer.open().await.unwrap();
        printer.print(&job).await.unwrap();
        printer.print(&job).await.unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), escpos::encode(&job).len() * 2);
        std::fs::remove_file(path).ok();
    }
}
