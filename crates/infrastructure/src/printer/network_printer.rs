use async_trait::async_trait;
use domain::driver::PrinterDriver;
use domain::{PrintJob, PrinterError, PrinterStatus};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info};

use super::escpos;

/// DLE EOT 4: transmit roll paper sensor status
const PAPER_STATUS_QUERY: [u8; 3] = [0x10, 0x04, 0x04];
/// DLE EOT 2: transmit offline cause status
const OFFLINE_STATUS_QUERY: [u8; 3] = [0x10, 0x04, 0x02];

pub struct NetworkPrinter {
    address: String,
    stream: Option<TcpStream>,
    timeout: Duration,
}

impl NetworkPrinter {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            address: format!("{}:{}", host, port),
            stream: None,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn query(&mut self, command: &[u8]) -> Result<Option<u8>, PrinterError> {
        let stream = self.stream.as_mut().ok_or(PrinterError::NotConnected)?;
        stream
            .write_all(command)
            .await
            .map_err(|e| PrinterError::WriteFailed(e.to_string()))?;

        let mut reply = [0u8; 1];
        match tokio::time::timeout(self.timeout, stream.read_exact(&mut reply)).await {
            Ok(Ok(_)) => Ok(Some(reply[0])),
            Ok(Err(e)) => {
                error!(address = %self.address, error = %e, "Printer status read failed");
                self.stream = None;
                Err(PrinterError::ConnectionFailed(e.to_string()))
            }
            // Some firmware never answers real-time status requests
            Err(_) => Ok(None),
        }
    }
}

/// Map the DLE EOT 4 and DLE EOT 2 status bytes
pub(crate) fn decode_status(paper: u8, offline: u8) -> PrinterStatus {
    if paper & 0x60 == 0x60 {
        PrinterStatus::NoPaper
    } else if offline & 0x40 != 0 {
        // error occurred (includes head overheat on most models)
        PrinterStatus::Overheat
    } else {
        PrinterStatus::Ok
    }
}

#[async_trait]
impl PrinterDriver for NetworkPrinter {
    async fn open(&mut self) -> Result<(), PrinterError> {
        info!(address = %self.address, "Connecting to printer");
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => {
                info!(address = %self.address, "Connected to printer!");
                self.stream = Some(stream);
                Ok(())
            }
            Ok(Err(e)) => Err(PrinterError::ConnectionFailed(e.to_string())),
            Err(_) => Err(PrinterError::ConnectionFailed(
                "Connection timed out".to_string(),
            )),
        }
    }

    async fn close(&mut self) -> Result<(), PrinterError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .shutdown()
                .await
                .map_err(|e| PrinterError::ConnectionFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn check_status(&mut self) -> Result<PrinterStatus, PrinterError> {
        let Some(paper) = self.query(&PAPER_STATUS_QUERY).await? else {
            return Ok(PrinterStatus::Unknown);
        };
        let Some(offline) = self.query(&OFFLINE_STATUS_QUERY).await? else {
            return Ok(PrinterStatus::Unknown);
        };
        debug!(paper, offline, "Printer status bytes");
        Ok(decode_status(paper, offline))
    }

    async fn print(&mut self, job: &PrintJob) -> Result<(), PrinterError> {
        let commands = escpos::encode(job);
        let Some(stream) = &mut self.stream else {
            return Err(PrinterError::NotConnected);
        };

        match stream.write_all(&commands).await {
            Ok(_) => {
                let _ = stream.flush().await;
                debug!(job_id = %job.id, bytes = commands.len(), "Job written to printer");
                Ok(())
            }
            Err(e) => {
                error!(address = %self.address, error = %e, "Failed to write to printer");
                self.stream = None; // Invalidate connection
                Err(PrinterError::WriteFailed(e.to_string()))
            }
        }
    }
}
