use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use domain::DriverCode;
use domain::driver::{DecodeReader, ScanListener};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::sync::CancellationToken;

use super::{
    ERR_ALREADY_OPEN, ERR_INVALID_CONFIG, ERR_NOT_OPEN, ERR_OPEN_FAILED, ERR_READER_STOPPED,
    format_record,
};

/// Serial decoder line configuration. The baud rate comes from the open call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialReaderConfig {
    pub port: String,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: String, // "None", "Even", "Odd"
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Type tag reported for every framed read
    #[serde(default = "default_record_type")]
    pub record_type: u8,
}

fn default_data_bits() -> u8 {
    8
}
fn default_parity() -> String {
    "None".to_string()
}
fn default_stop_bits() -> u8 {
    1
}
fn default_record_type() -> u8 {
    1
}

impl SerialReaderConfig {
    pub fn new(port: String) -> Self {
        Self {
            port,
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
            record_type: default_record_type(),
        }
    }

    fn to_parity(&self) -> Result<tokio_serial::Parity, DriverCode> {
        match self.parity.as_str() {
            "None" => Ok(tokio_serial::Parity::None),
            "Even" => Ok(tokio_serial::Parity::Even),
            "Odd" => Ok(tokio_serial::Parity::Odd),
            _ => Err(DriverCode(ERR_INVALID_CONFIG)),
        }
    }

    fn to_stop_bits(&self) -> Result<tokio_serial::StopBits, DriverCode> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            _ => Err(DriverCode(ERR_INVALID_CONFIG)),
        }
    }

    fn to_data_bits(&self) -> Result<tokio_serial::DataBits, DriverCode> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            _ => Err(DriverCode(ERR_INVALID_CONFIG)),
        }
    }

    fn port_name(&self) -> String {
        // Windows needs \\.\COMn for ports above COM9
        if cfg!(target_os = "windows") && !self.port.to_uppercase().starts_with(r"\\.\") {
            format!(r"\\.\{}", self.port)
        } else {
            self.port.clone()
        }
    }
}

type SharedListener = Arc<RwLock<Option<Arc<dyn ScanListener>>>>;

struct OpenSession {
    frames: mpsc::UnboundedReceiver<Vec<u8>>,
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

/// Hardware decoder that emits one CR/LF-terminated code per scan
pub struct SerialDecodeReader {
    config: SerialReaderConfig,
    listener: SharedListener,
    session: Option<OpenSession>,
}

impl SerialDecodeReader {
    pub fn new(config: SerialReaderConfig) -> Self {
        Self {
            config,
            listener: Arc::new(RwLock::new(None)),
            session: None,
        }
    }

    fn open_port(&self, baud_rate: u32) -> Result<SerialStream, DriverCode> {
        let port_name = self.config.port_name();
        tracing::debug!(port = %port_name, baud_rate, "Opening serial port");

        tokio_serial::new(&port_name, baud_rate)
            .data_bits(self.config.to_data_bits()?)
            .parity(self.config.to_parity()?)
            .stop_bits(self.config.to_stop_bits()?)
            .open_native_async()
            .map_err(|e| {
                tracing::warn!(port = %port_name, error = %e, "Failed to open serial port");
                DriverCode(ERR_OPEN_FAILED)
            })
    }
}

/// Split complete CR/LF-terminated lines off the front of `buffer`.
/// Empty lines are skipped and a trailing partial line stays buffered.
pub(crate) fn split_lines(buffer: &mut BytesMut) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    while let Some(end) = buffer.iter().position(|b| *b == b'\r' || *b == b'\n') {
        let line = buffer.split_to(end);
        buffer.advance(1);
        if !line.is_empty() {
            lines.push(line.to_vec());
        }
    }
    lines
}

async fn read_loop(
    mut port: SerialStream,
    listener: SharedListener,
    frames: mpsc::UnboundedSender<Vec<u8>>,
    record_type: u8,
    cancel_token: CancellationToken,
) {
    let mut buffer = BytesMut::with_capacity(1024);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            read = port.read_buf(&mut buffer) => match read {
                Ok(0) => {
                    tracing::warn!("Serial port closed by device");
                    break;
                }
                Ok(_) => {
                    for line in split_lines(&mut buffer) {
                        let current = listener.read().ok().and_then(|l| l.clone());
                        match current {
                            Some(listener) => listener.on_data(line),
                            None => {
                                let _ = frames.send(format_record(record_type, &line));
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Serial read error");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl DecodeReader for SerialDecodeReader {
    async fn open(&mut self, baud_rate: u32) -> Result<(), DriverCode> {
        if self.session.is_some() {
            return Err(DriverCode(ERR_ALREADY_OPEN));
        }

        let port = self.open_port(baud_rate)?;
        let (tx, frames) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(read_loop(
            port,
            self.listener.clone(),
            tx,
            self.config.record_type,
            cancel_token.clone(),
        ));

        self.session = Some(OpenSession {
            frames,
            cancel_token,
            task,
        });
        tracing::info!(port = %self.config.port, baud_rate, "Serial decoder opened");
        Ok(())
    }

    fn set_listener(&mut self, listener: Option<Arc<dyn ScanListener>>) {
        if let Ok(mut slot) = self.listener.write() {
            *slot = listener;
        }
    }

    async fn read_with_format(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, DriverCode> {
        let session = self.session.as_mut().ok_or(DriverCode(ERR_NOT_OPEN))?;

        match tokio::time::timeout(timeout, session.frames.recv()).await {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => Err(DriverCode(ERR_READER_STOPPED)),
            Err(_) => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), DriverCode> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        session.cancel_token.cancel();
        // Dropping the stream in the task releases the port
        if let Err(e) = session.task.await {
            tracing::warn!(error = %e, "Serial reader task ended abnormally");
        }

        tracing::info!(port = %self.config.port, "Serial decoder closed");
        Ok(())
    }
}
