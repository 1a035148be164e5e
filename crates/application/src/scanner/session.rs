use std::sync::Arc;
use std::time::Duration;

use domain::driver::{
    CaptureLauncher, CaptureResultListener, DecodeReader, ScanListener,
};
use domain::{
    BridgeError, CaptureRequest, DecodeMode, DriverCode, LaunchError, ScanBackend, ScanRecord,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Scanner session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScannerState {
    Idle,
    Opening(ScanBackend),
    Open(ScanBackend),
    Closing(ScanBackend),
}

/// One scan operation at a time, over either the foreground capture
/// activity or the hardware decoder.
pub struct ScannerSession {
    decoder: Box<dyn DecodeReader>,
    launcher: Box<dyn CaptureLauncher>,
    state: ScannerState,
    mode: Option<DecodeMode>,
    generation: u64,
}

impl ScannerSession {
    pub fn new(decoder: Box<dyn DecodeReader>, launcher: Box<dyn CaptureLauncher>) -> Self {
        Self {
            decoder,
            launcher,
            state: ScannerState::Idle,
            mode: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ScannerState::Idle
    }

    /// Backend of the open (or opening) session
    pub fn backend(&self) -> Option<ScanBackend> {
        match self.state {
            ScannerState::Opening(b) | ScannerState::Open(b) => Some(b),
            _ => None,
        }
    }

    pub fn decode_mode(&self) -> Option<DecodeMode> {
        self.mode
    }

    /// Generation of the current hard decoder session
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Launch the foreground capture activity. The result arrives later via
    /// the activity-result channel keyed by `request.request_code`.
    pub fn open_soft(
        &mut self,
        request: CaptureRequest,
        listener: Arc<dyn CaptureResultListener>,
    ) -> Result<(), BridgeError> {
        self.ensure_idle()?;
        self.state = ScannerState::Opening(ScanBackend::SoftCapture);

        let request_code = request.request_code;
        match self.launcher.launch(request, listener) {
            Ok(()) => {
                self.state = ScannerState::Open(ScanBackend::SoftCapture);
                info!(request_code, "📷 Soft capture launched");
                Ok(())
            }
            Err(LaunchError::NotFound) => {
                self.state = ScannerState::Idle;
                warn!(request_code, "Soft decoding app not found");
                Err(BridgeError::BackendNotFound)
            }
            Err(LaunchError::Failed(reason)) => {
                self.state = ScannerState::Idle;
                error!(request_code, %reason, "Failed to launch soft capture");
                Err(BridgeError::ScanFailed)
            }
        }
    }

    /// Open the hardware decoder. In streaming mode `listener` is called with
    /// the new session generation and installed on the driver.
    pub async fn open_hard<F>(
        &mut self,
        baud_rate: u32,
        mode: DecodeMode,
        listener: F,
    ) -> Result<(), BridgeError>
    where
        F: FnOnce(u64) -> Arc<dyn ScanListener>,
    {
        self.ensure_idle()?;
        self.generation += 1;
        self.state = ScannerState::Opening(ScanBackend::HardDecoder);

        if let Err(DriverCode(code)) = self.decoder.open(baud_rate).await {
            self.state = ScannerState::Idle;
            error!(baud_rate, code, "Failed to open hard scanner");
            return Err(BridgeError::OpenFailed(code));
        }

        if mode == DecodeMode::Streaming {
            self.decoder.set_listener(Some(listener(self.generation)));
        }
        self.state = ScannerState::Open(ScanBackend::HardDecoder);
        self.mode = Some(mode);

        info!(baud_rate, ?mode, generation = self.generation, "Hard scanner opened");
        Ok(())
    }

    /// Close the open session. A driver failure is reported but the session
    /// still returns to Idle.
    pub async fn close(&mut self) -> Result<(), BridgeError> {
        let backend = self.backend().ok_or(BridgeError::NotOpen)?;
        self.state = ScannerState::Closing(backend);

        let result = match backend {
            ScanBackend::HardDecoder => {
                self.decoder.set_listener(None);
                self.decoder
                    .close()
                    .await
                    .map_err(|DriverCode(code)| BridgeError::CloseFailed(code))
            }
            ScanBackend::SoftCapture => Ok(()),
        };

        self.state = ScannerState::Idle;
        self.mode = None;

        match &result {
            Ok(()) => info!(backend = backend.as_str(), "Scanner closed"),
            Err(e) => error!(backend = backend.as_str(), error = %e, "Failed to close scanner"),
        }
        result
    }

    /// Read one tagged record from the open hard decoder, waiting at most `timeout`
    pub async fn read_once(&mut self, timeout: Duration) -> Result<ScanRecord, BridgeError> {
        if self.state != ScannerState::Open(ScanBackend::HardDecoder) {
            return Err(BridgeError::NotOpen);
        }

        let buffer = match tokio::time::timeout(timeout, self.decoder.read_with_format(timeout)).await
        {
            Ok(Ok(Some(buffer))) => buffer,
            Ok(Ok(None)) | Err(_) => {
                debug!(?timeout, "No scan data before timeout");
                return Err(BridgeError::ScanTimeout);
            }
            Ok(Err(DriverCode(code))) => return Err(BridgeError::ReadFailed(code)),
        };

        ScanRecord::parse(&buffer).inspect_err(|_| {
            warn!(len = buffer.len(), "Malformed scan buffer");
        })
    }

    /// Whether a payload from decoder session `generation` should be forwarded
    pub fn accepts(&self, generation: u64) -> bool {
        self.state == ScannerState::Open(ScanBackend::HardDecoder)
            && self.mode == Some(DecodeMode::Streaming)
            && generation == self.generation
    }

    /// Return a soft-capture session to Idle once its result was consumed
    /// or abandoned
    pub fn soft_finished(&mut self) {
        if self.state == ScannerState::Open(ScanBackend::SoftCapture) {
            self.state = ScannerState::Idle;
            debug!("Soft capture session finished");
        }
    }

    fn ensure_idle(&self) -> Result<(), BridgeError> {
        if self.is_idle() {
            Ok(())
        } else {
            warn!(state = ?self.state, "Scanner already open");
            Err(BridgeError::AlreadyOpen)
        }
    }
}
