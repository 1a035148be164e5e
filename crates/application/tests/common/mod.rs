#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use application::{Bridge, BridgeDrivers, BridgeHandle, BridgeSettings, BridgeSnapshot};
use async_trait::async_trait;
use domain::driver::{
    CaptureLauncher, CaptureResultListener, DecodeReader, PowerListener, PowerSource,
    PrinterDriver, ScanListener,
};
use domain::{
    CaptureRequest, DriverCode, LaunchError, PowerNotification, PrintJob, PrinterError,
    PrinterStatus,
};
use tokio::sync::mpsc;

/// Printer that records every job it receives
#[derive(Clone, Default)]
pub struct RecordingPrinter {
    pub jobs: Arc<Mutex<Vec<PrintJob>>>,
    pub opens: Arc<Mutex<u32>>,
    pub closes: Arc<Mutex<u32>>,
    pub fail_open: bool,
    pub open: bool,
}

#[async_trait]
impl PrinterDriver for RecordingPrinter {
    async fn open(&mut self) -> Result<(), PrinterError> {
        *self.opens.lock().unwrap() += 1;
        if self.fail_open {
            return Err(PrinterError::ConnectionFailed("refused".to_string()));
        }
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PrinterError> {
        *self.closes.lock().unwrap() += 1;
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn check_status(&mut self) -> Result<PrinterStatus, PrinterError> {
        Ok(PrinterStatus::Ok)
    }

    async fn print(&mut self, job: &PrintJob) -> Result<(), PrinterError> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

/// Decoder whose listener is exposed so tests can push payloads the way the
/// driver thread would
#[derive(Clone, Default)]
pub struct ScriptedDecoder {
    pub listener: Arc<Mutex<Option<Arc<dyn ScanListener>>>>,
    pub reads: Arc<Mutex<VecDeque<Vec<u8>>>>,
    pub opened_at: Arc<Mutex<Vec<u32>>>,
    pub open_code: Option<i32>,
    pub close_code: Option<i32>,
}

impl ScriptedDecoder {
    pub fn queue_read(&self, buffer: &[u8]) {
        self.reads.lock().unwrap().push_back(buffer.to_vec());
    }

    /// The listener currently installed on the driver, if any
    pub fn current_listener(&self) -> Option<Arc<dyn ScanListener>> {
        self.listener.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecodeReader for ScriptedDecoder {
    async fn open(&mut self, baud_rate: u32) -> Result<(), DriverCode> {
        if let Some(code) = self.open_code {
            return Err(DriverCode(code));
        }
        self.opened_at.lock().unwrap().push(baud_rate);
        Ok(())
    }

    fn set_listener(&mut self, listener: Option<Arc<dyn ScanListener>>) {
        *self.listener.lock().unwrap() = listener;
    }

    async fn read_with_format(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, DriverCode> {
        let next = self.reads.lock().unwrap().pop_front();
        match next {
            Some(buffer) => Ok(Some(buffer)),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<(), DriverCode> {
        match self.close_code {
            Some(code) => Err(DriverCode(code)),
            None => Ok(()),
        }
    }
}

/// Launcher that forwards each launch to the test
pub struct ChannelLauncher {
    pub launches: mpsc::UnboundedSender<(CaptureRequest, Arc<dyn CaptureResultListener>)>,
    pub installed: bool,
}

impl CaptureLauncher for ChannelLauncher {
    fn launch(
        &self,
        request: CaptureRequest,
        listener: Arc<dyn CaptureResultListener>,
    ) -> Result<(), LaunchError> {
        if !self.installed {
            return Err(LaunchError::NotFound);
        }
        let _ = self.launches.send((request, listener));
        Ok(())
    }
}

/// Power source whose listener can be driven by the test
#[derive(Clone, Default)]
pub struct ManualPower {
    pub listener: Arc<Mutex<Option<Arc<dyn PowerListener>>>>,
}

impl ManualPower {
    pub fn notify(&self, notification: PowerNotification) {
        if let Some(listener) = self.listener.lock().unwrap().as_ref() {
            listener.on_notification(notification);
        }
    }

    pub fn is_registered(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }
}

impl PowerSource for ManualPower {
    fn register(&mut self, listener: Arc<dyn PowerListener>) -> Result<(), DriverCode> {
        *self.listener.lock().unwrap() = Some(listener);
        Ok(())
    }

    fn unregister(&mut self) {
        *self.listener.lock().unwrap() = None;
    }
}

pub struct Harness {
    pub bridge: BridgeHandle,
    pub printer: RecordingPrinter,
    pub decoder: ScriptedDecoder,
    pub power: ManualPower,
    pub launches: mpsc::UnboundedReceiver<(CaptureRequest, Arc<dyn CaptureResultListener>)>,
}

impl Harness {
    pub fn start() -> Self {
        Self::with(RecordingPrinter::default(), ScriptedDecoder::default(), true)
    }

    pub fn with(printer: RecordingPrinter, decoder: ScriptedDecoder, capture_installed: bool) -> Self {
        let power = ManualPower::default();
        let (launch_tx, launches) = mpsc::unbounded_channel();
        let drivers = BridgeDrivers {
            printer: Box::new(printer.clone()),
            decoder: Box::new(decoder.clone()),
            launcher: Box::new(ChannelLauncher {
                launches: launch_tx,
                installed: capture_installed,
            }),
            power: Box::new(power.clone()),
        };
        let (bridge, _task) = Bridge::spawn(drivers, BridgeSettings::default());

        Self {
            bridge,
            printer,
            decoder,
            power,
            launches,
        }
    }

    /// Round-trip through the bridge loop so every driver event queued so far
    /// has been handled
    pub async fn settle(&self) -> BridgeSnapshot {
        self.bridge.snapshot().await.unwrap()
    }
}

pub fn discharging(level: i32, scale: i32) -> PowerNotification {
    PowerNotification::BatteryChanged {
        status: domain::BatteryStatus::Discharging,
        level,
        scale,
    }
}
