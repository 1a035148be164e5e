use std::sync::Arc;
use std::time::Duration;

use domain::driver::{CaptureLauncher, DecodeReader, PowerSource, PrinterDriver, ScanListener};
use domain::{
    ActivityResult, BridgeError, CaptureTarget, ConnectionState, DecodeMode, HostContext,
    PrintJob, ScanBackend, ScanEvent, ScanRecord,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::handle::BridgeHandle;
use super::listeners::{InboxCaptureListener, InboxPowerListener, InboxScanListener};
use super::message::{BridgeMessage, DriverEvent, LifecycleEvent};
use crate::battery::BatteryMonitor;
use crate::connection::ConnectionManager;
use crate::events::EventBridge;
use crate::lifecycle::{Completion, LifecycleAdapter, PendingScan};
use crate::printer::PrintAdmissionGate;
use crate::scanner::{ScannerSession, ScannerState};

/// External collaborators the bridge drives
pub struct BridgeDrivers {
    pub printer: Box<dyn PrinterDriver>,
    pub decoder: Box<dyn DecodeReader>,
    pub launcher: Box<dyn CaptureLauncher>,
    pub power: Box<dyn PowerSource>,
}

#[derive(Debug, Clone, Copy)]
pub struct BridgeSettings {
    /// First correlation code handed to the capture launcher
    pub request_code_base: i32,
    /// Baud rate used when a caller does not give one
    pub default_baud_rate: u32,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            request_code_base: 0x124,
            default_baud_rate: 115_200,
        }
    }
}

/// Point-in-time view of the session state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSnapshot {
    pub connection: ConnectionState,
    pub low_battery: bool,
    pub battery_subscribed: bool,
    pub scanner: ScannerState,
    pub pending_requests: usize,
    pub has_subscriber: bool,
    pub context: Option<HostContext>,
}

/// The bridge session. Owns every piece of session state and mutates it only
/// from its own loop; callers talk to it through a [`BridgeHandle`] and
/// drivers through inbox listeners.
pub struct Bridge {
    connection: ConnectionManager,
    battery: BatteryMonitor,
    gate: PrintAdmissionGate,
    scanner: ScannerSession,
    events: EventBridge,
    lifecycle: LifecycleAdapter,
    settings: BridgeSettings,
    active_soft: Option<i32>,
    commands: mpsc::UnboundedReceiver<BridgeMessage>,
    driver_rx: mpsc::UnboundedReceiver<DriverEvent>,
    driver_tx: mpsc::UnboundedSender<DriverEvent>,
    cancel_token: CancellationToken,
}

impl Bridge {
    pub fn new(drivers: BridgeDrivers, settings: BridgeSettings) -> (Self, BridgeHandle) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (driver_tx, driver_rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();

        let bridge = Self {
            connection: ConnectionManager::new(drivers.printer),
            battery: BatteryMonitor::new(drivers.power),
            gate: PrintAdmissionGate::new(),
            scanner: ScannerSession::new(drivers.decoder, drivers.launcher),
            events: EventBridge::new(),
            lifecycle: LifecycleAdapter::new(settings.request_code_base),
            settings,
            active_soft: None,
            commands,
            driver_rx,
            driver_tx,
            cancel_token: cancel_token.clone(),
        };
        let handle = BridgeHandle::new(command_tx, cancel_token, settings.default_baud_rate);

        (bridge, handle)
    }

    /// Build the bridge and run it on the current runtime
    pub fn spawn(drivers: BridgeDrivers, settings: BridgeSettings) -> (BridgeHandle, JoinHandle<()>) {
        let (bridge, handle) = Self::new(drivers, settings);
        let task = tokio::spawn(bridge.run());
        (handle, task)
    }

    pub async fn run(mut self) {
        info!("🔌 Peripheral bridge started");

        loop {
            // Driver events queued before a command are handled before it
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    info!("Shutdown signal received");
                    self.drain().await;
                    break;
                }
                Some(event) = self.driver_rx.recv() => {
                    self.handle_driver_event(event);
                }
                message = self.commands.recv() => match message {
                    Some(message) => self.handle_message(message).await,
                    None => {
                        info!("All bridge handles dropped");
                        break;
                    }
                }
            }
        }

        self.teardown().await;
        info!("🔌 Peripheral bridge stopped");
    }

    async fn handle_message(&mut self, message: BridgeMessage) {
        match message {
            BridgeMessage::Connect(reply) => {
                let connected = self.connect().await;
                let _ = reply.send(connected);
            }
            BridgeMessage::Disconnect(reply) => {
                let disconnected = self.disconnect().await;
                let _ = reply.send(disconnected);
            }
            BridgeMessage::IsConnected(reply) => {
                let _ = reply.send(self.connection.is_connected());
            }
            BridgeMessage::CheckStatus(reply) => {
                let report = self.connection.check_status(self.battery.state()).await;
                let _ = reply.send(report);
            }
            BridgeMessage::Print(job, reply) => {
                let result = self.print(&job).await;
                let _ = reply.send(result);
            }
            BridgeMessage::OpenSoftScanner(target, reply) => {
                let _ = reply.send(self.open_soft(target));
            }
            BridgeMessage::OpenHardScanner {
                baud_rate,
                mode,
                reply,
            } => {
                let baud_rate = baud_rate.unwrap_or(self.settings.default_baud_rate);
                let result = self.open_hard(baud_rate, mode).await;
                let _ = reply.send(result);
            }
            BridgeMessage::CloseScanner(reply) => {
                let result = self.close_scanner().await;
                let _ = reply.send(result);
            }
            BridgeMessage::ReadWithFormat(timeout, reply) => {
                let result = self.read_with_format(timeout).await;
                let _ = reply.send(result);
            }
            BridgeMessage::Subscribe(reply) => {
                let _ = reply.send(self.events.subscribe());
            }
            BridgeMessage::Unsubscribe(reply) => {
                self.events.unsubscribe();
                let _ = reply.send(());
            }
            BridgeMessage::ActivityResult(result, reply) => {
                let _ = reply.send(self.complete_capture(result));
            }
            BridgeMessage::Power(notification, reply) => {
                let _ = reply.send(self.battery.handle(notification));
            }
            BridgeMessage::Lifecycle(event, reply) => {
                let _ = reply.send(self.apply_lifecycle(event));
            }
            BridgeMessage::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_driver_event(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::Scan {
                generation,
                payload,
            } => {
                if self.scanner.accepts(generation) {
                    debug!(len = payload.len(), "Scanned data received");
                    self.events.publish(ScanEvent::new(payload));
                } else {
                    debug!(generation, "Ignoring payload from a closed decoder session");
                }
            }
            DriverEvent::Power(notification) => {
                self.battery.handle(notification);
            }
            DriverEvent::CaptureResult(result) => {
                if let Err(e) = self.complete_capture(result) {
                    warn!(error = %e, "Capture result not delivered");
                }
            }
        }
    }

    async fn connect(&mut self) -> bool {
        let listener = Arc::new(InboxPowerListener {
            inbox: self.driver_tx.clone(),
        });
        self.connection.connect(&mut self.battery, listener).await
    }

    async fn disconnect(&mut self) -> bool {
        if !self.connection.is_connected() {
            return self.connection.disconnect(&mut self.battery).await;
        }

        let closed = self.connection.disconnect(&mut self.battery).await;
        self.lifecycle.cancel_all();
        if self.active_soft.take().is_some() {
            self.scanner.soft_finished();
        }
        closed
    }

    async fn print(&mut self, job: &PrintJob) -> Result<(), BridgeError> {
        self.gate
            .submit(&mut self.connection, self.battery.state(), job)
            .await
    }

    /// Soft capture goes through the host's foreground app, not the printer
    /// session, so it is allowed while disconnected. A later disconnect still
    /// cancels it.
    fn open_soft(&mut self, target: CaptureTarget) -> Result<PendingScan, BridgeError> {
        if !self.scanner.is_idle() {
            return Err(BridgeError::AlreadyOpen);
        }

        let (request, pending) = self.lifecycle.register(target)?;
        let request_code = request.request_code;
        let listener = Arc::new(InboxCaptureListener {
            inbox: self.driver_tx.clone(),
        });

        if let Err(e) = self.scanner.open_soft(request, listener) {
            self.lifecycle.forget(request_code);
            return Err(e);
        }
        self.active_soft = Some(request_code);
        Ok(pending)
    }

    async fn open_hard(&mut self, baud_rate: u32, mode: DecodeMode) -> Result<(), BridgeError> {
        let inbox = self.driver_tx.clone();
        self.scanner
            .open_hard(baud_rate, mode, move |generation| {
                Arc::new(InboxScanListener { generation, inbox }) as Arc<dyn ScanListener>
            })
            .await
    }

    async fn close_scanner(&mut self) -> Result<(), BridgeError> {
        let backend = self.scanner.backend();
        let result = self.scanner.close().await;

        if backend == Some(ScanBackend::SoftCapture) {
            if let Some(request_code) = self.active_soft.take() {
                self.lifecycle.cancel(request_code);
            }
        }
        result
    }

    async fn read_with_format(&mut self, timeout: Duration) -> Result<ScanRecord, BridgeError> {
        self.scanner.read_once(timeout).await
    }

    fn complete_capture(&mut self, result: ActivityResult) -> Result<Completion, BridgeError> {
        let request_code = result.request_code;
        let outcome = self.lifecycle.complete(result);

        let settled = !matches!(outcome, Ok(Completion::Deferred) | Ok(Completion::Ignored));
        if settled && self.active_soft == Some(request_code) {
            self.active_soft = None;
            self.scanner.soft_finished();
        }
        outcome
    }

    fn apply_lifecycle(&mut self, event: LifecycleEvent) -> Option<HostContext> {
        let context = match event {
            LifecycleEvent::Attach(name) => Some(self.lifecycle.attach(&name)),
            LifecycleEvent::Reattach(name) => Some(self.lifecycle.reattach(&name)),
            LifecycleEvent::DetachForConfigChanges => {
                self.lifecycle.detach_for_config_changes();
                None
            }
            LifecycleEvent::Detach => {
                let abandoned = self.lifecycle.detach();
                debug!(?abandoned, "Requests abandoned with the host context");
                None
            }
        };

        // A reattach may flush the active request, a detach may abandon it
        if let Some(request_code) = self.active_soft {
            if !self.lifecycle.is_live(request_code) {
                self.active_soft = None;
                self.scanner.soft_finished();
            }
        }
        context
    }

    fn snapshot(&self) -> BridgeSnapshot {
        BridgeSnapshot {
            connection: self.connection.state(),
            low_battery: self.battery.is_low(),
            battery_subscribed: self.battery.is_active(),
            scanner: self.scanner.state(),
            pending_requests: self.lifecycle.pending_count(),
            has_subscriber: self.events.has_subscriber(),
            context: self.lifecycle.current().cloned(),
        }
    }

    /// Run everything already queued when shutdown was requested. Messages
    /// sent after this point are answered with `BridgeClosed`.
    async fn drain(&mut self) {
        while let Ok(event) = self.driver_rx.try_recv() {
            self.handle_driver_event(event);
        }

        let queued = self.commands.len();
        for _ in 0..queued {
            let Ok(message) = self.commands.try_recv() else {
                break;
            };
            while let Ok(event) = self.driver_rx.try_recv() {
                self.handle_driver_event(event);
            }
            self.handle_message(message).await;
        }
        if queued > 0 {
            debug!(queued, "Queued commands processed before shutdown");
        }
    }

    async fn teardown(&mut self) {
        if self.scanner.backend() == Some(ScanBackend::HardDecoder) {
            if let Err(e) = self.scanner.close().await {
                warn!(error = %e, "Error closing scanner during shutdown");
            }
        }
        self.disconnect().await;
        self.lifecycle.cancel_all();
        self.events.unsubscribe();
        debug!(
            admitted = self.gate.admitted(),
            rejected = self.gate.rejected(),
            "Print admission totals"
        );
    }
}
