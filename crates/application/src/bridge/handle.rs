use std::future::Future;
use std::time::Duration;

use domain::{
    ActivityResult, BridgeError, CaptureTarget, DecodeMode, HostContext, PowerNotification,
    PrintElement, PrintJob, ScanRecord, StatusReport,
};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::actor::BridgeSnapshot;
use super::message::{BridgeMessage, LifecycleEvent, Reply};
use crate::events::EventStream;
use crate::lifecycle::{Completion, PendingScan};

/// Cloneable front door to a running [`Bridge`](super::Bridge).
///
/// Every method queues its message when it is called, not when the returned
/// future is first polled, so calls are processed in call order even when
/// their replies are awaited on different tasks. Calls made after the bridge
/// stopped fail with `BridgeClosed`.
#[derive(Clone)]
pub struct BridgeHandle {
    tx: mpsc::UnboundedSender<BridgeMessage>,
    cancel_token: CancellationToken,
    default_baud_rate: u32,
}

impl BridgeHandle {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<BridgeMessage>,
        cancel_token: CancellationToken,
        default_baud_rate: u32,
    ) -> Self {
        Self {
            tx,
            cancel_token,
            default_baud_rate,
        }
    }

    /// Queue a message now. The returned receiver yields the reply.
    fn enqueue<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> BridgeMessage,
    ) -> Result<oneshot::Receiver<T>, BridgeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| BridgeError::BridgeClosed)?;
        Ok(rx)
    }

    /// Open the printer and start the battery subscription.
    /// Returns `false` when the printer could not be opened.
    pub fn connect(&self) -> impl Future<Output = Result<bool, BridgeError>> + Send + use<> {
        received(self.enqueue(BridgeMessage::Connect))
    }

    /// Returns whether the printer closed cleanly
    pub fn disconnect(&self) -> impl Future<Output = Result<bool, BridgeError>> + Send + use<> {
        received(self.enqueue(BridgeMessage::Disconnect))
    }

    pub fn is_connected(&self) -> impl Future<Output = Result<bool, BridgeError>> + Send + use<> {
        received(self.enqueue(BridgeMessage::IsConnected))
    }

    pub fn check_status(
        &self,
    ) -> impl Future<Output = Result<StatusReport, BridgeError>> + Send + use<> {
        flattened(self.enqueue(BridgeMessage::CheckStatus))
    }

    pub fn print(
        &self,
        elements: Vec<PrintElement>,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send + use<> {
        let job = PrintJob::new(elements);
        flattened(self.enqueue(|reply| BridgeMessage::Print(job, reply)))
    }

    /// Launch a foreground barcode capture. The returned slot resolves once
    /// the host delivers the matching activity result.
    pub fn open_soft_scanner(
        &self,
    ) -> impl Future<Output = Result<PendingScan, BridgeError>> + Send + use<> {
        flattened(self.enqueue(|reply| BridgeMessage::OpenSoftScanner(CaptureTarget::Barcode, reply)))
    }

    /// Same as [`open_soft_scanner`](Self::open_soft_scanner) with a QR target
    pub fn start_qr_code_scan(
        &self,
    ) -> impl Future<Output = Result<PendingScan, BridgeError>> + Send + use<> {
        flattened(self.enqueue(|reply| BridgeMessage::OpenSoftScanner(CaptureTarget::QrCode, reply)))
    }

    /// Open the hardware decoder in streaming mode
    pub fn open_hard_scanner(
        &self,
        baud_rate: Option<u32>,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send + use<> {
        self.open_decoder(baud_rate, DecodeMode::Streaming)
    }

    /// Open the hardware decoder in polling mode at the default baud rate
    pub fn open_scanner(&self) -> impl Future<Output = Result<(), BridgeError>> + Send + use<> {
        self.open_decoder(None, DecodeMode::Polling)
    }

    fn open_decoder(
        &self,
        baud_rate: Option<u32>,
        mode: DecodeMode,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send + use<> {
        flattened(self.enqueue(|reply| BridgeMessage::OpenHardScanner {
            baud_rate,
            mode,
            reply,
        }))
    }

    pub fn read_with_format(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<ScanRecord, BridgeError>> + Send + use<> {
        flattened(self.enqueue(|reply| BridgeMessage::ReadWithFormat(timeout, reply)))
    }

    pub fn close_scanner(&self) -> impl Future<Output = Result<(), BridgeError>> + Send + use<> {
        flattened(self.enqueue(BridgeMessage::CloseScanner))
    }

    /// Replace the current scan-event subscriber
    pub fn subscribe(&self) -> impl Future<Output = Result<EventStream, BridgeError>> + Send + use<> {
        received(self.enqueue(BridgeMessage::Subscribe))
    }

    pub fn unsubscribe(&self) -> impl Future<Output = Result<(), BridgeError>> + Send + use<> {
        received(self.enqueue(BridgeMessage::Unsubscribe))
    }

    /// Hand an activity result from the host to the bridge
    pub fn deliver_activity_result(
        &self,
        result: ActivityResult,
    ) -> impl Future<Output = Result<Completion, BridgeError>> + Send + use<> {
        flattened(self.enqueue(|reply| BridgeMessage::ActivityResult(result, reply)))
    }

    /// Apply a power notification in call order with every other command.
    /// Returns false when the battery subscription is inactive and it was ignored.
    pub fn report_power(
        &self,
        notification: PowerNotification,
    ) -> impl Future<Output = Result<bool, BridgeError>> + Send + use<> {
        received(self.enqueue(|reply| BridgeMessage::Power(notification, reply)))
    }

    pub fn attach<N: Into<String>>(
        &self,
        name: N,
    ) -> impl Future<Output = Result<HostContext, BridgeError>> + Send + use<N> {
        let rx = self.lifecycle(LifecycleEvent::Attach(name.into()));
        async move { received(rx).await?.ok_or(BridgeError::ContextGone) }
    }

    pub fn detach_for_config_changes(
        &self,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send + use<> {
        let rx = self.lifecycle(LifecycleEvent::DetachForConfigChanges);
        async move { received(rx).await.map(|_| ()) }
    }

    pub fn reattach<N: Into<String>>(
        &self,
        name: N,
    ) -> impl Future<Output = Result<HostContext, BridgeError>> + Send + use<N> {
        let rx = self.lifecycle(LifecycleEvent::Reattach(name.into()));
        async move { received(rx).await?.ok_or(BridgeError::ContextGone) }
    }

    pub fn detach(&self) -> impl Future<Output = Result<(), BridgeError>> + Send + use<> {
        let rx = self.lifecycle(LifecycleEvent::Detach);
        async move { received(rx).await.map(|_| ()) }
    }

    fn lifecycle(
        &self,
        event: LifecycleEvent,
    ) -> Result<oneshot::Receiver<Option<HostContext>>, BridgeError> {
        self.enqueue(|reply| BridgeMessage::Lifecycle(event, reply))
    }

    pub fn snapshot(
        &self,
    ) -> impl Future<Output = Result<BridgeSnapshot, BridgeError>> + Send + use<> {
        received(self.enqueue(BridgeMessage::Snapshot))
    }

    pub fn default_baud_rate(&self) -> u32 {
        self.default_baud_rate
    }

    /// Stop the bridge loop. It disconnects and releases the scanner before exiting.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn received<T>(rx: Result<oneshot::Receiver<T>, BridgeError>) -> Result<T, BridgeError> {
    rx?.await.map_err(|_| BridgeError::BridgeClosed)
}

async fn flattened<T>(
    rx: Result<oneshot::Receiver<Result<T, BridgeError>>, BridgeError>,
) -> Result<T, BridgeError> {
    received(rx).await?
}
