//! Driver-facing listeners. Each one only posts into the bridge inbox, so
//! no driver thread ever touches session state.

use domain::driver::{CaptureResultListener, PowerListener, ScanListener};
use domain::{ActivityResult, PowerNotification};
use tokio::sync::mpsc;
use tracing::trace;

use super::message::DriverEvent;

pub(crate) struct InboxScanListener {
    pub(crate) generation: u64,
    pub(crate) inbox: mpsc::UnboundedSender<DriverEvent>,
}

impl ScanListener for InboxScanListener {
    fn on_data(&self, data: Vec<u8>) {
        let event = DriverEvent::Scan {
            generation: self.generation,
            payload: data,
        };
        if self.inbox.send(event).is_err() {
            trace!("Bridge stopped, dropping scan payload");
        }
    }
}

pub(crate) struct InboxPowerListener {
    pub(crate) inbox: mpsc::UnboundedSender<DriverEvent>,
}

impl PowerListener for InboxPowerListener {
    fn on_notification(&self, notification: PowerNotification) {
        if self.inbox.send(DriverEvent::Power(notification)).is_err() {
            trace!("Bridge stopped, dropping power notification");
        }
    }
}

pub(crate) struct InboxCaptureListener {
    pub(crate) inbox: mpsc::UnboundedSender<DriverEvent>,
}

impl CaptureResultListener for InboxCaptureListener {
    fn on_result(&self, result: ActivityResult) {
        if self.inbox.send(DriverEvent::CaptureResult(result)).is_err() {
            trace!("Bridge stopped, dropping capture result");
        }
    }
}
