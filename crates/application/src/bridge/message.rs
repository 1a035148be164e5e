use std::time::Duration;

use domain::{
    ActivityResult, BridgeError, CaptureTarget, DecodeMode, HostContext, PowerNotification,
    PrintJob, ScanRecord, StatusReport,
};
use tokio::sync::oneshot;

use super::actor::BridgeSnapshot;
use crate::events::EventStream;
use crate::lifecycle::{Completion, PendingScan};

pub(crate) type Reply<T> = oneshot::Sender<T>;

/// Caller-issued requests, processed in order by the bridge loop
pub(crate) enum BridgeMessage {
    Connect(Reply<bool>),
    Disconnect(Reply<bool>),
    IsConnected(Reply<bool>),
    CheckStatus(Reply<Result<StatusReport, BridgeError>>),
    Print(PrintJob, Reply<Result<(), BridgeError>>),
    OpenSoftScanner(CaptureTarget, Reply<Result<PendingScan, BridgeError>>),
    OpenHardScanner {
        baud_rate: Option<u32>,
        mode: DecodeMode,
        reply: Reply<Result<(), BridgeError>>,
    },
    CloseScanner(Reply<Result<(), BridgeError>>),
    ReadWithFormat(Duration, Reply<Result<ScanRecord, BridgeError>>),
    Subscribe(Reply<EventStream>),
    Unsubscribe(Reply<()>),
    ActivityResult(ActivityResult, Reply<Result<Completion, BridgeError>>),
    Power(PowerNotification, Reply<bool>),
    Lifecycle(LifecycleEvent, Reply<Option<HostContext>>),
    Snapshot(Reply<BridgeSnapshot>),
}

/// Host lifecycle transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LifecycleEvent {
    Attach(String),
    DetachForConfigChanges,
    Reattach(String),
    Detach,
}

/// Notifications posted by driver callbacks from their own threads
#[derive(Debug)]
pub(crate) enum DriverEvent {
    Scan { generation: u64, payload: Vec<u8> },
    Power(PowerNotification),
    CaptureResult(ActivityResult),
}
