//! JSON-lines host channel.
//!
//! Each input line is either a method call `{"id":1,"method":"connect"}` or a
//! host notification `{"notify":{"kind":"attach","name":"main"}}`. Calls are
//! answered with `{"id":1,"result":…}` or `{"id":1,"error":{"code":…,"message":…}}`;
//! scan events are written as `{"event":"scan","data":…,"timestamp":…}`.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use application::{BridgeHandle, Command, CommandError};
use chrono::SecondsFormat;
use domain::{ActivityResult, BatteryStatus, BridgeError, PowerNotification, ScanEvent};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Lifecycle and platform notifications pushed by the host
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HostNotification {
    Attach {
        name: String,
    },
    DetachForConfigChanges,
    Reattach {
        name: String,
    },
    Detach,
    ActivityResult(ActivityResult),
    BatteryChanged {
        status: BatteryStatus,
        level: i32,
        scale: i32,
    },
    CapacityEvent {
        #[serde(rename = "eventStatus")]
        event_status: i32,
        level: i32,
    },
}

impl HostNotification {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Attach { .. } => "attach",
            Self::DetachForConfigChanges => "detachForConfigChanges",
            Self::Reattach { .. } => "reattach",
            Self::Detach => "detach",
            Self::ActivityResult(_) => "activityResult",
            Self::BatteryChanged { .. } => "batteryChanged",
            Self::CapacityEvent { .. } => "capacityEvent",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    Call { id: Value, command: Command },
    Notify(HostNotification),
}

/// A line that could not be understood. Carries the call id when one was found.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRequest {
    pub id: Value,
    pub message: String,
}

pub fn parse_line(line: &str) -> Result<HostMessage, InvalidRequest> {
    let invalid = |id: Value, message: String| InvalidRequest { id, message };

    let mut value: Value =
        serde_json::from_str(line).map_err(|e| invalid(Value::Null, e.to_string()))?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| invalid(Value::Null, "expected a JSON object".to_string()))?;

    if let Some(notify) = object.remove("notify") {
        return serde_json::from_value(notify)
            .map(HostMessage::Notify)
            .map_err(|e| invalid(Value::Null, e.to_string()));
    }

    let id = object
        .remove("id")
        .ok_or_else(|| invalid(Value::Null, "missing id".to_string()))?;
    match serde_json::from_value(value) {
        Ok(command) => Ok(HostMessage::Call { id, command }),
        Err(e) => Err(invalid(id, e.to_string())),
    }
}

pub fn success_line(id: &Value, result: Value) -> String {
    json!({ "id": id, "result": result }).to_string()
}

pub fn error_line(id: &Value, error: CommandError) -> String {
    json!({ "id": id, "error": error }).to_string()
}

pub fn event_line(event: &ScanEvent) -> String {
    json!({
        "event": "scan",
        "data": event.text(),
        "timestamp": event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
    .to_string()
}

/// Serve the host channel until `reader` reaches end of input, then shut the
/// bridge down and flush every outstanding response.
///
/// Lines are queued on the bridge in the order they are read, so calls and
/// notifications take effect in input order. Only the waits for replies run
/// concurrently.
pub async fn serve<R, W>(bridge: BridgeHandle, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let mut events = bridge.subscribe().await?;
    let event_tx = out_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if event_tx.send(event_line(&event)).is_err() {
                break;
            }
        }
    });

    let mut lines = reader.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => handle_line(&bridge, &out_tx, &line),
                None => {
                    info!("Host channel closed");
                    break;
                }
            },
            Some(output) = out_rx.recv() => {
                write_line(&mut writer, &output).await?;
            }
        }
    }

    // Everything read so far is already queued; the bridge runs it before stopping
    drop(out_tx);
    bridge.shutdown();
    while let Some(output) = out_rx.recv().await {
        write_line(&mut writer, &output).await?;
    }
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

fn handle_line(bridge: &BridgeHandle, out: &mpsc::UnboundedSender<String>, line: &str) {
    match parse_line(line) {
        Ok(HostMessage::Call { id, command }) => {
            debug!(%id, method = command.method(), "Host call");
            let reply = bridge.execute(command);
            let out = out.clone();
            tokio::spawn(async move {
                let line = match reply.await {
                    Ok(result) => success_line(&id, result),
                    Err(e) => error_line(&id, CommandError::from(&e)),
                };
                let _ = out.send(line);
            });
        }
        Ok(HostMessage::Notify(notification)) => notify(bridge, notification),
        Err(InvalidRequest { id, message }) => {
            warn!(%message, "Invalid host request");
            let error = CommandError {
                code: "INVALID_REQUEST".to_string(),
                message,
            };
            let _ = out.send(error_line(&id, error));
        }
    }
}

fn notify(bridge: &BridgeHandle, notification: HostNotification) {
    let kind = notification.kind();
    let applied: Pin<Box<dyn Future<Output = Result<(), BridgeError>> + Send>> = match notification {
        HostNotification::Attach { name } => Box::pin(discard(bridge.attach(name))),
        HostNotification::Reattach { name } => Box::pin(discard(bridge.reattach(name))),
        HostNotification::DetachForConfigChanges => Box::pin(bridge.detach_for_config_changes()),
        HostNotification::Detach => Box::pin(bridge.detach()),
        HostNotification::ActivityResult(result) => {
            Box::pin(discard(bridge.deliver_activity_result(result)))
        }
        HostNotification::BatteryChanged {
            status,
            level,
            scale,
        } => Box::pin(discard(bridge.report_power(PowerNotification::BatteryChanged {
            status,
            level,
            scale,
        }))),
        HostNotification::CapacityEvent {
            event_status,
            level,
        } => Box::pin(discard(bridge.report_power(PowerNotification::CapacityEvent {
            event_status,
            level,
        }))),
    };

    tokio::spawn(async move {
        if let Err(e) = applied.await {
            warn!(kind, error = %e, "Host notification not applied");
        }
    });
}

async fn discard<T>(reply: impl Future<Output = Result<T, BridgeError>>) -> Result<(), BridgeError> {
    reply.await.map(|_| ())
}
