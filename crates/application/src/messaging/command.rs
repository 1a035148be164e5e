use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use domain::{BridgeError, PrintElement};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::bridge::BridgeHandle;

/// A host-issued command, as received over the method channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Command {
    Connect,
    Disconnect,
    IsConnected,
    CheckStatus,
    Print {
        data: Vec<PrintElement>,
    },
    OpenSoftScanner,
    OpenHardScanner {
        #[serde(default = "default_baud_rate", rename = "baudRate")]
        baud_rate: u32,
    },
    CloseScanner,
    OpenScanner,
    ReadWithFormat {
        /// Milliseconds
        timeout: u64,
    },
    StartQrCodeScan,
}

fn default_baud_rate() -> u32 {
    115_200
}

impl Command {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::IsConnected => "isConnected",
            Self::CheckStatus => "checkStatus",
            Self::Print { .. } => "print",
            Self::OpenSoftScanner => "openSoftScanner",
            Self::OpenHardScanner { .. } => "openHardScanner",
            Self::CloseScanner => "closeScanner",
            Self::OpenScanner => "openScanner",
            Self::ReadWithFormat { .. } => "readWithFormat",
            Self::StartQrCodeScan => "startQrCodeScan",
        }
    }

    /// Queue the command on the bridge and return the future of its encoded
    /// result.
    ///
    /// The command is queued before this returns, so commands dispatched one
    /// after another run in that order even if their replies are awaited on
    /// separate tasks. Soft scans resolve only once the matching activity
    /// result arrives.
    pub fn execute(self, bridge: &BridgeHandle) -> CommandReply {
        debug!(method = self.method(), "Executing command");

        match self {
            Self::Connect => value_of(bridge.connect()),
            Self::Disconnect => value_of(bridge.disconnect()),
            Self::IsConnected => value_of(bridge.is_connected()),
            Self::CheckStatus => value_of(bridge.check_status()),
            Self::Print { data } => {
                let count = data.len();
                let printed = bridge.print(data);
                Box::pin(async move {
                    printed.await?;
                    info!(elements = count, "🖨️ Print job completed");
                    Ok(json!(true))
                })
            }
            Self::OpenSoftScanner => {
                let opened = bridge.open_soft_scanner();
                value_of(async move { opened.await?.await })
            }
            Self::StartQrCodeScan => {
                let opened = bridge.start_qr_code_scan();
                value_of(async move { opened.await?.await })
            }
            Self::OpenHardScanner { baud_rate } => done(bridge.open_hard_scanner(Some(baud_rate))),
            Self::CloseScanner => done(bridge.close_scanner()),
            Self::OpenScanner => done(bridge.open_scanner()),
            Self::ReadWithFormat { timeout } => {
                value_of(bridge.read_with_format(Duration::from_millis(timeout)))
            }
        }
    }
}

/// Encoded result of a dispatched [`Command`]
pub type CommandReply = Pin<Box<dyn Future<Output = Result<Value, BridgeError>> + Send>>;

fn value_of<T, F>(reply: F) -> CommandReply
where
    T: Serialize,
    F: Future<Output = Result<T, BridgeError>> + Send + 'static,
{
    Box::pin(async move { Ok(json!(reply.await?)) })
}

fn done<F>(reply: F) -> CommandReply
where
    F: Future<Output = Result<(), BridgeError>> + Send + 'static,
{
    Box::pin(async move {
        reply.await?;
        Ok(json!(true))
    })
}

impl BridgeHandle {
    pub fn execute(&self, command: Command) -> CommandReply {
        command.execute(self)
    }
}

/// Error code/message pair reported for a failed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
}

impl From<&BridgeError> for CommandError {
    fn from(error: &BridgeError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}
