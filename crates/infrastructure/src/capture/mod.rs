use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;

use domain::driver::{CaptureLauncher, CaptureResultListener};
use domain::{ActivityResult, CaptureRequest, CaptureTarget, Disposition, LaunchError};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs an external capture program for every soft scan.
///
/// The program gets the request code and target in `BRIDGE_REQUEST_CODE`
/// and `BRIDGE_CAPTURE_TARGET`. A zero exit with a non-empty first stdout
/// line is a successful scan; anything else is a cancelled one.
pub struct ProcessCaptureLauncher {
    command: String,
    args: Vec<String>,
}

impl ProcessCaptureLauncher {
    pub fn new(command: String, args: Vec<String>) -> Self {
        Self { command, args }
    }
}

fn target_name(target: CaptureTarget) -> &'static str {
    match target {
        CaptureTarget::Barcode => "barcode",
        CaptureTarget::QrCode => "qrcode",
    }
}

/// Turn the capture program's exit status and stdout into a result
pub(crate) fn to_activity_result(request_code: i32, success: bool, stdout: &[u8]) -> ActivityResult {
    let payload = String::from_utf8_lossy(stdout)
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string);

    match (success, payload) {
        (true, Some(payload)) => ActivityResult {
            request_code,
            disposition: Disposition::Ok,
            payload: Some(payload),
        },
        _ => ActivityResult {
            request_code,
            disposition: Disposition::Canceled,
            payload: None,
        },
    }
}

impl CaptureLauncher for ProcessCaptureLauncher {
    fn launch(
        &self,
        request: CaptureRequest,
        listener: Arc<dyn CaptureResultListener>,
    ) -> Result<(), LaunchError> {
        let request_code = request.request_code;
        let child = Command::new(&self.command)
            .args(&self.args)
            .env("BRIDGE_REQUEST_CODE", request_code.to_string())
            .env("BRIDGE_CAPTURE_TARGET", target_name(request.target))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => LaunchError::NotFound,
                _ => LaunchError::Failed(e.to_string()),
            })?;

        info!(request_code, command = %self.command, "Capture program started");

        tokio::spawn(async move {
            let result = match child.wait_with_output().await {
                Ok(output) => to_activity_result(request_code, output.status.success(), &output.stdout),
                Err(e) => {
                    warn!(request_code, error = %e, "Capture program failed");
                    to_activity_result(request_code, false, &[])
                }
            };
            debug!(request_code, disposition = ?result.disposition, "Capture program finished");
            listener.on_result(result);
        });
        Ok(())
    }
}

/// Used when no capture program is configured
pub struct UnavailableCaptureLauncher;

impl CaptureLauncher for UnavailableCaptureLauncher {
    fn launch(
        &self,
        request: CaptureRequest,
        _listener: Arc<dyn CaptureResultListener>,
    ) -> Result<(), LaunchError> {
        debug!(request_code = request.request_code, "No capture program configured");
        Err(LaunchError::NotFound)
    }
}
