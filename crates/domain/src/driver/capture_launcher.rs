use std::sync::Arc;

use crate::error::LaunchError;
use crate::scan::{ActivityResult, CaptureRequest};

/// Receives foreground capture completions
pub trait CaptureResultListener: Send + Sync {
    fn on_result(&self, result: ActivityResult);
}

/// Launches the host's foreground capture activity
pub trait CaptureLauncher: Send + Sync {
    /// Start a capture. The result arrives later through `listener`
    /// (or through the host's own activity-result path), keyed by
    /// `request.request_code`.
    fn launch(
        &self,
        request: CaptureRequest,
        listener: Arc<dyn CaptureResultListener>,
    ) -> Result<(), LaunchError>;
}
