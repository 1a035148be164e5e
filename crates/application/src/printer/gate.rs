use domain::{BatteryState, BridgeError, PrintJob};
use tracing::{error, info, warn};

use crate::connection::ConnectionManager;

/// Admits print jobs only while the battery is not low.
///
/// The battery check and the send are not atomic: a job may be admitted just
/// before a low-battery notification lands.
#[derive(Debug, Default)]
pub struct PrintAdmissionGate {
    admitted: u64,
    rejected: u64,
}

impl PrintAdmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submit(
        &mut self,
        connection: &mut ConnectionManager,
        battery: &BatteryState,
        job: &PrintJob,
    ) -> Result<(), BridgeError> {
        if battery.is_low() {
            self.rejected += 1;
            warn!(job_id = %job.id, "Print job rejected: low battery");
            return Err(BridgeError::LowBattery);
        }

        let printer = connection
            .printer_mut()
            .ok_or(BridgeError::DeviceUnavailable)?;

        self.admitted += 1;
        match printer.print(job).await {
            Ok(()) => {
                info!(job_id = %job.id, elements = job.elements.len(), "✅ Print job sent");
                Ok(())
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "❌ Print job failed");
                Err(BridgeError::Printer(e))
            }
        }
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}
