use std::sync::Arc;

use domain::driver::{PowerListener, PrinterDriver};
use domain::{BatteryState, BridgeError, ConnectionState, StatusReport};
use tracing::{debug, error, info, warn};

use crate::battery::BatteryMonitor;

/// Owns the printer session and its connection state.
///
/// Driver failures on open/close are reported through the boolean result,
/// never retried here.
pub struct ConnectionManager {
    printer: Box<dyn PrinterDriver>,
    state: ConnectionState,
}

impl ConnectionManager {
    pub fn new(printer: Box<dyn PrinterDriver>) -> Self {
        Self {
            printer,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Register the battery subscription, then open the printer session.
    /// Returns whether the bridge is now connected.
    pub async fn connect(
        &mut self,
        battery: &mut BatteryMonitor,
        listener: Arc<dyn PowerListener>,
    ) -> bool {
        if !self.state.can_connect() {
            debug!("Connect requested while already connected");
            return true;
        }

        if let Err(e) = battery.start(listener) {
            warn!(error = %e, "Failed to register battery subscription");
            return false;
        }

        match self.printer.open().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!("🖨️ Printer connected");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to open printer session");
                battery.stop();
                false
            }
        }
    }

    /// Unregister the battery subscription, close the printer session and
    /// transition to Disconnected. Returns whether the close succeeded.
    pub async fn disconnect(&mut self, battery: &mut BatteryMonitor) -> bool {
        if !self.state.is_connected() {
            debug!("Disconnect requested while already disconnected");
            return true;
        }

        battery.stop();
        let closed = match self.printer.close().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Error closing printer session");
                false
            }
        };
        self.state = self.state.to_disconnected();

        info!(closed, "🖨️ Printer disconnected");
        closed
    }

    /// Query the printer for device status and fold in the battery flag
    pub async fn check_status(&mut self, battery: &BatteryState) -> Result<StatusReport, BridgeError> {
        if !self.state.is_connected() {
            return Err(BridgeError::DeviceUnavailable);
        }

        let status = self.printer.check_status().await?;
        Ok(StatusReport {
            status,
            low_battery: battery.is_low(),
        })
    }

    /// The printer driver, available only while connected
    pub fn printer_mut(&mut self) -> Option<&mut dyn PrinterDriver> {
        if self.state.is_connected() {
            Some(self.printer.as_mut())
        } else {
            None
        }
    }
}
