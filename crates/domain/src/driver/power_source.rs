use std::sync::Arc;

use crate::battery::PowerNotification;
use crate::error::DriverCode;

/// Receives power-status notifications
pub trait PowerListener: Send + Sync {
    fn on_notification(&self, notification: PowerNotification);
}

/// Platform source of battery and vendor capacity notifications
pub trait PowerSource: Send + Sync {
    /// Start delivering notifications to `listener`
    fn register(&mut self, listener: Arc<dyn PowerListener>) -> Result<(), DriverCode>;

    /// Stop delivering notifications
    fn unregister(&mut self);
}
