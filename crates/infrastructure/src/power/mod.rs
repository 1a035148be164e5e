mod sysfs;

pub use sysfs::SysfsPowerSource;

use std::sync::Arc;

use domain::DriverCode;
use domain::driver::{PowerListener, PowerSource};
use tracing::debug;

/// Power source for platforms without a readable battery. Notifications
/// arrive from the host through the bridge's command queue instead, so this
/// only tracks whether the subscription is registered.
#[derive(Default)]
pub struct ManualPowerSource {
    registered: bool,
}

impl ManualPowerSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl PowerSource for ManualPowerSource {
    fn register(&mut self, _listener: Arc<dyn PowerListener>) -> Result<(), DriverCode> {
        debug!("Battery notifications expected from the host");
        self.registered = true;
        Ok(())
    }

    fn unregister(&mut self) {
        self.registered = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::PowerNotification;

    struct Ignore;

    impl PowerListener for Ignore {
        fn on_notification(&self, _notification: PowerNotification) {}
    }

    #[test]
    fn test_registration_is_tracked() {
        let mut source = ManualPowerSource::new();
        assert!(!source.is_registered());

        source.register(Arc::new(Ignore)).unwrap();
        assert!(source.is_registered());

        source.unregister();
        assert!(!source.is_registered());
    }
}
