use std::sync::Arc;

use domain::driver::{PowerListener, PowerSource};
use domain::{BatteryState, DriverCode, PowerNotification};
use tracing::{debug, info, warn};

/// Derives the low-battery flag from power notifications while subscribed
pub struct BatteryMonitor {
    source: Box<dyn PowerSource>,
    state: BatteryState,
    active: bool,
}

impl BatteryMonitor {
    pub fn new(source: Box<dyn PowerSource>) -> Self {
        Self {
            source,
            state: BatteryState::default(),
            active: false,
        }
    }

    /// Register for power notifications. No-op when already subscribed.
    pub fn start(&mut self, listener: Arc<dyn PowerListener>) -> Result<(), DriverCode> {
        if self.active {
            debug!("Battery subscription already active");
            return Ok(());
        }

        self.source.register(listener)?;
        self.active = true;
        info!("🔋 Battery subscription started");
        Ok(())
    }

    /// Unregister from power notifications. No-op when not subscribed.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }

        self.source.unregister();
        self.active = false;
        info!("🔋 Battery subscription stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> &BatteryState {
        &self.state
    }

    pub fn is_low(&self) -> bool {
        self.state.is_low()
    }

    /// Apply a notification. Returns false if it was ignored because the
    /// subscription is inactive.
    pub fn handle(&mut self, notification: PowerNotification) -> bool {
        if !self.active {
            debug!(?notification, "Ignoring power notification while unsubscribed");
            return false;
        }

        let was_low = self.state.is_low();
        self.state.apply(&notification);

        match (was_low, self.state.is_low()) {
            (false, true) => warn!(?notification, "🪫 Low battery"),
            (true, false) => info!(?notification, "🔋 Battery recovered"),
            _ => debug!(?notification, low_battery = self.state.is_low(), "Battery notification"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::BatteryStatus;
    use std::sync::Mutex;

    #[derive(Default, Clone)]
    struct CountingSource {
        registered: Arc<Mutex<usize>>,
        unregistered: Arc<Mutex<usize>>,
    }

    impl PowerSource for CountingSource {
        fn register(&mut self, _listener: Arc<dyn PowerListener>) -> Result<(), DriverCode> {
            *self.registered.lock().unwrap() += 1;
            Ok(())
        }

        fn unregister(&mut self) {
            *self.unregistered.lock().unwrap() += 1;
        }
    }

    struct NoopListener;
    impl PowerListener for NoopListener {
        fn on_notification(&self, _notification: PowerNotification) {}
    }

    fn low_notification() -> PowerNotification {
        PowerNotification::BatteryChanged {
            status: BatteryStatus::Discharging,
            level: 10,
            scale: 100,
        }
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let source = CountingSource::default();
        let mut monitor = BatteryMonitor::new(Box::new(source.clone()));

        monitor.start(Arc::new(NoopListener)).unwrap();
        monitor.start(Arc::new(NoopListener)).unwrap();
        assert!(monitor.is_active());
        assert_eq!(*source.registered.lock().unwrap(), 1);

        monitor.stop();
        monitor.stop();
        assert!(!monitor.is_active());
        assert_eq!(*source.unregistered.lock().unwrap(), 1);
    }

    #[test]
    fn test_notifications_ignored_while_inactive() {
        let mut monitor = BatteryMonitor::new(Box::new(CountingSource::default()));

        assert!(!monitor.handle(low_notification()));
        assert!(!monitor.is_low());

        monitor.start(Arc::new(NoopListener)).unwrap();
        assert!(monitor.handle(low_notification()));
        assert!(monitor.is_low());
    }

    #[test]
    fn test_failed_registration_leaves_monitor_inactive() {
        struct FailingSource;
        impl PowerSource for FailingSource {
            fn register(&mut self, _listener: Arc<dyn PowerListener>) -> Result<(), DriverCode> {
                Err(DriverCode(-1))
            }
            fn unregister(&mut self) {}
        }

        let mut monitor = BatteryMonitor::new(Box::new(FailingSource));
        assert_eq!(monitor.start(Arc::new(NoopListener)), Err(DriverCode(-1)));
        assert!(!monitor.is_active());
    }
}
