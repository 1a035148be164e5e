use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use domain::driver::{PowerListener, PowerSource};
use domain::{BatteryStatus, DriverCode, PowerNotification};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::drivers::ERR_OPEN_FAILED;

const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls a Linux power-supply node and reports it as battery-changed
/// notifications with a scale of 100
pub struct SysfsPowerSource {
    dir: PathBuf,
    interval: Duration,
    cancel_token: Option<CancellationToken>,
}

impl SysfsPowerSource {
    pub fn new(supply: &str, interval: Duration) -> Self {
        Self::at(Path::new(POWER_SUPPLY_ROOT).join(supply), interval)
    }

    /// A zero interval is raised to one millisecond
    pub fn at(dir: PathBuf, interval: Duration) -> Self {
        Self {
            dir,
            interval: interval.max(MIN_POLL_INTERVAL),
            cancel_token: None,
        }
    }
}

fn parse_status(raw: &str) -> BatteryStatus {
    match raw.trim() {
        "Charging" => BatteryStatus::Charging,
        "Discharging" => BatteryStatus::Discharging,
        "Not charging" => BatteryStatus::NotCharging,
        "Full" => BatteryStatus::Full,
        _ => BatteryStatus::Unknown,
    }
}

pub(crate) async fn read_notification(dir: &Path) -> std::io::Result<PowerNotification> {
    let capacity = tokio::fs::read_to_string(dir.join("capacity")).await?;
    let status = tokio::fs::read_to_string(dir.join("status")).await?;
    let level = capacity
        .trim()
        .parse::<i32>()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(PowerNotification::BatteryChanged {
        status: parse_status(&status),
        level,
        scale: 100,
    })
}

impl PowerSource for SysfsPowerSource {
    fn register(&mut self, listener: Arc<dyn PowerListener>) -> Result<(), DriverCode> {
        if !self.dir.is_dir() {
            warn!(path = ?self.dir, "Power supply not found");
            return Err(DriverCode(ERR_OPEN_FAILED));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| DriverCode(ERR_OPEN_FAILED))?;

        self.unregister();
        let token = CancellationToken::new();
        let cancel = token.clone();
        let dir = self.dir.clone();
        let period = self.interval;

        runtime.spawn(async move {
            let mut timer = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => match read_notification(&dir).await {
                        Ok(notification) => listener.on_notification(notification),
                        Err(e) => warn!(path = ?dir, error = %e, "Failed to read power supply"),
                    }
                }
            }
        });

        self.cancel_token = Some(token);
        info!(path = ?self.dir, interval = ?self.interval, "Polling power supply");
        Ok(())
    }

    fn unregister(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

impl Drop for SysfsPowerSource {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tokio::sync::mpsc;

    struct Forward(mpsc::UnboundedSender<PowerNotification>);

    impl PowerListener for Forward {
        fn on_notification(&self, notification: PowerNotification) {
            let _ = self.0.send(notification);
        }
    }

    fn fake_supply(name: &str, capacity: &str, status: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bridge-supply-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("capacity"), capacity).unwrap();
        fs::write(dir.join("status"), status).unwrap();
        dir
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("Charging\n"), BatteryStatus::Charging);
        assert_eq!(parse_status("Not charging\n"), BatteryStatus::NotCharging);
        assert_eq!(parse_status("weird"), BatteryStatus::Unknown);
    }

    #[tokio::test]
    async fn test_read_notification() {
        let dir = fake_supply("read", "17\n", "Discharging\n");
        let notification = read_notification(&dir).await.unwrap();
        assert_eq!(
            notification,
            PowerNotification::BatteryChanged {
                status: BatteryStatus::Discharging,
                level: 17,
                scale: 100,
            }
        );
        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_register_polls_until_unregistered() {
        let dir = fake_supply("poll", "55\n", "Full\n");
        let mut source = SysfsPowerSource::at(dir.clone(), Duration::from_millis(10));
        let (tx, mut rx) = mpsc::unbounded_channel();

        source.register(Arc::new(Forward(tx))).unwrap();
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, PowerNotification::BatteryChanged { level: 55, .. }));

        source.unregister();
        // The polling task drops its listener once cancelled
        while rx.recv().await.is_some() {}
        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_zero_interval_still_polls() {
        let dir = fake_supply("zero", "80\n", "Charging\n");
        let mut source = SysfsPowerSource::at(dir.clone(), Duration::ZERO);
        let (tx, mut rx) = mpsc::unbounded_channel();

        source.register(Arc::new(Forward(tx))).unwrap();
        let first = rx.recv().await.expect("polling task should survive a zero interval");
        assert!(matches!(first, PowerNotification::BatteryChanged { level: 80, .. }));

        source.unregister();
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_supply_fails_registration() {
        let mut source = SysfsPowerSource::new("NO_SUCH_BATTERY", Duration::from_secs(1));
        let (tx, _rx) = mpsc::unbounded_channel();
        assert_eq!(
            source.register(Arc::new(Forward(tx))),
            Err(DriverCode(ERR_OPEN_FAILED))
        );
    }
}
