use serde::{Deserialize, Serialize};

/// Charging status carried by a generic battery-changed notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatteryStatus {
    Unknown,
    Charging,
    Discharging,
    NotCharging,
    Full,
}

impl BatteryStatus {
    /// Map the platform's numeric status code (1..=5)
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => Self::Charging,
            3 => Self::Discharging,
            4 => Self::NotCharging,
            5 => Self::Full,
            _ => Self::Unknown,
        }
    }
}

/// Power-status notifications the bridge subscribes to while connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PowerNotification {
    /// Generic battery-status broadcast
    BatteryChanged {
        status: BatteryStatus,
        level: i32,
        scale: i32,
    },
    /// Vendor-specific capacity event
    CapacityEvent {
        #[serde(rename = "eventStatus")]
        event_status: i32,
        level: i32,
    },
}

/// Process-wide low-battery flag, recomputed from scratch on every notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryState {
    low_battery: bool,
}

impl BatteryState {
    pub fn is_low(&self) -> bool {
        self.low_battery
    }

    /// Apply a notification. Last write wins across both sources.
    ///
    /// A charging battery-changed notification leaves the flag untouched, so a
    /// flag raised earlier stays raised until a non-charging or vendor event
    /// recomputes it.
    pub fn apply(&mut self, notification: &PowerNotification) {
        match *notification {
            PowerNotification::BatteryChanged {
                status,
                level,
                scale,
            } => {
                if status != BatteryStatus::Charging {
                    self.low_battery = i64::from(level) * 5 <= i64::from(scale);
                }
            }
            PowerNotification::CapacityEvent {
                event_status,
                level,
            } => {
                self.low_battery = event_status == 0 && level < 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(status: BatteryStatus, level: i32, scale: i32) -> PowerNotification {
        PowerNotification::BatteryChanged {
            status,
            level,
            scale,
        }
    }

    #[test]
    fn test_initial_state_is_not_low() {
        assert!(!BatteryState::default().is_low());
    }

    #[test]
    fn test_threshold_is_twenty_percent_inclusive() {
        let mut state = BatteryState::default();

        state.apply(&changed(BatteryStatus::Discharging, 20, 100));
        assert!(state.is_low());

        state.apply(&changed(BatteryStatus::Discharging, 21, 100));
        assert!(!state.is_low());

        state.apply(&changed(BatteryStatus::NotCharging, 3, 15));
        assert!(state.is_low());
    }

    #[test]
    fn test_charging_leaves_flag_unchanged() {
        let mut state = BatteryState::default();
        state.apply(&changed(BatteryStatus::Discharging, 5, 100));
        assert!(state.is_low());

        state.apply(&changed(BatteryStatus::Charging, 90, 100));
        assert!(state.is_low(), "charging must not clear the flag");

        let mut fresh = BatteryState::default();
        fresh.apply(&changed(BatteryStatus::Charging, 1, 100));
        assert!(!fresh.is_low(), "charging must not raise the flag either");
    }

    #[test]
    fn test_capacity_event() {
        let mut state = BatteryState::default();

        state.apply(&PowerNotification::CapacityEvent {
            event_status: 0,
            level: 0,
        });
        assert!(state.is_low());

        state.apply(&PowerNotification::CapacityEvent {
            event_status: 0,
            level: 1,
        });
        assert!(!state.is_low());

        state.apply(&PowerNotification::CapacityEvent {
            event_status: 0,
            level: 0,
        });
        state.apply(&PowerNotification::CapacityEvent {
            event_status: 1,
            level: 0,
        });
        assert!(!state.is_low());
    }

    #[test]
    fn test_last_write_wins_across_sources() {
        let mut state = BatteryState::default();
        state.apply(&changed(BatteryStatus::Discharging, 10, 100));
        state.apply(&PowerNotification::CapacityEvent {
            event_status: 1,
            level: 0,
        });
        assert!(!state.is_low());
    }

    #[test]
    fn test_status_from_code() {
        assert_eq!(BatteryStatus::from_code(2), BatteryStatus::Charging);
        assert_eq!(BatteryStatus::from_code(4), BatteryStatus::NotCharging);
        assert_eq!(BatteryStatus::from_code(42), BatteryStatus::Unknown);
    }
}
