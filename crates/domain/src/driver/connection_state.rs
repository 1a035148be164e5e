use serde::{Deserialize, Serialize};

/// Whether the printer session is open.
///
/// Connected implies the battery subscription is registered; the two always
/// change together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Closing always lands in Disconnected, even when the driver close fails
    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }
}
