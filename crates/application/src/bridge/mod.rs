mod actor;
mod handle;
mod listeners;
mod message;

pub use actor::{Bridge, BridgeDrivers, BridgeSettings, BridgeSnapshot};
pub use handle::BridgeHandle;
