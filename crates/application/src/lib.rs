//! Application layer - Session and event-bridging use cases

pub mod battery;
pub mod bridge;
pub mod connection;
pub mod events;
pub mod lifecycle;
pub mod messaging;
pub mod printer;
pub mod scanner;

pub use bridge::{Bridge, BridgeDrivers, BridgeHandle, BridgeSettings, BridgeSnapshot};
pub use messaging::command::{Command, CommandError, CommandReply};
