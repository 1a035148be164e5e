//! Infrastructure layer - Peripheral drivers and configuration

pub mod capture;
pub mod config;
pub mod drivers;
pub mod power;
pub mod printer;

pub use config::BridgeConfig;
pub use drivers::{DriverFactory, DriverSet};
