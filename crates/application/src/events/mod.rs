pub mod bridge;
pub use bridge::{EventBridge, EventStream};
