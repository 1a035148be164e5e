pub mod adapter;
pub mod pending;

pub use adapter::{Completion, LifecycleAdapter};
pub use pending::PendingScan;
