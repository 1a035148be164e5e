use serde::{Deserialize, Serialize};

/// Generation number of a foreground execution context.
/// Every attach or reattach produces a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u64);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Identity of the host's current foreground context (the "activity")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostContext {
    pub id: ContextId,
    pub name: String,
}

impl HostContext {
    pub fn new(id: ContextId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
