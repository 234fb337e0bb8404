use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a foreground execution context (an isolate, an event
/// loop, ...). Owned by the embedder; the scheduler only uses it as the key of
/// a per-context ordering domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextRef(Uuid);

impl ContextRef {
    /// Mint a fresh random context reference (UUIDv4).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContextRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ContextRef {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Advisory hint about how long a background task is expected to run.
///
/// Never used for ordering; it is logged and counted for instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedRuntime {
    #[default]
    Short,
    Long,
}

impl fmt::Display for ExpectedRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExpectedRuntime::Short => "short",
            ExpectedRuntime::Long => "long",
        };
        write!(f, "{s}")
    }
}
