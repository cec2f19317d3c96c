//! Identifier and timestamp sources.
//!
//! Transformers never read the clock or generate random ids themselves; they ask an
//! [`IdSource`]. Production code uses [`SystemIds`], tests use [`FixedIds`].

use std::time::{SystemTime, UNIX_EPOCH};

pub trait IdSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;

    /// A fresh completion id (`chatcmpl-...`).
    fn completion_id(&self) -> String;
}

/// Wall clock plus random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIds;

impl IdSource for SystemIds {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn completion_id(&self) -> String {
        format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
    }
}

/// Deterministic source for tests and replay.
#[derive(Debug, Clone)]
pub struct FixedIds {
    pub millis: u64,
    pub id: String,
}

impl FixedIds {
    pub fn new(millis: u64, id: impl Into<String>) -> Self {
        Self {
            millis,
            id: id.into(),
        }
    }
}

impl IdSource for FixedIds {
    fn now_millis(&self) -> u64 {
        self.millis
    }

    fn completion_id(&self) -> String {
        self.id.clone()
    }
}

/// Tool call id derived from a timestamp and the call's position in its response.
pub fn tool_call_id(millis: u64, index: usize) -> String {
    format!("call_{millis}_{index}")
}
