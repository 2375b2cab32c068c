//! Audit trail for data-key requests.
//!
//! Every request is recorded, granted or not. Entries carry who asked and
//! why they were refused; they never carry key material. The in-memory
//! trail keeps the most recent [`TRAIL_CAPACITY`] entries; sinks see all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Entries kept in memory before the oldest are dropped.
pub const TRAIL_CAPACITY: usize = 1_000;

/// One recorded request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub event: AuditEvent,
    /// Caller uid, or `anonymous`.
    pub user_id: String,
    pub outcome: AuditOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    KeyIssued,
    KeyDenied { reason: String },
}

/// `Denied` is a policy refusal; `Failure` is a backend or setup fault.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

/// Where entries are written besides the in-memory trail.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Writes each entry as a structured `tracing` event.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        match &entry.event {
            AuditEvent::KeyIssued => {
                tracing::info!(user_id = %entry.user_id, outcome = ?entry.outcome, "audit: data key issued");
            }
            AuditEvent::KeyDenied { reason } => {
                tracing::warn!(user_id = %entry.user_id, outcome = ?entry.outcome, reason = %reason, "audit: data key refused");
            }
        }
    }
}

#[derive(Default)]
pub struct AuditLogger {
    trail: Mutex<VecDeque<AuditEntry>>,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entries", &self.count())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl AuditLogger {
    /// In-memory trail only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            trail: Mutex::default(),
            sinks,
        }
    }

    /// Trail plus a [`TracingSink`].
    pub fn tracing() -> Self {
        Self::with_sinks(vec![Box::new(TracingSink)])
    }

    fn trail(&self) -> MutexGuard<'_, VecDeque<AuditEntry>> {
        self.trail.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn log(&self, event: AuditEvent, user_id: &str, outcome: AuditOutcome) {
        let entry = AuditEntry {
            at: Utc::now(),
            event,
            user_id: user_id.to_string(),
            outcome,
        };
        for sink in &self.sinks {
            sink.record(&entry);
        }
        let mut trail = self.trail();
        if trail.len() == TRAIL_CAPACITY {
            trail.pop_front();
        }
        trail.push_back(entry);
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.trail().iter().cloned().collect()
    }

    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.trail()
            .iter()
            .filter(|e| e.outcome == *outcome)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.trail().len()
    }
}
