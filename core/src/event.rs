//! The session audit log.
//!
//! RULE: every state change of a session is recorded as an event.
//! Events carry only derived, deterministic data so two sessions fed the
//! same input produce identical payloads.

use crate::{cleaner::CleaningReport, stage::Stage, types::SessionId};
use serde::{Deserialize, Serialize};

/// Every event emitted by a session.
/// Variants are added over time: never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    SessionReset {
        discarded_rows: usize,
    },
    DataLoaded {
        rows:         usize,
        matching:     Vec<String>,
        non_matching: Vec<String>,
    },
    DataCleaned {
        report: CleaningReport,
    },
    StageCompleted {
        stage: Stage,
        rows:  usize,
    },
}

impl PipelineEvent {
    /// Stable string name for the `event_type` field of a log entry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SessionReset { .. }   => "session_reset",
            Self::DataLoaded { .. }     => "data_loaded",
            Self::DataCleaned { .. }    => "data_cleaned",
            Self::StageCompleted { .. } => "stage_completed",
        }
    }
}

/// One persisted line of the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub session_id: SessionId,
    pub sequence:   u64,
    pub source:     String,
    pub event_type: String,
    pub payload:    String,
}
