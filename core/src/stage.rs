//! Stage tracking and the table-stage trait.
//!
//! RULE: every stage declares exactly one prerequisite.
//! The tracker refuses a stage whose prerequisite has not completed;
//! a fresh load wipes every completed stage.

use crate::{
    config::PipelineConfig,
    error::{PipelineError, PipelineResult},
    table::FeatureTable,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loaded,
    Cleaned,
    CustomerFeatures,
    TransactionFeatures,
    RiskScored,
    Flagged,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Loaded,
        Stage::Cleaned,
        Stage::CustomerFeatures,
        Stage::TransactionFeatures,
        Stage::RiskScored,
        Stage::Flagged,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Loaded              => "loaded",
            Self::Cleaned             => "cleaned",
            Self::CustomerFeatures    => "customer_features",
            Self::TransactionFeatures => "transaction_features",
            Self::RiskScored          => "risk_scored",
            Self::Flagged             => "flagged",
        }
    }

    /// The stage that must have completed before this one may run.
    pub fn prerequisite(&self) -> Option<Stage> {
        match self {
            Self::Loaded              => None,
            Self::Cleaned             => Some(Self::Loaded),
            Self::CustomerFeatures    => Some(Self::Cleaned),
            Self::TransactionFeatures => Some(Self::CustomerFeatures),
            Self::RiskScored          => Some(Self::CustomerFeatures),
            Self::Flagged             => Some(Self::TransactionFeatures),
        }
    }

    /// Scoring stages recompute from scratch and may be re-run.
    pub fn is_repeatable(&self) -> bool {
        matches!(self, Self::Loaded | Self::RiskScored | Self::Flagged)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of completed stages for the current table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTracker {
    completed: BTreeSet<Stage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    pub fn completed(&self) -> impl Iterator<Item = Stage> + '_ {
        self.completed.iter().copied()
    }

    /// Validate that `stage` may run now.
    pub fn check(&self, stage: Stage) -> PipelineResult<()> {
        if let Some(requires) = stage.prerequisite() {
            if !self.is_completed(requires) {
                return Err(PipelineError::StageOutOfOrder { stage, requires });
            }
        }
        if !stage.is_repeatable() && self.is_completed(stage) {
            return Err(PipelineError::StageAlreadyCompleted { stage });
        }
        Ok(())
    }

    /// Record a completed stage. Callers must `check` first.
    pub fn complete(&mut self, stage: Stage) {
        self.completed.insert(stage);
    }

    /// Start over with a freshly loaded table.
    pub fn reset_loaded(&mut self) {
        self.completed.clear();
        self.completed.insert(Stage::Loaded);
    }

    pub fn clear(&mut self) {
        self.completed.clear();
    }
}

/// A pure table-in/table-out stage.
pub trait TableStage: Send {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// Which completion marker this stage sets.
    fn stage(&self) -> Stage;

    /// Return `table` plus this stage's column group. Never mutates input.
    fn apply(&self, table: &FeatureTable, config: &PipelineConfig) -> PipelineResult<FeatureTable>;
}
