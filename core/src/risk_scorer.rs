//! Customer risk scorer.
//!
//! risk_score = mean of |z| over {daily velocity, weekly count, weekly
//! average amount}, each standardized against the whole current table.
//! Features whose z-score is undefined (zero variance, non-finite input)
//! drop out of that row's mean; if none remain the score is missing.
//!
//! Classes are half-open bands: [-inf, medium) low, [medium, high) medium,
//! [high, critical) high, [critical, inf) critical.

use crate::{
    config::{PipelineConfig, RiskBands},
    customer_features::CustomerFeatures,
    error::PipelineResult,
    stage::{Stage, TableStage},
    stats::{abs_zscores, mean_defined},
    table::FeatureTable,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskClass {
    pub const ALL: [RiskClass; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn from_score(score: f64, bands: &RiskBands) -> Self {
        if score >= bands.critical {
            Self::Critical
        } else if score >= bands.high {
            Self::High
        } else if score >= bands.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low      => "low",
            Self::Medium   => "medium",
            Self::High     => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: Option<f64>,
    pub risk_class: Option<RiskClass>,
}

/// Names of the standardized features, in column order.
pub const RISK_FEATURES: [&str; 3] = [
    "daily_tx_velocity",
    "weekly_tx_count_sender",
    "weekly_avg_amount_sender",
];

fn feature_columns(customer: &[CustomerFeatures]) -> [Vec<f64>; 3] {
    [
        customer.iter().map(|c| c.daily_tx_velocity).collect(),
        customer.iter().map(|c| c.weekly_tx_count as f64).collect(),
        customer.iter().map(|c| c.weekly_avg_amount).collect(),
    ]
}

pub fn score(customer: &[CustomerFeatures], bands: &RiskBands) -> Vec<RiskAssessment> {
    let columns = feature_columns(customer);
    let z: Vec<Vec<Option<f64>>> = columns
        .iter()
        .zip(RISK_FEATURES)
        .map(|(col, name)| {
            let z = abs_zscores(col);
            if !col.is_empty() && z.iter().all(Option::is_none) {
                log::warn!("risk feature '{name}' has zero variance; excluded from scores");
            }
            z
        })
        .collect();

    (0..customer.len())
        .map(|row| {
            let risk_score = mean_defined(&[z[0][row], z[1][row], z[2][row]]);
            RiskAssessment {
                risk_score,
                risk_class: risk_score.map(|s| RiskClass::from_score(s, bands)),
            }
        })
        .collect()
}

pub struct RiskScorer;

impl TableStage for RiskScorer {
    fn name(&self) -> &'static str {
        "risk_scorer"
    }

    fn stage(&self) -> Stage {
        Stage::RiskScored
    }

    fn apply(&self, table: &FeatureTable, config: &PipelineConfig) -> PipelineResult<FeatureTable> {
        let customer = table.require_customer(self.name())?;
        let assessments = score(customer, &config.risk_bands);
        let unscored = assessments.iter().filter(|a| a.risk_score.is_none()).count();
        log::info!(
            "Risk scored {} rows ({} without a defined score)",
            assessments.len(),
            unscored
        );
        table.with_risk(assessments)
    }
}
