//! Transaction flagger.
//!
//! Standardizes {weekly ratio, daily ratio, balance-change ratio} over the
//! whole table and flags a row when the largest defined |z| is strictly
//! above the threshold. One extreme ratio is enough; rows with no defined
//! z-score are never flagged.

use crate::{
    config::PipelineConfig,
    error::PipelineResult,
    stage::{Stage, TableStage},
    stats::{abs_zscores, max_defined},
    table::FeatureTable,
    transaction_features::TransactionFeatures,
};

pub const FLAG_FEATURES: [&str; 3] = [
    "amount_weekly_ratio",
    "amount_daily_ratio",
    "balance_change_ratio_sender",
];

/// Largest defined |z| per row across the flag features.
pub fn max_deviation(features: &[TransactionFeatures]) -> Vec<Option<f64>> {
    let columns: [Vec<f64>; 3] = [
        features.iter().map(|f| f.amount_weekly_ratio).collect(),
        features.iter().map(|f| f.amount_daily_ratio).collect(),
        features.iter().map(|f| f.balance_change_ratio_sender).collect(),
    ];
    let z: Vec<Vec<Option<f64>>> = columns
        .iter()
        .zip(FLAG_FEATURES)
        .map(|(col, name)| {
            let z = abs_zscores(col);
            if !col.is_empty() && z.iter().all(Option::is_none) {
                log::warn!("flag feature '{name}' has zero variance; ignored");
            }
            z
        })
        .collect();

    (0..features.len())
        .map(|row| max_defined(&[z[0][row], z[1][row], z[2][row]]))
        .collect()
}

pub fn flag(features: &[TransactionFeatures], threshold: f64) -> Vec<bool> {
    max_deviation(features)
        .into_iter()
        .map(|m| m.is_some_and(|m| m > threshold))
        .collect()
}

pub struct TransactionFlagger;

impl TableStage for TransactionFlagger {
    fn name(&self) -> &'static str {
        "transaction_flagger"
    }

    fn stage(&self) -> Stage {
        Stage::Flagged
    }

    fn apply(&self, table: &FeatureTable, config: &PipelineConfig) -> PipelineResult<FeatureTable> {
        let features = table.require_transaction(self.name())?;
        let flags = flag(features, config.flag_threshold);
        let flagged = flags.iter().filter(|f| **f).count();
        log::info!(
            "Flagged {flagged} of {} transactions (threshold {})",
            flags.len(),
            config.flag_threshold
        );
        table.with_flags(flags)
    }
}
