//! Transaction feature builder: per-row ratios against the sender's baseline.
//!
//! Every denominator carries ε, so a zero baseline yields a large but
//! finite ratio instead of a division error.

use crate::{
    config::PipelineConfig,
    customer_features::CustomerFeatures,
    error::PipelineResult,
    record::Transaction,
    stage::{Stage, TableStage},
    table::FeatureTable,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionFeatures {
    /// amount / (weekly average amount + ε)
    pub amount_weekly_ratio:         f64,
    /// amount / (daily total amount + ε)
    pub amount_daily_ratio:          f64,
    /// 1 / (daily transaction count + ε)
    pub transaction_share_of_day:    f64,
    /// amount / (sender balance before + ε)
    pub balance_change_ratio_sender: f64,
}

pub fn ratios(t: &Transaction, c: &CustomerFeatures, epsilon: f64) -> TransactionFeatures {
    TransactionFeatures {
        amount_weekly_ratio:         t.amount / (c.weekly_avg_amount + epsilon),
        amount_daily_ratio:          t.amount / (c.daily_total_amount + epsilon),
        transaction_share_of_day:    1.0 / (c.daily_tx_count as f64 + epsilon),
        balance_change_ratio_sender: t.amount / (t.sender_balance_before + epsilon),
    }
}

pub fn build(
    records: &[Transaction],
    customer: &[CustomerFeatures],
    epsilon: f64,
) -> Vec<TransactionFeatures> {
    records
        .iter()
        .zip(customer)
        .map(|(t, c)| ratios(t, c, epsilon))
        .collect()
}

pub struct TransactionFeatureBuilder;

impl TableStage for TransactionFeatureBuilder {
    fn name(&self) -> &'static str {
        "transaction_features"
    }

    fn stage(&self) -> Stage {
        Stage::TransactionFeatures
    }

    fn apply(&self, table: &FeatureTable, config: &PipelineConfig) -> PipelineResult<FeatureTable> {
        let customer = table.require_customer(self.name())?;
        let features = build(table.records(), customer, config.epsilon);
        log::info!("Transaction features built for {} rows", features.len());
        table.with_transaction(features)
    }
}
