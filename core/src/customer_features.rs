//! Customer feature builder.
//!
//! Buckets each transaction into a day and a week, then broadcasts
//! sender-level aggregates back onto every member row:
//!   - per (sender, day):  transaction count, total amount
//!   - per (sender, week): transaction count, average amount
//!   - daily velocity:     daily count / (distinct active days + ε)
//!   - balance gap:        before − amount − after (row-local)
//!
//! Grouping is two-pass: aggregates are collected into maps keyed by the
//! grouping tuple, then each row looks its group up. Rows are visited in
//! table order in both passes, so sums are reproducible.

use crate::{
    config::PipelineConfig,
    error::PipelineResult,
    record::Transaction,
    stage::{Stage, TableStage},
    table::FeatureTable,
    types::{Day, Step, Week, DAYS_PER_WEEK, HOURS_PER_DAY},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomerFeatures {
    pub day:                Day,
    pub week:               Week,
    pub daily_tx_count:     u64,
    pub daily_total_amount: f64,
    pub weekly_tx_count:    u64,
    pub weekly_avg_amount:  f64,
    pub daily_tx_velocity:  f64,
    /// Non-zero when the sender's balances do not reconcile with the amount.
    pub balance_gap_sender: f64,
}

pub fn day_of(step: Step) -> Day {
    step.div_euclid(HOURS_PER_DAY)
}

pub fn week_of(day: Day) -> Week {
    day.div_euclid(DAYS_PER_WEEK)
}

pub fn balance_gap(t: &Transaction) -> f64 {
    t.sender_balance_before - t.amount - t.sender_balance_after
}

#[derive(Debug, Default, Clone, Copy)]
struct GroupTotals {
    count: u64,
    total: f64,
}

impl GroupTotals {
    fn add(&mut self, amount: f64) {
        self.count += 1;
        self.total += amount;
    }

    fn mean(&self) -> f64 {
        self.total / self.count as f64
    }
}

/// Compute the customer feature group for every record, in record order.
pub fn build(records: &[Transaction], epsilon: f64) -> Vec<CustomerFeatures> {
    let buckets: Vec<(Day, Week)> = records
        .iter()
        .map(|t| {
            let day = day_of(t.step);
            (day, week_of(day))
        })
        .collect();

    // Pass 1: aggregate per group.
    let mut daily: HashMap<(&str, Day), GroupTotals> = HashMap::new();
    let mut weekly: HashMap<(&str, Week), GroupTotals> = HashMap::new();
    let mut active_days: HashMap<&str, HashSet<Day>> = HashMap::new();

    for (t, &(day, week)) in records.iter().zip(&buckets) {
        let sender = t.sender_id.as_str();
        daily.entry((sender, day)).or_default().add(t.amount);
        weekly.entry((sender, week)).or_default().add(t.amount);
        active_days.entry(sender).or_default().insert(day);
    }

    // Pass 2: broadcast onto rows.
    records
        .iter()
        .zip(&buckets)
        .map(|(t, &(day, week))| {
            let sender = t.sender_id.as_str();
            let d = daily[&(sender, day)];
            let w = weekly[&(sender, week)];
            let days_active = active_days[sender].len() as f64;

            CustomerFeatures {
                day,
                week,
                daily_tx_count:     d.count,
                daily_total_amount: d.total,
                weekly_tx_count:    w.count,
                weekly_avg_amount:  w.mean(),
                daily_tx_velocity:  d.count as f64 / (days_active + epsilon),
                balance_gap_sender: balance_gap(t),
            }
        })
        .collect()
}

pub struct CustomerFeatureBuilder;

impl TableStage for CustomerFeatureBuilder {
    fn name(&self) -> &'static str {
        "customer_features"
    }

    fn stage(&self) -> Stage {
        Stage::CustomerFeatures
    }

    fn apply(&self, table: &FeatureTable, config: &PipelineConfig) -> PipelineResult<FeatureTable> {
        let features = build(table.records(), config.epsilon);
        let senders: HashSet<&str> = table.records().iter().map(|t| t.sender_id.as_str()).collect();
        log::info!(
            "Customer features built for {} rows across {} senders",
            features.len(),
            senders.len()
        );
        table.with_customer(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_use_floor_division() {
        assert_eq!(day_of(0), 0);
        assert_eq!(day_of(23), 0);
        assert_eq!(day_of(24), 1);
        assert_eq!(week_of(6), 0);
        assert_eq!(week_of(7), 1);
        assert_eq!(week_of(day_of(24 * 14 - 1)), 1);
    }
}
