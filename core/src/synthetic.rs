//! Deterministic synthetic transaction batches.
//!
//! RULE: nothing here may call a platform RNG. Every batch is derived
//! from a single seed, so the same parameters always yield the same rows.
//! Used for demos and for exercising the pipeline at population scale.

use crate::{
    config::ColumnNames,
    error::PipelineResult,
    record::Transaction,
    types::{Day, HOURS_PER_DAY},
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::io::Write;
use std::path::Path;

const KINDS: [&str; 5] = ["PAYMENT", "TRANSFER", "CASH_OUT", "DEBIT", "CASH_IN"];

/// Heavy-tailed sample with minimum `x_min`; smaller `alpha` means a fatter tail.
fn pareto(rng: &mut Pcg64Mcg, x_min: f64, alpha: f64) -> f64 {
    let u: f64 = rng.gen_range(1e-10..1.0);
    x_min * u.powf(-1.0 / alpha)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSpec {
    pub seed:            u64,
    pub senders:         usize,
    pub days:            Day,
    /// Probability a sender is active on a given day.
    pub activity:        f64,
    /// Upper bound on transactions per active day.
    pub max_daily_txns:  u64,
    /// Probability a transaction is inflated into an outlier.
    pub outlier_rate:    f64,
    /// Multiplier applied to outlier amounts.
    pub outlier_scale:   f64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            seed:           42,
            senders:        200,
            days:           14,
            activity:       0.5,
            max_daily_txns: 4,
            outlier_rate:   0.01,
            outlier_scale:  40.0,
        }
    }
}

fn cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Generate a batch ordered by step (stable within a step).
pub fn generate(params: &SyntheticSpec) -> Vec<Transaction> {
    let mut rng = Pcg64Mcg::seed_from_u64(params.seed);
    let mut records = Vec::new();

    for sender in 0..params.senders {
        let sender_id = format!("C{:09}", 100_000_000 + sender);
        let typical_amount = pareto(&mut rng, 20.0, 2.0);
        let mut balance = cents(pareto(&mut rng, 500.0, 1.5));

        for day in 0..params.days {
            if !rng.gen_bool(params.activity.clamp(0.0, 1.0)) {
                continue;
            }
            let count = rng.gen_range(1..=params.max_daily_txns.max(1));
            for _ in 0..count {
                let hour = rng.gen_range(0..HOURS_PER_DAY);
                let kind = KINDS[rng.gen_range(0..KINDS.len())];

                let mut amount = pareto(&mut rng, typical_amount, 1.8);
                if rng.gen_bool(params.outlier_rate.clamp(0.0, 1.0)) {
                    amount *= params.outlier_scale;
                }
                let amount = cents(amount);

                let before = balance;
                let after = cents((before - amount).max(0.0));
                balance = if rng.gen_bool(0.2) {
                    cents(after + pareto(&mut rng, 200.0, 1.5))
                } else {
                    after
                };

                let recipient_before = cents(pareto(&mut rng, 100.0, 1.2));
                let recipient_id = if kind == "PAYMENT" {
                    format!("M{:09}", rng.gen_range(0..1_000_000_000u64))
                } else {
                    format!("C{:09}", rng.gen_range(0..1_000_000_000u64))
                };

                records.push(Transaction {
                    step: day * HOURS_PER_DAY + hour,
                    kind: kind.to_string(),
                    amount,
                    sender_id: sender_id.clone(),
                    sender_balance_before: before,
                    sender_balance_after: after,
                    recipient_id,
                    recipient_balance_before: recipient_before,
                    recipient_balance_after: cents(recipient_before + amount),
                });
            }
        }
    }

    records.sort_by_key(|t| t.step);
    records
}

/// Write records as delimited text with the configured header names.
pub fn write_csv<W: Write>(
    records: &[Transaction],
    columns: &ColumnNames,
    writer: W,
) -> PipelineResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(columns.ordered())?;
    for t in records {
        let raw = t.to_raw();
        out.write_record(raw.cells.iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_csv_file(
    records: &[Transaction],
    columns: &ColumnNames,
    path: impl AsRef<Path>,
) -> PipelineResult<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_csv(records, columns, std::io::BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_batch() {
        let params = SyntheticSpec { senders: 20, ..SyntheticSpec::default() };
        assert_eq!(generate(&params), generate(&params));
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate(&SyntheticSpec { seed: 1, senders: 20, ..SyntheticSpec::default() });
        let b = generate(&SyntheticSpec { seed: 2, senders: 20, ..SyntheticSpec::default() });
        assert_ne!(a, b);
    }

    #[test]
    fn draws_respect_their_ranges() {
        let mut rng = Pcg64Mcg::seed_from_u64(9);
        assert!((0..1000).all(|_| pareto(&mut rng, 20.0, 2.0) >= 20.0));

        let params = SyntheticSpec { senders: 50, max_daily_txns: 3, ..SyntheticSpec::default() };
        let mut per_day: std::collections::HashMap<(String, i64), u64> = Default::default();
        for t in generate(&params) {
            *per_day.entry((t.sender_id, t.step.div_euclid(HOURS_PER_DAY))).or_default() += 1;
        }
        assert!(per_day.values().all(|n| (1..=3).contains(n)));
    }

    #[test]
    fn generated_rows_are_sane_and_ordered() {
        let rows = generate(&SyntheticSpec::default());
        assert!(!rows.is_empty());
        assert!(rows.windows(2).all(|w| w[0].step <= w[1].step));
        for t in &rows {
            assert!(t.step >= 0);
            assert!(t.amount >= 0.0);
            assert!(t.balances().iter().all(|b| *b >= 0.0));
        }
    }
}
