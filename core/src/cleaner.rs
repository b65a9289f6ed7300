//! Transaction cleaner.
//!
//! PASS ORDER (fixed, never reordered):
//!   1. Missing values  : any absent cell drops the row
//!   2. Type coercion   : numeric cells must parse to finite numbers
//!   3. Value sanity    : step, amount and balances must be >= 0
//!   4. Duplicates      : exact repeats of an earlier row are dropped
//!
//! Later passes assume the typed output of pass 2, so sanity checks
//! can never run against text. Each pass reports how many rows it removed.

use crate::{
    record::{field, RawRecord, RawTable, Transaction},
    types::Step,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rows removed by each pass. This is the audit trail shown to the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub initial_rows:           usize,
    pub removed_missing:        usize,
    pub removed_invalid_types:  usize,
    pub removed_invalid_values: usize,
    pub removed_duplicates:     usize,
    pub final_rows:             usize,
}

impl CleaningReport {
    pub fn total_removed(&self) -> usize {
        self.removed_missing
            + self.removed_invalid_types
            + self.removed_invalid_values
            + self.removed_duplicates
    }

    /// (label, count) pairs in pass order.
    pub fn passes(&self) -> [(&'static str, usize); 4] {
        [
            ("removed_missing", self.removed_missing),
            ("removed_invalid_types", self.removed_invalid_types),
            ("removed_invalid_values", self.removed_invalid_values),
            ("removed_duplicates", self.removed_duplicates),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleanOutcome {
    pub records: Vec<Transaction>,
    pub report:  CleaningReport,
}

struct Pass<T> {
    kept:    Vec<T>,
    removed: usize,
}

/// Run all four passes over a raw table.
pub fn clean(raw: &RawTable) -> CleanOutcome {
    let initial_rows = raw.len();

    let missing = drop_missing(&raw.rows);
    let typed = coerce_types(missing.kept);
    let sane = check_values(typed.kept);
    let unique = drop_duplicates(sane.kept);

    let report = CleaningReport {
        initial_rows,
        removed_missing:        missing.removed,
        removed_invalid_types:  typed.removed,
        removed_invalid_values: sane.removed,
        removed_duplicates:     unique.removed,
        final_rows:             unique.kept.len(),
    };

    for (label, count) in report.passes() {
        log::debug!("cleaner: {label} = {count}");
    }
    log::info!(
        "Cleaned {} rows down to {} ({} removed)",
        report.initial_rows,
        report.final_rows,
        report.total_removed()
    );

    CleanOutcome { records: unique.kept, report }
}

fn drop_missing(rows: &[RawRecord]) -> Pass<&RawRecord> {
    let kept: Vec<&RawRecord> = rows.iter().filter(|r| !r.has_missing()).collect();
    Pass { removed: rows.len() - kept.len(), kept }
}

fn coerce_types(rows: Vec<&RawRecord>) -> Pass<Transaction> {
    let total = rows.len();
    let kept: Vec<Transaction> = rows.into_iter().filter_map(coerce_row).collect();
    Pass { removed: total - kept.len(), kept }
}

/// Strict numeric parse: surrounding whitespace allowed, non-finite rejected.
fn parse_numeric(cell: Option<&str>) -> Option<f64> {
    cell?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn text(cell: Option<&str>) -> String {
    cell.unwrap_or_default().trim().to_string()
}

/// Integer text parses exactly. Fractional text truncates toward zero, but
/// only when the result fits in a step; anything else fails coercion.
fn parse_step(cell: Option<&str>) -> Option<Step> {
    let cell = cell?.trim();
    if let Ok(step) = cell.parse::<Step>() {
        return Some(step);
    }
    let value = parse_numeric(Some(cell))?;
    (Step::MIN as f64..Step::MAX as f64)
        .contains(&value)
        .then(|| value.trunc() as Step)
}

fn coerce_row(row: &RawRecord) -> Option<Transaction> {
    let step = parse_step(row.cell(field::STEP))?;
    let mut numbers = [0.0f64; 5];
    for (slot, idx) in numbers.iter_mut().zip(field::AMOUNTS) {
        *slot = parse_numeric(row.cell(idx))?;
    }
    let [amount, sbb, sba, rbb, rba] = numbers;

    Some(Transaction {
        step,
        kind:                     text(row.cell(field::KIND)),
        amount,
        sender_id:                text(row.cell(field::SENDER_ID)),
        sender_balance_before:    sbb,
        sender_balance_after:     sba,
        recipient_id:             text(row.cell(field::RECIPIENT_ID)),
        recipient_balance_before: rbb,
        recipient_balance_after:  rba,
    })
}

fn check_values(rows: Vec<Transaction>) -> Pass<Transaction> {
    let total = rows.len();
    let kept: Vec<Transaction> = rows.into_iter().filter(is_sane).collect();
    Pass { removed: total - kept.len(), kept }
}

/// Zero amounts are kept: a zero-value transfer is a signal, not bad data.
fn is_sane(t: &Transaction) -> bool {
    t.step >= 0 && t.amount >= 0.0 && t.balances().iter().all(|b| *b >= 0.0)
}

fn drop_duplicates(rows: Vec<Transaction>) -> Pass<Transaction> {
    let total = rows.len();
    let mut seen = HashSet::with_capacity(total);
    let kept: Vec<Transaction> = rows
        .into_iter()
        .filter(|t| seen.insert(t.identity_key()))
        .collect();
    Pass { removed: total - kept.len(), kept }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numeric_is_strict() {
        assert_eq!(parse_numeric(Some(" 12.5 ")), Some(12.5));
        assert_eq!(parse_numeric(Some("1e3")), Some(1000.0));
        assert_eq!(parse_numeric(Some("12abc")), None);
        assert_eq!(parse_numeric(Some("inf")), None);
        assert_eq!(parse_numeric(Some("NaN")), None);
        assert_eq!(parse_numeric(Some("")), None);
        assert_eq!(parse_numeric(None), None);
    }

    #[test]
    fn fractional_step_truncates() {
        let row = RawRecord::from_strs(["25.9", "PAYMENT", "1", "C1", "5", "4", "M1", "0", "0"]);
        assert_eq!(coerce_row(&row).unwrap().step, 25);
    }

    #[test]
    fn step_outside_integer_range_fails_coercion() {
        assert_eq!(parse_step(Some("1e20")), None);
        assert_eq!(parse_step(Some("-1e20")), None);
        assert_eq!(parse_step(Some("9223372036854775808")), None);
        assert_eq!(parse_step(Some("9007199254740993")), Some(9_007_199_254_740_993));
        assert_eq!(parse_step(Some(" -3.7 ")), Some(-3));
        assert_eq!(parse_step(Some("inf")), None);
    }

    #[test]
    fn categorical_cells_are_trimmed() {
        let row = RawRecord::from_strs(["1", "  TRANSFER ", "1", " C1", "5", "4", "C2 ", "0", "1"]);
        let t = coerce_row(&row).unwrap();
        assert_eq!(t.kind, "TRANSFER");
        assert_eq!(t.sender_id, "C1");
        assert_eq!(t.recipient_id, "C2");
    }
}
