//! Cleaner: pass counts, sanity rules, duplicates, idempotence.

use fraudlens_core::{
    cleaner::clean,
    record::{to_raw_table, RawRecord, RawTable},
    synthetic::{generate, SyntheticSpec},
};

fn row(values: [&str; 9]) -> RawRecord {
    RawRecord::from_strs(values)
}

fn messy_table() -> RawTable {
    let mut missing = row(["5", "PAYMENT", "10", "C5", "100", "90", "M1", "0", "0"]);
    missing.cells[2] = None;

    RawTable::new(vec![
        row(["1", "PAYMENT", "10", "C1", "100", "90", "M1", "0", "0"]),
        missing,
        row(["2", "TRANSFER", "ten", "C2", "100", "90", "C3", "0", "10"]),
        row(["3", "TRANSFER", "10", "C2", "100", "90", "C3", "0", "oops"]),
        row(["4", "CASH_OUT", "-1", "C4", "100", "101", "C5", "0", "0"]),
        row(["-24", "CASH_OUT", "1", "C4", "100", "99", "C5", "0", "1"]),
        row(["6", "CASH_OUT", "1", "C4", "-100", "0", "C5", "0", "1"]),
        row(["7", "PAYMENT", "0", "C7", "50", "50", "M2", "0", "0"]),
        row(["1", "PAYMENT", "10", "C1", "100", "90", "M1", "0", "0"]),
        row(["1", " PAYMENT ", "10.0", "C1", "100", "90", "M1", "0", "0"]),
    ])
}

/// Each cleaning pass reports exactly the rows it removed.
#[test]
fn each_pass_reports_its_removals() {
    let outcome = clean(&messy_table());
    let r = outcome.report;
    assert_eq!(r.initial_rows, 10);
    assert_eq!(r.removed_missing, 1);
    assert_eq!(r.removed_invalid_types, 2);
    assert_eq!(r.removed_invalid_values, 3);
    assert_eq!(r.removed_duplicates, 2, "whitespace and 10 vs 10.0 are the same row once typed");
    assert_eq!(r.final_rows, 2);
    assert_eq!(outcome.records.len(), 2);
}

/// Per-pass removals always add up to the rows lost overall.
#[test]
fn removed_counts_sum_to_row_difference() {
    let tables = [
        messy_table(),
        RawTable::default(),
        to_raw_table(&generate(&SyntheticSpec { senders: 50, ..SyntheticSpec::default() })),
    ];
    for table in &tables {
        let r = clean(table).report;
        assert_eq!(r.total_removed(), r.initial_rows - r.final_rows);
    }
}

/// A zero-amount transaction is valid data and must be kept.
#[test]
fn zero_amount_transactions_survive() {
    let outcome = clean(&messy_table());
    assert!(outcome.records.iter().any(|t| t.sender_id == "C7" && t.amount == 0.0));
}

/// Every surviving row has a non-negative step, amount and balances.
#[test]
fn output_satisfies_value_rules() {
    let outcome = clean(&messy_table());
    for t in &outcome.records {
        assert!(t.step >= 0);
        assert!(t.amount >= 0.0);
        assert!(t.balances().iter().all(|b| *b >= 0.0));
    }
}

/// Duplicate removal keeps the first occurrence in table order.
#[test]
fn duplicates_keep_first_occurrence() {
    let outcome = clean(&messy_table());
    assert_eq!(outcome.records[0].sender_id, "C1");
    assert_eq!(outcome.records[0].kind, "PAYMENT");
    assert_eq!(outcome.records[1].sender_id, "C7");
}

/// Odd text in categorical columns never drops a row.
#[test]
fn categorical_text_is_never_a_reason_to_drop() {
    let table = RawTable::new(vec![
        row(["1", "???", "10", "  ", "100", "90", "!!", "0", "0"]),
    ]);
    let outcome = clean(&table);
    assert_eq!(outcome.report.removed_invalid_types, 0);
    assert_eq!(outcome.records[0].sender_id, "");
    assert_eq!(outcome.records[0].kind, "???");
}

/// Cleaning already-clean rows removes nothing and changes nothing.
#[test]
fn cleaning_is_idempotent() {
    for table in [
        messy_table(),
        to_raw_table(&generate(&SyntheticSpec { senders: 80, ..SyntheticSpec::default() })),
    ] {
        let first = clean(&table);
        let second = clean(&to_raw_table(&first.records));
        assert_eq!(second.report.total_removed(), 0);
        assert_eq!(second.records, first.records);
    }
}

/// A step too large for an integer is a type failure, never a clamped value
/// that collides with another row in the duplicate pass.
#[test]
fn out_of_range_step_fails_type_coercion() {
    let table = RawTable::new(vec![
        row(["1e20", "PAYMENT", "10", "C1", "100", "90", "M1", "0", "0"]),
        row(["5e20", "PAYMENT", "10", "C1", "100", "90", "M1", "0", "0"]),
        row(["9007199254740993", "PAYMENT", "10", "C1", "100", "90", "M1", "0", "0"]),
        row(["9007199254740992", "PAYMENT", "10", "C1", "100", "90", "M1", "0", "0"]),
    ]);
    let outcome = clean(&table);
    assert_eq!(outcome.report.removed_invalid_types, 2);
    assert_eq!(outcome.report.removed_duplicates, 0);
    let steps: Vec<i64> = outcome.records.iter().map(|t| t.step).collect();
    assert_eq!(steps, vec![9_007_199_254_740_993, 9_007_199_254_740_992]);
}
