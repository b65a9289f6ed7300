//! Raw and typed transaction records.
//!
//! Cells of a `RawRecord` are untyped text exactly as read from disk.
//! The cleaner is the only place that turns them into a `Transaction`.

use crate::types::{AccountId, Step};
use serde::{Deserialize, Serialize};

/// Number of required columns.
pub const FIELD_COUNT: usize = 9;

/// Canonical field positions inside a `RawRecord`.
pub mod field {
    pub const STEP: usize = 0;
    pub const KIND: usize = 1;
    pub const AMOUNT: usize = 2;
    pub const SENDER_ID: usize = 3;
    pub const SENDER_BALANCE_BEFORE: usize = 4;
    pub const SENDER_BALANCE_AFTER: usize = 5;
    pub const RECIPIENT_ID: usize = 6;
    pub const RECIPIENT_BALANCE_BEFORE: usize = 7;
    pub const RECIPIENT_BALANCE_AFTER: usize = 8;

    /// Float-valued fields. `STEP` is numeric too but parses as an integer.
    pub const AMOUNTS: [usize; 5] = [
        AMOUNT,
        SENDER_BALANCE_BEFORE,
        SENDER_BALANCE_AFTER,
        RECIPIENT_BALANCE_BEFORE,
        RECIPIENT_BALANCE_AFTER,
    ];
}

/// One untyped row. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRecord {
    pub cells: [Option<String>; FIELD_COUNT],
}

impl RawRecord {
    pub fn new(cells: [Option<String>; FIELD_COUNT]) -> Self {
        Self { cells }
    }

    /// Build a fully populated record from string slices in canonical order.
    pub fn from_strs(values: [&str; FIELD_COUNT]) -> Self {
        Self { cells: values.map(|v| Some(v.to_string())) }
    }

    pub fn cell(&self, idx: usize) -> Option<&str> {
        self.cells[idx].as_deref()
    }

    pub fn has_missing(&self) -> bool {
        self.cells.iter().any(Option::is_none)
    }
}

/// Merged output of the loader: raw rows in file-discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(rows: Vec<RawRecord>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A typed, validated transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub step:                     Step,
    /// Payment kind, e.g. TRANSFER or CASH_OUT.
    pub kind:                     String,
    pub amount:                   f64,
    pub sender_id:                AccountId,
    pub sender_balance_before:    f64,
    pub sender_balance_after:     f64,
    pub recipient_id:             AccountId,
    pub recipient_balance_before: f64,
    pub recipient_balance_after:  f64,
}

impl Transaction {
    /// Render back into text cells. Floats use the shortest representation
    /// that parses back to the same value, so a re-clean sees identical data.
    pub fn to_raw(&self) -> RawRecord {
        RawRecord::new([
            Some(self.step.to_string()),
            Some(self.kind.clone()),
            Some(self.amount.to_string()),
            Some(self.sender_id.clone()),
            Some(self.sender_balance_before.to_string()),
            Some(self.sender_balance_after.to_string()),
            Some(self.recipient_id.clone()),
            Some(self.recipient_balance_before.to_string()),
            Some(self.recipient_balance_after.to_string()),
        ])
    }

    pub fn balances(&self) -> [f64; 4] {
        [
            self.sender_balance_before,
            self.sender_balance_after,
            self.recipient_balance_before,
            self.recipient_balance_after,
        ]
    }

    /// Equality key over every column. Floats compare by bit pattern.
    pub(crate) fn identity_key(&self) -> TransactionKey {
        TransactionKey {
            step:      self.step,
            kind:      self.kind.clone(),
            sender:    self.sender_id.clone(),
            recipient: self.recipient_id.clone(),
            numbers:   [
                normalise_zero(self.amount).to_bits(),
                normalise_zero(self.sender_balance_before).to_bits(),
                normalise_zero(self.sender_balance_after).to_bits(),
                normalise_zero(self.recipient_balance_before).to_bits(),
                normalise_zero(self.recipient_balance_after).to_bits(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TransactionKey {
    step:      Step,
    kind:      String,
    sender:    AccountId,
    recipient: AccountId,
    numbers:   [u64; 5],
}

// -0.0 and 0.0 are the same value and must dedupe together.
fn normalise_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

/// Convert cleaned transactions back into a raw table.
pub fn to_raw_table(records: &[Transaction]) -> RawTable {
    RawTable::new(records.iter().map(Transaction::to_raw).collect())
}
