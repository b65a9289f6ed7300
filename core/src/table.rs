//! The working table.
//!
//! RULE: a table only ever grows. Each stage takes `&FeatureTable` and
//! returns a new table carrying one more column group; rows are never
//! dropped, duplicated or reordered after cleaning.

use crate::{
    customer_features::CustomerFeatures,
    error::{PipelineError, PipelineResult},
    record::Transaction,
    risk_scorer::RiskAssessment,
    transaction_features::TransactionFeatures,
};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureTable {
    records:     Vec<Transaction>,
    customer:    Option<Vec<CustomerFeatures>>,
    transaction: Option<Vec<TransactionFeatures>>,
    risk:        Option<Vec<RiskAssessment>>,
    flags:       Option<Vec<bool>>,
}

/// Borrowed view of one row across every column group present.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeatureRow<'a> {
    pub record:      &'a Transaction,
    pub customer:    Option<&'a CustomerFeatures>,
    pub transaction: Option<&'a TransactionFeatures>,
    pub risk:        Option<&'a RiskAssessment>,
    pub flag:        Option<bool>,
}

impl FeatureTable {
    pub fn from_records(records: Vec<Transaction>) -> Self {
        Self { records, ..Self::default() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Transaction] {
        &self.records
    }

    pub fn customer_features(&self) -> Option<&[CustomerFeatures]> {
        self.customer.as_deref()
    }

    pub fn transaction_features(&self) -> Option<&[TransactionFeatures]> {
        self.transaction.as_deref()
    }

    pub fn risk(&self) -> Option<&[RiskAssessment]> {
        self.risk.as_deref()
    }

    pub fn flags(&self) -> Option<&[bool]> {
        self.flags.as_deref()
    }

    pub fn require_customer(&self, stage: &'static str) -> PipelineResult<&[CustomerFeatures]> {
        self.customer_features()
            .ok_or(PipelineError::MissingColumn { stage, column: "customer_features" })
    }

    pub fn require_transaction(
        &self,
        stage: &'static str,
    ) -> PipelineResult<&[TransactionFeatures]> {
        self.transaction_features()
            .ok_or(PipelineError::MissingColumn { stage, column: "transaction_features" })
    }

    // ── Column attachment ──────────────────────────────────────

    pub fn with_customer(&self, cols: Vec<CustomerFeatures>) -> PipelineResult<Self> {
        self.check_len("customer_features", cols.len())?;
        Ok(Self { customer: Some(cols), ..self.clone() })
    }

    pub fn with_transaction(&self, cols: Vec<TransactionFeatures>) -> PipelineResult<Self> {
        self.check_len("transaction_features", cols.len())?;
        Ok(Self { transaction: Some(cols), ..self.clone() })
    }

    pub fn with_risk(&self, cols: Vec<RiskAssessment>) -> PipelineResult<Self> {
        self.check_len("risk_scorer", cols.len())?;
        Ok(Self { risk: Some(cols), ..self.clone() })
    }

    pub fn with_flags(&self, cols: Vec<bool>) -> PipelineResult<Self> {
        self.check_len("transaction_flagger", cols.len())?;
        Ok(Self { flags: Some(cols), ..self.clone() })
    }

    fn check_len(&self, stage: &'static str, actual: usize) -> PipelineResult<()> {
        if actual != self.records.len() {
            return Err(PipelineError::RowCountMismatch {
                stage,
                expected: self.records.len(),
                actual,
            });
        }
        Ok(())
    }

    // ── Row access ─────────────────────────────────────────────

    pub fn row(&self, idx: usize) -> Option<FeatureRow<'_>> {
        let record = self.records.get(idx)?;
        Some(FeatureRow {
            record,
            customer:    self.customer.as_ref().and_then(|c| c.get(idx)),
            transaction: self.transaction.as_ref().and_then(|c| c.get(idx)),
            risk:        self.risk.as_ref().and_then(|c| c.get(idx)),
            flag:        self.flags.as_ref().and_then(|c| c.get(idx).copied()),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = FeatureRow<'_>> + '_ {
        (0..self.records.len()).filter_map(move |idx| self.row(idx))
    }
}
