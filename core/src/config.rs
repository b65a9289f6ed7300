use crate::{
    error::{PipelineError, PipelineResult},
    types::{DEFAULT_EPSILON, DEFAULT_FLAG_THRESHOLD},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Column mapping ─────────────────────────────────────────────────

/// Physical header names for the nine required columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnNames {
    pub step: String,
    pub kind: String,
    pub amount: String,
    pub sender_id: String,
    pub sender_balance_before: String,
    pub sender_balance_after: String,
    pub recipient_id: String,
    pub recipient_balance_before: String,
    pub recipient_balance_after: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            step:                     "step".into(),
            kind:                     "type".into(),
            amount:                   "amount".into(),
            sender_id:                "sender_id".into(),
            sender_balance_before:    "sender_balance_before".into(),
            sender_balance_after:     "sender_balance_after".into(),
            recipient_id:             "recipient_id".into(),
            recipient_balance_before: "recipient_balance_before".into(),
            recipient_balance_after:  "recipient_balance_after".into(),
        }
    }
}

impl ColumnNames {
    /// Header names used by PaySim-style exports.
    pub fn paysim() -> Self {
        Self {
            step:                     "step".into(),
            kind:                     "type".into(),
            amount:                   "amount".into(),
            sender_id:                "nameOrig".into(),
            sender_balance_before:    "oldbalanceOrg".into(),
            sender_balance_after:     "newbalanceOrig".into(),
            recipient_id:             "nameDest".into(),
            recipient_balance_before: "oldbalanceDest".into(),
            recipient_balance_after:  "newbalanceDest".into(),
        }
    }

    /// Names in canonical field order. `RawRecord` cells follow this order.
    pub fn ordered(&self) -> [&str; 9] {
        [
            self.step.as_str(),
            self.kind.as_str(),
            self.amount.as_str(),
            self.sender_id.as_str(),
            self.sender_balance_before.as_str(),
            self.sender_balance_after.as_str(),
            self.recipient_id.as_str(),
            self.recipient_balance_before.as_str(),
            self.recipient_balance_after.as_str(),
        ]
    }
}

// ── Risk bands ─────────────────────────────────────────────────────

/// Lower bounds (inclusive) of the medium, high and critical classes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskBands {
    pub medium:   f64,
    pub high:     f64,
    pub critical: f64,
}

impl Default for RiskBands {
    fn default() -> Self {
        Self { medium: 0.5, high: 1.0, critical: 2.0 }
    }
}

// ── Pipeline config ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub epsilon:        f64,
    /// Absolute z-score above which a transaction is flagged.
    pub flag_threshold: f64,
    pub risk_bands:     RiskBands,
    pub columns:        ColumnNames,
    /// File extensions (without the dot) the loader treats as tabular.
    pub extensions:     Vec<String>,
    /// Cell values read as missing.
    pub null_markers:   Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            epsilon:        DEFAULT_EPSILON,
            flag_threshold: DEFAULT_FLAG_THRESHOLD,
            risk_bands:     RiskBands::default(),
            columns:        ColumnNames::default(),
            extensions:     vec!["csv".into()],
            null_markers:   ["", "NaN", "nan", "NA", "N/A", "n/a", "NULL", "null", "None", "<NA>", "#N/A"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Cannot read {}: {e}", path.display())
        })?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if !(self.flag_threshold > 0.0 && self.flag_threshold.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!(
                "flag_threshold must be positive, got {}",
                self.flag_threshold
            )));
        }
        let b = self.risk_bands;
        if !(b.medium < b.high && b.high < b.critical) {
            return Err(PipelineError::InvalidConfig(format!(
                "risk bands must be strictly increasing, got {} / {} / {}",
                b.medium, b.high, b.critical
            )));
        }
        if self.extensions.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one file extension is required".into(),
            ));
        }
        Ok(())
    }

    pub fn is_null_marker(&self, cell: &str) -> bool {
        self.null_markers.iter().any(|m| m == cell)
    }

    pub fn recognises_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "flag_threshold": 2.5 }"#).unwrap();
        assert_eq!(config.flag_threshold, 2.5);
        assert_eq!(config.epsilon, DEFAULT_EPSILON);
        assert_eq!(config.columns, ColumnNames::default());
    }

    #[test]
    fn non_increasing_bands_rejected() {
        let config = PipelineConfig {
            risk_bands: RiskBands { medium: 1.0, high: 1.0, critical: 2.0 },
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }
}
