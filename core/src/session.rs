//! The pipeline session: owns the working table and sequences stages.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Loader               (directory or in-memory raw table)
//!   2. Cleaner
//!   3. Customer features
//!   4. Transaction features
//!   5. Risk scorer          (needs only 3)
//!   6. Transaction flagger  (needs 4)
//!
//! RULES:
//!   - A stage runs only when its prerequisite has completed.
//!   - Stages never mutate the table in place; each returns a wider copy.
//!   - A fresh load discards the table and every derived column.
//!   - Every state change is appended to the audit log.

use crate::{
    cleaner::{self, CleaningReport},
    config::PipelineConfig,
    customer_features::CustomerFeatureBuilder,
    error::{PipelineError, PipelineResult},
    event::{EventLogEntry, PipelineEvent},
    flagger::TransactionFlagger,
    loader::{self, LoadReport},
    record::RawTable,
    risk_scorer::RiskScorer,
    stage::{Stage, StageTracker, TableStage},
    table::FeatureTable,
    transaction_features::TransactionFeatureBuilder,
    types::SessionId,
};
use std::path::Path;

pub struct PipelineSession {
    pub session_id:  SessionId,
    config:          PipelineConfig,
    tracker:         StageTracker,
    raw:             Option<RawTable>,
    table:           Option<FeatureTable>,
    load_report:     Option<LoadReport>,
    cleaning_report: Option<CleaningReport>,
    stages:          Vec<Box<dyn TableStage>>,
    log:             Vec<EventLogEntry>,
}

impl PipelineSession {
    /// An empty session with no table stages registered.
    pub fn new(session_id: SessionId, config: PipelineConfig) -> Self {
        Self {
            session_id,
            config,
            tracker:         StageTracker::new(),
            raw:             None,
            table:           None,
            load_report:     None,
            cleaning_report: None,
            stages:          Vec::new(),
            log:             Vec::new(),
        }
    }

    /// Build a fully wired session with all table stages registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(config: PipelineConfig) -> Self {
        let mut session = Self::new(SessionId::new_v4(), config);
        session.register(Box::new(CustomerFeatureBuilder));
        session.register(Box::new(TransactionFeatureBuilder));
        session.register(Box::new(RiskScorer));
        session.register(Box::new(TransactionFlagger));
        session
    }

    /// Register a table stage. Call in the documented execution order.
    pub fn register(&mut self, stage: Box<dyn TableStage>) {
        self.stages.push(stage);
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &StageTracker {
        &self.tracker
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.tracker.is_completed(stage)
    }

    pub fn raw(&self) -> Option<&RawTable> {
        self.raw.as_ref()
    }

    pub fn table(&self) -> Option<&FeatureTable> {
        self.table.as_ref()
    }

    pub fn load_report(&self) -> Option<&LoadReport> {
        self.load_report.as_ref()
    }

    pub fn cleaning_report(&self) -> Option<&CleaningReport> {
        self.cleaning_report.as_ref()
    }

    pub fn events(&self) -> &[EventLogEntry] {
        &self.log
    }

    /// Rows currently held, raw or cleaned.
    pub fn row_count(&self) -> usize {
        match (&self.table, &self.raw) {
            (Some(table), _) => table.len(),
            (None, Some(raw)) => raw.len(),
            (None, None) => 0,
        }
    }

    // ── Stage 1: loading ───────────────────────────────────────

    /// Load every conforming file in `dir`, replacing all session state.
    /// An empty result leaves the session with nothing loaded.
    pub fn load(&mut self, dir: impl AsRef<Path>) -> PipelineResult<LoadReport> {
        let outcome = loader::load_directory(dir, &self.config);
        self.install(outcome.table, outcome.report)
    }

    /// Load an already-parsed raw table, e.g. records handed over by a caller.
    pub fn load_raw(&mut self, raw: RawTable) -> PipelineResult<LoadReport> {
        let report = LoadReport { rows: raw.len(), ..LoadReport::default() };
        self.install(raw, report)
    }

    fn install(&mut self, raw: RawTable, report: LoadReport) -> PipelineResult<LoadReport> {
        let discarded_rows = self.row_count();
        self.tracker.clear();
        self.raw = None;
        self.table = None;
        self.cleaning_report = None;
        self.record("loader", PipelineEvent::SessionReset { discarded_rows })?;

        self.record("loader", PipelineEvent::DataLoaded {
            rows:         report.rows,
            matching:     report.matching.clone(),
            non_matching: report.non_matching.clone(),
        })?;

        if raw.is_empty() {
            log::warn!("session {}: no matching data loaded", self.session_id);
        } else {
            self.raw = Some(raw);
            self.tracker.reset_loaded();
        }
        self.load_report = Some(report.clone());
        Ok(report)
    }

    // ── Stage 2: cleaning ──────────────────────────────────────

    pub fn clean(&mut self) -> PipelineResult<CleaningReport> {
        self.tracker.check(Stage::Cleaned)?;
        let raw = self.raw.as_ref().ok_or(PipelineError::NothingLoaded)?;

        let outcome = cleaner::clean(raw);
        let report = outcome.report;
        self.table = Some(FeatureTable::from_records(outcome.records));
        self.cleaning_report = Some(report);
        self.tracker.complete(Stage::Cleaned);
        self.record("cleaner", PipelineEvent::DataCleaned { report })?;
        Ok(report)
    }

    // ── Stages 3–6: table stages ───────────────────────────────

    pub fn build_customer_features(&mut self) -> PipelineResult<&FeatureTable> {
        self.run_stage(Stage::CustomerFeatures)
    }

    pub fn build_transaction_features(&mut self) -> PipelineResult<&FeatureTable> {
        self.run_stage(Stage::TransactionFeatures)
    }

    pub fn score_risk(&mut self) -> PipelineResult<&FeatureTable> {
        self.run_stage(Stage::RiskScored)
    }

    pub fn flag_transactions(&mut self) -> PipelineResult<&FeatureTable> {
        self.run_stage(Stage::Flagged)
    }

    fn run_stage(&mut self, stage: Stage) -> PipelineResult<&FeatureTable> {
        self.tracker.check(stage)?;
        let (source, next) = {
            let table = self.table.as_ref().ok_or(PipelineError::NothingLoaded)?;
            let runner = self
                .stages
                .iter()
                .find(|s| s.stage() == stage)
                .ok_or_else(|| anyhow::anyhow!("no table stage registered for '{stage}'"))?;
            (runner.name(), runner.apply(table, &self.config)?)
        };

        let rows = next.len();
        self.table = Some(next);
        self.tracker.complete(stage);
        self.record(source, PipelineEvent::StageCompleted { stage, rows })?;
        self.table.as_ref().ok_or(PipelineError::NothingLoaded)
    }

    /// Run every stage in the documented order over the files in `dir`.
    pub fn run_all(&mut self, dir: impl AsRef<Path>) -> PipelineResult<&FeatureTable> {
        self.load(dir)?;
        self.run_from_loaded()
    }

    /// Run cleaning through flagging on whatever is currently loaded.
    pub fn run_from_loaded(&mut self) -> PipelineResult<&FeatureTable> {
        if !self.is_completed(Stage::Loaded) {
            return Err(PipelineError::NothingLoaded);
        }
        self.clean()?;
        self.build_customer_features()?;
        self.build_transaction_features()?;
        self.score_risk()?;
        self.flag_transactions()
    }

    // ── Audit log ──────────────────────────────────────────────

    fn record(&mut self, source: &str, event: PipelineEvent) -> PipelineResult<()> {
        let entry = EventLogEntry {
            session_id: self.session_id,
            sequence:   self.log.len() as u64,
            source:     source.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(&event)?,
        };
        log::debug!("session {}: {} {}", self.session_id, entry.event_type, entry.payload);
        self.log.push(entry);
        Ok(())
    }
}
