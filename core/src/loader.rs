//! Schema loader: discover tabular files, validate headers, merge rows.
//!
//! RULE: nothing in here returns an error for bad input data.
//! A missing directory yields an empty outcome; an unreadable or
//! non-conforming file is routed to `non_matching` and skipped.

use crate::{
    config::PipelineConfig,
    record::{RawRecord, RawTable, FIELD_COUNT},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which files were merged and which were rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub matching:     Vec<String>,
    pub non_matching: Vec<String>,
    pub rows:         usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub table:  RawTable,
    pub report: LoadReport,
}

impl LoadOutcome {
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Load every conforming file in `dir`, in file-name order.
pub fn load_directory(dir: impl AsRef<Path>, config: &PipelineConfig) -> LoadOutcome {
    let dir = dir.as_ref();
    let candidates = discover(dir, config);
    if candidates.is_empty() {
        log::warn!("No tabular files found in {}", dir.display());
        return LoadOutcome::default();
    }

    let mut outcome = LoadOutcome::default();
    for path in candidates {
        let name = file_name(&path);
        match read_file(&path, config) {
            Ok(Some(rows)) => {
                log::debug!("{name}: schema matches, {} rows", rows.len());
                outcome.table.rows.extend(rows);
                outcome.report.matching.push(name);
            }
            Ok(None) => {
                log::warn!("{name}: missing required columns, skipped");
                outcome.report.non_matching.push(name);
            }
            Err(e) => {
                log::warn!("{name}: unreadable ({e}), skipped");
                outcome.report.non_matching.push(name);
            }
        }
    }
    outcome.report.rows = outcome.table.len();

    log::info!(
        "Loaded {} rows from {} file(s); {} file(s) rejected",
        outcome.report.rows,
        outcome.report.matching.len(),
        outcome.report.non_matching.len()
    );
    outcome
}

/// Regular files in `dir` with a recognised extension, sorted by name.
fn discover(dir: &Path, config: &PipelineConfig) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot list {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| config.recognises_extension(ext))
        })
        .collect();
    files.sort();
    files
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Parse one file. `Ok(None)` means the header lacks a required column.
fn read_file(path: &Path, config: &PipelineConfig) -> Result<Option<Vec<RawRecord>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .flexible(true)
        .has_headers(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut positions = [0usize; FIELD_COUNT];
    for (slot, required) in positions.iter_mut().zip(config.columns.ordered()) {
        match headers.iter().position(|h| h == required) {
            Some(pos) => *slot = pos,
            None => return Ok(None),
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells = positions.map(|pos| {
            record
                .get(pos)
                .filter(|cell| !config.is_null_marker(cell))
                .map(str::to_string)
        });
        rows.push(RawRecord::new(cells));
    }
    Ok(Some(rows))
}
