//! fraudlens-runner: headless batch runner for the fraud feature pipeline.
//!
//! Usage:
//!   fraudlens-runner --data-dir ./data --top 5
//!   fraudlens-runner --data-dir ./data --config pipeline.json --json
//!   fraudlens-runner --generate 5000 --seed 7 --out ./data

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use fraudlens_core::{
    cleaner::CleaningReport,
    loader::LoadReport,
    risk_scorer::RiskClass,
    synthetic::{generate, write_csv_file, SyntheticSpec},
    FeatureTable, PipelineConfig, PipelineSession,
};
use serde::Serialize;
use std::collections::HashSet;
use std::env;
use std::path::Path;

/// Critical senders listed when `--top` is not given.
const DEFAULT_TOP: usize = 5;

#[derive(Serialize)]
struct ClassCount {
    class: String,
    count: usize,
}

#[derive(Serialize)]
struct FlagSummary {
    total:   usize,
    flagged: usize,
    rate:    f64,
}

#[derive(Serialize)]
struct CriticalSender {
    sender_id:  String,
    risk_score: f64,
}

#[derive(Serialize)]
struct RunSummary {
    generated_at:      DateTime<Utc>,
    session_id:        String,
    load:              LoadReport,
    cleaning:          Option<CleaningReport>,
    risk_distribution: Vec<ClassCount>,
    flags:             FlagSummary,
    top_critical:      Vec<CriticalSender>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let top = parse_arg(&args, "--top", DEFAULT_TOP);
    let json = args.iter().any(|a| a == "--json");

    if let Some(rows) = find_arg(&args, "--generate") {
        let rows: usize = rows.parse().context("--generate expects a row count")?;
        let out = find_arg(&args, "--out").unwrap_or("./data");
        return run_generate(rows, seed, Path::new(out));
    }

    let data_dir = find_arg(&args, "--data-dir").unwrap_or("./data");
    let config = match find_arg(&args, "--config") {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    let mut session = PipelineSession::build(config);
    let load = session.load(data_dir)?;
    if load.rows == 0 {
        bail!("no conforming data found in {data_dir}");
    }
    session.run_from_loaded()?;

    let table = session.table().context("pipeline finished without a table")?;
    log::info!("pipeline finished: {} of {} rows kept", table.len(), load.rows);
    let summary = RunSummary {
        generated_at:      Utc::now(),
        session_id:        session.session_id.to_string(),
        load,
        cleaning:          session.cleaning_report().copied(),
        risk_distribution: risk_distribution(table),
        flags:             flag_summary(table),
        top_critical:      top_critical(table, top),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, data_dir);
    }
    Ok(())
}

fn run_generate(rows: usize, seed: u64, out: &Path) -> Result<()> {
    if rows == 0 {
        bail!("--generate needs at least one row");
    }
    let mut params = SyntheticSpec { seed, senders: rows / 16 + 1, ..SyntheticSpec::default() };
    let mut records = generate(&params);
    while records.len() < rows {
        params.senders *= 2;
        records = generate(&params);
    }
    records.truncate(rows);

    std::fs::create_dir_all(out)
        .with_context(|| format!("cannot create {}", out.display()))?;
    let path = out.join(format!("synthetic_{seed}.csv"));
    write_csv_file(&records, &PipelineConfig::default().columns, &path)?;
    log::info!("generated {} rows with seed {seed}", records.len());
    println!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

// ── Summaries ──────────────────────────────────────────────────────

fn risk_distribution(table: &FeatureTable) -> Vec<ClassCount> {
    let assessments = table.risk().unwrap_or_default();
    let mut counts: Vec<ClassCount> = RiskClass::ALL
        .iter()
        .map(|class| ClassCount {
            class: class.as_str().to_string(),
            count: assessments.iter().filter(|a| a.risk_class == Some(*class)).count(),
        })
        .collect();
    counts.push(ClassCount {
        class: "unscored".into(),
        count: assessments.iter().filter(|a| a.risk_class.is_none()).count(),
    });
    counts
}

fn flag_summary(table: &FeatureTable) -> FlagSummary {
    let flags = table.flags().unwrap_or_default();
    let total = flags.len();
    let flagged = flags.iter().filter(|f| **f).count();
    let rate = if total == 0 { 0.0 } else { flagged as f64 * 100.0 / total as f64 };
    FlagSummary { total, flagged, rate }
}

/// Highest-scoring critical senders, one entry per sender.
fn top_critical(table: &FeatureTable, n: usize) -> Vec<CriticalSender> {
    let mut critical: Vec<CriticalSender> = table
        .rows()
        .filter_map(|row| {
            let risk = row.risk?;
            match (risk.risk_class, risk.risk_score) {
                (Some(RiskClass::Critical), Some(score)) => Some(CriticalSender {
                    sender_id:  row.record.sender_id.clone(),
                    risk_score: score,
                }),
                _ => None,
            }
        })
        .collect();
    critical.sort_by(|a, b| {
        b.risk_score
            .total_cmp(&a.risk_score)
            .then_with(|| a.sender_id.cmp(&b.sender_id))
    });

    let mut seen = HashSet::new();
    critical.retain(|c| seen.insert(c.sender_id.clone()));
    critical.truncate(n);
    critical
}

fn print_summary(summary: &RunSummary, data_dir: &str) {
    println!("FraudLens: fraud feature pipeline");
    println!("  data_dir:   {data_dir}");
    println!("  session:    {}", summary.session_id);
    println!();

    println!("=== LOAD ===");
    println!("  rows:         {}", summary.load.rows);
    println!("  matching:     {}", summary.load.matching.join(", "));
    if !summary.load.non_matching.is_empty() {
        println!("  non-matching: {}", summary.load.non_matching.join(", "));
    }

    if let Some(report) = &summary.cleaning {
        println!();
        println!("=== CLEANING ===");
        println!("  initial rows:   {}", report.initial_rows);
        for (pass, removed) in report.passes() {
            println!("  {pass:<22} -{removed}");
        }
        println!("  final rows:     {}", report.final_rows);
    }

    println!();
    println!("=== RISK DISTRIBUTION ===");
    for c in &summary.risk_distribution {
        println!("  {:<10} {}", c.class, c.count);
    }

    println!();
    println!("=== FLAGS ===");
    println!("  total:    {}", summary.flags.total);
    println!("  flagged:  {}", summary.flags.flagged);
    println!("  rate:     {:.2}%", summary.flags.rate);

    println!();
    println!("=== TOP CRITICAL SENDERS ===");
    if summary.top_critical.is_empty() {
        println!("  (none)");
    }
    for c in &summary.top_critical {
        println!("  {} | score {:.3}", c.sender_id, c.risk_score);
    }
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    find_arg(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn top_defaults_to_five() {
        assert_eq!(parse_arg(&args(&["fraudlens-runner"]), "--top", DEFAULT_TOP), 5);
        assert_eq!(parse_arg(&args(&["fraudlens-runner", "--top", "12"]), "--top", DEFAULT_TOP), 12);
        assert_eq!(parse_arg(&args(&["fraudlens-runner", "--top", "x"]), "--top", DEFAULT_TOP), 5);
    }

    #[test]
    fn critical_senders_are_listed_once() {
        let records = generate(&SyntheticSpec { senders: 120, outlier_rate: 0.05, ..SyntheticSpec::default() });
        let mut session = PipelineSession::build(PipelineConfig::default());
        session
            .load_raw(fraudlens_core::record::to_raw_table(&records))
            .unwrap();
        let table = session.run_from_loaded().unwrap();

        let top = top_critical(table, DEFAULT_TOP);
        assert!(top.len() <= DEFAULT_TOP);
        let unique: HashSet<&str> = top.iter().map(|c| c.sender_id.as_str()).collect();
        assert_eq!(unique.len(), top.len());
        assert!(top.windows(2).all(|w| w[0].risk_score >= w[1].risk_score));
    }
}
