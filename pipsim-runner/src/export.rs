//! Reporting and export: CSV and JSON artifact generation.
//!
//! Artifact set for one run, written into an output directory:
//! - `ledger.csv`: trade table for spreadsheets and external tools
//! - `ledger.json`: the same rows, full precision
//! - `summary.json`: the [`RunReport`] (statistics, fingerprint, sessions)
//!
//! `summary.json` carries a `schema_version`; unknown versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pipsim_core::ledger::Ledger;

use crate::runner::{RunReport, SCHEMA_VERSION};

pub const LEDGER_CSV: &str = "ledger.csv";
pub const LEDGER_JSON: &str = "ledger.json";
pub const SUMMARY_JSON: &str = "summary.json";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunReport` (without its ledger) to pretty JSON.
pub fn export_summary_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}

/// Deserialize a `RunReport` from JSON, rejecting unknown schema versions.
///
/// The returned report has an empty ledger; see [`load_artifacts`].
pub fn import_summary_json(json: &str) -> Result<RunReport> {
    let report: RunReport =
        serde_json::from_str(json).context("failed to deserialize RunReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn export_ledger_json(ledger: &Ledger) -> Result<String> {
    serde_json::to_string_pretty(ledger).context("failed to serialize ledger to JSON")
}

pub fn import_ledger_json(json: &str) -> Result<Ledger> {
    serde_json::from_str(json).context("failed to deserialize ledger from JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export ledger rows as CSV.
///
/// Columns: side, entry_bar, entry_time, entry_price, exit_bar, exit_time,
/// exit_price, operating_time_ms, pips, min_pips, max_pips, exit_reason, balance
pub fn export_ledger_csv(ledger: &Ledger) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "operating_time_ms",
        "pips",
        "min_pips",
        "max_pips",
        "exit_reason",
        "balance",
    ])?;

    for r in ledger.rows() {
        wtr.write_record([
            &r.side.to_string(),
            &r.entry_bar.to_string(),
            &r.entry_time.format(TIME_FORMAT).to_string(),
            &format!("{:.6}", r.entry_price),
            &r.exit_bar.to_string(),
            &r.exit_time.format(TIME_FORMAT).to_string(),
            &format!("{:.6}", r.exit_price),
            &r.operating_time_ms.to_string(),
            &format!("{:.6}", r.pips),
            &format!("{:.6}", r.min_pips),
            &format!("{:.6}", r.max_pips),
            r.exit_reason.as_str(),
            &format!("{:.6}", r.balance),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the full artifact set into `output_dir`, creating it if needed.
///
/// Returns `output_dir`.
pub fn save_artifacts(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let write = |name: &str, contents: String| -> Result<()> {
        let path = output_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    };

    write(LEDGER_CSV, export_ledger_csv(&report.ledger)?)?;
    write(LEDGER_JSON, export_ledger_json(&report.ledger)?)?;
    write(SUMMARY_JSON, export_summary_json(report)?)?;

    Ok(output_dir.to_path_buf())
}

/// Load a `RunReport` and its ledger back from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<RunReport> {
    let read = |name: &str| -> Result<String> {
        let path = dir.join(name);
        std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
    };

    let mut report = import_summary_json(&read(SUMMARY_JSON)?)?;
    report.ledger = import_ledger_json(&read(LEDGER_JSON)?)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationFile;
    use crate::runner::run_simulation;
    use crate::sweep::SweepPolicy;

    fn sample_report() -> RunReport {
        let file = SimulationFile::from_toml(
            "[data.synthetic]\nbars = 400\nseed = 11\n[risk]\ntake_profit_pips = 2.0\n",
        )
        .unwrap();
        run_simulation(&file, SweepPolicy::FailFast).unwrap()
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let report = sample_report();
        let csv = export_ledger_csv(&report.ledger).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "side,entry_bar,entry_time,entry_price,exit_bar,exit_time,exit_price,\
             operating_time_ms,pips,min_pips,max_pips,exit_reason,balance"
        );
        assert_eq!(lines.count(), report.ledger.len());
    }

    #[test]
    fn csv_empty_ledger_is_header_only() {
        let csv = export_ledger_csv(&Ledger::new()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn summary_rejects_unknown_version() {
        let report = sample_report();
        let mut json: serde_json::Value =
            serde_json::from_str(&export_summary_json(&report).unwrap()).unwrap();
        json["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
        let err = import_summary_json(&json.to_string()).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn save_load_artifacts_roundtrip() {
        let report = sample_report();
        let dir = tempfile::tempdir().unwrap();

        let out = save_artifacts(&report, dir.path()).unwrap();
        for name in [LEDGER_CSV, LEDGER_JSON, SUMMARY_JSON] {
            assert!(out.join(name).exists(), "{name} missing");
        }

        let loaded = load_artifacts(&out).unwrap();
        assert_eq!(loaded.ledger, report.ledger);
        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.fingerprint, report.fingerprint);
        assert_eq!(loaded.data_source, report.data_source);
    }

    #[test]
    fn load_from_empty_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_artifacts(dir.path()).is_err());
    }
}
