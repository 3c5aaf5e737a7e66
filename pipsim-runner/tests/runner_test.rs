//! Integration tests for the runner: TOML file + CSV bars → report → artifacts.
//!
//! 1. Take-profit, stop-loss and trailing scenarios loaded from disk
//! 2. Daily sessions on bid/ask quotes
//! 3. FailFast vs Continue on sessions with a missing quote or price
//! 4. Artifact save/load
//! 5. Missing data file

use std::path::Path;

use pipsim_core::domain::{ExitReason, Side};
use pipsim_runner::{
    load_artifacts, run_simulation, save_artifacts, RunError, SimulationFile, SweepPolicy,
};

const SCENARIO_CSV: &str = "\
timestamp,open,high,low,close,buy,sell
2022-03-15 10:00:00,100,100,100,100,true,false
2022-03-15 10:00:05,108,108,108,108,false,false
2022-03-15 10:00:10,103,103,103,103,false,false
2022-03-15 10:00:15,95,95,95,95,false,false
";

/// Two trading days; each opens with a buy flag and drifts.
const TWO_DAY_CSV: &str = "\
timestamp,bid,ask,last,buy,sell
2022-03-15 09:00:00,99.9,100.1,100.0,true,false
2022-03-15 09:00:01,101.9,102.1,102.0,true,false
2022-03-15 09:00:02,102.9,103.1,103.0,false,false
2022-03-16 09:00:00,109.9,110.1,110.0,false,true
2022-03-16 09:00:01,107.9,108.1,108.0,false,false
2022-03-16 09:00:02,104.9,105.1,105.0,false,false
";

fn write_case(dir: &Path, csv: &str, toml_body: &str) -> SimulationFile {
    let data = dir.join("bars.csv");
    std::fs::write(&data, csv).unwrap();
    let toml = format!(
        "[data]\npath = \"{}\"\n{toml_body}",
        data.display().to_string().replace('\\', "/")
    );
    let config = dir.join("sim.toml");
    std::fs::write(&config, toml).unwrap();
    SimulationFile::from_file(&config).unwrap()
}

// ── 1. Risk scenarios ──

#[test]
fn take_profit_scenario_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_case(
        dir.path(),
        SCENARIO_CSV,
        r#"
[risk]
take_profit_pips = 8.0

[execution]
price = { type = "single_field", field = "close" }
"#,
    );

    let report = run_simulation(&file, SweepPolicy::FailFast).unwrap();
    assert_eq!(report.bar_count, 4);
    assert_eq!(report.ledger.len(), 1);

    let row = &report.ledger.rows()[0];
    assert_eq!(row.side, Side::Buy);
    assert_eq!(row.exit_bar, 1);
    assert_eq!(row.exit_reason, ExitReason::TakeProfit);
    assert!((row.pips - 8.0).abs() < 1e-10);
    assert!((row.balance - 8.0).abs() < 1e-10);
    assert_eq!(report.summary.exit_reasons[&ExitReason::TakeProfit], 1);
    // Single buy flag, never reversed: the estimate realizes nothing.
    assert_eq!(report.reversal_estimate_pips, 0.0);
}

#[test]
fn stop_loss_and_trailing_scenarios_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let price = "[execution]\nprice = { type = \"single_field\", field = \"close\" }\n";

    let stop = write_case(
        dir.path(),
        SCENARIO_CSV,
        &format!("[risk]\nstop_loss_pips = 4.0\n{price}"),
    );
    let report = run_simulation(&stop, SweepPolicy::FailFast).unwrap();
    assert!((report.ledger.rows()[0].pips + 5.0).abs() < 1e-10);
    assert_eq!(report.ledger.rows()[0].exit_reason, ExitReason::StopLoss);

    let trail = write_case(
        dir.path(),
        SCENARIO_CSV,
        &format!("[risk]\ntrailing_stop_pips = 3.0\n{price}"),
    );
    let report = run_simulation(&trail, SweepPolicy::FailFast).unwrap();
    let row = &report.ledger.rows()[0];
    assert_eq!(row.exit_bar, 2);
    assert!((row.pips - 3.0).abs() < 1e-10);
    assert_eq!(row.exit_reason, ExitReason::TrailingStop);
}

// ── 2. Daily sessions ──

#[test]
fn daily_sessions_on_tick_quotes() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_case(
        dir.path(),
        TWO_DAY_CSV,
        "session = \"daily\"\n[execution]\nprice = { type = \"bid_ask\" }\n",
    );

    let report = run_simulation(&file, SweepPolicy::FailFast).unwrap();
    assert_eq!(report.sessions.len(), 2);
    assert_eq!(report.ledger.len(), 2);

    let rows = report.ledger.rows();
    // Day 1: long at ask 100.1, force-closed at bid 102.9.
    assert_eq!(rows[0].side, Side::Buy);
    assert!((rows[0].pips - 2.8).abs() < 1e-9);
    assert_eq!(rows[0].exit_reason, ExitReason::EndOfData);
    // Day 2: short at bid 109.9, force-closed at ask 105.1; bars indexed globally.
    assert_eq!(rows[1].side, Side::Sell);
    assert_eq!((rows[1].entry_bar, rows[1].exit_bar), (3, 5));
    assert!((rows[1].pips - 4.8).abs() < 1e-9);
    assert!((rows[1].balance - 7.6).abs() < 1e-9);
}

// ── 3. Sweep policy ──

#[test]
fn continue_policy_reports_bad_day() {
    let dir = tempfile::tempdir().unwrap();
    // Day 2 is short; its exit quote (ask) is blank on the second bar.
    let csv = TWO_DAY_CSV.replace("107.9,108.1,108.0", "107.9,,108.0");
    let file = write_case(
        dir.path(),
        &csv,
        "session = \"daily\"\n[execution]\nprice = { type = \"bid_ask\" }\n",
    );

    let err = run_simulation(&file, SweepPolicy::FailFast).unwrap_err();
    assert!(matches!(err, RunError::Session(_)));

    let report = run_simulation(&file, SweepPolicy::Continue).unwrap();
    assert_eq!(report.ledger.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].bar_index, 4);
    assert!(report.failures[0].error.contains("'ask'"));
}

#[test]
fn continue_policy_survives_blank_price_on_signal_bar() {
    let dir = tempfile::tempdir().unwrap();
    // Day 2 opens on a sell flag whose close is blank.
    let csv = "\
timestamp,open,high,low,close,buy,sell
2022-03-15 10:00:00,100,100,100,100,true,false
2022-03-15 10:00:05,103,103,103,103,false,false
2022-03-16 10:00:00,99,99,99,,false,true
2022-03-16 10:00:05,98,98,98,98,false,false
";
    let file = write_case(
        dir.path(),
        csv,
        "session = \"daily\"\n[execution]\nprice = { type = \"single_field\", field = \"close\" }\n",
    );

    assert!(matches!(
        run_simulation(&file, SweepPolicy::FailFast),
        Err(RunError::Session(_))
    ));

    let report = run_simulation(&file, SweepPolicy::Continue).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].bar_index, 2);
    assert!(report.failures[0].error.contains("'close'"));
    assert_eq!(report.ledger.len(), 1);
    assert!((report.ledger.rows()[0].pips - 3.0).abs() < 1e-10);
    assert_eq!(report.sessions.len(), 1);
    assert_eq!(report.sessions[0].reversal_estimate_pips, Some(0.0));
}

// ── 4. Artifacts ──

#[test]
fn artifacts_roundtrip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_case(
        dir.path(),
        SCENARIO_CSV,
        "[risk]\nstop_loss_pips = 4.0\n[execution]\nslippage = 0.5\n",
    );
    let report = run_simulation(&file, SweepPolicy::FailFast).unwrap();

    let out = save_artifacts(&report, &dir.path().join("out")).unwrap();
    let csv = std::fs::read_to_string(out.join("ledger.csv")).unwrap();
    assert!(csv.lines().nth(1).unwrap().starts_with("BUY,0,2022-03-15 10:00:00.000,"));

    let loaded = load_artifacts(&out).unwrap();
    assert_eq!(loaded.ledger, report.ledger);
    assert_eq!(loaded.fingerprint, report.fingerprint);
}

// ── 5. Data errors ──

#[test]
fn missing_data_file_is_a_data_error() {
    let file = SimulationFile::from_toml("[data]\npath = \"/nonexistent/bars.csv\"\n").unwrap();
    assert!(matches!(
        run_simulation(&file, SweepPolicy::FailFast),
        Err(RunError::Data(_))
    ));
}
