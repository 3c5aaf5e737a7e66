//! PipSim CLI: run, check and debounce commands.
//!
//! Commands:
//! - `run`: simulate a TOML config over CSV or synthetic bars and save artifacts
//! - `check`: validate a TOML config without loading data
//! - `debounce`: print the debounced buy/sell flags of a CSV file

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use pipsim_core::components::debounce;
use pipsim_runner::{
    load_csv, run_simulation, save_artifacts, RunReport, SimulationFile, SweepPolicy,
    SyntheticConfig,
};

const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Parser)]
#[command(name = "pipsim", about = "PipSim CLI: signal-driven trade simulation")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Bar CSV file; overrides `[data] path`.
        #[arg(long, conflicts_with = "synthetic")]
        data: Option<PathBuf>,

        /// Run on this many synthetic bars instead of the configured data.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Output directory for the ledger and summary.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip sessions that abort instead of stopping the run.
        #[arg(long, default_value_t = false)]
        continue_on_error: bool,
    },
    /// Validate a TOML config file.
    Check {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Print debounced buy/sell flags of a CSV file as CSV.
    Debounce {
        /// Bar CSV file.
        #[arg(long)]
        data: PathBuf,

        /// Buy flag column.
        #[arg(long, default_value = "buy")]
        buy: String,

        /// Sell flag column.
        #[arg(long, default_value = "sell")]
        sell: String,

        /// chrono format of the timestamp column.
        #[arg(long, default_value = DEFAULT_TIMESTAMP_FORMAT)]
        timestamp_format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            data,
            synthetic,
            output_dir,
            continue_on_error,
        } => run_cmd(&config, data, synthetic, &output_dir, continue_on_error),
        Commands::Check { config } => check_cmd(&config),
        Commands::Debounce {
            data,
            buy,
            sell,
            timestamp_format,
        } => debounce_cmd(&data, &buy, &sell, &timestamp_format),
    }
}

/// Logs go to stderr so `debounce` output stays pipeable. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn run_cmd(
    config_path: &Path,
    data: Option<PathBuf>,
    synthetic: Option<usize>,
    output_dir: &Path,
    continue_on_error: bool,
) -> Result<()> {
    let mut file = SimulationFile::from_file(config_path)?;

    if let Some(path) = data {
        file.data.path = Some(path);
    }
    if let Some(bars) = synthetic {
        file.data.path = None;
        let mut synth = file.data.synthetic.take().unwrap_or_default();
        synth.bars = bars;
        file.data.synthetic = Some(synth);
    }

    let policy = if continue_on_error {
        SweepPolicy::Continue
    } else {
        SweepPolicy::FailFast
    };

    let report = run_simulation(&file, policy)?;
    print_summary(&report);

    let dir = save_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", dir.display());

    if !report.failures.is_empty() {
        bail!("{} session(s) failed", report.failures.len());
    }
    Ok(())
}

fn check_cmd(config_path: &Path) -> Result<()> {
    let file = SimulationFile::from_file(config_path)?;
    let config = file.validate()?;

    println!("Config OK: {}", config_path.display());
    println!("  config hash: {}", config.config_hash());
    match (&file.data.path, &file.data.synthetic) {
        (Some(path), _) => println!("  data:        {}", path.display()),
        (None, Some(SyntheticConfig { bars, seed, .. })) => {
            println!("  data:        synthetic ({bars} bars, seed {seed})")
        }
        (None, None) => {}
    }
    Ok(())
}

fn debounce_cmd(path: &Path, buy: &str, sell: &str, timestamp_format: &str) -> Result<()> {
    let data = load_csv(path, timestamp_format)?;

    let raw = data
        .bars
        .iter()
        .enumerate()
        .map(|(i, bar)| match (bar.flag(buy), bar.flag(sell)) {
            (Some(b), Some(s)) => Ok((b, s)),
            _ => bail!("bar {i}: flag column '{buy}' or '{sell}' is missing"),
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("reading flags from {}", path.display()))?;

    println!("timestamp,{buy},{sell}");
    for (bar, (b, s)) in data.bars.iter().zip(debounce(&raw)) {
        println!("{},{b},{s}", bar.timestamp.format(timestamp_format));
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("{}", render_summary(report));
    println!();
}

/// Summary block; labels are padded to a 16-column value position.
fn render_summary(report: &RunReport) -> String {
    let s = &report.summary;
    let mut lines = vec![
        "=== Simulation Result ===".to_string(),
        format!("Bars:           {}", report.bar_count),
        format!("Sessions:       {}", report.sessions.len()),
        format!("Signals:        {}", report.signal_count),
        format!("Skipped:        {}", report.skipped_entries),
        format!("Trades:         {}", s.trade_count),
        String::new(),
        "--- Pips ---".to_string(),
        format!("Total:          {:.4}", s.total_pips),
        format!("Average:        {:.4}", s.avg_pips),
        format!("Best / Worst:   {:.4} / {:.4}", s.best_pips, s.worst_pips),
        format!("Win Rate:       {:.1}%", s.win_rate * 100.0),
        format!("Profit Factor:  {:.2}", s.profit_factor),
        format!("Max Drawdown:   {:.4}", s.max_drawdown_pips),
        format!("Max Consec Win: {}", s.max_consecutive_wins),
        format!("Max Consec Loss: {}", s.max_consecutive_losses),
        format!("Avg Hold:       {:.1}s", s.avg_operating_secs),
        format!("Reversal Est.:  {:.4}", report.reversal_estimate_pips),
    ];
    if !s.exit_reasons.is_empty() {
        lines.push(String::new());
        lines.push("--- Exits ---".to_string());
        for (reason, count) in &s.exit_reasons {
            lines.push(format!("{:<15} {count}", reason.as_str()));
        }
    }
    lines.push(String::new());
    lines.push(format!("Ledger hash:    {}", report.fingerprint.ledger_hash));
    if report.is_synthetic() {
        lines.push(String::new());
        lines.push("WARNING: Results based on SYNTHETIC data".to_string());
    }
    for failure in &report.failures {
        lines.push(format!(
            "WARNING: session {} (bars {}..{}) skipped at bar {}: {}",
            failure.index, failure.start, failure.end, failure.bar_index, failure.error
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_report() -> RunReport {
        let file = SimulationFile::from_toml("[data.synthetic]\nbars = 300\n").unwrap();
        run_simulation(&file, SweepPolicy::FailFast).unwrap()
    }

    #[test]
    fn summary_labels_separate_from_values() {
        let text = render_summary(&synthetic_report());
        for line in text.lines().filter(|l| l.contains(':') && !l.starts_with("WARNING")) {
            let (label, value) = line.split_once(':').unwrap();
            assert!(value.starts_with(' '), "label '{label}' runs into its value");
        }
        assert!(text.contains("Max Consec Loss: "));
    }

    #[test]
    fn summary_flags_synthetic_data() {
        let text = render_summary(&synthetic_report());
        assert!(text.contains("WARNING: Results based on SYNTHETIC data"));
        assert!(text.starts_with("=== Simulation Result ==="));
    }
}
