use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod config;
mod models;
mod report;
mod session;
mod stats;
mod store;
mod wake;

use crate::models::SleepRecord;
use crate::report::{Baseline, OutputFormat};
use crate::store::{HistoryStore, JsonFileStore, MemoryStore};
use crate::wake::WakeDetector;

#[derive(Parser)]
#[command(name = "whoop-wake-check")]
#[command(about = "Adaptive wake detection over WHOOP sleep data", long_about = None)]
struct Cli {
    /// Sleep history file (defaults to $WHOOP_HISTORY_FILE, then the user config dir)
    #[arg(long, global = true)]
    history_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether the latest sleep means you are awake (exit code 1 if not)
    Check {
        /// Sleep JSON from the API: one sleep, an array, or a paginated page ("-" for stdin)
        #[arg(long)]
        input: PathBuf,
        /// JSON array of sleep records to use as the baseline instead of the stored history
        #[arg(long)]
        history_override: Option<PathBuf>,
        /// Score without writing the result back to history
        #[arg(long)]
        dry_run: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Bootstrap history from past sleep sessions without scoring them
    Seed {
        #[arg(long)]
        input: PathBuf,
    },
    /// Import sleep records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the stored sleep history
    History {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show the rolling baseline and thresholds for a date
    Stats {
        /// Date being evaluated; its own record is left out of the baseline
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Write the stored history to a CSV file
    Export {
        #[arg(long, default_value = "sleep_history.csv")]
        out: PathBuf,
    },
}

fn run_check<S: HistoryStore>(
    detector: &WakeDetector<S>,
    input: &std::path::Path,
    history_override: Option<&[SleepRecord]>,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let sessions = session::read_sessions(input)?;
    let candidate = session::select_candidate(&sessions)?;
    let result = detector.evaluate(candidate, history_override)?;

    print!(
        "{}",
        report::render(format, &result, report::render_wake_check)?
    );
    if format == OutputFormat::Json {
        println!();
    }

    Ok(if result.is_awake {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn read_history_override(path: &std::path::Path) -> anyhow::Result<Vec<SleepRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read history override {}", path.display()))?;
    let mut records: Vec<SleepRecord> = serde_json::from_str(&raw).with_context(|| {
        format!(
            "history override {} is not a list of sleep records",
            path.display()
        )
    })?;
    records.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(records)
}

fn main() -> anyhow::Result<ExitCode> {
    // RUST_LOG overrides the default level.
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let settings = config::Settings::resolve(cli.history_file)?;
    let history_store = JsonFileStore::new(&settings.history_file);
    log::debug!("using sleep history at {}", history_store.path().display());

    match cli.command {
        Commands::Check {
            input,
            history_override,
            dry_run,
            format,
        } => {
            let history_override = history_override
                .as_deref()
                .map(read_history_override)
                .transpose()?;

            let history_override = history_override.as_deref();
            return if dry_run {
                let detector = WakeDetector::new(MemoryStore::new(history_store.load()));
                run_check(&detector, &input, history_override, format)
            } else {
                run_check(&WakeDetector::new(history_store), &input, history_override, format)
            };
        }
        Commands::Seed { input } => {
            let sessions = session::read_sessions(&input)?;
            let detector = WakeDetector::new(history_store);
            let summary = detector.seed(&sessions)?;

            for date in summary.seeded.iter() {
                println!("- {date}: seeded");
            }
            for skipped in summary.skipped.iter() {
                println!("- {}: skipped ({})", skipped.id, skipped.reason);
            }
            println!(
                "Seeded {} sleeps, skipped {}. History now holds {} days.",
                summary.seeded.len(),
                summary.skipped.len(),
                detector.store().load().len()
            );
        }
        Commands::Import { csv } => {
            let imported = store::import_csv(&history_store, &csv)?;
            println!("Imported {imported} sleep records from {}.", csv.display());
        }
        Commands::History { format } => {
            let records = history_store.load();
            print!(
                "{}",
                report::render(format, &records, |r| report::render_history(r))?
            );
            if format == OutputFormat::Json {
                println!();
            }
        }
        Commands::Stats { date, format } => {
            let stats = stats::calculate_rolling_stats(&history_store.load(), date);
            let baseline = Baseline {
                thresholds: wake::derive_thresholds(&stats),
                stats,
            };
            print!(
                "{}",
                report::render(format, &baseline, report::render_baseline)?
            );
            if format == OutputFormat::Json {
                println!();
            }
        }
        Commands::Export { out } => {
            let records = history_store.load();
            store::export_csv(&records, &out)?;
            println!(
                "Exported {} sleep records to {}.",
                records.len(),
                out.display()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
