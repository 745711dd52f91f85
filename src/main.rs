use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use layoffs_cleaner::app::ports::ReportSinkPort;
use layoffs_cleaner::app::CleanLayoffsUseCase;
use layoffs_cleaner::config::CleaningConfig;
use layoffs_cleaner::constants::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_LOG_DIR, LOG_DIR_ENV, METRICS_ADDR_ENV};
use layoffs_cleaner::infra::{CsvFileSink, CsvFileSource, JsonReportAdapter, LogReportAdapter};
use layoffs_cleaner::observability::{init_logging, metrics};
use layoffs_cleaner::pipeline::CleaningPipeline;

#[derive(Parser)]
#[command(name = "layoffs_cleaner")]
#[command(about = "Cleans the layoffs dataset into an analysis-ready table")]
#[command(version = "0.1.0")]
struct Cli {
    /// Cleaning config file (TOML). Falls back to built-in defaults when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw CSV table and commit the result
    Run {
        /// Raw layoffs CSV
        input: PathBuf,
        /// Where the clean CSV is committed
        output: PathBuf,
        /// Write the JSON run report here; otherwise it is only logged
        #[arg(long)]
        report: Option<PathBuf>,
        /// Fail without committing when the clean set has consistency violations
        #[arg(long)]
        strict: bool,
        /// Run every stage but do not commit the clean table
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a config file and exit
    CheckConfig,
    /// Print the effective config as TOML
    PrintConfig,
}

impl Commands {
    /// Only a cleaning run writes log files
    fn writes_logs(&self) -> bool {
        matches!(self, Commands::Run { .. })
    }
}

/// Resolve the config: explicit flag, then env, then the default path if present
fn load_config(flag: Option<PathBuf>) -> anyhow::Result<CleaningConfig> {
    let explicit = flag.or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

    match explicit {
        Some(path) => CleaningConfig::load(&path).with_context(|| format!("Loading {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            CleaningConfig::load(DEFAULT_CONFIG_PATH).with_context(|| format!("Loading {}", DEFAULT_CONFIG_PATH))
        }
        None => {
            info!("No config file found, using built-in defaults");
            Ok(CleaningConfig::default())
        }
    }
}

fn metrics_addr() -> anyhow::Result<Option<SocketAddr>> {
    match std::env::var(METRICS_ADDR_ENV) {
        Ok(addr) if !addr.trim().is_empty() => Ok(Some(
            addr.trim()
                .parse()
                .with_context(|| format!("{} is not a socket address: {}", METRICS_ADDR_ENV, addr))?,
        )),
        _ => Ok(None),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let _guard = if cli.command.writes_logs() {
        let log_dir = std::env::var(LOG_DIR_ENV).unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
        Some(init_logging(Path::new(&log_dir))?)
    } else {
        None
    };

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::CheckConfig => {
            config.validate()?;
            println!("✅ Config is valid");
        }
        Commands::PrintConfig => {
            print!("{}", config.to_toml_string()?);
        }
        Commands::Run {
            input,
            output,
            report,
            strict,
            dry_run,
        } => {
            metrics::init(metrics_addr()?).map_err(anyhow::Error::msg)?;

            let report_sink: Box<dyn ReportSinkPort> = match report {
                Some(path) => Box::new(JsonReportAdapter::new(path)),
                None => Box::new(LogReportAdapter),
            };

            let use_case = CleanLayoffsUseCase::new(
                CleaningPipeline::new(&config)?,
                Box::new(CsvFileSource::new(&input, config.input.null_markers.clone())),
                Box::new(CsvFileSink::new(&output)),
            )
            .with_report_sink(report_sink)
            .strict(strict)
            .dry_run(dry_run);

            match use_case.execute().await {
                Ok(outcome) => {
                    let report = &outcome.report;
                    println!("\n📊 Cleaning results:");
                    println!("   Raw records: {}", report.counts.raw);
                    println!("   After dedup: {}", report.counts.staged);
                    println!("   Clean records: {}", report.counts.clean);
                    println!("   Date parse failures: {}", report.date_parse_failures);
                    println!("   Output digest: {}", report.output_digest);
                    if !report.is_consistent() {
                        println!("\n⚠️  Consistency violations:");
                        for violation in &report.violations {
                            println!("   - {}", violation);
                        }
                    }
                    if !dry_run {
                        println!("   Output file: {}", output.display());
                    }
                    if let Some(snapshot) = metrics::render() {
                        debug!("Metrics at end of run:\n{}", snapshot);
                    }
                }
                Err(e) => {
                    error!("Cleaning run failed: {:#}", e);
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_run_sets_up_log_files() {
        let run = Cli::try_parse_from(["layoffs_cleaner", "run", "raw.csv", "clean.csv"]).unwrap();
        assert!(run.command.writes_logs());

        for command in ["print-config", "check-config"] {
            let cli = Cli::try_parse_from(["layoffs_cleaner", command]).unwrap();
            assert!(!cli.command.writes_logs());
        }
    }

    #[test]
    fn help_is_handled_by_clap() {
        let err = Cli::try_parse_from(["layoffs_cleaner", "--help"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
