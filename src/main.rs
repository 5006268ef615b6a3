use anyhow::Context;
use clap::Parser;
use execcost::config::Config;
use execcost::error::AppError;
use execcost::fees::{FeeOracle, FeeSchedule, ZeroFees};
use execcost::report::{render, CostReport, ReportOptions};
use execcost::{Analyzer, LogFileSource};
use std::sync::Arc;

/// Rebuild per-intent trading costs from request/fill logs.
#[derive(Parser, Debug)]
#[command(name = "execcost")]
#[command(about = "Trading cost reconstruction from request/fill logs")]
#[command(version)]
struct Cli {
    /// Cost logs to read, in order (`.lz4` is decompressed). Overrides COST_LOG_FILES.
    files: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().map_err(AppError::from)?;
    if !cli.files.is_empty() {
        config.log_files = cli.files;
    }
    if config.log_files.is_empty() {
        return Err(AppError::NoInput.into());
    }

    let fees: Arc<dyn FeeOracle> = match &config.fee_tables {
        Some(tables) => Arc::new(
            FeeSchedule::load(&tables.brokerage, &tables.global, &tables.exchanges)
                .map_err(AppError::from)
                .context("loading fee tables")?,
        ),
        None => {
            tracing::warn!("No fee tables configured, fills carry zero fees");
            Arc::new(ZeroFees)
        }
    };

    let source = LogFileSource::new(config.log_files.clone(), fees)
        .with_crossing_opp(config.crossing_opp)
        .with_policy(config.malformed_policy);

    let outcome = Analyzer::new(config.end_of_session)
        .analyze(&source)
        .await
        .map_err(AppError::from)?;

    let report = CostReport::build(
        &outcome,
        ReportOptions {
            time_bucket_secs: config.time_bucket_secs,
            top_symbols: config.top_symbols,
        },
    );
    let text = render(&report, config.report_mode).map_err(AppError::from)?;
    println!("{}", text);

    Ok(())
}
