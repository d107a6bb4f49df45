//! Monthly update CLI
//!
//! Runs one incremental forecasting cycle, or builds the initial model once
//! before the first cycle. Concurrent runs against the same artifacts must be
//! prevented by the caller (scheduler singleton or file lock).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use store_forecast::pipeline::bootstrap_initial_model;
use store_forecast::training::DEFAULT_BOOTSTRAP_CUTOFF_YEAR;
use store_forecast::{run_monthly_update, PipelineConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "monthly-update")]
#[command(about = "Incremental weekly sales forecasting per store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Args)]
struct Overrides {
    /// Monthly batch of new actuals
    #[arg(long, global = true)]
    batch: Option<PathBuf>,

    /// Master dataset
    #[arg(long, global = true)]
    master: Option<PathBuf>,

    /// Model artifact to start from (or to create when bootstrapping)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Hyperparameter record
    #[arg(long, global = true)]
    params: Option<PathBuf>,

    /// Directory for the new model artifact
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Forecast horizon in months
    #[arg(long, global = true)]
    horizon_months: Option<usize>,

    /// Boosting rounds appended per cycle
    #[arg(long, global = true)]
    boost_rounds: Option<usize>,

    /// Weeks generated per horizon month
    #[arg(long, global = true)]
    weeks_per_month: Option<usize>,

    /// Write the actual-vs-predicted table to this CSV
    #[arg(long, global = true)]
    downstream: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the monthly batch, retrain, forecast and persist
    Run,

    /// Train the initial model from the master dataset
    Bootstrap {
        /// Rows dated before this year are used for training
        #[arg(long, default_value_t = DEFAULT_BOOTSTRAP_CUTOFF_YEAR)]
        cutoff_year: i32,
    },
}

impl Overrides {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(v) = self.batch {
            config.monthly_batch_path = v;
        }
        if let Some(v) = self.master {
            config.master_path = v;
        }
        if let Some(v) = self.model {
            config.model_path = v;
        }
        if let Some(v) = self.params {
            config.params_path = v;
        }
        if let Some(v) = self.output_dir {
            config.output_dir = v;
        }
        if let Some(v) = self.horizon_months {
            config.horizon_months = v;
        }
        if let Some(v) = self.boost_rounds {
            config.boost_rounds = v;
        }
        if let Some(v) = self.weeks_per_month {
            config.weeks_per_month = v;
        }
        if let Some(v) = self.downstream {
            config.downstream_path = Some(v);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("reading configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    cli.overrides.apply(&mut config);
    config.validate()?;

    match cli.command {
        Commands::Run => {
            info!(batch = %config.monthly_batch_path.display(), "Starting monthly update");
            let report = run_monthly_update(config).context("monthly update failed")?;
            println!("{}", report);
        }
        Commands::Bootstrap { cutoff_year } => {
            info!(cutoff_year, "Bootstrapping initial model");
            let report =
                bootstrap_initial_model(&config, cutoff_year).context("bootstrap failed")?;
            println!(
                "Wrote {} ({} trees)",
                report.model_path.display(),
                report.trees
            );
        }
    }

    Ok(())
}
