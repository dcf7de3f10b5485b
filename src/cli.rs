use crate::config::{JobConfig, ModeSetting, Overrides, Strategy};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "weather-summary")]
#[command(about = "Per-city, per-day average temperature and windspeed", long_about = None)]
#[command(version)]
pub struct Cli {
    /// TOML job configuration
    #[arg(short, long, env = "WEATHER_SUMMARY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Glob pattern of observation files (JSONL or CSV, optionally .gz)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Existing summary table to append to
    #[arg(long)]
    pub sink: Option<PathBuf>,

    /// Only use readings fetched before this day (YYYY-MM-DD or "today")
    #[arg(long)]
    pub before: Option<String>,

    /// Execution mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeSetting>,

    /// Worker threads for parallel mode
    #[arg(long)]
    pub threads: Option<usize>,

    /// Source partitions for parallel mode
    #[arg(long)]
    pub partitions: Option<usize>,

    /// Per-key reduction strategy
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write run metrics as JSON to this file
    #[arg(long = "metrics")]
    pub metrics: Option<PathBuf>,

    /// Compute and log rows without appending them
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Load the config file (if any), apply the flags on top and validate
    /// the result.
    pub fn job_config(&self) -> Result<JobConfig> {
        let mut config = match &self.config {
            Some(path) => JobConfig::load(path)?,
            None => JobConfig::default(),
        };
        config.apply(self.overrides());
        config.validate()?;
        Ok(config)
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            source: self.source.clone(),
            sink: self.sink.clone(),
            before: self.before.clone(),
            mode: self.mode,
            threads: self.threads,
            partitions: self.partitions,
            strategy: self.strategy,
            log_level: self.log_level.clone(),
            metrics_path: self.metrics.clone(),
            dry_run: self.dry_run,
        }
    }
}
