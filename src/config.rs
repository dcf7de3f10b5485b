//! Job configuration.
//!
//! A [`JobConfig`] is read from TOML and then patched with command-line
//! [`Overrides`]. Every field has a default, so an empty file (or no file)
//! is a valid starting point as long as the source and sink are supplied
//! somewhere.
//!
//! ```toml
//! job_name = "weather-summary-daily"
//! project = "acme-weather"
//! region = "us-central1"
//! log_level = "info"
//!
//! [source]
//! pattern = "exports/current_weather-*.jsonl.gz"
//! before = "today"
//!
//! [sink]
//! path = "warehouse/current_weather_summary.csv"
//!
//! [execution]
//! mode = "parallel"
//! partitions = 8
//! strategy = "combine"
//! ```

use crate::error::PipelineError;
use crate::io::FileFormat;
use crate::runner::{ExecMode, Runner};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    pub job_name: String,
    pub project: Option<String>,
    pub region: Option<String>,
    pub temp_location: Option<String>,
    pub staging_location: Option<String>,
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
    /// Where to write run metrics as JSON after a successful run.
    pub metrics_path: Option<PathBuf>,
    /// Run everything but skip the sink append.
    pub dry_run: bool,
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub execution: ExecutionConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_name: "weather-summary".to_string(),
            project: None,
            region: None,
            temp_location: None,
            staging_location: None,
            log_level: "info".to_string(),
            metrics_path: None,
            dry_run: false,
            source: SourceConfig::default(),
            sink: SinkConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Glob pattern of observation files.
    pub pattern: String,
    pub format: Option<FileFormat>,
    /// `YYYY-MM-DD` or `today`.
    pub before: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    pub path: PathBuf,
    pub format: Option<FileFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    pub mode: ModeSetting,
    pub threads: Option<usize>,
    pub partitions: Option<usize>,
    pub strategy: Strategy,
}

impl ExecutionConfig {
    pub fn exec_mode(&self) -> ExecMode {
        match self.mode {
            ModeSetting::Sequential => ExecMode::Sequential,
            ModeSetting::Parallel => ExecMode::Parallel {
                threads: self.threads,
                partitions: self.partitions,
            },
        }
    }

    pub fn runner(&self) -> Runner {
        Runner::new(self.exec_mode())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    Sequential,
    #[default]
    Parallel,
}

/// How measurements are reduced per key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Materialize each group, then average it.
    #[default]
    Group,
    /// Fold partial sums per partition and merge them per key.
    Combine,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Group => "group",
            Strategy::Combine => "combine",
        })
    }
}

/// Values supplied on the command line. `Some` fields replace file values.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<String>,
    pub sink: Option<PathBuf>,
    pub before: Option<String>,
    pub mode: Option<ModeSetting>,
    pub threads: Option<usize>,
    pub partitions: Option<usize>,
    pub strategy: Option<Strategy>,
    pub log_level: Option<String>,
    pub metrics_path: Option<PathBuf>,
    pub dry_run: bool,
}

impl JobConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, PipelineError> {
        toml::from_str(contents).map_err(|e| PipelineError::config(format!("invalid job config: {e}")))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg = Self::from_toml_str(&contents)
            .with_context(|| format!("load config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn apply(&mut self, o: Overrides) {
        if let Some(v) = o.source {
            self.source.pattern = v;
        }
        if let Some(v) = o.sink {
            self.sink.path = v;
        }
        if let Some(v) = o.before {
            self.source.before = Some(v);
        }
        if let Some(v) = o.mode {
            self.execution.mode = v;
        }
        if let Some(v) = o.threads {
            self.execution.threads = Some(v);
        }
        if let Some(v) = o.partitions {
            self.execution.partitions = Some(v);
        }
        if let Some(v) = o.strategy {
            self.execution.strategy = v;
        }
        if let Some(v) = o.log_level {
            self.log_level = v;
        }
        if let Some(v) = o.metrics_path {
            self.metrics_path = Some(v);
        }
        if o.dry_run {
            self.dry_run = true;
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.job_name.trim().is_empty() {
            return Err(PipelineError::config("job_name must not be empty"));
        }
        if self.source.pattern.trim().is_empty() {
            return Err(PipelineError::config("source.pattern must not be empty"));
        }
        if self.sink.path.as_os_str().is_empty() {
            return Err(PipelineError::config("sink.path must not be empty"));
        }
        if self.execution.threads == Some(0) {
            return Err(PipelineError::config("execution.threads must be at least 1"));
        }
        if self.execution.partitions == Some(0) {
            return Err(PipelineError::config("execution.partitions must be at least 1"));
        }
        self.cutoff_on(Local::now().date_naive())?;
        Ok(())
    }

    /// The source cut-off date, with `today` resolved against `today`.
    pub fn cutoff_on(&self, today: NaiveDate) -> Result<Option<NaiveDate>, PipelineError> {
        match self.source.before.as_deref().map(str::trim) {
            None => Ok(None),
            Some(s) if s.eq_ignore_ascii_case("today") => Ok(Some(today)),
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Some).map_err(|_| {
                PipelineError::config(format!(
                    "source.before {s:?} is neither YYYY-MM-DD nor \"today\""
                ))
            }),
        }
    }

    /// The source cut-off date, with `today` meaning the local current date.
    pub fn cutoff(&self) -> Result<Option<NaiveDate>, PipelineError> {
        self.cutoff_on(Local::now().date_naive())
    }
}
