//! Job driver: source -> summary pipeline -> sink.
//!
//! The driver is the only place that logs. It announces the run, reports
//! counts as they become known, and on failure logs the error chain once and
//! returns it unchanged. Rows are appended only after the whole pipeline has
//! produced them, so a failed run leaves the sink untouched.

use crate::config::{JobConfig, Strategy};
use crate::error::PipelineError;
use crate::sink::TableSink;
use crate::source::ObservationSource;
use crate::weather::{
    Aggregate, Averager, GroupKey, KeyExtractor, Measurement, RawObservation, Row, RowFormatter,
};
use crate::{PCollection, Pipeline, Runner, from_vec};
use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{error, info};

pub const STEP_EXTRACT: &str = "Extract Key";
pub const STEP_GROUP: &str = "Group by city+date";
pub const STEP_AVERAGE: &str = "Compute Averages";
pub const STEP_COMBINE: &str = "Combine Averages";
pub const STEP_FORMAT: &str = "Format Output";

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub records_read: usize,
    pub groups: usize,
    pub rows_written: usize,
    pub dry_run: bool,
    pub elapsed: Duration,
}

/// Attach the summary stages to a collection of raw observations.
pub fn build_summary(
    observations: PCollection<RawObservation>,
    strategy: Strategy,
) -> PCollection<Row> {
    let keyed = observations
        .try_map(|r: &RawObservation| KeyExtractor.extract(r))
        .named(STEP_EXTRACT);

    let averaged = match strategy {
        Strategy::Group => keyed
            .group_by_key()
            .named(STEP_GROUP)
            .try_map_values(|key: &GroupKey, group: &Vec<Measurement>| {
                Averager.average(group).map_err(|e| e.with_key(key))
            })
            .named(STEP_AVERAGE),
        Strategy::Combine => keyed.combine_values(Averager).named(STEP_COMBINE),
    };

    averaged
        .map(|kv: &(GroupKey, Aggregate)| RowFormatter.format_pair(kv))
        .named(STEP_FORMAT)
}

/// Run the summary over in-memory observations and return rows sorted by
/// `(city, date)`.
pub fn summarize(
    observations: Vec<RawObservation>,
    strategy: Strategy,
    runner: &Runner,
) -> Result<Vec<Row>> {
    let p = Pipeline::default();
    summarize_in(&p, observations, strategy, runner)
}

fn summarize_in(
    p: &Pipeline,
    observations: Vec<RawObservation>,
    strategy: Strategy,
    runner: &Runner,
) -> Result<Vec<Row>> {
    let mut rows = build_summary(from_vec(p, observations), strategy).collect_with(runner)?;
    rows.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(rows)
}

/// Run the configured job end to end.
pub fn run(config: &JobConfig) -> Result<RunSummary> {
    info!(
        job = %config.job_name,
        project = config.project.as_deref().unwrap_or("-"),
        region = config.region.as_deref().unwrap_or("-"),
        temp_location = config.temp_location.as_deref().unwrap_or("-"),
        staging_location = config.staging_location.as_deref().unwrap_or("-"),
        source = %config.source.pattern,
        sink = %config.sink.path.display(),
        mode = ?config.execution.mode,
        strategy = %config.execution.strategy,
        dry_run = config.dry_run,
        "Starting weather summary pipeline..."
    );

    match execute(config) {
        Ok(summary) => {
            info!(
                records = summary.records_read,
                groups = summary.groups,
                rows = summary.rows_written,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "Pipeline completed successfully."
            );
            Ok(summary)
        }
        Err(err) => {
            let kind = err
                .downcast_ref::<PipelineError>()
                .map_or("io", PipelineError::kind);
            let chain = format!("{err:#}");
            error!(job = %config.job_name, kind, error = %chain, "Pipeline failed");
            Err(err)
        }
    }
}

fn execute(config: &JobConfig) -> Result<RunSummary> {
    config.validate()?;
    let started = Instant::now();

    let sink = if config.dry_run {
        None
    } else {
        Some(TableSink::open(&config.sink.path, config.sink.format)?)
    };

    let observations = ObservationSource::new(config.source.pattern.clone())
        .with_format(config.source.format)
        .fetched_before(config.cutoff()?)
        .read_all()?;
    let records_read = observations.len();
    info!(records = records_read, "read observations");

    let p = Pipeline::default();
    #[cfg(feature = "metrics")]
    let metrics = {
        let m = crate::metrics::MetricsCollector::new();
        m.describe("job.records_read", "observations read from the source");
        m.describe("job.groups", "distinct city/day groups");
        m.describe("job.rows_written", "rows appended to the sink");
        p.set_metrics(m.clone());
        m.record_start();
        m
    };

    let rows = summarize_in(&p, observations, config.execution.strategy, &config.execution.runner())?;
    let groups = rows.len();
    info!(groups, "computed averages");

    let rows_written = match &sink {
        Some(sink) => sink.append(&rows)?,
        None => {
            for row in &rows {
                info!(
                    city = %row.city,
                    date = %row.date,
                    avg_temperature = ?row.avg_temperature,
                    avg_windspeed = ?row.avg_windspeed,
                    "dry run row"
                );
            }
            0
        }
    };

    #[cfg(feature = "metrics")]
    {
        metrics.record_end();
        metrics.set_counter("job.records_read", records_read as u64);
        metrics.set_counter("job.groups", groups as u64);
        metrics.set_counter("job.rows_written", rows_written as u64);
        if let Some(path) = &config.metrics_path {
            metrics.save_to_file(path)?;
            info!(path = %path.display(), "saved run metrics");
        }
    }
    #[cfg(not(feature = "metrics"))]
    if config.metrics_path.is_some() {
        tracing::warn!("metrics_path is set but the `metrics` feature is disabled");
    }

    Ok(RunSummary {
        records_read,
        groups,
        rows_written,
        dry_run: config.dry_run,
        elapsed: started.elapsed(),
    })
}
