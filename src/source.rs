//! Observation source: files matched by a glob, read into a pipeline.
//!
//! An optional cut-off keeps only readings whose `fetched_at` day is strictly
//! before a given date. Readings with an unparseable `fetched_at` are kept so
//! the key extractor reports them instead of them vanishing here.

use crate::io::glob::expand_glob_required;
use crate::io::{FileFormat, read_records};
use crate::weather::{CsvObservation, FieldValue, RawObservation, observation_date};
use crate::{PCollection, Pipeline, from_vec};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ObservationSource {
    pattern: String,
    format: Option<FileFormat>,
    before: Option<NaiveDate>,
}

impl ObservationSource {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            format: None,
            before: None,
        }
    }

    /// Force a record format instead of inferring it per file.
    #[must_use]
    pub fn with_format(mut self, format: Option<FileFormat>) -> Self {
        self.format = format;
        self
    }

    /// Keep only readings fetched before `cutoff`.
    #[must_use]
    pub fn fetched_before(mut self, cutoff: Option<NaiveDate>) -> Self {
        self.before = cutoff;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Matching files in read order.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        expand_glob_required(&self.pattern)
    }

    /// Read every matching file and apply the cut-off.
    pub fn read_all(&self) -> Result<Vec<RawObservation>> {
        let mut out = Vec::new();
        for path in self.files()? {
            let format = FileFormat::resolve(self.format, &path)?;
            let records = read_observations(&path, format)
                .with_context(|| format!("read observations from {}", path.display()))?;
            debug!(file = %path.display(), %format, records = records.len(), "read source file");
            out.extend(records);
        }

        if let Some(cutoff) = self.before {
            let total = out.len();
            out.retain(|r| fetched_before(r, cutoff));
            info!(%cutoff, kept = out.len(), dropped = total - out.len(), "applied fetch cut-off");
        }
        Ok(out)
    }

    /// Read the source into `p` as a collection of raw observations.
    pub fn read(&self, p: &Pipeline) -> Result<PCollection<RawObservation>> {
        Ok(from_vec(p, self.read_all()?))
    }
}

/// CSV cells are read as text so type checks stay with the key extractor.
fn read_observations(path: &Path, format: FileFormat) -> Result<Vec<RawObservation>> {
    match format {
        FileFormat::Csv => Ok(read_records::<CsvObservation>(path, format)?
            .into_iter()
            .map(RawObservation::from)
            .collect()),
        FileFormat::Jsonl => read_records(path, format),
    }
}

/// Cut-off predicate. Unparseable or missing timestamps pass.
pub fn fetched_before(record: &RawObservation, cutoff: NaiveDate) -> bool {
    match record
        .fetched_at
        .as_ref()
        .and_then(FieldValue::as_text)
        .and_then(observation_date)
    {
        Some(day) => day < cutoff,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn cutoff_is_strict_and_lets_bad_timestamps_through() {
        let cutoff = day("2024-03-02");
        assert!(fetched_before(&RawObservation::new("NYC", 1.0, 1.0, "2024-03-01T23:59:59"), cutoff));
        assert!(!fetched_before(&RawObservation::new("NYC", 1.0, 1.0, "2024-03-02T00:00:00"), cutoff));
        assert!(fetched_before(&RawObservation::new("NYC", 1.0, 1.0, "whenever"), cutoff));
        assert!(fetched_before(&RawObservation::default(), cutoff));
    }

    #[test]
    fn reads_every_matching_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path().join("a.jsonl"),
            "{\"city\":\"NYC\",\"temperature\":10,\"windspeed\":5,\"fetched_at\":\"2024-03-01T08:00:00Z\"}\n",
        )?;
        std::fs::write(
            dir.path().join("b.csv"),
            "city,temperature,windspeed,fetched_at\nLA,30,2,2024-03-01 08:00:00 UTC\nLA,31,3,2024-03-05 08:00:00 UTC\n",
        )?;

        let all = ObservationSource::new(format!("{}/*", dir.path().display())).read_all()?;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].city.as_ref().and_then(FieldValue::as_text), Some("NYC"));

        let early = ObservationSource::new(format!("{}/*", dir.path().display()))
            .fetched_before(Some(day("2024-03-02")))
            .read_all()?;
        assert_eq!(early.len(), 2);
        Ok(())
    }

    #[test]
    fn read_attaches_a_source_node() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("obs.jsonl");
        std::fs::write(
            &path,
            "{\"city\":\"Oslo\",\"temperature\":\"-3.5\",\"windspeed\":4,\"fetched_at\":\"2024-03-01\"}\n",
        )?;

        let p = Pipeline::default();
        let pc = ObservationSource::new(path.display().to_string()).read(&p)?;
        let got = pc.collect_seq()?;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].temperature.as_ref().and_then(|v| v.as_finite_f64()), Some(-3.5));
        Ok(())
    }

    #[test]
    fn unknown_extension_needs_an_explicit_format() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dump.txt");
        std::fs::write(&path, "{\"city\":\"Oslo\"}\n")?;
        let pattern = path.display().to_string();

        assert!(ObservationSource::new(pattern.clone()).read_all().is_err());
        let rows = ObservationSource::new(pattern)
            .with_format(Some(FileFormat::Jsonl))
            .read_all()?;
        assert_eq!(rows.len(), 1);
        assert!(rows[0].temperature.is_none());
        Ok(())
    }
}
