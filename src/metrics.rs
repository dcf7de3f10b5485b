//! Run metrics: named counters plus wall-clock timing.
//!
//! A [`MetricsCollector`] is attached to a [`Pipeline`](crate::Pipeline) with
//! `set_metrics`. The runner adds element counts to it; the job driver adds
//! record, group and row counts. After a run the collector can be rendered
//! as JSON or written to a file.
//!
//! ```no_run
//! use weather_summary::*;
//! use weather_summary::metrics::MetricsCollector;
//!
//! # fn main() -> anyhow::Result<()> {
//! let p = Pipeline::default();
//! let metrics = MetricsCollector::new();
//! p.set_metrics(metrics.clone());
//!
//! metrics.record_start();
//! let out = from_vec(&p, vec![1u32, 2, 3]).map(|x: &u32| x * 2).collect_seq()?;
//! metrics.record_end();
//!
//! assert_eq!(metrics.counter("runner.output_elements"), Some(out.len() as u64));
//! metrics.save_to_file("metrics.json")?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Thread-safe counter store shared between the runner and the driver.
///
/// Clones share the same counters.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsInner>>,
}

#[derive(Default)]
struct MetricsInner {
    counters: BTreeMap<String, u64>,
    descriptions: BTreeMap<String, String>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_start(&self) {
        self.lock().start_time = Some(Instant::now());
    }

    pub fn record_end(&self) {
        self.lock().end_time = Some(Instant::now());
    }

    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let inner = self.lock();
        match (inner.start_time, inner.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// Add `value` to a counter, creating it at zero if needed.
    pub fn increment_counter(&self, name: &str, value: u64) {
        *self.lock().counters.entry(name.to_string()).or_insert(0) += value;
    }

    pub fn set_counter(&self, name: &str, value: u64) {
        self.lock().counters.insert(name.to_string(), value);
    }

    /// Attach a human-readable description shown in the JSON export.
    pub fn describe(&self, name: &str, description: &str) {
        self.lock()
            .descriptions
            .insert(name.to_string(), description.to_string());
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.lock().counters.get(name).copied()
    }

    /// All metrics as a JSON object, one entry per counter plus
    /// `execution_time_ms` when both timestamps were recorded.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let inner = self.lock();
        let mut out = Map::new();

        for (name, value) in &inner.counters {
            let mut metric = Map::new();
            metric.insert("value".to_string(), json!(value));
            if let Some(desc) = inner.descriptions.get(name) {
                metric.insert("description".to_string(), json!(desc));
            }
            out.insert(name.clone(), Value::Object(metric));
        }

        if let (Some(start), Some(end)) = (inner.start_time, inner.end_time) {
            out.insert(
                "execution_time_ms".to_string(),
                json!({
                    "value": end.duration_since(start).as_millis() as u64,
                    "description": "Total pipeline execution time in milliseconds",
                }),
            );
        }

        Value::Object(out)
    }

    /// Write [`to_json`](Self::to_json) pretty-printed to `path`, creating
    /// parent directories as needed.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let body = serde_json::to_string_pretty(&self.to_json())?;
        f.write_all(body.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}
