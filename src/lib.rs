//! # weather-summary
//!
//! Per-city, per-day average temperature and windspeed, computed on a small
//! deferred-execution dataflow engine in the style of Apache Beam.
//!
//! The crate has two layers:
//!
//! - **Engine**: [`Pipeline`], [`PCollection`], element-wise transforms,
//!   keyed grouping and combining, and a [`Runner`] with sequential and
//!   partition-parallel execution.
//! - **Weather summary**: the [`weather`] stages (key extraction, averaging,
//!   row formatting), a glob-driven [`source`], an append-only [`sink`],
//!   and the [`job`] driver that ties them together from a [`config::JobConfig`].
//!
//! ## Quick start
//!
//! ```no_run
//! use weather_summary::*;
//! use weather_summary::weather::RawObservation;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let observations = vec![
//!     RawObservation::new("NYC", 10.0, 5.0, "2024-03-01T08:00:00Z"),
//!     RawObservation::new("NYC", 20.0, 15.0, "2024-03-01T20:00:00Z"),
//!     RawObservation::new("LA", 30.0, 2.0, "2024-03-01T08:00:00Z"),
//! ];
//!
//! let rows = job::summarize(observations, Strategy::Group, &Runner::default())?;
//! assert_eq!(rows.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Engine
//!
//! A [`Pipeline`] holds the graph. [`from_vec`] attaches a source; every
//! transform returns a new [`PCollection`] and nothing runs until a collect
//! call.
//!
//! - Stateless: [`map`](PCollection::map), [`try_map`](PCollection::try_map),
//!   [`filter`](PCollection::filter), [`flat_map`](PCollection::flat_map).
//! - Keyed: [`key_by`](PCollection::key_by),
//!   [`map_values`](PCollection::map_values),
//!   [`try_map_values`](PCollection::try_map_values),
//!   [`group_by_key`](PCollection::group_by_key),
//!   [`combine_values`](PCollection::combine_values).
//! - Terminals: [`collect_seq`](PCollection::collect_seq),
//!   [`collect_par`](PCollection::collect_par),
//!   [`collect_with`](PCollection::collect_with).
//!
//! Fallible transforms abort the whole run on the first error; the error
//! comes back from the collect call with the failing step's label as
//! context. Label steps with [`named`](PCollection::named).
//!
//! ## Features
//!
//! - `io-jsonl`, `io-csv`: source and sink encodings (both default).
//! - `compression-gzip`: transparent gzip for sources and sinks (default).
//! - `metrics`: run counters and timing (default).

pub mod cli;
pub mod collection;
pub mod config;
pub mod error;
pub mod helpers;
pub mod io;
pub mod job;
pub mod logging;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod node;
pub mod node_id;
pub mod pipeline;
pub mod runner;
pub mod sink;
pub mod source;
pub mod testing;
pub mod type_token;
pub mod weather;

pub use collection::{CombineFn, PCollection, RFBound};
pub use config::{JobConfig, Strategy};
pub use error::{PipelineError, StageResult};
pub use helpers::*;
pub use node_id::NodeId;
pub use pipeline::Pipeline;
pub use runner::{ExecMode, Runner};
pub use type_token::Partition;
