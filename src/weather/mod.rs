//! The per-city, per-day summary stages.
//!
//! Observations go through four steps:
//!
//! 1. [`KeyExtractor`] validates a [`RawObservation`] and emits
//!    `(GroupKey, Measurement)`.
//! 2. Grouping by [`GroupKey`] (or combining partial sums per key).
//! 3. [`Averager`] reduces a group to an [`Aggregate`].
//! 4. [`RowFormatter`] flattens `(GroupKey, Aggregate)` into a [`Row`].
//!
//! The stages are plain values with no I/O; [`crate::job`] wires them into a
//! pipeline.

mod average;
mod extract;
mod format;
mod model;

pub use average::{Averager, RunningMean};
pub use extract::{KeyExtractor, observation_date};
pub use format::RowFormatter;
pub use model::{Aggregate, CsvObservation, FieldValue, GroupKey, Measurement, RawObservation, Row};
