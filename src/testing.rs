//! Test support shipped with the crate.
//!
//! - [`TestPipeline`]: a [`Pipeline`] with graph inspection helpers.
//! - Assertions: ordered/unordered collection comparison and
//!   tolerance-based [`Row`](crate::weather::Row) comparison.
//! - Fixtures: observation builders, the reference three-reading scenario,
//!   and helpers that lay out source files and empty sink tables in a
//!   temporary directory.
//!
//! ```no_run
//! use weather_summary::*;
//! use weather_summary::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let rows = job::summarize(reference_observations(), Strategy::Group, &Runner::default())?;
//! assert_rows_approx_eq(&rows, &reference_rows(), 1e-9);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;

use crate::Pipeline;

/// A [`Pipeline`] for tests, with graph inspection helpers.
#[derive(Clone, Default)]
pub struct TestPipeline {
    pipeline: Pipeline,
}

impl TestPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.pipeline.snapshot().0.len()
    }

    /// Number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.pipeline.snapshot().1.len()
    }

    /// Step labels from the first node to the last, in insertion order.
    #[must_use]
    pub fn step_labels(&self) -> Vec<String> {
        let (nodes, _) = self.pipeline.snapshot();
        let mut ids: Vec<_> = nodes.keys().copied().collect();
        ids.sort();
        ids.into_iter().map(|id| self.pipeline.step_label(id)).collect()
    }
}

impl std::ops::Deref for TestPipeline {
    type Target = Pipeline;

    fn deref(&self) -> &Self::Target {
        &self.pipeline
    }
}

impl AsRef<Pipeline> for TestPipeline {
    fn as_ref(&self) -> &Pipeline {
        &self.pipeline
    }
}
