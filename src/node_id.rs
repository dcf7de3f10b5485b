//! Opaque handles for nodes in a [`Pipeline`](crate::pipeline::Pipeline) graph.
//!
//! Ids are handed out sequentially as transforms are attached. The runner uses
//! them to walk the plan back from a terminal collection to its source.

/// Identifier of one node in the pipeline graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new(v: u64) -> Self {
        Self(v)
    }

    /// The sequence number this id was allocated with.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
