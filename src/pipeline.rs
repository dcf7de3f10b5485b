use crate::node::Node;
use crate::node_id::NodeId;
#[cfg(feature = "metrics")]
use crate::metrics::MetricsCollector;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Container for a computation graph.
///
/// Collections created from the same `Pipeline` share one graph; cloning a
/// `Pipeline` clones the handle, not the graph. Nothing runs until a
/// collection is collected.
pub struct Pipeline {
    pub(crate) inner: Arc<Mutex<PipelineInner>>,
}

pub struct PipelineInner {
    pub next_id: u64,
    pub nodes: HashMap<NodeId, Node>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub labels: HashMap<NodeId, String>,
    #[cfg(feature = "metrics")]
    pub metrics: Option<MetricsCollector>,
}

/// Frozen copy of the graph handed to the runner.
pub(crate) struct GraphSnapshot {
    pub nodes: HashMap<NodeId, Node>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub labels: HashMap<NodeId, String>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PipelineInner {
                next_id: 0,
                nodes: HashMap::new(),
                edges: Vec::new(),
                labels: HashMap::new(),
                #[cfg(feature = "metrics")]
                metrics: None,
            })),
        }
    }
}

impl Clone for Pipeline {
    fn clone(&self) -> Self {
        Pipeline {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Pipeline {
    // The graph is only mutated by short, non-panicking sections, so a
    // poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, PipelineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert_node(&self, node: Node) -> NodeId {
        let mut g = self.lock();
        let id = NodeId::new(g.next_id);
        g.next_id += 1;
        g.nodes.insert(id, node);
        id
    }

    pub(crate) fn connect(&self, from: NodeId, to: NodeId) {
        self.lock().edges.push((from, to));
    }

    pub(crate) fn set_label(&self, id: NodeId, label: String) {
        self.lock().labels.insert(id, label);
    }

    pub(crate) fn snapshot_graph(&self) -> GraphSnapshot {
        let g = self.lock();
        GraphSnapshot {
            nodes: g.nodes.clone(),
            edges: g.edges.clone(),
            labels: g.labels.clone(),
        }
    }

    /// Node ids and edges, for inspection in tests and debugging.
    pub fn snapshot(&self) -> (HashMap<NodeId, Node>, Vec<(NodeId, NodeId)>) {
        let g = self.lock();
        (g.nodes.clone(), g.edges.clone())
    }

    /// Label of a step, falling back to `<kind><id>` for unnamed steps.
    pub fn step_label(&self, id: NodeId) -> String {
        let g = self.lock();
        step_label_of(&g.labels, &g.nodes, id)
    }

    /// Attach a metrics collector; the runner records element counts into it.
    #[cfg(feature = "metrics")]
    pub fn set_metrics(&self, metrics: MetricsCollector) {
        self.lock().metrics = Some(metrics);
    }

    /// Handle to the attached metrics collector, if any.
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> Option<MetricsCollector> {
        self.lock().metrics.clone()
    }

    /// Detach and return the metrics collector.
    #[cfg(feature = "metrics")]
    pub fn take_metrics(&self) -> Option<MetricsCollector> {
        self.lock().metrics.take()
    }
}

pub(crate) fn step_label_of(
    labels: &HashMap<NodeId, String>,
    nodes: &HashMap<NodeId, Node>,
    id: NodeId,
) -> String {
    labels.get(&id).cloned().unwrap_or_else(|| {
        let kind = nodes.get(&id).map_or("node", Node::kind);
        format!("{kind}{id}")
    })
}
