use crate::type_token::{Partition, TypeTag, VecOps};
use anyhow::Result;
use std::any::Any;
use std::sync::Arc;

/// An element-wise transform applied to one whole partition.
///
/// Ops downcast their input to the `Vec<I>` they were built for; a failed
/// downcast or a failing user function is returned as an error and aborts
/// the run.
pub trait DynOp: Send + Sync {
    fn apply(&self, input: Partition) -> Result<Partition>;

    /// Short operator name used in default step labels.
    fn kind(&self) -> &'static str {
        "op"
    }
}

/// Per-partition phase of a keyed barrier: `Vec<(K, V)>` in, `HashMap<K, _>` out.
pub type LocalFn = Arc<dyn Fn(Partition) -> Result<Partition> + Send + Sync>;

/// Merge phase of a keyed barrier: all local maps in, one `Vec<(K, _)>` out.
pub type MergeFn = Arc<dyn Fn(Vec<Partition>) -> Result<Partition> + Send + Sync>;

#[derive(Clone)]
pub enum Node {
    Source {
        payload: Arc<dyn Any + Send + Sync>,
        vec_ops: Arc<dyn VecOps>,
        elem_tag: TypeTag,
    },
    Stateless(Vec<Arc<dyn DynOp>>),

    /// GroupByKey: local partitions Vec<(K, V)> -> HashMap<K, Vec<V>>,
    /// merge: Vec<HashMap<K, Vec<V>>> -> Vec<(K, Vec<V>)>
    GroupByKey { local: LocalFn, merge: MergeFn },

    /// Combine-by-key with per-partition accumulators:
    /// local: Vec<(K, V)> -> HashMap<K, A>, merge: Vec<HashMap<K, A>> -> Vec<(K, O)>
    CombineValues { local: LocalFn, merge: MergeFn },
}

impl Node {
    /// Operator name used when a step has no explicit label.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Source { .. } => "source",
            Node::Stateless(ops) => ops.first().map_or("stateless", |op| op.kind()),
            Node::GroupByKey { .. } => "group_by_key",
            Node::CombineValues { .. } => "combine_values",
        }
    }
}
