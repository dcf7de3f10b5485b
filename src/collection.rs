use crate::node::DynOp;
use crate::node_id::NodeId;
use crate::pipeline::Pipeline;
use crate::type_token::Partition;
use anyhow::{Result, anyhow};
use serde::{Serialize, de::DeserializeOwned};
use std::any::{Any, type_name};
use std::marker::PhantomData;

/// Bound shared by every element type that flows through a pipeline.
pub trait RFBound: 'static + Send + Sync + Clone + Serialize + DeserializeOwned {}
impl<T> RFBound for T where T: 'static + Send + Sync + Clone + Serialize + DeserializeOwned {}

/// A lazily evaluated collection of `T` attached to a [`Pipeline`].
///
/// Transforms consume the handle and return a new one; clone it first to
/// branch. Evaluation happens in a collect call.
#[derive(Clone)]
pub struct PCollection<T> {
    pub(crate) pipeline: Pipeline,
    pub(crate) id: NodeId,
    pub(crate) _t: PhantomData<T>,
}

impl<T> PCollection<T> {
    pub(crate) fn attach(pipeline: Pipeline, id: NodeId) -> Self {
        PCollection {
            pipeline,
            id,
            _t: PhantomData,
        }
    }

    /// Node id of the step producing this collection.
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// The pipeline this collection belongs to.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Name the step that produces this collection. Labels show up in logs
    /// and in the context of any error the step returns.
    pub fn named(self, label: impl Into<String>) -> Self {
        self.pipeline.set_label(self.id, label.into());
        self
    }
}

pub(crate) fn downcast_input<I: 'static>(input: Partition, op: &str) -> Result<Vec<I>> {
    input
        .downcast::<Vec<I>>()
        .map(|b| *b)
        .map_err(|_| anyhow!("{op}: expected partition of {}", type_name::<I>()))
}

// ---- Stateless DynOps ----

pub(crate) struct MapOp<I, O, F>(pub(crate) F, pub(crate) PhantomData<(I, O)>);

impl<I, O, F> DynOp for MapOp<I, O, F>
where
    I: RFBound,
    O: RFBound,
    F: Send + Sync + Fn(&I) -> O + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let v = downcast_input::<I>(input, "map")?;
        let out: Vec<O> = v.iter().map(|i| self.0(i)).collect();
        Ok(Box::new(out) as Partition)
    }

    fn kind(&self) -> &'static str {
        "map"
    }
}

/// Fallible map; the first error stops the partition.
pub(crate) struct TryMapOp<I, O, E, F>(pub(crate) F, pub(crate) PhantomData<(I, O, fn() -> E)>);

impl<I, O, E, F> DynOp for TryMapOp<I, O, E, F>
where
    I: RFBound,
    O: RFBound,
    E: Into<anyhow::Error> + 'static,
    F: Send + Sync + Fn(&I) -> std::result::Result<O, E> + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let v = downcast_input::<I>(input, "try_map")?;
        let out = v
            .iter()
            .map(|i| self.0(i).map_err(Into::<anyhow::Error>::into))
            .collect::<Result<Vec<O>>>()?;
        Ok(Box::new(out) as Partition)
    }

    fn kind(&self) -> &'static str {
        "try_map"
    }
}

pub(crate) struct FilterOp<T, P>(pub(crate) P, pub(crate) PhantomData<T>);

impl<T, P> DynOp for FilterOp<T, P>
where
    T: RFBound,
    P: Send + Sync + Fn(&T) -> bool + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let v = downcast_input::<T>(input, "filter")?;
        Ok(Box::new(v.into_iter().filter(|t| self.0(t)).collect::<Vec<T>>()))
    }

    fn kind(&self) -> &'static str {
        "filter"
    }
}

pub(crate) struct FlatMapOp<I, O, F>(pub(crate) F, pub(crate) PhantomData<(I, O)>);

impl<I, O, F> DynOp for FlatMapOp<I, O, F>
where
    I: RFBound,
    O: RFBound,
    F: Send + Sync + Fn(&I) -> Vec<O> + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let v = downcast_input::<I>(input, "flat_map")?;
        let mut out: Vec<O> = Vec::new();
        for i in &v {
            out.extend(self.0(i));
        }
        Ok(Box::new(out))
    }

    fn kind(&self) -> &'static str {
        "flat_map"
    }
}

/// A per-key aggregation expressed as an accumulator lifecycle.
///
/// The runner creates one accumulator per key and partition, feeds it values
/// with `add_input`, merges partial accumulators from different partitions
/// with `merge`, and calls `finish` once per key. `add_input` and `merge`
/// must be associative and commutative for results to be independent of
/// partitioning; either may reject input, which aborts the run.
pub trait CombineFn<V, A, O>: Send + Sync + 'static {
    fn create(&self) -> A;
    fn add_input(&self, acc: &mut A, v: V) -> Result<()>;
    fn merge(&self, acc: &mut A, other: A) -> Result<()>;
    fn finish(&self, acc: A) -> O;

    /// Called with the key whose `add_input` or `merge` failed. The default
    /// returns the error unchanged.
    fn keyed_error(&self, key: &dyn Any, err: anyhow::Error) -> anyhow::Error {
        let _ = key;
        err
    }
}
