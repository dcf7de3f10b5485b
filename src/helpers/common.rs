use crate::collection::{FilterOp, FlatMapOp, MapOp, TryMapOp};
use crate::node::{DynOp, Node};
use crate::{ExecMode, PCollection, RFBound, Runner};
use std::marker::PhantomData;
use std::sync::Arc;

impl<T: RFBound> PCollection<T> {
    fn push_stateless<O>(self, op: Arc<dyn DynOp>) -> PCollection<O> {
        let id = self.pipeline.insert_node(Node::Stateless(vec![op]));
        self.pipeline.connect(self.id, id);
        PCollection::attach(self.pipeline, id)
    }

    pub fn map<O, F>(self, f: F) -> PCollection<O>
    where
        O: RFBound,
        F: 'static + Send + Sync + Fn(&T) -> O,
    {
        self.push_stateless(Arc::new(MapOp::<T, O, F>(f, PhantomData)))
    }

    /// Map with a fallible function. The first error aborts the whole run and
    /// is returned from the collect call, wrapped with the step label.
    pub fn try_map<O, E, F>(self, f: F) -> PCollection<O>
    where
        O: RFBound,
        E: Into<anyhow::Error> + 'static,
        F: 'static + Send + Sync + Fn(&T) -> Result<O, E>,
    {
        self.push_stateless(Arc::new(TryMapOp::<T, O, E, F>(f, PhantomData)))
    }

    pub fn filter<F>(self, pred: F) -> PCollection<T>
    where
        F: 'static + Send + Sync + Fn(&T) -> bool,
    {
        self.push_stateless(Arc::new(FilterOp::<T, F>(pred, PhantomData)))
    }

    pub fn flat_map<O, F>(self, f: F) -> PCollection<O>
    where
        O: RFBound,
        F: 'static + Send + Sync + Fn(&T) -> Vec<O>,
    {
        self.push_stateless(Arc::new(FlatMapOp::<T, O, F>(f, PhantomData)))
    }
}

impl<T: RFBound> PCollection<T> {
    pub fn collect(self) -> anyhow::Result<Vec<T>> {
        self.collect_seq()
    }

    pub fn collect_seq(self) -> anyhow::Result<Vec<T>> {
        Runner {
            mode: ExecMode::Sequential,
            ..Default::default()
        }
        .run_collect::<T>(&self.pipeline, self.id)
    }

    pub fn collect_par(
        self,
        threads: Option<usize>,
        partitions: Option<usize>,
    ) -> anyhow::Result<Vec<T>> {
        Runner {
            mode: ExecMode::Parallel {
                threads,
                partitions,
            },
            ..Default::default()
        }
        .run_collect::<T>(&self.pipeline, self.id)
    }

    /// Collect with an explicitly configured runner.
    pub fn collect_with(self, runner: &Runner) -> anyhow::Result<Vec<T>> {
        runner.run_collect::<T>(&self.pipeline, self.id)
    }
}
