use crate::collection::downcast_input;
use crate::node::{LocalFn, MergeFn, Node};
use crate::{CombineFn, PCollection, Partition, RFBound};
use anyhow::anyhow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

impl<K: RFBound + Eq + Hash, V: RFBound> PCollection<(K, V)> {
    /// Combine-by-key with a user-supplied `CombineFn`.
    ///
    /// Each partition folds its values into local accumulators; the merge
    /// phase combines accumulators per key and finishes them. No per-key
    /// value list is ever materialized.
    pub fn combine_values<C, A, O>(self, comb: C) -> PCollection<(K, O)>
    where
        C: CombineFn<V, A, O> + 'static,
        A: Send + Sync + 'static,
        O: RFBound,
    {
        let comb = Arc::new(comb);

        let local: LocalFn = {
            let comb = Arc::clone(&comb);
            Arc::new(move |p: Partition| -> anyhow::Result<Partition> {
                let kv = downcast_input::<(K, V)>(p, "combine_values local")?;
                let mut map: HashMap<K, A> = HashMap::new();
                for (k, v) in kv {
                    match map.get_mut(&k) {
                        Some(acc) => comb.add_input(acc, v).map_err(|e| comb.keyed_error(&k, e))?,
                        None => {
                            let mut acc = comb.create();
                            comb.add_input(&mut acc, v).map_err(|e| comb.keyed_error(&k, e))?;
                            map.insert(k, acc);
                        }
                    }
                }
                Ok(Box::new(map) as Partition)
            })
        };

        let merge: MergeFn = {
            let comb = Arc::clone(&comb);
            Arc::new(move |parts: Vec<Partition>| -> anyhow::Result<Partition> {
                let mut accs: HashMap<K, A> = HashMap::new();
                for p in parts {
                    let m = *p
                        .downcast::<HashMap<K, A>>()
                        .map_err(|_| anyhow!("combine_values merge: bad part"))?;
                    for (k, a) in m {
                        match accs.get_mut(&k) {
                            Some(acc) => comb.merge(acc, a).map_err(|e| comb.keyed_error(&k, e))?,
                            None => {
                                accs.insert(k, a);
                            }
                        }
                    }
                }
                let out: Vec<(K, O)> = accs
                    .into_iter()
                    .map(|(k, a)| (k, comb.finish(a)))
                    .collect();
                Ok(Box::new(out) as Partition)
            })
        };

        let id = self
            .pipeline
            .insert_node(Node::CombineValues { local, merge });
        self.pipeline.connect(self.id, id);
        PCollection::attach(self.pipeline, id)
    }
}
