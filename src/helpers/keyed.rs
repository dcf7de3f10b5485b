use crate::collection::downcast_input;
use crate::node::{LocalFn, MergeFn, Node};
use crate::{PCollection, Partition, RFBound};
use anyhow::anyhow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

impl<T: RFBound> PCollection<T> {
    /// Derive a key and produce (K, T)
    pub fn key_by<K, F>(self, key_fn: F) -> PCollection<(K, T)>
    where
        K: RFBound + Eq + Hash,
        F: 'static + Send + Sync + Fn(&T) -> K,
    {
        self.map(move |t| (key_fn(t), t.clone()))
    }
}

impl<K: RFBound + Eq + Hash, V: RFBound> PCollection<(K, V)> {
    pub fn map_values<O, F>(self, f: F) -> PCollection<(K, O)>
    where
        O: RFBound,
        F: 'static + Send + Sync + Fn(&V) -> O,
    {
        self.map(move |kv: &(K, V)| (kv.0.clone(), f(&kv.1)))
    }

    /// Fallible `map_values`. The function also sees the key so failures can
    /// name the group they came from.
    pub fn try_map_values<O, E, F>(self, f: F) -> PCollection<(K, O)>
    where
        O: RFBound,
        E: Into<anyhow::Error> + 'static,
        F: 'static + Send + Sync + Fn(&K, &V) -> Result<O, E>,
    {
        self.try_map(move |kv: &(K, V)| f(&kv.0, &kv.1).map(|o| (kv.0.clone(), o)))
    }

    /// Group values by key: (K, V) -> (K, Vec<V>)
    ///
    /// Every value of a key is in its group before anything downstream sees
    /// the group. Order of groups, and of values inside a group, is
    /// unspecified.
    pub fn group_by_key(self) -> PCollection<(K, Vec<V>)> {
        let local: LocalFn = Arc::new(|p: Partition| -> anyhow::Result<Partition> {
            let kv = downcast_input::<(K, V)>(p, "group_by_key local")?;
            let mut m: HashMap<K, Vec<V>> = HashMap::new();
            for (k, v) in kv {
                m.entry(k).or_default().push(v);
            }
            Ok(Box::new(m) as Partition)
        });

        let merge: MergeFn = Arc::new(|parts: Vec<Partition>| -> anyhow::Result<Partition> {
            let mut acc: HashMap<K, Vec<V>> = HashMap::new();
            for p in parts {
                let m = *p
                    .downcast::<HashMap<K, Vec<V>>>()
                    .map_err(|_| anyhow!("group_by_key merge: bad part"))?;
                for (k, vs) in m {
                    acc.entry(k).or_default().extend(vs);
                }
            }
            Ok(Box::new(acc.into_iter().collect::<Vec<(K, Vec<V>)>>()) as Partition)
        });

        let id = self.pipeline.insert_node(Node::GroupByKey { local, merge });
        self.pipeline.connect(self.id, id);
        PCollection::attach(self.pipeline, id)
    }
}
