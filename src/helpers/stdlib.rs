//! In-memory sources.
//!
//! - [`from_vec`] turns a `Vec<T>` into a source collection.
//! - [`from_iter`] does the same for anything iterable.
//!
//! File-backed adapters (see [`crate::source`]) read records into memory and
//! then go through [`from_vec`], so every source node carries a typed
//! [`VecOps`](crate::type_token::VecOps) the runner can split.

use crate::node::Node;
use crate::type_token::{TypeTag, vec_ops_for};
use crate::{PCollection, Pipeline, RFBound};
use std::sync::Arc;

/// Create a [`PCollection<T>`] from a pre-existing [`Vec<T>`].
///
/// ```ignore
/// use weather_summary::*;
///
/// let p = Pipeline::default();
/// let pc = from_vec(&p, vec![10, 20, 30]);
/// assert_eq!(pc.collect_seq().unwrap(), vec![10, 20, 30]);
/// ```
pub fn from_vec<T>(p: &Pipeline, data: Vec<T>) -> PCollection<T>
where
    T: RFBound,
{
    let id = p.insert_node(Node::Source {
        payload: Arc::new(data),
        vec_ops: vec_ops_for::<T>(),
        elem_tag: TypeTag::of::<T>(),
    });
    PCollection::attach(p.clone(), id)
}

/// Create a [`PCollection<T>`] from any [`IntoIterator`].
pub fn from_iter<T, I>(p: &Pipeline, iter: I) -> PCollection<T>
where
    T: RFBound,
    I: IntoIterator<Item = T>,
{
    from_vec(p, iter.into_iter().collect::<Vec<T>>())
}
