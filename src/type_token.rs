//! Type tags and type-erased vector helpers.
//!
//! Partitions travel between nodes as `Box<dyn Any>`. Two helpers keep that
//! erasure honest:
//! - [`TypeTag`] records which element type a source produces, so a mismatch
//!   can be reported by name instead of as an anonymous downcast failure.
//! - [`VecOps`] lets the runner measure, split and clone a source payload
//!   without knowing its element type. Implementations come from
//!   [`vec_ops_for`].

use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

/// A partition buffer carried between nodes at runtime.
///
/// Stateless stages receive and return `Vec<T>` behind this box; grouping
/// stages use it for their per-partition hash maps as well.
pub type Partition = Box<dyn Any + Send + Sync>;

/// Runtime identity of an element type.
///
/// ```ignore
/// use weather_summary::type_token::TypeTag;
/// let tag = TypeTag::of::<f64>();
/// assert_eq!(tag.name, "f64");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag {
    pub id: TypeId,
    /// Readable type name, best effort.
    pub name: &'static str,
}

impl TypeTag {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

/// Type-erased operations on a source payload.
///
/// Every method returns `None` when `data` is not the `Vec<T>` the
/// implementation was built for.
pub trait VecOps: Send + Sync {
    /// Number of elements in the payload.
    fn len(&self, data: &dyn Any) -> Option<usize>;

    /// Split the payload into at most `n` contiguous, order-preserving chunks.
    /// Inputs with `n <= 1` or fewer than two elements come back as one chunk.
    fn split(&self, data: &dyn Any, n: usize) -> Option<Vec<Partition>>;

    /// Copy the whole payload into a single partition.
    fn clone_any(&self, data: &dyn Any) -> Option<Partition>;
}

/// `VecOps` bound to a concrete element type.
pub struct VecOpsImpl<T: Clone + Send + Sync + 'static>(PhantomData<T>);

impl<T: Clone + Send + Sync + 'static> VecOps for VecOpsImpl<T> {
    fn len(&self, data: &dyn Any) -> Option<usize> {
        data.downcast_ref::<Vec<T>>().map(Vec::len)
    }

    fn split(&self, data: &dyn Any, n: usize) -> Option<Vec<Partition>> {
        let v = data.downcast_ref::<Vec<T>>()?;
        let len = v.len();

        if n <= 1 || len <= 1 {
            return Some(vec![Box::new(v.clone())]);
        }

        let chunk = len.div_ceil(n);
        let parts = v
            .chunks(chunk)
            .map(|c| Box::new(c.to_vec()) as Partition)
            .collect();
        Some(parts)
    }

    fn clone_any(&self, data: &dyn Any) -> Option<Partition> {
        data.downcast_ref::<Vec<T>>()
            .map(|v| Box::new(v.clone()) as Partition)
    }
}

/// Build the `VecOps` used by in-memory sources of `T`.
pub fn vec_ops_for<T: Clone + Send + Sync + 'static>() -> Arc<dyn VecOps> {
    Arc::new(VecOpsImpl::<T>(PhantomData))
}
