//! Shared CPU-side arrays with a stable identity.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;

static NEXT_DATA_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`SharedData`] array.
///
/// GPU buffers are cached by this id, not by content: two arrays with equal
/// contents still get two buffers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId(u64);

impl DataId {
    fn next() -> Self {
        Self(NEXT_DATA_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data#{}", self.0)
    }
}

/// Immutable, reference-counted array. Clones share the same [`DataId`].
#[derive(Clone)]
pub struct SharedData<T: Pod> {
    id: DataId,
    data: Rc<[T]>,
}

impl<T: Pod> SharedData<T> {
    pub fn new(data: impl Into<Rc<[T]>>) -> Self {
        Self { id: DataId::next(), data: data.into() }
    }

    #[inline]
    pub fn id(&self) -> DataId {
        self.id
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Raw bytes for upload.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

impl<T: Pod> Deref for SharedData<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: Pod> From<Vec<T>> for SharedData<T> {
    fn from(v: Vec<T>) -> Self {
        Self::new(v)
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for SharedData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedData")
            .field("id", &self.id)
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity() {
        let a = SharedData::from(vec![1.0f32, 2.0]);
        let b = a.clone();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn equal_contents_get_distinct_ids() {
        let a = SharedData::from(vec![0u16, 1, 2]);
        let b = SharedData::from(vec![0u16, 1, 2]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn bytes_view_matches_element_size() {
        let a = SharedData::from(vec![1.0f32, 2.0, 3.0]);
        assert_eq!(a.as_bytes().len(), 12);
        assert_eq!(&a.as_bytes()[..4], &1.0f32.to_ne_bytes());
    }
}
