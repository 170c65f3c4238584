// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Type-erased, type-tagged reference to a caller-owned argument value.
///
/// Cloning a handle clones the `Arc`, never the value, so every block of a task that
/// holds a copy of the handle sees the same underlying data.
#[derive(Clone)]
pub struct ArgHandle {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ArgHandle {
    /// Move `value` behind a fresh handle.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Share an `Arc` the caller keeps; both sides see the same value.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: type_name::<T>(),
        }
    }

    /// Name of the type stored at construction.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Reference to the value as `T` without checking the type.
    ///
    /// # Safety
    ///
    /// The handle must have been built from a `T`.
    pub unsafe fn downcast_ref_unchecked<T: Any>(&self) -> &T {
        debug_assert!(self.is::<T>(), "expected {}, found {}", type_name::<T>(), self.type_name);
        // SAFETY: the caller guarantees the erased value is a `T`.
        unsafe { &*(Arc::as_ptr(&self.value) as *const T) }
    }

    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// True when both handles point at the same value.
    pub fn ptr_eq(&self, other: &ArgHandle) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for ArgHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgHandle")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Ordered list of argument handles, used as the template copied into every block.
///
/// ```
/// use std::sync::Arc;
/// use parblock::args::ArgList;
///
/// let data = Arc::new(vec![1.0_f64; 8]);
/// let args = ArgList::new().with_shared(Arc::clone(&data)).with(2.5_f64);
/// assert_eq!(args.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArgList(Vec<ArgHandle>);

impl ArgList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn with_shared<T: Any + Send + Sync>(mut self, value: Arc<T>) -> Self {
        self.0.push(ArgHandle::from_arc(value));
        self
    }

    pub fn with_handle(mut self, handle: ArgHandle) -> Self {
        self.0.push(handle);
        self
    }

    pub fn push<T: Any + Send + Sync>(&mut self, value: T) {
        self.0.push(ArgHandle::new(value));
    }

    pub fn push_handle(&mut self, handle: ArgHandle) {
        self.0.push(handle);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgHandle> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArgHandle> {
        self.0.iter()
    }
}

impl From<Vec<ArgHandle>> for ArgList {
    fn from(handles: Vec<ArgHandle>) -> Self {
        Self(handles)
    }
}

impl FromIterator<ArgHandle> for ArgList {
    fn from_iter<I: IntoIterator<Item = ArgHandle>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_clone_shares_value() {
        let shared = Arc::new(42_u32);
        let handle = ArgHandle::from_arc(Arc::clone(&shared));
        let copy = handle.clone();

        assert!(handle.ptr_eq(&copy));
        assert_eq!(copy.downcast_ref::<u32>(), Some(&42));
        assert!(Arc::ptr_eq(&copy.downcast_arc::<u32>().unwrap(), &shared));
    }

    #[test]
    fn test_handle_reports_stored_type() {
        let handle = ArgHandle::new(vec![1.0_f64]);
        assert!(handle.is::<Vec<f64>>());
        assert!(!handle.is::<Vec<f32>>());
        assert!(handle.type_name().contains("Vec<f64>"));
        assert!(handle.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_arg_list_keeps_order() {
        let list = ArgList::new().with(1_u8).with("two").with(3.0_f64);
        let names: Vec<_> = list.iter().map(|h| h.type_name()).collect();
        assert_eq!(names, vec!["u8", "&str", "f64"]);
        assert!(list.get(3).is_none());
    }
}
