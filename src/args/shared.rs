// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

use crate::errors::ArgumentError;
use crate::partition::Bounds;

/// Caller-owned buffer whose blocks can be written concurrently.
///
/// Each block leases its own [`Bounds`] and gets exclusive access to that range for
/// as long as the lease lives. Overlapping leases are refused instead of aliased, so
/// kernels that stay inside their own bounds never contend and kernels that stray are
/// told so.
///
/// ```
/// use parblock::args::SharedBuffer;
/// use parblock::partition::Bounds;
///
/// let buffer = SharedBuffer::filled(8, 0_u32);
/// {
///     let mut low = buffer.lease(Bounds::new(0, 4)).unwrap();
///     let high = buffer.lease(Bounds::new(4, 8)).unwrap();
///     low[0] = 1;
///     assert!(high.iter().all(|v| *v == 0));
///     assert!(buffer.lease(Bounds::new(3, 5)).is_err());
/// }
/// assert_eq!(buffer.into_vec()[0], 1);
/// ```
///
/// Elements must be `Sync`; a buffer of `Cell`s cannot be shared between threads:
///
/// ```compile_fail
/// use std::cell::Cell;
/// use parblock::args::SharedBuffer;
///
/// let buffer = SharedBuffer::filled(1, Cell::new(0_u64));
/// let view = buffer.lease_all().unwrap();
/// std::thread::scope(|s| {
///     s.spawn(|| view[0].set(1));
///     s.spawn(|| view[0].set(2));
/// });
/// ```
pub struct SharedBuffer<T> {
    cells: Box<[UnsafeCell<T>]>,
    leases: Mutex<Vec<Bounds>>,
}

// SAFETY: element access only goes through `BufferLease`, and `lease` guarantees that
// live leases cover pairwise disjoint index ranges, so `&mut T` is never aliased across
// threads. `T: Sync` is required as well: a `&BufferLease` shared between threads
// hands out `&T` to each of them.
unsafe impl<T: Send + Sync> Sync for SharedBuffer<T> {}

impl<T> SharedBuffer<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self {
            cells: values.into_iter().map(UnsafeCell::new).collect(),
            leases: Mutex::new(Vec::new()),
        }
    }

    pub fn filled(len: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::new(vec![value; len])
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Exclusive access to `bounds` until the returned lease drops.
    pub fn lease(&self, bounds: Bounds) -> Result<BufferLease<'_, T>, ArgumentError> {
        if bounds.first > bounds.last || bounds.last > self.len() {
            return Err(ArgumentError::LeaseOutOfRange {
                requested: bounds,
                len: self.len(),
            });
        }

        let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(held) = leases.iter().find(|held| held.overlaps(&bounds)) {
            return Err(ArgumentError::LeaseConflict {
                requested: bounds,
                held: *held,
            });
        }
        leases.push(bounds);

        Ok(BufferLease {
            buffer: self,
            bounds,
        })
    }

    /// Lease the whole buffer.
    pub fn lease_all(&self) -> Result<BufferLease<'_, T>, ArgumentError> {
        self.lease(Bounds::new(0, self.len()))
    }

    /// Copy of the contents. Fails while any non-empty lease is live.
    pub fn to_vec(&self) -> Result<Vec<T>, ArgumentError>
    where
        T: Clone,
    {
        Ok(self.lease_all()?.to_vec())
    }

    pub fn into_vec(self) -> Vec<T> {
        self.cells
            .into_vec()
            .into_iter()
            .map(UnsafeCell::into_inner)
            .collect()
    }

    fn release(&self, bounds: Bounds) {
        let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(position) = leases.iter().position(|held| *held == bounds) {
            leases.swap_remove(position);
        }
    }

    fn range_ptr(&self, bounds: Bounds) -> *mut T {
        // `UnsafeCell<T>` has the same layout as `T`, so one cell pointer covers the range.
        // SAFETY: `lease` checked `first <= len`, so the offset stays within or one past
        // the allocation.
        UnsafeCell::raw_get(unsafe { self.cells.as_ptr().add(bounds.first) })
    }
}

impl<T> From<Vec<T>> for SharedBuffer<T> {
    fn from(values: Vec<T>) -> Self {
        Self::new(values)
    }
}

impl<T> fmt::Debug for SharedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live = self
            .leases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("SharedBuffer")
            .field("len", &self.len())
            .field("live_leases", &live)
            .finish()
    }
}

/// Exclusive view of one range of a [`SharedBuffer`].
pub struct BufferLease<'a, T> {
    buffer: &'a SharedBuffer<T>,
    bounds: Bounds,
}

impl<T> BufferLease<'_, T> {
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

impl<T> fmt::Debug for BufferLease<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferLease")
            .field("bounds", &self.bounds)
            .finish()
    }
}

impl<T> Deref for BufferLease<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: the range is in bounds and no other live lease overlaps it.
        unsafe { std::slice::from_raw_parts(self.buffer.range_ptr(self.bounds), self.bounds.len()) }
    }
}

impl<T> DerefMut for BufferLease<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as for `deref`; `&mut self` makes this the only view through this lease.
        unsafe {
            std::slice::from_raw_parts_mut(self.buffer.range_ptr(self.bounds), self.bounds.len())
        }
    }
}

impl<T> Drop for BufferLease<'_, T> {
    fn drop(&mut self) {
        self.buffer.release(self.bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_disjoint_leases_coexist() {
        let buffer = SharedBuffer::filled(10, 0_i32);
        let mut a = buffer.lease(Bounds::new(0, 5)).unwrap();
        let mut b = buffer.lease(Bounds::new(5, 10)).unwrap();
        a.iter_mut().for_each(|v| *v = 1);
        b.iter_mut().for_each(|v| *v = 2);
        drop(a);
        drop(b);

        assert_eq!(buffer.to_vec().unwrap(), vec![1, 1, 1, 1, 1, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_overlap_is_refused_until_released() {
        let buffer = SharedBuffer::filled(10, 0_u8);
        let held = buffer.lease(Bounds::new(2, 6)).unwrap();

        let err = buffer.lease(Bounds::new(5, 8)).unwrap_err();
        assert_eq!(
            err,
            ArgumentError::LeaseConflict {
                requested: Bounds::new(5, 8),
                held: Bounds::new(2, 6),
            }
        );
        assert!(buffer.to_vec().is_err());

        drop(held);
        assert!(buffer.lease(Bounds::new(5, 8)).is_ok());
    }

    #[test]
    fn test_lease_debug_shows_bounds() {
        let buffer = SharedBuffer::filled(4, 0_u8);
        let lease = buffer.lease(Bounds::new(1, 3)).unwrap();
        assert_eq!(
            format!("{:?}", lease),
            "BufferLease { bounds: Bounds { first: 1, last: 3 } }"
        );
        assert!(format!("{:?}", buffer).contains("live_leases: 1"));
    }

    #[test]
    fn test_shared_between_threads_needs_sync_elements() {
        fn assert_sync<S: Sync>() {}
        assert_sync::<SharedBuffer<f64>>();
        assert_sync::<SharedBuffer<std::sync::atomic::AtomicU64>>();
        assert_sync::<BufferLease<'static, usize>>();
    }

    #[test]
    fn test_empty_lease_never_conflicts() {
        let buffer = SharedBuffer::filled(4, 0_u8);
        let _all = buffer.lease_all().unwrap();
        let empty = buffer.lease(Bounds::new(2, 2)).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_out_of_range_lease() {
        let buffer = SharedBuffer::filled(4, 0_u8);
        assert!(matches!(
            buffer.lease(Bounds::new(2, 5)),
            Err(ArgumentError::LeaseOutOfRange { len: 4, .. })
        ));
    }

    #[test]
    fn test_concurrent_block_writes() {
        let buffer = Arc::new(SharedBuffer::filled(1_000, 0_usize));
        let handles: Vec<_> = (0..4)
            .map(|block| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    let bounds = Bounds::new(block * 250, (block + 1) * 250);
                    let mut lease = buffer.lease(bounds).unwrap();
                    for (offset, value) in lease.iter_mut().enumerate() {
                        *value = bounds.first + offset;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let values = Arc::try_unwrap(buffer).unwrap().into_vec();
        assert!(values.iter().enumerate().all(|(i, v)| i == *v));
    }
}
