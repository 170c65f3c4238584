// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Work partitioning: half-open block ranges and the regular partitioning rule.
//!
//! Every block of a task covers one contiguous [`Bounds`] range of a one-dimensional
//! work domain. The ordered list of ranges for all blocks of a task is its
//! [`BufferShape`].
//!
//! Regular partitioning splits `work_size` into `n` blocks of `work_size / n`
//! elements each; the last block absorbs the remainder of the integer division.
//!
//! ```
//! use parblock::partition::{make_regular_buffer_shape_with_limit, Bounds};
//!
//! let (blocks, shape) = make_regular_buffer_shape_with_limit(17, 4, 8).unwrap();
//! assert_eq!(blocks, 4);
//! assert_eq!(shape[3], Bounds::new(12, 17));
//! ```

use std::ops::{Index, Range};

use serde::Serialize;

use crate::errors::PartitionError;

/// Half-open index range `[first, last)` assigned to one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Bounds {
    pub first: usize,
    pub last: usize,
}

impl Bounds {
    pub const fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    pub const fn len(&self) -> usize {
        self.last.saturating_sub(self.first)
    }

    pub const fn is_empty(&self) -> bool {
        self.last <= self.first
    }

    /// The bounds as a `Range`, ready for slicing.
    pub const fn range(&self) -> Range<usize> {
        self.first..self.last
    }

    pub const fn contains(&self, index: usize) -> bool {
        self.first <= index && index < self.last
    }

    /// Two ranges overlap when they share at least one index. Empty ranges never overlap.
    pub const fn overlaps(&self, other: &Bounds) -> bool {
        !self.is_empty() && !other.is_empty() && self.first < other.last && other.first < self.last
    }
}

impl From<Range<usize>> for Bounds {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Ordered list of [`Bounds`], one per block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BufferShape(pub Vec<Bounds>);

impl BufferShape {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bounds> {
        self.0.iter()
    }

    pub fn get(&self, block: usize) -> Option<&Bounds> {
        self.0.get(block)
    }

    /// Largest `last` of any block; the work size this shape covers.
    pub fn work_size(&self) -> usize {
        self.0.iter().map(|b| b.last).max().unwrap_or(0)
    }

    /// Check every block satisfies `first <= last <= work_size`.
    pub fn validate(&self, work_size: usize) -> Result<(), PartitionError> {
        for (block, bounds) in self.0.iter().enumerate() {
            if bounds.first > bounds.last || bounds.last > work_size {
                return Err(PartitionError::InvalidShape {
                    block,
                    first: bounds.first,
                    last: bounds.last,
                    work_size,
                });
            }
        }
        Ok(())
    }
}

impl Index<usize> for BufferShape {
    type Output = Bounds;

    fn index(&self, block: usize) -> &Self::Output {
        &self.0[block]
    }
}

impl From<Vec<Bounds>> for BufferShape {
    fn from(bounds: Vec<Bounds>) -> Self {
        Self(bounds)
    }
}

impl FromIterator<Bounds> for BufferShape {
    fn from_iter<I: IntoIterator<Item = Bounds>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a BufferShape {
    type Item = &'a Bounds;
    type IntoIter = std::slice::Iter<'a, Bounds>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Number of hardware threads the platform reports, falling back to 1 if unknown.
pub fn hardware_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// `min(requested, hardware_concurrency())`.
pub fn right_block_count(requested: usize) -> usize {
    requested.min(hardware_concurrency())
}

/// Regular bounds of block `block_id` out of `blocks_number` over `work_size`.
///
/// The last block ends at `work_size` so it absorbs the division remainder.
pub fn regular_bounds(work_size: usize, block_id: usize, blocks_number: usize) -> Bounds {
    if blocks_number == 0 {
        return Bounds::default();
    }
    let delta = work_size / blocks_number;
    let first = block_id * delta;
    let last = if block_id + 1 == blocks_number {
        work_size
    } else {
        (block_id + 1) * delta
    };
    Bounds::new(first, last)
}

/// Split `work_size` into at most `requested` blocks, never more than the hardware
/// thread count. Returns the actual block count alongside the shape.
pub fn make_regular_buffer_shape(
    work_size: usize,
    requested: usize,
) -> Result<(usize, BufferShape), PartitionError> {
    make_regular_buffer_shape_with_limit(work_size, requested, hardware_concurrency())
}

/// Same as [`make_regular_buffer_shape`] with an explicit block ceiling.
pub fn make_regular_buffer_shape_with_limit(
    work_size: usize,
    requested: usize,
    limit: usize,
) -> Result<(usize, BufferShape), PartitionError> {
    let blocks = requested.min(limit);
    if blocks == 0 {
        return Err(PartitionError::InvalidBlockSize { requested, limit });
    }

    let shape = (0..blocks)
        .map(|block_id| regular_bounds(work_size, block_id, blocks))
        .collect();

    Ok((blocks, shape))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(shape: &BufferShape, work_size: usize) {
        let mut expected_first = 0;
        for bounds in shape {
            assert!(bounds.first <= bounds.last, "bounds {:?} decrease", bounds);
            assert_eq!(bounds.first, expected_first, "gap or overlap at {:?}", bounds);
            expected_first = bounds.last;
        }
        assert_eq!(expected_first, work_size);
    }

    #[test]
    fn test_remainder_goes_to_last_block() {
        let (blocks, shape) = make_regular_buffer_shape_with_limit(17, 4, 8).unwrap();

        assert_eq!(blocks, 4);
        assert_eq!(
            shape.0,
            vec![
                Bounds::new(0, 4),
                Bounds::new(4, 8),
                Bounds::new(8, 12),
                Bounds::new(12, 17),
            ]
        );
    }

    #[test]
    fn test_block_count_is_clamped_to_limit() {
        let (blocks, shape) = make_regular_buffer_shape_with_limit(1_000, 10_000, 8).unwrap();
        assert_eq!(blocks, 8);
        assert_eq!(shape.len(), 8);
        assert_covers(&shape, 1_000);
    }

    #[test]
    fn test_hardware_clamp() {
        let hw = hardware_concurrency();
        let (blocks, _) = make_regular_buffer_shape(100, usize::MAX).unwrap();
        assert_eq!(blocks, hw);
        assert_eq!(right_block_count(usize::MAX), hw);
        assert_eq!(right_block_count(1), 1);
    }

    #[test]
    fn test_zero_blocks_is_rejected() {
        struct TestCase {
            name: &'static str,
            requested: usize,
            limit: usize,
        }

        let cases = vec![
            TestCase { name: "zero requested", requested: 0, limit: 8 },
            TestCase { name: "zero limit", requested: 4, limit: 0 },
        ];

        for case in cases {
            let result = make_regular_buffer_shape_with_limit(10, case.requested, case.limit);
            assert!(
                matches!(result, Err(PartitionError::InvalidBlockSize { .. })),
                "case '{}' should fail",
                case.name
            );
        }
    }

    #[test]
    fn test_coverage_for_many_sizes() {
        for work_size in [1usize, 2, 3, 7, 16, 17, 100, 1_023] {
            for blocks in 1..=8 {
                let (actual, shape) =
                    make_regular_buffer_shape_with_limit(work_size, blocks, 8).unwrap();
                assert_eq!(actual, blocks);
                assert_covers(&shape, work_size);
            }
        }
    }

    #[test]
    fn test_more_blocks_than_work_leaves_empty_leading_blocks() {
        let (_, shape) = make_regular_buffer_shape_with_limit(3, 4, 8).unwrap();
        // 3 / 4 == 0, so every block but the last is empty
        assert!(shape[0].is_empty());
        assert_eq!(shape[3], Bounds::new(0, 3));
    }

    #[test]
    fn test_bounds_overlap() {
        assert!(Bounds::new(0, 4).overlaps(&Bounds::new(3, 5)));
        assert!(!Bounds::new(0, 4).overlaps(&Bounds::new(4, 5)));
        assert!(!Bounds::new(2, 2).overlaps(&Bounds::new(0, 5)));
    }

    #[test]
    fn test_shape_validation() {
        let shape = BufferShape::from(vec![Bounds::new(0, 5), Bounds::new(5, 12)]);
        assert!(shape.validate(12).is_ok());
        assert_eq!(shape.work_size(), 12);

        let err = shape.validate(10).unwrap_err();
        assert!(matches!(err, PartitionError::InvalidShape { block: 1, .. }));

        let backwards = BufferShape::from(vec![Bounds::new(4, 2)]);
        assert!(backwards.validate(10).is_err());
    }
}
