// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::any::{type_name, Any};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::args::{ArgHandle, ArgList};
use crate::errors::ArgumentError;
use crate::partition::{regular_bounds, Bounds};

/// Process-wide lock behind [`critical_section`]. One lock for every task and block.
static CRITICAL_SECTION: Mutex<()> = Mutex::new(());

/// Enter the single process-wide critical section.
///
/// Kernels take it to fold a per-block partial result into a shared accumulator. It
/// serializes every holder in the process, regardless of task or accumulator; callers
/// that need finer granularity keep their own locks. Released when the guard drops.
pub fn critical_section() -> MutexGuard<'static, ()> {
    CRITICAL_SECTION
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Whether `execute` waits for a block before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// The caller joins the block.
    #[default]
    Normal,
    /// The block is detached and may outlive the `execute` call.
    Background,
}

/// Unit a block's `delay` is interpreted in when it paces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayUnit {
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl DelayUnit {
    pub fn duration(self, delay: u64) -> Duration {
        match self {
            DelayUnit::Hours => Duration::from_secs(delay.saturating_mul(3_600)),
            DelayUnit::Minutes => Duration::from_secs(delay.saturating_mul(60)),
            DelayUnit::Seconds => Duration::from_secs(delay),
            DelayUnit::Milliseconds => Duration::from_millis(delay),
            DelayUnit::Microseconds => Duration::from_micros(delay),
            DelayUnit::Nanoseconds => Duration::from_nanos(delay),
        }
    }
}

/// Per-block argument container.
///
/// Holds the task's argument handles (shared with every other block of the task)
/// together with the scheduling metadata of this one block: its bounds, its index,
/// the task's block count and work size, a pacing delay and its run mode.
#[derive(Debug, Clone, Default)]
pub struct BlockArgs {
    args: Vec<Option<ArgHandle>>,
    bounds: Bounds,
    block_id: usize,
    blocks_number: usize,
    work_size: usize,
    delay: u64,
    mode: ExecutionMode,
}

impl BlockArgs {
    /// A container with `count` empty argument slots.
    pub fn new(count: usize) -> Self {
        Self {
            args: vec![None; count],
            ..Self::default()
        }
    }

    /// A container holding a copy of every handle in `list`.
    pub fn from_list(list: &ArgList) -> Self {
        let mut block = Self::default();
        block.set_arguments(list);
        block
    }

    /// Resize the argument slots. Scheduling metadata is untouched; new slots are empty.
    pub fn set_argument_count(&mut self, count: usize) {
        self.args.resize(count, None);
    }

    pub fn argument_count(&self) -> usize {
        self.args.len()
    }

    /// Replace every slot with the handles of `list`.
    pub fn set_arguments(&mut self, list: &ArgList) {
        self.args = list.iter().cloned().map(Some).collect();
    }

    pub fn set_argument(&mut self, index: usize, handle: ArgHandle) -> Result<(), ArgumentError> {
        let count = self.args.len();
        let slot = self
            .args
            .get_mut(index)
            .ok_or(ArgumentError::IndexOutOfRange { index, count })?;
        *slot = Some(handle);
        Ok(())
    }

    pub fn argument(&self, index: usize) -> Result<&ArgHandle, ArgumentError> {
        self.args
            .get(index)
            .ok_or(ArgumentError::IndexOutOfRange {
                index,
                count: self.args.len(),
            })?
            .as_ref()
            .ok_or(ArgumentError::EmptySlot { index })
    }

    /// Checked typed access to argument `index`.
    pub fn get<T: Any>(&self, index: usize) -> Result<&T, ArgumentError> {
        let handle = self.argument(index)?;
        handle
            .downcast_ref::<T>()
            .ok_or_else(|| ArgumentError::TypeMismatch {
                index,
                expected: type_name::<T>(),
                actual: handle.type_name(),
            })
    }

    /// Shared ownership of argument `index`, for values a kernel hands to other threads.
    pub fn get_arc<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, ArgumentError> {
        let handle = self.argument(index)?;
        handle
            .downcast_arc::<T>()
            .ok_or_else(|| ArgumentError::TypeMismatch {
                index,
                expected: type_name::<T>(),
                actual: handle.type_name(),
            })
    }

    /// Unchecked typed access: no bounds, slot or type check in release builds.
    ///
    /// For hot kernels that built their own argument list. Debug builds still assert.
    ///
    /// # Safety
    ///
    /// `index` must be below [`BlockArgs::argument_count`], the slot must be filled
    /// and it must hold a `T`.
    pub unsafe fn get_unchecked<T: Any>(&self, index: usize) -> &T {
        debug_assert!(index < self.args.len(), "argument index {} out of range", index);
        // SAFETY: the caller guarantees the index is in range, the slot is filled and
        // the value is a `T`.
        unsafe {
            self.args
                .get_unchecked(index)
                .as_ref()
                .unwrap_unchecked()
                .downcast_ref_unchecked::<T>()
        }
    }

    /// Typed access without a `Result`, for kernels that registered their own arguments.
    ///
    /// # Panics
    ///
    /// Panics if the slot is missing, empty, or holds a different type.
    pub fn typed<T: Any>(&self, index: usize) -> &T {
        match self.get::<T>(index) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    pub fn block_id(&self) -> usize {
        self.block_id
    }

    pub fn set_block_id(&mut self, block_id: usize) {
        self.block_id = block_id;
    }

    pub fn blocks_number(&self) -> usize {
        self.blocks_number
    }

    pub fn set_blocks_number(&mut self, blocks_number: usize) {
        self.blocks_number = blocks_number;
    }

    pub fn work_size(&self) -> usize {
        self.work_size
    }

    pub fn set_work_size(&mut self, work_size: usize) {
        self.work_size = work_size;
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn set_delay(&mut self, delay: u64) {
        self.delay = delay;
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ExecutionMode) {
        self.mode = mode;
    }

    /// Regular bounds of this block over `work_size`, from its block id and count.
    pub fn compute_regular_bounds(&self, work_size: usize) -> Bounds {
        regular_bounds(work_size, self.block_id, self.blocks_number)
    }

    /// See [`critical_section`].
    pub fn critical_section(&self) -> MutexGuard<'static, ()> {
        critical_section()
    }

    /// Drop every handle and zero the metadata. Calling it twice is harmless.
    pub fn release(&mut self) {
        *self = Self::default();
    }

    /// Sleep for `delay` units of `unit`.
    pub fn pace(&self, unit: DelayUnit) {
        std::thread::sleep(unit.duration(self.delay));
    }

    pub fn sleep_hours(&self) {
        self.pace(DelayUnit::Hours);
    }

    pub fn sleep_minutes(&self) {
        self.pace(DelayUnit::Minutes);
    }

    pub fn sleep_seconds(&self) {
        self.pace(DelayUnit::Seconds);
    }

    pub fn sleep_millis(&self) {
        self.pace(DelayUnit::Milliseconds);
    }

    pub fn sleep_micros(&self) {
        self.pace(DelayUnit::Microseconds);
    }

    pub fn sleep_nanos(&self) {
        self.pace(DelayUnit::Nanoseconds);
    }
}

impl From<&BlockArgs> for Bounds {
    fn from(block: &BlockArgs) -> Self {
        block.bounds
    }
}

impl From<&BlockArgs> for usize {
    fn from(block: &BlockArgs) -> Self {
        block.block_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> BlockArgs {
        let mut block = BlockArgs::from_list(&ArgList::new().with(vec![1.0_f64, 2.0]).with(7_u32));
        block.set_bounds(Bounds::new(4, 8));
        block.set_block_id(1);
        block.set_blocks_number(4);
        block.set_work_size(17);
        block.set_delay(3);
        block
    }

    #[test]
    fn test_checked_access() {
        let block = sample_block();
        assert_eq!(block.get::<Vec<f64>>(0).unwrap(), &vec![1.0, 2.0]);
        assert_eq!(*block.typed::<u32>(1), 7);
    }

    #[test]
    fn test_unchecked_access_matches_checked() {
        let block = sample_block();
        // SAFETY: `sample_block` stores a `Vec<f64>` at 0 and a `u32` at 1.
        let (values, count) = unsafe { (block.get_unchecked::<Vec<f64>>(0), block.get_unchecked::<u32>(1)) };
        assert_eq!(values, block.get::<Vec<f64>>(0).unwrap());
        assert!(std::ptr::eq(count, block.get::<u32>(1).unwrap()));
        assert_eq!(*count, 7);
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let block = sample_block();
        let err = block.get::<String>(1).unwrap_err();
        assert_eq!(
            err,
            ArgumentError::TypeMismatch {
                index: 1,
                expected: type_name::<String>(),
                actual: "u32",
            }
        );
    }

    #[test]
    #[should_panic(expected = "argument type mismatch")]
    fn test_typed_panics_on_mismatch() {
        sample_block().typed::<i64>(1);
    }

    #[test]
    fn test_out_of_range_index_fails_fast() {
        let mut block = sample_block();
        assert_eq!(
            block.get::<u32>(2).unwrap_err(),
            ArgumentError::IndexOutOfRange { index: 2, count: 2 }
        );
        assert!(block.set_argument(5, ArgHandle::new(1_u8)).is_err());
        assert_eq!(block.argument_count(), 2);
    }

    #[test]
    fn test_argument_count_change_preserves_metadata() {
        let mut block = sample_block();
        block.set_argument_count(4);

        assert_eq!(block.argument_count(), 4);
        assert_eq!(block.get::<u32>(3).unwrap_err(), ArgumentError::EmptySlot { index: 3 });
        assert_eq!(block.bounds(), Bounds::new(4, 8));
        assert_eq!(block.block_id(), 1);
        assert_eq!(block.work_size(), 17);

        block.set_argument_count(1);
        assert_eq!(block.argument_count(), 1);
        assert_eq!(block.blocks_number(), 4);
        assert!(block.get::<Vec<f64>>(0).is_ok());
    }

    #[test]
    fn test_compute_regular_bounds() {
        struct TestCase {
            block_id: usize,
            expected: Bounds,
        }

        let cases = vec![
            TestCase { block_id: 0, expected: Bounds::new(0, 4) },
            TestCase { block_id: 2, expected: Bounds::new(8, 12) },
            TestCase { block_id: 3, expected: Bounds::new(12, 17) },
        ];

        let mut block = sample_block();
        for case in cases {
            block.set_block_id(case.block_id);
            assert_eq!(block.compute_regular_bounds(17), case.expected);
        }
    }

    #[test]
    fn test_conversions() {
        let block = sample_block();
        assert_eq!(Bounds::from(&block), Bounds::new(4, 8));
        assert_eq!(usize::from(&block), 1);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut block = sample_block();
        block.release();
        block.release();

        assert_eq!(block.argument_count(), 0);
        assert_eq!(block.bounds(), Bounds::default());
        assert_eq!(block.work_size(), 0);
        assert_eq!(block.delay(), 0);
    }

    #[test]
    fn test_delay_units() {
        assert_eq!(DelayUnit::Hours.duration(2), Duration::from_secs(7_200));
        assert_eq!(DelayUnit::Minutes.duration(2), Duration::from_secs(120));
        assert_eq!(DelayUnit::Milliseconds.duration(5), Duration::from_millis(5));
        assert_eq!(DelayUnit::Nanoseconds.duration(5), Duration::from_nanos(5));
    }

    #[test]
    fn test_critical_section_is_reentrant_after_drop() {
        let block = sample_block();
        {
            let _guard = block.critical_section();
        }
        let _again = critical_section();
    }
}
