// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::Arc;

use crate::args::{ArgList, BlockArgs};
use crate::partition::{hardware_concurrency, BufferShape};
use crate::traits::{kernel_address, BlockKernel, KernelFn, KernelResult};

/// A registered kernel with one argument container per block.
pub struct Task {
    pub(crate) kernel: Arc<dyn BlockKernel>,
    pub(crate) function: Option<usize>,
    pub(crate) name: String,
    pub(crate) blocks: Vec<BlockArgs>,
    pub(crate) work_size: usize,
}

impl Task {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kernel(&self) -> &Arc<dyn BlockKernel> {
        &self.kernel
    }

    /// Address of the `fn` kernel, when the task was registered from one.
    pub fn function(&self) -> Option<usize> {
        self.function
    }

    pub fn blocks(&self) -> &[BlockArgs] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn work_size(&self) -> usize {
        self.work_size
    }

    pub(crate) fn release(&mut self) {
        for block in &mut self.blocks {
            block.release();
        }
        self.blocks.clear();
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("function", &self.function)
            .field("block_count", &self.blocks.len())
            .field("work_size", &self.work_size)
            .finish()
    }
}

/// Everything needed to register a task.
///
/// ```
/// use parblock::args::{ArgList, BlockArgs};
/// use parblock::registry::{TaskRegistry, TaskSpec};
///
/// let mut registry = TaskRegistry::new();
/// let id = registry
///     .register(
///         TaskSpec::new(|_: &BlockArgs| Ok(()))
///             .name("noop")
///             .blocks(2)
///             .work_size(10)
///             .args(ArgList::new().with(1_u8)),
///     )
///     .unwrap();
/// assert_eq!(registry.name(id).unwrap(), "noop");
/// ```
pub struct TaskSpec {
    pub(crate) kernel: Arc<dyn BlockKernel>,
    pub(crate) function: Option<usize>,
    pub(crate) name: Option<String>,
    pub(crate) blocks: usize,
    pub(crate) work_size: usize,
    pub(crate) shape: Option<BufferShape>,
    pub(crate) args: ArgList,
}

impl TaskSpec {
    /// Defaults: one block per hardware thread, zero work size, regular shape, no arguments.
    pub fn new<F>(kernel: F) -> Self
    where
        F: Fn(&BlockArgs) -> KernelResult + Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(kernel), None)
    }

    /// A task around any [`BlockKernel`] implementation.
    pub fn with_kernel<K: BlockKernel + 'static>(kernel: K) -> Self {
        Self::from_arc(Arc::new(kernel), None)
    }

    /// A task around a kernel already shared elsewhere.
    pub fn from_shared(kernel: Arc<dyn BlockKernel>) -> Self {
        Self::from_arc(kernel, None)
    }

    /// Like [`TaskSpec::new`], also recording the function so the task can be found by it.
    /// The recorded identity is the function's address (see [`kernel_address`]).
    pub fn from_fn(kernel: KernelFn) -> Self {
        Self::from_arc(Arc::new(kernel), Some(kernel_address(kernel)))
    }

    fn from_arc(kernel: Arc<dyn BlockKernel>, function: Option<usize>) -> Self {
        Self {
            kernel,
            function,
            name: None,
            blocks: hardware_concurrency(),
            work_size: 0,
            shape: None,
            args: ArgList::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn maybe_name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(str::to_string);
        self
    }

    pub fn blocks(mut self, blocks: usize) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn work_size(mut self, work_size: usize) -> Self {
        self.work_size = work_size;
        self
    }

    /// Use `shape` verbatim instead of regular partitioning.
    pub fn shape(mut self, shape: BufferShape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn args(mut self, args: ArgList) -> Self {
        self.args = args;
        self
    }
}
