// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::args::{ArgHandle, ArgList, BlockArgs, ExecutionMode};
use crate::config::consts::DEFAULT_DELAY;
use crate::config::EngineConfig;
use crate::errors::{ArgumentError, PartitionError, RegistryError};
use crate::observability::messages::registry::{
    RegistryCleared, RegistryRequestRejected, TaskRegistered, TaskReshaped, TaskUnregistered,
};
use crate::observability::messages::StructuredLog;
use crate::partition::{hardware_concurrency, make_regular_buffer_shape_with_limit, BufferShape};
use crate::registry::{Task, TaskId, TaskSelector, TaskSpec};
use crate::traits::{kernel_address, KernelFn, KernelResult};

struct Slot {
    generation: u64,
    task: Option<Task>,
}

/// Table of registered tasks.
///
/// Tasks live in a generation-checked arena, so a [`TaskId`] stays valid until its own
/// task is removed, whatever happens to other tasks. Registration order is kept
/// separately as a dense positional view: removing a task moves every later task down
/// one position, exactly as an erase from an ordered list would.
///
/// All mutation goes through `&mut self`; share a registry between threads behind a
/// lock, as [`crate::registry::global`] does.
pub struct TaskRegistry {
    slots: Vec<Slot>,
    free: Vec<usize>,
    order: Vec<TaskId>,
    block_limit: usize,
    default_delay: u64,
    default_mode: ExecutionMode,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    /// Registry capped at the hardware thread count, with a default block delay of 1.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            block_limit: hardware_concurrency(),
            default_delay: DEFAULT_DELAY,
            default_mode: ExecutionMode::Normal,
        }
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            block_limit: config.block_limit(),
            default_delay: config.default_delay,
            default_mode: config.default_mode,
            ..Self::new()
        }
    }

    /// Largest block count any task of this registry can have.
    pub fn block_limit(&self) -> usize {
        self.block_limit
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Live task ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.order.iter().copied()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.task(id).is_ok()
    }

    // --- registration ---

    /// Register a task described by `spec`.
    ///
    /// The block count is clamped to [`TaskRegistry::block_limit`]. Each block gets a
    /// copy of the argument handles, its bounds from the shape (regular when none was
    /// given), its index, the block count, the work size, the default delay and mode.
    pub fn register(&mut self, spec: TaskSpec) -> Result<TaskId, RegistryError> {
        let result = self.try_register(spec);
        logged("register", result)
    }

    fn try_register(&mut self, spec: TaskSpec) -> Result<TaskId, RegistryError> {
        let blocks = spec.blocks.min(self.block_limit);
        if blocks == 0 {
            return Err(PartitionError::InvalidBlockSize {
                requested: spec.blocks,
                limit: self.block_limit,
            }
            .into());
        }

        let shape = match spec.shape {
            Some(shape) => {
                if shape.len() < blocks {
                    return Err(RegistryError::ShapeTooShort {
                        expected: blocks,
                        actual: shape.len(),
                    });
                }
                let used = leading(&shape, blocks);
                used.validate(spec.work_size)?;
                used
            }
            None => make_regular_buffer_shape_with_limit(spec.work_size, blocks, blocks)?.1,
        };

        let block_args = (0..blocks)
            .map(|block_id| {
                let mut block = BlockArgs::from_list(&spec.args);
                block.set_bounds(shape[block_id]);
                block.set_block_id(block_id);
                block.set_blocks_number(blocks);
                block.set_work_size(spec.work_size);
                block.set_delay(self.default_delay);
                block.set_mode(self.default_mode);
                block
            })
            .collect();

        let position = self.order.len();
        let task = Task {
            kernel: spec.kernel,
            function: spec.function,
            name: spec.name.unwrap_or_else(|| position.to_string()),
            blocks: block_args,
            work_size: spec.work_size,
        };

        let id = self.allocate(task);
        self.order.push(id);

        if let Ok(task) = self.task(id) {
            TaskRegistered {
                task_name: &task.name,
                task_id: id,
                blocks,
                work_size: task.work_size,
            }
            .log();
        }
        Ok(id)
    }

    /// Register `kernel` over an explicit `shape`.
    pub fn register_task<F>(
        &mut self,
        block_count: usize,
        work_size: usize,
        shape: BufferShape,
        name: Option<&str>,
        kernel: F,
        args: ArgList,
    ) -> Result<TaskId, RegistryError>
    where
        F: Fn(&BlockArgs) -> KernelResult + Send + Sync + 'static,
    {
        self.register(
            TaskSpec::new(kernel)
                .blocks(block_count)
                .work_size(work_size)
                .shape(shape)
                .maybe_name(name)
                .args(args),
        )
    }

    /// Register `kernel` over a regular partition of `work_size`.
    pub fn register_task_regular<F>(
        &mut self,
        block_count: usize,
        work_size: usize,
        name: Option<&str>,
        kernel: F,
        args: ArgList,
    ) -> Result<TaskId, RegistryError>
    where
        F: Fn(&BlockArgs) -> KernelResult + Send + Sync + 'static,
    {
        self.register(
            TaskSpec::new(kernel)
                .blocks(block_count)
                .work_size(work_size)
                .maybe_name(name)
                .args(args),
        )
    }

    /// [`TaskRegistry::register_task`] for a function kernel, findable by that function.
    ///
    /// Lookup by function compares addresses (see [`kernel_address`]), so two functions
    /// the compiler merged are indistinguishable.
    pub fn register_fn(
        &mut self,
        block_count: usize,
        work_size: usize,
        shape: BufferShape,
        name: Option<&str>,
        kernel: KernelFn,
        args: ArgList,
    ) -> Result<TaskId, RegistryError> {
        self.register(
            TaskSpec::from_fn(kernel)
                .blocks(block_count)
                .work_size(work_size)
                .shape(shape)
                .maybe_name(name)
                .args(args),
        )
    }

    /// [`TaskRegistry::register_task_regular`] for a function kernel.
    pub fn register_fn_regular(
        &mut self,
        block_count: usize,
        work_size: usize,
        name: Option<&str>,
        kernel: KernelFn,
        args: ArgList,
    ) -> Result<TaskId, RegistryError> {
        self.register(
            TaskSpec::from_fn(kernel)
                .blocks(block_count)
                .work_size(work_size)
                .maybe_name(name)
                .args(args),
        )
    }

    // --- removal ---

    /// Release the task's containers and remove it. Every later task moves down one
    /// position; ids of other tasks are unaffected.
    pub fn unregister_task(&mut self, id: TaskId) -> Result<(), RegistryError> {
        let result = self.try_unregister(id);
        logged("unregister", result)
    }

    fn try_unregister(&mut self, id: TaskId) -> Result<(), RegistryError> {
        self.task(id)?;
        let position = self.position_of(id)?;
        self.order.remove(position);

        let slot = &mut self.slots[id.index()];
        if let Some(mut task) = slot.task.take() {
            task.release();
            TaskUnregistered {
                task_name: &task.name,
                task_id: id,
                shifted: self.order.len() - position,
            }
            .log();
        }
        slot.generation += 1;
        self.free.push(id.index());
        Ok(())
    }

    /// Release and remove every task.
    pub fn unregister_all(&mut self) {
        let task_count = self.order.len();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(mut task) = slot.task.take() {
                task.release();
                slot.generation += 1;
                self.free.push(index);
            }
        }
        self.order.clear();
        RegistryCleared { task_count }.log();
    }

    // --- reconfiguration ---

    /// Give every block new bounds from `shape`, keeping containers and block count.
    /// The task's work size becomes the largest `last` among the entries used; entries
    /// past the block count are ignored.
    pub fn reshape_buffer_shape(&mut self, id: TaskId, shape: &BufferShape) -> Result<(), RegistryError> {
        let result = self.try_reshape(id, shape);
        logged("reshape", result)
    }

    fn try_reshape(&mut self, id: TaskId, shape: &BufferShape) -> Result<(), RegistryError> {
        let task = self.task_mut(id)?;
        let blocks = task.blocks.len();
        if shape.len() < blocks {
            return Err(RegistryError::ShapeTooShort {
                expected: blocks,
                actual: shape.len(),
            });
        }
        let used = leading(shape, blocks);
        let work_size = used.work_size();
        used.validate(work_size)?;

        apply_shape(task, &used, work_size);
        Ok(())
    }

    /// Regular re-partition over `work_size`. Does nothing when the work size is
    /// unchanged; returns whether the bounds were recomputed.
    pub fn reshape_buffer_shape_regular(&mut self, id: TaskId, work_size: usize) -> Result<bool, RegistryError> {
        let result = self.try_reshape_regular(id, work_size);
        logged("reshape", result)
    }

    fn try_reshape_regular(&mut self, id: TaskId, work_size: usize) -> Result<bool, RegistryError> {
        let task = self.task_mut(id)?;
        if task.work_size == work_size {
            return Ok(false);
        }
        let blocks = task.blocks.len();
        let (_, shape) = make_regular_buffer_shape_with_limit(work_size, blocks, blocks)?;

        apply_shape(task, &shape, work_size);
        Ok(true)
    }

    /// Copy `args` into every block, keeping each block's bounds and ids.
    pub fn set_arguments_for_all_blocks(&mut self, id: TaskId, args: &ArgList) -> Result<(), RegistryError> {
        let result = self.task_mut(id).map(|task| {
            for block in &mut task.blocks {
                block.set_arguments(args);
            }
        });
        logged("set arguments", result)
    }

    /// Rebind argument `index` to `handle` in every block of the task.
    pub fn update_argument(&mut self, id: TaskId, index: usize, handle: ArgHandle) -> Result<(), RegistryError> {
        self.update_arguments(id, [(index, handle)])
    }

    /// Rebind argument `index` to a new value shared by every block.
    pub fn update_argument_value<T: std::any::Any + Send + Sync>(
        &mut self,
        id: TaskId,
        index: usize,
        value: T,
    ) -> Result<(), RegistryError> {
        self.update_argument(id, index, ArgHandle::new(value))
    }

    /// Rebind several slots at once. Every index is checked before any block changes.
    pub fn update_arguments<I>(&mut self, id: TaskId, updates: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = (usize, ArgHandle)>,
    {
        let updates: Vec<_> = updates.into_iter().collect();
        let result = self.try_update_arguments(id, &updates);
        logged("update arguments", result)
    }

    /// [`TaskRegistry::update_arguments`] with indices and handles in parallel lists.
    pub fn update_arguments_zip(
        &mut self,
        id: TaskId,
        indices: &[usize],
        handles: Vec<ArgHandle>,
    ) -> Result<(), RegistryError> {
        if indices.len() != handles.len() {
            return logged(
                "update arguments",
                Err(RegistryError::ArgumentListMismatch {
                    indices: indices.len(),
                    handles: handles.len(),
                }),
            );
        }
        self.update_arguments(id, indices.iter().copied().zip(handles))
    }

    fn try_update_arguments(&mut self, id: TaskId, updates: &[(usize, ArgHandle)]) -> Result<(), RegistryError> {
        let task = self.task_mut(id)?;
        for block in &task.blocks {
            let count = block.argument_count();
            if let Some((index, _)) = updates.iter().find(|(index, _)| *index >= count) {
                return Err(ArgumentError::IndexOutOfRange { index: *index, count }.into());
            }
        }
        for block in &mut task.blocks {
            for (index, handle) in updates {
                block.set_argument(*index, handle.clone())?;
            }
        }
        Ok(())
    }

    /// Same delay for every block.
    pub fn set_delay(&mut self, id: TaskId, delay: u64) -> Result<(), RegistryError> {
        let result = self.task_mut(id).map(|task| {
            for block in &mut task.blocks {
                block.set_delay(delay);
            }
        });
        logged("set delay", result)
    }

    /// One delay per block, in block order.
    pub fn set_delays(&mut self, id: TaskId, delays: &[u64]) -> Result<(), RegistryError> {
        let result = self.task_mut(id).and_then(|task| {
            check_block_list("delay", task, delays.len())?;
            for (block, delay) in task.blocks.iter_mut().zip(delays) {
                block.set_delay(*delay);
            }
            Ok(())
        });
        logged("set delays", result)
    }

    /// Same run mode for every block.
    pub fn set_execution_mode(&mut self, id: TaskId, mode: ExecutionMode) -> Result<(), RegistryError> {
        let result = self.task_mut(id).map(|task| {
            for block in &mut task.blocks {
                block.set_mode(mode);
            }
        });
        logged("set execution mode", result)
    }

    /// One run mode per block, in block order.
    pub fn set_execution_modes(&mut self, id: TaskId, modes: &[ExecutionMode]) -> Result<(), RegistryError> {
        let result = self.task_mut(id).and_then(|task| {
            check_block_list("execution mode", task, modes.len())?;
            for (block, mode) in task.blocks.iter_mut().zip(modes) {
                block.set_mode(*mode);
            }
            Ok(())
        });
        logged("set execution modes", result)
    }

    // --- lookup ---

    /// First task, in registration order, whose name is exactly `name`.
    pub fn task_id_by_name(&self, name: &str) -> Result<TaskId, RegistryError> {
        self.find(|task| task.name == name)
            .ok_or_else(|| RegistryError::NameNotFound(name.to_string()))
    }

    /// First task registered from the function `kernel`.
    ///
    /// Matches by address; functions with identical bodies may share one, and a task
    /// registered in one codegen unit is not always found from another. Prefer
    /// [`TaskRegistry::task_id_by_name`] when names are available.
    pub fn task_id_by_fn(&self, kernel: KernelFn) -> Result<TaskId, RegistryError> {
        self.task_id_by_address(kernel_address(kernel))
    }

    fn task_id_by_address(&self, address: usize) -> Result<TaskId, RegistryError> {
        self.find(|task| task.function == Some(address))
            .ok_or(RegistryError::FunctionNotFound(address))
    }

    /// Id of the task at dense `position`.
    pub fn task_id_at(&self, position: usize) -> Result<TaskId, RegistryError> {
        self.order
            .get(position)
            .copied()
            .ok_or(RegistryError::PositionOutOfRange {
                position,
                len: self.order.len(),
            })
    }

    /// Current dense position of `id`.
    pub fn position_of(&self, id: TaskId) -> Result<usize, RegistryError> {
        self.task(id)?;
        self.order
            .iter()
            .position(|live| *live == id)
            .ok_or(RegistryError::StaleTask(id))
    }

    pub fn resolve(&self, selector: &TaskSelector) -> Result<TaskId, RegistryError> {
        match selector {
            TaskSelector::Id(id) => self.task(*id).map(|_| *id),
            TaskSelector::Position(position) => self.task_id_at(*position),
            TaskSelector::Name(name) => self.task_id_by_name(name),
            TaskSelector::Function(address) => self.task_id_by_address(*address),
        }
    }

    fn find(&self, predicate: impl Fn(&Task) -> bool) -> Option<TaskId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.task(*id).map(&predicate).unwrap_or(false))
    }

    // --- queries ---

    pub fn task(&self, id: TaskId) -> Result<&Task, RegistryError> {
        let slot = self
            .slots
            .get(id.index())
            .ok_or(RegistryError::UnknownTask(id))?;
        match &slot.task {
            Some(task) if slot.generation == id.generation() => Ok(task),
            _ => Err(RegistryError::StaleTask(id)),
        }
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, RegistryError> {
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(RegistryError::UnknownTask(id))?;
        match &mut slot.task {
            Some(task) if slot.generation == id.generation() => Ok(task),
            _ => Err(RegistryError::StaleTask(id)),
        }
    }

    pub fn name(&self, id: TaskId) -> Result<&str, RegistryError> {
        self.task(id).map(Task::name)
    }

    pub fn work_size(&self, id: TaskId) -> Result<usize, RegistryError> {
        self.task(id).map(Task::work_size)
    }

    pub fn block_count(&self, id: TaskId) -> Result<usize, RegistryError> {
        self.task(id).map(Task::block_count)
    }

    /// Every block's container, in block order.
    pub fn block_arguments(&self, id: TaskId) -> Result<&[BlockArgs], RegistryError> {
        self.task(id).map(Task::blocks)
    }

    pub fn block_argument(&self, id: TaskId, block: usize) -> Result<&BlockArgs, RegistryError> {
        let task = self.task(id)?;
        task.blocks.get(block).ok_or(RegistryError::BlockOutOfRange {
            task: id,
            block,
            blocks: task.blocks.len(),
        })
    }

    fn allocate(&mut self, task: Task) -> TaskId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.task = Some(task);
                TaskId::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    task: Some(task),
                });
                TaskId::new(self.slots.len() - 1, 0)
            }
        }
    }
}

fn apply_shape(task: &mut Task, shape: &BufferShape, work_size: usize) {
    for (block, bounds) in task.blocks.iter_mut().zip(shape) {
        block.set_bounds(*bounds);
        block.set_work_size(work_size);
    }
    task.work_size = work_size;

    TaskReshaped {
        task_name: &task.name,
        work_size,
        blocks: task.blocks.len(),
    }
    .log();
}

/// The first `blocks` entries of `shape`; entries past the block count are ignored.
fn leading(shape: &BufferShape, blocks: usize) -> BufferShape {
    shape.iter().take(blocks).copied().collect()
}

fn check_block_list(list: &'static str, task: &Task, actual: usize) -> Result<(), RegistryError> {
    let expected = task.blocks.len();
    if actual < expected {
        return Err(RegistryError::IncompleteBlockList {
            list,
            expected,
            actual,
        });
    }
    Ok(())
}

fn logged<T>(operation: &str, result: Result<T, RegistryError>) -> Result<T, RegistryError> {
    if let Err(error) = &result {
        RegistryRequestRejected { operation, error }.log();
    }
    result
}
