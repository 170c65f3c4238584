// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use serde::Serialize;

use crate::traits::{kernel_address, KernelFn};

/// Generation-checked handle to a registered task.
///
/// The `index` names a slot in the registry; the `generation` is bumped every time the
/// slot is vacated, so an id kept after its task was unregistered is detected as stale
/// instead of silently pointing at whatever task reused the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId {
    index: usize,
    generation: u64,
}

impl TaskId {
    pub(crate) fn new(index: usize, generation: u64) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Every way a caller can name a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSelector {
    Id(TaskId),
    /// Dense registration-order position; shifts down when an earlier task is removed.
    Position(usize),
    Name(String),
    /// Address of the `fn` kernel the task was registered with.
    Function(usize),
}

impl From<TaskId> for TaskSelector {
    fn from(id: TaskId) -> Self {
        TaskSelector::Id(id)
    }
}

impl From<&TaskId> for TaskSelector {
    fn from(id: &TaskId) -> Self {
        TaskSelector::Id(*id)
    }
}

impl From<usize> for TaskSelector {
    fn from(position: usize) -> Self {
        TaskSelector::Position(position)
    }
}

impl From<&str> for TaskSelector {
    fn from(name: &str) -> Self {
        TaskSelector::Name(name.to_string())
    }
}

impl From<String> for TaskSelector {
    fn from(name: String) -> Self {
        TaskSelector::Name(name)
    }
}

impl From<KernelFn> for TaskSelector {
    fn from(kernel: KernelFn) -> Self {
        TaskSelector::Function(kernel_address(kernel))
    }
}

impl fmt::Display for TaskSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskSelector::Id(id) => write!(f, "id {}", id),
            TaskSelector::Position(position) => write!(f, "position {}", position),
            TaskSelector::Name(name) => write!(f, "name '{}'", name),
            TaskSelector::Function(address) => write!(f, "function {:#x}", address),
        }
    }
}
