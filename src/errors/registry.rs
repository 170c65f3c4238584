// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for task registration, lookup and reconfiguration.

use thiserror::Error;

use crate::errors::{ArgumentError, PartitionError};
use crate::registry::TaskId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The id's slot index was never allocated by this registry.
    #[error("invalid task id {0}")]
    UnknownTask(TaskId),

    /// The id refers to a task that has since been unregistered.
    #[error("task id {0} is stale: the task was unregistered")]
    StaleTask(TaskId),

    #[error("no task registered under the name '{0}'")]
    NameNotFound(String),

    #[error("no task registered for function at {0:#x}")]
    FunctionNotFound(usize),

    #[error("task position {position} out of range for {len} registered tasks")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("block {block} out of range for task {task} with {blocks} blocks")]
    BlockOutOfRange {
        task: TaskId,
        block: usize,
        blocks: usize,
    },

    #[error("shape has {actual} bounds but {expected} blocks need one each")]
    ShapeTooShort { expected: usize, actual: usize },

    /// A per-block list does not cover every block of the task.
    #[error("incomplete {list} list: {actual} entries for {expected} blocks")]
    IncompleteBlockList {
        list: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{indices} argument indices given with {handles} handles")]
    ArgumentListMismatch { indices: usize, handles: usize },

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),
}
