// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced by the block executor.

use thiserror::Error;

use crate::errors::RegistryError;
use crate::registry::TaskId;

#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The task could not be resolved; nothing was spawned.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The OS refused to start a block thread. Blocks spawned before it were joined.
    #[error("failed to spawn thread for block {block} of task {task}: {source}")]
    Spawn {
        task: TaskId,
        block: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("block {block} of task {task} failed: {reason}")]
    BlockFailed {
        task: TaskId,
        block: usize,
        reason: String,
    },
}
