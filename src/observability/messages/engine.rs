// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for block executor lifecycle and per-block outcomes.
//!
//! This module contains message types for logging events related to:
//! * The start and end of one `execute` episode
//! * Block threads that fail, panic or cannot be spawned
//! * Blocks left running in the background

use std::fmt::{Display, Formatter};
use std::time::Duration;

use tracing::Span;

use crate::observability::messages::StructuredLog;
use crate::registry::TaskId;

/// Execution of a task's blocks is starting.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use parblock::observability::messages::engine::ExecutionStarted;
/// # let mut registry = parblock::registry::TaskRegistry::new();
/// # let task_id = registry.register_task_regular(
/// #     1, 8, Some("sum"),
/// #     |_: &parblock::args::BlockArgs| Ok(()),
/// #     parblock::args::ArgList::new(),
/// # ).unwrap();
///
/// let msg = ExecutionStarted {
///     task_name: "sum",
///     task_id,
///     blocks: 4,
///     background_blocks: 1,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ExecutionStarted<'a> {
    pub task_name: &'a str,
    pub task_id: TaskId,
    pub blocks: usize,
    pub background_blocks: usize,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting task '{}' ({}): {} blocks, {} in background",
            self.task_name, self.task_id, self.blocks, self.background_blocks
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            task_name = self.task_name,
            task_id = %self.task_id,
            blocks = self.blocks,
            background_blocks = self.background_blocks,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            task_name = self.task_name,
            task_id = %self.task_id,
            blocks = self.blocks,
        )
    }
}

/// Every normal block has been joined.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionCompleted<'a> {
    pub task_name: &'a str,
    pub joined: usize,
    pub detached: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl Display for ExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' completed in {:?}: {} joined, {} detached, {} failed",
            self.task_name, self.duration, self.joined, self.detached, self.failed
        )
    }
}

impl StructuredLog for ExecutionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            task_name = self.task_name,
            joined = self.joined,
            detached = self.detached,
            failed = self.failed,
            duration_us = self.duration.as_micros() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_completed",
            span_name = name,
            task_name = self.task_name,
            duration = ?self.duration,
        )
    }
}

/// A block's kernel returned an error or panicked.
///
/// # Log Level
/// `warn!` - The episode continues; other blocks are unaffected
pub struct BlockFailed<'a> {
    pub task_name: &'a str,
    pub block: usize,
    pub panicked: bool,
    pub reason: &'a str,
}

impl Display for BlockFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let kind = if self.panicked { "panicked" } else { "failed" };
        write!(
            f,
            "Block {} of task '{}' {}: {}",
            self.block, self.task_name, kind, self.reason
        )
    }
}

impl StructuredLog for BlockFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            task_name = self.task_name,
            block = self.block,
            panicked = self.panicked,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "block_failed",
            span_name = name,
            task_name = self.task_name,
            block = self.block,
        )
    }
}

/// A block thread could not be started.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct BlockSpawnFailed<'a> {
    pub task_name: &'a str,
    pub block: usize,
    pub error: &'a dyn std::error::Error,
}

impl Display for BlockSpawnFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Could not spawn block {} of task '{}': {}",
            self.block, self.task_name, self.error
        )
    }
}

impl StructuredLog for BlockSpawnFailed<'_> {
    fn log(&self) {
        tracing::error!(
            task_name = self.task_name,
            block = self.block,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "block_spawn_failed",
            span_name = name,
            task_name = self.task_name,
            block = self.block,
            error = %self.error,
        )
    }
}

/// A background block was detached and is no longer tracked.
///
/// # Log Level
/// `debug!` - Expected behavior for background blocks
pub struct BlockDetached<'a> {
    pub task_name: &'a str,
    pub block: usize,
}

impl Display for BlockDetached<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Block {} of task '{}' detached to run in background",
            self.block, self.task_name
        )
    }
}

impl StructuredLog for BlockDetached<'_> {
    fn log(&self) {
        tracing::debug!(task_name = self.task_name, block = self.block, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "block_detached",
            span_name = name,
            task_name = self.task_name,
            block = self.block,
        )
    }
}
