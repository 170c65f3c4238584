// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for task registry events.
//!
//! This module contains message types for logging events related to:
//! * Task registration and removal
//! * Reshaping a task's blocks
//! * Requests the registry rejected

use std::fmt::{Display, Formatter};

use tracing::Span;

use crate::observability::messages::StructuredLog;
use crate::registry::TaskId;

/// A task was added to the registry.
///
/// # Log Level
/// `info!` - Important operational event
pub struct TaskRegistered<'a> {
    pub task_name: &'a str,
    pub task_id: TaskId,
    pub blocks: usize,
    pub work_size: usize,
}

impl Display for TaskRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered task '{}' as {}: {} blocks over work size {}",
            self.task_name, self.task_id, self.blocks, self.work_size
        )
    }
}

impl StructuredLog for TaskRegistered<'_> {
    fn log(&self) {
        tracing::info!(
            task_name = self.task_name,
            task_id = %self.task_id,
            blocks = self.blocks,
            work_size = self.work_size,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "task_registered",
            span_name = name,
            task_name = self.task_name,
            task_id = %self.task_id,
        )
    }
}

/// A task and its block containers were released.
///
/// # Log Level
/// `info!` - Important operational event
pub struct TaskUnregistered<'a> {
    pub task_name: &'a str,
    pub task_id: TaskId,
    pub shifted: usize,
}

impl Display for TaskUnregistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unregistered task '{}' ({}); {} later tasks moved down one position",
            self.task_name, self.task_id, self.shifted
        )
    }
}

impl StructuredLog for TaskUnregistered<'_> {
    fn log(&self) {
        tracing::info!(
            task_name = self.task_name,
            task_id = %self.task_id,
            shifted = self.shifted,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "task_unregistered",
            span_name = name,
            task_name = self.task_name,
            task_id = %self.task_id,
        )
    }
}

/// Every task was removed at once.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use parblock::observability::messages::registry::RegistryCleared;
///
/// let msg = RegistryCleared { task_count: 3 };
/// assert_eq!(msg.to_string(), "Unregistered all 3 tasks");
/// ```
pub struct RegistryCleared {
    pub task_count: usize,
}

impl Display for RegistryCleared {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Unregistered all {} tasks", self.task_count)
    }
}

impl StructuredLog for RegistryCleared {
    fn log(&self) {
        tracing::info!(task_count = self.task_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("registry_cleared", span_name = name, task_count = self.task_count)
    }
}

/// A task's block bounds were recomputed.
///
/// # Log Level
/// `debug!` - Reconfiguration detail
pub struct TaskReshaped<'a> {
    pub task_name: &'a str,
    pub work_size: usize,
    pub blocks: usize,
}

impl Display for TaskReshaped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reshaped task '{}' to work size {} over {} blocks",
            self.task_name, self.work_size, self.blocks
        )
    }
}

impl StructuredLog for TaskReshaped<'_> {
    fn log(&self) {
        tracing::debug!(
            task_name = self.task_name,
            work_size = self.work_size,
            blocks = self.blocks,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "task_reshaped",
            span_name = name,
            task_name = self.task_name,
            work_size = self.work_size,
        )
    }
}

/// The registry refused an operation and left its state untouched.
///
/// # Log Level
/// `warn!` - Caller error, no state changed
pub struct RegistryRequestRejected<'a> {
    pub operation: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RegistryRequestRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Registry rejected {}: {}", self.operation, self.error)
    }
}

impl StructuredLog for RegistryRequestRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            operation = self.operation,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "registry_request_rejected",
            span_name = name,
            operation = self.operation,
            error = %self.error,
        )
    }
}
