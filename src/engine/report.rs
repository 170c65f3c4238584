// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use serde::Serialize;

use crate::errors::ExecutionError;
use crate::registry::TaskId;

/// What became of one block during an `execute` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BlockOutcome {
    /// Normal block joined after its kernel returned `Ok`.
    Joined,
    /// Kernel returned an error.
    Failed { reason: String },
    /// Kernel panicked; `reason` is the panic message when it was a string.
    Panicked { reason: String },
    /// Background block left running; its result is not observed.
    Detached,
}

impl BlockOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, BlockOutcome::Failed { .. } | BlockOutcome::Panicked { .. })
    }

    fn reason(&self) -> Option<&str> {
        match self {
            BlockOutcome::Failed { reason } | BlockOutcome::Panicked { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Result of one `execute` call: one outcome per block, in block order.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub task_id: TaskId,
    pub task_name: String,
    pub outcomes: Vec<BlockOutcome>,
    /// Wall-clock time from the first spawn to the last normal join.
    pub elapsed: Duration,
}

impl ExecutionReport {
    pub fn joined(&self) -> usize {
        self.count(|outcome| *outcome == BlockOutcome::Joined)
    }

    pub fn detached(&self) -> usize {
        self.count(|outcome| *outcome == BlockOutcome::Detached)
    }

    /// Failed or panicked blocks with their block index.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &BlockOutcome)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| outcome.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// The report itself, or the first failed block as an error.
    pub fn into_result(self) -> Result<Self, ExecutionError> {
        let first = self
            .failures()
            .next()
            .map(|(block, outcome)| (block, outcome.reason().unwrap_or_default().to_string()));
        match first {
            Some((block, reason)) => Err(ExecutionError::BlockFailed {
                task: self.task_id,
                block,
                reason,
            }),
            None => Ok(self),
        }
    }

    fn count(&self, predicate: impl Fn(&BlockOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|outcome| predicate(outcome)).count()
    }
}
