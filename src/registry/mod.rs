// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Task registry: which kernel runs over which blocks with which arguments.

mod global;
mod table;
mod task;
mod task_id;


pub use global::{global, lock_global};
pub use table::TaskRegistry;
pub use task::{Task, TaskSpec};
pub use task_id::{TaskId, TaskSelector};
