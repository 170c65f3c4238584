// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::registry::TaskRegistry;

static GLOBAL_REGISTRY: OnceLock<Mutex<TaskRegistry>> = OnceLock::new();

/// The process-wide registry, created empty on first use.
pub fn global() -> &'static Mutex<TaskRegistry> {
    GLOBAL_REGISTRY.get_or_init(|| Mutex::new(TaskRegistry::new()))
}

/// Lock the process-wide registry, recovering it if a previous holder panicked.
pub fn lock_global() -> MutexGuard<'static, TaskRegistry> {
    global().lock().unwrap_or_else(PoisonError::into_inner)
}
