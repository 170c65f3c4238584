// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::Path;

use crate::config::{load_config, EngineConfig};
use crate::engine::BlockExecutor;
use crate::errors::ConfigError;
use crate::registry::TaskRegistry;

/// Runtime builder: a registry and an executor that agree on one configuration.
///
/// # Examples
///
/// ```
/// use parblock::config::{EngineConfig, RuntimeBuilder};
///
/// let config = EngineConfig {
///     max_blocks: Some(2),
///     thread_name_prefix: "demo".to_string(),
///     ..EngineConfig::default()
/// };
///
/// let (registry, executor) = RuntimeBuilder::from_config(&config);
///
/// assert!(registry.block_limit() <= 2);
/// assert_eq!(executor.thread_name_prefix(), "demo");
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build an empty registry and an executor from `cfg`.
    ///
    /// The registry takes the block ceiling and per-block defaults; the executor takes
    /// the thread naming and stack size.
    pub fn from_config(cfg: &EngineConfig) -> (TaskRegistry, BlockExecutor) {
        (TaskRegistry::with_config(cfg), BlockExecutor::from_config(cfg))
    }

    /// Load a config file and build from it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<(TaskRegistry, BlockExecutor), ConfigError> {
        let cfg = load_config(path)?;
        Ok(Self::from_config(&cfg))
    }
}
