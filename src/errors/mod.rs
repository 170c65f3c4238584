// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod args;
mod config;
mod execution;
mod partition;
mod registry;

pub use args::ArgumentError;
pub use config::ConfigError;
pub use execution::ExecutionError;
pub use partition::PartitionError;
pub use registry::RegistryError;
