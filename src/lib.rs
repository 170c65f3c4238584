// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod args;          // per-block argument containers
pub mod config;        // engine config + runtime builder
pub mod engine;        // fork-join block executor
pub mod errors;        // error handling
pub mod observability;
pub mod partition;     // bounds and regular partitioning
pub mod registry;      // task table
pub mod traits;        // kernel abstraction
