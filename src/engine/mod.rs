// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod executor;
pub mod report;

pub use executor::{join_all, BlockExecutor};
pub use report::{BlockOutcome, ExecutionReport};
