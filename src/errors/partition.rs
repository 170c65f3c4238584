// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while turning a work size into block bounds.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    /// The clamped block count is zero, so no block could ever run.
    #[error("invalid block size: requested {requested} blocks with a ceiling of {limit}")]
    InvalidBlockSize { requested: usize, limit: usize },

    /// A caller-supplied shape has a block outside `[0, work_size]` or with `first > last`.
    #[error("invalid shape: block {block} has bounds [{first}, {last}) for work size {work_size}")]
    InvalidShape {
        block: usize,
        first: usize,
        last: usize,
        work_size: usize,
    },
}
