// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for argument slot access and shared buffer leasing.

use thiserror::Error;

use crate::partition::Bounds;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("argument index {index} out of range for {count} arguments")]
    IndexOutOfRange { index: usize, count: usize },

    /// The slot exists but was never given a handle.
    #[error("argument slot {index} is empty")]
    EmptySlot { index: usize },

    #[error("argument type mismatch at index {index}: expected {expected}, found {actual}")]
    TypeMismatch {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("lease of {requested:?} overlaps live lease {held:?}")]
    LeaseConflict { requested: Bounds, held: Bounds },

    #[error("lease of {requested:?} exceeds buffer length {len}")]
    LeaseOutOfRange { requested: Bounds, len: usize },
}
