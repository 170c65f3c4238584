// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Argument passing between a task's caller and its block kernels.
//!
//! * [`ArgHandle`] - type-tagged shared reference to one caller-owned value
//! * [`ArgList`] - ordered handles, the template copied into each block
//! * [`BlockArgs`] - one block's handles plus its scheduling metadata
//! * [`SharedBuffer`] - output storage that blocks write through disjoint leases
//! * [`critical_section`] - the single process-wide reduction lock

mod block;
mod handle;
mod shared;

pub use block::{critical_section, BlockArgs, DelayUnit, ExecutionMode};
pub use handle::{ArgHandle, ArgList};
pub use shared::{BufferLease, SharedBuffer};
