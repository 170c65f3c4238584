// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Delay every new block starts with (unit chosen by the kernel when it paces itself)
pub const DEFAULT_DELAY: u64 = 1;
/// Prefix of block thread names: `{prefix}-{task}-{block}`
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "parblock";
/// Smallest stack size accepted for block threads (16 KiB)
pub const MIN_STACK_SIZE: usize = 16 * 1024;
