// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod kernel;

pub use kernel::{kernel_address, BlockKernel, KernelFn, KernelResult};
