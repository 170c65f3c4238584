// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::args::BlockArgs;

/// Result a kernel reports for one block.
pub type KernelResult = anyhow::Result<()>;

/// Plain function kernel. Registering one of these also records its address, so the
/// task can later be found by the function itself.
pub type KernelFn = fn(&BlockArgs) -> KernelResult;

/// Work run once per block, on that block's own thread.
///
/// A kernel should confine its writes to `args.bounds()`; the engine does not stop a
/// kernel from touching shared data outside its range.
pub trait BlockKernel: Send + Sync {
    fn run(&self, args: &BlockArgs) -> KernelResult;
}

impl<F> BlockKernel for F
where
    F: Fn(&BlockArgs) -> KernelResult + Send + Sync,
{
    fn run(&self, args: &BlockArgs) -> KernelResult {
        self(args)
    }
}

/// Identity of a function kernel, used for lookup by function.
///
/// This is the function's address, which Rust does not guarantee to be unique or
/// stable. The optimizer may merge two functions with identical bodies into one
/// address, and one function may get different addresses in different codegen units.
/// Prefer lookup by name or [`TaskId`](crate::registry::TaskId) when that matters.
pub fn kernel_address(kernel: KernelFn) -> usize {
    kernel as usize
}
