// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fork-join execution of a registered task.
//!
//! Each `execute` call spawns one OS thread per block, hands every thread its own
//! copy of the block's [`BlockArgs`], then walks the blocks in index order: normal
//! blocks are joined, background blocks are detached. Nothing is kept between calls.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::args::{BlockArgs, ExecutionMode};
use crate::config::consts::DEFAULT_THREAD_NAME_PREFIX;
use crate::config::EngineConfig;
use crate::engine::{BlockOutcome, ExecutionReport};
use crate::errors::ExecutionError;
use crate::observability::messages::engine::{
    BlockDetached, BlockFailed, BlockSpawnFailed, ExecutionCompleted, ExecutionStarted,
};
use crate::observability::messages::StructuredLog;
use crate::registry::{TaskRegistry, TaskSelector};
use crate::traits::{BlockKernel, KernelFn, KernelResult};

/// Spawns and joins the block threads of a task.
#[derive(Debug, Clone)]
pub struct BlockExecutor {
    thread_name_prefix: String,
    stack_size: Option<usize>,
}

impl Default for BlockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

enum Spawned {
    Normal(JoinHandle<KernelResult>),
    Background,
}

impl BlockExecutor {
    pub fn new() -> Self {
        Self {
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }

    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            thread_name_prefix: cfg.thread_name_prefix.clone(),
            stack_size: cfg.stack_size,
        }
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn thread_name_prefix(&self) -> &str {
        &self.thread_name_prefix
    }

    pub fn stack_size(&self) -> Option<usize> {
        self.stack_size
    }

    /// Run every block of the selected task and wait for its normal blocks.
    ///
    /// Normal blocks are joined in block-index order, so a slow early block delays
    /// observing later ones but never their execution. Background blocks are detached
    /// and keep running; they hold their own argument handles, so the values they
    /// read stay alive until they finish.
    ///
    /// A kernel error or panic only marks its own block in the report. An
    /// unresolvable selector spawns nothing. If a thread cannot be spawned, the normal
    /// blocks already started are joined before the spawn error is returned.
    pub fn execute(
        &self,
        registry: &TaskRegistry,
        task: impl Into<TaskSelector>,
    ) -> Result<ExecutionReport, ExecutionError> {
        let id = registry.resolve(&task.into())?;
        let task = registry.task(id)?;
        let task_name = task.name().to_string();
        let kernel = Arc::clone(task.kernel());
        let blocks = task.blocks().to_vec();

        let started = ExecutionStarted {
            task_name: &task_name,
            task_id: id,
            blocks: blocks.len(),
            background_blocks: blocks
                .iter()
                .filter(|block| block.mode() == ExecutionMode::Background)
                .count(),
        };
        let span = started.span("execute");
        let _enter = span.enter();
        started.log();

        let start = Instant::now();
        let mut spawned = Vec::with_capacity(blocks.len());
        for block in blocks {
            let block_id = block.block_id();
            let mode = block.mode();
            match self.spawn_block(&task_name, Arc::clone(&kernel), block) {
                Ok(handle) => match mode {
                    ExecutionMode::Normal => spawned.push(Spawned::Normal(handle)),
                    ExecutionMode::Background => {
                        BlockDetached {
                            task_name: &task_name,
                            block: block_id,
                        }
                        .log();
                        spawned.push(Spawned::Background);
                    }
                },
                Err(source) => {
                    BlockSpawnFailed {
                        task_name: &task_name,
                        block: block_id,
                        error: &source,
                    }
                    .log();
                    for (block, pending) in spawned.into_iter().enumerate() {
                        if let Spawned::Normal(handle) = pending {
                            collect(&task_name, block, handle);
                        }
                    }
                    return Err(ExecutionError::Spawn {
                        task: id,
                        block: block_id,
                        source,
                    });
                }
            }
        }

        let outcomes: Vec<BlockOutcome> = spawned
            .into_iter()
            .enumerate()
            .map(|(block, pending)| match pending {
                Spawned::Normal(handle) => collect(&task_name, block, handle),
                Spawned::Background => BlockOutcome::Detached,
            })
            .collect();

        let report = ExecutionReport {
            task_id: id,
            task_name,
            outcomes,
            elapsed: start.elapsed(),
        };

        ExecutionCompleted {
            task_name: &report.task_name,
            joined: report.joined(),
            detached: report.detached(),
            failed: report.failures().count(),
            duration: report.elapsed,
        }
        .log();

        Ok(report)
    }

    /// [`BlockExecutor::execute`] for the task registered from the function `kernel`.
    pub fn execute_fn(&self, registry: &TaskRegistry, kernel: KernelFn) -> Result<ExecutionReport, ExecutionError> {
        self.execute(registry, kernel)
    }

    fn spawn_block(
        &self,
        task_name: &str,
        kernel: Arc<dyn BlockKernel>,
        block: BlockArgs,
    ) -> std::io::Result<JoinHandle<KernelResult>> {
        let mut builder = thread::Builder::new().name(self.thread_name(task_name, block.block_id()));
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let background = block.mode() == ExecutionMode::Background;
        let task_name = task_name.to_string();
        builder.spawn(move || {
            if background {
                // nobody joins a background block, so its failure is reported here
                run_detached(&task_name, kernel.as_ref(), &block);
                Ok(())
            } else {
                kernel.run(&block)
            }
        })
    }

    fn thread_name(&self, task_name: &str, block: usize) -> String {
        let task_name: String = task_name.chars().filter(|c| *c != '\0').collect();
        format!("{}-{}-{}", self.thread_name_prefix, task_name, block)
    }
}

fn collect(task_name: &str, block: usize, handle: JoinHandle<KernelResult>) -> BlockOutcome {
    let outcome = outcome_of(handle.join());
    log_failure(task_name, block, &outcome);
    outcome
}

/// Run a background block on the current thread, catching its panic so the failure
/// can still be logged.
fn run_detached(task_name: &str, kernel: &dyn BlockKernel, block: &BlockArgs) -> BlockOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| kernel.run(block)));
    let outcome = outcome_of(result);
    log_failure(task_name, block.block_id(), &outcome);
    outcome
}

fn outcome_of(result: thread::Result<KernelResult>) -> BlockOutcome {
    match result {
        Ok(Ok(())) => BlockOutcome::Joined,
        Ok(Err(error)) => BlockOutcome::Failed {
            reason: format!("{:#}", error),
        },
        Err(payload) => BlockOutcome::Panicked {
            reason: panic_message(payload.as_ref()),
        },
    }
}

fn log_failure(task_name: &str, block: usize, outcome: &BlockOutcome) {
    if let BlockOutcome::Failed { reason } | BlockOutcome::Panicked { reason } = outcome {
        BlockFailed {
            task_name,
            block,
            panicked: matches!(outcome, BlockOutcome::Panicked { .. }),
            reason,
        }
        .log();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Wait for every handle and return how many of them panicked.
///
/// For threads started outside the registry; handles are joined in order.
pub fn join_all(handles: Vec<JoinHandle<()>>) -> usize {
    handles
        .into_iter()
        .map(JoinHandle::join)
        .filter(Result::is_err)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgList;

    #[test]
    fn test_thread_names() {
        struct TestCase {
            name: &'static str,
            prefix: &'static str,
            task: &'static str,
            block: usize,
            expected: &'static str,
        }

        let cases = vec![
            TestCase { name: "default prefix", prefix: "parblock", task: "sum", block: 0, expected: "parblock-sum-0" },
            TestCase { name: "custom prefix", prefix: "k", task: "dot", block: 3, expected: "k-dot-3" },
            TestCase { name: "nul stripped", prefix: "p", task: "a\0b", block: 1, expected: "p-ab-1" },
        ];

        for case in cases {
            let executor = BlockExecutor::new().with_thread_name_prefix(case.prefix);
            assert_eq!(executor.thread_name(case.task, case.block), case.expected, "case '{}'", case.name);
        }
    }

    #[test]
    fn test_threads_carry_configured_name() {
        let mut registry = TaskRegistry::new();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry
            .register_task_regular(
                1,
                1,
                Some("named"),
                move |_: &BlockArgs| {
                    let name = thread::current().name().map(str::to_string);
                    sink.lock().unwrap().push(name);
                    Ok(())
                },
                ArgList::new(),
            )
            .unwrap();

        let executor = BlockExecutor::new().with_thread_name_prefix("worker");
        executor.execute(&registry, "named").unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Some("worker-named-0".to_string())]);
    }

    #[test]
    fn test_detached_block_failures_are_caught() {
        struct TestCase {
            name: &'static str,
            kernel: KernelFn,
            expected: BlockOutcome,
        }

        fn fine(_: &BlockArgs) -> KernelResult {
            Ok(())
        }
        fn refuses(_: &BlockArgs) -> KernelResult {
            anyhow::bail!("no input")
        }
        fn explodes(_: &BlockArgs) -> KernelResult {
            panic!("background exploded")
        }

        let cases = vec![
            TestCase { name: "ok", kernel: fine, expected: BlockOutcome::Joined },
            TestCase {
                name: "error",
                kernel: refuses,
                expected: BlockOutcome::Failed { reason: "no input".to_string() },
            },
            TestCase {
                name: "panic",
                kernel: explodes,
                expected: BlockOutcome::Panicked { reason: "background exploded".to_string() },
            },
        ];

        let block = BlockArgs::new(0);
        for case in cases {
            assert_eq!(run_detached("bg", &case.kernel, &block), case.expected, "case '{}'", case.name);
        }
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let mut registry = TaskRegistry::new();
        let id = registry
            .register_task_regular(1, 1, Some("huge"), |_: &BlockArgs| Ok(()), ArgList::new())
            .unwrap();

        // no platform can map a stack this large
        let executor = BlockExecutor::new().with_stack_size(usize::MAX / 4);
        match executor.execute(&registry, id) {
            Err(ExecutionError::Spawn { task, block, .. }) => {
                assert_eq!(task, id);
                assert_eq!(block, 0);
            }
            other => panic!("expected spawn failure, got {:?}", other),
        }
    }

    #[test]
    fn test_join_all_counts_panics() {
        let handles = vec![
            thread::spawn(|| ()),
            thread::spawn(|| panic!("boom")),
            thread::spawn(|| ()),
        ];
        assert_eq!(join_all(handles), 1);
        assert_eq!(join_all(Vec::new()), 0);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
