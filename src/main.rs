// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Serialize;

use parblock::args::{ArgList, BlockArgs, SharedBuffer};
use parblock::config::{load_config, EngineConfig, RuntimeBuilder};
use parblock::engine::BlockExecutor;
use parblock::registry::{TaskId, TaskRegistry};
use parblock::traits::{KernelFn, KernelResult};

const WORK_SIZE: usize = 4_000_000;
const ALPHA: f64 = 2.5;
/// Relative tolerance for reductions whose summation order differs from the sequential one
const TOLERANCE: f64 = 1e-9;

/// One kernel run against its sequential reference.
#[derive(Serialize)]
struct KernelReport {
    kernel: &'static str,
    blocks: usize,
    parallel: Duration,
    sequential: Duration,
    matches: bool,
}

fn sum(args: &BlockArgs) -> KernelResult {
    let x = args.get::<Vec<f64>>(0)?;
    let total = args.get::<SharedBuffer<f64>>(1)?;
    let partial: f64 = x[args.bounds().range()].iter().sum();

    let _guard = args.critical_section();
    let mut cell = total.lease_all()?;
    cell[0] += partial;
    Ok(())
}

fn dot(args: &BlockArgs) -> KernelResult {
    let x = args.get::<Vec<f64>>(0)?;
    let y = args.get::<Vec<f64>>(1)?;
    let total = args.get::<SharedBuffer<f64>>(2)?;
    let range = args.bounds().range();
    let partial: f64 = x[range.clone()].iter().zip(&y[range]).map(|(a, b)| a * b).sum();

    let _guard = args.critical_section();
    let mut cell = total.lease_all()?;
    cell[0] += partial;
    Ok(())
}

fn scale(args: &BlockArgs) -> KernelResult {
    let x = args.get::<Vec<f64>>(0)?;
    let alpha = *args.get::<f64>(1)?;
    let out = args.get::<SharedBuffer<f64>>(2)?;

    let bounds = args.bounds();
    let mut out = out.lease(bounds)?;
    for (dst, src) in out.iter_mut().zip(&x[bounds.range()]) {
        *dst = alpha * src;
    }
    Ok(())
}

fn axpy(args: &BlockArgs) -> KernelResult {
    let x = args.get::<Vec<f64>>(0)?;
    let y = args.get::<Vec<f64>>(1)?;
    let alpha = *args.get::<f64>(2)?;
    let out = args.get::<SharedBuffer<f64>>(3)?;

    let bounds = args.bounds();
    let mut out = out.lease(bounds)?;
    for ((dst, a), b) in out.iter_mut().zip(&x[bounds.range()]).zip(&y[bounds.range()]) {
        *dst = alpha * a + b;
    }
    Ok(())
}

/// Writes `[min, max]` of the block's slice into the two cells of argument 1.
fn min_max(args: &BlockArgs) -> KernelResult {
    let x = args.get::<Vec<f64>>(0)?;
    let extremes = args.get::<SharedBuffer<f64>>(1)?;
    let slice = &x[args.bounds().range()];
    if slice.is_empty() {
        return Ok(());
    }
    let (low, high) = slice
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));

    let _guard = args.critical_section();
    let mut cells = extremes.lease_all()?;
    cells[0] = cells[0].min(low);
    cells[1] = cells[1].max(high);
    Ok(())
}

fn close(parallel: f64, sequential: f64) -> bool {
    (parallel - sequential).abs() <= TOLERANCE * sequential.abs().max(1.0)
}

fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = f();
    (value, start.elapsed())
}

struct Demo {
    registry: TaskRegistry,
    executor: BlockExecutor,
    x: Arc<Vec<f64>>,
    y: Arc<Vec<f64>>,
}

impl Demo {
    fn register(&mut self, name: &str, kernel: KernelFn, args: ArgList) -> anyhow::Result<TaskId> {
        let blocks = self.registry.block_limit();
        self.registry
            .register_fn_regular(blocks, WORK_SIZE, Some(name), kernel, args)
            .with_context(|| format!("registering {}", name))
    }

    fn run(&self, id: TaskId) -> anyhow::Result<(usize, Duration)> {
        let report = self.executor.execute(&self.registry, id)?.into_result()?;
        Ok((report.outcomes.len(), report.elapsed))
    }

    fn reduction(
        &mut self,
        name: &'static str,
        kernel: KernelFn,
        args: ArgList,
        total: &SharedBuffer<f64>,
        reference: impl FnOnce() -> f64,
    ) -> anyhow::Result<KernelReport> {
        let id = self.register(name, kernel, args)?;
        let (blocks, parallel) = self.run(id)?;
        let (expected, sequential) = timed(reference);
        let actual = total.to_vec()?[0];
        self.registry.unregister_task(id)?;

        Ok(KernelReport {
            kernel: name,
            blocks,
            parallel,
            sequential,
            matches: close(actual, expected),
        })
    }

    fn elementwise(
        &mut self,
        name: &'static str,
        kernel: KernelFn,
        args: ArgList,
        out: &SharedBuffer<f64>,
        reference: impl FnOnce() -> Vec<f64>,
    ) -> anyhow::Result<KernelReport> {
        let id = self.register(name, kernel, args)?;
        let (blocks, parallel) = self.run(id)?;
        let (expected, sequential) = timed(reference);
        let actual = out.to_vec()?;
        self.registry.unregister_task(id)?;

        Ok(KernelReport {
            kernel: name,
            blocks,
            parallel,
            sequential,
            matches: actual == expected,
        })
    }

    fn run_all(&mut self) -> anyhow::Result<Vec<KernelReport>> {
        let (x, y) = (Arc::clone(&self.x), Arc::clone(&self.y));
        let mut reports = Vec::new();

        let total = Arc::new(SharedBuffer::filled(1, 0.0_f64));
        reports.push(self.reduction(
            "sum",
            sum,
            ArgList::new().with_shared(Arc::clone(&x)).with_shared(Arc::clone(&total)),
            &total,
            || x.iter().sum(),
        )?);

        let total = Arc::new(SharedBuffer::filled(1, 0.0_f64));
        reports.push(self.reduction(
            "dot",
            dot,
            ArgList::new()
                .with_shared(Arc::clone(&x))
                .with_shared(Arc::clone(&y))
                .with_shared(Arc::clone(&total)),
            &total,
            || x.iter().zip(y.iter()).map(|(a, b)| a * b).sum(),
        )?);

        let out = Arc::new(SharedBuffer::filled(WORK_SIZE, 0.0_f64));
        reports.push(self.elementwise(
            "scale",
            scale,
            ArgList::new()
                .with_shared(Arc::clone(&x))
                .with(ALPHA)
                .with_shared(Arc::clone(&out)),
            &out,
            || x.iter().map(|v| ALPHA * v).collect(),
        )?);

        let out = Arc::new(SharedBuffer::filled(WORK_SIZE, 0.0_f64));
        reports.push(self.elementwise(
            "axpy",
            axpy,
            ArgList::new()
                .with_shared(Arc::clone(&x))
                .with_shared(Arc::clone(&y))
                .with(ALPHA)
                .with_shared(Arc::clone(&out)),
            &out,
            || x.iter().zip(y.iter()).map(|(a, b)| ALPHA * a + b).collect(),
        )?);

        let extremes = Arc::new(SharedBuffer::new(vec![f64::INFINITY, f64::NEG_INFINITY]));
        reports.push(self.elementwise(
            "min_max",
            min_max,
            ArgList::new().with_shared(Arc::clone(&x)).with_shared(Arc::clone(&extremes)),
            &extremes,
            || {
                let low = x.iter().copied().fold(f64::INFINITY, f64::min);
                let high = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                vec![low, high]
            },
        )?);

        Ok(reports)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match env::args().nth(1) {
        Some(path) => load_config(&path).with_context(|| format!("loading config {}", path))?,
        None => EngineConfig::default(),
    };
    let (registry, executor) = RuntimeBuilder::from_config(&config);

    tracing::info!(
        block_limit = registry.block_limit(),
        work_size = WORK_SIZE,
        "Running demo kernels"
    );

    let x: Vec<f64> = (0..WORK_SIZE).map(|i| (i % 1_000) as f64 * 1e-3).collect();
    let y: Vec<f64> = x.iter().map(|v| 1.0 - v).collect();
    let mut demo = Demo {
        registry,
        executor,
        x: Arc::new(x),
        y: Arc::new(y),
    };

    let reports = demo.run_all()?;
    for report in &reports {
        println!(
            "{:<8} {:>3} blocks  parallel {:>10.3?}  sequential {:>10.3?}  {}",
            report.kernel,
            report.blocks,
            report.parallel,
            report.sequential,
            if report.matches { "ok" } else { "MISMATCH" }
        );
    }
    println!("{}", serde_json::to_string_pretty(&reports)?);

    if reports.iter().any(|report| !report.matches) {
        anyhow::bail!("parallel results differ from the sequential reference");
    }
    Ok(())
}
