//! Bounded-concurrency scheduling of unit analyses.
//!
//! The scheduler is generic over the per-unit work function so its ordering
//! and failure-isolation guarantees are testable without spawning any
//! processes. Results are collected by discovery index and re-sorted, so
//! the final order is always discovery order no matter which unit finishes
//! first. One unit's panic never aborts the run; the unit is recorded with
//! zero diagnostics and a warning instead.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use diag_sweep_core::{AnalysisResult, Unit};
use tracing::{debug, warn};

/// Hard cap on worker threads regardless of core count.
const MAX_PARALLEL_JOBS: usize = 12;

/// Cooperative cancellation flag shared between the run owner and the
/// scheduler. Cancelling stops new units from starting; in-flight units
/// complete or hit their own timeouts, and partial results stay reportable.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scheduling configuration.
#[derive(Debug, Clone, Default)]
pub struct ScheduleConfig {
    /// Run units one after another on the calling thread.
    pub sequential: bool,
    /// Worker count override (`None` = adaptive default).
    pub jobs: Option<usize>,
}

/// Adaptive worker count: a small multiple of available parallelism,
/// bounded above and never exceeding the workload.
pub fn default_parallel_jobs(unit_count: usize) -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    (cpu_count * 2).min(MAX_PARALLEL_JOBS).max(1).min(unit_count.max(1))
}

/// Runs the work function over every unit and returns results in
/// discovery order.
pub fn run_units<F>(
    units: &[Unit],
    config: &ScheduleConfig,
    cancel: &CancelFlag,
    analyze: F,
) -> Vec<AnalysisResult>
where
    F: Fn(&Unit) -> AnalysisResult + Sync,
{
    if config.sequential || units.len() <= 1 {
        return units
            .iter()
            .map(|unit| run_one(unit, cancel, &analyze))
            .collect();
    }

    let jobs = config
        .jobs
        .filter(|jobs| *jobs > 0)
        .unwrap_or_else(|| default_parallel_jobs(units.len()));
    debug!(units = units.len(), jobs, "running bounded worker pool");

    let pool = match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
        Ok(pool) => pool,
        Err(err) => {
            warn!(error = %err, "thread pool construction failed, running sequentially");
            return units
                .iter()
                .map(|unit| run_one(unit, cancel, &analyze))
                .collect();
        }
    };

    let mut indexed: Vec<(usize, AnalysisResult)> = pool.install(|| {
        use rayon::prelude::*;
        units
            .par_iter()
            .enumerate()
            .map(|(index, unit)| (index, run_one(unit, cancel, &analyze)))
            .collect()
    });

    // Completion order is arbitrary under the pool; discovery order is the
    // contract.
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, result)| result).collect()
}

fn run_one<F>(unit: &Unit, cancel: &CancelFlag, analyze: &F) -> AnalysisResult
where
    F: Fn(&Unit) -> AnalysisResult + Sync,
{
    if cancel.is_cancelled() {
        let mut result = AnalysisResult::empty(&unit.name);
        result.warnings.push("skipped: run was cancelled".to_string());
        return result;
    }

    match catch_unwind(AssertUnwindSafe(|| analyze(unit))) {
        Ok(result) => result,
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            warn!(unit = %unit.name, detail, "unit analysis panicked");
            let mut result = AnalysisResult::empty(&unit.name);
            result
                .warnings
                .push(format!("analysis failed unexpectedly: {detail}"));
            result
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
