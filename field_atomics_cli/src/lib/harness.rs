// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The contention harness.
//!
//! Every trial starts the cells from the configured initial value, lets each
//! worker thread apply `add(operand)` to its cell a fixed number of times,
//! and then checks each cell against the value implied by the number of
//! updates that actually completed on it. Any difference is a lost update.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering as StdOrdering},
    },
    time::Instant,
};

use field_atomics::{
    AtomicError, AtomicField, DispatchStats, Dispatcher, FieldScalar, Ordering, RmwOp,
    RmwOrdering, ScalarKind, ScalarValue,
};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::{
    CellCheck, Contention, DispatchPath, HarnessConfig, HarnessError, HarnessReport, PathReport,
    StatsReport, TrialReport, timing::TimingSummary,
};

/// Workers look at the stop flag once per this many operations.
const STOP_CHECK_INTERVAL: u64 = 1024;

/// Returns a stop flag that is raised on Ctrl-C. Only one handler can be
/// installed per process.
pub fn install_stop_handler() -> Result<Arc<AtomicBool>, HarnessError> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        warn!("interrupt received, finishing current trial");
        flag.store(true, StdOrdering::Relaxed);
    })?;
    Ok(stop)
}

/// Runs every configured path and trial. Stops early, with a partial but
/// still verified report, once `stop` is set.
pub fn run_harness(config: &HarnessConfig, stop: &AtomicBool) -> Result<HarnessReport, HarnessError> {
    config.validate()?;
    RmwOrdering::try_from(config.ordering)?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(|index| format!("fieldbench-{index}"))
        .build()?;

    info!(
        threads = config.threads,
        ops = config.ops_per_thread,
        width = %config.width,
        ordering = %config.ordering,
        "starting harness"
    );
    let mut report = HarnessReport::new(config);
    for &path in config.paths.paths() {
        let runner = PathRunner {
            config,
            pool: &pool,
            path,
            stop,
        };
        let (path_report, interrupted) = match config.width {
            ScalarKind::I32 => runner.run::<i32>()?,
            ScalarKind::I64 => runner.run::<i64>()?,
            ScalarKind::U32 => runner.run::<u32>()?,
            ScalarKind::U64 => runner.run::<u64>()?,
        };
        report.paths.push(path_report);
        if interrupted {
            warn!("interrupted, skipping remaining trials");
            report.interrupted = true;
            break;
        }
    }
    Ok(report)
}

/// The value of a `width` cell that started at `initial` after `count`
/// wrapping additions of `operand`.
pub fn expected_value(width: ScalarKind, initial: i128, count: u64, operand: i128) -> i128 {
    let modulus = 1u128 << (width.size() * 8);
    let raw = (initial as u128).wrapping_add(u128::from(count).wrapping_mul(operand as u128))
        & (modulus - 1);
    if width.is_signed() && raw >= modulus / 2 {
        raw as i128 - modulus as i128
    } else {
        raw as i128
    }
}

fn typed<T: FieldScalar>(value: i128) -> Result<T, HarnessError> {
    ScalarValue::from_i128(T::KIND, value)
        .and_then(T::from_value)
        .ok_or(HarnessError::OutOfRange {
            value,
            width: T::KIND,
        })
}

#[derive(Copy, Clone, Default)]
struct WorkerTally {
    completed: u64,
    abandoned: u64,
}

struct PathRunner<'a> {
    config: &'a HarnessConfig,
    pool: &'a ThreadPool,
    path: DispatchPath,
    stop: &'a AtomicBool,
}

impl PathRunner<'_> {
    fn run<T: FieldScalar>(&self) -> Result<(PathReport, bool), HarnessError> {
        let config = self.config;
        let initial = typed::<T>(config.initial)?;
        let operand = typed::<T>(config.operand)?;
        let stats = DispatchStats::new();
        let dispatcher = Dispatcher::new()
            .with_policy(config.retry)
            .with_stats(&stats);
        let total_ops = config
            .total_ops()
            .ok_or(HarnessError::InvalidConfig("operations per trial do not fit in 64 bits"))?;

        let mut trials = Vec::new();
        let mut samples = Vec::new();
        let mut interrupted = false;
        for trial in 0..config.trials {
            if self.stop.load(StdOrdering::Relaxed) {
                interrupted = true;
                break;
            }
            let cell_count = match config.contention {
                Contention::High => 1,
                Contention::Low => config.threads,
            };
            let cells: Vec<AtomicField<T>> =
                (0..cell_count).map(|_| AtomicField::new(initial)).collect();

            let start = Instant::now();
            let tallies = self.pool.broadcast(|ctx| {
                let cell = &cells[ctx.index() % cell_count];
                self.worker(&dispatcher, cell, operand)
            });
            let elapsed = start.elapsed();

            let mut per_cell = vec![WorkerTally::default(); cell_count];
            for (index, tally) in tallies.into_iter().enumerate() {
                let tally = tally?;
                let cell = &mut per_cell[index % cell_count];
                cell.completed += tally.completed;
                cell.abandoned += tally.abandoned;
            }
            let checks: Vec<CellCheck> = cells
                .into_iter()
                .zip(&per_cell)
                .map(|(cell, tally)| CellCheck {
                    expected: expected_value(
                        T::KIND,
                        config.initial,
                        tally.completed,
                        config.operand,
                    ),
                    actual: cell.into_inner().into_value().as_i128(),
                })
                .collect();
            let trial = TrialReport {
                trial,
                elapsed_ns: elapsed.as_nanos(),
                completed_ops: per_cell.iter().map(|tally| tally.completed).sum(),
                abandoned_ops: per_cell.iter().map(|tally| tally.abandoned).sum(),
                cells: checks,
            };
            debug!(
                trial = trial.trial,
                path = ?self.path,
                elapsed_us = elapsed.as_micros() as u64,
                completed = trial.completed_ops,
                abandoned = trial.abandoned_ops,
                "trial finished"
            );
            if trial.lost_updates() > 0 {
                warn!(trial = trial.trial, path = ?self.path, "lost updates detected");
            }
            if trial.completed_ops + trial.abandoned_ops == total_ops {
                samples.push(elapsed);
            } else {
                interrupted = true;
            }
            trials.push(trial);
            if interrupted {
                break;
            }
        }

        Ok((
            PathReport {
                path: self.path,
                trials,
                timing: TimingSummary::from_samples(&samples, total_ops),
                stats: StatsReport::from(stats.snapshot()),
            },
            interrupted,
        ))
    }

    fn worker<T: FieldScalar>(
        &self,
        dispatcher: &Dispatcher<'_>,
        cell: &AtomicField<T>,
        operand: T,
    ) -> Result<WorkerTally, AtomicError> {
        let order: Ordering = self.config.ordering;
        let mut tally = WorkerTally::default();
        for done in 0..self.config.ops_per_thread {
            if done % STOP_CHECK_INTERVAL == 0 && self.stop.load(StdOrdering::Relaxed) {
                break;
            }
            let result = match self.path {
                DispatchPath::Fast => dispatcher.modify(cell, RmwOp::Add, operand, order),
                DispatchPath::Cas => dispatcher.modify_cas(cell, RmwOp::Add, operand, order),
            };
            match result {
                Ok(_) => tally.completed += 1,
                Err(AtomicError::RetryBudgetExhausted { .. }) => tally.abandoned += 1,
                Err(err) => return Err(err),
            }
        }
        Ok(tally)
    }
}
