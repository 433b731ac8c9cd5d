// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use clap::ValueEnum;
use field_atomics::{Ordering, RetryPolicy, ScalarKind};
use serde::Serialize;

use crate::HarnessError;

/// How the worker threads share cells.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Contention {
    /// Every thread updates the same cell.
    High,
    /// Every thread updates a cell of its own.
    Low,
}

/// Which execution path of the dispatcher to measure.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathSelection {
    Fast,
    Cas,
    Both,
}

/// A single execution path.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchPath {
    /// `modify` with a hardware operator.
    Fast,
    /// `modify_cas`, forcing the compare-and-swap loop.
    Cas,
}

impl PathSelection {
    pub fn paths(self) -> &'static [DispatchPath] {
        match self {
            PathSelection::Fast => &[DispatchPath::Fast],
            PathSelection::Cas => &[DispatchPath::Cas],
            PathSelection::Both => &[DispatchPath::Fast, DispatchPath::Cas],
        }
    }
}

pub struct HarnessConfig {
    /// Number of worker threads. Default `4`.
    pub threads: usize,
    /// Number of `add` operations per thread and trial. Default `250_000`.
    pub ops_per_thread: u64,
    /// Operand of every `add`. Default `1`.
    pub operand: i128,
    /// Starting value of every cell. Default `0`.
    pub initial: i128,
    /// Default [`Contention::High`].
    pub contention: Contention,
    /// Default [`PathSelection::Both`].
    pub paths: PathSelection,
    /// Default [`Ordering::AcqRel`].
    pub ordering: Ordering,
    /// Number of repetitions per path. Default `10`.
    pub trials: u32,
    /// Scalar type of the cells. Default [`ScalarKind::I64`].
    pub width: ScalarKind,
    /// Retry policy of the compare-and-swap path. Default unbounded.
    pub retry: RetryPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            ops_per_thread: 250_000,
            operand: 1,
            initial: 0,
            contention: Contention::High,
            paths: PathSelection::Both,
            ordering: Ordering::AcqRel,
            trials: 10,
            width: ScalarKind::I64,
            retry: RetryPolicy::UNBOUNDED,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.threads == 0 {
            return Err(HarnessError::InvalidConfig("at least one thread is required"));
        }
        if self.trials == 0 {
            return Err(HarnessError::InvalidConfig("at least one trial is required"));
        }
        if self.total_ops().is_none() {
            return Err(HarnessError::InvalidConfig(
                "operations per trial do not fit in 64 bits",
            ));
        }
        Ok(())
    }

    /// Operations issued per trial across all threads, if that count fits.
    pub fn total_ops(&self) -> Option<u64> {
        u64::try_from(self.threads)
            .ok()?
            .checked_mul(self.ops_per_thread)
    }
}
