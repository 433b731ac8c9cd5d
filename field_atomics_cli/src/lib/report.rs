// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Harness results and their console and JSON renderings.

use cliclack::{intro, log, outro, outro_cancel};
use field_atomics::StatsSnapshot;
use serde::Serialize;

use crate::{
    Contention, DispatchPath, HarnessConfig, HarnessError, theme::Palette, timing::TimingSummary,
};

#[derive(Debug, Serialize)]
pub struct HarnessReport {
    pub width: &'static str,
    pub ordering: &'static str,
    pub contention: Contention,
    pub threads: usize,
    pub ops_per_thread: u64,
    pub operand: i128,
    pub initial: i128,
    /// Set when the run was stopped before every trial finished.
    pub interrupted: bool,
    pub paths: Vec<PathReport>,
}

#[derive(Debug, Serialize)]
pub struct PathReport {
    pub path: DispatchPath,
    pub trials: Vec<TrialReport>,
    /// Timing of the trials that ran to completion.
    pub timing: Option<TimingSummary>,
    pub stats: StatsReport,
}

#[derive(Debug, Serialize)]
pub struct TrialReport {
    pub trial: u32,
    pub elapsed_ns: u128,
    /// Updates that landed.
    pub completed_ops: u64,
    /// Updates abandoned after exhausting the retry budget.
    pub abandoned_ops: u64,
    pub cells: Vec<CellCheck>,
}

/// Final value of one cell against the value implied by the updates that
/// completed on it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CellCheck {
    pub expected: i128,
    pub actual: i128,
}

impl CellCheck {
    pub fn holds(&self) -> bool {
        self.expected == self.actual
    }
}

#[derive(Copy, Clone, Debug, Default, Serialize)]
pub struct StatsReport {
    pub fast_path_ops: u64,
    pub slow_path_ops: u64,
    pub cas_attempts: u64,
    pub cas_failures: u64,
    pub rejected: u64,
    pub retries_per_slow_op: f64,
}

impl From<StatsSnapshot> for StatsReport {
    fn from(snapshot: StatsSnapshot) -> Self {
        Self {
            fast_path_ops: snapshot.fast_path_ops,
            slow_path_ops: snapshot.slow_path_ops,
            cas_attempts: snapshot.cas_attempts,
            cas_failures: snapshot.cas_failures,
            rejected: snapshot.rejected,
            retries_per_slow_op: snapshot.retries_per_slow_op(),
        }
    }
}

impl TrialReport {
    pub fn lost_updates(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.holds()).count()
    }
}

impl HarnessReport {
    pub(crate) fn new(config: &HarnessConfig) -> Self {
        Self {
            width: config.width.as_str(),
            ordering: config.ordering.as_str(),
            contention: config.contention,
            threads: config.threads,
            ops_per_thread: config.ops_per_thread,
            operand: config.operand,
            initial: config.initial,
            interrupted: false,
            paths: Vec::new(),
        }
    }

    /// Number of cells, over all paths and trials, whose final value
    /// disagrees with the updates that completed on them.
    pub fn lost_updates(&self) -> usize {
        self.paths
            .iter()
            .flat_map(|path| &path.trials)
            .map(TrialReport::lost_updates)
            .sum()
    }

    pub fn is_verified(&self) -> bool {
        self.lost_updates() == 0
    }

    pub fn to_json(&self) -> Result<String, HarnessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn print(&self, palette: &Palette) -> Result<(), HarnessError> {
        intro(format!(
            "fieldbench: {} threads x {} ops, {} {}, {} contention",
            self.threads,
            self.ops_per_thread,
            self.width,
            self.ordering,
            match self.contention {
                Contention::High => "high",
                Contention::Low => "low",
            },
        ))?;
        for path in &self.paths {
            let name = match path.path {
                DispatchPath::Fast => "fast path",
                DispatchPath::Cas => "cas path",
            };
            let verified = path.trials.iter().all(|trial| trial.lost_updates() == 0);
            let timing = match path.timing {
                Some(timing) => format!(
                    "min {} / median {} / mean {} ({:.2} ns/op)",
                    format_nanos(timing.min_ns),
                    format_nanos(timing.median_ns),
                    format_nanos(timing.mean_ns),
                    timing.mean_ns_per_op,
                ),
                None => "no complete trials".to_owned(),
            };
            let summary = format!(
                "{} {} trials, {}\n{}",
                palette.heading.apply_to(name),
                path.trials.len(),
                timing,
                palette.dim.apply_to(format!(
                    "cas attempts {}, cas failures {}, retries per slow op {:.3}",
                    path.stats.cas_attempts,
                    path.stats.cas_failures,
                    path.stats.retries_per_slow_op,
                )),
            );
            if verified {
                log::success(summary)?;
            } else {
                log::error(summary)?;
                for trial in &path.trials {
                    for cell in trial.cells.iter().filter(|cell| !cell.holds()) {
                        log::remark(format!(
                            "trial {}: expected {}, found {}",
                            trial.trial,
                            palette.pass.apply_to(cell.expected),
                            palette.fail.apply_to(cell.actual),
                        ))?;
                    }
                }
            }
        }
        if self.interrupted {
            outro_cancel("interrupted")?;
        } else if self.is_verified() {
            outro(palette.pass.apply_to("no lost updates"))?;
        } else {
            outro(palette.fail.apply_to(format!("{} lost updates", self.lost_updates())))?;
        }
        Ok(())
    }
}

fn format_nanos(nanos: u128) -> String {
    match nanos {
        0..1_000 => format!("{nanos}ns"),
        1_000..1_000_000 => format!("{:.1}us", nanos as f64 / 1e3),
        1_000_000..1_000_000_000 => format!("{:.1}ms", nanos as f64 / 1e6),
        _ => format!("{:.2}s", nanos as f64 / 1e9),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn report(cells: Vec<CellCheck>) -> HarnessReport {
        let mut report = HarnessReport::new(&HarnessConfig::default());
        report.paths.push(PathReport {
            path: DispatchPath::Fast,
            trials: vec![TrialReport {
                trial: 0,
                elapsed_ns: 1_500,
                completed_ops: 4,
                abandoned_ops: 0,
                cells,
            }],
            timing: None,
            stats: StatsReport::default(),
        });
        report
    }

    #[test]
    fn lost_updates_count_mismatched_cells() {
        let good = CellCheck {
            expected: 4,
            actual: 4,
        };
        let bad = CellCheck {
            expected: 4,
            actual: 3,
        };
        assert!(report(vec![good, good]).is_verified());
        assert_eq!(report(vec![good, bad, bad]).lost_updates(), 2);
    }

    #[test]
    fn json_names_paths_and_contention() {
        let json = report(vec![]).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["contention"], "high");
        assert_eq!(value["width"], "i64");
        assert_eq!(value["ordering"], "acq-rel");
        assert_eq!(value["paths"][0]["path"], "fast");
        assert_eq!(value["paths"][0]["trials"][0]["elapsed_ns"], 1_500);
    }

    #[test]
    fn nanos_are_humanised() {
        assert_eq!(format_nanos(999), "999ns");
        assert_eq!(format_nanos(1_500), "1.5us");
        assert_eq!(format_nanos(2_500_000), "2.5ms");
        assert_eq!(format_nanos(3_000_000_000), "3.00s");
    }
}
