// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Utilities for the fieldbench program.
//!
//! > [!IMPORTANT]
//! > This library is currently mainly aimed at internal use and might not
//! > adhere to semver versioning.

mod affine;
mod config;
mod error;
mod harness;
mod report;
mod theme;
mod timing;

pub use affine::affine_sequence;
pub use config::{Contention, DispatchPath, HarnessConfig, PathSelection};
pub use error::HarnessError;
pub use harness::{expected_value, install_stop_handler, run_harness};
pub use report::{CellCheck, HarnessReport, PathReport, StatsReport, TrialReport};
pub use theme::{BenchTheme, Palette};
pub use timing::TimingSummary;
