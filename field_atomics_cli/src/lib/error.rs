// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use field_atomics::{AtomicError, ScalarKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("{value} does not fit in {width}")]
    OutOfRange { value: i128, width: ScalarKind },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Atomic(#[from] AtomicError),
    #[error("failed to install interrupt handler: {0}")]
    Interrupt(#[from] ctrlc::Error),
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
