// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::{
    ordering::{AccessKind, Ordering},
    scalar::ScalarKind,
};

/// Errors reported by field operations.
///
/// Every error is raised before the field is written, so a failed call
/// never leaves a partial update behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtomicError {
    #[error("operand of type {found} does not match field of type {expected}")]
    TypeMismatch {
        expected: ScalarKind,
        found: ScalarKind,
    },
    #[error("{requested} ordering is too weak for an atomic {access}")]
    UnsupportedOrdering {
        requested: Ordering,
        access: AccessKind,
    },
    #[error("compare-and-swap gave up after {attempts} failed attempts")]
    RetryBudgetExhausted { attempts: u32 },
    #[error("shape has no field named `{0}`")]
    UnknownField(String),
    #[error("field handle belongs to a different shape")]
    ForeignHandle,
}

pub type AtomicResult<T> = Result<T, AtomicError>;
