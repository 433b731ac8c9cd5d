// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Atomic read-modify-write on the scalar fields of managed heap objects.
//!
//! A field is an [`AtomicField<T>`] holding an `i32`, `i64`, `u32` or `u64`.
//! [`modify`] replaces the field's value `x` with `op(x, operand)` as one
//! indivisible step and returns `x`:
//!
//! ```
//! use field_atomics::{Ordering, RmwOp, modify, new_cell};
//!
//! let hits = new_cell(41u64);
//! assert_eq!(modify(&hits, RmwOp::Add, 1, Ordering::AcqRel), Ok(41));
//!
//! let affine = |x: u64, a: u64| x * a + 3;
//! assert_eq!(modify(&hits, RmwOp::Other(&affine), 2, Ordering::SeqCst), Ok(42));
//! assert_eq!(hits.into_inner(), 87);
//! ```
//!
//! Operators that the hardware can perform in a single instruction (add,
//! sub, and, or, xor) take that instruction. Everything else runs in a
//! compare-and-swap loop. Both paths observe the same memory ordering, which
//! must be at least acquire-release.
//!
//! Fields whose type is only known at run time are [`AnyField`]s, usually
//! reached through a [`HeapObject`] and its [`Shape`].

mod cell;
mod dispatch;
mod error;
mod op;
mod ordering;
mod retry;
mod scalar;
mod shape;
mod stats;
mod value;

pub use cell::{AtomicField, CasOutcome, new_cell};
pub use dispatch::{Dispatcher, modify};
pub use error::{AtomicError, AtomicResult};
pub use op::{HardwareOp, Lowering, RmwOp};
pub use ordering::{AccessKind, LoadOrdering, Ordering, RmwOrdering, StoreOrdering};
pub use retry::{Backoff, RetryPolicy};
pub use scalar::{FieldScalar, ScalarKind};
pub use shape::{FieldHandle, HeapObject, Shape};
pub use stats::{DispatchStats, StatsSnapshot};
pub use value::{AnyField, DynOp, ScalarValue};
