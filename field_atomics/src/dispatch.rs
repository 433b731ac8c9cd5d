// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The read-modify-write dispatcher.
//!
//! A `modify` call is classified once, by the tag of its [`RmwOp`]:
//!
//! ```text
//! Start -> Classified -> FastExecuted
//!                     -> Read -> Computed -> Swapped -> Done
//!                          ^                    |
//!                          +----- conflict -----+
//! ```
//!
//! The fast path is one hardware RMW instruction: it cannot be starved. The
//! slow path is a compare-and-swap loop, which is lock-free but not
//! wait-free: under contention a thread may lose any number of races before
//! its swap lands. Both paths return the value the field held immediately
//! before the update and use the same ordering, so a caller cannot tell them
//! apart other than by timing.

use tracing::trace;

use crate::{
    cell::AtomicField,
    error::{AtomicError, AtomicResult},
    op::{HardwareOp, RmwOp},
    ordering::{Ordering, RmwOrdering},
    retry::RetryPolicy,
    scalar::FieldScalar,
    stats::DispatchStats,
    value::{AnyField, DynOp, ScalarValue, for_any_field},
};

/// Executes read-modify-write operations on atomic fields.
///
/// A dispatcher is a small `Copy` value carrying the retry policy and,
/// optionally, a reference to the counters that should observe it. It holds
/// no state of its own and can be shared freely between threads.
#[derive(Copy, Clone, Debug, Default)]
pub struct Dispatcher<'s> {
    policy: RetryPolicy,
    stats: Option<&'s DispatchStats>,
}

impl<'s> Dispatcher<'s> {
    pub const fn new() -> Self {
        Self {
            policy: RetryPolicy::UNBOUNDED,
            stats: None,
        }
    }

    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn with_stats<'t>(self, stats: &'t DispatchStats) -> Dispatcher<'t> {
        Dispatcher {
            policy: self.policy,
            stats: Some(stats),
        }
    }

    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Atomically replaces the field's value `x` with `op(x, operand)` and
    /// returns `x`.
    ///
    /// `order` must be [`Ordering::AcqRel`] or [`Ordering::SeqCst`]; weaker
    /// orderings are rejected with [`AtomicError::UnsupportedOrdering`]
    /// before the field is touched.
    pub fn modify<T: FieldScalar>(
        &self,
        field: &AtomicField<T>,
        op: RmwOp<'_, T>,
        operand: T,
        order: Ordering,
    ) -> AtomicResult<T> {
        let order = self.validate(order)?;
        match op.split() {
            Ok(op) => Ok(self.modify_fast(field, op, operand, order)),
            Err(f) => self.cas_loop(field, order, |current| Ok(f(current, operand))),
        }
    }

    /// Like [`Dispatcher::modify`], but always takes the compare-and-swap
    /// path, even for operations that have a hardware form.
    pub fn modify_cas<T: FieldScalar>(
        &self,
        field: &AtomicField<T>,
        op: RmwOp<'_, T>,
        operand: T,
        order: Ordering,
    ) -> AtomicResult<T> {
        let order = self.validate(order)?;
        self.cas_loop(field, order, |current| Ok(op.apply(current, operand)))
    }

    /// [`Dispatcher::modify`] for a field whose type is only known at run
    /// time.
    ///
    /// Fails with [`AtomicError::TypeMismatch`] if `operand` is not of the
    /// field's type, or if an [`RmwOp::Other`] function produces a value of
    /// another type. The field is left untouched in both cases.
    pub fn modify_field(
        &self,
        field: &AnyField,
        op: DynOp<'_>,
        operand: ScalarValue,
        order: Ordering,
    ) -> AtomicResult<ScalarValue> {
        if operand.kind() != field.kind() {
            return Err(self.reject(AtomicError::TypeMismatch {
                expected: field.kind(),
                found: operand.kind(),
            }));
        }
        let order = self.validate(order)?;
        for_any_field!(field, field, T, {
            let operand = T::from_value(operand).ok_or(AtomicError::TypeMismatch {
                expected: T::KIND,
                found: operand.kind(),
            })?;
            let previous = match op.split() {
                Ok(op) => self.modify_fast(field, op, operand, order),
                Err(f) => self.cas_loop(field, order, |current: T| {
                    let next = f(current.into_value(), operand.into_value());
                    T::from_value(next).ok_or(AtomicError::TypeMismatch {
                        expected: T::KIND,
                        found: next.kind(),
                    })
                })?,
            };
            Ok(previous.into_value())
        })
    }

    #[inline]
    fn validate(&self, order: Ordering) -> AtomicResult<RmwOrdering> {
        RmwOrdering::try_from(order).map_err(|err| self.reject(err))
    }

    #[cold]
    fn reject(&self, err: AtomicError) -> AtomicError {
        if let Some(stats) = self.stats {
            stats.record_rejected();
        }
        trace!(%err, "rejected field update");
        err
    }

    #[inline(always)]
    fn modify_fast<T: FieldScalar>(
        &self,
        field: &AtomicField<T>,
        op: HardwareOp,
        operand: T,
        order: RmwOrdering,
    ) -> T {
        let previous = field.fetch_op(op, operand, order);
        if let Some(stats) = self.stats {
            stats.record_fast();
        }
        previous
    }

    /// Read, compute, compare-and-swap until the swap lands.
    ///
    /// A failed swap reports the value it found; that value is as fresh as a
    /// new load and is used as the next attempt's starting point. An error
    /// from `next` aborts before the swap, so it never leaves a partial
    /// update.
    fn cas_loop<T: FieldScalar>(
        &self,
        field: &AtomicField<T>,
        order: RmwOrdering,
        mut next: impl FnMut(T) -> AtomicResult<T>,
    ) -> AtomicResult<T> {
        let mut current = field.load(order.load());
        let mut failures: u32 = 0;
        loop {
            let new = match next(current) {
                Ok(new) => new,
                Err(err) => {
                    if let Some(stats) = self.stats {
                        stats.record_slow(failures, false);
                    }
                    return Err(self.reject(err));
                }
            };
            let outcome = field.compare_and_swap(current, new, order);
            if outcome.success {
                if let Some(stats) = self.stats {
                    stats.record_slow(failures.saturating_add(1), true);
                }
                return Ok(current);
            }
            failures = failures.saturating_add(1);
            if self.policy.exhausted(failures) {
                if let Some(stats) = self.stats {
                    stats.record_slow(failures, false);
                }
                trace!(attempts = failures, "compare-and-swap retry budget exhausted");
                return Err(AtomicError::RetryBudgetExhausted { attempts: failures });
            }
            self.policy.backoff.snooze(failures);
            current = outcome.previous;
        }
    }
}

/// [`Dispatcher::modify`] with the default, unbounded dispatcher.
#[inline]
pub fn modify<T: FieldScalar>(
    field: &AtomicField<T>,
    op: RmwOp<'_, T>,
    operand: T,
    order: Ordering,
) -> AtomicResult<T> {
    Dispatcher::new().modify(field, op, operand, order)
}

#[cfg(test)]
mod test {
    use std::{cell::Cell, sync::atomic::AtomicBool};

    use super::*;
    use crate::{
        cell::new_cell,
        ordering::{AccessKind, LoadOrdering, StoreOrdering},
        retry::Backoff,
        scalar::ScalarKind,
    };

    #[test]
    fn fast_path_returns_previous_value() {
        let field = new_cell(10i32);
        assert_eq!(modify(&field, RmwOp::Add, 5, Ordering::AcqRel), Ok(10));
        assert_eq!(modify(&field, RmwOp::Sub, 3, Ordering::SeqCst), Ok(15));
        assert_eq!(modify(&field, RmwOp::And, 0b1000, Ordering::AcqRel), Ok(12));
        assert_eq!(modify(&field, RmwOp::Or, 0b0011, Ordering::AcqRel), Ok(8));
        assert_eq!(modify(&field, RmwOp::Xor, 0b1111, Ordering::AcqRel), Ok(11));
        assert_eq!(field.load(LoadOrdering::Acquire), 0b0100);
    }

    #[test]
    fn affine_update_through_cas_loop() {
        let field = new_cell(100i64);
        let affine = |x: i64, a: i64| x * a + 3;
        let mut seen = vec![field.load(LoadOrdering::Acquire)];
        for _ in 0..3 {
            modify(&field, RmwOp::Other(&affine), 2, Ordering::AcqRel).unwrap();
            seen.push(field.load(LoadOrdering::Acquire));
        }
        assert_eq!(seen, [100, 203, 409, 821]);
    }

    #[test]
    fn weak_orderings_are_rejected_without_mutation() {
        let stats = DispatchStats::new();
        let dispatcher = Dispatcher::new().with_stats(&stats);
        let field = new_cell(7u32);
        let double = |x: u32, _: u32| x * 2;
        for order in [Ordering::Relaxed, Ordering::Acquire, Ordering::Release] {
            assert_eq!(
                dispatcher.modify(&field, RmwOp::Add, 1, order),
                Err(AtomicError::UnsupportedOrdering {
                    requested: order,
                    access: AccessKind::ReadModifyWrite,
                })
            );
            assert!(
                dispatcher
                    .modify(&field, RmwOp::Other(&double), 0, order)
                    .is_err()
            );
            assert!(dispatcher.modify_cas(&field, RmwOp::Xor, 1, order).is_err());
        }
        assert_eq!(field.load(LoadOrdering::SeqCst), 7);
        assert_eq!(stats.snapshot().rejected, 9);
    }

    #[test]
    fn forced_cas_matches_fast_path() {
        for op in HardwareOp::ALL {
            let fast = new_cell(0x5A5A_5A5Au32);
            let slow = new_cell(0x5A5A_5A5Au32);
            for operand in [0u32, 1, 0xFFFF_FFFF, 0x1234_5678, 7] {
                let a = modify(&fast, op.into(), operand, Ordering::AcqRel).unwrap();
                let b = Dispatcher::new()
                    .modify_cas(&slow, op.into(), operand, Ordering::AcqRel)
                    .unwrap();
                assert_eq!(a, b, "{op}");
            }
            assert_eq!(fast.into_inner(), slow.into_inner(), "{op}");
        }
    }

    #[test]
    fn stats_observe_paths() {
        let stats = DispatchStats::new();
        let dispatcher = Dispatcher::new().with_stats(&stats);
        let field = new_cell(0u64);
        let inc = |x: u64, v: u64| x + v;
        dispatcher.modify(&field, RmwOp::Add, 1, Ordering::AcqRel).unwrap();
        dispatcher.modify(&field, RmwOp::Other(&inc), 1, Ordering::AcqRel).unwrap();
        dispatcher.modify_cas(&field, RmwOp::Add, 1, Ordering::SeqCst).unwrap();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.fast_path_ops, 1);
        assert_eq!(snapshot.slow_path_ops, 2);
        assert_eq!(snapshot.cas_attempts, 2);
        assert_eq!(snapshot.cas_failures, 0);
        assert_eq!(field.into_inner(), 3);
    }

    #[test]
    fn retry_budget_is_enforced() {
        // The update function races itself: every call moves the field
        // behind the loop's back, so every swap attempt fails.
        let field = new_cell(0i32);
        let interfere = |x: i32, _: i32| {
            field.store(x + 1, StoreOrdering::Release);
            x + 100
        };
        let stats = DispatchStats::new();
        let dispatcher = Dispatcher::new()
            .with_policy(
                RetryPolicy::default()
                    .with_max_retries(3)
                    .with_backoff(Backoff::Spin { max_shift: 2 }),
            )
            .with_stats(&stats);
        assert_eq!(
            dispatcher.modify(&field, RmwOp::Other(&interfere), 0, Ordering::AcqRel),
            Err(AtomicError::RetryBudgetExhausted { attempts: 4 })
        );
        assert_eq!(field.load(LoadOrdering::Acquire), 4);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.slow_path_ops, 0);
        assert_eq!(snapshot.cas_failures, 4);
    }

    #[test]
    fn unbounded_loop_retries_until_success() {
        let field = new_cell(0i32);
        let interfered = AtomicBool::new(false);
        let calls = Cell::new(0);
        let interfere_once = |x: i32, v: i32| {
            calls.set(calls.get() + 1);
            if !interfered.swap(true, std::sync::atomic::Ordering::Relaxed) {
                field.store(50, StoreOrdering::Release);
            }
            x + v
        };
        let previous = modify(&field, RmwOp::Other(&interfere_once), 1, Ordering::SeqCst);
        assert_eq!(previous, Ok(50));
        assert_eq!(calls.get(), 2);
        assert_eq!(field.into_inner(), 51);
    }

    #[test]
    fn runtime_typed_field() {
        let field = AnyField::new(ScalarValue::I64(40));
        let dispatcher = Dispatcher::new();
        assert_eq!(
            dispatcher.modify_field(&field, RmwOp::Add, ScalarValue::I64(2), Ordering::AcqRel),
            Ok(ScalarValue::I64(40))
        );
        assert_eq!(
            dispatcher.modify_field(&field, RmwOp::Add, ScalarValue::I32(2), Ordering::AcqRel),
            Err(AtomicError::TypeMismatch {
                expected: ScalarKind::I64,
                found: ScalarKind::I32,
            })
        );
        let shrink = |x: ScalarValue, _: ScalarValue| match x {
            ScalarValue::I64(x) => ScalarValue::I32(x as i32),
            other => other,
        };
        assert_eq!(
            dispatcher.modify_field(
                &field,
                RmwOp::Other(&shrink),
                ScalarValue::I64(0),
                Ordering::AcqRel
            ),
            Err(AtomicError::TypeMismatch {
                expected: ScalarKind::I64,
                found: ScalarKind::I32,
            })
        );
        assert_eq!(field.load(Ordering::Acquire), Ok(ScalarValue::I64(42)));
    }
}
