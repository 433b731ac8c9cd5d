// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use core::fmt;

use crate::{
    op::HardwareOp,
    ordering::{LoadOrdering, RmwOrdering, StoreOrdering},
    scalar::FieldScalar,
};

/// Result of a single compare-and-swap.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CasOutcome<T> {
    /// The value in the field when the comparison happened. On success this
    /// equals the expected value.
    pub previous: T,
    pub success: bool,
}

/// A field holding one scalar that is only ever accessed atomically.
///
/// The field is neither `Clone` nor movable while shared: every operation
/// borrows it, so its address stays fixed for as long as any operation can
/// be in flight.
#[repr(transparent)]
pub struct AtomicField<T: FieldScalar> {
    inner: T::Atomic,
}

impl<T: FieldScalar> AtomicField<T> {
    #[inline]
    pub fn new(initial: T) -> Self {
        Self {
            inner: T::new_atomic(initial),
        }
    }

    /// Loads the current value. Never torn.
    #[inline]
    pub fn load(&self, order: LoadOrdering) -> T {
        T::atomic_load(&self.inner, order.as_std())
    }

    /// Stores a value into the field.
    #[inline]
    pub fn store(&self, value: T, order: StoreOrdering) {
        T::atomic_store(&self.inner, value, order.as_std())
    }

    /// Stores a value into the field, returning the previous value.
    #[inline]
    pub fn swap(&self, value: T, order: RmwOrdering) -> T {
        T::atomic_swap(&self.inner, value, order.as_std())
    }

    /// Replaces the value with `new` if it currently equals `expected`.
    ///
    /// This is exactly one hardware compare-and-swap: it never loops and
    /// never fails spuriously. A failed call leaves the field untouched.
    #[inline]
    pub fn compare_and_swap(&self, expected: T, new: T, order: RmwOrdering) -> CasOutcome<T> {
        match T::atomic_compare_exchange(
            &self.inner,
            expected,
            new,
            order.as_std(),
            order.failure(),
        ) {
            Ok(previous) => CasOutcome {
                previous,
                success: true,
            },
            Err(previous) => CasOutcome {
                previous,
                success: false,
            },
        }
    }

    /// Performs `op` with one hardware read-modify-write instruction,
    /// returning the previous value.
    #[inline]
    pub fn fetch_op(&self, op: HardwareOp, operand: T, order: RmwOrdering) -> T {
        T::atomic_fetch(&self.inner, op, operand, order.as_std())
    }

    /// Mutable access to the value. Requires exclusive ownership, so no
    /// atomic operation can be in flight.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        T::atomic_get_mut(&mut self.inner)
    }

    #[inline]
    pub fn into_inner(self) -> T {
        T::atomic_into_inner(self.inner)
    }
}

/// Creates a new field holding `initial`.
#[inline]
pub fn new_cell<T: FieldScalar>(initial: T) -> AtomicField<T> {
    AtomicField::new(initial)
}

impl<T: FieldScalar + Default> Default for AtomicField<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: FieldScalar> From<T> for AtomicField<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: FieldScalar> fmt::Debug for AtomicField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicField")
            .field(&self.load(LoadOrdering::Acquire))
            .finish()
    }
}
