// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Scalar types that can be stored in an atomic field.

use core::{
    fmt,
    sync::atomic::{self, AtomicI32, AtomicI64, AtomicU32, AtomicU64},
};

use crate::{
    cell::AtomicField,
    op::HardwareOp,
    value::{AnyField, ScalarValue},
};

/// Runtime tag of a [`FieldScalar`] type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    I32,
    I64,
    U32,
    U64,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 4] = [
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::U32,
        ScalarKind::U64,
    ];

    /// Width of the scalar in bytes.
    pub const fn size(self) -> usize {
        match self {
            ScalarKind::I32 | ScalarKind::U32 => 4,
            ScalarKind::I64 | ScalarKind::U64 => 8,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, ScalarKind::I32 | ScalarKind::I64)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
}

/// A scalar that has a lock-free hardware atomic representation.
///
/// This trait is sealed: it is implemented for `i32`, `i64`, `u32` and
/// `u64` only. All arithmetic wraps on overflow, matching what the hardware
/// RMW instructions do.
pub trait FieldScalar:
    private::Sealed + Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The standard library atomic backing a field of this type.
    type Atomic: Send + Sync + fmt::Debug;

    const KIND: ScalarKind;

    fn new_atomic(value: Self) -> Self::Atomic;

    fn atomic_load(atomic: &Self::Atomic, order: atomic::Ordering) -> Self;

    fn atomic_store(atomic: &Self::Atomic, value: Self, order: atomic::Ordering);

    fn atomic_swap(atomic: &Self::Atomic, value: Self, order: atomic::Ordering) -> Self;

    /// Strong compare-exchange. Never fails spuriously.
    fn atomic_compare_exchange(
        atomic: &Self::Atomic,
        current: Self,
        new: Self,
        success: atomic::Ordering,
        failure: atomic::Ordering,
    ) -> Result<Self, Self>;

    /// One hardware read-modify-write instruction, returning the previous
    /// value.
    fn atomic_fetch(
        atomic: &Self::Atomic,
        op: HardwareOp,
        value: Self,
        order: atomic::Ordering,
    ) -> Self;

    fn atomic_get_mut(atomic: &mut Self::Atomic) -> &mut Self;

    fn atomic_into_inner(atomic: Self::Atomic) -> Self;

    /// The plain, non-atomic counterpart of [`FieldScalar::atomic_fetch`].
    fn apply(op: HardwareOp, lhs: Self, rhs: Self) -> Self;

    fn into_value(self) -> ScalarValue;

    fn from_value(value: ScalarValue) -> Option<Self>;

    fn downcast_field(field: &AnyField) -> Option<&AtomicField<Self>>;

    fn upcast_field(field: AtomicField<Self>) -> AnyField;
}

macro_rules! impl_field_scalar {
    ($type: ty, $atomic: ty, $kind: ident) => {
        impl FieldScalar for $type {
            type Atomic = $atomic;

            const KIND: ScalarKind = ScalarKind::$kind;

            #[inline(always)]
            fn new_atomic(value: Self) -> Self::Atomic {
                <$atomic>::new(value)
            }

            #[inline(always)]
            fn atomic_load(atomic: &Self::Atomic, order: atomic::Ordering) -> Self {
                atomic.load(order)
            }

            #[inline(always)]
            fn atomic_store(atomic: &Self::Atomic, value: Self, order: atomic::Ordering) {
                atomic.store(value, order)
            }

            #[inline(always)]
            fn atomic_swap(atomic: &Self::Atomic, value: Self, order: atomic::Ordering) -> Self {
                atomic.swap(value, order)
            }

            #[inline(always)]
            fn atomic_compare_exchange(
                atomic: &Self::Atomic,
                current: Self,
                new: Self,
                success: atomic::Ordering,
                failure: atomic::Ordering,
            ) -> Result<Self, Self> {
                atomic.compare_exchange(current, new, success, failure)
            }

            #[inline(always)]
            fn atomic_fetch(
                atomic: &Self::Atomic,
                op: HardwareOp,
                value: Self,
                order: atomic::Ordering,
            ) -> Self {
                match op {
                    // x86: `lock xadd`; aarch64: `ldaddal` or an LL/SC pair.
                    HardwareOp::Add => atomic.fetch_add(value, order),
                    HardwareOp::Sub => atomic.fetch_sub(value, order),
                    HardwareOp::And => atomic.fetch_and(value, order),
                    HardwareOp::Or => atomic.fetch_or(value, order),
                    HardwareOp::Xor => atomic.fetch_xor(value, order),
                }
            }

            #[inline(always)]
            fn atomic_get_mut(atomic: &mut Self::Atomic) -> &mut Self {
                atomic.get_mut()
            }

            #[inline(always)]
            fn atomic_into_inner(atomic: Self::Atomic) -> Self {
                atomic.into_inner()
            }

            #[inline(always)]
            fn apply(op: HardwareOp, lhs: Self, rhs: Self) -> Self {
                match op {
                    HardwareOp::Add => lhs.wrapping_add(rhs),
                    HardwareOp::Sub => lhs.wrapping_sub(rhs),
                    HardwareOp::And => lhs & rhs,
                    HardwareOp::Or => lhs | rhs,
                    HardwareOp::Xor => lhs ^ rhs,
                }
            }

            #[inline(always)]
            fn into_value(self) -> ScalarValue {
                ScalarValue::$kind(self)
            }

            #[inline(always)]
            fn from_value(value: ScalarValue) -> Option<Self> {
                if let ScalarValue::$kind(value) = value {
                    Some(value)
                } else {
                    None
                }
            }

            #[inline(always)]
            fn downcast_field(field: &AnyField) -> Option<&AtomicField<Self>> {
                if let AnyField::$kind(field) = field {
                    Some(field)
                } else {
                    None
                }
            }

            #[inline(always)]
            fn upcast_field(field: AtomicField<Self>) -> AnyField {
                AnyField::$kind(field)
            }
        }
    };
}

impl_field_scalar!(i32, AtomicI32, I32);
impl_field_scalar!(i64, AtomicI64, I64);
impl_field_scalar!(u32, AtomicU32, U32);
impl_field_scalar!(u64, AtomicU64, U64);
