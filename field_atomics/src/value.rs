// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Runtime-typed scalars and fields.
//!
//! Heap objects of the managed runtime carry fields whose types are only
//! known from the object's shape. [`AnyField`] is such a field, and
//! [`ScalarValue`] is a value that may be stored into one. Every access
//! checks the value's type against the field's type before touching memory.

use core::fmt;

use crate::{
    cell::{AtomicField, CasOutcome},
    error::{AtomicError, AtomicResult},
    op::RmwOp,
    ordering::{LoadOrdering, Ordering, RmwOrdering, StoreOrdering},
    scalar::{FieldScalar, ScalarKind},
};

/// A scalar tagged with its type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ScalarValue {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
}

impl ScalarValue {
    pub const fn kind(self) -> ScalarKind {
        match self {
            ScalarValue::I32(_) => ScalarKind::I32,
            ScalarValue::I64(_) => ScalarKind::I64,
            ScalarValue::U32(_) => ScalarKind::U32,
            ScalarValue::U64(_) => ScalarKind::U64,
        }
    }

    /// The zero value of `kind`.
    pub const fn zero(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::I32 => ScalarValue::I32(0),
            ScalarKind::I64 => ScalarValue::I64(0),
            ScalarKind::U32 => ScalarValue::U32(0),
            ScalarKind::U64 => ScalarValue::U64(0),
        }
    }

    /// Converts an integer into a scalar of `kind`, if it fits.
    pub fn from_i128(kind: ScalarKind, value: i128) -> Option<Self> {
        Some(match kind {
            ScalarKind::I32 => ScalarValue::I32(i32::try_from(value).ok()?),
            ScalarKind::I64 => ScalarValue::I64(i64::try_from(value).ok()?),
            ScalarKind::U32 => ScalarValue::U32(u32::try_from(value).ok()?),
            ScalarKind::U64 => ScalarValue::U64(u64::try_from(value).ok()?),
        })
    }

    pub const fn as_i128(self) -> i128 {
        match self {
            ScalarValue::I32(v) => v as i128,
            ScalarValue::I64(v) => v as i128,
            ScalarValue::U32(v) => v as i128,
            ScalarValue::U64(v) => v as i128,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::I32(v) => write!(f, "{v}i32"),
            ScalarValue::I64(v) => write!(f, "{v}i64"),
            ScalarValue::U32(v) => write!(f, "{v}u32"),
            ScalarValue::U64(v) => write!(f, "{v}u64"),
        }
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::I32(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::I64(value)
    }
}

impl From<u32> for ScalarValue {
    fn from(value: u32) -> Self {
        ScalarValue::U32(value)
    }
}

impl From<u64> for ScalarValue {
    fn from(value: u64) -> Self {
        ScalarValue::U64(value)
    }
}

/// A read-modify-write operation on runtime-typed values.
pub type DynOp<'f> = RmwOp<'f, ScalarValue>;

/// An atomic field whose scalar type is a runtime property.
#[derive(Debug)]
pub enum AnyField {
    I32(AtomicField<i32>),
    I64(AtomicField<i64>),
    U32(AtomicField<u32>),
    U64(AtomicField<u64>),
}

/// Run `$body` with `$binding` bound to the typed [`AtomicField`] inside an
/// [`AnyField`] and `$T` aliased to its scalar type.
macro_rules! for_any_field {
    ($field: expr, $binding: ident, $T: ident, $body: block) => {
        match $field {
            $crate::value::AnyField::I32($binding) => {
                #[allow(dead_code)]
                type $T = i32;
                $body
            }
            $crate::value::AnyField::I64($binding) => {
                #[allow(dead_code)]
                type $T = i64;
                $body
            }
            $crate::value::AnyField::U32($binding) => {
                #[allow(dead_code)]
                type $T = u32;
                $body
            }
            $crate::value::AnyField::U64($binding) => {
                #[allow(dead_code)]
                type $T = u64;
                $body
            }
        }
    };
}
pub(crate) use for_any_field;

impl AnyField {
    pub fn new(initial: ScalarValue) -> Self {
        match initial {
            ScalarValue::I32(v) => AnyField::I32(AtomicField::new(v)),
            ScalarValue::I64(v) => AnyField::I64(AtomicField::new(v)),
            ScalarValue::U32(v) => AnyField::U32(AtomicField::new(v)),
            ScalarValue::U64(v) => AnyField::U64(AtomicField::new(v)),
        }
    }

    pub fn kind(&self) -> ScalarKind {
        match self {
            AnyField::I32(_) => ScalarKind::I32,
            AnyField::I64(_) => ScalarKind::I64,
            AnyField::U32(_) => ScalarKind::U32,
            AnyField::U64(_) => ScalarKind::U64,
        }
    }

    /// The typed field, if this field holds a `T`.
    pub fn as_typed<T: FieldScalar>(&self) -> Option<&AtomicField<T>> {
        T::downcast_field(self)
    }

    pub fn load(&self, order: Ordering) -> AtomicResult<ScalarValue> {
        let order = LoadOrdering::try_from(order)?;
        Ok(for_any_field!(self, field, T, {
            field.load(order).into_value()
        }))
    }

    pub fn store(&self, value: ScalarValue, order: Ordering) -> AtomicResult<()> {
        let value_kind = value.kind();
        for_any_field!(self, field, T, {
            let value = T::from_value(value).ok_or(AtomicError::TypeMismatch {
                expected: T::KIND,
                found: value_kind,
            })?;
            field.store(value, StoreOrdering::try_from(order)?);
            Ok(())
        })
    }

    /// A single compare-and-swap. Both values must be of the field's type.
    pub fn compare_and_swap(
        &self,
        expected: ScalarValue,
        new: ScalarValue,
        order: Ordering,
    ) -> AtomicResult<CasOutcome<ScalarValue>> {
        for_any_field!(self, field, T, {
            let mismatch = |found: ScalarKind| AtomicError::TypeMismatch {
                expected: T::KIND,
                found,
            };
            let expected = T::from_value(expected).ok_or_else(|| mismatch(expected.kind()))?;
            let new = T::from_value(new).ok_or_else(|| mismatch(new.kind()))?;
            let outcome = field.compare_and_swap(expected, new, RmwOrdering::try_from(order)?);
            Ok(CasOutcome {
                previous: outcome.previous.into_value(),
                success: outcome.success,
            })
        })
    }
}

impl<T: FieldScalar> From<AtomicField<T>> for AnyField {
    fn from(field: AtomicField<T>) -> Self {
        T::upcast_field(field)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ordering::AccessKind;

    #[test]
    fn scalar_value_conversions() {
        assert_eq!(ScalarValue::from(3i32).kind(), ScalarKind::I32);
        assert_eq!(ScalarValue::from(3u64).kind(), ScalarKind::U64);
        assert_eq!(
            ScalarValue::from_i128(ScalarKind::U32, -1),
            None,
            "negative into unsigned"
        );
        assert_eq!(
            ScalarValue::from_i128(ScalarKind::I32, 1 << 40),
            None,
            "too wide"
        );
        assert_eq!(
            ScalarValue::from_i128(ScalarKind::I64, -5),
            Some(ScalarValue::I64(-5))
        );
        assert_eq!(ScalarValue::U64(u64::MAX).as_i128(), u64::MAX as i128);
        assert_eq!(ScalarValue::zero(ScalarKind::I32), ScalarValue::I32(0));
        assert_eq!(ScalarValue::I32(-4).to_string(), "-4i32");
    }

    #[test]
    fn load_and_store_check_types_and_orderings() {
        let field = AnyField::new(ScalarValue::U32(1));
        assert_eq!(field.kind(), ScalarKind::U32);
        assert_eq!(field.load(Ordering::Acquire), Ok(ScalarValue::U32(1)));
        assert_eq!(
            field.load(Ordering::Relaxed),
            Err(AtomicError::UnsupportedOrdering {
                requested: Ordering::Relaxed,
                access: AccessKind::Load,
            })
        );
        assert_eq!(
            field.store(ScalarValue::I64(2), Ordering::Release),
            Err(AtomicError::TypeMismatch {
                expected: ScalarKind::U32,
                found: ScalarKind::I64,
            })
        );
        assert_eq!(
            field.store(ScalarValue::U32(2), Ordering::Acquire),
            Err(AtomicError::UnsupportedOrdering {
                requested: Ordering::Acquire,
                access: AccessKind::Store,
            })
        );
        assert_eq!(field.load(Ordering::SeqCst), Ok(ScalarValue::U32(1)));
        field.store(ScalarValue::U32(2), Ordering::AcqRel).unwrap();
        assert_eq!(field.load(Ordering::SeqCst), Ok(ScalarValue::U32(2)));
    }

    #[test]
    fn compare_and_swap_runtime_typed() {
        let field = AnyField::from(AtomicField::new(5i64));
        let outcome = field
            .compare_and_swap(ScalarValue::I64(4), ScalarValue::I64(9), Ordering::AcqRel)
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.previous, ScalarValue::I64(5));
        let outcome = field
            .compare_and_swap(ScalarValue::I64(5), ScalarValue::I64(9), Ordering::SeqCst)
            .unwrap();
        assert!(outcome.success);
        assert!(
            field
                .compare_and_swap(ScalarValue::I64(9), ScalarValue::U64(1), Ordering::SeqCst)
                .is_err()
        );
        assert_eq!(field.as_typed::<i64>().map(|f| f.load(LoadOrdering::Acquire)), Some(9));
        assert!(field.as_typed::<u64>().is_none());
    }
}
