// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Object shapes and typed field handles.
//!
//! A [`Shape`] is computed once per object type and lists its fields by
//! name and scalar type. Looking a field up by name yields a
//! [`FieldHandle<T>`], which is checked against the declared type once and
//! can then be used on any [`HeapObject`] of that shape to reach the typed
//! [`AtomicField<T>`] directly.
//!
//! A shape is identified by its allocation. Handles keep a weak reference to
//! the shape they were resolved from, so the allocation cannot be reused by
//! another shape while a handle still points at it.

use core::{fmt, marker::PhantomData, ptr};
use std::sync::{Arc, Weak};

use crate::{
    cell::AtomicField,
    error::{AtomicError, AtomicResult},
    scalar::{FieldScalar, ScalarKind},
    value::{AnyField, ScalarValue},
};

#[derive(Debug)]
pub struct Shape {
    fields: Box<[(Box<str>, ScalarKind)]>,
}

impl Shape {
    /// Creates a shape with the given fields, in layout order.
    ///
    /// Field names are expected to be unique; lookups resolve to the first
    /// field with a matching name.
    pub fn new<N: Into<Box<str>>>(fields: impl IntoIterator<Item = (N, ScalarKind)>) -> Arc<Self> {
        Arc::new(Self {
            fields: fields
                .into_iter()
                .map(|(name, kind)| (name.into(), kind))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ScalarKind)> {
        self.fields.iter().map(|(name, kind)| (&**name, *kind))
    }

    fn index_of(&self, name: &str) -> AtomicResult<usize> {
        self.fields
            .iter()
            .position(|(field, _)| &**field == name)
            .ok_or_else(|| AtomicError::UnknownField(name.to_owned()))
    }

    /// Looks up a field by name and checks that it holds a `T`.
    pub fn field<T: FieldScalar>(self: &Arc<Self>, name: &str) -> AtomicResult<FieldHandle<T>> {
        let index = self.index_of(name)?;
        let kind = self.fields[index].1;
        if kind != T::KIND {
            return Err(AtomicError::TypeMismatch {
                expected: kind,
                found: T::KIND,
            });
        }
        Ok(FieldHandle {
            index,
            shape: Arc::downgrade(self),
            _marker: PhantomData,
        })
    }
}

/// A resolved, typed reference to one field of a [`Shape`].
pub struct FieldHandle<T: FieldScalar> {
    index: usize,
    shape: Weak<Shape>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FieldScalar> FieldHandle<T> {
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Whether this handle was resolved from `shape`.
    pub fn belongs_to(&self, shape: &Arc<Shape>) -> bool {
        ptr::eq(self.shape.as_ptr(), Arc::as_ptr(shape))
    }
}

impl<T: FieldScalar> Clone for FieldHandle<T> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            shape: self.shape.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: FieldScalar> fmt::Debug for FieldHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHandle")
            .field("kind", &T::KIND)
            .field("index", &self.index)
            .field("shape", &self.shape.as_ptr())
            .finish()
    }
}

/// A managed object: a shape and one atomic field per declared field.
#[derive(Debug)]
pub struct HeapObject {
    shape: Arc<Shape>,
    fields: Box<[AnyField]>,
}

impl HeapObject {
    /// Allocates an object of `shape`. Fields named in `initial` take the
    /// given value, all others start at zero.
    pub fn new(shape: &Arc<Shape>, initial: &[(&str, ScalarValue)]) -> AtomicResult<Self> {
        let mut values: Vec<ScalarValue> = shape
            .iter()
            .map(|(_, kind)| ScalarValue::zero(kind))
            .collect();
        for &(name, value) in initial {
            let index = shape.index_of(name)?;
            let expected = shape.fields[index].1;
            if value.kind() != expected {
                return Err(AtomicError::TypeMismatch {
                    expected,
                    found: value.kind(),
                });
            }
            values[index] = value;
        }
        Ok(Self {
            shape: shape.clone(),
            fields: values.into_iter().map(AnyField::new).collect(),
        })
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    /// Resolves a handle to the typed field it names.
    pub fn field<T: FieldScalar>(&self, handle: &FieldHandle<T>) -> AtomicResult<&AtomicField<T>> {
        if !handle.belongs_to(&self.shape) {
            return Err(AtomicError::ForeignHandle);
        }
        self.fields
            .get(handle.index())
            .and_then(|field| field.as_typed::<T>())
            .ok_or(AtomicError::ForeignHandle)
    }

    /// The runtime-typed field called `name`.
    pub fn field_by_name(&self, name: &str) -> AtomicResult<&AnyField> {
        Ok(&self.fields[self.shape.index_of(name)?])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{dispatch::modify, op::RmwOp, ordering::LoadOrdering};

    fn point_shape() -> Arc<Shape> {
        Shape::new([
            ("x", ScalarKind::I32),
            ("y", ScalarKind::I32),
            ("hits", ScalarKind::U64),
        ])
    }

    #[test]
    fn handles_are_typed() {
        let shape = point_shape();
        assert_eq!(shape.len(), 3);
        assert_eq!(shape.field::<i32>("y").unwrap().index(), 1);
        assert_eq!(
            shape.field::<u32>("hits").unwrap_err(),
            AtomicError::TypeMismatch {
                expected: ScalarKind::U64,
                found: ScalarKind::U32,
            }
        );
        assert_eq!(
            shape.field::<i32>("z").unwrap_err(),
            AtomicError::UnknownField("z".into())
        );
    }

    #[test]
    fn object_fields_start_at_initial_or_zero() {
        let shape = point_shape();
        let object = HeapObject::new(&shape, &[("y", ScalarValue::I32(-3))]).unwrap();
        let x = object.field(&shape.field::<i32>("x").unwrap()).unwrap();
        let y = object.field(&shape.field::<i32>("y").unwrap()).unwrap();
        assert_eq!(x.load(LoadOrdering::Acquire), 0);
        assert_eq!(y.load(LoadOrdering::Acquire), -3);
        assert_eq!(object.field_by_name("hits").unwrap().kind(), ScalarKind::U64);

        assert!(matches!(
            HeapObject::new(&shape, &[("x", ScalarValue::U64(1))]),
            Err(AtomicError::TypeMismatch { .. })
        ));
        assert!(matches!(
            HeapObject::new(&shape, &[("w", ScalarValue::I32(1))]),
            Err(AtomicError::UnknownField(_))
        ));
    }

    #[test]
    fn handles_do_not_cross_shapes() {
        let a = point_shape();
        let b = point_shape();
        let handle = a.field::<u64>("hits").unwrap();
        let object = HeapObject::new(&b, &[]).unwrap();
        assert!(handle.belongs_to(&a));
        assert!(!handle.belongs_to(&b));
        assert_eq!(object.field(&handle).unwrap_err(), AtomicError::ForeignHandle);
        let own = HeapObject::new(&a, &[]).unwrap();
        assert!(own.field(&handle.clone()).is_ok());
    }

    #[test]
    fn handle_pins_its_shape_identity() {
        let handle = point_shape().field::<i32>("x").unwrap();
        // The shape is gone but the handle still holds its allocation, so no
        // later shape can be mistaken for it.
        for _ in 0..64 {
            let shape = point_shape();
            assert!(!handle.belongs_to(&shape));
            let object = HeapObject::new(&shape, &[]).unwrap();
            assert_eq!(object.field(&handle).unwrap_err(), AtomicError::ForeignHandle);
        }
    }

    #[test]
    fn large_shapes_index_without_truncation() {
        let names: Vec<String> = (0..70_000).map(|i| format!("f{i}")).collect();
        let shape = Shape::new(names.iter().map(|name| (name.as_str(), ScalarKind::U32)));
        let last = shape.field::<u32>("f69999").unwrap();
        assert_eq!(last.index(), 69_999);
        let object = HeapObject::new(&shape, &[("f69999", ScalarValue::U32(5))]).unwrap();
        assert_eq!(object.field(&last).unwrap().load(LoadOrdering::Acquire), 5);
    }

    #[test]
    fn modify_through_handle() {
        let shape = point_shape();
        let hits = shape.field::<u64>("hits").unwrap();
        let object = HeapObject::new(&shape, &[("hits", ScalarValue::U64(9))]).unwrap();
        let field = object.field(&hits).unwrap();
        assert_eq!(modify(field, RmwOp::Add, 1, crate::Ordering::AcqRel), Ok(9));
        assert_eq!(field.load(LoadOrdering::SeqCst), 10);
    }
}
