// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Read-modify-write operations and their lowering.

use core::fmt;

use crate::scalar::FieldScalar;

/// An operation with a single-instruction hardware atomic form.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HardwareOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
}

impl HardwareOp {
    pub const ALL: [HardwareOp; 5] = [
        HardwareOp::Add,
        HardwareOp::Sub,
        HardwareOp::And,
        HardwareOp::Or,
        HardwareOp::Xor,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            HardwareOp::Add => "add",
            HardwareOp::Sub => "sub",
            HardwareOp::And => "and",
            HardwareOp::Or => "or",
            HardwareOp::Xor => "xor",
        }
    }
}

impl fmt::Display for HardwareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a [`RmwOp`] is executed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Lowering {
    /// One hardware RMW instruction.
    Hardware(HardwareOp),
    /// Load, compute, compare-and-swap, retry on conflict.
    CasLoop,
}

/// A binary read-modify-write operation `field = op(field, operand)`.
///
/// The recognised operators are enum tags chosen at the call site, so the
/// dispatcher never has to inspect a function value to find out whether an
/// operation has a hardware form. Anything else goes through
/// [`RmwOp::Other`] and is executed with a compare-and-swap loop.
///
/// The `Other` function receives `(current, operand)` and may be called
/// any number of times per `modify` call, once per CAS attempt. It must be
/// pure.
pub enum RmwOp<'f, T> {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Other(&'f dyn Fn(T, T) -> T),
}

impl<T> Clone for RmwOp<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RmwOp<'_, T> {}

impl<T> fmt::Debug for RmwOp<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lowering() {
            Lowering::Hardware(op) => write!(f, "{op:?}"),
            Lowering::CasLoop => f.write_str("Other(..)"),
        }
    }
}

impl<T> From<HardwareOp> for RmwOp<'_, T> {
    fn from(op: HardwareOp) -> Self {
        match op {
            HardwareOp::Add => RmwOp::Add,
            HardwareOp::Sub => RmwOp::Sub,
            HardwareOp::And => RmwOp::And,
            HardwareOp::Or => RmwOp::Or,
            HardwareOp::Xor => RmwOp::Xor,
        }
    }
}

impl<'f, T> RmwOp<'f, T> {
    /// Classify the operation.
    #[inline(always)]
    pub const fn lowering(&self) -> Lowering {
        match self {
            RmwOp::Add => Lowering::Hardware(HardwareOp::Add),
            RmwOp::Sub => Lowering::Hardware(HardwareOp::Sub),
            RmwOp::And => Lowering::Hardware(HardwareOp::And),
            RmwOp::Or => Lowering::Hardware(HardwareOp::Or),
            RmwOp::Xor => Lowering::Hardware(HardwareOp::Xor),
            RmwOp::Other(_) => Lowering::CasLoop,
        }
    }

    #[inline(always)]
    pub const fn is_hardware(&self) -> bool {
        !matches!(self, RmwOp::Other(_))
    }

    /// Splits the operation into its hardware form or its function.
    #[inline(always)]
    pub(crate) fn split(self) -> Result<HardwareOp, &'f dyn Fn(T, T) -> T> {
        match self {
            RmwOp::Add => Ok(HardwareOp::Add),
            RmwOp::Sub => Ok(HardwareOp::Sub),
            RmwOp::And => Ok(HardwareOp::And),
            RmwOp::Or => Ok(HardwareOp::Or),
            RmwOp::Xor => Ok(HardwareOp::Xor),
            RmwOp::Other(f) => Err(f),
        }
    }
}

impl<T: FieldScalar> RmwOp<'_, T> {
    /// Compute `op(current, operand)` without touching memory.
    #[inline(always)]
    pub fn apply(&self, current: T, operand: T) -> T {
        match self.split() {
            Ok(op) => T::apply(op, current, operand),
            Err(f) => f(current, operand),
        }
    }
}
