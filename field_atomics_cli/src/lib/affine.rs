// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use field_atomics::{AtomicResult, Dispatcher, LoadOrdering, Ordering, RmwOp, new_cell};

/// Applies `x -> x * mul + add` to a fresh cell `steps` times through the
/// compare-and-swap path and returns every value the cell held, starting
/// with `initial`. Arithmetic wraps.
pub fn affine_sequence(
    dispatcher: &Dispatcher<'_>,
    initial: i64,
    mul: i64,
    add: i64,
    steps: usize,
    order: Ordering,
) -> AtomicResult<Vec<i64>> {
    let cell = new_cell(initial);
    let affine = |x: i64, mul: i64| x.wrapping_mul(mul).wrapping_add(add);
    let mut values = Vec::with_capacity(steps + 1);
    values.push(initial);
    for _ in 0..steps {
        let previous = dispatcher.modify(&cell, RmwOp::Other(&affine), mul, order)?;
        debug_assert_eq!(Some(&previous), values.last());
        values.push(cell.load(LoadOrdering::Acquire));
    }
    Ok(values)
}

#[cfg(test)]
mod test {
    use field_atomics::AtomicError;

    use super::*;

    #[test]
    fn doubles_and_adds_three() {
        let values =
            affine_sequence(&Dispatcher::new(), 100, 2, 3, 3, Ordering::AcqRel).unwrap();
        assert_eq!(values, [100, 203, 409, 821]);
    }

    #[test]
    fn zero_steps_is_just_the_initial_value() {
        let values = affine_sequence(&Dispatcher::new(), -4, 7, 1, 0, Ordering::SeqCst).unwrap();
        assert_eq!(values, [-4]);
    }

    #[test]
    fn weak_ordering_is_rejected() {
        assert!(matches!(
            affine_sequence(&Dispatcher::new(), 1, 1, 1, 1, Ordering::Relaxed),
            Err(AtomicError::UnsupportedOrdering { .. })
        ));
    }
}
