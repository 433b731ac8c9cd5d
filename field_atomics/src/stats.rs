// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dispatch counters.
//!
//! A [`DispatchStats`] is owned by whoever wants the numbers and handed to a
//! [`Dispatcher`] by reference. There is no process-wide counter.
//!
//! [`Dispatcher`]: crate::Dispatcher

use core::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DispatchStats {
    fast_path_ops: AtomicU64,
    slow_path_ops: AtomicU64,
    cas_attempts: AtomicU64,
    cas_failures: AtomicU64,
    rejected: AtomicU64,
}

/// A point-in-time copy of a [`DispatchStats`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct StatsSnapshot {
    pub fast_path_ops: u64,
    pub slow_path_ops: u64,
    pub cas_attempts: u64,
    pub cas_failures: u64,
    pub rejected: u64,
}

impl StatsSnapshot {
    /// Failed CAS attempts per completed slow-path operation.
    pub fn retries_per_slow_op(&self) -> f64 {
        if self.slow_path_ops == 0 {
            0.0
        } else {
            self.cas_failures as f64 / self.slow_path_ops as f64
        }
    }
}

// The counters are diagnostics only and never order other memory.
impl DispatchStats {
    pub const fn new() -> Self {
        Self {
            fast_path_ops: AtomicU64::new(0),
            slow_path_ops: AtomicU64::new(0),
            cas_attempts: AtomicU64::new(0),
            cas_failures: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_fast(&self) {
        self.fast_path_ops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_slow(&self, attempts: u32, completed: bool) {
        if completed {
            self.slow_path_ops.fetch_add(1, Ordering::Relaxed);
        }
        let failures = if completed { attempts - 1 } else { attempts };
        self.cas_attempts
            .fetch_add(u64::from(attempts), Ordering::Relaxed);
        self.cas_failures
            .fetch_add(u64::from(failures), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fast_path_ops: self.fast_path_ops.load(Ordering::Relaxed),
            slow_path_ops: self.slow_path_ops.load(Ordering::Relaxed),
            cas_attempts: self.cas_attempts.load(Ordering::Relaxed),
            cas_failures: self.cas_failures.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.fast_path_ops.store(0, Ordering::Relaxed);
        self.slow_path_ops.store(0, Ordering::Relaxed);
        self.cas_attempts.store(0, Ordering::Relaxed);
        self.cas_failures.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slow_path_accounting() {
        let stats = DispatchStats::new();
        stats.record_slow(1, true);
        stats.record_slow(4, true);
        stats.record_slow(3, false);
        stats.record_fast();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.slow_path_ops, 2);
        assert_eq!(snapshot.cas_attempts, 8);
        assert_eq!(snapshot.cas_failures, 6);
        assert_eq!(snapshot.fast_path_ops, 1);
        assert_eq!(snapshot.retries_per_slow_op(), 3.0);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
