// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall-clock statistics over a set of trials.

use std::time::Duration;

use serde::Serialize;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct TimingSummary {
    pub min_ns: u128,
    pub median_ns: u128,
    pub mean_ns: u128,
    /// Mean wall time divided by the operations of one trial.
    pub mean_ns_per_op: f64,
}

impl TimingSummary {
    /// Summarises `samples`, each of which performed `ops` operations.
    /// Returns `None` for an empty sample set.
    pub fn from_samples(samples: &[Duration], ops: u64) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut nanos: Vec<u128> = samples.iter().map(Duration::as_nanos).collect();
        nanos.sort_unstable();
        let len = nanos.len();
        let median_ns = if len % 2 == 1 {
            nanos[len / 2]
        } else {
            (nanos[len / 2 - 1] + nanos[len / 2]) / 2
        };
        let mean_ns = nanos.iter().sum::<u128>() / len as u128;
        Some(Self {
            min_ns: nanos[0],
            median_ns,
            mean_ns,
            mean_ns_per_op: if ops == 0 {
                0.0
            } else {
                mean_ns as f64 / ops as f64
            },
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn summary_of_odd_and_even_samples() {
        let odd = [30, 10, 20].map(Duration::from_nanos);
        let summary = TimingSummary::from_samples(&odd, 10).unwrap();
        assert_eq!(summary.min_ns, 10);
        assert_eq!(summary.median_ns, 20);
        assert_eq!(summary.mean_ns, 20);
        assert_eq!(summary.mean_ns_per_op, 2.0);

        let even = [40, 10, 20, 30].map(Duration::from_nanos);
        let summary = TimingSummary::from_samples(&even, 0).unwrap();
        assert_eq!(summary.median_ns, 25);
        assert_eq!(summary.mean_ns_per_op, 0.0);

        assert!(TimingSummary::from_samples(&[], 1).is_none());
    }
}
