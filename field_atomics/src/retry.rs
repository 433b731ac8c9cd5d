// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tunables for the compare-and-swap retry loop.

/// What a CAS loop does after a failed attempt.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Spin `2^n` times after the `n`th consecutive failure, with `n`
    /// capped at `max_shift`.
    Spin { max_shift: u32 },
}

impl Backoff {
    /// Upper bound on `max_shift`; longer spins belong in a blocking wait.
    pub const MAX_SHIFT: u32 = 10;

    #[inline]
    pub(crate) fn snooze(self, failures: u32) {
        if let Backoff::Spin { max_shift } = self {
            let shift = failures
                .saturating_sub(1)
                .min(max_shift)
                .min(Self::MAX_SHIFT);
            for _ in 0..(1u32 << shift) {
                core::hint::spin_loop();
            }
        }
    }
}

/// Retry policy of the slow path.
///
/// The default is the plain loop: no backoff and no cap. That loop is
/// lock-free but not wait-free, so a caller that needs bounded latency under
/// adversarial scheduling sets `max_retries`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct RetryPolicy {
    /// Number of failed attempts tolerated before giving up. `None` retries
    /// forever.
    pub max_retries: Option<u32>,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub const UNBOUNDED: RetryPolicy = RetryPolicy {
        max_retries: None,
        backoff: Backoff::None,
    };

    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[inline]
    pub(crate) fn exhausted(&self, failures: u32) -> bool {
        self.max_retries.is_some_and(|max| failures > max)
    }
}
