// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Memory orderings accepted by field operations.
//!
//! Callers request one of the five [`Ordering`]s. Before anything touches
//! memory the request is validated into one of the typed orderings
//! [`LoadOrdering`], [`StoreOrdering`] or [`RmwOrdering`], each of which can
//! only represent orderings at or above the safety floor of its access kind.
//! The cell operations take the typed orderings, so they cannot be called
//! with a too-weak ordering in the first place.

use core::{fmt, sync::atomic};

use crate::error::AtomicError;

/// Memory ordering requested by a caller.
///
/// This mirrors [`core::sync::atomic::Ordering`], but is a plain value that
/// can be carried around, printed and validated before use.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Ordering {
    Relaxed,
    Acquire,
    Release,
    AcqRel,
    SeqCst,
}

impl Ordering {
    pub const ALL: [Ordering; 5] = [
        Ordering::Relaxed,
        Ordering::Acquire,
        Ordering::Release,
        Ordering::AcqRel,
        Ordering::SeqCst,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Ordering::Relaxed => "relaxed",
            Ordering::Acquire => "acquire",
            Ordering::Release => "release",
            Ordering::AcqRel => "acq-rel",
            Ordering::SeqCst => "seq-cst",
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of memory access an ordering is validated for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AccessKind {
    Load,
    Store,
    ReadModifyWrite,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessKind::Load => "load",
            AccessKind::Store => "store",
            AccessKind::ReadModifyWrite => "read-modify-write",
        })
    }
}

/// Ordering of an atomic load: at least acquire.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LoadOrdering {
    Acquire,
    SeqCst,
}

impl LoadOrdering {
    #[inline(always)]
    pub(crate) const fn as_std(self) -> atomic::Ordering {
        match self {
            LoadOrdering::Acquire => atomic::Ordering::Acquire,
            LoadOrdering::SeqCst => atomic::Ordering::SeqCst,
        }
    }
}

impl TryFrom<Ordering> for LoadOrdering {
    type Error = AtomicError;

    /// An acquire-release request is served by an acquire load.
    fn try_from(order: Ordering) -> Result<Self, Self::Error> {
        match order {
            Ordering::Acquire | Ordering::AcqRel => Ok(LoadOrdering::Acquire),
            Ordering::SeqCst => Ok(LoadOrdering::SeqCst),
            Ordering::Relaxed | Ordering::Release => Err(AtomicError::UnsupportedOrdering {
                requested: order,
                access: AccessKind::Load,
            }),
        }
    }
}

/// Ordering of an atomic store: at least release.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StoreOrdering {
    Release,
    SeqCst,
}

impl StoreOrdering {
    #[inline(always)]
    pub(crate) const fn as_std(self) -> atomic::Ordering {
        match self {
            StoreOrdering::Release => atomic::Ordering::Release,
            StoreOrdering::SeqCst => atomic::Ordering::SeqCst,
        }
    }
}

impl TryFrom<Ordering> for StoreOrdering {
    type Error = AtomicError;

    /// An acquire-release request is served by a release store.
    fn try_from(order: Ordering) -> Result<Self, Self::Error> {
        match order {
            Ordering::Release | Ordering::AcqRel => Ok(StoreOrdering::Release),
            Ordering::SeqCst => Ok(StoreOrdering::SeqCst),
            Ordering::Relaxed | Ordering::Acquire => Err(AtomicError::UnsupportedOrdering {
                requested: order,
                access: AccessKind::Store,
            }),
        }
    }
}

/// Ordering of a read-modify-write or compare-and-swap: at least
/// acquire-release.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RmwOrdering {
    AcqRel,
    SeqCst,
}

impl RmwOrdering {
    #[inline(always)]
    pub(crate) const fn as_std(self) -> atomic::Ordering {
        match self {
            RmwOrdering::AcqRel => atomic::Ordering::AcqRel,
            RmwOrdering::SeqCst => atomic::Ordering::SeqCst,
        }
    }

    /// Ordering used when a compare-and-swap fails and only reads.
    #[inline(always)]
    pub(crate) const fn failure(self) -> atomic::Ordering {
        match self {
            RmwOrdering::AcqRel => atomic::Ordering::Acquire,
            RmwOrdering::SeqCst => atomic::Ordering::SeqCst,
        }
    }

    /// The load that starts a CAS loop iteration.
    #[inline(always)]
    pub(crate) const fn load(self) -> LoadOrdering {
        match self {
            RmwOrdering::AcqRel => LoadOrdering::Acquire,
            RmwOrdering::SeqCst => LoadOrdering::SeqCst,
        }
    }
}

impl TryFrom<Ordering> for RmwOrdering {
    type Error = AtomicError;

    fn try_from(order: Ordering) -> Result<Self, Self::Error> {
        match order {
            Ordering::AcqRel => Ok(RmwOrdering::AcqRel),
            Ordering::SeqCst => Ok(RmwOrdering::SeqCst),
            Ordering::Relaxed | Ordering::Acquire | Ordering::Release => {
                Err(AtomicError::UnsupportedOrdering {
                    requested: order,
                    access: AccessKind::ReadModifyWrite,
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn load_floor() {
        assert_eq!(
            LoadOrdering::try_from(Ordering::Acquire).unwrap(),
            LoadOrdering::Acquire
        );
        assert_eq!(
            LoadOrdering::try_from(Ordering::AcqRel).unwrap(),
            LoadOrdering::Acquire
        );
        assert_eq!(
            LoadOrdering::try_from(Ordering::SeqCst).unwrap(),
            LoadOrdering::SeqCst
        );
        assert!(LoadOrdering::try_from(Ordering::Relaxed).is_err());
        assert!(LoadOrdering::try_from(Ordering::Release).is_err());
    }

    #[test]
    fn store_floor() {
        assert_eq!(
            StoreOrdering::try_from(Ordering::AcqRel).unwrap(),
            StoreOrdering::Release
        );
        assert!(StoreOrdering::try_from(Ordering::Relaxed).is_err());
        assert!(StoreOrdering::try_from(Ordering::Acquire).is_err());
    }

    #[test]
    fn rmw_floor() {
        for order in Ordering::ALL {
            let accepted = RmwOrdering::try_from(order).is_ok();
            assert_eq!(
                accepted,
                matches!(order, Ordering::AcqRel | Ordering::SeqCst),
                "{order}"
            );
        }
        let err = RmwOrdering::try_from(Ordering::Release).unwrap_err();
        assert_eq!(
            err,
            AtomicError::UnsupportedOrdering {
                requested: Ordering::Release,
                access: AccessKind::ReadModifyWrite,
            }
        );
    }

    #[test]
    fn cas_failure_ordering_never_releases() {
        assert_eq!(RmwOrdering::AcqRel.failure(), atomic::Ordering::Acquire);
        assert_eq!(RmwOrdering::SeqCst.failure(), atomic::Ordering::SeqCst);
    }
}
