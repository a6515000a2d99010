//! Revision counters for optimistic concurrency.
//!
//! A pool root carries one revision per [`RevKind`] slot. Persisted binding
//! rows carry a [`Stamp`] instead of a bare revision: multi-version readers
//! order rows by [`Stamp::key`] and pick the largest.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotone revision counter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Rev(u64);

impl Rev {
    /// The revision every pool root starts at.
    #[must_use]
    pub const fn initial() -> Self {
        Self(0)
    }

    /// The revision following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Rev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Revision slot selector on a pool root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RevKind {
    /// Pool metadata.
    Root,
    /// Process activity.
    Proc,
}

impl RevKind {
    /// Number of revision slots on a pool root.
    pub const COUNT: usize = 2;

    /// Index into a pool root's revision vector.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            RevKind::Root => 0,
            RevKind::Proc => 1,
        }
    }
}

/// Commit stamp on a persisted binding row.
///
/// `At` is an authoritative post-commit revision. `Consumed` is a write
/// intent: the writer spent the binding at its current revision, and the row
/// becomes visible at the revision that commit produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stamp {
    At(Rev),
    Consumed(Rev),
}

impl Stamp {
    /// The revision at which the row becomes visible to readers.
    #[must_use]
    pub fn key(self) -> Rev {
        match self {
            Stamp::At(rev) => rev,
            Stamp::Consumed(rev) => rev.next(),
        }
    }

    /// The revision the writer observed.
    #[must_use]
    pub fn rev(self) -> Rev {
        match self {
            Stamp::At(rev) | Stamp::Consumed(rev) => rev,
        }
    }

    #[must_use]
    pub fn is_consumed(self) -> bool {
        matches!(self, Stamp::Consumed(_))
    }
}

// Ordered by visibility key; an authoritative row outranks a consumption
// intent at the same key.
impl Ord for Stamp {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = |s: &Stamp| match s {
            Stamp::Consumed(_) => 0u8,
            Stamp::At(_) => 1u8,
        };
        self.key()
            .cmp(&other.key())
            .then_with(|| rank(self).cmp(&rank(other)))
    }
}

impl PartialOrd for Stamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
