//! Per-event version counter
//!
//! Every accepted mutation on an event produces the next version. Creation
//! produces `Version::INITIAL` (1). Versions for a given event are strictly
//! increasing and never reused, which makes them usable as the expected value
//! of a compare-and-swap.

use serde::{Deserialize, Serialize};

/// Version stamp of an event
///
/// ## Invariants
///
/// - A freshly created event is at `Version::INITIAL`
/// - Each accepted mutation moves an event from `v` to `v.next()`
/// - Version 0 is never assigned to a stored event
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version assigned on creation
    pub const INITIAL: Version = Version(1);

    /// Create a version from its numeric value
    #[inline]
    pub const fn new(v: u64) -> Self {
        Version(v)
    }

    /// Get the numeric value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The version an accepted mutation produces
    ///
    /// Saturates instead of wrapping so a version can never be reused.
    #[inline]
    pub const fn next(&self) -> Self {
        Version(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(v: u64) -> Self {
        Version(v)
    }
}
