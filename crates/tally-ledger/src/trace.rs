use serde::{Deserialize, Serialize};
use tally_types::{StoredAmount, Version};

use crate::error::{LedgerError, Result};

/// Trace length above which [`VersionedTrace::recent_value_at_or_before`]
/// checks near the tip before binary-searching.
pub const RECENT_LOOKUP_THRESHOLD: usize = 5;

/// A single `(version, value)` checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: Version,
    pub value: StoredAmount,
}

/// Append-only, version-ordered value history for one entity.
///
/// Versions never decrease. A push at the tip version overwrites the tip
/// value instead of appending, so one logical operation touching an entity
/// twice still leaves a single entry. Entries below the tip are immutable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedTrace {
    entries: Vec<VersionEntry>,
}

impl VersionedTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trace holding a single checkpoint.
    pub fn starting_with(version: Version, value: StoredAmount) -> Self {
        Self {
            entries: vec![VersionEntry { version, value }],
        }
    }

    /// Record `value` at `version`, returning `(old, new)` where `old` is the
    /// previous latest value.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OutOfOrderInsertion`] if `version` is below the
    /// current tip.
    pub fn push(
        &mut self,
        version: Version,
        value: StoredAmount,
    ) -> Result<(StoredAmount, StoredAmount)> {
        let Some(last) = self.entries.last_mut() else {
            self.entries.push(VersionEntry { version, value });
            return Ok((0, value));
        };

        if version < last.version {
            tracing::error!(
                last = last.version,
                attempted = version,
                "trace push below tip"
            );
            return Err(LedgerError::OutOfOrderInsertion {
                last: last.version,
                attempted: version,
            });
        }

        let old = last.value;
        if version == last.version {
            last.value = value;
        } else {
            self.entries.push(VersionEntry { version, value });
        }
        Ok((old, value))
    }

    /// Returns `true` if a push at `version` would be accepted.
    pub fn accepts(&self, version: Version) -> bool {
        self.last_version().map_or(true, |last| version >= last)
    }

    /// Version of the tip entry, if any.
    pub fn last_version(&self) -> Option<Version> {
        self.entries.last().map(|e| e.version)
    }

    /// Value of the tip entry, or 0 for an empty trace.
    pub fn latest(&self) -> StoredAmount {
        self.entries.last().map_or(0, |e| e.value)
    }

    pub fn latest_entry(&self) -> Option<VersionEntry> {
        self.entries.last().copied()
    }

    /// Value of the last entry with version `<= version`, or 0 if none.
    pub fn value_at_or_before(&self, version: Version) -> StoredAmount {
        let pos = self.upper_bound(version, 0, self.entries.len());
        self.value_before(pos)
    }

    /// Same result as [`value_at_or_before`](Self::value_at_or_before),
    /// tuned for queries near the tip.
    pub fn recent_value_at_or_before(&self, version: Version) -> StoredAmount {
        self.recent_lookup(version, RECENT_LOOKUP_THRESHOLD)
    }

    /// Tip-biased lookup with an explicit threshold.
    ///
    /// For traces longer than `threshold`, the entry at `len - isqrt(len)`
    /// splits the search window before the binary search runs.
    pub fn recent_lookup(&self, version: Version, threshold: usize) -> StoredAmount {
        let len = self.entries.len();
        let mut low = 0;
        let mut high = len;

        if len > threshold {
            let mid = len - isqrt(len);
            if version < self.entries[mid].version {
                high = mid;
            } else {
                low = mid + 1;
            }
        }

        let pos = self.upper_bound(version, low, high);
        self.value_before(pos)
    }

    /// First entry with version `>= version`.
    pub fn lower_lookup(&self, version: Version) -> Option<VersionEntry> {
        let pos = self.lower_bound(version, 0, self.entries.len());
        self.entries.get(pos).copied()
    }

    /// Last entry with version `<= version`.
    pub fn upper_lookup(&self, version: Version) -> Option<VersionEntry> {
        let pos = self.upper_bound(version, 0, self.entries.len());
        pos.checked_sub(1).map(|i| self.entries[i])
    }

    pub fn entry_at(&self, pos: usize) -> Option<VersionEntry> {
        self.entries.get(pos).copied()
    }

    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the first entry in `[low, high)` with version `> version`,
    /// or `high` if there is none.
    fn upper_bound(&self, version: Version, low: usize, high: usize) -> usize {
        low + self.entries[low..high].partition_point(|e| e.version <= version)
    }

    /// Index of the first entry in `[low, high)` with version `>= version`,
    /// or `high` if there is none.
    fn lower_bound(&self, version: Version, low: usize, high: usize) -> usize {
        low + self.entries[low..high].partition_point(|e| e.version < version)
    }

    fn value_before(&self, pos: usize) -> StoredAmount {
        pos.checked_sub(1).map_or(0, |i| self.entries[i].value)
    }
}

/// Integer square root, rounded down.
fn isqrt(n: usize) -> usize {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}
