//! Detect items the bulk path missed by comparing counts.

use crate::platform::ItemKind;

/// Items expected but not retrieved. Never negative.
#[inline]
pub fn missing(expected: u64, retrieved: u64) -> u64 {
    expected.saturating_sub(retrieved)
}

/// Running shortfall for a repository or a whole group, split by item kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub missing_issues: u64,
    pub missing_pull_requests: u64,
}

impl Reconciliation {
    /// Add one label's shortfall and return it.
    pub fn record(&mut self, kind: ItemKind, expected: u64, retrieved: u64) -> u64 {
        let missing = missing(expected, retrieved);
        match kind {
            ItemKind::Issue => self.missing_issues += missing,
            ItemKind::PullRequest => self.missing_pull_requests += missing,
        }
        missing
    }

    /// Fold another tally into this one.
    pub fn absorb(&mut self, other: Reconciliation) {
        self.missing_issues += other.missing_issues;
        self.missing_pull_requests += other.missing_pull_requests;
    }

    pub fn total(&self) -> u64 {
        self.missing_issues + self.missing_pull_requests
    }

    /// Whether point lookups are needed at all.
    pub fn needs_resolution(&self) -> bool {
        self.total() > 0
    }
}
