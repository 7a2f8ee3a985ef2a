// 🔢 Change Ordering - merge, de-duplicate, sort and index proposed changes
//
// Primary ordering: (star, planet, field, source, values), stable.
// It defines the persisted sequence and assigns index = position.
// Secondary ordering: newest first, on a copy; indices are left untouched.

use crate::change::ProposedChange;
use crate::record::value_order;
use std::cmp::Ordering;
use std::collections::HashSet;

// ============================================================================
// CHANGE SET (merge across sources)
// ============================================================================

/// In-progress set of changes for one update cycle.
///
/// A change structurally equal to one already in the set, or to a
/// blacklisted change, is dropped on insertion.
#[derive(Debug, Default)]
pub struct ChangeSet {
    changes: Vec<ProposedChange>,
    seen: HashSet<ProposedChange>,
    blacklist: HashSet<ProposedChange>,
    pub duplicates_dropped: usize,
    pub blacklisted_dropped: usize,
}

impl ChangeSet {
    pub fn new(blacklist: &[ProposedChange]) -> Self {
        ChangeSet {
            blacklist: blacklist.iter().cloned().collect(),
            ..Default::default()
        }
    }

    /// Returns true if the change was kept.
    pub fn push(&mut self, change: ProposedChange) -> bool {
        if self.blacklist.contains(&change) {
            self.blacklisted_dropped += 1;
            return false;
        }
        if self.seen.contains(&change) {
            self.duplicates_dropped += 1;
            return false;
        }
        self.seen.insert(change.clone());
        self.changes.push(change);
        true
    }

    /// Returns how many of the changes were kept.
    pub fn extend(&mut self, changes: impl IntoIterator<Item = ProposedChange>) -> usize {
        let mut kept = 0;
        for change in changes {
            if self.push(change) {
                kept += 1;
            }
        }
        kept
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Consume the set, applying the primary ordering.
    pub fn into_ordered(self) -> Vec<ProposedChange> {
        let mut changes = self.changes;
        primary_order(&mut changes);
        changes
    }
}

// ============================================================================
// ORDERINGS
// ============================================================================

fn primary_cmp(a: &ProposedChange, b: &ProposedChange) -> Ordering {
    a.star
        .cmp(&b.star)
        .then_with(|| a.planet.cmp(&b.planet))
        .then_with(|| a.field.cmp(&b.field))
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| value_order(&a.catalog_value, &b.catalog_value))
        .then_with(|| value_order(&a.source_value, &b.source_value))
}

/// Stable sort by the primary key, then index every change by position.
///
/// Applying it to an already-ordered sequence keeps every index as it was.
pub fn primary_order(changes: &mut [ProposedChange]) {
    // slice::sort_by is a stable merge sort, O(n log n)
    changes.sort_by(primary_cmp);
    reindex(changes);
}

/// Set each change's display index to its current position.
pub fn reindex(changes: &mut [ProposedChange]) {
    for (position, change) in changes.iter_mut().enumerate() {
        change.index = Some(position);
    }
}

/// Copy of the queue, most recently detected first. Ties keep queue order.
pub fn latest_first(changes: &[ProposedChange]) -> Vec<ProposedChange> {
    let mut latest = changes.to_vec();
    latest.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    latest
}
