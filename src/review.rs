// 🧐 Review State Machine - accept / deny / postpone pending changes
//
//   PENDING --accept-->   ACCEPTED  (forwarded to the committer, removed)
//   PENDING --deny-->     DENIED    (blacklisted, then removed)
//   PENDING --postpone--> POSTPONED (removed; may come back on the next update)
//
// The session holds no state beyond what it loads from the store, and every
// disposition is flushed back before the next one runs. Range operations
// re-resolve against the current (shrinking) queue on every step.

use crate::change::ProposedChange;
use crate::committer::{BatchScope, CatalogCommitter, CommitMode};
use crate::db::ChangeStore;
use crate::ordering::{latest_first, reindex};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Where a pending change goes when it leaves the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Accepted,
    Denied,
    Postponed,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Accepted => "accepted",
            ReviewState::Denied => "denied",
            ReviewState::Postponed => "postponed",
        }
    }
}

// ============================================================================
// SELECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("invalid selection '{0}': expected a number, 'all', or a range such as 2-5 or first-last")]
    Invalid(String),
}

/// One end of a range: a 1-based index or a symbolic end of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    First,
    Last,
    At(usize),
}

impl Endpoint {
    fn resolve(self, len: usize) -> usize {
        match self {
            Endpoint::First => 1,
            Endpoint::Last => len,
            Endpoint::At(index) => index,
        }
    }
}

impl FromStr for Endpoint {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" | "s" | "start" => Ok(Endpoint::First),
            "last" | "e" | "end" => Ok(Endpoint::Last),
            other => other
                .parse()
                .map(Endpoint::At)
                .map_err(|_| SelectionError::Invalid(s.to_string())),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::First => f.write_str("first"),
            Endpoint::Last => f.write_str("last"),
            Endpoint::At(index) => write!(f, "{}", index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    One(usize),
    Range(Endpoint, Endpoint),
    All,
}

impl FromStr for Selection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Selection::All);
        }
        if let Some((start, end)) = trimmed.split_once('-') {
            let start = start
                .parse()
                .map_err(|_| SelectionError::Invalid(s.to_string()))?;
            let end = end
                .parse()
                .map_err(|_| SelectionError::Invalid(s.to_string()))?;
            return Ok(Selection::Range(start, end));
        }
        trimmed
            .parse()
            .map(Selection::One)
            .map_err(|_| SelectionError::Invalid(s.to_string()))
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("index {index} is out of range: {len} pending change(s)")]
    OutOfRange { index: usize, len: usize },

    #[error("invalid range {start}-{end}: {len} pending change(s)")]
    InvalidRange {
        start: Endpoint,
        end: Endpoint,
        len: usize,
    },

    #[error("commit of change {index} failed: {reason}")]
    Commit { index: usize, reason: String },

    #[error("commit batch failed: {reason}")]
    Batch { reason: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

// ============================================================================
// SESSION
// ============================================================================

/// One step of a removing operation: the index to take from the current
/// queue, and the index that entry had when the operation started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    at: usize,
    shown: usize,
}

impl Step {
    fn same(index: usize) -> Self {
        Step { at: index, shown: index }
    }
}

/// Review operations over one store, for one command invocation.
pub struct ReviewSession<'s, S: ChangeStore + ?Sized> {
    store: &'s mut S,
    changes: Vec<ProposedChange>,
}

impl<'s, S: ChangeStore + ?Sized> ReviewSession<'s, S> {
    /// Lazy session: the queue is loaded by the first operation that needs it.
    pub fn new(store: &'s mut S) -> Self {
        ReviewSession {
            store,
            changes: Vec::new(),
        }
    }

    pub fn open(store: &'s mut S) -> Result<Self, ReviewError> {
        let mut session = ReviewSession::new(store);
        session.reload()?;
        Ok(session)
    }

    pub fn pending(&self) -> &[ProposedChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn reload(&mut self) -> Result<(), ReviewError> {
        self.changes = self.store.read()?;
        Ok(())
    }

    fn reload_if_empty(&mut self) -> Result<(), ReviewError> {
        if self.changes.is_empty() {
            self.reload()?;
        }
        Ok(())
    }

    /// 1-based index -> position, against the current queue length.
    fn position(&self, index: usize) -> Result<usize, ReviewError> {
        let len = self.changes.len();
        if index == 0 || index > len {
            return Err(ReviewError::OutOfRange { index, len });
        }
        Ok(index - 1)
    }

    fn resolve_range(&self, start: Endpoint, end: Endpoint) -> Result<(usize, usize), ReviewError> {
        let len = self.changes.len();
        let (s, e) = (start.resolve(len), end.resolve(len));
        if s == 0 || e == 0 || s > len || e > len {
            return Err(ReviewError::InvalidRange { start, end, len });
        }
        Ok((s, e))
    }

    /// Steps of a removing range operation.
    ///
    /// Forward ranges keep hitting `start`, since every removal shifts the
    /// next original entry onto it. Reversed ranges walk down from `start`.
    fn removal_plan(&self, start: Endpoint, end: Endpoint) -> Result<Vec<Step>, ReviewError> {
        let (s, e) = self.resolve_range(start, end)?;
        Ok(if s <= e {
            (s..=e).map(|shown| Step { at: s, shown }).collect()
        } else {
            (e..=s).rev().map(Step::same).collect()
        })
    }

    /// Steps that drain the whole queue from the front.
    fn drain_plan(&self) -> Vec<Step> {
        (1..=self.changes.len())
            .map(|shown| Step { at: 1, shown })
            .collect()
    }

    fn remove(&mut self, step: Step, state: ReviewState) -> Result<ProposedChange, ReviewError> {
        let position = self.position(step.at)?;
        let change = self.changes.remove(position);
        reindex(&mut self.changes);
        self.store.write(&self.changes)?;
        tracing::info!("{} #{} {}", state.as_str(), step.shown, change);
        Ok(change)
    }

    // ------------------------------------------------------------------------
    // accept
    // ------------------------------------------------------------------------

    fn accept_at(
        &mut self,
        step: Step,
        apply: impl FnOnce(&ProposedChange, usize) -> anyhow::Result<()>,
    ) -> Result<ProposedChange, ReviewError> {
        let position = self.position(step.at)?;
        apply(&self.changes[position], step.shown).map_err(|err| ReviewError::Commit {
            index: step.shown,
            reason: format!("{:#}", err),
        })?;
        self.remove(step, ReviewState::Accepted)
    }

    fn accept_plan(
        &mut self,
        plan: Vec<Step>,
        committer: &mut dyn CatalogCommitter,
        mode: CommitMode,
    ) -> Result<Vec<ProposedChange>, ReviewError> {
        let mut accepted = Vec::with_capacity(plan.len());
        match mode {
            CommitMode::Single => {
                for step in plan {
                    accepted.push(self.accept_at(step, |change, i| {
                        committer.apply(change, i, CommitMode::Single)
                    })?);
                }
            }
            CommitMode::Batched => {
                let mut scope = BatchScope::open(committer).map_err(|err| ReviewError::Batch {
                    reason: format!("{:#}", err),
                })?;
                for step in plan {
                    // an early return drops the scope, which closes the batch
                    accepted.push(self.accept_at(step, |change, i| scope.apply(change, i))?);
                }
                scope.finish().map_err(|err| ReviewError::Batch {
                    reason: format!("{:#}", err),
                })?;
            }
        }
        Ok(accepted)
    }

    pub fn accept_one(
        &mut self,
        index: usize,
        committer: &mut dyn CatalogCommitter,
        mode: CommitMode,
    ) -> Result<ProposedChange, ReviewError> {
        self.reload_if_empty()?;
        self.position(index)?;
        let mut accepted = self.accept_plan(vec![Step::same(index)], committer, mode)?;
        Ok(accepted.remove(0))
    }

    pub fn accept_range(
        &mut self,
        start: Endpoint,
        end: Endpoint,
        committer: &mut dyn CatalogCommitter,
        mode: CommitMode,
    ) -> Result<Vec<ProposedChange>, ReviewError> {
        self.reload_if_empty()?;
        let plan = self.removal_plan(start, end)?;
        self.accept_plan(plan, committer, mode)
    }

    pub fn accept_all(
        &mut self,
        committer: &mut dyn CatalogCommitter,
        mode: CommitMode,
    ) -> Result<Vec<ProposedChange>, ReviewError> {
        self.reload_if_empty()?;
        if self.changes.is_empty() {
            return Ok(Vec::new());
        }
        let plan = self.drain_plan();
        self.accept_plan(plan, committer, mode)
    }

    pub fn accept(
        &mut self,
        selection: Selection,
        committer: &mut dyn CatalogCommitter,
        mode: CommitMode,
    ) -> Result<Vec<ProposedChange>, ReviewError> {
        match selection {
            Selection::One(index) => Ok(vec![self.accept_one(index, committer, mode)?]),
            Selection::Range(start, end) => self.accept_range(start, end, committer, mode),
            Selection::All => self.accept_all(committer, mode),
        }
    }

    // ------------------------------------------------------------------------
    // deny
    // ------------------------------------------------------------------------

    fn deny_at(&mut self, step: Step) -> Result<ProposedChange, ReviewError> {
        let position = self.position(step.at)?;
        // blacklist first, so a crash cannot lose the denial
        self.store.append_blacklist(&self.changes[position])?;
        self.remove(step, ReviewState::Denied)
    }

    pub fn deny_one(&mut self, index: usize) -> Result<ProposedChange, ReviewError> {
        self.reload_if_empty()?;
        self.deny_at(Step::same(index))
    }

    pub fn deny_range(&mut self, start: Endpoint, end: Endpoint) -> Result<Vec<ProposedChange>, ReviewError> {
        self.reload_if_empty()?;
        let plan = self.removal_plan(start, end)?;
        plan.into_iter().map(|step| self.deny_at(step)).collect()
    }

    pub fn deny_all(&mut self) -> Result<Vec<ProposedChange>, ReviewError> {
        self.reload_if_empty()?;
        let plan = self.drain_plan();
        plan.into_iter().map(|step| self.deny_at(step)).collect()
    }

    pub fn deny(&mut self, selection: Selection) -> Result<Vec<ProposedChange>, ReviewError> {
        match selection {
            Selection::One(index) => Ok(vec![self.deny_one(index)?]),
            Selection::Range(start, end) => self.deny_range(start, end),
            Selection::All => self.deny_all(),
        }
    }

    // ------------------------------------------------------------------------
    // postpone
    // ------------------------------------------------------------------------

    fn postpone_at(&mut self, step: Step) -> Result<ProposedChange, ReviewError> {
        self.remove(step, ReviewState::Postponed)
    }

    pub fn postpone_one(&mut self, index: usize) -> Result<ProposedChange, ReviewError> {
        self.reload_if_empty()?;
        self.postpone_at(Step::same(index))
    }

    pub fn postpone_range(
        &mut self,
        start: Endpoint,
        end: Endpoint,
    ) -> Result<Vec<ProposedChange>, ReviewError> {
        self.reload_if_empty()?;
        let plan = self.removal_plan(start, end)?;
        plan.into_iter().map(|step| self.postpone_at(step)).collect()
    }

    pub fn postpone_all(&mut self) -> Result<Vec<ProposedChange>, ReviewError> {
        self.reload_if_empty()?;
        let plan = self.drain_plan();
        plan.into_iter().map(|step| self.postpone_at(step)).collect()
    }

    pub fn postpone(&mut self, selection: Selection) -> Result<Vec<ProposedChange>, ReviewError> {
        match selection {
            Selection::One(index) => Ok(vec![self.postpone_one(index)?]),
            Selection::Range(start, end) => self.postpone_range(start, end),
            Selection::All => self.postpone_all(),
        }
    }

    // ------------------------------------------------------------------------
    // read-only views
    // ------------------------------------------------------------------------

    /// Entries with their 1-based index, in the order requested.
    pub fn show(&mut self, selection: Selection) -> Result<Vec<(usize, ProposedChange)>, ReviewError> {
        self.reload_if_empty()?;
        let indices: Vec<usize> = match selection {
            Selection::One(index) => {
                self.position(index)?;
                vec![index]
            }
            Selection::Range(start, end) => {
                let (s, e) = self.resolve_range(start, end)?;
                if s <= e {
                    (s..=e).collect()
                } else {
                    (e..=s).rev().collect()
                }
            }
            Selection::All => (1..=self.changes.len()).collect(),
        };
        Ok(indices
            .into_iter()
            .map(|index| (index, self.changes[index - 1].clone()))
            .collect())
    }

    /// The `count` most recently detected changes, each keeping its display index.
    pub fn latest(&mut self, count: usize) -> Result<Vec<ProposedChange>, ReviewError> {
        self.reload_if_empty()?;
        let len = self.changes.len();
        if count == 0 || count > len {
            return Err(ReviewError::OutOfRange { index: count, len });
        }
        Ok(latest_first(&self.changes).into_iter().take(count).collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::ordering::primary_order;
    use crate::testing::{sample_change, RecordingCommitter};
    use chrono::Duration;

    /// Store holding five pending changes for stars a..e (indices 1..5).
    fn seeded_store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut changes: Vec<ProposedChange> = ["a", "b", "c", "d", "e"]
            .iter()
            .enumerate()
            .map(|(i, star)| sample_change(star, i as f64 + 1.0))
            .collect();
        primary_order(&mut changes);
        store.write(&changes).unwrap();
        store
    }

    fn stars(changes: &[ProposedChange]) -> Vec<String> {
        changes.iter().map(|c| c.star.clone()).collect()
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!("3".parse::<Selection>().unwrap(), Selection::One(3));
        assert_eq!("ALL".parse::<Selection>().unwrap(), Selection::All);
        assert_eq!(
            "5-2".parse::<Selection>().unwrap(),
            Selection::Range(Endpoint::At(5), Endpoint::At(2))
        );
        assert_eq!(
            "first-last".parse::<Selection>().unwrap(),
            Selection::Range(Endpoint::First, Endpoint::Last)
        );
        assert_eq!(
            "s-4".parse::<Selection>().unwrap(),
            Selection::Range(Endpoint::First, Endpoint::At(4))
        );
        assert!("two".parse::<Selection>().is_err());
        assert!("1-x".parse::<Selection>().is_err());
        assert!("-".parse::<Selection>().is_err());
        assert!("1-2-3".parse::<Selection>().is_err());
    }

    #[test]
    fn test_review_state_names() {
        let names: Vec<&str> = [ReviewState::Accepted, ReviewState::Denied, ReviewState::Postponed]
            .iter()
            .map(ReviewState::as_str)
            .collect();
        assert_eq!(names, vec!["accepted", "denied", "postponed"]);
    }

    #[test]
    fn test_deny_one_blacklists_and_shrinks_queue() {
        let mut store = seeded_store();
        let third = store.read().unwrap()[2].clone();

        let denied = {
            let mut session = ReviewSession::open(&mut store).unwrap();
            let denied = session.deny_one(3).unwrap();
            assert_eq!(session.len(), 4);
            denied
        };

        assert_eq!(denied, third);
        assert_eq!(store.read().unwrap().len(), 4);
        assert_eq!(store.blacklist().unwrap(), vec![third]);
        // indices follow positions after removal
        let indices: Vec<Option<usize>> = store.read().unwrap().iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_out_of_range_leaves_state_unchanged() {
        let mut store = seeded_store();
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            assert!(matches!(
                session.deny_one(6),
                Err(ReviewError::OutOfRange { index: 6, len: 5 })
            ));
            assert!(matches!(
                session.postpone_one(0),
                Err(ReviewError::OutOfRange { index: 0, len: 5 })
            ));
            let mut committer = RecordingCommitter::default();
            assert!(session
                .accept_one(9, &mut committer, CommitMode::Batched)
                .is_err());
            // no batch was opened for an invalid index
            assert!(committer.calls.is_empty());
        }
        assert_eq!(store.read().unwrap().len(), 5);
        assert!(store.blacklist().unwrap().is_empty());
    }

    #[test]
    fn test_accept_reversed_range() {
        let mut store = seeded_store();
        let mut committer = RecordingCommitter::default();
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            let accepted = session
                .accept_range(Endpoint::At(4), Endpoint::At(2), &mut committer, CommitMode::Single)
                .unwrap();
            assert_eq!(stars(&accepted), vec!["d", "c", "b"]);
        }

        let applied: Vec<(String, usize)> = committer
            .applied
            .iter()
            .map(|(c, i, _)| (c.star.clone(), *i))
            .collect();
        assert_eq!(
            applied,
            vec![("d".to_string(), 4), ("c".to_string(), 3), ("b".to_string(), 2)]
        );
        assert_eq!(stars(&store.read().unwrap()), vec!["a", "e"]);
    }

    #[test]
    fn test_forward_range_covers_same_entries() {
        let mut store = seeded_store();
        let mut committer = RecordingCommitter::default();
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            let accepted = session
                .accept_range(Endpoint::At(2), Endpoint::At(4), &mut committer, CommitMode::Single)
                .unwrap();
            assert_eq!(stars(&accepted), vec!["b", "c", "d"]);
        }
        // the committer sees the index each entry had when the range was given
        assert_eq!(committer.calls, vec!["apply 2 b", "apply 3 c", "apply 4 d"]);
        assert_eq!(stars(&store.read().unwrap()), vec!["a", "e"]);
    }

    #[test]
    fn test_invalid_range_is_rejected_whole() {
        let mut store = seeded_store();
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            assert!(matches!(
                session.deny_range(Endpoint::At(2), Endpoint::At(9)),
                Err(ReviewError::InvalidRange { len: 5, .. })
            ));
            assert!(matches!(
                session.postpone_range(Endpoint::At(0), Endpoint::Last),
                Err(ReviewError::InvalidRange { .. })
            ));
        }
        assert_eq!(store.read().unwrap().len(), 5);
        assert!(store.blacklist().unwrap().is_empty());
    }

    #[test]
    fn test_postpone_symbolic_range_never_blacklists() {
        let mut store = seeded_store();
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            let postponed = session.postpone_range(Endpoint::Last, Endpoint::First).unwrap();
            assert_eq!(stars(&postponed), vec!["e", "d", "c", "b", "a"]);
            assert!(session.is_empty());
        }
        assert!(store.read().unwrap().is_empty());
        assert!(store.blacklist().unwrap().is_empty());
    }

    #[test]
    fn test_deny_is_monotonic() {
        let mut store = seeded_store();
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            session.deny_one(1).unwrap();
        }
        assert_eq!(store.blacklist().unwrap().len(), 1);
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            session.postpone_one(1).unwrap();
            let denied = session.deny(Selection::All).unwrap();
            assert_eq!(stars(&denied), vec!["c", "d", "e"]);
        }
        assert_eq!(stars(&store.blacklist().unwrap()), vec!["a", "c", "d", "e"]);
        assert!(store.read().unwrap().is_empty());
    }

    #[test]
    fn test_accept_all_batched_brackets_every_apply() {
        let mut store = seeded_store();
        let mut committer = RecordingCommitter::default();
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            let accepted = session.accept_all(&mut committer, CommitMode::Batched).unwrap();
            assert_eq!(accepted.len(), 5);
        }
        assert_eq!(
            committer.calls,
            vec!["begin", "apply 1 a", "apply 2 b", "apply 3 c", "apply 4 d", "apply 5 e", "end"]
        );
        assert!(committer
            .applied
            .iter()
            .all(|(_, _, mode)| *mode == CommitMode::Batched));
        assert!(store.read().unwrap().is_empty());
    }

    #[test]
    fn test_batch_closes_when_apply_fails() {
        let mut store = seeded_store();
        let mut committer = RecordingCommitter {
            fail_on: Some("c".to_string()),
            ..Default::default()
        };
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            let err = session
                .accept_all(&mut committer, CommitMode::Batched)
                .unwrap_err();
            assert!(matches!(err, ReviewError::Commit { index: 3, .. }));
        }
        assert_eq!(committer.calls.first().map(String::as_str), Some("begin"));
        assert_eq!(committer.calls.last().map(String::as_str), Some("end"));
        // a and b went through; the failed change stays pending
        assert_eq!(stars(&store.read().unwrap()), vec!["c", "d", "e"]);
    }

    #[test]
    fn test_single_accept_does_not_open_batch() {
        let mut store = seeded_store();
        let mut committer = RecordingCommitter::default();
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            let accepted = session.accept_one(2, &mut committer, CommitMode::Single).unwrap();
            assert_eq!(accepted.star, "b");
        }
        assert_eq!(committer.calls, vec!["apply 2 b"]);
    }

    #[test]
    fn test_lazy_session_reloads_before_indexing() {
        let mut store = seeded_store();
        let mut session = ReviewSession::new(&mut store);
        assert!(session.is_empty());
        assert_eq!(session.deny_one(3).unwrap().star, "c");
        assert_eq!(session.len(), 4);
    }

    #[test]
    fn test_show_is_read_only() {
        let mut store = seeded_store();
        {
            let mut session = ReviewSession::open(&mut store).unwrap();
            let shown = session
                .show(Selection::Range(Endpoint::At(4), Endpoint::At(2)))
                .unwrap();
            let summary: Vec<(usize, String)> =
                shown.into_iter().map(|(i, c)| (i, c.star)).collect();
            assert_eq!(
                summary,
                vec![(4, "d".to_string()), (3, "c".to_string()), (2, "b".to_string())]
            );
            assert_eq!(session.show(Selection::All).unwrap().len(), 5);
            assert!(session.show(Selection::One(6)).is_err());
        }
        assert_eq!(store.read().unwrap().len(), 5);
    }

    #[test]
    fn test_latest_keeps_display_index() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut changes: Vec<ProposedChange> = ["a", "b", "c"]
            .iter()
            .map(|star| sample_change(star, 1.0))
            .collect();
        changes[1].timestamp = changes[1].timestamp + Duration::hours(2);
        changes[2].timestamp = changes[2].timestamp + Duration::hours(1);
        primary_order(&mut changes);
        store.write(&changes).unwrap();

        let mut session = ReviewSession::open(&mut store).unwrap();
        let latest = session.latest(2).unwrap();
        let summary: Vec<(String, Option<usize>)> = latest
            .iter()
            .map(|c| (c.star.clone(), c.display_index()))
            .collect();
        assert_eq!(
            summary,
            vec![("b".to_string(), Some(2)), ("c".to_string(), Some(3))]
        );
        assert!(session.latest(0).is_err());
        assert!(session.latest(4).is_err());
    }
}
