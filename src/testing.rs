// Shared test doubles.

use crate::change::{ProposedChange, SourceTag};
use crate::committer::{CatalogCommitter, CommitMode};
use crate::record::{Field, Value};
use crate::schedule::AutoUpdateScheduler;
use crate::sources::{CatalogSnapshot, CatalogSource, FeedSource};
use anyhow::{bail, Result};
use chrono::{TimeZone, Utc};

pub fn sample_change(star: &str, value: f64) -> ProposedChange {
    ProposedChange::new(
        star,
        None,
        Field::Mass,
        Value::Unknown,
        Value::Number(value),
        SourceTag::Eu,
        Utc.with_ymd_and_hms(2026, 10, 4, 10, 0, 0).unwrap(),
    )
}

/// Records every call as a short string; fails applies for `fail_on` stars.
#[derive(Debug, Default)]
pub struct RecordingCommitter {
    pub calls: Vec<String>,
    pub applied: Vec<(ProposedChange, usize, CommitMode)>,
    pub fail_on: Option<String>,
}

impl CatalogCommitter for RecordingCommitter {
    fn apply(&mut self, change: &ProposedChange, index: usize, mode: CommitMode) -> Result<()> {
        self.calls.push(format!("apply {} {}", index, change.star));
        if self.fail_on.as_deref() == Some(change.star.as_str()) {
            bail!("catalog rejected {}", change.star);
        }
        self.applied.push((change.clone(), index, mode));
        Ok(())
    }

    fn begin_batch(&mut self) -> Result<()> {
        self.calls.push("begin".to_string());
        Ok(())
    }

    fn end_batch(&mut self) -> Result<()> {
        self.calls.push("end".to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingScheduler {
    pub next_pid: u32,
    pub spawned: Vec<u64>,
    pub terminated: Vec<u32>,
}

impl AutoUpdateScheduler for RecordingScheduler {
    fn spawn(&mut self, interval_hours: u64) -> Result<u32> {
        self.next_pid += 1;
        self.spawned.push(interval_hours);
        Ok(self.next_pid)
    }

    fn terminate(&mut self, pid: u32) -> Result<()> {
        self.terminated.push(pid);
        Ok(())
    }
}

/// Source that always returns the same snapshot, or always fails.
pub struct FixedSource {
    pub tag: SourceTag,
    pub snapshot: Option<CatalogSnapshot>,
}

impl FixedSource {
    pub fn loaded(tag: SourceTag, snapshot: CatalogSnapshot) -> Self {
        FixedSource {
            tag,
            snapshot: Some(snapshot),
        }
    }

    pub fn failing(tag: SourceTag) -> Self {
        FixedSource {
            tag,
            snapshot: None,
        }
    }
}

impl CatalogSource for FixedSource {
    fn describe(&self) -> String {
        format!("fixed {} source", self.tag)
    }

    fn load(&self) -> Result<CatalogSnapshot> {
        match &self.snapshot {
            Some(snapshot) => Ok(snapshot.clone()),
            None => bail!("{} is unreachable", self.tag),
        }
    }
}

impl FeedSource for FixedSource {
    fn tag(&self) -> SourceTag {
        self.tag
    }
}
