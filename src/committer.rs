// 📤 Catalog Committer - where accepted changes go
//
// The committer writes an accepted change into the authoritative catalog
// and records it under version control. Batched mode brackets a run of
// applies between begin_batch/end_batch; BatchScope guarantees end_batch
// runs on every exit path.

use crate::change::{ProposedChange, TIMESTAMP_FORMAT};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitMode {
    /// Every apply is committed on its own
    Single,
    /// Applies are grouped into one commit between begin/end
    Batched,
}

pub trait CatalogCommitter {
    /// Write the candidate value of `change` into the catalog.
    /// `index` is the 1-based display index the entry had when the
    /// reviewer selected it.
    fn apply(&mut self, change: &ProposedChange, index: usize, mode: CommitMode) -> Result<()>;

    fn begin_batch(&mut self) -> Result<()>;

    fn end_batch(&mut self) -> Result<()>;
}

// ============================================================================
// BATCH SCOPE
// ============================================================================

/// An open batch. Dropping it without `finish` still closes the batch.
pub struct BatchScope<'c> {
    committer: &'c mut dyn CatalogCommitter,
    open: bool,
}

impl<'c> BatchScope<'c> {
    pub fn open(committer: &'c mut dyn CatalogCommitter) -> Result<Self> {
        committer.begin_batch()?;
        Ok(BatchScope {
            committer,
            open: true,
        })
    }

    pub fn apply(&mut self, change: &ProposedChange, index: usize) -> Result<()> {
        self.committer.apply(change, index, CommitMode::Batched)
    }

    /// Close the batch, reporting any failure to do so.
    pub fn finish(mut self) -> Result<()> {
        self.open = false;
        self.committer.end_batch()
    }
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            if let Err(err) = self.committer.end_batch() {
                tracing::warn!("failed to close commit batch: {:#}", err);
            }
        }
    }
}

// ============================================================================
// JOURNAL COMMITTER
// ============================================================================

/// Appends accepted changes as JSON lines to a journal file, one line per
/// event, tagged with the target repository. Batches share a batch id.
pub struct JournalCommitter {
    path: PathBuf,
    repository: String,
    batch: Option<OpenBatch>,
}

struct OpenBatch {
    id: Uuid,
    applied: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JournalEntry {
    pub event: JournalEvent,
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<ProposedChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<usize>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEvent {
    Accepted,
    BatchBegin,
    BatchEnd,
}

impl JournalCommitter {
    pub fn new(path: impl Into<PathBuf>, repository: impl Into<String>) -> Self {
        JournalCommitter {
            path: path.into(),
            repository: repository.into(),
            batch: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entry(&self, event: JournalEvent) -> JournalEntry {
        JournalEntry {
            event,
            repository: self.repository.clone(),
            batch: self.batch.as_ref().map(|b| b.id),
            index: None,
            change: None,
            applied: None,
            recorded_at: Utc::now(),
        }
    }

    fn append(&self, entry: &JournalEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open journal {}", self.path.display()))?;
        writeln!(file, "{}", serde_json::to_string(entry)?)
            .with_context(|| format!("Failed to write journal {}", self.path.display()))?;
        Ok(())
    }

    /// Read every journal entry back (oldest first).
    pub fn entries(path: &Path) -> Result<Vec<JournalEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read journal {}", path.display()))?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Failed to decode journal entry"))
            .collect()
    }
}

impl CatalogCommitter for JournalCommitter {
    fn apply(&mut self, change: &ProposedChange, index: usize, mode: CommitMode) -> Result<()> {
        if mode == CommitMode::Batched && self.batch.is_none() {
            bail!("batched apply of change {} outside of a batch", index);
        }

        let mut entry = self.entry(JournalEvent::Accepted);
        entry.index = Some(index);
        entry.change = Some(change.clone());
        self.append(&entry)?;

        if let Some(batch) = self.batch.as_mut() {
            batch.applied += 1;
        }
        tracing::info!(
            "accepted #{} {} into {} at {}",
            index,
            change,
            self.repository,
            entry.recorded_at.format(TIMESTAMP_FORMAT)
        );
        Ok(())
    }

    fn begin_batch(&mut self) -> Result<()> {
        if self.batch.is_some() {
            bail!("a commit batch is already open");
        }
        self.batch = Some(OpenBatch {
            id: Uuid::new_v4(),
            applied: 0,
        });
        let entry = self.entry(JournalEvent::BatchBegin);
        self.append(&entry)
    }

    fn end_batch(&mut self) -> Result<()> {
        let Some(batch) = self.batch.as_ref() else {
            bail!("no commit batch is open");
        };
        let mut entry = self.entry(JournalEvent::BatchEnd);
        entry.applied = Some(batch.applied);
        self.batch = None;
        self.append(&entry)
    }
}

// ============================================================================
// TESTS
// ============================================================================
