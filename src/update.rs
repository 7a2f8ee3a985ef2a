// 🔄 Update Cycle - fetch, compare, order, persist
//
// Flow:
// 1. Load the authoritative catalog (failure aborts; queue untouched)
// 2. Load every feed; a failed feed contributes zero changes
// 3. Compare matched stars and their planets against the catalog
// 4. Merge across feeds, dropping duplicates and blacklisted changes
// 5. Primary-order the result and replace the queue in one write
// 6. Record the update time

use crate::change::{ProposedChange, SourceTag};
use crate::comparator::Comparator;
use crate::config::{ConfigKey, ConfigValue, LastUpdate};
use crate::db::ChangeStore;
use crate::ordering::ChangeSet;
use crate::sources::{CatalogSnapshot, CatalogSource, FeedOutcome, FeedSource};
use anyhow::{Context, Result};
use chrono::{DateTime, Timelike, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// Divergences found across all loaded feeds
    pub detected: usize,
    /// Length of the new queue
    pub queued: usize,
    pub duplicates_dropped: usize,
    pub blacklisted_dropped: usize,
    pub loaded_sources: Vec<SourceTag>,
    pub failed_sources: Vec<(SourceTag, String)>,
    pub finished_at: LastUpdate,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCycle {
    comparator: Comparator,
}

impl UpdateCycle {
    pub fn new() -> Self {
        UpdateCycle {
            comparator: Comparator::new(),
        }
    }

    pub fn with_comparator(comparator: Comparator) -> Self {
        UpdateCycle { comparator }
    }

    /// Every divergence between one feed snapshot and the catalog.
    ///
    /// Feed stars are matched to catalog stars by name or alternate name;
    /// their planets are matched under the matched catalog star. Entities
    /// the catalog does not know are skipped.
    pub fn compare_snapshots(
        &self,
        canonical: &CatalogSnapshot,
        candidate: &CatalogSnapshot,
        source: SourceTag,
        detected_at: DateTime<Utc>,
    ) -> Vec<ProposedChange> {
        let mut changes = Vec::new();

        for candidate_star in &candidate.stars {
            let matched = canonical.find_star(candidate_star.name()).or_else(|| {
                candidate_star
                    .other_names()
                    .iter()
                    .find_map(|alias| canonical.find_star(alias))
            });
            let Some(canonical_star) = matched else {
                tracing::debug!("{}: star '{}' not in catalog", source, candidate_star.name());
                continue;
            };

            changes.extend(self.comparator.compare_at(
                canonical_star,
                candidate_star,
                source,
                detected_at,
            ));

            for candidate_planet in candidate.planets_of(candidate_star.name()) {
                match canonical.find_planet(canonical_star.name(), candidate_planet.name()) {
                    Some(canonical_planet) => changes.extend(self.comparator.compare_at(
                        canonical_planet,
                        candidate_planet,
                        source,
                        detected_at,
                    )),
                    None => tracing::debug!(
                        "{}: planet '{}' not in catalog",
                        source,
                        candidate_planet.name()
                    ),
                }
            }
        }

        changes
    }

    /// Merge and order the changes from every loaded feed.
    pub fn reconcile(
        &self,
        canonical: &CatalogSnapshot,
        feeds: &[(SourceTag, FeedOutcome)],
        blacklist: &[ProposedChange],
        detected_at: DateTime<Utc>,
    ) -> (Vec<ProposedChange>, UpdateReport) {
        let mut set = ChangeSet::new(blacklist);
        let mut detected = 0;
        let mut loaded_sources = Vec::new();
        let mut failed_sources = Vec::new();

        for (tag, outcome) in feeds {
            match outcome {
                FeedOutcome::Loaded(snapshot) => {
                    let changes = self.compare_snapshots(canonical, snapshot, *tag, detected_at);
                    detected += changes.len();
                    set.extend(changes);
                    loaded_sources.push(*tag);
                }
                FeedOutcome::Failed { reason } => {
                    failed_sources.push((*tag, reason.clone()));
                }
            }
        }

        let report = UpdateReport {
            detected,
            queued: set.len(),
            duplicates_dropped: set.duplicates_dropped,
            blacklisted_dropped: set.blacklisted_dropped,
            loaded_sources,
            failed_sources,
            finished_at: LastUpdate::At(
                detected_at
                    .naive_utc()
                    .with_nanosecond(0)
                    .unwrap_or(detected_at.naive_utc()),
            ),
        };
        (set.into_ordered(), report)
    }

    /// One full cycle against the store.
    pub fn run<S: ChangeStore + ?Sized>(
        &self,
        store: &mut S,
        catalog: &dyn CatalogSource,
        feeds: &[&dyn FeedSource],
    ) -> Result<UpdateReport> {
        let now = Utc::now();

        let canonical = catalog
            .load()
            .with_context(|| format!("Failed to load {}; queue left untouched", catalog.describe()))?;

        let outcomes: Vec<(SourceTag, FeedOutcome)> = feeds
            .iter()
            .map(|feed| {
                let outcome = feed.outcome();
                if let FeedOutcome::Failed { reason } = &outcome {
                    tracing::warn!("{} unavailable: {}", feed.describe(), reason);
                }
                (feed.tag(), outcome)
            })
            .collect();

        let blacklist = store.blacklist()?;
        let (changes, report) = self.reconcile(&canonical, &outcomes, &blacklist, now);

        store.write(&changes).context("Failed to persist change queue")?;
        store.config_set(
            ConfigKey::LastUpdate,
            ConfigValue::LastUpdate(report.finished_at),
        )?;

        tracing::info!(
            "update: {} detected, {} queued, {} duplicate, {} blacklisted, {} source(s) failed",
            report.detected,
            report.queued,
            report.duplicates_dropped,
            report.blacklisted_dropped,
            report.failed_sources.len()
        );
        Ok(report)
    }
}

// ============================================================================
// TESTS
// ============================================================================
