// 📡 Catalog sources - the authoritative XML catalog and the tabular feeds
//
// Every source loads into the same CatalogSnapshot so the comparator never
// needs to know where a record came from.

pub mod catalog_xml;
pub mod feed_csv;

pub use catalog_xml::{parse_catalog_str, XmlCatalog};
pub use feed_csv::{parse_feed, CsvFeed};

use crate::change::SourceTag;
use crate::record::{EntityKind, Record};
use anyhow::Result;
use std::sync::Arc;

// ============================================================================
// SNAPSHOT
// ============================================================================

/// All records one source provided, grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// Filled from the catalog only; stars link to these by name
    pub systems: Vec<Arc<Record>>,
    pub stars: Vec<Arc<Record>>,
    pub planets: Vec<Arc<Record>>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Arc<Record>) {
        match record.kind() {
            EntityKind::System => self.systems.push(record),
            EntityKind::Star => self.stars.push(record),
            EntityKind::Planet => self.planets.push(record),
        }
    }

    pub fn len(&self) -> usize {
        self.systems.len() + self.stars.len() + self.planets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Star by primary or alternate name.
    pub fn find_star(&self, name: &str) -> Option<&Arc<Record>> {
        self.stars
            .iter()
            .find(|star| star.name() == name)
            .or_else(|| self.stars.iter().find(|star| star.answers_to(name)))
    }

    pub fn planets_of<'a>(&'a self, star: &'a str) -> impl Iterator<Item = &'a Arc<Record>> + 'a {
        self.planets
            .iter()
            .filter(move |planet| planet.host_name() == Some(star))
    }

    /// Planet of `star` answering to `name`.
    pub fn find_planet(&self, star: &str, name: &str) -> Option<&Arc<Record>> {
        self.planets
            .iter()
            .find(|planet| planet.host_name() == Some(star) && planet.answers_to(name))
    }
}

// ============================================================================
// SOURCE CONTRACT
// ============================================================================

/// Result of fetching one source during an update cycle.
#[derive(Debug, Clone)]
pub enum FeedOutcome {
    Loaded(CatalogSnapshot),
    Failed { reason: String },
}

pub trait CatalogSource {
    /// Human-readable origin, for logs and reports
    fn describe(&self) -> String;

    fn load(&self) -> Result<CatalogSnapshot>;

    /// `load`, with failure captured as a value.
    fn outcome(&self) -> FeedOutcome {
        match self.load() {
            Ok(snapshot) => FeedOutcome::Loaded(snapshot),
            Err(err) => FeedOutcome::Failed {
                reason: format!("{:#}", err),
            },
        }
    }
}

/// A non-authoritative source whose changes are tagged with its origin.
pub trait FeedSource: CatalogSource {
    fn tag(&self) -> SourceTag;
}

impl CatalogSource for CatalogSnapshot {
    fn describe(&self) -> String {
        format!("in-memory snapshot ({} records)", self.len())
    }

    fn load(&self) -> Result<CatalogSnapshot> {
        Ok(self.clone())
    }
}
