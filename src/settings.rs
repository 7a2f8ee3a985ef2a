// ⚙️ Settings - file locations and comparator tolerance, read from TOML
//
//   database = "storage/reconcile.db"
//   catalog  = "storage/systems.xml"
//   journal  = "storage/accepted.jsonl"
//
//   [feeds]
//   eu   = "storage/exoplanetEU_csv"
//   nasa = "storage/nasa_csv"
//
//   [tolerance]
//   relative = 1e-3
//   absolute = 1e-9
//
// Every key is optional. Scalar review state (last update, repository,
// blacklist) lives in the store, not here.

use crate::change::SourceTag;
use crate::comparator::Tolerance;
use crate::sources::CsvFeed;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SETTINGS_FILE: &str = "oec-reconcile.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: PathBuf,
    pub catalog: PathBuf,
    pub journal: PathBuf,
    pub feeds: FeedPaths,
    pub tolerance: Tolerance,
}

/// A missing `[feeds]` table means both default feeds; inside the table,
/// an absent key disables that feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPaths {
    pub eu: Option<PathBuf>,
    pub nasa: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database: PathBuf::from("storage/reconcile.db"),
            catalog: PathBuf::from("storage/systems.xml"),
            journal: PathBuf::from("storage/accepted.jsonl"),
            feeds: FeedPaths::default(),
            tolerance: Tolerance::default(),
        }
    }
}

impl Default for FeedPaths {
    fn default() -> Self {
        FeedPaths {
            eu: Some(PathBuf::from("storage/exoplanetEU_csv")),
            nasa: Some(PathBuf::from("storage/nasa_csv")),
        }
    }
}

impl Settings {
    /// Read settings from `path`; a missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no settings at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid settings {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Feeds that have a configured location.
    pub fn feeds(&self) -> Vec<CsvFeed> {
        SourceTag::ALL
            .iter()
            .filter_map(|tag| {
                let path = match tag {
                    SourceTag::Eu => self.feeds.eu.as_ref(),
                    SourceTag::Nasa => self.feeds.nasa.as_ref(),
                }?;
                Some(CsvFeed::new(*tag, path.clone()))
            })
            .collect()
    }
}
