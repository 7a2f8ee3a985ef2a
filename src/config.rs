// Persisted scalar configuration: last update, target repository,
// blacklist and the pid of a running auto-update process.

use crate::change::{ProposedChange, TIMESTAMP_FORMAT};
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

/// Catalog repository accepted changes are committed to unless overridden.
pub const DEFAULT_REPOSITORY: &str =
    "https://github.com/OpenExoplanetCatalogue/open_exoplanet_catalogue";

/// Text stored and shown before the first successful update.
pub const NEVER: &str = "Never";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    LastUpdate,
    Repository,
    Blacklist,
    AutoUpdatePid,
}

impl ConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::LastUpdate => "last_update",
            ConfigKey::Repository => "repo_url",
            ConfigKey::Blacklist => "black_list",
            ConfigKey::AutoUpdatePid => "auto_update_pid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LastUpdate {
    Never,
    At(NaiveDateTime),
}

impl fmt::Display for LastUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastUpdate::Never => f.write_str(NEVER),
            LastUpdate::At(at) => write!(f, "{}", at.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl FromStr for LastUpdate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == NEVER {
            return Ok(LastUpdate::Never);
        }
        let at = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
            .with_context(|| format!("invalid last update timestamp '{}'", s))?;
        Ok(LastUpdate::At(at))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    LastUpdate(LastUpdate),
    Repository(String),
    Blacklist(Vec<ProposedChange>),
    AutoUpdatePid(Option<u32>),
}

impl ConfigValue {
    pub fn key(&self) -> ConfigKey {
        match self {
            ConfigValue::LastUpdate(_) => ConfigKey::LastUpdate,
            ConfigValue::Repository(_) => ConfigKey::Repository,
            ConfigValue::Blacklist(_) => ConfigKey::Blacklist,
            ConfigValue::AutoUpdatePid(_) => ConfigKey::AutoUpdatePid,
        }
    }

    /// Value a key holds when nothing was ever stored.
    pub fn default_for(key: ConfigKey) -> ConfigValue {
        match key {
            ConfigKey::LastUpdate => ConfigValue::LastUpdate(LastUpdate::Never),
            ConfigKey::Repository => ConfigValue::Repository(DEFAULT_REPOSITORY.to_string()),
            ConfigKey::Blacklist => ConfigValue::Blacklist(Vec::new()),
            ConfigKey::AutoUpdatePid => ConfigValue::AutoUpdatePid(None),
        }
    }

    pub fn ensure_key(&self, key: ConfigKey) -> Result<()> {
        if self.key() != key {
            bail!(
                "value for '{}' cannot be stored under '{}'",
                self.key().as_str(),
                key.as_str()
            );
        }
        Ok(())
    }

    pub fn into_last_update(self) -> Result<LastUpdate> {
        match self {
            ConfigValue::LastUpdate(value) => Ok(value),
            other => bail!("expected last update, found {:?}", other.key()),
        }
    }

    pub fn into_repository(self) -> Result<String> {
        match self {
            ConfigValue::Repository(value) => Ok(value),
            other => bail!("expected repository, found {:?}", other.key()),
        }
    }

    pub fn into_blacklist(self) -> Result<Vec<ProposedChange>> {
        match self {
            ConfigValue::Blacklist(value) => Ok(value),
            other => bail!("expected blacklist, found {:?}", other.key()),
        }
    }

    pub fn into_pid(self) -> Result<Option<u32>> {
        match self {
            ConfigValue::AutoUpdatePid(value) => Ok(value),
            other => bail!("expected auto-update pid, found {:?}", other.key()),
        }
    }
}
