// 🗄️ Persistent Queue - SQLite (WAL) store for pending changes, blacklist and config
//
// The store is the only state that survives between command invocations.
// Concurrent invocations against the same database file are not supported.

use crate::change::{ProposedChange, SourceTag};
use crate::config::{ConfigKey, ConfigValue, LastUpdate};
use crate::record::{Field, Value};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

// ============================================================================
// STORE CONTRACT
// ============================================================================

pub trait ChangeStore {
    /// Full ordered queue (empty if nothing was ever written)
    fn read(&self) -> Result<Vec<ProposedChange>>;

    /// Atomically replace the queue
    fn write(&mut self, changes: &[ProposedChange]) -> Result<()>;

    fn config_get(&self, key: ConfigKey) -> Result<ConfigValue>;

    fn config_set(&mut self, key: ConfigKey, value: ConfigValue) -> Result<()>;

    /// Drop every persisted entry (queue, blacklist, config)
    fn reset(&mut self) -> Result<()>;

    /// Add one change to the blacklist. Already-blacklisted changes are skipped.
    fn append_blacklist(&mut self, change: &ProposedChange) -> Result<()> {
        let mut blacklist = self.blacklist()?;
        if !blacklist.contains(change) {
            blacklist.push(change.clone());
        }
        self.config_set(ConfigKey::Blacklist, ConfigValue::Blacklist(blacklist))
    }

    fn last_update(&self) -> Result<LastUpdate> {
        self.config_get(ConfigKey::LastUpdate)?.into_last_update()
    }

    fn repository(&self) -> Result<String> {
        self.config_get(ConfigKey::Repository)?.into_repository()
    }

    fn blacklist(&self) -> Result<Vec<ProposedChange>> {
        self.config_get(ConfigKey::Blacklist)?.into_blacklist()
    }

    fn auto_update_pid(&self) -> Result<Option<u32>> {
        self.config_get(ConfigKey::AutoUpdatePid)?.into_pid()
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

/// Raw column values of a change row, converted outside the row closure
/// so conversion errors keep their context.
struct ChangeRow {
    star: String,
    planet: Option<String>,
    field: String,
    catalog_value: String,
    source_value: String,
    source: String,
    detected_at: String,
    display_index: Option<i64>,
}

impl ChangeRow {
    fn into_change(self) -> Result<ProposedChange> {
        let field = Field::from_name(&self.field)
            .ok_or_else(|| anyhow!("unknown field '{}' in store", self.field))?;
        let source = SourceTag::from_code(&self.source)
            .ok_or_else(|| anyhow!("unknown source '{}' in store", self.source))?;
        let catalog_value: Value = serde_json::from_str(&self.catalog_value)
            .context("Failed to decode catalog value")?;
        let source_value: Value = serde_json::from_str(&self.source_value)
            .context("Failed to decode source value")?;
        let timestamp = DateTime::parse_from_rfc3339(&self.detected_at)
            .with_context(|| format!("invalid detection time '{}'", self.detected_at))?
            .with_timezone(&Utc);

        Ok(ProposedChange {
            star: self.star,
            planet: self.planet,
            field,
            catalog_value,
            source_value,
            source,
            timestamp,
            index: self.display_index.map(|i| i as usize),
        })
    }
}

fn row_to_change_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChangeRow> {
    Ok(ChangeRow {
        star: row.get(0)?,
        planet: row.get(1)?,
        field: row.get(2)?,
        catalog_value: row.get(3)?,
        source_value: row.get(4)?,
        source: row.get(5)?,
        detected_at: row.get(6)?,
        display_index: row.get(7)?,
    })
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open store {}", path.display()))?;
        // WAL for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    fn setting(&self, key: ConfigKey) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_setting(&self, key: ConfigKey, value: Option<String>) -> Result<()> {
        match value {
            Some(value) => self.conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key.as_str(), value],
            )?,
            None => self
                .conn
                .execute("DELETE FROM settings WHERE key = ?1", [key.as_str()])?,
        };
        Ok(())
    }

    fn read_blacklist(&self) -> Result<Vec<ProposedChange>> {
        let mut stmt = self.conn.prepare(
            "SELECT star, planet, field, catalog_value, source_value, source, detected_at, NULL
             FROM blacklist
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], row_to_change_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ChangeRow::into_change).collect()
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS changes (
            position INTEGER PRIMARY KEY,
            fingerprint TEXT NOT NULL,
            star TEXT NOT NULL,
            planet TEXT,
            field TEXT NOT NULL,
            catalog_value TEXT NOT NULL,
            source_value TEXT NOT NULL,
            source TEXT NOT NULL,
            detected_at TEXT NOT NULL,
            display_index INTEGER
        )",
        [],
    )?;

    // denied changes, kept forever (until clear-blacklist / full reset)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS blacklist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fingerprint TEXT UNIQUE NOT NULL,
            star TEXT NOT NULL,
            planet TEXT,
            field TEXT NOT NULL,
            catalog_value TEXT NOT NULL,
            source_value TEXT NOT NULL,
            source TEXT NOT NULL,
            detected_at TEXT NOT NULL,
            denied_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_changes_star ON changes(star)",
        [],
    )?;

    Ok(())
}

/// Insert into the blacklist; returns false when the change was already there.
fn insert_blacklisted(conn: &Connection, change: &ProposedChange) -> Result<bool> {
    let result = conn.execute(
        "INSERT INTO blacklist (
            fingerprint, star, planet, field, catalog_value, source_value, source, detected_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            change.fingerprint(),
            change.star,
            change.planet,
            change.field.name(),
            serde_json::to_string(&change.catalog_value)?,
            serde_json::to_string(&change.source_value)?,
            change.source.code(),
            change.timestamp.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

impl ChangeStore for SqliteStore {
    fn read(&self) -> Result<Vec<ProposedChange>> {
        let mut stmt = self.conn.prepare(
            "SELECT star, planet, field, catalog_value, source_value, source, detected_at, display_index
             FROM changes
             ORDER BY position",
        )?;
        let rows = stmt
            .query_map([], row_to_change_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ChangeRow::into_change).collect()
    }

    fn write(&mut self, changes: &[ProposedChange]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM changes", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO changes (
                    position, fingerprint, star, planet, field, catalog_value,
                    source_value, source, detected_at, display_index
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (position, change) in changes.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    change.fingerprint(),
                    change.star,
                    change.planet,
                    change.field.name(),
                    serde_json::to_string(&change.catalog_value)?,
                    serde_json::to_string(&change.source_value)?,
                    change.source.code(),
                    change.timestamp.to_rfc3339(),
                    change.index.map(|i| i as i64),
                ])?;
            }
        }
        tx.commit().context("Failed to commit queue")?;
        Ok(())
    }

    fn config_get(&self, key: ConfigKey) -> Result<ConfigValue> {
        let value = match key {
            ConfigKey::Blacklist => ConfigValue::Blacklist(self.read_blacklist()?),
            ConfigKey::LastUpdate => match self.setting(key)? {
                Some(text) => ConfigValue::LastUpdate(text.parse()?),
                None => ConfigValue::default_for(key),
            },
            ConfigKey::Repository => match self.setting(key)? {
                Some(text) => ConfigValue::Repository(text),
                None => ConfigValue::default_for(key),
            },
            ConfigKey::AutoUpdatePid => match self.setting(key)? {
                Some(text) => ConfigValue::AutoUpdatePid(Some(
                    text.parse()
                        .with_context(|| format!("invalid auto-update pid '{}'", text))?,
                )),
                None => ConfigValue::default_for(key),
            },
        };
        Ok(value)
    }

    fn config_set(&mut self, key: ConfigKey, value: ConfigValue) -> Result<()> {
        value.ensure_key(key)?;
        match value {
            ConfigValue::Blacklist(changes) => {
                let tx = self.conn.transaction()?;
                tx.execute("DELETE FROM blacklist", [])?;
                let mut skipped = 0;
                for change in &changes {
                    if !insert_blacklisted(&tx, change)? {
                        skipped += 1;
                    }
                }
                tx.commit().context("Failed to commit blacklist")?;
                if skipped > 0 {
                    tracing::debug!("skipped {} duplicate blacklist entries", skipped);
                }
            }
            ConfigValue::LastUpdate(at) => self.put_setting(key, Some(at.to_string()))?,
            ConfigValue::Repository(repo) => self.put_setting(key, Some(repo))?,
            ConfigValue::AutoUpdatePid(pid) => {
                self.put_setting(key, pid.map(|p| p.to_string()))?
            }
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM changes", [])?;
        tx.execute("DELETE FROM blacklist", [])?;
        tx.execute("DELETE FROM settings", [])?;
        tx.commit().context("Failed to reset store")?;
        Ok(())
    }

    fn append_blacklist(&mut self, change: &ProposedChange) -> Result<()> {
        insert_blacklisted(&self.conn, change)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_REPOSITORY;
    use crate::ordering::primary_order;
    use chrono::{NaiveDate, TimeZone};

    fn create_test_change(star: &str, field: Field, value: Value) -> ProposedChange {
        ProposedChange::new(
            star,
            None,
            field,
            Value::Unknown,
            value,
            SourceTag::Eu,
            Utc.with_ymd_and_hms(2026, 10, 3, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteStore::open_in_memory().unwrap();

        assert!(store.read().unwrap().is_empty());
        assert!(store.blacklist().unwrap().is_empty());
        assert_eq!(store.last_update().unwrap(), LastUpdate::Never);
        assert_eq!(store.repository().unwrap(), DEFAULT_REPOSITORY);
        assert_eq!(store.auto_update_pid().unwrap(), None);
    }

    #[test]
    fn test_write_replaces_queue() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        let mut first = vec![
            create_test_change("b", Field::Mass, Value::Number(1.0)),
            create_test_change("a", Field::SpectralType, Value::Text("G2V".into())),
        ];
        primary_order(&mut first);
        store.write(&first).unwrap();

        let read = store.read().unwrap();
        assert_eq!(read, first);
        assert_eq!(read[0].index, Some(0));
        assert_eq!(read[1].index, Some(1));
        assert_eq!(read[0].timestamp, first[0].timestamp);

        let second = vec![create_test_change("c", Field::Age, Value::Number(4.5))];
        store.write(&second).unwrap();
        assert_eq!(store.read().unwrap(), second);

        store.write(&[]).unwrap();
        assert!(store.read().unwrap().is_empty());
    }

    #[test]
    fn test_config_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();

        store
            .config_set(ConfigKey::LastUpdate, ConfigValue::LastUpdate(LastUpdate::At(at)))
            .unwrap();
        store
            .config_set(ConfigKey::Repository, ConfigValue::Repository("me/oec".into()))
            .unwrap();
        store
            .config_set(ConfigKey::AutoUpdatePid, ConfigValue::AutoUpdatePid(Some(4242)))
            .unwrap();

        assert_eq!(store.last_update().unwrap(), LastUpdate::At(at));
        assert_eq!(store.repository().unwrap(), "me/oec");
        assert_eq!(store.auto_update_pid().unwrap(), Some(4242));

        store
            .config_set(ConfigKey::AutoUpdatePid, ConfigValue::AutoUpdatePid(None))
            .unwrap();
        assert_eq!(store.auto_update_pid().unwrap(), None);

        // value stored under the wrong key
        assert!(store
            .config_set(ConfigKey::Repository, ConfigValue::AutoUpdatePid(None))
            .is_err());
    }

    #[test]
    fn test_blacklist_keeps_order_and_skips_duplicates() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = create_test_change("a", Field::Mass, Value::Number(1.0));
        let b = create_test_change("b", Field::Mass, Value::Number(2.0));

        store.append_blacklist(&b).unwrap();
        store.append_blacklist(&a).unwrap();
        store.append_blacklist(&b).unwrap();

        assert_eq!(store.blacklist().unwrap(), vec![b.clone(), a.clone()]);

        store
            .config_set(ConfigKey::Blacklist, ConfigValue::Blacklist(vec![a.clone(), a.clone()]))
            .unwrap();
        assert_eq!(store.blacklist().unwrap(), vec![a]);

        store
            .config_set(ConfigKey::Blacklist, ConfigValue::Blacklist(Vec::new()))
            .unwrap();
        assert!(store.blacklist().unwrap().is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let change = create_test_change("a", Field::Mass, Value::Number(1.0));
        store.write(&[change.clone()]).unwrap();
        store.append_blacklist(&change).unwrap();
        store
            .config_set(ConfigKey::Repository, ConfigValue::Repository("x".into()))
            .unwrap();

        store.reset().unwrap();

        assert!(store.read().unwrap().is_empty());
        assert!(store.blacklist().unwrap().is_empty());
        assert_eq!(store.repository().unwrap(), DEFAULT_REPOSITORY);
    }

    #[test]
    fn test_full_precision_values_survive_storage() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let changes: Vec<ProposedChange> = [989.8597941207809, 0.1 + 0.2, 1.0 / 3.0, 6.02214076e23]
            .iter()
            .map(|n| create_test_change("HD 209458", Field::Mass, Value::Number(*n)))
            .collect();

        store.write(&changes).unwrap();
        for change in &changes {
            store.append_blacklist(change).unwrap();
        }

        let read = store.read().unwrap();
        let blacklist = store.blacklist().unwrap();
        for (i, change) in changes.iter().enumerate() {
            assert_eq!(
                read[i].source_value.as_number().map(f64::to_bits),
                change.source_value.as_number().map(f64::to_bits)
            );
            assert_eq!(blacklist[i], *change);
        }
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("queue.db");
        let change = create_test_change("Kepler-10", Field::Radius, Value::Number(1.47));

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.write(&[change.clone()]).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.read().unwrap(), vec![change]);
    }
}
