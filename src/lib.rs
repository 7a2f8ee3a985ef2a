// OEC Reconcile - Core Library
// Catalog reconciliation and review engine, used by the CLI and tests

pub mod record;
pub mod change;
pub mod comparator;
pub mod ordering;
pub mod config;
pub mod db;
pub mod review;
pub mod committer;
pub mod sources;
pub mod update;
pub mod schedule;
pub mod settings;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use record::{
    coerce, coerce_numeric, EntityKind, Field, FieldShape, Link, ListSeed, Record,
    RecordBuilder, RecordError, Value, UNKNOWN_TEXT,
};
pub use change::{ProposedChange, SourceTag, TIMESTAMP_FORMAT};
pub use comparator::{comparable_fields, Comparator, Tolerance};
pub use ordering::{latest_first, primary_order, reindex, ChangeSet};
pub use config::{ConfigKey, ConfigValue, LastUpdate, DEFAULT_REPOSITORY, NEVER};
pub use db::{setup_database, ChangeStore, SqliteStore};
pub use review::{
    Endpoint, ReviewError, ReviewSession, ReviewState, Selection, SelectionError,
};
pub use committer::{
    BatchScope, CatalogCommitter, CommitMode, JournalCommitter, JournalEntry, JournalEvent,
};
pub use sources::{
    CatalogSnapshot, CatalogSource, CsvFeed, FeedOutcome, FeedSource, XmlCatalog,
};
pub use update::{UpdateCycle, UpdateReport};
pub use schedule::{
    cancel_auto_update, schedule_auto_update, update_interval, AutoUpdateScheduler,
    ProcessScheduler, ScheduleError, MIN_AUTO_UPDATE_HOURS,
};
pub use settings::{Settings, DEFAULT_SETTINGS_FILE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
