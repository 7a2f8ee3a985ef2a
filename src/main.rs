// OEC Reconcile - command line
//
// Every command opens the store, does one thing, and exits. Log output
// goes to stderr (RUST_LOG, default warn); command output to stdout.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use oec_reconcile::{
    cancel_auto_update, schedule_auto_update, update_interval, ChangeStore, CommitMode,
    Comparator, ConfigKey, ConfigValue, FeedSource, JournalCommitter, ProcessScheduler,
    ProposedChange, ReviewSession, Selection, Settings, SqliteStore, UpdateCycle, XmlCatalog,
    DEFAULT_SETTINGS_FILE,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oec-reconcile")]
#[command(about = "Review catalog discrepancies between the OEC and external feeds", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the feeds against the catalog and rebuild the review queue
    Update,

    /// Last update, queue size, repository and auto-update state
    Status,

    /// Show pending changes: N, A-B (first/last allowed), or all
    Show { selection: Selection },

    /// Show the N most recently detected changes
    ShowLatest { count: usize },

    /// Accept pending changes: N, A-B, or all
    Accept {
        selection: Selection,

        /// Group the accepted changes into one commit
        #[arg(long, default_value_t = false)]
        batched: bool,
    },

    /// Accept every pending change
    AcceptAll {
        /// Group the accepted changes into one commit
        #[arg(long, default_value_t = false)]
        batched: bool,
    },

    /// Deny pending changes; denied changes never come back
    Deny { selection: Selection },

    /// Drop pending changes until the next update finds them again
    Postpone { selection: Selection },

    /// Forget every denied change
    ClearBlacklist,

    /// Catalog repository accepted changes are committed to
    SetRepo { repository: String },

    /// Restore the default catalog repository
    ClearRepo,

    /// Run `update` in the background every N hours
    ScheduleAutoUpdate { hours: u64 },

    /// Stop the background updater
    CancelAutoUpdate,

    /// Cancel auto-update and erase the queue, blacklist and configuration
    FullReset {
        /// Acknowledge that all review state is erased
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    #[command(hide = true)]
    AutoUpdateDaemon {
        #[arg(long)]
        interval_hours: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;

    match cli.cmd {
        Commands::Update => run_update(&settings),
        Commands::Status => show_status(&settings),
        Commands::Show { selection } => show(&settings, selection),
        Commands::ShowLatest { count } => show_latest(&settings, count),
        Commands::Accept { selection, batched } => accept(&settings, selection, batched),
        Commands::AcceptAll { batched } => accept(&settings, Selection::All, batched),
        Commands::Deny { selection } => deny(&settings, selection),
        Commands::Postpone { selection } => postpone(&settings, selection),
        Commands::ClearBlacklist => {
            let mut store = open_store(&settings)?;
            let cleared = store.blacklist()?.len();
            store.config_set(ConfigKey::Blacklist, ConfigValue::Blacklist(Vec::new()))?;
            println!("✓ Blacklist cleared ({} entries)", cleared);
            Ok(())
        }
        Commands::SetRepo { repository } => {
            let mut store = open_store(&settings)?;
            store.config_set(ConfigKey::Repository, ConfigValue::Repository(repository))?;
            println!("✓ Repository: {}", store.repository()?);
            Ok(())
        }
        Commands::ClearRepo => {
            let mut store = open_store(&settings)?;
            store.config_set(
                ConfigKey::Repository,
                ConfigValue::default_for(ConfigKey::Repository),
            )?;
            println!("✓ Repository reset to {}", store.repository()?);
            Ok(())
        }
        Commands::ScheduleAutoUpdate { hours } => {
            let mut store = open_store(&settings)?;
            let mut scheduler = ProcessScheduler::new(Some(cli.config.clone()))?;
            let pid = schedule_auto_update(&mut store, &mut scheduler, hours)?;
            println!("✓ Auto-update every {}h (pid {})", hours, pid);
            Ok(())
        }
        Commands::CancelAutoUpdate => {
            let mut store = open_store(&settings)?;
            let mut scheduler = ProcessScheduler::new(Some(cli.config.clone()))?;
            match cancel_auto_update(&mut store, &mut scheduler)? {
                Some(pid) => println!("✓ Auto-update stopped (pid {})", pid),
                None => println!("No auto-update scheduled"),
            }
            Ok(())
        }
        Commands::FullReset { yes } => {
            if !yes {
                bail!("full-reset erases the queue, blacklist and configuration; re-run with --yes");
            }
            let mut store = open_store(&settings)?;
            let mut scheduler = ProcessScheduler::new(Some(cli.config.clone()))?;
            cancel_auto_update(&mut store, &mut scheduler)?;
            store.reset()?;
            println!("✓ All review state erased");
            Ok(())
        }
        Commands::AutoUpdateDaemon { interval_hours } => run_daemon(&settings, interval_hours),
    }
}

fn open_store(settings: &Settings) -> Result<SqliteStore> {
    SqliteStore::open(&settings.database)
}

fn run_update(settings: &Settings) -> Result<()> {
    let mut store = open_store(settings)?;
    let catalog = XmlCatalog::new(&settings.catalog);
    let feeds = settings.feeds();
    let feed_refs: Vec<&dyn FeedSource> = feeds.iter().map(|f| f as &dyn FeedSource).collect();
    let cycle = UpdateCycle::with_comparator(Comparator::with_tolerance(settings.tolerance));

    println!("🔄 Comparing {} feed(s) against {}", feeds.len(), settings.catalog.display());
    let report = cycle.run(&mut store, &catalog, &feed_refs)?;

    for (tag, reason) in &report.failed_sources {
        println!("⚠️  {} skipped: {}", tag, reason);
    }
    println!(
        "✓ {} change(s) detected, {} queued for review",
        report.detected, report.queued
    );
    if report.blacklisted_dropped > 0 {
        println!("✓ {} denied change(s) suppressed", report.blacklisted_dropped);
    }
    println!("✓ Last update: {}", report.finished_at);
    Ok(())
}

fn show_status(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    println!("Last update:        {}", store.last_update()?);
    println!("Pending changes:    {}", store.read()?.len());
    println!("Denied changes:     {}", store.blacklist()?.len());
    println!("Repository:         {}", store.repository()?);
    match store.auto_update_pid()? {
        Some(pid) => println!("Auto-update:        running (pid {})", pid),
        None => println!("Auto-update:        off"),
    }
    Ok(())
}

fn print_change(index: usize, change: &ProposedChange) {
    println!("\n#{}", index);
    println!("{}", change.describe());
}

fn show(settings: &Settings, selection: Selection) -> Result<()> {
    let mut store = open_store(settings)?;
    let last_update = store.last_update()?;
    let mut session = ReviewSession::open(&mut store)?;
    if session.is_empty() {
        println!("No pending changes");
        return Ok(());
    }

    let shown = session.show(selection)?;
    for (index, change) in &shown {
        print_change(*index, change);
    }
    if selection == Selection::All {
        println!("\nChanges shown: {}", shown.len());
        println!("Last update:   {}", last_update);
    }
    Ok(())
}

fn show_latest(settings: &Settings, count: usize) -> Result<()> {
    let mut store = open_store(settings)?;
    let mut session = ReviewSession::open(&mut store)?;
    for change in session.latest(count)? {
        print_change(change.display_index().unwrap_or_default(), &change);
    }
    Ok(())
}

fn accept(settings: &Settings, selection: Selection, batched: bool) -> Result<()> {
    let mut store = open_store(settings)?;
    let mut committer = JournalCommitter::new(&settings.journal, store.repository()?);
    let mode = if batched {
        CommitMode::Batched
    } else {
        CommitMode::Single
    };

    let mut session = ReviewSession::open(&mut store)?;
    let accepted = session.accept(selection, &mut committer, mode)?;
    for change in &accepted {
        println!("✓ Accepted: {}", change);
    }
    println!(
        "✅ {} accepted, {} pending (journal: {})",
        accepted.len(),
        session.len(),
        committer.path().display()
    );
    Ok(())
}

fn deny(settings: &Settings, selection: Selection) -> Result<()> {
    let mut store = open_store(settings)?;
    let mut session = ReviewSession::open(&mut store)?;
    let denied = session.deny(selection)?;
    for change in &denied {
        println!("✓ Denied: {}", change);
    }
    println!("✅ {} denied, {} pending", denied.len(), session.len());
    Ok(())
}

fn postpone(settings: &Settings, selection: Selection) -> Result<()> {
    let mut store = open_store(settings)?;
    let mut session = ReviewSession::open(&mut store)?;
    let postponed = session.postpone(selection)?;
    for change in &postponed {
        println!("✓ Postponed: {}", change);
    }
    println!("✅ {} postponed, {} pending", postponed.len(), session.len());
    Ok(())
}

/// Body of the detached auto-update process: update, sleep, repeat.
fn run_daemon(settings: &Settings, interval_hours: u64) -> Result<()> {
    let interval = update_interval(interval_hours)?;
    loop {
        if let Err(err) = run_update(settings) {
            tracing::error!("auto-update failed: {:#}", err);
        }
        std::thread::sleep(interval);
    }
}
