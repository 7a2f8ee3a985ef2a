// ⏰ Auto-update scheduling
//
// A scheduled auto-update is a detached process of this same binary running
// the `auto-update-daemon` subcommand. Its pid is kept in the store so a later
// invocation can cancel it.

use crate::config::{ConfigKey, ConfigValue};
use crate::db::ChangeStore;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use thiserror::Error;

/// Shortest allowed interval between automatic updates, in hours.
pub const MIN_AUTO_UPDATE_HOURS: u64 = 1;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("auto-update interval of {requested} hour(s) is below the minimum of {minimum}")]
    IntervalTooShort { requested: u64, minimum: u64 },

    #[error("auto-update interval of {requested} hour(s) is too large")]
    IntervalTooLong { requested: u64 },

    #[error("failed to start auto-update process: {reason}")]
    Spawn { reason: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub trait AutoUpdateScheduler {
    /// Start a background updater; returns its process id.
    fn spawn(&mut self, interval_hours: u64) -> Result<u32>;

    fn terminate(&mut self, pid: u32) -> Result<()>;
}

/// Sleep between two automatic updates.
pub fn update_interval(interval_hours: u64) -> Result<Duration, ScheduleError> {
    if interval_hours < MIN_AUTO_UPDATE_HOURS {
        return Err(ScheduleError::IntervalTooShort {
            requested: interval_hours,
            minimum: MIN_AUTO_UPDATE_HOURS,
        });
    }
    interval_hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or(ScheduleError::IntervalTooLong {
            requested: interval_hours,
        })
}

/// Validate, replace any running updater, and record the new pid.
pub fn schedule_auto_update<S: ChangeStore + ?Sized>(
    store: &mut S,
    scheduler: &mut dyn AutoUpdateScheduler,
    interval_hours: u64,
) -> Result<u32, ScheduleError> {
    update_interval(interval_hours)?;

    cancel_auto_update(store, scheduler)?;

    let pid = scheduler
        .spawn(interval_hours)
        .map_err(|err| ScheduleError::Spawn {
            reason: format!("{:#}", err),
        })?;
    store.config_set(ConfigKey::AutoUpdatePid, ConfigValue::AutoUpdatePid(Some(pid)))?;
    tracing::info!("auto-update every {}h running as pid {}", interval_hours, pid);
    Ok(pid)
}

/// Stop the recorded updater, if any. Returns the pid that was stopped.
pub fn cancel_auto_update<S: ChangeStore + ?Sized>(
    store: &mut S,
    scheduler: &mut dyn AutoUpdateScheduler,
) -> Result<Option<u32>, ScheduleError> {
    let Some(pid) = store.auto_update_pid()? else {
        return Ok(None);
    };
    // the process may already be gone; the record is cleared either way
    if let Err(err) = scheduler.terminate(pid) {
        tracing::warn!("could not stop auto-update pid {}: {:#}", pid, err);
    }
    store.config_set(ConfigKey::AutoUpdatePid, ConfigValue::AutoUpdatePid(None))?;
    Ok(Some(pid))
}

// ============================================================================
// PROCESS SCHEDULER
// ============================================================================

/// Runs the updater as a detached child of the current executable.
pub struct ProcessScheduler {
    exe: PathBuf,
    config: Option<PathBuf>,
}

impl ProcessScheduler {
    pub fn new(config: Option<PathBuf>) -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate current executable")?;
        Ok(ProcessScheduler { exe, config })
    }
}

impl AutoUpdateScheduler for ProcessScheduler {
    fn spawn(&mut self, interval_hours: u64) -> Result<u32> {
        let mut command = Command::new(&self.exe);
        if let Some(config) = &self.config {
            command.arg("--config").arg(config);
        }
        command
            .arg("auto-update-daemon")
            .arg("--interval-hours")
            .arg(interval_hours.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = command
            .spawn()
            .with_context(|| format!("Failed to run {}", self.exe.display()))?;
        Ok(child.id())
    }

    fn terminate(&mut self, pid: u32) -> Result<()> {
        #[cfg(windows)]
        let status = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .status();
        #[cfg(not(windows))]
        let status = Command::new("kill").arg(pid.to_string()).status();

        let status = status.context("Failed to run process kill command")?;
        if !status.success() {
            bail!("kill of pid {} exited with {}", pid, status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::testing::RecordingScheduler;

    #[test]
    fn test_interval_below_minimum_is_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut scheduler = RecordingScheduler::default();

        let err = schedule_auto_update(&mut store, &mut scheduler, 0).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::IntervalTooShort {
                requested: 0,
                minimum: 1
            }
        ));
        assert!(scheduler.spawned.is_empty());
        assert_eq!(store.auto_update_pid().unwrap(), None);
    }

    #[test]
    fn test_interval_overflow_is_rejected() {
        assert_eq!(update_interval(2).unwrap(), Duration::from_secs(7200));
        assert!(matches!(
            update_interval(u64::MAX),
            Err(ScheduleError::IntervalTooLong { .. })
        ));

        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut scheduler = RecordingScheduler::default();
        assert!(schedule_auto_update(&mut store, &mut scheduler, u64::MAX).is_err());
        assert!(scheduler.spawned.is_empty());
    }

    #[test]
    fn test_schedule_records_pid_and_replaces_previous() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut scheduler = RecordingScheduler::default();

        let first = schedule_auto_update(&mut store, &mut scheduler, 1).unwrap();
        assert_eq!(store.auto_update_pid().unwrap(), Some(first));

        let second = schedule_auto_update(&mut store, &mut scheduler, 24).unwrap();
        assert_eq!(scheduler.spawned, vec![1, 24]);
        assert_eq!(scheduler.terminated, vec![first]);
        assert_eq!(store.auto_update_pid().unwrap(), Some(second));
    }

    #[test]
    fn test_cancel() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut scheduler = RecordingScheduler::default();

        assert_eq!(cancel_auto_update(&mut store, &mut scheduler).unwrap(), None);

        let pid = schedule_auto_update(&mut store, &mut scheduler, 6).unwrap();
        assert_eq!(
            cancel_auto_update(&mut store, &mut scheduler).unwrap(),
            Some(pid)
        );
        assert_eq!(scheduler.terminated, vec![pid]);
        assert_eq!(store.auto_update_pid().unwrap(), None);
    }
}
