//! Rolling mirror and dated archive backups of the note file.
//!
//! # Responsibility
//! - Capture the pre-image of every save into `<note>.bak`.
//! - Capture the first pre-image of each calendar day into
//!   `backups/<stem>.<YYYY-MM-DD>.<ext>`.
//! - Prune backup files older than the retention window after a new daily
//!   archive is written.
//!
//! # Invariants
//! - `before_save` never returns an error; every failure is a `warn!` event.
//! - The daily marker lives in memory only and starts as "none".
//! - The marker only advances after the dated archive write succeeds.

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default age after which backup files are pruned.
pub const RETENTION_DAYS: u64 = 7;
/// Directory (sibling of the note file) holding dated archives.
pub const BACKUPS_DIR_NAME: &str = "backups";
const MIRROR_SUFFIX: &str = ".bak";
const ARCHIVE_DATE_FORMAT: &str = "%Y-%m-%d";

/// What one `before_save` call managed to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupOutcome {
    /// `.bak` mirror was refreshed.
    pub mirrored: bool,
    /// Dated archive written by this call, if any.
    pub archived: Option<PathBuf>,
    /// Files removed by the retention sweep.
    pub pruned: usize,
}

/// In-memory backup bookkeeping owned by one process.
#[derive(Debug)]
pub struct BackupManager {
    last_archive_date: Option<String>,
    retention: Duration,
}

impl Default for BackupManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupManager {
    pub fn new() -> Self {
        Self::with_retention(Duration::from_secs(RETENTION_DAYS * 24 * 60 * 60))
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            last_archive_date: None,
            retention,
        }
    }

    /// Date (`YYYY-MM-DD`) of the last dated archive written by this manager.
    pub fn last_archive_date(&self) -> Option<&str> {
        self.last_archive_date.as_deref()
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Backs up the current on-disk content of `note_path` before it is
    /// overwritten, using the local wall clock.
    pub fn before_save(&mut self, note_path: &Path) -> BackupOutcome {
        self.before_save_at(note_path, Local::now())
    }

    /// Same as [`BackupManager::before_save`] with an explicit clock reading.
    pub fn before_save_at(&mut self, note_path: &Path, now: DateTime<Local>) -> BackupOutcome {
        let mut outcome = BackupOutcome::default();

        let pre_image = match fs::read(note_path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(
                    "event=backup module=backup status=skip reason=no_prior_content path={}",
                    note_path.display()
                );
                return outcome;
            }
            Err(err) => {
                warn!(
                    "event=backup module=backup status=error stage=read_pre_image path={} error={err}",
                    note_path.display()
                );
                return outcome;
            }
        };

        let mirror = mirror_path(note_path);
        match fs::write(&mirror, &pre_image) {
            Ok(()) => outcome.mirrored = true,
            Err(err) => warn!(
                "event=backup module=backup status=error stage=write_mirror path={} error={err}",
                mirror.display()
            ),
        }

        let today = archive_date(&now);
        if self.last_archive_date.as_deref() == Some(today.as_str()) {
            return outcome;
        }

        let backups_dir = backups_dir(note_path);
        if let Err(err) = fs::create_dir_all(&backups_dir) {
            warn!(
                "event=backup module=backup status=error stage=create_backups_dir path={} error={err}",
                backups_dir.display()
            );
            return outcome;
        }

        let archive = archive_path(note_path, &today);
        if let Err(err) = fs::write(&archive, &pre_image) {
            warn!(
                "event=backup module=backup status=error stage=write_archive path={} error={err}",
                archive.display()
            );
            return outcome;
        }

        info!(
            "event=backup module=backup status=ok stage=write_archive path={} bytes={}",
            archive.display(),
            pre_image.len()
        );
        self.last_archive_date = Some(today);
        outcome.archived = Some(archive);
        outcome.pruned = prune_backups(&backups_dir, SystemTime::from(now), self.retention);
        outcome
    }
}

/// Calendar date used in archive names, e.g. `2026-10-19`.
pub fn archive_date(now: &DateTime<Local>) -> String {
    now.format(ARCHIVE_DATE_FORMAT).to_string()
}

pub fn today_archive_date() -> String {
    archive_date(&Local::now())
}

/// `<note-path>.bak`, e.g. `index.md.bak`.
pub fn mirror_path(note_path: &Path) -> PathBuf {
    let mut name = note_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(MIRROR_SUFFIX);
    note_path.with_file_name(name)
}

/// `<note-dir>/backups`.
pub fn backups_dir(note_path: &Path) -> PathBuf {
    note_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(BACKUPS_DIR_NAME)
}

/// `<note-dir>/backups/<stem>.<date>.<ext>`, e.g. `index.2026-10-19.md`.
pub fn archive_path(note_path: &Path, date: &str) -> PathBuf {
    let stem = note_path
        .file_stem()
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_else(|| "note".to_string());
    let file_name = match note_path.extension() {
        Some(ext) => format!("{stem}.{date}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{date}"),
    };
    backups_dir(note_path).join(file_name)
}

/// Deletes non-directory entries modified before `now - retention`.
///
/// Returns the number of removed files. Failures are logged per entry and do
/// not stop the sweep.
fn prune_backups(backups_dir: &Path, now: SystemTime, retention: Duration) -> usize {
    prune_backups_with(backups_dir, now, retention, |path| fs::remove_file(path))
}

fn prune_backups_with<F>(
    backups_dir: &Path,
    now: SystemTime,
    retention: Duration,
    mut remove: F,
) -> usize
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let Some(cutoff) = now.checked_sub(retention) else {
        return 0;
    };

    let entries = match fs::read_dir(backups_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                "event=backup_prune module=backup status=error stage=list path={} error={err}",
                backups_dir.display()
            );
            return 0;
        }
    };

    let mut pruned = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("event=backup_prune module=backup status=error stage=list_entry error={err}");
                continue;
            }
        };
        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(
                    "event=backup_prune module=backup status=error stage=stat path={} error={err}",
                    path.display()
                );
                continue;
            }
        };
        if metadata.is_dir() {
            continue;
        }
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(err) => {
                warn!(
                    "event=backup_prune module=backup status=error stage=mtime path={} error={err}",
                    path.display()
                );
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }

        match remove(&path) {
            Ok(()) => {
                pruned += 1;
                info!(
                    "event=backup_prune module=backup status=ok path={}",
                    path.display()
                );
            }
            Err(err) => warn!(
                "event=backup_prune module=backup status=error stage=remove path={} error={err}",
                path.display()
            ),
        }
    }

    pruned
}
