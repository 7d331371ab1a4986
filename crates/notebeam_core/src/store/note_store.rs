//! Note file persistence facade.
//!
//! # Responsibility
//! - Load the canonical note file, treating "never saved" as empty content.
//! - Save by backing up the pre-image first, then overwriting in place.
//!
//! # Invariants
//! - The note directory exists once `NoteStore::open` returns.
//! - Backup failures never fail or block a save.
//! - Saves truncate and rewrite the file; no append, no rename.

use super::backup::{BackupManager, BackupOutcome};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub type NoteStoreResult<T> = Result<T, NoteStoreError>;

/// Genuine I/O failure on the note file or its directory.
#[derive(Debug)]
pub enum NoteStoreError {
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

impl Display for NoteStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io {
                action,
                path,
                source,
            } => write!(f, "failed to {action} `{}`: {source}", path.display()),
        }
    }
}

impl Error for NoteStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Single-note store bound to one fixed path.
#[derive(Debug)]
pub struct NoteStore {
    note_path: PathBuf,
    backups: BackupManager,
}

impl NoteStore {
    /// Opens the store, creating the note directory recursively.
    pub fn open(note_path: impl Into<PathBuf>) -> NoteStoreResult<Self> {
        Self::open_with_backups(note_path, BackupManager::new())
    }

    pub fn open_with_backups(
        note_path: impl Into<PathBuf>,
        backups: BackupManager,
    ) -> NoteStoreResult<Self> {
        let note_path = note_path.into();
        if let Some(dir) = note_path.parent() {
            fs::create_dir_all(dir).map_err(|source| {
                error!(
                    "event=note_store_open module=store status=error path={} error={source}",
                    dir.display()
                );
                NoteStoreError::Io {
                    action: "create note directory",
                    path: dir.to_path_buf(),
                    source,
                }
            })?;
        }

        info!(
            "event=note_store_open module=store status=ok path={}",
            note_path.display()
        );
        Ok(Self { note_path, backups })
    }

    pub fn note_path(&self) -> &Path {
        &self.note_path
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Returns the full note content, or empty content when no file exists yet.
    pub fn load_note(&self) -> NoteStoreResult<Vec<u8>> {
        match fs::read(&self.note_path) {
            Ok(content) => {
                debug!(
                    "event=note_load module=store status=ok bytes={}",
                    content.len()
                );
                Ok(content)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("event=note_load module=store status=ok reason=not_found bytes=0");
                Ok(Vec::new())
            }
            Err(source) => {
                error!(
                    "event=note_load module=store status=error path={} error={source}",
                    self.note_path.display()
                );
                Err(NoteStoreError::Io {
                    action: "load note",
                    path: self.note_path.clone(),
                    source,
                })
            }
        }
    }

    /// Backs up the current content, then overwrites the note with `content`.
    ///
    /// Only the overwrite itself can fail the call.
    pub fn save_note(&mut self, content: impl AsRef<[u8]>) -> NoteStoreResult<BackupOutcome> {
        let started_at = Instant::now();
        let content = content.as_ref();
        let outcome = self.backups.before_save(&self.note_path);

        if let Err(source) = fs::write(&self.note_path, content) {
            error!(
                "event=note_save module=store status=error path={} duration_ms={} error={source}",
                self.note_path.display(),
                started_at.elapsed().as_millis()
            );
            return Err(NoteStoreError::Io {
                action: "save note",
                path: self.note_path.clone(),
                source,
            });
        }

        info!(
            "event=note_save module=store status=ok bytes={} mirrored={} archived={} pruned={} duration_ms={}",
            content.len(),
            outcome.mirrored,
            outcome.archived.is_some(),
            outcome.pruned,
            started_at.elapsed().as_millis()
        );
        Ok(outcome)
    }
}
