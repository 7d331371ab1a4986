//! Path resolution and environment toggles.
//!
//! # Responsibility
//! - Resolve the note path and lock path once at startup.
//! - Read the development skip-lock toggle.
//!
//! # Invariants
//! - Resolved paths are absolute whenever the platform directories are.
//! - Blank override values are ignored.

use crate::store::backup::BACKUPS_DIR_NAME;
use crate::store::image_store::IMAGES_DIR_NAME;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "NoteBeam";
pub const NOTE_FILE_NAME: &str = "index.md";
pub const LOCK_FILE_NAME: &str = ".lock";
const LOG_DIR_NAME: &str = "logs";

/// Set to `1` to skip instance locking (development only).
pub const SKIP_LOCK_ENV: &str = "NOTEBEAM_SKIP_LOCK";
/// Overrides the directory holding `index.md`.
pub const NOTE_DIR_ENV: &str = "NOTEBEAM_NOTE_DIR";
/// Overrides the directory holding `.lock`.
pub const DATA_DIR_ENV: &str = "NOTEBEAM_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingHomeDir,
    MissingDataDir,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHomeDir => write!(f, "could not determine the user's home directory"),
            Self::MissingDataDir => {
                write!(f, "could not determine the platform data directory")
            }
        }
    }
}

impl Error for ConfigError {}

/// Process-wide paths, resolved once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub note_path: PathBuf,
    pub lock_path: PathBuf,
    pub skip_lock: bool,
}

impl AppConfig {
    /// Resolves paths from platform directories and `NOTEBEAM_*` variables.
    ///
    /// - note: `<documents>/NoteBeam/index.md`
    /// - lock: `<data>/NoteBeam/.lock`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(None, None)
    }

    /// Like [`AppConfig::from_env`], with explicit directories taking
    /// precedence over the environment.
    ///
    /// Platform directories are only looked up for paths left unresolved.
    pub fn from_env_with(
        note_dir: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let skip_lock = skip_lock_requested(std::env::var(SKIP_LOCK_ENV).ok().as_deref());
        resolve_paths(
            note_dir.or_else(|| env_dir(NOTE_DIR_ENV)),
            data_dir.or_else(|| env_dir(DATA_DIR_ENV)),
            default_note_dir,
            default_data_dir,
        )
        .map(|(note_path, lock_path)| Self {
            note_path,
            lock_path,
            skip_lock,
        })
    }

    /// Builds a self-contained layout under `root` (`notes/` and `data/`).
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            note_path: root.join("notes").join(NOTE_FILE_NAME),
            lock_path: root.join("data").join(LOCK_FILE_NAME),
            skip_lock: false,
        }
    }

    pub fn note_dir(&self) -> &Path {
        self.note_path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.note_dir().join(IMAGES_DIR_NAME)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.note_dir().join(BACKUPS_DIR_NAME)
    }

    /// `<data>/NoteBeam/logs`, next to the lock file.
    pub fn log_dir(&self) -> PathBuf {
        self.lock_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(LOG_DIR_NAME)
    }
}

/// `true` only for the exact value `1` (surrounding whitespace ignored).
pub fn skip_lock_requested(value: Option<&str>) -> bool {
    value.map(str::trim) == Some("1")
}

fn env_dir(name: &str) -> Option<PathBuf> {
    let raw = std::env::var_os(name)?;
    let text = raw.to_string_lossy();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

/// Returns `(note_path, lock_path)`; a default is only computed when its
/// directory is missing.
fn resolve_paths<N, D>(
    note_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    default_note: N,
    default_data: D,
) -> Result<(PathBuf, PathBuf), ConfigError>
where
    N: FnOnce() -> Result<PathBuf, ConfigError>,
    D: FnOnce() -> Result<PathBuf, ConfigError>,
{
    let note_dir = match note_dir {
        Some(dir) => dir,
        None => default_note()?,
    };
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => default_data()?,
    };
    Ok((note_dir.join(NOTE_FILE_NAME), data_dir.join(LOCK_FILE_NAME)))
}

fn default_note_dir() -> Result<PathBuf, ConfigError> {
    Ok(default_documents_dir()?.join(APP_DIR_NAME))
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(ConfigError::MissingDataDir)
}

fn default_documents_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = dirs::document_dir() {
        return Ok(dir);
    }
    dirs::home_dir()
        .map(|home| home.join("Documents"))
        .ok_or(ConfigError::MissingHomeDir)
}
