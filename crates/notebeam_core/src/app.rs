//! Explicitly owned process context.
//!
//! # Responsibility
//! - Run the startup sequence: instance lock, then note store.
//! - Own all process-lifetime mutable state (held lock, backup marker).
//!
//! # Invariants
//! - No store is reachable unless the lock was acquired or explicitly skipped.
//! - The lock is released on `shutdown` and on drop, whichever comes first.

use crate::config::{AppConfig, ConfigError};
use crate::lock::{InstanceLock, LockError};
use crate::store::image_store::ImageStore;
use crate::store::note_store::{NoteStore, NoteStoreError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const ALREADY_RUNNING_TITLE: &str = "NoteBeam is already running";
pub const ALREADY_RUNNING_MESSAGE: &str =
    "Another instance of NoteBeam is already running. Please use the existing window.";
pub const LOCK_SETUP_TITLE: &str = "NoteBeam could not start";

#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Lock(LockError),
    NoteStore(NoteStoreError),
}

impl StartupError {
    /// User-facing `(title, message)` for fatal lock failures.
    pub fn user_notice(&self) -> Option<(&'static str, String)> {
        match self {
            Self::Lock(LockError::AlreadyRunning { .. }) => {
                Some((ALREADY_RUNNING_TITLE, ALREADY_RUNNING_MESSAGE.to_string()))
            }
            Self::Lock(err) => Some((LOCK_SETUP_TITLE, err.to_string())),
            Self::Config(_) | Self::NoteStore(_) => None,
        }
    }
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Lock(err) => write!(f, "{err}"),
            Self::NoteStore(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Lock(err) => Some(err),
            Self::NoteStore(err) => Some(err),
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LockError> for StartupError {
    fn from(value: LockError) -> Self {
        Self::Lock(value)
    }
}

impl From<NoteStoreError> for StartupError {
    fn from(value: NoteStoreError) -> Self {
        Self::NoteStore(value)
    }
}

/// Running NoteBeam process state.
pub struct NoteBeamApp {
    lock: Option<InstanceLock>,
    notes: NoteStore,
    images: ImageStore,
}

impl NoteBeamApp {
    /// Acquires the instance lock (unless `skip_lock`) and opens the stores.
    ///
    /// # Errors
    /// - `StartupError::Lock` when another instance runs or the lock file
    ///   cannot be prepared. Callers must notify the user and exit nonzero.
    /// - `StartupError::NoteStore` when the note directory cannot be created.
    pub fn start(config: &AppConfig) -> Result<Self, StartupError> {
        let lock = if config.skip_lock {
            info!(
                "event=instance_lock module=app status=skip reason={}=1",
                crate::config::SKIP_LOCK_ENV
            );
            None
        } else {
            let mut lock = InstanceLock::new(config.lock_path.clone());
            if let Err(err) = lock.acquire() {
                error!("event=app_start module=app status=error stage=lock error={err}");
                return Err(err.into());
            }
            Some(lock)
        };

        // `lock` drops (and releases) if opening the store fails.
        let notes = NoteStore::open(config.note_path.clone())?;
        let images = ImageStore::new(config.note_dir());

        info!(
            "event=app_start module=app status=ok note_path={} lock_held={}",
            config.note_path.display(),
            lock.is_some()
        );
        Ok(Self {
            lock,
            notes,
            images,
        })
    }

    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut NoteStore {
        &mut self.notes
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn lock_held(&self) -> bool {
        self.lock.as_ref().is_some_and(InstanceLock::is_held)
    }

    /// Releases the instance lock. Dropping the app has the same effect.
    pub fn shutdown(mut self) {
        self.release_lock();
        info!("event=app_shutdown module=app status=ok");
    }

    fn release_lock(&mut self) {
        if let Some(mut lock) = self.lock.take() {
            lock.release();
        }
    }
}

impl Drop for NoteBeamApp {
    fn drop(&mut self) {
        self.release_lock();
    }
}
