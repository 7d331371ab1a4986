//! Core persistence for NoteBeam.
//! This crate owns the instance lock, the note file and its backups.

pub mod app;
pub mod config;
pub mod lock;
pub mod logging;
pub mod store;

pub use app::{NoteBeamApp, StartupError};
pub use config::{AppConfig, ConfigError};
pub use lock::{InstanceLock, LockError, LockResult, LockStrategy, PlatformLock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use store::backup::{BackupManager, BackupOutcome, RETENTION_DAYS};
pub use store::image_store::{ImageStore, ImageStoreError, ImageStoreResult};
pub use store::note_store::{NoteStore, NoteStoreError, NoteStoreResult};

/// Minimal health-check API for front-end wiring.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
