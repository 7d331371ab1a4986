//! Cross-process instance lock.
//!
//! # Responsibility
//! - Guarantee that only one NoteBeam process touches the note files at a time.
//! - Stamp the lock file with the owner PID for operator diagnostics.
//!
//! # Invariants
//! - Acquire never blocks: a contended lock fails immediately with
//!   `LockError::AlreadyRunning`.
//! - At most one live handle system-wide holds the exclusive lock.
//! - Release is best-effort, idempotent and never fails the caller.
//! - The platform lock primitive is chosen at build time via `PlatformLock`.
//!
//! # See also
//! - `crate::app` for the startup/shutdown wiring.

use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

mod platform;

pub use platform::OsFileLock as PlatformLock;

#[cfg(not(any(unix, windows)))]
compile_error!("notebeam instance lock requires a unix or windows target");

pub type LockResult<T> = Result<T, LockError>;

/// Instance lock failure.
#[derive(Debug)]
pub enum LockError {
    /// Another live process holds the lock.
    AlreadyRunning { lock_path: PathBuf },
    /// The lock directory or file could not be prepared.
    Setup {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

impl Display for LockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning { lock_path } => write!(
                f,
                "another instance of NoteBeam is already running (lock `{}`)",
                lock_path.display()
            ),
            Self::Setup {
                action,
                path,
                source,
            } => write!(f, "failed to {action} `{}`: {source}", path.display()),
        }
    }
}

impl Error for LockError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AlreadyRunning { .. } => None,
            Self::Setup { source, .. } => Some(source),
        }
    }
}

/// Exclusive lock primitive over an open file.
///
/// Implementations must not block: a lock held elsewhere is reported as
/// `Ok(false)`.
pub trait LockStrategy {
    /// Tries to take an exclusive lock over the whole file.
    fn try_lock_exclusive(file: &File) -> io::Result<bool>;
    /// Drops the lock previously taken through `try_lock_exclusive`.
    fn unlock(file: &File) -> io::Result<()>;
}

/// Process instance lock over a fixed lock-file path.
///
/// Dropping a held lock releases it, so a lock stored in an owned context is
/// released on every exit path.
pub struct InstanceLock<S: LockStrategy = PlatformLock> {
    lock_path: PathBuf,
    held: Option<File>,
    _strategy: PhantomData<S>,
}

impl InstanceLock {
    /// Creates an unheld lock for the platform default strategy.
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self::with_strategy(lock_path)
    }
}

impl<S: LockStrategy> InstanceLock<S> {
    pub fn with_strategy(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
            held: None,
            _strategy: PhantomData,
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Acquires the lock without waiting.
    ///
    /// Calling this again while this instance already holds the lock is a
    /// no-op success.
    ///
    /// # Errors
    /// - `AlreadyRunning` when another handle holds the lock.
    /// - `Setup` when the directory or file cannot be created, locked or
    ///   stamped with the PID.
    pub fn acquire(&mut self) -> LockResult<()> {
        if self.held.is_some() {
            return Ok(());
        }

        if let Some(dir) = self.lock_path.parent() {
            fs::create_dir_all(dir).map_err(|source| LockError::Setup {
                action: "create lock directory",
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|source| self.setup_error("open lock file", source))?;

        match S::try_lock_exclusive(&file) {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    "event=lock_acquire module=lock status=error error_code=already_running path={}",
                    self.lock_path.display()
                );
                return Err(LockError::AlreadyRunning {
                    lock_path: self.lock_path.clone(),
                });
            }
            Err(source) => return Err(self.setup_error("lock", source)),
        }

        let pid = std::process::id();
        if let Err(source) = stamp_pid(&mut file, pid) {
            if let Err(err) = S::unlock(&file) {
                warn!("event=lock_acquire module=lock status=error stage=unlock error={err}");
            }
            return Err(self.setup_error("write PID to lock file", source));
        }

        info!(
            "event=lock_acquire module=lock status=ok path={} pid={pid}",
            self.lock_path.display()
        );
        self.held = Some(file);
        Ok(())
    }

    /// Releases the lock if held: unlock, close, remove the file.
    ///
    /// Each step failure is logged and swallowed.
    pub fn release(&mut self) {
        let Some(file) = self.held.take() else {
            return;
        };

        if let Err(err) = S::unlock(&file) {
            warn!(
                "event=lock_release module=lock status=error stage=unlock path={} error={err}",
                self.lock_path.display()
            );
        }
        // Closed before removal; windows refuses to delete an open file.
        drop(file);
        if let Err(err) = fs::remove_file(&self.lock_path) {
            warn!(
                "event=lock_release module=lock status=error stage=remove path={} error={err}",
                self.lock_path.display()
            );
        }

        info!(
            "event=lock_release module=lock status=ok path={}",
            self.lock_path.display()
        );
    }

    fn setup_error(&self, action: &'static str, source: io::Error) -> LockError {
        LockError::Setup {
            action,
            path: self.lock_path.clone(),
            source,
        }
    }
}

impl<S: LockStrategy> Drop for InstanceLock<S> {
    fn drop(&mut self) {
        self.release();
    }
}

fn stamp_pid(file: &mut File, pid: u32) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{pid}")?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::{InstanceLock, LockError, LockStrategy};
    use std::fs::File;
    use std::io;

    struct AlwaysBusy;

    impl LockStrategy for AlwaysBusy {
        fn try_lock_exclusive(_file: &File) -> io::Result<bool> {
            Ok(false)
        }

        fn unlock(_file: &File) -> io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl LockStrategy for Broken {
        fn try_lock_exclusive(_file: &File) -> io::Result<bool> {
            Err(io::Error::new(io::ErrorKind::Other, "lock syscall failed"))
        }

        fn unlock(_file: &File) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "unlock syscall failed"))
        }
    }

    #[test]
    fn busy_strategy_maps_to_already_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = InstanceLock::<AlwaysBusy>::with_strategy(dir.path().join(".lock"));

        let err = lock.acquire().expect_err("busy lock must fail");
        assert!(matches!(err, LockError::AlreadyRunning { .. }));
        assert!(!lock.is_held());
    }

    #[test]
    fn strategy_io_failure_maps_to_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = InstanceLock::<Broken>::with_strategy(dir.path().join(".lock"));

        let err = lock.acquire().expect_err("broken lock must fail");
        match err {
            LockError::Setup { action, .. } => assert_eq!(action, "lock"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn release_without_acquire_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = InstanceLock::new(dir.path().join(".lock"));
        lock.release();
        lock.release();
        assert!(!lock.is_held());
    }
}
