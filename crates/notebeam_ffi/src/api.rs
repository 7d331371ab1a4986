//! FFI use-case API for the editor front end.
//!
//! # Responsibility
//! - Expose load/save/image calls to Dart via FRB.
//! - Own the one process-wide `NoteBeamApp` behind the binding boundary.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call except `ping`/`core_version`/`init_logging`/`app_start` fails
//!   with a "not started" message before `app_start` succeeds.
//! - Calls are serialized through one mutex; the core never locks in-process.

use log::warn;
use notebeam_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AppConfig, NoteBeamApp, StartupError,
};
use std::sync::{Mutex, MutexGuard};

const NOT_STARTED_MESSAGE: &str = "NoteBeam core is not started; call app_start first";

static APP: Mutex<Option<NoteBeamApp>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Result of `load_note`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteLoadResponse {
    /// Whether the load succeeded (a never-saved note is a success).
    pub ok: bool,
    /// Full note text; empty when no note exists yet.
    pub content: String,
    /// Error text when `ok` is false.
    pub message: String,
}

/// Result of `save_image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSaveResponse {
    pub ok: bool,
    /// Note-relative path such as `images/20260116235959.png`.
    pub relative_path: Option<String>,
    pub message: String,
}

/// Result of `get_image_base64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReadResponse {
    pub ok: bool,
    pub base64_data: Option<String>,
    pub message: String,
}

/// Resolves configuration from the environment, acquires the instance lock
/// and opens the note store.
///
/// # FFI contract
/// - Returns empty string on success, including when already started.
/// - On lock contention returns `"<title>: <message>"`; the host must show it
///   and exit with a nonzero status.
#[flutter_rust_bridge::frb(sync)]
pub fn app_start() -> String {
    match AppConfig::from_env() {
        Ok(config) => start_with_config(&config),
        Err(err) => format!("app_start failed: {err}"),
    }
}

/// Releases the instance lock and drops the running context.
///
/// # FFI contract
/// - Never fails; no-op when not started.
#[flutter_rust_bridge::frb(sync)]
pub fn app_shutdown() {
    if let Some(app) = lock_app().take() {
        app.shutdown();
    }
}

/// Loads the full note text.
#[flutter_rust_bridge::frb(sync)]
pub fn load_note() -> NoteLoadResponse {
    let guard = lock_app();
    let Some(app) = guard.as_ref() else {
        return NoteLoadResponse::failure(NOT_STARTED_MESSAGE);
    };

    match app.notes().load_note() {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(content) => NoteLoadResponse {
                ok: true,
                content,
                message: String::new(),
            },
            Err(err) => NoteLoadResponse::failure(format!("note is not valid UTF-8: {err}")),
        },
        Err(err) => NoteLoadResponse::failure(format!("failed to load note: {err}")),
    }
}

/// Saves the full note text (backups are taken first, best-effort).
///
/// # FFI contract
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn save_note(content: String) -> String {
    let mut guard = lock_app();
    let Some(app) = guard.as_mut() else {
        return NOT_STARTED_MESSAGE.to_string();
    };

    match app.notes_mut().save_note(content.as_bytes()) {
        Ok(_) => String::new(),
        Err(err) => format!("failed to save note: {err}"),
    }
}

/// Stores a base64-encoded PNG next to the note.
#[flutter_rust_bridge::frb(sync)]
pub fn save_image(base64_data: String) -> ImageSaveResponse {
    let guard = lock_app();
    let Some(app) = guard.as_ref() else {
        return ImageSaveResponse {
            ok: false,
            relative_path: None,
            message: NOT_STARTED_MESSAGE.to_string(),
        };
    };

    match app.images().save_image(base64_data.as_str()) {
        Ok(relative_path) => ImageSaveResponse {
            ok: true,
            relative_path: Some(relative_path),
            message: String::new(),
        },
        Err(err) => ImageSaveResponse {
            ok: false,
            relative_path: None,
            message: err.to_string(),
        },
    }
}

/// Reads a note-relative image and returns it base64-encoded.
#[flutter_rust_bridge::frb(sync)]
pub fn get_image_base64(relative_path: String) -> ImageReadResponse {
    let guard = lock_app();
    let Some(app) = guard.as_ref() else {
        return ImageReadResponse {
            ok: false,
            base64_data: None,
            message: NOT_STARTED_MESSAGE.to_string(),
        };
    };

    match app.images().image_base64(relative_path.as_str()) {
        Ok(data) => ImageReadResponse {
            ok: true,
            base64_data: Some(data),
            message: String::new(),
        },
        Err(err) => ImageReadResponse {
            ok: false,
            base64_data: None,
            message: err.to_string(),
        },
    }
}

impl NoteLoadResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            content: String::new(),
            message: message.into(),
        }
    }
}

fn start_with_config(config: &AppConfig) -> String {
    let mut guard = lock_app();
    if guard.is_some() {
        return String::new();
    }

    match NoteBeamApp::start(config) {
        Ok(app) => {
            *guard = Some(app);
            String::new()
        }
        Err(err) => {
            warn!("event=ffi_app_start module=ffi status=error error={err}");
            startup_message(&err)
        }
    }
}

fn startup_message(err: &StartupError) -> String {
    match err.user_notice() {
        Some((title, message)) => format!("{title}: {message}"),
        None => format!("app_start failed: {err}"),
    }
}

// A panic while holding the guard must not brick later calls.
fn lock_app() -> MutexGuard<'static, Option<NoteBeamApp>> {
    APP.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
