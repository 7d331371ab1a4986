use notebeam_core::app::{ALREADY_RUNNING_MESSAGE, ALREADY_RUNNING_TITLE};
use notebeam_core::{AppConfig, LockError, NoteBeamApp, StartupError};
use std::fs;

#[test]
fn start_acquires_lock_and_creates_note_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::rooted_at(dir.path());

    let app = NoteBeamApp::start(&config).unwrap();

    assert!(app.lock_held());
    assert!(config.note_dir().is_dir());
    if cfg!(unix) {
        assert_eq!(
            fs::read_to_string(&config.lock_path).unwrap(),
            format!("{}\n", std::process::id())
        );
    }

    app.shutdown();
    assert!(!config.lock_path.exists());
}

#[test]
fn second_start_is_rejected_with_user_notice() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::rooted_at(dir.path());
    let _running = NoteBeamApp::start(&config).unwrap();

    let err = match NoteBeamApp::start(&config) {
        Ok(_) => panic!("second instance must not start"),
        Err(err) => err,
    };

    assert!(matches!(
        err,
        StartupError::Lock(LockError::AlreadyRunning { .. })
    ));
    let (title, message) = err.user_notice().expect("lock failures carry a notice");
    assert_eq!(title, ALREADY_RUNNING_TITLE);
    assert_eq!(message, ALREADY_RUNNING_MESSAGE);
}

#[test]
fn restart_after_shutdown_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::rooted_at(dir.path());

    NoteBeamApp::start(&config).unwrap().shutdown();
    let restarted = NoteBeamApp::start(&config).unwrap();

    assert!(restarted.lock_held());
}

#[test]
fn dropping_app_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::rooted_at(dir.path());

    drop(NoteBeamApp::start(&config).unwrap());

    assert!(!config.lock_path.exists());
    NoteBeamApp::start(&config).unwrap();
}

#[test]
fn skip_lock_creates_no_lock_file_and_allows_parallel_instances() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::rooted_at(dir.path());
    config.skip_lock = true;

    let first = NoteBeamApp::start(&config).unwrap();
    let second = NoteBeamApp::start(&config).unwrap();

    assert!(!first.lock_held());
    assert!(!second.lock_held());
    assert!(!config.lock_path.exists());
}

#[test]
fn started_app_round_trips_note_and_images() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::rooted_at(dir.path());
    let mut app = NoteBeamApp::start(&config).unwrap();

    assert!(app.notes().load_note().unwrap().is_empty());
    app.notes_mut().save_note("hello").unwrap();
    app.notes_mut().save_note("world").unwrap();
    assert_eq!(app.notes().load_note().unwrap(), b"world");
    assert_eq!(
        fs::read(config.note_dir().join("index.md.bak")).unwrap(),
        b"hello"
    );

    let relative = app.images().save_image("aGVsbG8=").unwrap();
    assert!(config.note_dir().join(&relative).is_file());
    assert_eq!(app.images().image_base64(&relative).unwrap(), "aGVsbG8=");
}

#[test]
fn lock_setup_failure_has_generic_notice() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::rooted_at(dir.path());
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "file").unwrap();
    config.lock_path = blocker.join(".lock");

    let err = match NoteBeamApp::start(&config) {
        Ok(_) => panic!("lock under a file must fail"),
        Err(err) => err,
    };

    assert!(matches!(err, StartupError::Lock(LockError::Setup { .. })));
    let (title, _) = err.user_notice().unwrap();
    assert_eq!(title, notebeam_core::app::LOCK_SETUP_TITLE);
}
