use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use notebeam_core::{ImageStore, ImageStoreError};
use std::fs;

const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[test]
fn save_image_writes_decoded_bytes_under_images_dir() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path());

    let relative = store.save_image(&STANDARD.encode(PNG_HEADER)).unwrap();

    assert!(relative.starts_with("images/"));
    assert!(relative.ends_with(".png"));
    assert_eq!(fs::read(dir.path().join(&relative)).unwrap(), PNG_HEADER);
}

#[test]
fn same_second_saves_get_distinct_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path());
    let payload = STANDARD.encode(PNG_HEADER);

    let names = (0..3)
        .map(|_| store.save_image(&payload).unwrap())
        .collect::<std::collections::HashSet<_>>();

    assert_eq!(names.len(), 3);
    assert_eq!(fs::read_dir(store.images_dir()).unwrap().count(), 3);
}

#[test]
fn read_back_returns_same_base64() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path());
    let payload = STANDARD.encode(PNG_HEADER);

    let relative = store.save_image(&payload).unwrap();

    assert_eq!(store.image_base64(&relative).unwrap(), payload);
}

#[test]
fn invalid_base64_is_rejected_without_creating_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path());

    let err = store.save_image("not base64 !!").expect_err("must fail");

    assert!(matches!(err, ImageStoreError::InvalidBase64(_)));
    assert!(!store.images_dir().exists());
}

#[test]
fn reading_outside_note_dir_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path().join("notes"));

    let err = store.image_base64("../secret.png").expect_err("must fail");

    assert!(matches!(err, ImageStoreError::InvalidPath(_)));
}

#[test]
fn missing_image_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path());

    let err = store.image_base64("images/missing.png").expect_err("must fail");

    assert!(matches!(err, ImageStoreError::Io { .. }));
}
