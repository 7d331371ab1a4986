//! Pasted-image blobs stored next to the note.
//!
//! Images live in `<note-dir>/images/<YYYYMMDDHHMMSS>.png` and are addressed
//! by their note-relative path (`images/<name>`). No backup or retention
//! applies to them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

pub const IMAGES_DIR_NAME: &str = "images";
const IMAGE_EXTENSION: &str = "png";
const IMAGE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

pub type ImageStoreResult<T> = Result<T, ImageStoreError>;

#[derive(Debug)]
pub enum ImageStoreError {
    InvalidBase64(base64::DecodeError),
    /// Relative path is absolute or escapes the note directory.
    InvalidPath(String),
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

impl Display for ImageStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBase64(err) => write!(f, "failed to decode base64: {err}"),
            Self::InvalidPath(value) => write!(f, "invalid image path: `{value}`"),
            Self::Io {
                action,
                path,
                source,
            } => write!(f, "failed to {action} `{}`: {source}", path.display()),
        }
    }
}

impl Error for ImageStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidBase64(err) => Some(err),
            Self::InvalidPath(_) => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<base64::DecodeError> for ImageStoreError {
    fn from(value: base64::DecodeError) -> Self {
        Self::InvalidBase64(value)
    }
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    note_dir: PathBuf,
}

impl ImageStore {
    pub fn new(note_dir: impl Into<PathBuf>) -> Self {
        Self {
            note_dir: note_dir.into(),
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.note_dir.join(IMAGES_DIR_NAME)
    }

    /// Decodes `base64_data` and writes it as a new timestamp-named PNG.
    ///
    /// Returns the note-relative path, e.g. `images/20260116235959.png`.
    /// A name already taken within the same second gets a `-<n>` suffix.
    pub fn save_image(&self, base64_data: &str) -> ImageStoreResult<String> {
        let bytes = STANDARD.decode(base64_data.trim())?;

        let images_dir = self.images_dir();
        fs::create_dir_all(&images_dir).map_err(|source| ImageStoreError::Io {
            action: "create images directory",
            path: images_dir.clone(),
            source,
        })?;

        let stamp = Local::now().format(IMAGE_TIMESTAMP_FORMAT).to_string();
        let mut attempt = 0u32;
        loop {
            let file_name = if attempt == 0 {
                format!("{stamp}.{IMAGE_EXTENSION}")
            } else {
                format!("{stamp}-{attempt}.{IMAGE_EXTENSION}")
            };
            let path = images_dir.join(&file_name);

            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    continue;
                }
                Err(source) => {
                    return Err(ImageStoreError::Io {
                        action: "create image",
                        path,
                        source,
                    })
                }
            };

            write_image(file, &path, &bytes)?;

            info!(
                "event=image_save module=image status=ok name={file_name} bytes={}",
                bytes.len()
            );
            return Ok(format!("{IMAGES_DIR_NAME}/{file_name}"));
        }
    }

    /// Reads a note-relative image path and returns it base64-encoded.
    pub fn image_base64(&self, relative_path: &str) -> ImageStoreResult<String> {
        let relative = validate_relative_path(relative_path)?;
        let path = self.note_dir.join(relative);
        let data = fs::read(&path).map_err(|source| ImageStoreError::Io {
            action: "read image",
            path: path.clone(),
            source,
        })?;
        Ok(STANDARD.encode(data))
    }
}

/// Writes `bytes` into the freshly created `path`, removing it again if the
/// write fails.
fn write_image<W: Write>(mut out: W, path: &Path, bytes: &[u8]) -> ImageStoreResult<()> {
    let Err(source) = out.write_all(bytes) else {
        return Ok(());
    };
    error!(
        "event=image_save module=image status=error path={} error={source}",
        path.display()
    );
    drop(out);
    if let Err(err) = fs::remove_file(path) {
        warn!(
            "event=image_save module=image status=error stage=remove_partial path={} error={err}",
            path.display()
        );
    }
    Err(ImageStoreError::Io {
        action: "save image",
        path: path.to_path_buf(),
        source,
    })
}

fn validate_relative_path(value: &str) -> ImageStoreResult<&Path> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ImageStoreError::InvalidPath(value.to_string()));
    }
    let path = Path::new(trimmed);
    let only_normal = path
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if !only_normal {
        return Err(ImageStoreError::InvalidPath(value.to_string()));
    }
    Ok(path)
}
