//! File-backed persistence for the note and its side artifacts.
//!
//! # Responsibility
//! - `NoteStore`: load/save of the single canonical note file.
//! - `BackupManager`: pre-save mirror, daily archive, retention sweep.
//! - `ImageStore`: base64 image blobs next to the note.
//!
//! # Invariants
//! - Callers are serialized by the front end; nothing here locks in-process.
//! - Cross-process exclusion is owned by `crate::lock`, acquired before any
//!   store is opened.

pub mod backup;
pub mod image_store;
pub mod note_store;
