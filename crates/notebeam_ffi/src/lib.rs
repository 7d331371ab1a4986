//! Flutter-facing bindings for NoteBeam core.

pub mod api;
