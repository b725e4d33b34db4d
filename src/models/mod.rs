//! Data models for the file-management surface.
//!
//! The store in scope is a flat namespace, so the only entity with a wire
//! representation is the directory listing entry. It serializes naturally as
//! JSON via `serde`.

pub mod entry;
