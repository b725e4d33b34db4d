//! Represents one entry in a directory listing.

use serde::{Deserialize, Serialize};

/// Kind of a listed entry.
///
/// The store exposed here is flat, so `Dir` never occurs in practice; the
/// schema reserves it so listing clients do not need a special case.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// A single `{type, name}` record returned by the list endpoint.
///
/// `name` is reported without the store-internal leading path separator.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub name: String,
}
