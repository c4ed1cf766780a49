//! Core domain types shared across readlist crates.

use serde::{Deserialize, Serialize};

/// Glyph repeated once per rating point in the `RATING` property.
pub const DEFAULT_RATING_GLYPH: &str = ":star:";

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Where a new entry lands among the chosen category's children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Become the first child ("add to top").
    #[default]
    Prepend,
    /// Become the last child ("add to bottom").
    Append,
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prepend => f.write_str("prepend"),
            Self::Append => f.write_str("append"),
        }
    }
}

impl std::str::FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prepend" | "top" => Ok(Self::Prepend),
            "append" | "bottom" => Ok(Self::Append),
            other => Err(format!(
                "unknown placement '{other}': expected 'prepend' or 'append'"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// BookRecord
// ---------------------------------------------------------------------------

/// A fully-resolved book, ready to become an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Entry heading text.
    pub title: String,
    /// Author(s), stored verbatim (comma-joined when several).
    pub author: String,
    /// Extra properties written after `AUTHOR` and `ADDED`, in this order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<(String, String)>,
}

impl BookRecord {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            properties: Vec::new(),
        }
    }

    /// Append a property, keeping caller order.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }
}

// ---------------------------------------------------------------------------
// HeadingRef
// ---------------------------------------------------------------------------

/// A reference to a heading, valid for the document state it was read from.
///
/// `offset` is the byte offset of the heading line. Before use it is
/// re-resolved: the line at `offset` must still be a heading titled `title`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeadingRef {
    pub offset: usize,
    pub title: String,
}

impl HeadingRef {
    pub fn new(offset: usize, title: impl Into<String>) -> Self {
        Self {
            offset,
            title: title.into(),
        }
    }
}

impl std::fmt::Display for HeadingRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.title, self.offset)
    }
}
