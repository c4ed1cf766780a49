//! Org outline model for reading-list documents.
//!
//! A [`Document`] is the raw outline text plus an optional backing file.
//! Headings are found by scanning the text on demand; nothing is cached, so
//! every read reflects the current state. All writes go through byte-offset
//! splices.

mod format;
mod scan;

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, instrument};

use readlist_shared::{HeadingRef, ReadlistError, Result};

pub use format::{format_heading_block, write_heading_block};

/// Property naming the author(s); its presence makes a heading an entry.
pub const AUTHOR: &str = "AUTHOR";
/// Property holding the creation date.
pub const ADDED: &str = "ADDED";
/// Property holding the repeated-glyph rating.
pub const RATING: &str = "RATING";
/// Calendar format of `ADDED`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Property holding the reading status.
pub const STATUS: &str = "STATUS";
/// Org timestamp format used for `CLOSED`.
pub const CLOSED_FORMAT: &str = "%Y-%m-%d %a %H:%M";

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// Property drawer contents. Keys compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    map: BTreeMap<String, String>,
}

impl Properties {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_ascii_uppercase()).map(String::as_str)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.map.contains_key(&name.to_ascii_uppercase())
    }

    /// Insert or overwrite; keys stay unique regardless of case.
    pub fn insert(&mut self, name: &str, value: &str) {
        self.map.insert(name.to_ascii_uppercase(), value.to_string());
    }

}

// ---------------------------------------------------------------------------
// Heading
// ---------------------------------------------------------------------------

/// One heading, as found in the current document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Number of leading stars; 1 is top level.
    pub level: usize,
    /// Heading text after the stars, verbatim.
    pub title: String,
    /// Contents of the `:PROPERTIES:` drawer.
    pub properties: Properties,
    /// Byte offset of the heading line.
    pub offset: usize,
    /// End of the heading line's content (terminator excluded).
    pub line_end: usize,
    /// Start of the line after the heading line.
    pub content_start: usize,
    /// Start of the next heading of any level, or end of document.
    pub content_end: usize,
}

impl Heading {
    /// A heading is a book entry iff it has a non-empty `AUTHOR`.
    pub fn is_entry(&self) -> bool {
        self.properties
            .get(AUTHOR)
            .is_some_and(|v| !v.trim().is_empty())
    }

    /// Stable reference for re-resolving this heading later.
    pub fn reference(&self) -> HeadingRef {
        HeadingRef::new(self.offset, self.title.clone())
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A reading-list outline and the file it was loaded from.
#[derive(Debug, Clone, Default)]
pub struct Document {
    path: Option<PathBuf>,
    text: String,
}

impl Document {
    /// In-memory document with no backing file.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            path: None,
            text: text.into(),
        }
    }

    /// Read a document from disk.
    ///
    /// Any failure to open or read the file is [`ReadlistError::DocumentUnavailable`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| ReadlistError::unavailable(path, e))?;
        debug!(bytes = text.len(), "document loaded");
        Ok(Self {
            path: Some(path.to_path_buf()),
            text,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    // --- Reads ---

    /// All headings in document order.
    pub fn headings(&self) -> Vec<Heading> {
        scan::scan_headings(&self.text)
    }

    /// Book entries only, in document order.
    pub fn entries(&self) -> Vec<Heading> {
        self.headings().into_iter().filter(Heading::is_entry).collect()
    }

    /// The heading whose line starts exactly at `offset`.
    pub fn heading_at(&self, offset: usize) -> Option<Heading> {
        if offset > self.text.len() || !self.text.is_char_boundary(offset) {
            return None;
        }
        if offset > 0 && self.text.as_bytes()[offset - 1] != b'\n' {
            return None;
        }
        let line = scan::lines_from(&self.text, offset).next()?;
        scan::heading_level(line.content)?;
        self.headings().into_iter().find(|h| h.offset == offset)
    }

    /// Re-resolve a reference against the current text.
    ///
    /// Fails with [`ReadlistError::InvalidTarget`] unless a heading with the
    /// same title still starts at the referenced offset.
    pub fn resolve(&self, target: &HeadingRef) -> Result<Heading> {
        self.heading_at(target.offset)
            .filter(|h| h.title == target.title)
            .ok_or_else(|| ReadlistError::invalid_target(target.offset, &target.title))
    }

    /// Exclusive end of `heading`'s subtree: the next heading at the same or
    /// a shallower level, or end of document.
    pub fn child_boundary(&self, heading: &Heading) -> usize {
        scan::next_heading_at_or_above(&self.text, heading.content_start, heading.level)
            .unwrap_or(self.text.len())
    }

    /// Every distinct comma-separated value of property `name`, sorted.
    ///
    /// Values are trimmed and empty tokens dropped. Deduplication is exact
    /// (case-sensitive).
    pub fn property_values(&self, name: &str) -> BTreeSet<String> {
        self.headings()
            .iter()
            .filter_map(|h| h.properties.get(name))
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect()
    }

    /// Parse the heading's `CLOSED: [...]` marker.
    ///
    /// Only planning lines are considered: those right under the heading line
    /// and the one right after the property drawer. A marker quoted in notes
    /// further down is ignored.
    pub fn closed_timestamp(&self, heading: &Heading) -> Option<NaiveDateTime> {
        scan::locate_closed(&self.text, heading.content_start, heading.content_end)
            .map(|(_, ts)| ts)
    }

    // --- Writes ---

    /// Insert `text` at `offset`, shifting everything after it.
    ///
    /// When inserting at the very end of a document whose last line has no
    /// terminator, a newline is added first so `text` starts on its own line.
    pub fn splice(&mut self, offset: usize, text: &str) -> Result<()> {
        if offset > self.text.len() || !self.text.is_char_boundary(offset) {
            return Err(ReadlistError::validation(format!(
                "splice offset {offset} is not a character boundary of a {}-byte document",
                self.text.len()
            )));
        }
        if text.is_empty() {
            return Ok(());
        }

        if offset == self.text.len() && !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
            self.text.push_str(text);
        } else {
            self.text.insert_str(offset, text);
        }
        debug!(offset, bytes = text.len(), "spliced text");
        Ok(())
    }

    /// Replace an existing range in place. Used only to overwrite a line
    /// that a write supersedes.
    fn overwrite(&mut self, range: Range<usize>, text: &str) {
        self.text.replace_range(range, text);
    }

    /// Set one property on `heading`, creating the drawer if needed.
    ///
    /// An existing value (matched case-insensitively) is overwritten.
    #[instrument(skip(self, heading), fields(heading = %heading.title))]
    pub fn set_property(&mut self, heading: &Heading, name: &str, value: &str) -> Result<()> {
        let current = self.resolve(&heading.reference())?;
        let line = format::property_line(name, value);
        let end = current.content_end;

        match scan::locate_drawer(&self.text, current.content_start, end) {
            Some(drawer) => match drawer.find(name) {
                Some(existing) => self.overwrite(existing.span.clone(), &line),
                None => self.splice(drawer.end_line, &format!("{line}\n"))?,
            },
            None => {
                let anchor = scan::drawer_anchor(&self.text, current.content_start, end);
                self.splice(anchor, &format!(":PROPERTIES:\n{line}\n:END:\n"))?;
            }
        }
        Ok(())
    }

    /// Stamp `CLOSED: [...]` on the heading.
    ///
    /// An existing marker is rewritten in place; otherwise a new line goes
    /// right after the property drawer.
    pub fn set_closed(&mut self, heading: &Heading, at: NaiveDateTime) -> Result<()> {
        let current = self.resolve(&heading.reference())?;
        let marker = format!("CLOSED: [{}]", at.format(CLOSED_FORMAT));

        if let Some((span, _)) =
            scan::locate_closed(&self.text, current.content_start, current.content_end)
        {
            self.overwrite(span, &marker);
            return Ok(());
        }

        let end = current.content_end;
        let at = match scan::locate_drawer(&self.text, current.content_start, end) {
            Some(drawer) => drawer.after,
            None => scan::drawer_anchor(&self.text, current.content_start, end),
        };
        self.splice(at, &format!("{marker}\n"))
    }

    /// Write the document back to its file.
    ///
    /// The new content goes to a sibling temp file first and is then renamed
    /// over the original, so the file never holds a partial write.
    #[instrument(skip(self), fields(path = ?self.path))]
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            debug!("document has no backing file, nothing to save");
            return Ok(());
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "readlist".into());
        let tmp = path.with_file_name(format!(".{file_name}.readlist-tmp"));

        std::fs::write(&tmp, &self.text).map_err(|e| ReadlistError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            ReadlistError::io(path, e)
        })?;

        debug!(bytes = self.text.len(), "document saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
