//! Category listing.
//!
//! Every heading down to a configurable depth can anchor a new entry, book
//! entries included: filing a book "under" another book is allowed.

use tracing::{debug, instrument};

use readlist_outline::Document;
use readlist_shared::HeadingRef;

/// A heading offered as an insertion target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Display label: the title indented two spaces per level below the top.
    pub label: String,
    /// Re-resolvable reference; `heading.title` is the undecorated title.
    pub heading: HeadingRef,
    /// Outline level of the heading.
    pub level: usize,
    /// Titles from the top-level ancestor down to this heading.
    pub path: Vec<String>,
    /// Whether the heading is itself a book entry.
    pub is_entry: bool,
}

/// List headings with `level <= max_depth`, in document order.
///
/// An empty document (or one without headings) yields an empty list; the
/// caller then inserts at top level.
#[instrument(skip(doc))]
pub fn list_categories(doc: &Document, max_depth: usize) -> Vec<Category> {
    let mut ancestors: Vec<(usize, String)> = Vec::new();
    let mut categories = Vec::new();

    for heading in doc.headings() {
        while ancestors
            .last()
            .is_some_and(|(level, _)| *level >= heading.level)
        {
            ancestors.pop();
        }
        ancestors.push((heading.level, heading.title.clone()));

        if heading.level > max_depth {
            continue;
        }

        categories.push(Category {
            label: display_label(heading.level, &heading.title),
            heading: heading.reference(),
            level: heading.level,
            path: ancestors.iter().map(|(_, t)| t.clone()).collect(),
            is_entry: heading.is_entry(),
        });
    }

    debug!(count = categories.len(), "categories listed");
    categories
}

/// Categories whose path ends with the `/`-separated segments of `query`.
///
/// Matching is case-insensitive per segment, so `"sci-fi"` and
/// `"Fiction/Sci-Fi"` both find `* Fiction / ** Sci-Fi`.
pub fn find_categories<'a>(categories: &'a [Category], query: &str) -> Vec<&'a Category> {
    let wanted: Vec<&str> = query.split('/').map(str::trim).collect();

    categories
        .iter()
        .filter(|c| {
            c.path.len() >= wanted.len()
                && c.path[c.path.len() - wanted.len()..]
                    .iter()
                    .zip(&wanted)
                    .all(|(have, want)| have.eq_ignore_ascii_case(want))
        })
        .collect()
}

fn display_label(level: usize, title: &str) -> String {
    format!("{}{title}", "  ".repeat(level.saturating_sub(1)))
}
