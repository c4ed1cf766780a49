//! Insertion planning: where a new entry goes and at what level.
//!
//! Planning only reads the document. [`insert_entry`] then serializes the
//! block and splices it in one step, so a failure anywhere before the splice
//! leaves the text untouched.

use tracing::{debug, instrument};

use readlist_outline::{Document, RATING, write_heading_block};
use readlist_shared::{BookRecord, HeadingRef, Placement, ReadlistError, Result};

/// Upper bound on the length of a `RATING` value, in bytes.
pub const MAX_RATING_BYTES: usize = 4096;

/// Resolved insertion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPlan {
    /// Byte offset the block is spliced at.
    pub offset: usize,
    /// Heading level of the new entry.
    pub level: usize,
}

/// Compute where an entry under `target` belongs.
///
/// - `None`: level 1 at the end of the document.
/// - `Prepend`: just before the first child at exactly `parent_level + 1`
///   inside the target's subtree, or at the subtree end when it has none.
/// - `Append`: at the subtree end ([`Document::child_boundary`]).
#[instrument(skip(doc))]
pub fn plan_insertion(
    doc: &Document,
    target: Option<&HeadingRef>,
    placement: Placement,
) -> Result<InsertionPlan> {
    let Some(target) = target else {
        return Ok(InsertionPlan {
            offset: doc.len(),
            level: 1,
        });
    };

    let parent = doc.resolve(target)?;
    let parent_level = parent.level;
    let level = parent_level + 1;
    let boundary = doc.child_boundary(&parent);

    let offset = match placement {
        Placement::Append => boundary,
        Placement::Prepend => doc
            .headings()
            .into_iter()
            .filter(|h| h.offset > parent.offset && h.offset < boundary)
            .find(|h| h.level == level)
            .map_or(boundary, |first_child| first_child.offset),
    };

    debug!(offset, level, %placement, "insertion planned");
    Ok(InsertionPlan { offset, level })
}

/// Plan, serialize, and splice `entry` into `doc` (in memory only).
pub fn insert_entry(
    doc: &mut Document,
    target: Option<&HeadingRef>,
    entry: &BookRecord,
    placement: Placement,
) -> Result<InsertionPlan> {
    let plan = plan_insertion(doc, target, placement)?;
    let block = write_heading_block(plan.level, &entry.title, &entry.author, &entry.properties);
    doc.splice(plan.offset, &block)?;
    Ok(plan)
}

/// [`insert_entry`] followed by flushing the document to its file.
#[instrument(skip(doc, entry), fields(title = %entry.title))]
pub fn plan_and_insert(
    doc: &mut Document,
    target: Option<&HeadingRef>,
    entry: &BookRecord,
    placement: Placement,
) -> Result<InsertionPlan> {
    let plan = insert_entry(doc, target, entry, placement)?;
    doc.save()?;
    Ok(plan)
}

/// Set `RATING` to `rating` copies of `glyph`.
///
/// Ratings of zero or below are ignored without touching the document or
/// resolving the target. A rating whose value would exceed
/// [`MAX_RATING_BYTES`] is a validation error. Returns whether anything was
/// written.
pub fn apply_rating(
    doc: &mut Document,
    target: &HeadingRef,
    rating: i64,
    glyph: &str,
) -> Result<bool> {
    if rating <= 0 {
        debug!(rating, "non-positive rating ignored");
        return Ok(false);
    }
    let stars = rating_value(rating, glyph)?;
    let heading = doc.resolve(target)?;
    doc.set_property(&heading, RATING, &stars)?;
    Ok(true)
}

fn rating_value(rating: i64, glyph: &str) -> Result<String> {
    usize::try_from(rating)
        .ok()
        .filter(|&n| {
            glyph
                .len()
                .checked_mul(n)
                .is_some_and(|len| len <= MAX_RATING_BYTES)
        })
        .map(|n| glyph.repeat(n))
        .ok_or_else(|| {
            ReadlistError::validation(format!(
                "rating {rating} is too large (at most {MAX_RATING_BYTES} bytes of '{glyph}')"
            ))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
