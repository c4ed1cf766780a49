//! Line-level scanning of Org outline text.
//!
//! Everything here works on byte offsets into the document text; no tree is
//! kept between calls.

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::{Heading, Properties};

/// `** Title` at line start: one or more stars, whitespace, then text.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\*+)[ \t]+(.*?)[ \t]*$").expect("heading regex"));

/// `:KEY: value` inside a property drawer.
static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*:([^:\s]+):(?:[ \t]+(.*?))?[ \t]*$").expect("property regex")
});

/// Planning lines that may sit between a heading and its drawer.
static PLANNING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?:CLOSED|SCHEDULED|DEADLINE):").expect("planning regex")
});

/// `CLOSED: [2024-03-01 Fri 18:42]`; day name and time are optional.
static CLOSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"CLOSED:[ \t]*\[(\d{4}-\d{2}-\d{2})(?:[ \t]+[^\]\s\d][^\]\s]*)?(?:[ \t]+(\d{1,2}:\d{2}))?[^\]\n]*\]")
        .expect("closed regex")
});

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// One physical line of the document.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    /// Offset of the first byte of the line.
    pub start: usize,
    /// Offset just past the line terminator (or end of text).
    pub next: usize,
    /// Line content without `\n` / `\r\n`.
    pub content: &'a str,
}

impl Line<'_> {
    /// Offset where the content ends (before the terminator).
    pub fn content_end(&self) -> usize {
        self.start + self.content.len()
    }
}

/// Iterate lines of `text[from..]` with absolute offsets.
pub(crate) fn lines_from(text: &str, from: usize) -> impl Iterator<Item = Line<'_>> {
    let mut offset = from;
    text[from..].split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let content = raw.strip_suffix('\n').unwrap_or(raw);
        let content = content.strip_suffix('\r').unwrap_or(content);
        Line {
            start,
            next: offset,
            content,
        }
    })
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Level of a heading line, or `None` if the line is not a heading.
pub(crate) fn heading_level(line: &str) -> Option<usize> {
    HEADING_RE.captures(line).map(|c| c[1].len())
}

/// Scan all headings in document order.
pub(crate) fn scan_headings(text: &str) -> Vec<Heading> {
    let mut heads: Vec<(Line<'_>, usize, &str)> = Vec::new();
    for line in lines_from(text, 0) {
        if let Some(caps) = HEADING_RE.captures(line.content) {
            let level = caps[1].len();
            let body = caps.get(2).map_or("", |m| m.as_str());
            heads.push((line, level, body));
        }
    }

    let mut headings = Vec::with_capacity(heads.len());
    for (i, (line, level, body)) in heads.iter().enumerate() {
        let content_end = heads.get(i + 1).map_or(text.len(), |(next, ..)| next.start);
        let properties = locate_drawer(text, line.next, content_end)
            .map(|d| d.properties())
            .unwrap_or_default();

        headings.push(Heading {
            level: *level,
            title: body.to_string(),
            properties,
            offset: line.start,
            line_end: line.content_end(),
            content_start: line.next,
            content_end,
        });
    }
    headings
}

/// Offset of the first heading at or after `from` whose level is `<= level`.
pub(crate) fn next_heading_at_or_above(text: &str, from: usize, level: usize) -> Option<usize> {
    lines_from(text, from)
        .find(|line| heading_level(line.content).is_some_and(|l| l <= level))
        .map(|line| line.start)
}

// ---------------------------------------------------------------------------
// Property drawer
// ---------------------------------------------------------------------------

/// One `:KEY: value` line inside a drawer.
#[derive(Debug, Clone)]
pub(crate) struct PropertyLine {
    pub key: String,
    pub value: String,
    /// Content range of the line (terminator excluded).
    pub span: Range<usize>,
}

/// Layout of a heading's `:PROPERTIES:` drawer.
#[derive(Debug, Clone)]
pub(crate) struct Drawer {
    pub lines: Vec<PropertyLine>,
    /// Start of the `:END:` line.
    pub end_line: usize,
    /// Offset just past the `:END:` line.
    pub after: usize,
}

impl Drawer {
    pub fn properties(&self) -> Properties {
        let mut props = Properties::default();
        for line in &self.lines {
            props.insert(&line.key, &line.value);
        }
        props
    }

    pub fn find(&self, key: &str) -> Option<&PropertyLine> {
        self.lines.iter().find(|l| l.key.eq_ignore_ascii_case(key))
    }
}

/// Offset after the heading line and any planning lines: where a drawer
/// belongs.
pub(crate) fn drawer_anchor(text: &str, content_start: usize, content_end: usize) -> usize {
    lines_from(&text[..content_end], content_start)
        .find(|line| !PLANNING_RE.is_match(line.content))
        .map_or(content_end, |line| line.start)
}

/// Find the property drawer directly below a heading, if any.
pub(crate) fn locate_drawer(text: &str, content_start: usize, content_end: usize) -> Option<Drawer> {
    let anchor = drawer_anchor(text, content_start, content_end);
    let mut lines = lines_from(&text[..content_end], anchor);

    let open = lines.next()?;
    if !open.content.trim().eq_ignore_ascii_case(":PROPERTIES:") {
        return None;
    }

    let mut props = Vec::new();
    for line in lines {
        if line.content.trim().eq_ignore_ascii_case(":END:") {
            return Some(Drawer {
                lines: props,
                end_line: line.start,
                after: line.next,
            });
        }
        if let Some(caps) = PROPERTY_RE.captures(line.content) {
            props.push(PropertyLine {
                key: caps[1].to_string(),
                value: caps.get(2).map_or("", |m| m.as_str()).to_string(),
                span: line.start..line.content_end(),
            });
        }
    }

    // Unterminated drawer: treat as absent.
    None
}

// ---------------------------------------------------------------------------
// CLOSED marker
// ---------------------------------------------------------------------------

/// CLOSED marker of the heading whose body is `content_start..content_end`.
///
/// Looked for on the planning lines directly under the heading line and on
/// the line right after the property drawer; nowhere else.
pub(crate) fn locate_closed(
    text: &str,
    content_start: usize,
    content_end: usize,
) -> Option<(Range<usize>, NaiveDateTime)> {
    let anchor = drawer_anchor(text, content_start, content_end);
    let after_drawer = locate_drawer(text, content_start, content_end)
        .and_then(|d| lines_from(&text[..content_end], d.after).next());

    lines_from(&text[..anchor], content_start)
        .chain(after_drawer)
        .filter(|line| PLANNING_RE.is_match(line.content))
        .find_map(|line| find_closed(text, line.start..line.content_end()))
}

/// Find the CLOSED marker in `text[range]` and parse it.
fn find_closed(text: &str, range: Range<usize>) -> Option<(Range<usize>, NaiveDateTime)> {
    let caps = CLOSED_RE.captures(&text[range.clone()])?;
    let whole = caps.get(0)?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    let time = match caps.get(2) {
        Some(m) => NaiveTime::parse_from_str(m.as_str(), "%H:%M").ok()?,
        None => NaiveTime::MIN,
    };
    let span = range.start + whole.start()..range.start + whole.end();
    Some((span, date.and_time(time)))
}
