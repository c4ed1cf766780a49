//! Recognizing what the user handed us: a bare ISBN or an Open Library URL.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Open Library edition key, e.g. `OL7353617M`.
static EDITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^OL\d+M$").expect("edition key regex"));

/// What to fetch for a given input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Normalized ISBN-10 or ISBN-13 (digits, plus a trailing `X` for ISBN-10).
    Isbn(String),
    /// Open Library edition key.
    Edition(String),
}

impl Lookup {
    /// API path of the edition record.
    pub(crate) fn api_path(&self) -> String {
        match self {
            Self::Isbn(isbn) => format!("/isbn/{isbn}.json"),
            Self::Edition(key) => format!("/books/{key}.json"),
        }
    }
}

/// Classify `input`. Returns `None` for anything not recognized.
///
/// URLs are accepted for `openlibrary.org` and for the host of `base`.
pub fn parse_source(input: &str, base: &Url) -> Option<Lookup> {
    let input = input.trim();

    if let Some(isbn) = normalize_isbn(input) {
        return Some(Lookup::Isbn(isbn));
    }

    let url = Url::parse(input).ok()?;
    let host = url.host_str()?;
    let known = host == "openlibrary.org" || host.ends_with(".openlibrary.org");
    if !known && Some(host) != base.host_str() {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["isbn", isbn, ..] => normalize_isbn(isbn.trim_end_matches(".json")).map(Lookup::Isbn),
        ["books", key, ..] => {
            let key = key.trim_end_matches(".json");
            EDITION_RE
                .is_match(key)
                .then(|| Lookup::Edition(key.to_string()))
        }
        _ => None,
    }
}

/// Strip separators and validate the ISBN checksum.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let valid = match cleaned.len() {
        10 => isbn10_valid(&cleaned),
        13 => isbn13_valid(&cleaned),
        _ => false,
    };
    valid.then_some(cleaned)
}

fn isbn10_valid(s: &str) -> bool {
    let mut sum = 0;
    for (i, c) in s.chars().enumerate() {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'X' if i == 9 => 10,
            _ => return false,
        };
        sum += digit * (10 - i as u32);
    }
    sum % 11 == 0
}

fn isbn13_valid(s: &str) -> bool {
    let mut sum = 0;
    for (i, c) in s.chars().enumerate() {
        let Some(digit) = c.to_digit(10) else {
            return false;
        };
        sum += if i % 2 == 0 { digit } else { digit * 3 };
    }
    sum % 10 == 0
}
