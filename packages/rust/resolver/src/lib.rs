//! Book metadata lookup against the Open Library API.
//!
//! Given an ISBN or an Open Library edition URL, fetch the edition record and
//! its authors and turn them into a [`BookRecord`]. The public entry point
//! never fails: anything that goes wrong (unknown input, network, HTTP status,
//! malformed JSON, missing authors) yields `None`, so the caller never gets
//! partial data to insert.

mod source;

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use readlist_shared::{BookRecord, ReadlistError, ResolverConfig, Result};

pub use source::{Lookup, normalize_isbn, parse_source};

/// Maximum number of redirects to follow (`/isbn/` redirects to `/books/`).
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("readlist/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for the resolver.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// API root, e.g. `https://openlibrary.org`.
    pub base_url: String,
    /// Timeout for each HTTP request in seconds.
    pub timeout_secs: u64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self::from(&ResolverConfig::default())
    }
}

impl From<&ResolverConfig> for ResolverOptions {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// API payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Edition {
    key: String,
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<KeyRef>,
    #[serde(default)]
    number_of_pages: Option<u32>,
    #[serde(default)]
    publish_date: Option<String>,
    #[serde(default)]
    isbn_13: Vec<String>,
    #[serde(default)]
    isbn_10: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct KeyRef {
    key: String,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Open Library metadata resolver.
#[derive(Debug, Clone)]
pub struct OpenLibraryResolver {
    client: Client,
    base: Url,
}

impl OpenLibraryResolver {
    pub fn new(opts: &ResolverOptions) -> Result<Self> {
        let base = Url::parse(&opts.base_url).map_err(|e| {
            ReadlistError::config(format!("invalid resolver base_url '{}': {e}", opts.base_url))
        })?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| ReadlistError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base })
    }

    /// Resolve an ISBN or URL to a complete record, or `None`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, input: &str) -> Option<BookRecord> {
        let Some(lookup) = parse_source(input, &self.base) else {
            debug!("input is neither an ISBN nor an Open Library edition URL");
            return None;
        };

        match self.fetch_record(&lookup).await {
            Ok(record) => {
                info!(title = %record.title, author = %record.author, "metadata resolved");
                Some(record)
            }
            Err(e) => {
                debug!(error = %e, "metadata resolution failed");
                None
            }
        }
    }

    async fn fetch_record(&self, lookup: &Lookup) -> Result<BookRecord> {
        let edition: Edition = self.fetch_json(&lookup.api_path()).await?;

        if edition.title.trim().is_empty() {
            return Err(ReadlistError::validation("edition has an empty title"));
        }

        let mut names = Vec::with_capacity(edition.authors.len());
        for author in &edition.authors {
            let author: Author = self.fetch_json(&format!("{}.json", author.key)).await?;
            let name = author.name.trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            return Err(ReadlistError::validation(format!(
                "edition {} lists no authors",
                edition.key
            )));
        }

        Ok(self.build_record(edition, names.join(", "), lookup))
    }

    fn build_record(&self, edition: Edition, author: String, lookup: &Lookup) -> BookRecord {
        let title = match edition.subtitle.as_deref().map(str::trim) {
            Some(sub) if !sub.is_empty() => format!("{}: {sub}", edition.title.trim()),
            _ => edition.title.trim().to_string(),
        };

        let isbn = edition
            .isbn_13
            .first()
            .or(edition.isbn_10.first())
            .cloned()
            .or_else(|| match lookup {
                Lookup::Isbn(isbn) => Some(isbn.clone()),
                Lookup::Edition(_) => None,
            });

        let mut record = BookRecord::new(title, author);
        if let Some(isbn) = isbn {
            record = record.with_property("ISBN", isbn);
        }
        if let Some(pages) = edition.number_of_pages {
            record = record.with_property("PAGES", pages.to_string());
        }
        if let Some(date) = edition.publish_date {
            record = record.with_property("PUBLISHED", date);
        }
        if let Ok(url) = self.base.join(&edition.key) {
            record = record.with_property("URL", url.to_string());
        }
        record
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ReadlistError::validation(format!("bad API path '{path}': {e}")))?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ReadlistError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReadlistError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ReadlistError::validation(format!("{url}: malformed response: {e}")))
    }
}
