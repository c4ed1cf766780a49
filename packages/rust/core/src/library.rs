//! Reading-list operations over the configured document.
//!
//! [`Library`] holds configuration only. Each operation opens the document
//! fresh, does its work in memory, and writes back once at the end, so a
//! failing operation never leaves a partial edit on disk.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, instrument};

use readlist_outline::{AUTHOR, Document, Heading, RATING, STATUS};
use readlist_shared::{BookRecord, HeadingRef, LibraryConfig, ReadlistError, Result};

use crate::categories::{self, Category};
use crate::picker::{CategoryPicker, Pick};
use crate::planner::{self, InsertionPlan};

/// `STATUS` of an entry being read.
pub const READING_STATUS: &str = "READING";
/// `STATUS` of a finished entry.
pub const READ_STATUS: &str = "READ";

/// Result of [`Library::add_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The entry was written.
    Added {
        /// Category it was filed under; `None` for top level.
        category: Option<HeadingRef>,
        plan: InsertionPlan,
    },
    /// The picker cancelled; the document was not touched.
    Cancelled,
}

/// A book entry as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
    pub heading: HeadingRef,
    pub author: String,
    pub status: Option<String>,
    pub rating: Option<String>,
}

impl EntrySummary {
    fn from_heading(heading: &Heading) -> Self {
        Self {
            heading: heading.reference(),
            author: heading.properties.get(AUTHOR).unwrap_or_default().to_string(),
            status: heading.properties.get(STATUS).map(String::from),
            rating: heading.properties.get(RATING).map(String::from),
        }
    }
}

/// A finished book with its closing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub entry: EntrySummary,
    pub closed: NaiveDateTime,
}

/// The configured reading list.
#[derive(Debug, Clone)]
pub struct Library {
    config: LibraryConfig,
}

impl Library {
    pub fn new(config: LibraryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Path of the configured document.
    pub fn file(&self) -> Result<&Path> {
        self.config.file.as_deref().ok_or(ReadlistError::NoTargetFile)
    }

    fn open(&self) -> Result<Document> {
        Document::open(self.file()?)
    }

    // --- Reads ---

    /// Candidate categories down to `max_depth` (config default when `None`).
    pub fn list_categories(&self, max_depth: Option<usize>) -> Result<Vec<Category>> {
        let doc = self.open()?;
        let depth = max_depth.unwrap_or(self.config.max_depth);
        Ok(categories::list_categories(&doc, depth))
    }

    /// Every distinct author, split on commas, in lexicographic order.
    pub fn list_authors(&self) -> Result<BTreeSet<String>> {
        let doc = self.open()?;
        Ok(doc.property_values(AUTHOR))
    }

    /// Entries whose title contains `query` (case-insensitive).
    pub fn find_entries(&self, query: &str) -> Result<Vec<EntrySummary>> {
        let doc = self.open()?;
        let needle = query.to_lowercase();
        Ok(doc
            .entries()
            .iter()
            .filter(|h| h.title.to_lowercase().contains(&needle))
            .map(EntrySummary::from_heading)
            .collect())
    }

    /// Finished entries, oldest first.
    pub fn reading_log(&self) -> Result<Vec<LogEntry>> {
        let doc = self.open()?;
        let mut log: Vec<LogEntry> = doc
            .entries()
            .iter()
            .filter_map(|h| {
                doc.closed_timestamp(h).map(|closed| LogEntry {
                    entry: EntrySummary::from_heading(h),
                    closed,
                })
            })
            .collect();
        log.sort_by_key(|e| e.closed);
        Ok(log)
    }

    // --- Writes ---

    /// File a new entry where `picker` says.
    ///
    /// With no headings in the document the picker is not consulted and the
    /// entry becomes a top-level heading at the end.
    #[instrument(skip_all, fields(title = %record.title, placement = %self.config.placement))]
    pub fn add_entry(&self, record: &BookRecord, picker: &dyn CategoryPicker) -> Result<AddOutcome> {
        let mut doc = self.open()?;
        let categories = categories::list_categories(&doc, self.config.max_depth);

        let target = if categories.is_empty() {
            debug!("no categories, filing at top level");
            None
        } else {
            match picker.pick(&categories) {
                Pick::Category(target) => Some(target),
                Pick::TopLevel => None,
                Pick::Cancelled => {
                    info!("category selection cancelled");
                    return Ok(AddOutcome::Cancelled);
                }
            }
        };

        let plan = planner::plan_and_insert(&mut doc, target.as_ref(), record, self.config.placement)?;
        info!(
            level = plan.level,
            offset = plan.offset,
            category = target.as_ref().map_or("<top>", |t| t.title.as_str()),
            "entry added"
        );

        Ok(AddOutcome::Added {
            category: target,
            plan,
        })
    }

    /// [`add_entry`](Self::add_entry) for a record from the metadata resolver.
    ///
    /// `None` means resolution failed; nothing is opened or written.
    pub fn add_resolved(
        &self,
        input: &str,
        record: Option<BookRecord>,
        picker: &dyn CategoryPicker,
    ) -> Result<AddOutcome> {
        let record = record.ok_or_else(|| ReadlistError::unresolved(input))?;
        self.add_entry(&record, picker)
    }

    /// Overwrite the rating of `target`. Non-positive ratings change nothing.
    #[instrument(skip(self))]
    pub fn rate(&self, target: &HeadingRef, rating: i64) -> Result<()> {
        if rating <= 0 {
            debug!("non-positive rating ignored");
            return Ok(());
        }
        let mut doc = self.open()?;
        planner::apply_rating(&mut doc, target, rating, &self.config.rating_glyph)?;
        doc.save()
    }

    /// Mark `target` as being read.
    #[instrument(skip(self))]
    pub fn start_reading(&self, target: &HeadingRef) -> Result<()> {
        let mut doc = self.open()?;
        let heading = doc.resolve(target)?;
        doc.set_property(&heading, STATUS, READING_STATUS)?;
        doc.save()
    }

    /// Mark `target` as read now, optionally rating it in the same write.
    pub fn finish_reading(&self, target: &HeadingRef, rating: Option<i64>) -> Result<()> {
        self.finish_reading_at(target, rating, Local::now().naive_local())
    }

    /// [`finish_reading`](Self::finish_reading) with an explicit closing time.
    #[instrument(skip(self))]
    pub fn finish_reading_at(
        &self,
        target: &HeadingRef,
        rating: Option<i64>,
        closed: NaiveDateTime,
    ) -> Result<()> {
        let mut doc = self.open()?;

        let heading = doc.resolve(target)?;
        doc.set_property(&heading, STATUS, READ_STATUS)?;
        // The drawer grew; re-resolve for the new body bounds.
        let heading = doc.resolve(target)?;
        doc.set_closed(&heading, closed)?;

        if let Some(rating) = rating {
            planner::apply_rating(&mut doc, target, rating, &self.config.rating_glyph)?;
        }

        doc.save()?;
        info!(title = %target.title, %closed, "entry finished");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    use crate::picker::TopLevelPicker;

    struct Fixture {
        _dir: tempfile::TempDir,
        path: PathBuf,
        library: Library,
    }

    impl Fixture {
        fn new(content: &str) -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("books.org");
            std::fs::write(&path, content).expect("write fixture");
            let library = Library::new(LibraryConfig {
                file: Some(path.clone()),
                ..LibraryConfig::default()
            });
            Self {
                _dir: dir,
                path,
                library,
            }
        }

        fn read(&self) -> String {
            std::fs::read_to_string(&self.path).expect("read back")
        }

        fn doc(&self) -> Document {
            Document::open(&self.path).expect("open")
        }

        fn reference(&self, title: &str) -> HeadingRef {
            self.doc()
                .headings()
                .into_iter()
                .find(|h| h.title == title)
                .map(|h| h.reference())
                .unwrap_or_else(|| panic!("no heading {title}"))
        }
    }

    fn pick_title(title: &'static str) -> impl Fn(&[Category]) -> Pick {
        move |cats: &[Category]| {
            cats.iter()
                .find(|c| c.heading.title == title)
                .map(|c| Pick::Category(c.heading.clone()))
                .unwrap_or(Pick::Cancelled)
        }
    }

    #[test]
    fn empty_document_end_to_end() {
        let fx = Fixture::new("");
        let outcome = fx
            .library
            .add_entry(&BookRecord::new("Dune", "Frank Herbert"), &TopLevelPicker)
            .unwrap();
        assert!(matches!(outcome, AddOutcome::Added { category: None, .. }));

        let doc = fx.doc();
        let headings = doc.headings();
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].level, 1);
        assert_eq!(headings[0].title, "Dune");
        assert_eq!(headings[0].properties.get("AUTHOR"), Some("Frank Herbert"));
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(headings[0].properties.get("ADDED"), Some(today.as_str()));
    }

    #[test]
    fn empty_document_skips_picker() {
        let fx = Fixture::new("");
        let cancel = |_: &[Category]| Pick::Cancelled;
        let outcome = fx
            .library
            .add_entry(&BookRecord::new("Dune", "Frank Herbert"), &cancel)
            .unwrap();
        assert!(matches!(outcome, AddOutcome::Added { .. }));
    }

    #[test]
    fn prepend_twice_under_category() {
        let fx = Fixture::new("* Sci-Fi\n");
        let picker = pick_title("Sci-Fi");

        fx.library
            .add_entry(&BookRecord::new("Dune", "Frank Herbert"), &picker)
            .unwrap();
        fx.library
            .add_entry(&BookRecord::new("Hyperion", "Dan Simmons"), &picker)
            .unwrap();

        let doc = fx.doc();
        let children: Vec<_> = doc
            .headings()
            .into_iter()
            .filter(|h| h.level == 2)
            .map(|h| h.title)
            .collect();
        assert_eq!(children, vec!["Hyperion", "Dune"]);
    }

    #[test]
    fn append_placement_from_config() {
        let fx = Fixture::new("* Sci-Fi\n");
        let library = Library::new(LibraryConfig {
            placement: readlist_shared::Placement::Append,
            ..fx.library.config().clone()
        });
        let picker = pick_title("Sci-Fi");
        library
            .add_entry(&BookRecord::new("Dune", "Frank Herbert"), &picker)
            .unwrap();
        library
            .add_entry(&BookRecord::new("Hyperion", "Dan Simmons"), &picker)
            .unwrap();

        let titles: Vec<_> = fx.doc().headings().into_iter().map(|h| h.title).collect();
        assert_eq!(titles, vec!["Sci-Fi", "Dune", "Hyperion"]);
    }

    #[test]
    fn cancelled_pick_writes_nothing() {
        let fx = Fixture::new("* Sci-Fi\n");
        let cancel = |_: &[Category]| Pick::Cancelled;
        let outcome = fx
            .library
            .add_entry(&BookRecord::new("Dune", "Frank Herbert"), &cancel)
            .unwrap();
        assert_eq!(outcome, AddOutcome::Cancelled);
        assert_eq!(fx.read(), "* Sci-Fi\n");
    }

    #[test]
    fn unresolved_metadata_writes_nothing() {
        let fx = Fixture::new("* Sci-Fi\n");
        let err = fx
            .library
            .add_resolved("978-bogus", None, &TopLevelPicker)
            .unwrap_err();
        assert!(matches!(err, ReadlistError::MetadataResolutionFailed { .. }));
        assert_eq!(fx.read(), "* Sci-Fi\n");
    }

    #[test]
    fn missing_configuration_and_file() {
        let library = Library::new(LibraryConfig::default());
        assert!(matches!(
            library.list_authors(),
            Err(ReadlistError::NoTargetFile)
        ));

        let library = Library::new(LibraryConfig {
            file: Some(PathBuf::from("/nonexistent/dir/books.org")),
            ..LibraryConfig::default()
        });
        assert!(matches!(
            library.add_entry(&BookRecord::new("Dune", "F"), &TopLevelPicker),
            Err(ReadlistError::DocumentUnavailable { .. })
        ));
    }

    #[test]
    fn authors_and_categories() {
        let fx = Fixture::new(
            "* Fiction\n** Dune\n:PROPERTIES:\n:AUTHOR: Frank Herbert\n:END:\n\
             ** Good Omens\n:PROPERTIES:\n:AUTHOR: Terry Pratchett, Neil Gaiman\n:END:\n",
        );
        let authors: Vec<_> = fx.library.list_authors().unwrap().into_iter().collect();
        assert_eq!(authors, vec!["Frank Herbert", "Neil Gaiman", "Terry Pratchett"]);

        let cats = fx.library.list_categories(Some(1)).unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(fx.library.list_categories(None).unwrap().len(), 3);
    }

    #[test]
    fn rate_overwrites_and_ignores_non_positive() {
        let fx = Fixture::new("* Dune\n:PROPERTIES:\n:AUTHOR: Frank Herbert\n:END:\n");
        let dune = fx.reference("Dune");

        fx.library.rate(&dune, 3).unwrap();
        assert!(fx.read().contains(":RATING: :star::star::star:\n"));

        fx.library.rate(&dune, 0).unwrap();
        fx.library.rate(&dune, -3).unwrap();
        assert!(fx.read().contains(":RATING: :star::star::star:\n"));

        fx.library.rate(&dune, 1).unwrap();
        assert!(fx.read().contains(":RATING: :star:\n"));
        assert_eq!(fx.read().matches(":RATING:").count(), 1);
    }

    #[test]
    fn rate_stale_reference_is_invalid_target() {
        let fx = Fixture::new("* Dune\n:PROPERTIES:\n:AUTHOR: Frank Herbert\n:END:\n");
        let dune = fx.reference("Dune");
        std::fs::write(&fx.path, "* Preface\n* Dune\n").unwrap();

        let err = fx.library.rate(&dune, 4).unwrap_err();
        assert!(matches!(err, ReadlistError::InvalidTarget { .. }));
        assert_eq!(fx.read(), "* Preface\n* Dune\n");
    }

    #[test]
    fn reading_lifecycle_and_log() {
        let fx = Fixture::new(
            "* Dune\n:PROPERTIES:\n:AUTHOR: Frank Herbert\n:END:\n\
             * Hyperion\n:PROPERTIES:\n:AUTHOR: Dan Simmons\n:END:\n",
        );

        fx.library.start_reading(&fx.reference("Hyperion")).unwrap();
        assert!(fx.read().contains("* Hyperion\n:PROPERTIES:\n:AUTHOR: Dan Simmons\n:STATUS: READING\n:END:\n"));

        let late = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let early = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(22, 30, 0).unwrap();
        fx.library
            .finish_reading_at(&fx.reference("Hyperion"), Some(4), late)
            .unwrap();
        fx.library
            .finish_reading_at(&fx.reference("Dune"), None, early)
            .unwrap();

        let text = fx.read();
        assert!(text.contains(":STATUS: READ\n"));
        assert!(text.contains(":END:\nCLOSED: [2024-06-02 Sun 09:00]\n"));
        assert!(text.contains(":RATING: :star::star::star::star:\n"));

        let log = fx.library.reading_log().unwrap();
        let titles: Vec<_> = log.iter().map(|e| e.entry.heading.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Hyperion"]);
        assert_eq!(log[1].entry.status.as_deref(), Some("READ"));
        assert_eq!(log[1].closed, late);
    }

    #[test]
    fn keyword_like_title_survives_add_and_lifecycle() {
        let fx = Fixture::new("* Sci-Fi\n");
        let under_scifi = pick_title("Sci-Fi");
        fx.library
            .add_entry(&BookRecord::new("DONE Deal", "A"), &under_scifi)
            .unwrap();

        let titles: Vec<_> = fx.doc().headings().into_iter().map(|h| h.title).collect();
        assert_eq!(titles, vec!["Sci-Fi", "DONE Deal"]);

        let deal = fx.reference("DONE Deal");
        fx.library.start_reading(&deal).unwrap();
        fx.library.finish_reading(&deal, Some(2)).unwrap();

        let found = fx.library.find_entries("done deal").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].heading.title, "DONE Deal");
        assert_eq!(found[0].status.as_deref(), Some("READ"));
        assert!(fx.read().contains("** DONE Deal\n"));
    }

    #[test]
    fn find_entries_by_title() {
        let fx = Fixture::new(
            "* Sci-Fi\n** Dune\n:PROPERTIES:\n:AUTHOR: Frank Herbert\n:END:\n\
             ** Dune Messiah\n:PROPERTIES:\n:AUTHOR: Frank Herbert\n:END:\n",
        );
        let found = fx.library.find_entries("dune").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].author, "Frank Herbert");
        assert!(fx.library.find_entries("sci").unwrap().is_empty());
    }
}
