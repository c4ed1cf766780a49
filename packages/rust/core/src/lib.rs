//! Insertion engine and reading-list operations for readlist.
//!
//! This crate ties the outline model to the category listing and insertion
//! planner, and exposes the end-to-end operations (`add_entry`, `rate`,
//! `list_authors`, `list_categories`) through [`Library`].

pub mod categories;
pub mod library;
pub mod picker;
pub mod planner;

pub use categories::{Category, find_categories, list_categories};
pub use library::{AddOutcome, EntrySummary, Library, LogEntry};
pub use picker::{CategoryPicker, Pick, TopLevelPicker};
pub use planner::{InsertionPlan, apply_rating, insert_entry, plan_and_insert, plan_insertion};
