//! Category selection boundary.
//!
//! The interactive picker lives outside the core; it is handed the category
//! list and answers synchronously.

use readlist_shared::HeadingRef;

use crate::categories::Category;

/// Outcome of asking a picker for a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pick {
    /// File the entry under this heading.
    Category(HeadingRef),
    /// File the entry as a new top-level heading.
    TopLevel,
    /// Abort; nothing is written.
    Cancelled,
}

/// Chooses where a new entry goes.
pub trait CategoryPicker {
    /// Called only when `categories` is non-empty.
    fn pick(&self, categories: &[Category]) -> Pick;
}

impl<F> CategoryPicker for F
where
    F: Fn(&[Category]) -> Pick,
{
    fn pick(&self, categories: &[Category]) -> Pick {
        self(categories)
    }
}

/// Always files at top level. For headless use and tests.
pub struct TopLevelPicker;

impl CategoryPicker for TopLevelPicker {
    fn pick(&self, _categories: &[Category]) -> Pick {
        Pick::TopLevel
    }
}
