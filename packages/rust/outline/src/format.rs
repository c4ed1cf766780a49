//! Serialization of new entry blocks.

use chrono::{Local, NaiveDate};

use crate::{ADDED, AUTHOR, DATE_FORMAT};

/// Serialize a heading block stamped with today's date.
///
/// See [`format_heading_block`] for the layout.
pub fn write_heading_block(
    level: usize,
    title: &str,
    author: &str,
    properties: &[(String, String)],
) -> String {
    format_heading_block(level, title, author, properties, Local::now().date_naive())
}

/// Serialize a heading block with an explicit `ADDED` date.
///
/// ```text
/// ** Title
/// :PROPERTIES:
/// :AUTHOR: Author
/// :ADDED: 2024-05-01
/// :KEY: value        (one per caller property, in order)
/// :END:
/// ```
///
/// Caller properties named `AUTHOR` or `ADDED` are dropped; those two are
/// always taken from the arguments. Newlines inside values are flattened so a
/// value can never break out of the drawer.
pub fn format_heading_block(
    level: usize,
    title: &str,
    author: &str,
    properties: &[(String, String)],
    added: NaiveDate,
) -> String {
    let mut block = String::new();
    block.push_str(&"*".repeat(level.max(1)));
    block.push(' ');
    block.push_str(&single_line(title));
    block.push('\n');

    block.push_str(":PROPERTIES:\n");
    push_property(&mut block, AUTHOR, author);
    push_property(&mut block, ADDED, &added.format(DATE_FORMAT).to_string());
    for (name, value) in properties {
        if name.eq_ignore_ascii_case(AUTHOR) || name.eq_ignore_ascii_case(ADDED) {
            continue;
        }
        push_property(&mut block, name, value);
    }
    block.push_str(":END:\n");
    block
}

/// A single `:NAME: value` drawer line, without terminator.
pub(crate) fn property_line(name: &str, value: &str) -> String {
    let value = single_line(value);
    if value.is_empty() {
        format!(":{name}:")
    } else {
        format!(":{name}: {value}")
    }
}

fn push_property(block: &mut String, name: &str, value: &str) {
    block.push_str(&property_line(name, value));
    block.push('\n');
}

fn single_line(s: &str) -> String {
    s.lines().map(str::trim).collect::<Vec<_>>().join(" ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn block_layout() {
        let props = vec![("ISBN".to_string(), "9780441013593".to_string())];
        let block = format_heading_block(2, "Dune", "Frank Herbert", &props, date());
        assert_eq!(
            block,
            "** Dune\n:PROPERTIES:\n:AUTHOR: Frank Herbert\n:ADDED: 2024-05-01\n:ISBN: 9780441013593\n:END:\n"
        );
    }

    #[test]
    fn caller_properties_keep_order() {
        let props = vec![
            ("PAGES".to_string(), "412".to_string()),
            ("ISBN".to_string(), "1".to_string()),
        ];
        let block = format_heading_block(1, "Dune", "F", &props, date());
        let pages = block.find(":PAGES:").unwrap();
        let isbn = block.find(":ISBN:").unwrap();
        assert!(pages < isbn);
    }

    #[test]
    fn reserved_properties_are_not_duplicated() {
        let props = vec![
            ("author".to_string(), "Someone Else".to_string()),
            ("ADDED".to_string(), "1999-01-01".to_string()),
        ];
        let block = format_heading_block(1, "Dune", "Frank Herbert", &props, date());
        assert_eq!(block.matches("AUTHOR").count(), 1);
        assert!(!block.contains("Someone Else"));
        assert!(!block.contains("1999-01-01"));
    }

    #[test]
    fn empty_title_and_multi_author() {
        let block = format_heading_block(1, "", "Alice, Bob", &[], date());
        assert!(block.starts_with("* \n"));
        assert!(block.contains(":AUTHOR: Alice, Bob\n"));
    }

    #[test]
    fn newlines_are_flattened() {
        let block = format_heading_block(3, "Two\nLines", "A\nB", &[], date());
        assert!(block.starts_with("*** Two Lines\n"));
        assert!(block.contains(":AUTHOR: A B\n"));
    }

    #[test]
    fn write_stamps_today() {
        let first = write_heading_block(1, "Dune", "Frank Herbert", &[]);
        let second = write_heading_block(1, "Dune", "Frank Herbert", &[]);
        let today = Local::now().date_naive().format(DATE_FORMAT).to_string();
        assert!(first.contains(&format!(":ADDED: {today}\n")));
        // Only the date can differ, and only across a midnight boundary.
        let strip = |s: &str| {
            s.lines()
                .filter(|l| !l.starts_with(":ADDED:"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(strip(&first), strip(&second));
    }
}
