//! Interactive category selection on the terminal.

use std::io::{self, BufRead, Write};

use readlist_core::{Category, CategoryPicker, Pick};

/// Numbered menu on stderr, answer read from stdin.
pub(crate) struct TerminalPicker;

impl CategoryPicker for TerminalPicker {
    fn pick(&self, categories: &[Category]) -> Pick {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stderr();
        choose(categories, &mut input, &mut output)
    }
}

/// Show `categories` and read answers until one is usable.
///
/// An empty answer files at top level; `q` or end of input cancels.
pub(crate) fn choose(
    categories: &[Category],
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Pick {
    if render_menu(categories, output).is_err() {
        return Pick::Cancelled;
    }

    let mut line = String::new();
    loop {
        if write!(output, "Category [1-{}, Enter=top level, q=cancel]: ", categories.len())
            .and_then(|()| output.flush())
            .is_err()
        {
            return Pick::Cancelled;
        }

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return Pick::Cancelled,
            Ok(_) => {}
        }

        match parse_answer(line.trim(), categories.len()) {
            Answer::Index(i) => return Pick::Category(categories[i].heading.clone()),
            Answer::TopLevel => return Pick::TopLevel,
            Answer::Quit => return Pick::Cancelled,
            Answer::Invalid => {
                let _ = writeln!(output, "  not a choice: '{}'", line.trim());
            }
        }
    }
}

fn render_menu(categories: &[Category], output: &mut impl Write) -> io::Result<()> {
    let width = categories.len().to_string().len();
    for (i, category) in categories.iter().enumerate() {
        writeln!(output, "{:>width$}) {}", i + 1, category.label)?;
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Answer {
    Index(usize),
    TopLevel,
    Quit,
    Invalid,
}

fn parse_answer(answer: &str, count: usize) -> Answer {
    if answer.is_empty() {
        return Answer::TopLevel;
    }
    if answer.eq_ignore_ascii_case("q") {
        return Answer::Quit;
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Answer::Index(n - 1),
        _ => Answer::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readlist_shared::HeadingRef;

    fn categories() -> Vec<Category> {
        vec![
            Category {
                label: "Fiction".into(),
                heading: HeadingRef::new(0, "Fiction"),
                level: 1,
                path: vec!["Fiction".into()],
                is_entry: false,
            },
            Category {
                label: "  Sci-Fi".into(),
                heading: HeadingRef::new(10, "Sci-Fi"),
                level: 2,
                path: vec!["Fiction".into(), "Sci-Fi".into()],
                is_entry: false,
            },
        ]
    }

    fn run(answers: &str) -> (Pick, String) {
        let mut input = answers.as_bytes();
        let mut output = Vec::new();
        let pick = choose(&categories(), &mut input, &mut output);
        (pick, String::from_utf8(output).unwrap())
    }

    #[test]
    fn numbered_choice() {
        let (pick, shown) = run("2\n");
        assert_eq!(pick, Pick::Category(HeadingRef::new(10, "Sci-Fi")));
        assert!(shown.contains("1) Fiction"));
        assert!(shown.contains("2)   Sci-Fi"));
    }

    #[test]
    fn empty_answer_is_top_level() {
        assert_eq!(run("\n").0, Pick::TopLevel);
    }

    #[test]
    fn quit_and_eof_cancel() {
        assert_eq!(run("q\n").0, Pick::Cancelled);
        assert_eq!(run("").0, Pick::Cancelled);
    }

    #[test]
    fn invalid_answers_reprompt() {
        let (pick, shown) = run("7\nfoo\n1\n");
        assert_eq!(pick, Pick::Category(HeadingRef::new(0, "Fiction")));
        assert!(shown.contains("not a choice: '7'"));
        assert!(shown.contains("not a choice: 'foo'"));
    }
}
