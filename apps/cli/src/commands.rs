//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, bail, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use readlist_core::{
    AddOutcome, Category, CategoryPicker, EntrySummary, Library, Pick, TopLevelPicker,
    find_categories,
};
use readlist_resolver::{OpenLibraryResolver, ResolverOptions};
use readlist_shared::{
    AppConfig, BookRecord, LibraryConfig, Placement, ReadlistError, init_config, load_config,
};

use crate::prompt::TerminalPicker;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// readlist: a reading list kept in an Org-mode outline.
#[derive(Parser)]
#[command(
    name = "readlist",
    version,
    about = "Keep a reading list in an Org-mode file: add books, file them by category, rate them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Reading-list file (overrides `library.file` from the config).
    #[arg(long, env = "READLIST_FILE", global = true)]
    pub file: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where a new entry should be filed.
#[derive(clap::Args, Debug)]
pub(crate) struct FilingArgs {
    /// Category heading to file under; `Parent/Child` narrows the match.
    #[arg(short, long, conflicts_with = "top_level")]
    pub category: Option<String>,

    /// File as a new top-level heading without asking.
    #[arg(long)]
    pub top_level: bool,

    /// Add after the category's existing children instead of before.
    #[arg(long)]
    pub bottom: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Add a book entry by hand.
    Add {
        /// Book title.
        title: String,

        /// Author(s), written as given.
        #[arg(short, long)]
        author: String,

        /// Extra property as KEY=VALUE (repeatable).
        #[arg(short, long = "prop", value_parser = parse_property)]
        props: Vec<(String, String)>,

        #[command(flatten)]
        filing: FilingArgs,
    },

    /// Add a book by ISBN or Open Library URL.
    AddIsbn {
        /// ISBN-10, ISBN-13, or an Open Library edition URL.
        source: String,

        #[command(flatten)]
        filing: FilingArgs,
    },

    /// List candidate categories.
    Categories {
        /// Deepest heading level to list (defaults to `library.max_depth`).
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// List every author in the reading list.
    Authors,

    /// Set the star rating of a book.
    Rate {
        /// Title (or part of it) of the book.
        title: String,

        /// Number of stars; zero or less leaves the entry unchanged.
        #[arg(allow_negative_numbers = true)]
        rating: i64,
    },

    /// Mark a book as being read.
    Start {
        /// Title (or part of it) of the book.
        title: String,
    },

    /// Mark a book as read, stamping the closing time.
    Finish {
        /// Title (or part of it) of the book.
        title: String,

        /// Rate the book in the same step.
        #[arg(short, long)]
        rating: Option<i64>,
    },

    /// Show finished books, oldest first.
    Log,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

fn parse_property(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) || key.contains(':') {
        return Err(format!("invalid property name '{key}'"));
    }
    Ok((key.to_uppercase(), value.trim().to_string()))
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "readlist=info",
        1 => "readlist=debug",
        _ => "readlist=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let Cli { file, command, .. } = cli;

    match command {
        Command::Add {
            title,
            author,
            props,
            filing,
        } => {
            let record = props
                .into_iter()
                .fold(BookRecord::new(title, author), |r, (k, v)| r.with_property(k, v));
            cmd_add(file, &record, &filing)
        }
        Command::AddIsbn { source, filing } => cmd_add_isbn(file, &source, &filing).await,
        Command::Categories { depth } => cmd_categories(file, depth),
        Command::Authors => cmd_authors(file),
        Command::Rate { title, rating } => cmd_rate(file, &title, rating),
        Command::Start { title } => cmd_start(file, &title),
        Command::Finish { title, rating } => cmd_finish(file, &title, rating),
        Command::Log => cmd_log(file),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Build the library from the config file plus CLI overrides.
fn open_library(file: Option<PathBuf>, bottom: bool) -> Result<Library> {
    Ok(library_from(&load_config()?, file, bottom))
}

fn library_from(config: &AppConfig, file: Option<PathBuf>, bottom: bool) -> Library {
    let mut library_config = LibraryConfig::from(config);
    if file.is_some() {
        library_config.file = file;
    }
    if bottom {
        library_config.placement = Placement::Append;
    }
    Library::new(library_config)
}

// ---------------------------------------------------------------------------
// Adding entries
// ---------------------------------------------------------------------------

fn cmd_add(file: Option<PathBuf>, record: &BookRecord, filing: &FilingArgs) -> Result<()> {
    let library = open_library(file, filing.bottom)?;
    let picker = filing_picker(&library, filing)?;
    let outcome = library.add_entry(record, picker.as_ref())?;
    report_added(&record.title, &outcome);
    Ok(())
}

async fn cmd_add_isbn(file: Option<PathBuf>, source: &str, filing: &FilingArgs) -> Result<()> {
    let config = load_config()?;
    let library = library_from(&config, file, filing.bottom);
    // Fail on a missing target before going to the network.
    library.file()?;

    let resolver = OpenLibraryResolver::new(&ResolverOptions::from(&config.resolver))?;

    info!(source, "resolving book metadata");
    let spinner = spinner(format!("Looking up {source}"));
    let record = resolver.resolve(source).await;
    spinner.finish_and_clear();

    let outcome = file_resolved(&library, source, record, filing)?;
    report_added(&outcome.0, &outcome.1);
    Ok(())
}

/// File a looked-up record. A failed lookup is reported before any
/// `--category` matching happens.
fn file_resolved(
    library: &Library,
    source: &str,
    record: Option<BookRecord>,
    filing: &FilingArgs,
) -> Result<(String, AddOutcome)> {
    let Some(record) = record else {
        return Err(ReadlistError::unresolved(source).into());
    };
    println!("  Found: {} by {}", record.title, record.author);

    let picker = filing_picker(library, filing)?;
    let title = record.title.clone();
    let outcome = library.add_resolved(source, Some(record), picker.as_ref())?;
    Ok((title, outcome))
}

/// Pick the category source implied by the filing flags.
fn filing_picker(library: &Library, filing: &FilingArgs) -> Result<Box<dyn CategoryPicker>> {
    if filing.top_level {
        return Ok(Box::new(TopLevelPicker));
    }
    let Some(query) = &filing.category else {
        return Ok(Box::new(TerminalPicker));
    };

    let categories = library.list_categories(None)?;
    let target = match find_categories(&categories, query).as_slice() {
        [] => bail!("no category matches '{query}'; run `readlist categories` to see them"),
        [only] => only.heading.clone(),
        many => bail!(
            "'{query}' matches several categories ({}); use Parent/Child to narrow it",
            many.iter()
                .map(|c| c.path.join("/"))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };

    Ok(Box::new(move |_: &[Category]| Pick::Category(target.clone())))
}

fn report_added(title: &str, outcome: &AddOutcome) {
    match outcome {
        AddOutcome::Added { category, plan } => {
            let place = category
                .as_ref()
                .map_or_else(|| "top level".to_string(), |c| format!("'{}'", c.title));
            println!("  Added '{title}' under {place} (level {})", plan.level);
        }
        AddOutcome::Cancelled => println!("  Cancelled; nothing written."),
    }
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

fn cmd_categories(file: Option<PathBuf>, depth: Option<usize>) -> Result<()> {
    if depth == Some(0) {
        bail!("--depth must be at least 1");
    }
    let library = open_library(file, false)?;
    let categories = library.list_categories(depth)?;
    if categories.is_empty() {
        println!("  (no headings yet; new entries go to the top level)");
    }
    for category in &categories {
        println!("{}", category.label);
    }
    Ok(())
}

fn cmd_authors(file: Option<PathBuf>) -> Result<()> {
    let library = open_library(file, false)?;
    for author in library.list_authors()? {
        println!("{author}");
    }
    Ok(())
}

fn cmd_log(file: Option<PathBuf>) -> Result<()> {
    let library = open_library(file, false)?;
    let log = library.reading_log()?;
    if log.is_empty() {
        println!("  (nothing finished yet)");
    }
    for item in &log {
        let rating = item.entry.rating.as_deref().unwrap_or("");
        println!(
            "{}  {} by {} {rating}",
            item.closed.format("%Y-%m-%d"),
            item.entry.heading.title,
            item.entry.author
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Updating entries
// ---------------------------------------------------------------------------

fn cmd_rate(file: Option<PathBuf>, title: &str, rating: i64) -> Result<()> {
    let library = open_library(file, false)?;
    let entry = find_one(&library, title)?;
    library.rate(&entry.heading, rating)?;
    if rating > 0 {
        println!("  Rated '{}' with {rating} star(s)", entry.heading.title);
    } else {
        println!("  Rating {rating} ignored; '{}' unchanged", entry.heading.title);
    }
    Ok(())
}

fn cmd_start(file: Option<PathBuf>, title: &str) -> Result<()> {
    let library = open_library(file, false)?;
    let entry = find_one(&library, title)?;
    library.start_reading(&entry.heading)?;
    println!("  Reading '{}'", entry.heading.title);
    Ok(())
}

fn cmd_finish(file: Option<PathBuf>, title: &str, rating: Option<i64>) -> Result<()> {
    let library = open_library(file, false)?;
    let entry = find_one(&library, title)?;
    library.finish_reading(&entry.heading, rating)?;
    println!("  Finished '{}'", entry.heading.title);
    Ok(())
}

/// The single entry matching `query`; an exact title wins over partial matches.
fn find_one(library: &Library, query: &str) -> Result<EntrySummary> {
    let mut matches = library.find_entries(query)?;

    if let Some(pos) = matches
        .iter()
        .position(|e| e.heading.title.eq_ignore_ascii_case(query))
    {
        return Ok(matches.swap_remove(pos));
    }

    match matches.len() {
        0 => Err(eyre!("no book entry titled '{query}'")),
        1 => Ok(matches.remove(0)),
        _ => Err(eyre!(
            "'{query}' matches several entries: {}",
            matches
                .iter()
                .map(|e| e.heading.title.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        )),
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn property_arguments() {
        assert_eq!(
            parse_property("isbn=0441013597").unwrap(),
            ("ISBN".to_string(), "0441013597".to_string())
        );
        assert_eq!(
            parse_property("URL=https://a.b/c?d=e").unwrap().1,
            "https://a.b/c?d=e"
        );
        assert!(parse_property("novalue").is_err());
        assert!(parse_property("=x").is_err());
        assert!(parse_property("TWO WORDS=x").is_err());
    }

    #[test]
    fn add_flags_parse() {
        let cli = Cli::try_parse_from([
            "readlist", "add", "Dune", "--author", "Frank Herbert", "--prop", "PAGES=604",
            "--category", "Fiction/Sci-Fi", "--bottom",
        ])
        .unwrap();
        match cli.command {
            Command::Add {
                title,
                author,
                props,
                filing,
            } => {
                assert_eq!(title, "Dune");
                assert_eq!(author, "Frank Herbert");
                assert_eq!(props, vec![("PAGES".to_string(), "604".to_string())]);
                assert_eq!(filing.category.as_deref(), Some("Fiction/Sci-Fi"));
                assert!(filing.bottom);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn category_and_top_level_conflict() {
        let parsed = Cli::try_parse_from([
            "readlist", "add-isbn", "0441013597", "--category", "Fiction", "--top-level",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_overrides_config() {
        let config = AppConfig::default();
        let library = library_from(&config, Some(PathBuf::from("/tmp/books.org")), true);
        assert_eq!(library.file().unwrap(), std::path::Path::new("/tmp/books.org"));
        assert_eq!(library.config().placement, Placement::Append);

        let library = library_from(&config, None, false);
        assert_eq!(library.config().placement, Placement::Prepend);
    }

    #[test]
    fn failed_lookup_is_reported_before_category_match() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("books.org");
        std::fs::write(&path, "* Sci-Fi\n").unwrap();
        let library = library_from(&AppConfig::default(), Some(path.clone()), false);
        let filing = FilingArgs {
            category: Some("Poetry".into()),
            top_level: false,
            bottom: false,
        };

        let err = file_resolved(&library, "0441013597", None, &filing).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReadlistError>(),
            Some(ReadlistError::MetadataResolutionFailed { .. })
        ));

        // with a record, the unknown category is what fails
        let record = BookRecord::new("Dune", "Frank Herbert");
        let err = file_resolved(&library, "0441013597", Some(record), &filing).unwrap_err();
        assert!(err.to_string().contains("no category matches 'Poetry'"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "* Sci-Fi\n");
    }

    #[test]
    fn negative_rating_parses() {
        let cli = Cli::try_parse_from(["readlist", "rate", "Dune", "-1"]).unwrap();
        assert!(matches!(cli.command, Command::Rate { rating: -1, .. }));
    }
}
