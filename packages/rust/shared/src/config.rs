//! Application configuration for readlist.
//!
//! User config lives at `~/.readlist/readlist.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReadlistError, Result};
use crate::types::{DEFAULT_RATING_GLYPH, Placement};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "readlist.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".readlist";

// ---------------------------------------------------------------------------
// Config structs (matching readlist.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reading-list document settings.
    #[serde(default)]
    pub library: LibrarySection,

    /// Metadata resolver settings.
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// `[library]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibrarySection {
    /// Path to the reading-list outline. `~/` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Deepest heading level offered as a category.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Default placement of new entries under a category.
    #[serde(default)]
    pub placement: Placement,

    /// Glyph repeated once per rating point.
    #[serde(default = "default_rating_glyph")]
    pub rating_glyph: String,
}

impl Default for LibrarySection {
    fn default() -> Self {
        Self {
            file: None,
            max_depth: default_max_depth(),
            placement: Placement::default(),
            rating_glyph: default_rating_glyph(),
        }
    }
}

fn default_max_depth() -> usize {
    2
}
fn default_rating_glyph() -> String {
    DEFAULT_RATING_GLYPH.into()
}

/// `[resolver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Open Library API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for each HTTP request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://openlibrary.org".into()
}
fn default_timeout_secs() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// Library config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime library configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Reading-list document; `None` means nothing is configured.
    pub file: Option<PathBuf>,
    /// Deepest heading level listed as a category.
    pub max_depth: usize,
    /// Where new entries go among a category's children.
    pub placement: Placement,
    /// Glyph used by ratings.
    pub rating_glyph: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for LibraryConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            file: config.library.file.as_deref().map(expand_home),
            max_depth: config.library.max_depth,
            placement: config.library.placement,
            rating_glyph: config.library.rating_glyph.clone(),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.readlist/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ReadlistError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.readlist/readlist.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReadlistError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ReadlistError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    if config.library.max_depth == 0 {
        return Err(ReadlistError::config("library.max_depth must be at least 1"));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReadlistError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReadlistError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReadlistError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("max_depth"));
        assert!(toml_str.contains("openlibrary.org"));
        assert!(!toml_str.contains("file ="));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.library.max_depth, 2);
        assert_eq!(parsed.library.placement, Placement::Prepend);
        assert_eq!(parsed.library.rating_glyph, ":star:");
    }

    #[test]
    fn config_with_library_file() {
        let toml_str = r#"
[library]
file = "/tmp/books.org"
placement = "append"
max_depth = 3
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        let lib = LibraryConfig::from(&config);
        assert_eq!(lib.file, Some(PathBuf::from("/tmp/books.org")));
        assert_eq!(lib.placement, Placement::Append);
        assert_eq!(lib.max_depth, 3);
    }

    #[test]
    fn home_prefix_is_expanded() {
        let expanded = expand_home("~/books.org");
        assert!(expanded.ends_with("books.org"));
        if dirs::home_dir().is_some() {
            assert!(!expanded.starts_with("~"));
        }
        assert_eq!(expand_home("/abs/books.org"), PathBuf::from("/abs/books.org"));
    }

    #[test]
    fn zero_depth_is_rejected() {
        let dir = std::env::temp_dir().join(format!("readlist-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("readlist.toml");
        std::fs::write(&path, "[library]\nmax_depth = 0\n").expect("write");

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("max_depth"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
