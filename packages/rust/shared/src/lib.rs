//! Shared types, error model, and configuration for readlist.
//!
//! This crate is the foundation depended on by all other readlist crates.
//! It provides:
//! - [`ReadlistError`], the unified error type
//! - Domain types ([`Placement`], [`BookRecord`], [`HeadingRef`])
//! - Configuration ([`AppConfig`], [`LibraryConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, LibraryConfig, LibrarySection, ResolverConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{ReadlistError, Result};
pub use types::{BookRecord, DEFAULT_RATING_GLYPH, HeadingRef, Placement};
