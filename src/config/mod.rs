//! Configuration module for the listing resolver
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use listing_resolver::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("resolver.toml")).unwrap();
//! println!("Feed TTL: {}h", config.feed.ttl_hours);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FeedConfig, FetcherConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
