//! Configuration for slope ride generation.
//!
//! Session settings persist to disk as a RON file, every section falls back
//! to its defaults when missing, CLI flags override loaded values and
//! [`Config::validate`] rejects values the generator cannot work with.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig};
pub use error::ConfigError;
