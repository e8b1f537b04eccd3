//! Configuration loading and validation
//!
//! Configuration is read from a TOML file with kebab-case keys. Loading
//! validates the values up front so a bad config fails before any work
//! is dispatched.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    Config, IdentifierConfig, IdentifierMode, OutputConfig, RunConfig, SourceConfig,
};
pub use validation::validate;
