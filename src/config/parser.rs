use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let config: Config = toml::from_str(&content)?;

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is used to detect if the configuration has changed between runs.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::IdentifierMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[run]
concurrency-limit = 8
min-interval-ms = 250
max-attempts = 3
request-timeout-secs = 30

[identifiers]
mode = "range"
start-imo = 9200000
end-imo = 9200100

[output]
checkpoint-path = "./harvest.db"
records-dir = "./records"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.run.concurrency_limit, 8);
        assert_eq!(config.run.min_interval_ms, 250);
        assert_eq!(config.identifiers.mode, IdentifierMode::Range);
        assert_eq!(config.identifiers.start_imo, Some(9_200_000));
        assert!(config.identifiers.validate_checksum);
        assert_eq!(config.source.base_url, "https://www.balticshipping.com");
    }

    #[test]
    fn test_load_list_mode_config() {
        let config_content = r#"
[run]
concurrency-limit = 2

[identifiers]
mode = "list"
list = [9538428, 9335173]
validate-checksum = false

[source]
base-url = "https://vessels.example.com"

[output]
checkpoint-path = "./harvest.db"
records-dir = "./records"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.identifiers.mode, IdentifierMode::List);
        assert_eq!(config.identifiers.list, Some(vec![9538428, 9335173]));
        assert!(!config.identifiers.validate_checksum);
        assert_eq!(config.source.base_url, "https://vessels.example.com");
        // Defaults for omitted run keys
        assert_eq!(config.run.max_attempts, 3);
        assert_eq!(config.run.request_timeout_secs, 30);
        assert_eq!(config.run.min_interval_ms, 0);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[run]
concurrency-limit = 0

[identifiers]
mode = "range"
start-imo = 9200000
end-imo = 9200100

[output]
checkpoint-path = "./harvest.db"
records-dir = "./records"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let config_content = "test content";
        let file = create_temp_config(config_content);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
