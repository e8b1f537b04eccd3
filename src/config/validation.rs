use crate::config::types::{Config, IdentifierMode};
use crate::ConfigError;
use url::Url;

/// Validates a loaded configuration
///
/// Checks numeric bounds on the run section and the cross-field
/// requirements of each identifier mode. Returns the first problem found.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_run(config)?;
    validate_identifiers(config)?;
    validate_source(config)?;
    validate_output(config)?;
    Ok(())
}

fn validate_run(config: &Config) -> Result<(), ConfigError> {
    let run = &config.run;

    if run.concurrency_limit == 0 {
        return Err(ConfigError::Validation(
            "concurrency-limit must be at least 1".to_string(),
        ));
    }

    if run.concurrency_limit > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency-limit must be at most 100 (got {})",
            run.concurrency_limit
        )));
    }

    if run.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "max-attempts must be at least 1".to_string(),
        ));
    }

    if run.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_identifiers(config: &Config) -> Result<(), ConfigError> {
    let ids = &config.identifiers;

    match ids.mode {
        IdentifierMode::Range => {
            if ids.start_imo.is_none() || ids.end_imo.is_none() {
                return Err(ConfigError::Validation(
                    "range mode requires start-imo and end-imo".to_string(),
                ));
            }
        }
        IdentifierMode::List => {
            if ids.list.is_none() {
                return Err(ConfigError::Validation(
                    "list mode requires a list of IMO numbers".to_string(),
                ));
            }
        }
        IdentifierMode::UrlFile => {
            if ids.url_file.is_none() {
                return Err(ConfigError::Validation(
                    "url-file mode requires a url-file path".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_source(config: &Config) -> Result<(), ConfigError> {
    let base = &config.source.base_url;

    let url = Url::parse(base)
        .map_err(|e| ConfigError::Validation(format!("base-url is not a valid URL: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url must use http or https (got {})",
            url.scheme()
        )));
    }

    Ok(())
}

fn validate_output(config: &Config) -> Result<(), ConfigError> {
    if config.output.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-path must not be empty".to_string(),
        ));
    }

    if config.output.records_dir.is_empty() {
        return Err(ConfigError::Validation(
            "records-dir must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{IdentifierConfig, OutputConfig, RunConfig, SourceConfig};

    fn base_config() -> Config {
        Config {
            run: RunConfig {
                concurrency_limit: 4,
                min_interval_ms: 250,
                max_attempts: 3,
                request_timeout_secs: 30,
            },
            identifiers: IdentifierConfig {
                mode: IdentifierMode::Range,
                start_imo: Some(9_200_000),
                end_imo: Some(9_200_100),
                list: None,
                url_file: None,
                validate_checksum: true,
            },
            source: SourceConfig::default(),
            output: OutputConfig {
                checkpoint_path: "./harvest.db".to_string(),
                records_dir: "./records".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = base_config();
        config.run.concurrency_limit = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_excessive_concurrency_rejected() {
        let mut config = base_config();
        config.run.concurrency_limit = 101;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let mut config = base_config();
        config.run.max_attempts = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = base_config();
        config.run.request_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_range_mode_requires_bounds() {
        let mut config = base_config();
        config.identifiers.end_imo = None;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_list_mode_requires_list() {
        let mut config = base_config();
        config.identifiers.mode = IdentifierMode::List;
        assert!(validate(&config).is_err());

        config.identifiers.list = Some(vec![9538428]);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_url_file_mode_requires_path() {
        let mut config = base_config();
        config.identifiers.mode = IdentifierMode::UrlFile;
        assert!(validate(&config).is_err());

        config.identifiers.url_file = Some("./vessel_urls.txt".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = base_config();
        config.source.base_url = "not a url".to_string();
        assert!(validate(&config).is_err());

        config.source.base_url = "ftp://example.com".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_output_paths_rejected() {
        let mut config = base_config();
        config.output.checkpoint_path = String::new();
        assert!(validate(&config).is_err());
    }
}
