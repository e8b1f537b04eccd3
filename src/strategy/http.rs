//! HTTP extraction strategy for vessel pages

use crate::strategy::parser::{extract_vessel_fields, looks_like_missing_vessel};
use crate::strategy::{ExtractError, ExtractionStrategy, Record};
use crate::Result;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// A page that parses to fewer fields than this is treated as a missing
/// vessel rather than a record
const MIN_RECORD_FIELDS: usize = 3;

/// Fetches and parses vessel pages from the remote source
///
/// One vessel per request: `GET {base}/vessel/imo/{imo}`. All failures are
/// classified into [`ExtractError`] so the engine can decide on retries
/// without knowing anything about HTTP.
pub struct VesselPageStrategy {
    client: Client,
    base_url: Url,
}

impl VesselPageStrategy {
    /// Creates a strategy against the given base URL
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root of the vessel database, e.g. `https://www.balticshipping.com`
    /// * `request_timeout` - Total deadline per request
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;

        let user_agent = format!("baltic-harvest/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// URL of the vessel page for an IMO number
    pub fn vessel_url(&self, imo: u64) -> String {
        format!(
            "{}/vessel/imo/{}",
            self.base_url.as_str().trim_end_matches('/'),
            imo
        )
    }

    async fn fetch(&self, imo: u64) -> std::result::Result<Record, ExtractError> {
        let url = self.vessel_url(imo);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ExtractError::NotFound);
        }
        if !status.is_success() {
            return Err(ExtractError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify_request_error)?;

        if looks_like_missing_vessel(&body) {
            return Err(ExtractError::NotFound);
        }

        let mut fields = extract_vessel_fields(&body);
        if fields.len() < MIN_RECORD_FIELDS {
            // Structurally empty page; the site serves these for IMO
            // numbers it has never heard of
            return Err(ExtractError::NotFound);
        }

        fields
            .entry("IMO number".to_string())
            .or_insert_with(|| Value::String(imo.to_string()));
        fields.insert("source_url".to_string(), Value::String(url));

        Ok(Record::from_fields(fields))
    }
}

impl ExtractionStrategy for VesselPageStrategy {
    fn extract(
        &self,
        imo: u64,
    ) -> impl Future<Output = std::result::Result<Record, ExtractError>> + Send {
        self.fetch(imo)
    }
}

fn classify_request_error(e: reqwest::Error) -> ExtractError {
    if e.is_timeout() {
        ExtractError::Timeout
    } else {
        ExtractError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vessel_url_shape() {
        let strategy =
            VesselPageStrategy::new("https://www.balticshipping.com", Duration::from_secs(30))
                .unwrap();
        assert_eq!(
            strategy.vessel_url(9074729),
            "https://www.balticshipping.com/vessel/imo/9074729"
        );
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let strategy =
            VesselPageStrategy::new("https://example.com/", Duration::from_secs(30)).unwrap();
        assert_eq!(
            strategy.vessel_url(9176187),
            "https://example.com/vessel/imo/9176187"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(VesselPageStrategy::new("not a url", Duration::from_secs(30)).is_err());
    }
}
