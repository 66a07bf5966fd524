//! HTTP client for the marketplace advertisement search endpoint.

use std::time::Duration;

use cambista_types::Direction;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CollectError, RawRecord, flatten};

/// Default advertisement search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://p2p.binance.com/bapi/c2c/v2/friendly/c2c/adv/search";

/// Configuration for the marketplace client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Search endpoint URL.
    pub base_url: String,
    /// Records requested per page.
    pub rows: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent string.
    pub user_agent: String,
    /// Optional cap on pages fetched per triple.
    pub max_pages: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            rows: 10,
            timeout_secs: 30,
            user_agent: format!("cambista/{}", env!("CARGO_PKG_VERSION")),
            max_pages: None,
        }
    }
}

impl ClientConfig {
    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Points the client at another endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Caps the number of pages fetched per triple.
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

/// Body of one search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Asset symbol.
    pub asset: String,
    /// Fiat currency code.
    pub fiat: String,
    /// 1-based page number.
    pub page: u32,
    /// Records per page.
    pub rows: u32,
    /// Payment method filter, always empty.
    pub pay_types: Vec<String>,
    /// Country filter, always empty.
    pub countries: Vec<String>,
    /// Publisher type filter, always null.
    pub publisher_type: Option<String>,
    /// Upstream trade type.
    pub trade_type: String,
}

impl SearchRequest {
    /// Builds the request for one page of a triple.
    #[must_use]
    pub fn new(fiat: &str, asset: &str, direction: &Direction, page: u32, rows: u32) -> Self {
        Self {
            asset: asset.to_string(),
            fiat: fiat.to_string(),
            page,
            rows,
            pay_types: Vec::new(),
            countries: Vec::new(),
            publisher_type: None,
            trade_type: direction.as_str().to_string(),
        }
    }
}

/// Marketplace search client.
#[derive(Debug, Clone)]
pub struct P2pClient {
    client: Client,
    config: ClientConfig,
}

impl P2pClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, reqwest::Error> {
        Self::new(ClientConfig::default())
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches one page and flattens its records.
    ///
    /// Returns `Ok(None)` when the response carries no `data` array or an
    /// empty one, which ends pagination.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a body
    /// that is not JSON.
    pub async fn fetch_page(
        &self,
        request: &SearchRequest,
    ) -> Result<Option<Vec<RawRecord>>, CollectError> {
        let response = self
            .client
            .post(&self.config.base_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Status {
                status: status.as_u16(),
                page: request.page,
            });
        }

        let body = response.bytes().await?;
        let document: Value =
            serde_json::from_slice(&body).map_err(|e| CollectError::Malformed {
                page: request.page,
                message: e.to_string(),
            })?;

        Ok(page_records(&document))
    }
}

/// Extracts and flattens the `data` array of a search response.
fn page_records(document: &Value) -> Option<Vec<RawRecord>> {
    let data = document.get("data")?.as_array()?;
    if data.is_empty() {
        return None;
    }
    Some(data.iter().map(flatten).collect())
}
