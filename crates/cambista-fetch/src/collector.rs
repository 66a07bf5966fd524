//! Sequential collection of every configured (fiat, asset, direction) triple.

use cambista_types::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{CollectError, P2pClient, RawRecord, SearchRequest};

/// Which markets to collect and how to tag them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Fiat currency code.
    pub fiat: String,
    /// Asset symbols.
    pub assets: Vec<String>,
    /// Trade directions.
    pub directions: Vec<Direction>,
    /// Provenance tag stamped on every record.
    pub source: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            fiat: "BOB".to_string(),
            assets: vec!["USDT".to_string()],
            directions: Direction::both().to_vec(),
            source: "binance".to_string(),
        }
    }
}

impl CollectorConfig {
    /// Enumerates every triple in asset-major order.
    #[must_use]
    pub fn triples(&self) -> Vec<Triple> {
        self.assets
            .iter()
            .flat_map(|asset| {
                self.directions.iter().map(move |direction| Triple {
                    fiat: self.fiat.clone(),
                    asset: asset.clone(),
                    direction: direction.clone(),
                })
            })
            .collect()
    }
}

/// One market to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    /// Fiat currency code.
    pub fiat: String,
    /// Asset symbol.
    pub asset: String,
    /// Trade direction.
    pub direction: Direction,
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} {}", self.asset, self.fiat, self.direction)
    }
}

/// Result of collecting one triple.
///
/// A failed page keeps everything fetched before it; `error` records why
/// collection stopped early.
#[derive(Debug)]
pub struct CollectOutcome {
    /// The triple that was collected.
    pub triple: Triple,
    /// Flattened records in page order.
    pub records: Vec<RawRecord>,
    /// Pages that returned records.
    pub pages: u32,
    /// Failure that aborted this triple, if any.
    pub error: Option<CollectError>,
}

impl CollectOutcome {
    /// Returns true if pagination ran to its natural end.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Collects every page of one triple, starting at page 1.
///
/// Stops at the first empty page, at `max_pages`, or at the first error.
/// Errors are logged and returned in the outcome together with the records
/// gathered so far; nothing is retried.
pub async fn collect(client: &P2pClient, triple: &Triple) -> CollectOutcome {
    let rows = client.config().rows;
    let max_pages = client.config().max_pages;
    let mut outcome = CollectOutcome {
        triple: triple.clone(),
        records: Vec::new(),
        pages: 0,
        error: None,
    };

    let mut page = 1;
    loop {
        if max_pages.is_some_and(|max| page > max) {
            debug!(%triple, page, "page cap reached");
            break;
        }
        let request = SearchRequest::new(&triple.fiat, &triple.asset, &triple.direction, page, rows);
        match client.fetch_page(&request).await {
            Ok(Some(records)) => {
                outcome.records.extend(records);
                outcome.pages += 1;
                page += 1;
            }
            Ok(None) => break,
            Err(error) => {
                warn!(%triple, page, %error, transport = error.is_transport(), "collection aborted");
                outcome.error = Some(error);
                break;
            }
        }
    }

    debug!(%triple, pages = outcome.pages, records = outcome.len(), "triple collected");
    outcome
}

/// Collects every configured triple one after another.
///
/// Each record is stamped with `timestamp` (the run time, epoch seconds) and
/// `source`. `progress` is called after each triple.
pub async fn collect_all(
    client: &P2pClient,
    config: &CollectorConfig,
    run_time: DateTime<Utc>,
    mut progress: impl FnMut(&CollectOutcome),
) -> Vec<CollectOutcome> {
    let mut outcomes = Vec::new();
    for triple in config.triples() {
        let mut outcome = collect(client, &triple).await;
        stamp(&mut outcome.records, run_time, &config.source);
        progress(&outcome);
        outcomes.push(outcome);
    }

    let records: usize = outcomes.iter().map(CollectOutcome::len).sum();
    let failed = outcomes.iter().filter(|o| !o.is_complete()).count();
    info!(triples = outcomes.len(), records, failed, "collection run finished");
    outcomes
}

/// Stamps records with the run time and provenance tag.
pub fn stamp(records: &mut [RawRecord], run_time: DateTime<Utc>, source: &str) {
    for record in records {
        record.insert("timestamp".to_string(), Value::from(run_time.timestamp()));
        record.insert("source".to_string(), Value::from(source));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientConfig;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn advert(id: u32, price: &str) -> Value {
        json!({
            "adv": {
                "advNo": id.to_string(),
                "tradeType": "SELL",
                "asset": "USDT",
                "fiatUnit": "BOB",
                "price": price,
                "tradableQuantity": "100.00"
            },
            "advertiser": {"nickName": "trader"}
        })
    }

    async fn mount_page(server: &MockServer, page: u32, body: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"page": page})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> P2pClient {
        P2pClient::new(ClientConfig::default().with_base_url(server.uri())).unwrap()
    }

    fn triple() -> Triple {
        Triple {
            fiat: "BOB".to_string(),
            asset: "USDT".to_string(),
            direction: Direction::Sell,
        }
    }

    #[tokio::test]
    async fn test_pagination_stops_at_empty_page() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!({"data": [advert(1, "9.90"), advert(2, "9.95")]})).await;
        mount_page(&server, 2, json!({"data": [advert(3, "10.00")]})).await;
        mount_page(&server, 3, json!({"data": []})).await;

        let outcome = collect(&client(&server), &triple()).await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.pages, 2);
        assert_eq!(outcome.len(), 3);
        assert_eq!(outcome.records[2]["adv.advNo"], json!("3"));
    }

    #[tokio::test]
    async fn test_missing_data_ends_pagination() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!({"code": "000000", "message": null})).await;

        let outcome = collect(&client(&server), &triple()).await;
        assert!(outcome.is_complete());
        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn test_error_keeps_partial_results() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!({"data": [advert(1, "9.90")]})).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"page": 2})))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let outcome = collect(&client(&server), &triple()).await;
        assert_eq!(outcome.len(), 1);
        assert!(matches!(
            outcome.error,
            Some(CollectError::Status { status: 503, page: 2 })
        ));
        assert!(!outcome.error.unwrap().is_transport());
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig::default().with_base_url(format!("http://{address}"));
        let outcome = collect(&P2pClient::new(config).unwrap(), &triple()).await;
        assert!(outcome.is_empty());
        let error = outcome.error.unwrap();
        assert!(matches!(error, CollectError::Http(_)));
        assert!(error.is_transport());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let outcome = collect(&client(&server), &triple()).await;
        assert!(matches!(outcome.error, Some(CollectError::Malformed { page: 1, .. })));
    }

    #[tokio::test]
    async fn test_page_cap() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [advert(1, "9.9")]})))
            .mount(&server)
            .await;

        let config = ClientConfig::default()
            .with_base_url(server.uri())
            .with_max_pages(3);
        let outcome = collect(&P2pClient::new(config).unwrap(), &triple()).await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.pages, 3);
    }

    #[tokio::test]
    async fn test_collect_all_stamps_records() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!({"data": [advert(1, "9.90")]})).await;
        mount_page(&server, 2, json!({"data": []})).await;

        let config = CollectorConfig {
            source: "test".to_string(),
            ..CollectorConfig::default()
        };
        let run_time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut seen = 0;
        let outcomes = collect_all(&client(&server), &config, run_time, |_| seen += 1).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(seen, 2);
        let record = &outcomes[0].records[0];
        assert_eq!(record["timestamp"], json!(run_time.timestamp()));
        assert_eq!(record["source"], json!("test"));
    }

    #[test]
    fn test_triples() {
        let config = CollectorConfig {
            assets: vec!["USDT".to_string(), "BTC".to_string()],
            ..CollectorConfig::default()
        };
        let triples = config.triples();
        assert_eq!(triples.len(), 4);
        assert_eq!(triples[1].to_string(), "USDT/BOB BUY");
        assert_eq!(triples[2].asset, "BTC");
    }
}
