//! Blockfrost-backed wallet data fetcher.
//!
//! Issues at most three read-only calls per wallet (address lookup,
//! transaction history, stake-account assets) and never retries. Every
//! failure is folded into a [`FetchError`]; nothing panics or propagates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info_span, warn, Instrument};

use super::network::CardanoNetwork;
use super::summary::{FetchError, FetchResult, WalletSummary, TRANSACTION_COUNT};
use crate::config::BlockfrostConfig;
use crate::error::ConfigError;

/// Header Blockfrost reads the project key from.
const PROJECT_ID_HEADER: &str = "project_id";

/// Connect timeout for provider calls. Requests themselves carry no overall
/// timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of bounded wallet summaries.
#[async_trait]
pub trait WalletDataSource: Send + Sync {
    async fn fetch(&self, address: &str) -> FetchResult;
}

#[derive(Debug, Deserialize)]
struct AddressInfo {
    #[serde(default)]
    stake_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddressTransaction {
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct AccountAsset {
    unit: String,
}

pub struct BlockfrostClient {
    client: Client,
    base_url: String,
    network: CardanoNetwork,
    project_id: Option<SecretString>,
}

impl BlockfrostClient {
    pub fn new(
        base_url: impl Into<String>,
        network: CardanoNetwork,
        project_id: Option<SecretString>,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            network,
            project_id,
        })
    }

    /// Builds a client from config. A missing key is not an error here; it
    /// surfaces as [`FetchError::MissingCredential`] on each fetch.
    pub fn from_config(config: &BlockfrostConfig) -> Result<Self, ConfigError> {
        let project_id = config
            .credential
            .resolve()
            .map_err(|source| ConfigError::Secret {
                field: "blockfrost",
                source,
            })?;
        if project_id.is_none() {
            warn!("No Blockfrost project key configured; every fetch will fail");
        }

        Self::new(config.resolved_base_url(), config.network, project_id)
    }

    pub fn network(&self) -> CardanoNetwork {
        self.network
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Upstream(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Upstream("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url, key: &SecretString) -> Result<reqwest::Response, FetchError> {
        debug!(path = url.path(), "GET");
        self.client
            .get(url)
            .header(PROJECT_ID_HEADER, key.expose_secret())
            .send()
            .await
            .map_err(|e| FetchError::Upstream(e.to_string()))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FetchError> {
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Upstream(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    fn ensure_success(response: &reqwest::Response, what: &str) -> Result<(), FetchError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::Upstream(format!(
                "{} request failed with HTTP status {}",
                what, status
            )))
        }
    }

    async fn fetch_summary(&self, address: &str) -> FetchResult {
        let key = self
            .project_id
            .as_ref()
            .ok_or(FetchError::MissingCredential)?;

        let response = self.get(self.endpoint(&["addresses", address])?, key).await?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::AddressLookup {
                status: response.status().as_u16(),
                network: self.network.to_string(),
            });
        }
        let info: AddressInfo = Self::decode(response).await?;

        let mut tx_url = self.endpoint(&["addresses", address, "transactions"])?;
        tx_url
            .query_pairs_mut()
            .append_pair("order", "desc")
            .append_pair("count", &TRANSACTION_COUNT.to_string());
        let response = self.get(tx_url, key).await?;
        Self::ensure_success(&response, "transaction history")?;
        let transactions: Vec<AddressTransaction> = Self::decode(response).await?;
        let hashes = transactions.into_iter().map(|tx| tx.tx_hash);

        let Some(stake_address) = info.stake_address.filter(|s| !s.is_empty()) else {
            debug!("Address has no stake address; skipping asset query");
            return Ok(WalletSummary::without_assets(hashes));
        };

        let response = self
            .get(
                self.endpoint(&["accounts", &stake_address, "addresses", "assets"])?,
                key,
            )
            .await?;
        Self::ensure_success(&response, "account assets")?;
        let assets: Vec<AccountAsset> = Self::decode(response).await?;
        let total = assets.len();

        Ok(WalletSummary::new(
            hashes,
            assets.into_iter().map(|a| a.unit),
            total,
        ))
    }
}

#[async_trait]
impl WalletDataSource for BlockfrostClient {
    async fn fetch(&self, address: &str) -> FetchResult {
        let span = info_span!(
            "wallet_fetch",
            address = %super::abbreviate_address(address),
            network = %self.network,
        );
        let result = self.fetch_summary(address).instrument(span).await;
        match &result {
            Ok(summary) => debug!(
                transactions = summary.recent_transaction_hashes.len(),
                assets = summary.total_asset_classes,
                "Wallet summary fetched"
            ),
            Err(e) => warn!(error = %e, "Wallet fetch failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::summary::ASSET_COUNT;
    use httpmock::prelude::*;
    use serde_json::json;

    const ADDR: &str = "addr_test1vzpwq95z3xyum8vqndgdd9mdnmafh3djcxnc6jemlgdmswcve6tkw";
    const STAKE: &str = "stake_test1uqfu74w3wh4gfzu8m6e7j987h4lq9r3t7ef5gaw497uu85qsqfy27";

    fn client(server: &MockServer) -> BlockfrostClient {
        BlockfrostClient::new(
            server.base_url(),
            CardanoNetwork::Preprod,
            Some(SecretString::from("preprodTestKey")),
        )
        .unwrap()
    }

    fn tx_list(n: usize) -> serde_json::Value {
        json!((0..n)
            .map(|i| json!({ "tx_hash": format!("hash{:02}", i), "tx_index": 0, "block_height": 100 - i }))
            .collect::<Vec<_>>())
    }

    fn asset_list(n: usize) -> serde_json::Value {
        json!((0..n)
            .map(|i| json!({ "unit": format!("unit{:02}", i), "quantity": "1" }))
            .collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_no_stake_address_yields_empty_assets() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/addresses/{}", ADDR))
                    .header("project_id", "preprodTestKey");
                then.status(200)
                    .json_body(json!({ "address": ADDR, "stake_address": null }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/addresses/{}/transactions", ADDR))
                    .query_param("order", "desc")
                    .query_param("count", "10");
                then.status(200).json_body(tx_list(3));
            })
            .await;
        let assets = server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/accounts/");
                then.status(200).json_body(asset_list(1));
            })
            .await;

        let summary = client(&server).fetch(ADDR).await.unwrap();
        assert_eq!(summary.recent_transaction_hashes, vec!["hash00", "hash01", "hash02"]);
        assert!(summary.assets_held.is_empty());
        assert_eq!(summary.total_asset_classes, 0);
        assets.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_stake_address_assets_truncated_with_full_total() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/addresses/{}", ADDR));
                then.status(200)
                    .json_body(json!({ "address": ADDR, "stake_address": STAKE }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/addresses/{}/transactions", ADDR));
                // Provider ignoring `count` must not break the cap.
                then.status(200).json_body(tx_list(14));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/accounts/{}/addresses/assets", STAKE));
                then.status(200).json_body(asset_list(40));
            })
            .await;

        let summary = client(&server).fetch(ADDR).await.unwrap();
        assert_eq!(summary.recent_transaction_hashes.len(), TRANSACTION_COUNT);
        assert_eq!(summary.assets_held.len(), ASSET_COUNT);
        assert_eq!(summary.assets_held[0], "unit00");
        assert_eq!(summary.assets_held[14], "unit14");
        assert_eq!(summary.total_asset_classes, 40);
    }

    #[tokio::test]
    async fn test_address_lookup_failure_carries_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/addresses/{}", ADDR));
                then.status(404)
                    .json_body(json!({ "status_code": 404, "error": "Not Found" }));
            })
            .await;
        let transactions = server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/transactions");
                then.status(200).json_body(tx_list(1));
            })
            .await;

        let err = client(&server).fetch(ADDR).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::AddressLookup {
                status: 404,
                network: "preprod".to_string()
            }
        );
        transactions.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_transaction_failure_is_upstream_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/addresses/{}", ADDR));
                then.status(200).json_body(json!({ "stake_address": null }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/addresses/{}/transactions", ADDR));
                then.status(500);
            })
            .await;

        let err = client(&server).fetch(ADDR).await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream(_)));
        assert!(err.to_string().starts_with("An unexpected error during data fetch"));
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/addresses/{}", ADDR));
                then.status(200).body("<html>gateway</html>");
            })
            .await;

        let err = client(&server).fetch(ADDR).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_calls() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200);
            })
            .await;

        let client =
            BlockfrostClient::new(server.base_url(), CardanoNetwork::Preprod, None).unwrap();
        let err = client.fetch(ADDR).await.unwrap_err();
        assert_eq!(err, FetchError::MissingCredential);
        any.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_network_failure_is_upstream_error() {
        // Nothing listens on port 9 locally.
        let client = BlockfrostClient::new(
            "http://127.0.0.1:9/api/v0",
            CardanoNetwork::Preprod,
            Some(SecretString::from("key")),
        )
        .unwrap();
        let err = client.fetch(ADDR).await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream(_)));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = BlockfrostClient::new(
            CardanoNetwork::Preview.base_url(),
            CardanoNetwork::Preview,
            None,
        )
        .unwrap();
        let url = client.endpoint(&["addresses", ADDR, "transactions"]).unwrap();
        assert_eq!(
            url.as_str(),
            format!(
                "https://cardano-preview.blockfrost.io/api/v0/addresses/{}/transactions",
                ADDR
            )
        );
    }
}
