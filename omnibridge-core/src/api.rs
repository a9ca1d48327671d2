//! HTTP client for the Omni Bridge API (fees and transfer indexer).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::clients::{FeeApi, FeeResponse, IndexingApi};
use crate::config::OrchestratorConfig;
use crate::error::{BridgeError, BridgeResult, QueryStep};
use crate::types::{OmniAddress, TransferId, TransferRecord, TransferStatus, TxId};

/// Omni Bridge API client.
#[derive(Clone, Debug)]
pub struct OmniBridgeApi {
    base_url: String,
    client: reqwest::Client,
}

impl OmniBridgeApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> BridgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(&config.bridge_api_url, client))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        step: QueryStep,
        path: &str,
        query: &[(&str, String)],
    ) -> BridgeResult<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, ?query, "omni api request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| BridgeError::ExternalQuery {
                step,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::from_http_status(step, status.as_u16(), body));
        }

        response.json().await.map_err(|e| BridgeError::ExternalQuery {
            step,
            message: format!("invalid response body: {}", e),
        })
    }
}

/// The status endpoint answers with a single status or the full history.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusPayload {
    History(Vec<TransferStatus>),
    Single(TransferStatus),
}

#[async_trait]
impl FeeApi for OmniBridgeApi {
    async fn get_fee(
        &self,
        sender: &OmniAddress,
        recipient: &OmniAddress,
        token: &OmniAddress,
    ) -> BridgeResult<FeeResponse> {
        self.get_json(
            QueryStep::Fee,
            "/api/v1/transfer-fee",
            &[
                ("sender", sender.to_string()),
                ("recipient", recipient.to_string()),
                ("token", token.to_string()),
            ],
        )
        .await
    }
}

#[async_trait]
impl IndexingApi for OmniBridgeApi {
    async fn find_transfers(&self, tx_id: &TxId) -> BridgeResult<Vec<TransferRecord>> {
        self.get_json(
            QueryStep::Indexing,
            "/api/v1/transfers/",
            &[("transaction_id", tx_id.to_string())],
        )
        .await
    }

    async fn get_transfer(&self, id: TransferId) -> BridgeResult<TransferRecord> {
        self.get_json(
            QueryStep::Indexing,
            "/api/v1/transfers/transfer",
            &transfer_query(id),
        )
        .await
    }

    async fn get_transfer_status(&self, id: TransferId) -> BridgeResult<TransferStatus> {
        let payload: StatusPayload = self
            .get_json(
                QueryStep::TransferStatus,
                "/api/v1/transfers/transfer/status",
                &transfer_query(id),
            )
            .await?;

        match payload {
            StatusPayload::Single(status) => Ok(status),
            StatusPayload::History(history) => {
                history
                    .into_iter()
                    .last()
                    .ok_or_else(|| BridgeError::ExternalQuery {
                        step: QueryStep::TransferStatus,
                        message: format!("no status recorded for {}", id),
                    })
            }
        }
    }
}

fn transfer_query(id: TransferId) -> [(&'static str, String); 2] {
    [
        ("origin_chain", id.origin_chain.api_name().to_string()),
        ("origin_nonce", id.origin_nonce.to_string()),
    ]
}
