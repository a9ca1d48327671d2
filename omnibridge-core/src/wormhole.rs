//! Wormholescan client for VAA lookups.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use crate::clients::AttestationService;
use crate::config::OrchestratorConfig;
use crate::error::{BridgeError, BridgeResult, QueryStep};
use crate::types::{Network, TxId, Vaa};

/// Fetches signed VAAs from Wormholescan.
#[derive(Clone, Debug)]
pub struct WormholeScanClient {
    mainnet_url: String,
    testnet_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OperationsResponse {
    #[serde(default)]
    operations: Vec<Operation>,
}

#[derive(Deserialize)]
struct Operation {
    vaa: Option<OperationVaa>,
}

#[derive(Deserialize)]
struct OperationVaa {
    /// Base64 encoded VAA bytes.
    raw: Option<String>,
}

impl WormholeScanClient {
    pub fn new(mainnet_url: impl Into<String>, testnet_url: impl Into<String>) -> Self {
        Self::with_client(mainnet_url, testnet_url, reqwest::Client::new())
    }

    pub fn with_client(
        mainnet_url: impl Into<String>,
        testnet_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            mainnet_url: mainnet_url.into().trim_end_matches('/').to_string(),
            testnet_url: testnet_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> BridgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(
            config.wormholescan_url(Network::Mainnet),
            config.wormholescan_url(Network::Testnet),
            client,
        ))
    }

    fn base_url(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.mainnet_url,
            Network::Testnet => &self.testnet_url,
        }
    }
}

#[async_trait]
impl AttestationService for WormholeScanClient {
    async fn get_attestation(&self, tx_id: &TxId, network: Network) -> BridgeResult<Option<Vaa>> {
        let url = format!("{}/api/v1/operations", self.base_url(network));
        tracing::debug!(%url, tx_id = %tx_id, %network, "wormholescan lookup");

        let response = self
            .client
            .get(&url)
            .query(&[("txHash", tx_id.as_str())])
            .send()
            .await
            .map_err(|e| BridgeError::ExternalQuery {
                step: QueryStep::Attestation,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::from_http_status(
                QueryStep::Attestation,
                status.as_u16(),
                body,
            ));
        }

        let body: OperationsResponse =
            response.json().await.map_err(|e| BridgeError::ExternalQuery {
                step: QueryStep::Attestation,
                message: format!("invalid response body: {}", e),
            })?;

        let raw = body
            .operations
            .into_iter()
            .next()
            .and_then(|op| op.vaa)
            .and_then(|vaa| vaa.raw)
            .filter(|raw| !raw.is_empty());

        match raw {
            Some(raw) => {
                let bytes = BASE64.decode(raw.as_bytes()).map_err(|e| {
                    BridgeError::Serialization(format!("VAA is not valid base64: {}", e))
                })?;
                Vaa::from_bytes(&bytes).map(Some)
            }
            None => Ok(None),
        }
    }
}
