//! Finality wait followed by a single attestation fetch.

use std::sync::Arc;

use crate::cancel::CancelSignal;
use crate::clients::AttestationService;
use crate::config::AttestationConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::types::{AttestationRequest, Vaa};

/// Waits for source finality, then fetches the VAA exactly once.
///
/// There is no polling here. A missing attestation after the wait is reported
/// to the caller, who decides whether to ask again later.
#[derive(Clone)]
pub struct AttestationWaiter {
    service: Arc<dyn AttestationService>,
    config: AttestationConfig,
}

impl AttestationWaiter {
    pub fn new(service: Arc<dyn AttestationService>, config: AttestationConfig) -> Self {
        Self { service, config }
    }

    pub async fn wait_and_fetch(
        &self,
        request: AttestationRequest,
        cancel: &CancelSignal,
    ) -> BridgeResult<Vaa> {
        let wait = self.config.finality_wait(request.source_chain);
        tracing::info!(
            tx_id = %request.tx_id,
            chain = %request.source_chain,
            wait_secs = wait.as_secs(),
            "waiting for finality before fetching attestation"
        );
        cancel.sleep(wait).await?;
        self.fetch(request).await
    }

    /// Fetch without waiting.
    pub async fn fetch(&self, request: AttestationRequest) -> BridgeResult<Vaa> {
        let AttestationRequest {
            tx_id,
            source_chain,
            network,
        } = request;

        match self.service.get_attestation(&tx_id, network).await {
            Ok(Some(vaa)) => {
                tracing::info!(tx_id = %tx_id, chain = %source_chain, "attestation fetched");
                Ok(vaa)
            }
            Ok(None) => Err(BridgeError::AttestationUnavailable {
                tx_id: tx_id.to_string(),
                reason: "no attestation published yet".into(),
            }),
            Err(e) => Err(BridgeError::AttestationUnavailable {
                tx_id: tx_id.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
