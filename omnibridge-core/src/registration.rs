//! Token registration: emit metadata, wait for the attestation, deploy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attestation::AttestationWaiter;
use crate::cancel::CancelSignal;
use crate::chains::{ChainCapability, SupportedChain};
use crate::clients::{ChainReader, SignerContext};
use crate::config::RegistrationConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::types::{
    AttestationRequest, ChainKind, Network, OmniAddress, SubmissionResult, TokenDescriptor, TxId,
    Vaa,
};
use crate::workflow::WorkflowFailure;

/// Registration states, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStage {
    PreflightCheck,
    MetadataEmitted,
    AttestationAwaited,
    Deployed,
}

/// Successful registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistrationOutcome {
    pub metadata_tx: TxId,
    pub attestation: Vaa,
    pub destination_tx: TxId,
}

pub type RegistrationResult = Result<RegistrationOutcome, WorkflowFailure<RegistrationStage>>;

/// Deploys a source token's representation on the destination chain.
///
/// Submits two irrevocable calls. Re-running after a deployment failure emits
/// metadata again; consult [`RegistrationGate`](crate::fee::RegistrationGate)
/// first.
#[derive(Clone)]
pub struct RegistrationWorkflow {
    reader: Arc<dyn ChainReader>,
    waiter: AttestationWaiter,
    config: RegistrationConfig,
    network: Network,
}

impl RegistrationWorkflow {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        waiter: AttestationWaiter,
        config: RegistrationConfig,
        network: Network,
    ) -> Self {
        Self {
            reader,
            waiter,
            config,
            network,
        }
    }

    pub async fn run(
        &self,
        token: &TokenDescriptor,
        signers: &SignerContext,
        cancel: &CancelSignal,
    ) -> RegistrationResult {
        let mut stage = RegistrationStage::PreflightCheck;
        self.preflight(token, signers)
            .await
            .map_err(|e| fail(stage, e))?;

        let source_chain = signers.source.chain();
        let metadata_tx = signers
            .source
            .writer
            .log_metadata(&token.address)
            .await
            .map_err(|e| fail(stage, submission_error(source_chain, e)))?;
        stage = advance(stage, RegistrationStage::MetadataEmitted, &token.address);
        let emitted = SubmissionResult::transaction(metadata_tx.clone());

        let request = AttestationRequest {
            tx_id: metadata_tx.clone(),
            source_chain,
            network: self.network,
        };
        let attestation = self
            .waiter
            .wait_and_fetch(request, cancel)
            .await
            .map_err(|e| WorkflowFailure::after_submission(stage, e, emitted.clone()))?;
        stage = advance(stage, RegistrationStage::AttestationAwaited, &token.address);

        let destination_chain = signers.destination.chain();
        let destination_tx = signers
            .destination
            .writer
            .deploy_token(source_chain, &attestation)
            .await
            .map_err(|e| {
                WorkflowFailure::after_submission(
                    stage,
                    submission_error(destination_chain, e),
                    emitted.clone(),
                )
            })?;
        advance(stage, RegistrationStage::Deployed, &token.address);

        Ok(RegistrationOutcome {
            metadata_tx,
            attestation,
            destination_tx,
        })
    }

    /// The route must support registration and both signers must cover their
    /// chain's minimum before anything is sent.
    async fn preflight(&self, token: &TokenDescriptor, signers: &SignerContext) -> BridgeResult<()> {
        if token.chain() != signers.source.chain() {
            return Err(BridgeError::InvalidTransferParameters(format!(
                "token {} is not on the source signer's chain {}",
                token.address,
                signers.source.chain()
            )));
        }
        if signers.source.chain() == signers.destination.chain() {
            return Err(BridgeError::InvalidTransferParameters(
                "source and destination chains must differ".into(),
            ));
        }
        SupportedChain::for_chain(signers.source.chain())
            .ensure_capability(ChainCapability::LockTokens)?;
        SupportedChain::for_chain(signers.destination.chain())
            .ensure_capability(ChainCapability::DeployToken)?;

        self.ensure_balance(&signers.source.account).await?;
        self.ensure_balance(&signers.destination.account).await
    }

    async fn ensure_balance(&self, account: &OmniAddress) -> BridgeResult<()> {
        let chain = account.chain();
        let required = self.config.min_balance(chain);
        let available = self.reader.native_balance(account).await?;
        tracing::debug!(chain = %chain, available, required, "preflight balance");

        if available < required {
            return Err(BridgeError::InsufficientBalance {
                chain,
                required,
                available,
            });
        }
        Ok(())
    }
}

fn advance(
    from: RegistrationStage,
    to: RegistrationStage,
    token: &OmniAddress,
) -> RegistrationStage {
    tracing::info!(token = %token, from = ?from, to = ?to, "registration advanced");
    to
}

fn fail(stage: RegistrationStage, error: BridgeError) -> WorkflowFailure<RegistrationStage> {
    tracing::warn!(stage = ?stage, error = %error, "registration failed");
    WorkflowFailure::new(stage, error)
}

pub(crate) fn submission_error(chain: ChainKind, error: BridgeError) -> BridgeError {
    match error {
        BridgeError::Submission { .. } => error,
        other => BridgeError::Submission {
            chain,
            message: other.to_string(),
        },
    }
}
