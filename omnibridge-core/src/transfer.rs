//! Token transfer: quote, submit once, then observe.

use serde::{Deserialize, Serialize};

use crate::attestation::AttestationWaiter;
use crate::cancel::CancelSignal;
use crate::chains::{ChainCapability, SupportedChain};
use crate::clients::SourceSigner;
use crate::error::{BridgeError, BridgeResult};
use crate::fee::FeeEstimator;
use crate::poller::TransferStatusPoller;
use crate::registration::submission_error;
use crate::types::{
    AttestationRequest, ChainKind, Network, OmniAddress, SubmissionResult, TokenDescriptor,
    TransferIntent, TransferRecord, TransferStatus, TxId, Vaa,
};
use crate::workflow::WorkflowFailure;

/// Transfer states, in order. `AttestationAwaited` is skipped for sources
/// that are not attested by Wormhole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStage {
    /// Nothing has happened yet.
    Requested,
    FeeQuoted,
    Submitted,
    AttestationAwaited,
    Indexed,
    StatusResolved,
}

/// Result of the observation phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub source_tx: Option<TxId>,
    pub record: TransferRecord,
    pub status: TransferStatus,
    pub attestation: Option<Vaa>,
}

/// Successful transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub intent: TransferIntent,
    pub submission: SubmissionResult,
    #[serde(flatten)]
    pub observation: Observation,
}

pub type TransferResult<T> = Result<T, WorkflowFailure<TransferStage>>;

/// Moves tokens from the signer's chain to a recipient on another chain.
#[derive(Clone)]
pub struct TransferWorkflow {
    estimator: FeeEstimator,
    waiter: AttestationWaiter,
    poller: TransferStatusPoller,
    network: Network,
}

impl TransferWorkflow {
    pub fn new(
        estimator: FeeEstimator,
        waiter: AttestationWaiter,
        poller: TransferStatusPoller,
        network: Network,
    ) -> Self {
        Self {
            estimator,
            waiter,
            poller,
            network,
        }
    }

    /// Run the whole transfer. `recipient` is an omni address such as
    /// `near:alice.testnet`.
    pub async fn run(
        &self,
        token: &TokenDescriptor,
        amount: u128,
        recipient: &str,
        signer: &SourceSigner,
        cancel: &CancelSignal,
    ) -> TransferResult<TransferOutcome> {
        let stage = TransferStage::Requested;
        let recipient =
            validate(token, amount, recipient, signer).map_err(|e| fail(stage, e, None))?;

        let quote = self
            .estimator
            .estimate(&signer.account, &recipient, &token.address)
            .await
            .map_err(|e| fail(stage, e, None))?;
        let stage = advance(stage, TransferStage::FeeQuoted);

        let intent = TransferIntent::new(token.address.clone(), recipient, amount, quote);
        let source_chain = signer.chain();
        let submission = signer
            .writer
            .init_transfer(&intent)
            .await
            .map_err(|e| fail(stage, submission_error(source_chain, e), None))?;
        advance(stage, TransferStage::Submitted);
        tracing::info!(
            token = %intent.token(),
            recipient = %intent.recipient(),
            amount = intent.amount(),
            fee = intent.fee(),
            native_fee = intent.native_fee(),
            "transfer submitted"
        );

        let observation = self.observe(&submission, source_chain, cancel).await?;

        Ok(TransferOutcome {
            intent,
            submission,
            observation,
        })
    }

    /// Observation phase alone. Safe to repeat for a retained submission.
    pub async fn observe(
        &self,
        submission: &SubmissionResult,
        source_chain: ChainKind,
        cancel: &CancelSignal,
    ) -> TransferResult<Observation> {
        let mut stage = TransferStage::Submitted;
        let failed = |stage, error| fail(stage, error, Some(submission.clone()));

        let attestation = match submission.tx_id() {
            Some(tx_id) if SupportedChain::for_chain(source_chain).requires_attestation() => {
                let request = AttestationRequest {
                    tx_id: tx_id.clone(),
                    source_chain,
                    network: self.network,
                };
                let vaa = self
                    .waiter
                    .wait_and_fetch(request, cancel)
                    .await
                    .map_err(|e| failed(stage, e))?;
                stage = advance(stage, TransferStage::AttestationAwaited);
                Some(vaa)
            }
            _ => None,
        };

        let (record, _attempts) = self
            .poller
            .find_record(submission, source_chain, cancel)
            .await
            .map_err(|e| failed(stage, e))?;
        stage = advance(stage, TransferStage::Indexed);

        let status = self
            .poller
            .status(&record)
            .await
            .map_err(|e| failed(stage, e))?;
        advance(stage, TransferStage::StatusResolved);

        Ok(Observation {
            source_tx: submission.tx_id().cloned(),
            record,
            status,
            attestation,
        })
    }
}

fn validate(
    token: &TokenDescriptor,
    amount: u128,
    recipient: &str,
    signer: &SourceSigner,
) -> BridgeResult<OmniAddress> {
    if amount == 0 {
        return Err(BridgeError::InvalidTransferParameters(
            "amount must be greater than zero".into(),
        ));
    }
    if recipient.trim().is_empty() {
        return Err(BridgeError::InvalidTransferParameters(
            "recipient is empty".into(),
        ));
    }
    let recipient: OmniAddress = recipient
        .parse()
        .map_err(|e: BridgeError| BridgeError::InvalidTransferParameters(e.to_string()))?;

    if recipient.chain() == token.chain() {
        return Err(BridgeError::InvalidTransferParameters(format!(
            "recipient {} is on the token's own chain",
            recipient
        )));
    }
    if signer.chain() != token.chain() {
        return Err(BridgeError::InvalidTransferParameters(format!(
            "token {} is not on the signer's chain {}",
            token.address,
            signer.chain()
        )));
    }
    SupportedChain::for_chain(signer.chain()).ensure_capability(ChainCapability::LockTokens)?;
    Ok(recipient)
}

fn advance(from: TransferStage, to: TransferStage) -> TransferStage {
    tracing::info!(from = ?from, to = ?to, "transfer advanced");
    to
}

fn fail(
    stage: TransferStage,
    error: BridgeError,
    submission: Option<SubmissionResult>,
) -> WorkflowFailure<TransferStage> {
    tracing::warn!(stage = ?stage, error = %error, submitted = submission.is_some(), "transfer failed");
    WorkflowFailure {
        stage,
        error,
        submission,
    }
}
