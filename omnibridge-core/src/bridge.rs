//! Orchestrator entry point.

use std::sync::Arc;

use crate::api::OmniBridgeApi;
use crate::attestation::AttestationWaiter;
use crate::cancel::CancelSignal;
use crate::chains::SupportedChain;
use crate::clients::{
    AttestationService, ChainReader, FeeApi, IndexingApi, SignerContext, SourceSigner,
};
use crate::config::OrchestratorConfig;
use crate::error::BridgeResult;
use crate::fee::{FeeEstimator, RegistrationGate};
use crate::poller::TransferStatusPoller;
use crate::registration::{RegistrationResult, RegistrationWorkflow};
use crate::rpc::MultiChainReader;
use crate::tokens::TokenMetadataResolver;
use crate::transfer::{Observation, TransferOutcome, TransferResult, TransferWorkflow};
use crate::types::{
    AttestationRequest, ChainKind, FeeQuote, OmniAddress, RegistrationStatus, SubmissionResult,
    TokenDescriptor, TransferId, TransferRecord, TransferStatus, TxId, Vaa, WalletToken,
};

/// External services the orchestrator reads from.
#[derive(Clone)]
pub struct BridgeClients {
    pub reader: Arc<dyn ChainReader>,
    pub fees: Arc<dyn FeeApi>,
    pub attestations: Arc<dyn AttestationService>,
    pub indexer: Arc<dyn IndexingApi>,
}

impl BridgeClients {
    /// HTTP clients for the configured endpoints.
    pub fn from_config(config: &OrchestratorConfig) -> BridgeResult<Self> {
        let api = Arc::new(OmniBridgeApi::from_config(config)?);
        Ok(Self {
            reader: Arc::new(MultiChainReader::from_config(config)?),
            fees: api.clone(),
            attestations: Arc::new(crate::wormhole::WormholeScanClient::from_config(config)?),
            indexer: api,
        })
    }
}

/// Registration and transfer orchestrator.
///
/// Holds only configuration and client handles. Clones share nothing
/// mutable, so any number of workflows may run concurrently.
#[derive(Clone)]
pub struct OmniBridge {
    config: Arc<OrchestratorConfig>,
    clients: BridgeClients,
}

impl OmniBridge {
    pub fn new(config: OrchestratorConfig, clients: BridgeClients) -> BridgeResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            clients,
        })
    }

    /// Build with the HTTP clients described by `config`.
    pub fn from_config(config: OrchestratorConfig) -> BridgeResult<Self> {
        let clients = BridgeClients::from_config(&config)?;
        Self::new(config, clients)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn supported_chains(&self) -> Vec<SupportedChain> {
        SupportedChain::all()
    }

    fn estimator(&self) -> FeeEstimator {
        FeeEstimator::new(self.clients.fees.clone())
    }

    fn waiter(&self) -> AttestationWaiter {
        AttestationWaiter::new(
            self.clients.attestations.clone(),
            self.config.attestation.clone(),
        )
    }

    fn poller(&self) -> TransferStatusPoller {
        TransferStatusPoller::new(self.clients.indexer.clone(), self.config.polling.clone())
    }

    /// Resolve a token to metadata and, when `owner` is given, its balance.
    pub async fn resolve_token(
        &self,
        token: &OmniAddress,
        owner: Option<&OmniAddress>,
    ) -> BridgeResult<TokenDescriptor> {
        TokenMetadataResolver::new(self.clients.reader.clone())
            .resolve(token, owner)
            .await
    }

    /// Tokens held by `owner`, largest balance first, empty accounts skipped.
    pub async fn list_tokens(&self, owner: &OmniAddress) -> BridgeResult<Vec<WalletToken>> {
        TokenMetadataResolver::new(self.clients.reader.clone())
            .list_holdings(owner)
            .await
    }

    pub async fn estimate_fee(
        &self,
        sender: &OmniAddress,
        recipient: &OmniAddress,
        token: &OmniAddress,
    ) -> BridgeResult<FeeQuote> {
        self.estimator().estimate(sender, recipient, token).await
    }

    /// Never fails; see [`RegistrationGate`].
    pub async fn check_registration(
        &self,
        sender: &OmniAddress,
        token: &OmniAddress,
        recipient: &OmniAddress,
        cancel: &CancelSignal,
    ) -> RegistrationStatus {
        RegistrationGate::new(self.estimator())
            .check(sender, recipient, token, cancel)
            .await
    }

    pub async fn run_registration(
        &self,
        token: &TokenDescriptor,
        signers: &SignerContext,
        cancel: &CancelSignal,
    ) -> RegistrationResult {
        RegistrationWorkflow::new(
            self.clients.reader.clone(),
            self.waiter(),
            self.config.registration.clone(),
            self.config.network,
        )
        .run(token, signers, cancel)
        .await
    }

    pub async fn run_transfer(
        &self,
        token: &TokenDescriptor,
        amount: u128,
        recipient: &str,
        signer: &SourceSigner,
        cancel: &CancelSignal,
    ) -> TransferResult<TransferOutcome> {
        self.transfer_workflow()
            .run(token, amount, recipient, signer, cancel)
            .await
    }

    /// Re-run only the observation phase of a transfer.
    pub async fn observe_transfer(
        &self,
        submission: &SubmissionResult,
        source_chain: ChainKind,
        cancel: &CancelSignal,
    ) -> TransferResult<Observation> {
        self.transfer_workflow()
            .observe(submission, source_chain, cancel)
            .await
    }

    /// Fetch a VAA immediately, skipping the finality wait.
    pub async fn fetch_attestation_now(
        &self,
        tx_id: TxId,
        source_chain: ChainKind,
    ) -> BridgeResult<Vaa> {
        self.waiter()
            .fetch(AttestationRequest {
                tx_id,
                source_chain,
                network: self.config.network,
            })
            .await
    }

    pub async fn get_transfer(&self, id: TransferId) -> BridgeResult<TransferRecord> {
        self.clients.indexer.get_transfer(id).await
    }

    pub async fn transfer_status(&self, id: TransferId) -> BridgeResult<TransferStatus> {
        self.clients.indexer.get_transfer_status(id).await
    }

    fn transfer_workflow(&self) -> TransferWorkflow {
        TransferWorkflow::new(
            self.estimator(),
            self.waiter(),
            self.poller(),
            self.config.network,
        )
    }
}
