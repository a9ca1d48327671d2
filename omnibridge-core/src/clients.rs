//! Boundaries to the services the orchestrator depends on.
//!
//! Read paths ([`ChainReader`], [`FeeApi`], [`AttestationService`],
//! [`IndexingApi`]) may be called any number of times. Write paths
//! ([`SourceChainWriter`], [`DestinationChainWriter`]) are irrevocable and the
//! workflows call each of them at most once per invocation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::types::{
    amount, ChainKind, Network, OmniAddress, SubmissionResult, TransferId, TransferIntent,
    TransferRecord, TransferStatus, TxId, Vaa,
};

/// Mint-level facts about a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintInfo {
    pub decimals: u8,
    #[serde(with = "amount")]
    pub total_supply: u128,
}

/// Descriptive metadata for a token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub image: Option<String>,
}

/// A token account held by an owner, as listed by the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHolding {
    pub token: OmniAddress,
    /// Account holding the balance on chains that separate it from the owner.
    pub account: Option<String>,
    #[serde(with = "amount")]
    pub balance: u128,
    pub decimals: u8,
}

/// Fee schedule as returned by the bridge API. Absent fields are `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeResponse {
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub transferred_token_fee: Option<u128>,
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub native_token_fee: Option<u128>,
}

/// Read access to chain state.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Decimals and supply of a token. Fails when the mint does not exist.
    async fn mint_info(&self, token: &OmniAddress) -> BridgeResult<MintInfo>;

    /// Name, symbol and image, or `None` when no metadata is published.
    async fn token_metadata(&self, token: &OmniAddress) -> BridgeResult<Option<TokenMetadata>>;

    /// Balance of `token` held by `owner`, in smallest units.
    async fn token_balance(&self, token: &OmniAddress, owner: &OmniAddress) -> BridgeResult<u128>;

    /// Native currency balance of `account`, in smallest units.
    async fn native_balance(&self, account: &OmniAddress) -> BridgeResult<u128>;

    /// Every token account `owner` holds, empty ones included.
    ///
    /// Only chains with an owner index implement this.
    async fn token_holdings(&self, owner: &OmniAddress) -> BridgeResult<Vec<TokenHolding>> {
        Err(BridgeError::UnsupportedChain(format!(
            "token listing is not available on {}",
            owner.chain()
        )))
    }
}

/// Signer on the chain a token is bridged from.
#[async_trait]
pub trait SourceChainWriter: Send + Sync {
    fn chain(&self) -> ChainKind;

    /// Emit the token's metadata through the bridge program.
    async fn log_metadata(&self, token: &OmniAddress) -> BridgeResult<TxId>;

    /// Lock or burn funds as described by `intent`.
    async fn init_transfer(&self, intent: &TransferIntent) -> BridgeResult<SubmissionResult>;
}

/// Signer on the chain a token is registered to.
#[async_trait]
pub trait DestinationChainWriter: Send + Sync {
    fn chain(&self) -> ChainKind;

    /// Deploy the bridged token representation from an attestation.
    async fn deploy_token(&self, source_chain: ChainKind, vaa: &Vaa) -> BridgeResult<TxId>;
}

/// Bridge fee schedule.
#[async_trait]
pub trait FeeApi: Send + Sync {
    async fn get_fee(
        &self,
        sender: &OmniAddress,
        recipient: &OmniAddress,
        token: &OmniAddress,
    ) -> BridgeResult<FeeResponse>;
}

/// Signed attestations for source chain transactions.
#[async_trait]
pub trait AttestationService: Send + Sync {
    /// `Ok(None)` when the service has no attestation for `tx_id` yet.
    async fn get_attestation(&self, tx_id: &TxId, network: Network) -> BridgeResult<Option<Vaa>>;
}

/// Bridge indexer.
#[async_trait]
pub trait IndexingApi: Send + Sync {
    /// Transfers initiated by a source transaction. Empty until indexed.
    async fn find_transfers(&self, tx_id: &TxId) -> BridgeResult<Vec<TransferRecord>>;

    async fn get_transfer(&self, id: TransferId) -> BridgeResult<TransferRecord>;

    async fn get_transfer_status(&self, id: TransferId) -> BridgeResult<TransferStatus>;
}

/// Connected signer on the source chain.
#[derive(Clone)]
pub struct SourceSigner {
    pub writer: Arc<dyn SourceChainWriter>,
    pub account: OmniAddress,
}

impl SourceSigner {
    pub fn new(writer: Arc<dyn SourceChainWriter>, account: OmniAddress) -> Self {
        Self { writer, account }
    }

    pub fn chain(&self) -> ChainKind {
        self.writer.chain()
    }
}

impl fmt::Debug for SourceSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSigner")
            .field("chain", &self.chain())
            .field("account", &self.account)
            .finish()
    }
}

/// Connected signer on the destination chain.
#[derive(Clone)]
pub struct DestinationSigner {
    pub writer: Arc<dyn DestinationChainWriter>,
    pub account: OmniAddress,
}

impl DestinationSigner {
    pub fn new(writer: Arc<dyn DestinationChainWriter>, account: OmniAddress) -> Self {
        Self { writer, account }
    }

    pub fn chain(&self) -> ChainKind {
        self.writer.chain()
    }
}

impl fmt::Debug for DestinationSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationSigner")
            .field("chain", &self.chain())
            .field("account", &self.account)
            .finish()
    }
}

/// Both signers a registration needs.
#[derive(Clone, Debug)]
pub struct SignerContext {
    pub source: SourceSigner,
    pub destination: DestinationSigner,
}
