//! Recording mock clients shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use omnibridge_core::{
    AttestationConfig, AttestationService, BridgeClients, BridgeError, BridgeResult, ChainKind,
    ChainReader, DestinationChainWriter, DestinationSigner, FeeApi, FeeResponse, IndexingApi,
    MintInfo, Network, OmniAddress, OmniBridge, OrchestratorConfig, PollConfig, QueryStep,
    SignerContext, SourceChainWriter, SourceSigner, SubmissionResult, TokenDescriptor,
    TokenHolding, TokenMetadata, TransferId, TransferIntent, TransferRecord, TransferStatus, TxId, Vaa,
};

pub const SOL_MINT: &str = "So1MintAddress1111111111111111111111111111";
pub const SOL_SENDER: &str = "So1Sender11111111111111111111111111111111";
pub const NEAR_RECIPIENT: &str = "near:bob.testnet";

pub fn sol_token() -> OmniAddress {
    OmniAddress::sol(SOL_MINT).unwrap()
}

pub fn sol_sender() -> OmniAddress {
    OmniAddress::sol(SOL_SENDER).unwrap()
}

pub fn near_account() -> OmniAddress {
    OmniAddress::near("alice.testnet").unwrap()
}

pub fn descriptor() -> TokenDescriptor {
    TokenDescriptor {
        address: sol_token(),
        symbol: "WTH".into(),
        name: "Wrapped Thing".into(),
        decimals: 9,
        balance: 5_000_000_000,
        total_supply: 1_000_000_000_000,
        image: None,
    }
}

pub fn record(nonce: u64) -> TransferRecord {
    serde_json::from_value(serde_json::json!({
        "id": { "origin_chain": "Sol", "origin_nonce": nonce },
        "transfer_message": {
            "token": format!("sol:{}", SOL_MINT),
            "amount": "1000000000",
            "sender": format!("sol:{}", SOL_SENDER),
            "recipient": NEAR_RECIPIENT,
            "fee": { "fee": "100", "native_fee": "0" }
        }
    }))
    .unwrap()
}

pub fn vaa() -> Vaa {
    Vaa::from_hex("01000000000100abcdef").unwrap()
}

/// Error an eventually consistent service gives while it catches up.
pub fn transient(step: QueryStep) -> BridgeError {
    BridgeError::ExternalQuery {
        step,
        message: "HTTP 503: unavailable".into(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN READER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct MockReader {
    pub mint: BridgeResult<MintInfo>,
    pub metadata: BridgeResult<Option<TokenMetadata>>,
    pub token_balance: BridgeResult<u128>,
    pub native_balances: HashMap<ChainKind, u128>,
    pub native_calls: AtomicU32,
    pub holdings: BridgeResult<Vec<TokenHolding>>,
    /// Tokens that report no published metadata.
    pub unnamed: Vec<OmniAddress>,
}

impl Default for MockReader {
    fn default() -> Self {
        Self {
            mint: Ok(MintInfo {
                decimals: 9,
                total_supply: 1_000_000_000_000,
            }),
            metadata: Ok(Some(TokenMetadata {
                name: "Wrapped Thing".into(),
                symbol: "WTH".into(),
                image: Some("https://example.org/wth.png".into()),
            })),
            token_balance: Ok(5_000_000_000),
            native_balances: [
                (ChainKind::Sol, 1_000_000_000),
                (ChainKind::Near, 10_000_000_000_000_000_000_000_000),
            ]
            .into_iter()
            .collect(),
            native_calls: AtomicU32::new(0),
            holdings: Ok(vec![]),
            unnamed: vec![],
        }
    }
}

#[async_trait]
impl ChainReader for MockReader {
    async fn mint_info(&self, _token: &OmniAddress) -> BridgeResult<MintInfo> {
        self.mint.clone()
    }

    async fn token_metadata(&self, token: &OmniAddress) -> BridgeResult<Option<TokenMetadata>> {
        if self.unnamed.contains(token) {
            return Ok(None);
        }
        self.metadata.clone()
    }

    async fn token_balance(&self, _token: &OmniAddress, _owner: &OmniAddress) -> BridgeResult<u128> {
        self.token_balance.clone()
    }

    async fn native_balance(&self, account: &OmniAddress) -> BridgeResult<u128> {
        self.native_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .native_balances
            .get(&account.chain())
            .copied()
            .unwrap_or(0))
    }

    async fn token_holdings(&self, _owner: &OmniAddress) -> BridgeResult<Vec<TokenHolding>> {
        self.holdings.clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FEE API
// ═══════════════════════════════════════════════════════════════════════════════

pub struct MockFeeApi {
    pub response: BridgeResult<FeeResponse>,
    pub calls: AtomicU32,
}

impl MockFeeApi {
    pub fn quoting(fee: u128, native_fee: u128) -> Self {
        Self {
            response: Ok(FeeResponse {
                transferred_token_fee: Some(fee),
                native_token_fee: Some(native_fee),
            }),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(BridgeError::from_http_status(
                QueryStep::Fee,
                400,
                "token not registered",
            )),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeeApi for MockFeeApi {
    async fn get_fee(
        &self,
        _sender: &OmniAddress,
        _recipient: &OmniAddress,
        _token: &OmniAddress,
    ) -> BridgeResult<FeeResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTESTATION SERVICE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct MockAttestations {
    pub response: BridgeResult<Option<Vaa>>,
    pub calls: AtomicU32,
    pub requests: Mutex<Vec<(TxId, Network)>>,
}

impl MockAttestations {
    pub fn returning(response: BridgeResult<Option<Vaa>>) -> Self {
        Self {
            response,
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockAttestations {
    fn default() -> Self {
        Self::returning(Ok(Some(vaa())))
    }
}

#[async_trait]
impl AttestationService for MockAttestations {
    async fn get_attestation(&self, tx_id: &TxId, network: Network) -> BridgeResult<Option<Vaa>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((tx_id.clone(), network));
        self.response.clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INDEXER
// ═══════════════════════════════════════════════════════════════════════════════

/// Answer to one `find_transfers` call.
#[derive(Clone, Debug)]
pub enum Lookup {
    NotYet,
    Found(TransferRecord),
    Fails(BridgeError),
}

pub struct MockIndexer {
    script: Mutex<VecDeque<Lookup>>,
    pub status: TransferStatus,
    pub find_calls: AtomicU32,
    pub get_calls: AtomicU32,
    pub status_calls: AtomicU32,
    pub requested: Mutex<Vec<TransferId>>,
}

impl MockIndexer {
    /// Plays `script` in order, then answers "not yet" forever.
    pub fn scripted(script: Vec<Lookup>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            status: TransferStatus::Finalised,
            find_calls: AtomicU32::new(0),
            get_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Finds `found` on attempt `n`.
    pub fn found_on(n: u32, found: TransferRecord) -> Self {
        let mut script: Vec<Lookup> = (1..n).map(|_| Lookup::NotYet).collect();
        script.push(Lookup::Found(found));
        Self::scripted(script)
    }

    pub fn never_found() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn find_calls(&self) -> u32 {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Lookup {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Lookup::NotYet)
    }
}

#[async_trait]
impl IndexingApi for MockIndexer {
    async fn find_transfers(&self, _tx_id: &TxId) -> BridgeResult<Vec<TransferRecord>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        match self.next() {
            Lookup::NotYet => Ok(Vec::new()),
            Lookup::Found(record) => Ok(vec![record]),
            Lookup::Fails(e) => Err(e),
        }
    }

    async fn get_transfer(&self, id: TransferId) -> BridgeResult<TransferRecord> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(id);
        let mut found = record(id.origin_nonce);
        found.id = id;
        Ok(found)
    }

    async fn get_transfer_status(&self, _id: TransferId) -> BridgeResult<TransferStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.status.clone())
    }
}

/// Indexer whose record lookups by id are not ready for the first `misses`
/// calls.
pub struct LaggingEventIndexer {
    pub misses: u32,
    pub get_calls: AtomicU32,
}

#[async_trait]
impl IndexingApi for LaggingEventIndexer {
    async fn find_transfers(&self, _tx_id: &TxId) -> BridgeResult<Vec<TransferRecord>> {
        Ok(Vec::new())
    }

    async fn get_transfer(&self, id: TransferId) -> BridgeResult<TransferRecord> {
        let call = self.get_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.misses {
            return Err(BridgeError::from_http_status(QueryStep::Indexing, 404, "not found"));
        }
        let mut found = record(id.origin_nonce);
        found.id = id;
        Ok(found)
    }

    async fn get_transfer_status(&self, _id: TransferId) -> BridgeResult<TransferStatus> {
        Ok(TransferStatus::FinalisedOnNear)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WRITERS
// ═══════════════════════════════════════════════════════════════════════════════

pub struct MockSource {
    pub chain: ChainKind,
    pub metadata_result: BridgeResult<TxId>,
    pub transfer_result: BridgeResult<SubmissionResult>,
    pub metadata_calls: AtomicU32,
    pub transfer_calls: AtomicU32,
    pub intents: Mutex<Vec<TransferIntent>>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self {
            chain: ChainKind::Sol,
            metadata_result: Ok(TxId::new("metadata-sig")),
            transfer_result: Ok(SubmissionResult::transaction(TxId::new("transfer-sig"))),
            metadata_calls: AtomicU32::new(0),
            transfer_calls: AtomicU32::new(0),
            intents: Mutex::new(Vec::new()),
        }
    }
}

impl MockSource {
    pub fn metadata_calls(&self) -> u32 {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn transfer_calls(&self) -> u32 {
        self.transfer_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceChainWriter for MockSource {
    fn chain(&self) -> ChainKind {
        self.chain
    }

    async fn log_metadata(&self, _token: &OmniAddress) -> BridgeResult<TxId> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata_result.clone()
    }

    async fn init_transfer(&self, intent: &TransferIntent) -> BridgeResult<SubmissionResult> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        self.intents.lock().unwrap().push(intent.clone());
        self.transfer_result.clone()
    }
}

pub struct MockDestination {
    pub chain: ChainKind,
    pub result: BridgeResult<TxId>,
    pub calls: AtomicU32,
    pub received: Mutex<Vec<(ChainKind, Vaa)>>,
}

impl Default for MockDestination {
    fn default() -> Self {
        Self {
            chain: ChainKind::Near,
            result: Ok(TxId::new("deploy-hash")),
            calls: AtomicU32::new(0),
            received: Mutex::new(Vec::new()),
        }
    }
}

impl MockDestination {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DestinationChainWriter for MockDestination {
    fn chain(&self) -> ChainKind {
        self.chain
    }

    async fn deploy_token(&self, source_chain: ChainKind, vaa: &Vaa) -> BridgeResult<TxId> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received
            .lock()
            .unwrap()
            .push((source_chain, vaa.clone()));
        self.result.clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HARNESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Mocks wired into an [`OmniBridge`] with short waits.
pub struct Harness {
    pub reader: Arc<MockReader>,
    pub fees: Arc<MockFeeApi>,
    pub attestations: Arc<MockAttestations>,
    pub indexer: Arc<MockIndexer>,
    pub source: Arc<MockSource>,
    pub destination: Arc<MockDestination>,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            reader: Arc::new(MockReader::default()),
            fees: Arc::new(MockFeeApi::quoting(100, 0)),
            attestations: Arc::new(MockAttestations::default()),
            indexer: Arc::new(MockIndexer::found_on(1, record(7))),
            source: Arc::new(MockSource::default()),
            destination: Arc::new(MockDestination::default()),
        }
    }
}

impl Harness {
    pub fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            attestation: AttestationConfig {
                finality_wait_secs: 80,
                chain_overrides: HashMap::new(),
            },
            polling: PollConfig {
                max_attempts: 20,
                interval_ms: 3_000,
                ..PollConfig::default()
            },
            ..OrchestratorConfig::testnet()
        }
    }

    pub fn bridge(&self) -> OmniBridge {
        self.bridge_with(Self::config())
    }

    pub fn bridge_with(&self, config: OrchestratorConfig) -> OmniBridge {
        OmniBridge::new(
            config,
            BridgeClients {
                reader: self.reader.clone(),
                fees: self.fees.clone(),
                attestations: self.attestations.clone(),
                indexer: self.indexer.clone(),
            },
        )
        .unwrap()
    }

    pub fn source_signer(&self) -> SourceSigner {
        SourceSigner::new(self.source.clone(), sol_sender())
    }

    pub fn signers(&self) -> SignerContext {
        SignerContext {
            source: self.source_signer(),
            destination: DestinationSigner::new(self.destination.clone(), near_account()),
        }
    }
}
