//! Core types for Omni Bridge orchestration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Placeholder name used when a token has no readable metadata.
pub const UNKNOWN_TOKEN_NAME: &str = "Unknown Token";

/// Placeholder symbol used when a token has no readable metadata.
pub const UNKNOWN_TOKEN_SYMBOL: &str = "UNKNOWN";

/// Chain identifier as used by the Omni Bridge.
///
/// Serialized with the bridge API's own spelling (`"Sol"`, `"Near"`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainKind {
    /// Solana.
    Sol,
    /// Ethereum.
    Eth,
    /// NEAR Protocol.
    Near,
    /// Arbitrum.
    Arb,
    /// Base.
    Base,
}

impl ChainKind {
    /// Every chain the bridge knows about.
    pub const ALL: [ChainKind; 5] = [Self::Sol, Self::Eth, Self::Near, Self::Arb, Self::Base];

    /// Prefix used in omni addresses (`sol:...`).
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Sol => "sol",
            Self::Eth => "eth",
            Self::Near => "near",
            Self::Arb => "arb",
            Self::Base => "base",
        }
    }

    /// Spelling used by the bridge indexing API.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Sol => "Sol",
            Self::Eth => "Eth",
            Self::Near => "Near",
            Self::Arb => "Arb",
            Self::Base => "Base",
        }
    }

    /// Get the chain name for display.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Sol => "Solana",
            Self::Eth => "Ethereum",
            Self::Near => "NEAR",
            Self::Arb => "Arbitrum",
            Self::Base => "Base",
        }
    }

    /// Check if this is an EVM chain.
    pub fn is_evm(&self) -> bool {
        matches!(self, Self::Eth | Self::Arb | Self::Base)
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ChainKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sol" | "solana" => Ok(Self::Sol),
            "eth" | "ethereum" => Ok(Self::Eth),
            "near" => Ok(Self::Near),
            "arb" | "arbitrum" => Ok(Self::Arb),
            "base" => Ok(Self::Base),
            other => Err(BridgeError::UnsupportedChain(other.to_string())),
        }
    }
}

/// Network environment, passed explicitly with every call that depends on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Self::Mainnet),
            "testnet" | "devnet" => Ok(Self::Testnet),
            other => Err(BridgeError::Config(format!("unknown network: {}", other))),
        }
    }
}

/// Chain-scoped account or contract address, rendered as `chain:address`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OmniAddress {
    chain: ChainKind,
    address: String,
}

impl OmniAddress {
    /// Create an address on `chain`. EVM addresses are lowercased.
    pub fn new(chain: ChainKind, address: impl Into<String>) -> BridgeResult<Self> {
        let address = address.into().trim().to_string();
        if address.is_empty() {
            return Err(BridgeError::InvalidAddress(format!(
                "empty {} address",
                chain
            )));
        }

        let address = if chain.is_evm() {
            let hex_part = address
                .strip_prefix("0x")
                .or_else(|| address.strip_prefix("0X"))
                .unwrap_or(&address);
            if hex_part.len() != 40 || hex::decode(hex_part).is_err() {
                return Err(BridgeError::InvalidAddress(format!(
                    "{} is not a 20-byte hex address",
                    address
                )));
            }
            format!("0x{}", hex_part.to_lowercase())
        } else {
            address
        };

        Ok(Self { chain, address })
    }

    pub fn sol(address: impl Into<String>) -> BridgeResult<Self> {
        Self::new(ChainKind::Sol, address)
    }

    pub fn near(account_id: impl Into<String>) -> BridgeResult<Self> {
        Self::new(ChainKind::Near, account_id)
    }

    pub fn chain(&self) -> ChainKind {
        self.chain
    }

    /// The raw address without the chain prefix.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for OmniAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain.prefix(), self.address)
    }
}

impl FromStr for OmniAddress {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, address) = s.split_once(':').ok_or_else(|| {
            BridgeError::InvalidAddress(format!("{} has no chain prefix", s))
        })?;
        Self::new(prefix.parse()?, address)
    }
}

impl TryFrom<String> for OmniAddress {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OmniAddress> for String {
    fn from(value: OmniAddress) -> Self {
        value.to_string()
    }
}

/// Transaction identifier (signature or hash) on some chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex-encoded signed attestation (Wormhole VAA).
///
/// Always holds non-empty lowercase hex, whether built in code or deserialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Vaa(String);

impl TryFrom<String> for Vaa {
    type Error = BridgeError;

    fn try_from(value: String) -> BridgeResult<Self> {
        Self::from_hex(value)
    }
}

impl From<Vaa> for String {
    fn from(vaa: Vaa) -> Self {
        vaa.0
    }
}

impl Vaa {
    /// Wrap an already hex-encoded payload.
    pub fn from_hex(hex_payload: impl Into<String>) -> BridgeResult<Self> {
        let payload = hex_payload.into();
        let trimmed = payload.strip_prefix("0x").unwrap_or(&payload);
        if trimmed.is_empty() || hex::decode(trimmed).is_err() {
            return Err(BridgeError::Serialization("VAA is not valid hex".into()));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn from_bytes(bytes: &[u8]) -> BridgeResult<Self> {
        if bytes.is_empty() {
            return Err(BridgeError::Serialization("VAA is empty".into()));
        }
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    pub fn to_bytes(&self) -> BridgeResult<Vec<u8>> {
        hex::decode(&self.0).map_err(|e| BridgeError::Serialization(format!("VAA hex: {}", e)))
    }
}

/// Descriptive metadata and balance for a token, in smallest units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    /// Mint / contract address.
    pub address: OmniAddress,
    /// Token symbol.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Decimal places.
    pub decimals: u8,
    /// Owner balance in smallest units (zero when unknown).
    #[serde(with = "amount")]
    pub balance: u128,
    /// Total supply in smallest units.
    #[serde(with = "amount")]
    pub total_supply: u128,
    /// Image reference from the metadata document.
    pub image: Option<String>,
}

impl TokenDescriptor {
    pub fn chain(&self) -> ChainKind {
        self.address.chain()
    }

    /// True when name and symbol came from the placeholder fallback.
    pub fn has_placeholder_metadata(&self) -> bool {
        self.name == UNKNOWN_TOKEN_NAME && self.symbol == UNKNOWN_TOKEN_SYMBOL
    }
}

/// A token in an owner's wallet with its resolved metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletToken {
    pub address: OmniAddress,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(with = "amount")]
    pub balance: u128,
    pub image: Option<String>,
    /// Account holding the balance, where the chain has one.
    pub token_account: Option<String>,
}

/// Fee quote for a route, in smallest units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Fee deducted from the transferred token.
    #[serde(with = "amount")]
    pub fee: u128,
    /// Fee paid in the source chain's native currency.
    #[serde(with = "amount")]
    pub native_fee: u128,
}

/// The exact payload handed to the source chain's bridge entry point.
///
/// Fields are private so an intent cannot change after it is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferIntent {
    token: OmniAddress,
    recipient: OmniAddress,
    #[serde(with = "amount")]
    amount: u128,
    #[serde(with = "amount")]
    fee: u128,
    #[serde(with = "amount")]
    native_fee: u128,
}

impl TransferIntent {
    pub(crate) fn new(token: OmniAddress, recipient: OmniAddress, amount: u128, quote: FeeQuote) -> Self {
        Self {
            token,
            recipient,
            amount,
            fee: quote.fee,
            native_fee: quote.native_fee,
        }
    }

    pub fn token(&self) -> &OmniAddress {
        &self.token
    }

    pub fn recipient(&self) -> &OmniAddress {
        &self.recipient
    }

    pub fn amount(&self) -> u128 {
        self.amount
    }

    pub fn fee(&self) -> u128 {
        self.fee
    }

    pub fn native_fee(&self) -> u128 {
        self.native_fee
    }
}

/// Request for the attestation of one source transaction.
///
/// Consumed by value when fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestationRequest {
    pub tx_id: TxId,
    pub source_chain: ChainKind,
    pub network: Network,
}

/// Structured event returned by some bridge entry points instead of a tx id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitTransferEvent {
    /// Chain the transfer originated on, when the event carries it.
    pub origin_chain: Option<ChainKind>,
    /// Bridge nonce assigned on the origin chain.
    pub origin_nonce: u64,
}

/// Outcome of an irrevocable transfer submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionResult {
    /// Plain transaction identifier.
    Transaction { tx_id: TxId },
    /// Structured transfer event.
    Event(InitTransferEvent),
}

impl SubmissionResult {
    pub fn transaction(tx_id: TxId) -> Self {
        Self::Transaction { tx_id }
    }

    pub fn tx_id(&self) -> Option<&TxId> {
        match self {
            Self::Transaction { tx_id } => Some(tx_id),
            Self::Event(_) => None,
        }
    }
}

/// Indexer key of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferId {
    pub origin_chain: ChainKind,
    pub origin_nonce: u64,
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin_chain.prefix(), self.origin_nonce)
    }
}

/// Fee fields as reported by the indexer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFee {
    #[serde(default, with = "amount")]
    pub fee: u128,
    #[serde(default, with = "amount")]
    pub native_fee: u128,
}

/// Transfer message as recorded by the indexer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMessage {
    pub token: String,
    #[serde(with = "amount")]
    pub amount: u128,
    pub sender: String,
    pub recipient: String,
    #[serde(default)]
    pub fee: TransferFee,
    #[serde(default)]
    pub msg: String,
}

/// Transfer record observed through the indexing service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: TransferId,
    #[serde(default)]
    pub transfer_message: Option<TransferMessage>,
    #[serde(default)]
    pub initialized: Option<serde_json::Value>,
    #[serde(default)]
    pub finalised: Option<serde_json::Value>,
    #[serde(default)]
    pub claimed: Option<serde_json::Value>,
}

/// Delivery status reported by the indexer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Initialized,
    Signed,
    FastFinalisedOnNear,
    FinalisedOnNear,
    FastFinalised,
    Finalised,
    Claimed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TransferStatus {
    /// Get a human-readable description.
    pub fn description(&self) -> &str {
        match self {
            Self::Initialized => "Transfer initialized on source chain",
            Self::Signed => "Transfer signed by bridge",
            Self::FastFinalisedOnNear => "Fast-finalised on NEAR",
            Self::FinalisedOnNear => "Finalised on NEAR",
            Self::FastFinalised => "Fast-finalised on destination",
            Self::Finalised => "Finalised on destination",
            Self::Claimed => "Fee claimed by relayer",
            Self::Failed => "Transfer failed",
            Self::Unknown => "Unknown status",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalised | Self::Claimed | Self::Failed)
    }
}

/// Whether a token can be bridged to the destination chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,
    NotRegistered,
    /// The check was cancelled before it could answer.
    Unknown,
}

impl RegistrationStatus {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }
}

/// Serde adapter for `u128` amounts sent as JSON strings or numbers.
///
/// Numbers are read from their raw text, so integers wider than 64 bits
/// (yoctoNEAR, wei) keep every digit.
pub mod amount {
    use serde::de::{self, Deserialize};
    use serde::{Deserializer, Serializer};
    use serde_json::value::RawValue;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = <Box<RawValue>>::deserialize(deserializer)?;
        parse(raw.get()).map_err(de::Error::custom)
    }

    /// Deserialize an optional amount; `null` and a missing field become `None`.
    pub fn deserialize_opt<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u128>, D::Error> {
        let raw = <Option<Box<RawValue>>>::deserialize(deserializer)?;
        raw.map(|raw| parse(raw.get()))
            .transpose()
            .map_err(de::Error::custom)
    }

    /// Parse the JSON text of an amount: an integer literal of any width or a
    /// string holding one.
    pub fn parse(text: &str) -> Result<u128, String> {
        let text = text.trim();
        let digits = match text.strip_prefix('"') {
            Some(quoted) => quoted
                .strip_suffix('"')
                .ok_or_else(|| format!("unterminated amount string: {}", text))?
                .trim(),
            None => text,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("expected a non-negative integer amount, got {}", text));
        }
        digits
            .parse()
            .map_err(|e| format!("amount {} out of range: {}", digits, e))
    }
}
