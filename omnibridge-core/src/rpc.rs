//! JSON-RPC chain readers for Solana, NEAR and EVM chains.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{json, Value};

use crate::clients::{ChainReader, MintInfo, TokenHolding, TokenMetadata};
use crate::config::OrchestratorConfig;
use crate::error::{BridgeError, BridgeResult, QueryStep};
use crate::metaplex;
use crate::types::{amount, ChainKind, OmniAddress};

// ═══════════════════════════════════════════════════════════════════════════════
// JSON-RPC TRANSPORT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<Value>,
}

#[derive(Clone, Debug)]
struct JsonRpc {
    url: String,
    client: reqwest::Client,
}

impl JsonRpc {
    /// Call `method` and decode its `result` straight from the response body.
    async fn call<T: DeserializeOwned>(
        &self,
        step: QueryStep,
        method: &str,
        params: Value,
    ) -> BridgeResult<T> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BridgeError::ExternalQuery {
                step,
                message: format!("{}: {}", method, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::from_http_status(step, status.as_u16(), body));
        }

        let body: RpcResponse<T> =
            response.json().await.map_err(|e| BridgeError::ExternalQuery {
                step,
                message: format!("{}: invalid response: {}", method, e),
            })?;

        if let Some(error) = body.error {
            return Err(BridgeError::ExternalQuery {
                step,
                message: format!("{}: {}", method, error),
            });
        }

        body.result.ok_or_else(|| BridgeError::ExternalQuery {
            step,
            message: format!("{}: missing result in response", method),
        })
    }
}

fn malformed(step: QueryStep, what: &str) -> BridgeError {
    BridgeError::ExternalQuery {
        step,
        message: format!("malformed response: {}", what),
    }
}

fn wrong_chain(expected: &str, address: &OmniAddress) -> BridgeError {
    BridgeError::UnsupportedChain(format!(
        "{} reader cannot read {}",
        expected, address
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOLANA
// ═══════════════════════════════════════════════════════════════════════════════

/// SPL Token program; owner listings cover accounts it manages.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[derive(Deserialize)]
struct RpcValue<T> {
    value: T,
}

/// Account fetched with `jsonParsed` encoding.
#[derive(Deserialize)]
struct ParsedAccount {
    data: Box<RawValue>,
}

#[derive(Deserialize)]
struct ParsedData {
    parsed: ParsedInfo,
}

#[derive(Deserialize)]
struct ParsedInfo {
    #[serde(rename = "type")]
    kind: String,
    info: Box<RawValue>,
}

impl ParsedAccount {
    /// The parsed `info` when the owning program reports the account as `kind`.
    fn info<T: DeserializeOwned>(&self, kind: &str) -> Option<T> {
        let data: ParsedData = serde_json::from_str(self.data.get()).ok()?;
        if data.parsed.kind != kind {
            return None;
        }
        serde_json::from_str(data.parsed.info.get()).ok()
    }
}

#[derive(Deserialize)]
struct KeyedAccount<A> {
    pubkey: String,
    account: A,
}

/// Account fetched with `base64` encoding: `[payload, encoding]`.
#[derive(Deserialize)]
struct EncodedAccount {
    data: (String, String),
}

#[derive(Deserialize)]
struct MintData {
    decimals: u8,
    #[serde(deserialize_with = "amount::deserialize")]
    supply: u128,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountData {
    mint: String,
    token_amount: TokenAmount,
}

#[derive(Deserialize)]
struct TokenAmount {
    #[serde(deserialize_with = "amount::deserialize")]
    amount: u128,
    decimals: u8,
}

/// Solana JSON-RPC reader for SPL mints, Metaplex metadata and balances.
#[derive(Clone, Debug)]
pub struct SolanaRpcClient {
    rpc: JsonRpc,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            rpc: JsonRpc {
                url: rpc_url.into(),
                client,
            },
        }
    }

    fn ensure_chain(address: &OmniAddress) -> BridgeResult<()> {
        match address.chain() {
            ChainKind::Sol => Ok(()),
            _ => Err(wrong_chain("Solana", address)),
        }
    }

    /// Raw bytes of the Metaplex metadata account for `mint`, if any.
    async fn metadata_account(&self, mint: &str) -> BridgeResult<Option<Vec<u8>>> {
        let pda = metaplex::metadata_address(mint)?;
        let account: RpcValue<Option<EncodedAccount>> = self
            .rpc
            .call(
                QueryStep::Metadata,
                "getAccountInfo",
                json!([pda, { "encoding": "base64" }]),
            )
            .await?;

        let encoded = match account.value {
            Some(account) => Some(account.data.0),
            None => self.scan_metadata_accounts(mint).await,
        };

        encoded
            .map(|data| {
                BASE64.decode(data.as_bytes()).map_err(|e| {
                    BridgeError::Serialization(format!("metadata account is not base64: {}", e))
                })
            })
            .transpose()
    }

    /// Search the metadata program's accounts by mint. Many public nodes
    /// refuse `getProgramAccounts`, so failures only mean "not found".
    async fn scan_metadata_accounts(&self, mint: &str) -> Option<String> {
        let accounts: Vec<KeyedAccount<EncodedAccount>> = match self
            .rpc
            .call(
                QueryStep::Metadata,
                "getProgramAccounts",
                json!([
                    metaplex::METADATA_PROGRAM_ID,
                    {
                        "encoding": "base64",
                        "filters": [
                            { "memcmp": { "offset": metaplex::MINT_OFFSET, "bytes": mint } }
                        ]
                    }
                ]),
            )
            .await
        {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::debug!(mint, error = %e, "metadata account scan unavailable");
                return None;
            }
        };
        accounts
            .into_iter()
            .next()
            .map(|account| account.account.data.0)
    }

    /// Token accounts of `owner` matching `filter` (`mint` or `programId`).
    async fn token_accounts(
        &self,
        owner: &OmniAddress,
        filter: Value,
    ) -> BridgeResult<Vec<(String, TokenAccountData)>> {
        let accounts: RpcValue<Vec<KeyedAccount<ParsedAccount>>> = self
            .rpc
            .call(
                QueryStep::Balance,
                "getTokenAccountsByOwner",
                json!([owner.address(), filter, { "encoding": "jsonParsed" }]),
            )
            .await?;

        accounts
            .value
            .into_iter()
            .map(|keyed| -> BridgeResult<(String, TokenAccountData)> {
                let data = keyed
                    .account
                    .info("account")
                    .ok_or_else(|| malformed(QueryStep::Balance, "token account"))?;
                Ok((keyed.pubkey, data))
            })
            .collect()
    }

    /// Image reference from the off-chain metadata document. Best effort.
    async fn fetch_image(&self, uri: &str) -> Option<String> {
        if uri.is_empty() {
            return None;
        }
        let document: Value = match self.rpc.client.get(uri).send().await {
            Ok(response) if response.status().is_success() => response.json().await.ok()?,
            Ok(response) => {
                tracing::debug!(uri, status = %response.status(), "metadata document unavailable");
                return None;
            }
            Err(e) => {
                tracing::debug!(uri, error = %e, "metadata document unavailable");
                return None;
            }
        };
        document["image"].as_str().map(str::to_string)
    }
}

#[async_trait]
impl ChainReader for SolanaRpcClient {
    async fn mint_info(&self, token: &OmniAddress) -> BridgeResult<MintInfo> {
        Self::ensure_chain(token)?;
        let account: RpcValue<Option<ParsedAccount>> = self
            .rpc
            .call(
                QueryStep::Metadata,
                "getAccountInfo",
                json!([token.address(), { "encoding": "jsonParsed" }]),
            )
            .await?;

        let account = account.value.ok_or_else(|| BridgeError::ExternalQuery {
            step: QueryStep::Metadata,
            message: format!("mint {} not found", token),
        })?;
        let mint: MintData = account
            .info("mint")
            .ok_or_else(|| malformed(QueryStep::Metadata, "account is not a token mint"))?;

        Ok(MintInfo {
            decimals: mint.decimals,
            total_supply: mint.supply,
        })
    }

    async fn token_metadata(&self, token: &OmniAddress) -> BridgeResult<Option<TokenMetadata>> {
        Self::ensure_chain(token)?;
        let Some(data) = self.metadata_account(token.address()).await? else {
            return Ok(None);
        };
        let on_chain = metaplex::parse_metadata(&data)?;
        let image = self.fetch_image(&on_chain.uri).await;

        Ok(Some(TokenMetadata {
            name: on_chain.name,
            symbol: on_chain.symbol,
            image,
        }))
    }

    async fn token_balance(&self, token: &OmniAddress, owner: &OmniAddress) -> BridgeResult<u128> {
        Self::ensure_chain(token)?;
        Self::ensure_chain(owner)?;
        let accounts = self
            .token_accounts(owner, json!({ "mint": token.address() }))
            .await?;

        accounts.iter().try_fold(0u128, |total, (_, account)| {
            total
                .checked_add(account.token_amount.amount)
                .ok_or_else(|| malformed(QueryStep::Balance, "balance overflow"))
        })
    }

    async fn native_balance(&self, account: &OmniAddress) -> BridgeResult<u128> {
        Self::ensure_chain(account)?;
        let lamports: RpcValue<u64> = self
            .rpc
            .call(QueryStep::Balance, "getBalance", json!([account.address()]))
            .await?;
        Ok(lamports.value.into())
    }

    async fn token_holdings(&self, owner: &OmniAddress) -> BridgeResult<Vec<TokenHolding>> {
        Self::ensure_chain(owner)?;
        let accounts = self
            .token_accounts(owner, json!({ "programId": TOKEN_PROGRAM_ID }))
            .await?;

        accounts
            .into_iter()
            .map(|(pubkey, account)| -> BridgeResult<TokenHolding> {
                Ok(TokenHolding {
                    token: OmniAddress::sol(&account.mint)?,
                    account: Some(pubkey),
                    balance: account.token_amount.amount,
                    decimals: account.token_amount.decimals,
                })
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NEAR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct CallFunctionResult {
    #[serde(default)]
    result: Option<Vec<u8>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct FtMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    decimals: u8,
}

/// Amount returned by a view method as a JSON string or number.
#[derive(Deserialize)]
struct ViewAmount(#[serde(deserialize_with = "amount::deserialize")] u128);

#[derive(Deserialize)]
struct ViewAccount {
    #[serde(deserialize_with = "amount::deserialize")]
    amount: u128,
}

/// NEAR JSON-RPC reader for NEP-141 tokens and account balances.
#[derive(Clone, Debug)]
pub struct NearRpcClient {
    rpc: JsonRpc,
}

impl NearRpcClient {
    pub fn new(rpc_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            rpc: JsonRpc {
                url: rpc_url.into(),
                client,
            },
        }
    }

    fn ensure_chain(address: &OmniAddress) -> BridgeResult<()> {
        match address.chain() {
            ChainKind::Near => Ok(()),
            _ => Err(wrong_chain("NEAR", address)),
        }
    }

    /// Call a view method and decode its JSON return value.
    async fn view_function<T: DeserializeOwned>(
        &self,
        step: QueryStep,
        contract: &str,
        method: &str,
        args: Value,
    ) -> BridgeResult<T> {
        let args = BASE64.encode(args.to_string().as_bytes());
        let call: CallFunctionResult = self
            .rpc
            .call(
                step,
                "query",
                json!({
                    "request_type": "call_function",
                    "finality": "final",
                    "account_id": contract,
                    "method_name": method,
                    "args_base64": args
                }),
            )
            .await?;

        if let Some(error) = call.error {
            return Err(BridgeError::ExternalQuery {
                step,
                message: format!("{}.{}: {}", contract, method, error),
            });
        }

        let bytes = call
            .result
            .ok_or_else(|| malformed(step, "call_function result"))?;
        serde_json::from_slice(&bytes).map_err(|e| BridgeError::ExternalQuery {
            step,
            message: format!("{}.{}: unexpected return value: {}", contract, method, e),
        })
    }
}

#[async_trait]
impl ChainReader for NearRpcClient {
    async fn mint_info(&self, token: &OmniAddress) -> BridgeResult<MintInfo> {
        Self::ensure_chain(token)?;
        let metadata: FtMetadata = self
            .view_function(QueryStep::Metadata, token.address(), "ft_metadata", json!({}))
            .await?;
        let ViewAmount(total_supply) = self
            .view_function(QueryStep::Metadata, token.address(), "ft_total_supply", json!({}))
            .await?;

        Ok(MintInfo {
            decimals: metadata.decimals,
            total_supply,
        })
    }

    async fn token_metadata(&self, token: &OmniAddress) -> BridgeResult<Option<TokenMetadata>> {
        Self::ensure_chain(token)?;
        let metadata: FtMetadata = self
            .view_function(QueryStep::Metadata, token.address(), "ft_metadata", json!({}))
            .await?;

        Ok(match (metadata.name, metadata.symbol) {
            (Some(name), Some(symbol)) => Some(TokenMetadata {
                name,
                symbol,
                image: metadata.icon,
            }),
            _ => None,
        })
    }

    async fn token_balance(&self, token: &OmniAddress, owner: &OmniAddress) -> BridgeResult<u128> {
        Self::ensure_chain(token)?;
        Self::ensure_chain(owner)?;
        let ViewAmount(balance) = self
            .view_function(
                QueryStep::Balance,
                token.address(),
                "ft_balance_of",
                json!({ "account_id": owner.address() }),
            )
            .await?;
        Ok(balance)
    }

    async fn native_balance(&self, account: &OmniAddress) -> BridgeResult<u128> {
        Self::ensure_chain(account)?;
        let view: ViewAccount = self
            .rpc
            .call(
                QueryStep::Balance,
                "query",
                json!({
                    "request_type": "view_account",
                    "finality": "final",
                    "account_id": account.address()
                }),
            )
            .await?;
        Ok(view.amount)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVM
// ═══════════════════════════════════════════════════════════════════════════════

const SELECTOR_DECIMALS: &str = "0x313ce567";
const SELECTOR_TOTAL_SUPPLY: &str = "0x18160ddd";
const SELECTOR_BALANCE_OF: &str = "0x70a08231";
const SELECTOR_NAME: &str = "0x06fdde03";
const SELECTOR_SYMBOL: &str = "0x95d89b41";

/// EVM JSON-RPC reader for ERC-20 tokens and native balances.
#[derive(Clone, Debug)]
pub struct EvmRpcClient {
    chain: ChainKind,
    rpc: JsonRpc,
}

impl EvmRpcClient {
    pub fn new(chain: ChainKind, rpc_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            chain,
            rpc: JsonRpc {
                url: rpc_url.into(),
                client,
            },
        }
    }

    fn ensure_chain(&self, address: &OmniAddress) -> BridgeResult<()> {
        if address.chain() == self.chain {
            Ok(())
        } else {
            Err(wrong_chain(self.chain.display_name(), address))
        }
    }

    async fn eth_call(&self, step: QueryStep, to: &str, data: String) -> BridgeResult<Vec<u8>> {
        let hex_data: String = self
            .rpc
            .call(step, "eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        hex::decode(hex_data.trim_start_matches("0x"))
            .map_err(|_| malformed(step, "eth_call result is not hex"))
    }

    async fn call_string(&self, to: &str, selector: &str) -> BridgeResult<Option<String>> {
        let data = self
            .eth_call(QueryStep::Metadata, to, selector.to_string())
            .await?;
        Ok(decode_abi_string(&data))
    }
}

/// Decode a big-endian 32-byte word into `u128`, rejecting larger values.
fn decode_uint(word: &[u8]) -> Option<u128> {
    if word.len() < 32 || word[..16].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..32]);
    Some(u128::from_be_bytes(buf))
}

/// Decode a dynamic ABI `string` return value.
fn decode_abi_string(data: &[u8]) -> Option<String> {
    let offset = usize::try_from(decode_uint(data.get(..32)?)?).ok()?;
    let len_end = offset.checked_add(32)?;
    let len = usize::try_from(decode_uint(data.get(offset..len_end)?)?).ok()?;
    let bytes = data.get(len_end..len_end.checked_add(len)?)?;
    String::from_utf8(bytes.to_vec()).ok()
}

fn hex_quantity(step: QueryStep, raw: &str) -> BridgeResult<u128> {
    u128::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|_| malformed(step, "hex quantity"))
}

#[async_trait]
impl ChainReader for EvmRpcClient {
    async fn mint_info(&self, token: &OmniAddress) -> BridgeResult<MintInfo> {
        self.ensure_chain(token)?;
        let decimals = self
            .eth_call(QueryStep::Metadata, token.address(), SELECTOR_DECIMALS.to_string())
            .await?;
        let decimals = decode_uint(&decimals)
            .and_then(|d| u8::try_from(d).ok())
            .ok_or_else(|| BridgeError::ExternalQuery {
                step: QueryStep::Metadata,
                message: format!("{} is not an ERC-20 token", token),
            })?;

        let supply = self
            .eth_call(QueryStep::Metadata, token.address(), SELECTOR_TOTAL_SUPPLY.to_string())
            .await?;
        let total_supply =
            decode_uint(&supply).ok_or_else(|| malformed(QueryStep::Metadata, "totalSupply"))?;

        Ok(MintInfo {
            decimals,
            total_supply,
        })
    }

    async fn token_metadata(&self, token: &OmniAddress) -> BridgeResult<Option<TokenMetadata>> {
        self.ensure_chain(token)?;
        let name = self.call_string(token.address(), SELECTOR_NAME).await?;
        let symbol = self.call_string(token.address(), SELECTOR_SYMBOL).await?;

        Ok(match (name, symbol) {
            (Some(name), Some(symbol)) => Some(TokenMetadata {
                name,
                symbol,
                image: None,
            }),
            _ => None,
        })
    }

    async fn token_balance(&self, token: &OmniAddress, owner: &OmniAddress) -> BridgeResult<u128> {
        self.ensure_chain(token)?;
        self.ensure_chain(owner)?;
        let data = format!(
            "{}{:0>64}",
            SELECTOR_BALANCE_OF,
            owner.address().trim_start_matches("0x")
        );
        let balance = self.eth_call(QueryStep::Balance, token.address(), data).await?;
        decode_uint(&balance).ok_or_else(|| malformed(QueryStep::Balance, "balanceOf"))
    }

    async fn native_balance(&self, account: &OmniAddress) -> BridgeResult<u128> {
        self.ensure_chain(account)?;
        let quantity: String = self
            .rpc
            .call(
                QueryStep::Balance,
                "eth_getBalance",
                json!([account.address(), "latest"]),
            )
            .await?;
        hex_quantity(QueryStep::Balance, &quantity)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPATCH
// ═══════════════════════════════════════════════════════════════════════════════

/// Routes each read to the reader registered for the address's chain.
#[derive(Clone, Default)]
pub struct MultiChainReader {
    readers: HashMap<ChainKind, Arc<dyn ChainReader>>,
}

impl MultiChainReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reader for `chain`, replacing any previous one.
    pub fn with_reader(mut self, chain: ChainKind, reader: Arc<dyn ChainReader>) -> Self {
        self.readers.insert(chain, reader);
        self
    }

    /// Build readers for every chain with a configured endpoint.
    pub fn from_config(config: &OrchestratorConfig) -> BridgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let mut reader = Self::new();
        for (chain, endpoint) in &config.endpoints {
            let url = endpoint.rpc_url.clone();
            let chain_reader: Arc<dyn ChainReader> = match chain {
                ChainKind::Sol => Arc::new(SolanaRpcClient::new(url, client.clone())),
                ChainKind::Near => Arc::new(NearRpcClient::new(url, client.clone())),
                ChainKind::Eth | ChainKind::Arb | ChainKind::Base => {
                    Arc::new(EvmRpcClient::new(*chain, url, client.clone()))
                }
            };
            reader = reader.with_reader(*chain, chain_reader);
        }
        Ok(reader)
    }

    pub fn chains(&self) -> Vec<ChainKind> {
        let mut chains: Vec<_> = self.readers.keys().copied().collect();
        chains.sort();
        chains
    }

    fn reader(&self, chain: ChainKind) -> BridgeResult<&Arc<dyn ChainReader>> {
        self.readers.get(&chain).ok_or_else(|| {
            BridgeError::UnsupportedChain(format!("no reader configured for {}", chain))
        })
    }
}

#[async_trait]
impl ChainReader for MultiChainReader {
    async fn mint_info(&self, token: &OmniAddress) -> BridgeResult<MintInfo> {
        self.reader(token.chain())?.mint_info(token).await
    }

    async fn token_metadata(&self, token: &OmniAddress) -> BridgeResult<Option<TokenMetadata>> {
        self.reader(token.chain())?.token_metadata(token).await
    }

    async fn token_balance(&self, token: &OmniAddress, owner: &OmniAddress) -> BridgeResult<u128> {
        self.reader(token.chain())?.token_balance(token, owner).await
    }

    async fn native_balance(&self, account: &OmniAddress) -> BridgeResult<u128> {
        self.reader(account.chain())?.native_balance(account).await
    }

    async fn token_holdings(&self, owner: &OmniAddress) -> BridgeResult<Vec<TokenHolding>> {
        self.reader(owner.chain())?.token_holdings(owner).await
    }
}
