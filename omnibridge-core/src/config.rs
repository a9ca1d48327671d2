//! Configuration for bridge orchestration.
//!
//! Everything a workflow needs to know about its environment lives in
//! [`OrchestratorConfig`] and is handed to each invocation explicitly; there is
//! no process-wide network switch.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, BridgeResult};
use crate::types::{ChainKind, Network};

/// Default number of indexer polls before giving up.
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 20;

/// Default delay between indexer polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

/// Default finality wait before fetching a VAA.
pub const DEFAULT_FINALITY_WAIT_SECS: u64 = 80;

/// Configuration for the orchestrator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Network every workflow targets.
    pub network: Network,
    /// Omni Bridge API base URL (fees and indexer).
    pub bridge_api_url: String,
    /// Wormholescan base URL for mainnet VAAs.
    pub wormholescan_mainnet_url: String,
    /// Wormholescan base URL for testnet VAAs.
    pub wormholescan_testnet_url: String,
    /// RPC endpoints per chain.
    pub endpoints: HashMap<ChainKind, BridgeEndpoint>,
    /// Finality wait settings.
    #[serde(default)]
    pub attestation: AttestationConfig,
    /// Indexer polling settings.
    #[serde(default)]
    pub polling: PollConfig,
    /// Registration preflight settings.
    #[serde(default)]
    pub registration: RegistrationConfig,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::testnet()
    }
}

impl OrchestratorConfig {
    /// Create a testnet configuration.
    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            bridge_api_url: "https://testnet.api.bridge.nearone.org".to_string(),
            wormholescan_mainnet_url: "https://api.wormholescan.io".to_string(),
            wormholescan_testnet_url: "https://api.testnet.wormholescan.io".to_string(),
            endpoints: default_testnet_endpoints(),
            attestation: AttestationConfig::default(),
            polling: PollConfig::default(),
            registration: RegistrationConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Create a mainnet configuration.
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            bridge_api_url: "https://mainnet.api.bridge.nearone.org".to_string(),
            endpoints: default_mainnet_endpoints(),
            ..Self::testnet()
        }
    }

    /// Load configuration from `OMNI_*` environment variables.
    pub fn from_env() -> BridgeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// `OMNI_NETWORK` picks the base profile; every other variable overrides
    /// one field of it.
    pub fn from_lookup<F>(lookup: F) -> BridgeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network: Network = match lookup("OMNI_NETWORK") {
            Some(value) => value.parse()?,
            None => Network::Testnet,
        };

        let mut config = match network {
            Network::Mainnet => Self::mainnet(),
            Network::Testnet => Self::testnet(),
        };

        if let Some(url) = lookup("OMNI_BRIDGE_API_URL") {
            config.bridge_api_url = url;
        }
        if let Some(url) = lookup("OMNI_WORMHOLESCAN_URL") {
            match network {
                Network::Mainnet => config.wormholescan_mainnet_url = url,
                Network::Testnet => config.wormholescan_testnet_url = url,
            }
        }

        for chain in ChainKind::ALL {
            let key = format!("OMNI_{}_RPC_URL", chain.prefix().to_uppercase());
            if let Some(url) = lookup(&key) {
                config
                    .endpoints
                    .entry(chain)
                    .or_insert_with(|| BridgeEndpoint::new(""))
                    .rpc_url = url;
            }

            let key = format!("OMNI_MIN_BALANCE_{}", chain.prefix().to_uppercase());
            if let Some(min) = parse_var::<u128>(&lookup, &key)? {
                config.registration.min_balances.insert(chain, min);
            }
        }

        if let Some(secs) = parse_var(&lookup, "OMNI_FINALITY_WAIT_SECS")? {
            config.attestation.finality_wait_secs = secs;
        }
        if let Some(attempts) = parse_var(&lookup, "OMNI_POLL_MAX_ATTEMPTS")? {
            config.polling.max_attempts = attempts;
        }
        if let Some(interval) = parse_var(&lookup, "OMNI_POLL_INTERVAL_MS")? {
            config.polling.interval_ms = interval;
        }
        if let Some(policy) = lookup("OMNI_POLL_ERROR_POLICY") {
            config.polling.error_policy = match policy.as_str() {
                "retry_all" => PollErrorPolicy::RetryAll,
                "fail_fast_on_rejected" => PollErrorPolicy::FailFastOnRejected,
                other => {
                    return Err(BridgeError::Config(format!(
                        "unknown poll error policy: {}",
                        other
                    )))
                }
            };
        }
        if let Some(secs) = parse_var(&lookup, "OMNI_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no workflow can run with.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.bridge_api_url.trim().is_empty() {
            return Err(BridgeError::Config("bridge API URL is empty".into()));
        }
        if self.wormholescan_url(self.network).trim().is_empty() {
            return Err(BridgeError::Config("wormholescan URL is empty".into()));
        }
        if self.polling.max_attempts == 0 {
            return Err(BridgeError::Config("poll max attempts must be > 0".into()));
        }
        if let Some((chain, _)) = self
            .endpoints
            .iter()
            .find(|(_, endpoint)| endpoint.rpc_url.trim().is_empty())
        {
            return Err(BridgeError::Config(format!("RPC URL for {} is empty", chain)));
        }
        Ok(())
    }

    /// Get the endpoint for a chain.
    pub fn endpoint_for_chain(&self, chain: ChainKind) -> Option<&BridgeEndpoint> {
        self.endpoints.get(&chain)
    }

    /// Wormholescan base URL for `network`.
    pub fn wormholescan_url(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.wormholescan_mainnet_url,
            Network::Testnet => &self.wormholescan_testnet_url,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> BridgeResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| BridgeError::Config(format!("{}: {}", key, e)))
        })
        .transpose()
}

/// Endpoint configuration for a chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeEndpoint {
    /// RPC URL for the chain.
    pub rpc_url: String,
    /// Chain explorer URL.
    pub explorer_url: Option<String>,
}

impl BridgeEndpoint {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            explorer_url: None,
        }
    }

    fn with_explorer(mut self, url: &str) -> Self {
        self.explorer_url = Some(url.to_string());
        self
    }
}

/// Finality wait before an attestation fetch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttestationConfig {
    /// Wait applied when no per-chain override exists.
    pub finality_wait_secs: u64,
    /// Per source chain overrides.
    #[serde(default)]
    pub chain_overrides: HashMap<ChainKind, u64>,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            finality_wait_secs: DEFAULT_FINALITY_WAIT_SECS,
            chain_overrides: HashMap::new(),
        }
    }
}

impl AttestationConfig {
    /// Wait to apply for transactions emitted on `chain`.
    pub fn finality_wait(&self, chain: ChainKind) -> Duration {
        let secs = self
            .chain_overrides
            .get(&chain)
            .copied()
            .unwrap_or(self.finality_wait_secs);
        Duration::from_secs(secs)
    }
}

/// How the poller treats a failed indexer query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollErrorPolicy {
    /// Every failure counts as "not indexed yet".
    RetryAll,
    /// Requests the indexer refuses (4xx other than 404/408/429) end polling.
    #[default]
    FailFastOnRejected,
}

/// Indexer polling settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
    #[serde(default)]
    pub error_policy: PollErrorPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            error_policy: PollErrorPolicy::default(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Minimum native balances a signer must hold before registering a token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub min_balances: HashMap<ChainKind, u128>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        let min_balances = [
            (ChainKind::Sol, 50_000_000),                       // 0.05 SOL
            (ChainKind::Near, 3_000_000_000_000_000_000_000_000), // 3 NEAR storage deposit
            (ChainKind::Eth, 10_000_000_000_000_000),           // 0.01 ETH
            (ChainKind::Arb, 1_000_000_000_000_000),            // 0.001 ETH
            (ChainKind::Base, 1_000_000_000_000_000),           // 0.001 ETH
        ]
        .into_iter()
        .collect();

        Self { min_balances }
    }
}

impl RegistrationConfig {
    pub fn min_balance(&self, chain: ChainKind) -> u128 {
        self.min_balances.get(&chain).copied().unwrap_or(0)
    }
}

fn default_testnet_endpoints() -> HashMap<ChainKind, BridgeEndpoint> {
    [
        (
            ChainKind::Sol,
            BridgeEndpoint::new("https://api.devnet.solana.com")
                .with_explorer("https://solscan.io/?cluster=devnet"),
        ),
        (
            ChainKind::Near,
            BridgeEndpoint::new("https://rpc.testnet.near.org")
                .with_explorer("https://testnet.nearblocks.io"),
        ),
        (
            ChainKind::Eth,
            BridgeEndpoint::new("https://eth-sepolia.public.blastapi.io")
                .with_explorer("https://sepolia.etherscan.io"),
        ),
        (
            ChainKind::Arb,
            BridgeEndpoint::new("https://sepolia-rollup.arbitrum.io/rpc")
                .with_explorer("https://sepolia.arbiscan.io"),
        ),
        (
            ChainKind::Base,
            BridgeEndpoint::new("https://sepolia.base.org")
                .with_explorer("https://sepolia.basescan.org"),
        ),
    ]
    .into_iter()
    .collect()
}

fn default_mainnet_endpoints() -> HashMap<ChainKind, BridgeEndpoint> {
    [
        (
            ChainKind::Sol,
            BridgeEndpoint::new("https://api.mainnet-beta.solana.com")
                .with_explorer("https://solscan.io"),
        ),
        (
            ChainKind::Near,
            BridgeEndpoint::new("https://rpc.mainnet.near.org")
                .with_explorer("https://nearblocks.io"),
        ),
        (
            ChainKind::Eth,
            BridgeEndpoint::new("https://eth.llamarpc.com").with_explorer("https://etherscan.io"),
        ),
        (
            ChainKind::Arb,
            BridgeEndpoint::new("https://arb1.arbitrum.io/rpc")
                .with_explorer("https://arbiscan.io"),
        ),
        (
            ChainKind::Base,
            BridgeEndpoint::new("https://mainnet.base.org").with_explorer("https://basescan.org"),
        ),
    ]
    .into_iter()
    .collect()
}
