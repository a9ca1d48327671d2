//! Chain definitions and capabilities for Omni Bridge.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{BridgeError, BridgeResult};
use crate::types::ChainKind;

/// Supported chain with metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SupportedChain {
    /// Chain identifier.
    pub chain: ChainKind,
    /// Human-readable name.
    pub name: String,
    /// Native currency symbol.
    pub native_currency: String,
    /// Native currency decimals.
    pub native_decimals: u8,
    /// Capabilities supported on this chain.
    pub capabilities: HashSet<ChainCapability>,
    /// Approximate block finality in seconds. Informational; the attestation
    /// wait is configured separately.
    pub finality_secs: u64,
}

/// Capabilities that a chain may support.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainCapability {
    /// Can lock ERC20/NEP-141/SPL tokens and emit their metadata.
    LockTokens,
    /// Transfers out of this chain are proven with Wormhole VAAs.
    WormholeVaa,
    /// Can deploy bridged token representations from an attestation.
    DeployToken,
}

impl SupportedChain {
    /// Get the chain by kind.
    pub fn for_chain(chain: ChainKind) -> Self {
        match chain {
            ChainKind::Sol => Self::solana(),
            ChainKind::Eth => Self::ethereum(),
            ChainKind::Near => Self::near(),
            ChainKind::Arb => Self::arbitrum(),
            ChainKind::Base => Self::base(),
        }
    }

    /// All chains the bridge can route through.
    pub fn all() -> Vec<Self> {
        ChainKind::ALL.into_iter().map(Self::for_chain).collect()
    }

    fn near() -> Self {
        Self {
            chain: ChainKind::Near,
            name: "NEAR Protocol".to_string(),
            native_currency: "NEAR".to_string(),
            native_decimals: 24,
            capabilities: [
                ChainCapability::LockTokens,
                ChainCapability::DeployToken,
            ]
            .into_iter()
            .collect(),
            finality_secs: 2,
        }
    }

    fn ethereum() -> Self {
        Self {
            chain: ChainKind::Eth,
            name: "Ethereum".to_string(),
            native_currency: "ETH".to_string(),
            native_decimals: 18,
            capabilities: [
                ChainCapability::LockTokens,
                ChainCapability::DeployToken,
            ]
            .into_iter()
            .collect(),
            finality_secs: 900, // ~15 minutes for finality
        }
    }

    fn arbitrum() -> Self {
        Self {
            chain: ChainKind::Arb,
            name: "Arbitrum One".to_string(),
            native_currency: "ETH".to_string(),
            native_decimals: 18,
            capabilities: [
                ChainCapability::LockTokens,
                ChainCapability::WormholeVaa,
                ChainCapability::DeployToken,
            ]
            .into_iter()
            .collect(),
            finality_secs: 60,
        }
    }

    fn base() -> Self {
        Self {
            chain: ChainKind::Base,
            name: "Base".to_string(),
            native_currency: "ETH".to_string(),
            native_decimals: 18,
            capabilities: Self::arbitrum().capabilities,
            finality_secs: 60,
        }
    }

    fn solana() -> Self {
        Self {
            chain: ChainKind::Sol,
            name: "Solana".to_string(),
            native_currency: "SOL".to_string(),
            native_decimals: 9,
            capabilities: [
                ChainCapability::LockTokens,
                ChainCapability::WormholeVaa,
                ChainCapability::DeployToken,
            ]
            .into_iter()
            .collect(),
            finality_secs: 30,
        }
    }

    /// Check if the chain supports a capability.
    pub fn has_capability(&self, cap: &ChainCapability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Fail with [`BridgeError::UnsupportedChain`] unless `cap` is supported.
    pub fn ensure_capability(&self, cap: ChainCapability) -> BridgeResult<()> {
        if self.has_capability(&cap) {
            Ok(())
        } else {
            Err(BridgeError::UnsupportedChain(format!(
                "{} does not support {:?}",
                self.name, cap
            )))
        }
    }

    /// Whether transfers leaving this chain need a VAA before they are relayed.
    pub fn requires_attestation(&self) -> bool {
        self.has_capability(&ChainCapability::WormholeVaa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attestation_capability() {
        assert!(SupportedChain::for_chain(ChainKind::Sol).requires_attestation());
        assert!(SupportedChain::for_chain(ChainKind::Base).requires_attestation());
        assert!(!SupportedChain::for_chain(ChainKind::Near).requires_attestation());
        assert!(!SupportedChain::for_chain(ChainKind::Eth).requires_attestation());
    }

    #[test]
    fn test_all_chains() {
        let chains = SupportedChain::all();
        assert_eq!(chains.len(), ChainKind::ALL.len());
        assert_eq!(SupportedChain::for_chain(ChainKind::Near).native_decimals, 24);
    }

    #[test]
    fn test_ensure_capability() {
        let near = SupportedChain::for_chain(ChainKind::Near);
        assert!(near.ensure_capability(ChainCapability::DeployToken).is_ok());
        assert!(matches!(
            near.ensure_capability(ChainCapability::WormholeVaa),
            Err(BridgeError::UnsupportedChain(_))
        ));

        let stripped = SupportedChain {
            capabilities: HashSet::new(),
            ..near
        };
        assert!(stripped.ensure_capability(ChainCapability::DeployToken).is_err());
    }
}
