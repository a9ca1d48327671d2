//! Error types for bridge orchestration.

use std::fmt;

use thiserror::Error;

use crate::types::ChainKind;

/// External lookup that produced an [`BridgeError::ExternalQuery`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryStep {
    /// Bridge fee schedule.
    Fee,
    /// Token mint / metadata lookup.
    Metadata,
    /// Native or token balance lookup.
    Balance,
    /// Indexer transfer search or record fetch.
    Indexing,
    /// Indexer delivery status.
    TransferStatus,
    /// Attestation (VAA) lookup.
    Attestation,
}

impl fmt::Display for QueryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fee => "fee",
            Self::Metadata => "metadata",
            Self::Balance => "balance",
            Self::Indexing => "indexing",
            Self::TransferStatus => "transfer status",
            Self::Attestation => "attestation",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during bridge operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // ═══════════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Amount or recipient rejected before any external call.
    #[error("Invalid transfer parameters: {0}")]
    InvalidTransferParameters(String),

    /// Address could not be parsed for its chain.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Signer cannot cover fees on a chain.
    #[error("Insufficient balance on {chain}: have {available}, need {required}")]
    InsufficientBalance {
        chain: ChainKind,
        required: u128,
        available: u128,
    },

    // ═══════════════════════════════════════════════════════════════════════════════
    // OBSERVATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Fee API call failed.
    #[error("Fee query failed: {0}")]
    FeeQueryFailed(String),

    /// A lookup failed in a way that may succeed later.
    #[error("{step} query failed: {message}")]
    ExternalQuery { step: QueryStep, message: String },

    /// A lookup was refused by the service; repeating it will not help.
    #[error("{step} request rejected with HTTP {status}: {message}")]
    RequestRejected {
        step: QueryStep,
        status: u16,
        message: String,
    },

    /// Finality wait elapsed without a usable attestation.
    #[error("Attestation unavailable for {tx_id}: {reason}")]
    AttestationUnavailable { tx_id: String, reason: String },

    /// Poll budget exhausted before the indexer saw the transfer.
    #[error("Transfer not indexed after {attempts} attempts")]
    TransferNotIndexed { attempts: u32 },

    // ═══════════════════════════════════════════════════════════════════════════════
    // SUBMISSION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════
    /// An irrevocable on-chain call failed or was rejected.
    #[error("Submission on {chain} failed: {message}")]
    Submission { chain: ChainKind, message: String },

    // ═══════════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Wait or poll stopped by a cancellation signal.
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not available for a chain.
    #[error("Chain not supported: {0}")]
    UnsupportedChain(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Transport-level network error.
    #[error("Network error: {0}")]
    Network(String),
}

impl BridgeError {
    /// Builds the error for a non-success HTTP status.
    ///
    /// 404, 408, 429 and 5xx are treated as "not yet" answers from an
    /// eventually consistent service. Every other status is a rejection.
    pub fn from_http_status(step: QueryStep, status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            404 | 408 | 429 | 500..=599 => Self::ExternalQuery {
                step,
                message: format!("HTTP {}: {}", status, message),
            },
            _ => Self::RequestRejected {
                step,
                status,
                message,
            },
        }
    }

    /// True for errors raised before any external call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransferParameters(_)
                | Self::InvalidAddress(_)
                | Self::InsufficientBalance { .. }
        )
    }

    /// True for failures of read-only lookups.
    pub fn is_observation(&self) -> bool {
        matches!(
            self,
            Self::FeeQueryFailed(_)
                | Self::ExternalQuery { .. }
                | Self::RequestRejected { .. }
                | Self::AttestationUnavailable { .. }
                | Self::TransferNotIndexed { .. }
                | Self::Network(_)
        )
    }

    /// True when repeating the same lookup may give a different answer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExternalQuery { .. } | Self::Network(_) | Self::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
