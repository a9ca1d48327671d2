//! omnibridge-core
//!
//! Registration and transfer orchestration for the NEAR Omni Bridge.
//!
//! # Overview
//!
//! Bridging a token is a sequence of irrevocable on-chain calls separated by
//! waits on services that lag behind the chain: a finality delay before a
//! Wormhole VAA exists, and an indexer that eventually reports the transfer.
//! This crate sequences those steps, retries only the observation side, and
//! never submits the same on-chain call twice within one invocation.
//!
//! # Components
//!
//! | Component                 | Role                                              |
//! |---------------------------|---------------------------------------------------|
//! | `TokenMetadataResolver`   | Mint data, metadata (with placeholders), balance, |
//! |                           | wallet token listings                             |
//! | `FeeEstimator`            | One fee API call per quote                        |
//! | `RegistrationGate`        | "Registered" inferred from a successful quote     |
//! | `AttestationWaiter`       | Finality wait, then exactly one VAA fetch         |
//! | `TransferStatusPoller`    | Bounded indexer polling                           |
//! | `RegistrationWorkflow`    | Preflight, emit metadata, await VAA, deploy       |
//! | `TransferWorkflow`        | Quote, submit, await VAA, poll, resolve status    |
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          OmniBridge                            │
//! │                                                                │
//! │   RegistrationWorkflow              TransferWorkflow           │
//! │     │          │                    │        │        │        │
//! │     │          └──────┐   ┌─────────┘        │        │        │
//! │     │                 ▼   ▼                  ▼        ▼        │
//! │     │          AttestationWaiter     FeeEstimator  StatusPoller│
//! │     ▼                 │                  │            │        │
//! │  ChainReader   AttestationService      FeeApi    IndexingApi   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Signing is not done here: callers supply [`SourceChainWriter`] and
//! [`DestinationChainWriter`] implementations backed by a connected wallet.

pub mod api;
pub mod attestation;
pub mod bridge;
pub mod cancel;
pub mod chains;
pub mod clients;
pub mod config;
pub mod error;
pub mod fee;
pub mod metaplex;
pub mod poller;
pub mod registration;
pub mod rpc;
pub mod tokens;
pub mod transfer;
pub mod types;
pub mod units;
pub mod wormhole;
pub mod workflow;

pub use api::OmniBridgeApi;
pub use attestation::AttestationWaiter;
pub use bridge::{BridgeClients, OmniBridge};
pub use cancel::{CancelHandle, CancelSignal};
pub use chains::{ChainCapability, SupportedChain};
pub use clients::{
    AttestationService, ChainReader, DestinationChainWriter, DestinationSigner, FeeApi,
    FeeResponse, IndexingApi, MintInfo, SignerContext, SourceChainWriter, SourceSigner,
    TokenHolding, TokenMetadata,
};
pub use config::{
    AttestationConfig, BridgeEndpoint, OrchestratorConfig, PollConfig, PollErrorPolicy,
    RegistrationConfig,
};
pub use error::{BridgeError, BridgeResult, QueryStep};
pub use fee::{FeeEstimator, RegistrationGate};
pub use poller::{ObservedTransfer, TransferStatusPoller};
pub use registration::{RegistrationOutcome, RegistrationStage, RegistrationWorkflow};
pub use rpc::{EvmRpcClient, MultiChainReader, NearRpcClient, SolanaRpcClient, TOKEN_PROGRAM_ID};
pub use tokens::{TokenMetadataResolver, MAX_LISTED_TOKENS};
pub use transfer::{Observation, TransferOutcome, TransferStage, TransferWorkflow};
pub use types::*;
pub use units::{compare_units, format_units, parse_units};
pub use wormhole::WormholeScanClient;
pub use workflow::WorkflowFailure;

/// Rail identifier for the Omni Bridge.
pub const RAIL_ID_OMNI_BRIDGE: &str = "OMNI_BRIDGE";
