//! omnibridge-rails
//!
//! HTTP API service for Omni Bridge token bridging.
//! Exposes token lookups, wallet token listings, fee quotes, the registration
//! check, direct VAA lookup and transfer observation. Signing stays with the caller's wallet,
//! so nothing here submits on-chain calls.

use std::fmt;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use omnibridge_core::{
    format_units, BridgeError, BridgeResult, CancelSignal, ChainKind, OmniAddress, OmniBridge,
    OrchestratorConfig, SubmissionResult, SupportedChain, TransferId, TxId, WorkflowFailure,
    RAIL_ID_OMNI_BRIDGE,
};

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// The orchestrator. Cheap to clone, nothing mutable is shared.
    pub bridge: OmniBridge,
}

impl AppState {
    pub fn new(bridge: OmniBridge) -> Self {
        Self { bridge }
    }

    /// Build from `OMNI_*` environment variables.
    pub fn from_env() -> BridgeResult<Self> {
        let config = OrchestratorConfig::from_env()?;
        Ok(Self::new(OmniBridge::from_config(config)?))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the router.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health))
        .route("/rails/omni/info", get(info))
        // Tokens & fees
        .route("/rails/omni/tokens/:chain/:address", get(get_token))
        .route("/rails/omni/wallets/:chain/:owner/tokens", get(list_wallet_tokens))
        .route("/rails/omni/estimate", post(estimate_fee))
        .route("/rails/omni/registration", post(check_registration))
        // Attestations
        .route("/rails/omni/vaa/:tx", get(get_vaa))
        // Transfers
        .route("/rails/omni/transfers/:chain/:nonce", get(get_transfer))
        .route("/rails/omni/observe", post(observe_transfer))
        .layer(cors)
        .with_state(state)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - HEALTH & INFO
// ═══════════════════════════════════════════════════════════════════════════════

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "rail_id": RAIL_ID_OMNI_BRIDGE
    }))
}

async fn info(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.bridge.config();
    let chains: Vec<_> = state
        .bridge
        .supported_chains()
        .iter()
        .map(|c| chain_json(c, config))
        .collect();

    Json(serde_json::json!({
        "rail_id": RAIL_ID_OMNI_BRIDGE,
        "version": env!("CARGO_PKG_VERSION"),
        "network": config.network,
        "polling": {
            "max_attempts": config.polling.max_attempts,
            "interval_ms": config.polling.interval_ms,
        },
        "supported_chains": chains
    }))
}

fn chain_json(chain: &SupportedChain, config: &OrchestratorConfig) -> serde_json::Value {
    let mut capabilities: Vec<String> = chain
        .capabilities
        .iter()
        .map(|c| format!("{:?}", c))
        .collect();
    capabilities.sort();

    serde_json::json!({
        "chain": chain.chain,
        "prefix": chain.chain.prefix(),
        "name": chain.name,
        "native_currency": chain.native_currency,
        "native_decimals": chain.native_decimals,
        "capabilities": capabilities,
        "requires_attestation": chain.requires_attestation(),
        "finality_secs": chain.finality_secs,
        "finality_wait_secs": config.attestation.finality_wait(chain.chain).as_secs(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - TOKENS & FEES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct TokenQuery {
    owner: Option<String>,
}

async fn get_token(
    State(state): State<AppState>,
    Path((chain, address)): Path<(String, String)>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let chain = parse_chain(&chain)?;
    let token = OmniAddress::new(chain, address)?;
    let owner = query
        .owner
        .as_deref()
        .map(|owner| parse_address(owner, chain))
        .transpose()?;

    let descriptor = state.bridge.resolve_token(&token, owner.as_ref()).await?;
    let formatted_balance = format_units(descriptor.balance, descriptor.decimals);
    let formatted_supply = format_units(descriptor.total_supply, descriptor.decimals);
    let placeholder = descriptor.has_placeholder_metadata();

    Ok(Json(serde_json::json!({
        "token": descriptor,
        "placeholder_metadata": placeholder,
        "formatted_balance": formatted_balance,
        "formatted_total_supply": formatted_supply,
    })))
}

async fn list_wallet_tokens(
    State(state): State<AppState>,
    Path((chain, owner)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let chain = parse_chain(&chain)?;
    let owner = OmniAddress::new(chain, owner)?;

    let tokens: Vec<_> = state
        .bridge
        .list_tokens(&owner)
        .await?
        .into_iter()
        .map(|token| {
            let formatted_balance = format_units(token.balance, token.decimals);
            serde_json::json!({
                "token": token,
                "formatted_balance": formatted_balance,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "owner": owner,
        "count": tokens.len(),
        "tokens": tokens,
    })))
}

#[derive(Debug, Deserialize)]
struct EstimateRequest {
    sender: OmniAddress,
    recipient: OmniAddress,
    token: OmniAddress,
    /// Token decimals, used only to format the transferred-token fee.
    decimals: Option<u8>,
}

async fn estimate_fee(
    State(state): State<AppState>,
    Json(req): Json<EstimateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let quote = state
        .bridge
        .estimate_fee(&req.sender, &req.recipient, &req.token)
        .await?;
    let native = SupportedChain::for_chain(req.sender.chain());

    Ok(Json(serde_json::json!({
        "quote": quote,
        "fee_formatted": req.decimals.map(|d| format_units(quote.fee, d)),
        "native_fee_formatted": format_units(quote.native_fee, native.native_decimals),
        "native_currency": native.native_currency,
    })))
}

#[derive(Debug, Deserialize)]
struct RegistrationRequest {
    sender: OmniAddress,
    token: OmniAddress,
    recipient: OmniAddress,
}

async fn check_registration(
    State(state): State<AppState>,
    Json(req): Json<RegistrationRequest>,
) -> impl IntoResponse {
    let status = state
        .bridge
        .check_registration(&req.sender, &req.token, &req.recipient, &CancelSignal::never())
        .await;

    Json(serde_json::json!({
        "token": req.token,
        "destination_chain": req.recipient.chain(),
        "status": status,
        "registered": status.is_registered(),
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - ATTESTATIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct VaaQuery {
    /// Source chain of the transaction; Solana when omitted.
    chain: Option<String>,
}

async fn get_vaa(
    State(state): State<AppState>,
    Path(tx): Path<String>,
    Query(query): Query<VaaQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if tx.trim().is_empty() {
        return Err(ApiError::bad_request("Transaction id is required"));
    }
    let chain = match query.chain.as_deref() {
        Some(chain) => parse_chain(chain)?,
        None => ChainKind::Sol,
    };

    let vaa = state
        .bridge
        .fetch_attestation_now(TxId::new(tx.trim()), chain)
        .await?;

    Ok(Json(serde_json::json!({
        "tx_id": tx.trim(),
        "chain": chain,
        "network": state.bridge.config().network,
        "vaa": vaa,
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS - TRANSFERS
// ═══════════════════════════════════════════════════════════════════════════════

async fn get_transfer(
    State(state): State<AppState>,
    Path((chain, nonce)): Path<(String, u64)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = TransferId {
        origin_chain: parse_chain(&chain)?,
        origin_nonce: nonce,
    };

    let (record, status) = tokio::try_join!(
        state.bridge.get_transfer(id),
        state.bridge.transfer_status(id),
    )?;

    Ok(Json(serde_json::json!({
        "id": id.to_string(),
        "transfer": record,
        "status": status,
        "description": status.description(),
        "terminal": status.is_terminal(),
    })))
}

#[derive(Debug, Deserialize)]
struct ObserveRequest {
    submission: SubmissionResult,
    source_chain: String,
}

/// Wait for the attestation (when the source chain needs one) and poll the
/// indexer. Dropping the connection drops the wait.
async fn observe_transfer(
    State(state): State<AppState>,
    Json(req): Json<ObserveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let source_chain = parse_chain(&req.source_chain)?;
    tracing::info!(chain = %source_chain, "observing transfer");

    let observation = state
        .bridge
        .observe_transfer(&req.submission, source_chain, &CancelSignal::never())
        .await?;

    Ok(Json(serde_json::json!({
        "observation": observation,
        "description": observation.status.description(),
        "terminal": observation.status.is_terminal(),
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR HANDLING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.to_string(),
        }
    }

    fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        let (status, code) = match &err {
            BridgeError::InvalidTransferParameters(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_PARAMETERS")
            }
            BridgeError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "INVALID_ADDRESS"),
            BridgeError::UnsupportedChain(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_CHAIN"),
            BridgeError::InsufficientBalance { .. } => {
                (StatusCode::BAD_REQUEST, "INSUFFICIENT_BALANCE")
            }
            BridgeError::FeeQueryFailed(_) => (StatusCode::BAD_GATEWAY, "FEE_QUERY_FAILED"),
            BridgeError::ExternalQuery { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE")
            }
            BridgeError::RequestRejected { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_REJECTED"),
            BridgeError::AttestationUnavailable { .. } => {
                (StatusCode::NOT_FOUND, "ATTESTATION_UNAVAILABLE")
            }
            BridgeError::TransferNotIndexed { .. } => {
                (StatusCode::NOT_FOUND, "TRANSFER_NOT_INDEXED")
            }
            BridgeError::Submission { .. } => (StatusCode::BAD_GATEWAY, "SUBMISSION_FAILED"),
            BridgeError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
            BridgeError::Network(_) => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR"),
            BridgeError::Config(_) | BridgeError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        Self::new(status, code, err.to_string())
    }
}

impl<S: fmt::Debug> From<WorkflowFailure<S>> for ApiError {
    fn from(failure: WorkflowFailure<S>) -> Self {
        let message = failure.to_string();
        Self {
            message,
            ..Self::from(failure.error)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_server_error() || self.status == StatusCode::BAD_GATEWAY {
            tracing::warn!(status = %self.status, code = %self.code, "{}", self.message);
        }
        let body = serde_json::json!({
            "error": self.message,
            "error_code": self.code,
        });
        (self.status, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_chain(chain: &str) -> Result<ChainKind, ApiError> {
    chain
        .parse()
        .map_err(|_| ApiError::bad_request(&format!("Unknown chain: {}", chain)))
}

/// Accepts `chain:address` or a bare address on `default_chain`.
fn parse_address(address: &str, default_chain: ChainKind) -> Result<OmniAddress, ApiError> {
    let parsed = if address.contains(':') {
        address.parse()
    } else {
        OmniAddress::new(default_chain, address)
    };
    parsed.map_err(ApiError::from)
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

pub mod main_entry {
    use super::*;
    use std::{env, net::SocketAddr};

    use anyhow::Context;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    pub async fn run_server() -> anyhow::Result<()> {
        dotenvy::dotenv().ok();

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "omnibridge_rails=info,omnibridge_core=info".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();

        let state = AppState::from_env().context("invalid bridge configuration")?;
        tracing::info!(network = %state.bridge.config().network, "bridge configured");

        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3003);

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("Omni Bridge rail listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        axum::serve(listener, app_router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }

    async fn shutdown_signal() {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
