//! Fee estimation and the registration check built on it.

use std::sync::Arc;

use crate::cancel::CancelSignal;
use crate::clients::FeeApi;
use crate::error::{BridgeError, BridgeResult};
use crate::types::{FeeQuote, OmniAddress, RegistrationStatus};

/// Quotes the bridge fee for a route with a single API call.
#[derive(Clone)]
pub struct FeeEstimator {
    api: Arc<dyn FeeApi>,
}

impl FeeEstimator {
    pub fn new(api: Arc<dyn FeeApi>) -> Self {
        Self { api }
    }

    /// Absent fields are zero. Failures are reported, never retried.
    pub async fn estimate(
        &self,
        sender: &OmniAddress,
        recipient: &OmniAddress,
        token: &OmniAddress,
    ) -> BridgeResult<FeeQuote> {
        let response = self
            .api
            .get_fee(sender, recipient, token)
            .await
            .map_err(|e| match e {
                BridgeError::FeeQueryFailed(_) => e,
                other => BridgeError::FeeQueryFailed(other.to_string()),
            })?;

        let quote = FeeQuote {
            fee: response.transferred_token_fee.unwrap_or(0),
            native_fee: response.native_token_fee.unwrap_or(0),
        };
        tracing::debug!(token = %token, fee = quote.fee, native_fee = quote.native_fee, "fee quoted");
        Ok(quote)
    }
}

/// Decides whether a token can already be bridged to a destination.
///
/// The bridge exposes no registration query. A fee quote only exists for
/// registered tokens, so a successful quote means `Registered`.
#[derive(Clone)]
pub struct RegistrationGate {
    estimator: FeeEstimator,
}

impl RegistrationGate {
    pub fn new(estimator: FeeEstimator) -> Self {
        Self { estimator }
    }

    /// Never fails. Cancellation yields `Unknown`.
    pub async fn check(
        &self,
        sender: &OmniAddress,
        recipient: &OmniAddress,
        token: &OmniAddress,
        cancel: &CancelSignal,
    ) -> RegistrationStatus {
        let quote = self.estimator.estimate(sender, recipient, token);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => RegistrationStatus::Unknown,
            result = quote => match result {
                Ok(_) => RegistrationStatus::Registered,
                Err(e) => {
                    tracing::debug!(token = %token, error = %e, "fee quote failed, treating token as unregistered");
                    RegistrationStatus::NotRegistered
                }
            },
        }
    }
}
