//! Token metadata resolution.

use std::sync::Arc;

use crate::clients::{ChainReader, TokenMetadata};
use crate::error::{BridgeError, BridgeResult, QueryStep};
use crate::types::{
    OmniAddress, TokenDescriptor, WalletToken, UNKNOWN_TOKEN_NAME, UNKNOWN_TOKEN_SYMBOL,
};
use crate::units::compare_units;

/// Most tokens described per wallet listing; each costs a metadata lookup.
pub const MAX_LISTED_TOKENS: usize = 30;

/// Resolves a token address to a complete [`TokenDescriptor`].
///
/// Only the mint lookup is load-bearing. Metadata falls back to placeholders
/// and the balance falls back to zero, so a resolved mint always yields a
/// descriptor.
#[derive(Clone)]
pub struct TokenMetadataResolver {
    reader: Arc<dyn ChainReader>,
}

impl TokenMetadataResolver {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }

    pub async fn resolve(
        &self,
        token: &OmniAddress,
        owner: Option<&OmniAddress>,
    ) -> BridgeResult<TokenDescriptor> {
        let mint = self
            .reader
            .mint_info(token)
            .await
            .map_err(|e| match e {
                BridgeError::ExternalQuery {
                    step: QueryStep::Metadata,
                    ..
                } => e,
                other => BridgeError::ExternalQuery {
                    step: QueryStep::Metadata,
                    message: format!("mint {} did not resolve: {}", token, other),
                },
            })?;

        let metadata = self.metadata_or_placeholder(token).await;

        let balance = match owner {
            Some(owner) => match self.reader.token_balance(token, owner).await {
                Ok(balance) => balance,
                Err(e) => {
                    tracing::warn!(token = %token, owner = %owner, error = %e, "balance lookup failed, reporting zero");
                    0
                }
            },
            None => 0,
        };

        Ok(TokenDescriptor {
            address: token.clone(),
            symbol: metadata.symbol,
            name: metadata.name,
            decimals: mint.decimals,
            balance,
            total_supply: mint.total_supply,
            image: metadata.image,
        })
    }

    /// Tokens `owner` holds, largest display balance first.
    ///
    /// Empty accounts are skipped and at most [`MAX_LISTED_TOKENS`] holdings
    /// are described. Metadata falls back to placeholders as in
    /// [`Self::resolve`]; only the listing itself is load-bearing.
    pub async fn list_holdings(&self, owner: &OmniAddress) -> BridgeResult<Vec<WalletToken>> {
        let holdings = self.reader.token_holdings(owner).await?;
        let total = holdings.len();

        let mut tokens = Vec::new();
        for holding in holdings
            .into_iter()
            .filter(|holding| holding.balance > 0)
            .take(MAX_LISTED_TOKENS)
        {
            let metadata = self.metadata_or_placeholder(&holding.token).await;
            tokens.push(WalletToken {
                address: holding.token,
                symbol: metadata.symbol,
                name: metadata.name,
                decimals: holding.decimals,
                balance: holding.balance,
                image: metadata.image,
                token_account: holding.account,
            });
        }
        tracing::debug!(owner = %owner, accounts = total, listed = tokens.len(), "listed wallet tokens");

        tokens.sort_by(|a, b| compare_units(b.balance, b.decimals, a.balance, a.decimals));
        Ok(tokens)
    }

    async fn metadata_or_placeholder(&self, token: &OmniAddress) -> TokenMetadata {
        match self.reader.token_metadata(token).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                tracing::debug!(token = %token, "no metadata published, using placeholders");
                placeholder_metadata()
            }
            Err(e) => {
                tracing::warn!(token = %token, error = %e, "metadata lookup failed, using placeholders");
                placeholder_metadata()
            }
        }
    }
}

fn placeholder_metadata() -> TokenMetadata {
    TokenMetadata {
        name: UNKNOWN_TOKEN_NAME.to_string(),
        symbol: UNKNOWN_TOKEN_SYMBOL.to_string(),
        image: None,
    }
}
