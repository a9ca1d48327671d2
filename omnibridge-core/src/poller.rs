//! Bounded polling of the bridge indexer.

use std::sync::Arc;

use serde::Serialize;

use crate::cancel::CancelSignal;
use crate::clients::IndexingApi;
use crate::config::{PollConfig, PollErrorPolicy};
use crate::error::{BridgeError, BridgeResult};
use crate::types::{
    ChainKind, InitTransferEvent, SubmissionResult, TransferId, TransferRecord, TransferStatus,
    TxId,
};

/// A transfer as seen by the indexer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObservedTransfer {
    pub record: TransferRecord,
    pub status: TransferStatus,
    /// Poll attempts it took to find the record.
    pub attempts: u32,
}

/// Polls the indexer until a submitted transfer shows up.
///
/// The indexer is eventually consistent, so "not found" and transient errors
/// both mean "try again after the interval". Only the attempt budget or a
/// rejected request under [`PollErrorPolicy::FailFastOnRejected`] ends the
/// loop early.
#[derive(Clone)]
pub struct TransferStatusPoller {
    indexer: Arc<dyn IndexingApi>,
    config: PollConfig,
}

impl TransferStatusPoller {
    pub fn new(indexer: Arc<dyn IndexingApi>, config: PollConfig) -> Self {
        Self { indexer, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Find the record, then fetch its delivery status exactly once.
    pub async fn poll(
        &self,
        submission: &SubmissionResult,
        source_chain: ChainKind,
        cancel: &CancelSignal,
    ) -> BridgeResult<ObservedTransfer> {
        let (record, attempts) = self.find_record(submission, source_chain, cancel).await?;
        let status = self.status(&record).await?;
        Ok(ObservedTransfer {
            record,
            status,
            attempts,
        })
    }

    /// Single delivery status lookup for an indexed record.
    pub async fn status(&self, record: &TransferRecord) -> BridgeResult<TransferStatus> {
        let status = self.indexer.get_transfer_status(record.id).await?;
        tracing::info!(transfer = %record.id, status = ?status, "transfer status resolved");
        Ok(status)
    }

    /// Poll until the indexer returns the record for `submission`.
    pub async fn find_record(
        &self,
        submission: &SubmissionResult,
        source_chain: ChainKind,
        cancel: &CancelSignal,
    ) -> BridgeResult<(TransferRecord, u32)> {
        let interval = self.config.interval();

        for attempt in 1..=self.config.max_attempts {
            cancel.sleep(interval).await?;

            let lookup = match submission {
                SubmissionResult::Transaction { tx_id } => self.lookup_by_tx(tx_id).await,
                SubmissionResult::Event(event) => {
                    self.lookup_by_event(event, source_chain).await.map(Some)
                }
            };

            match lookup {
                Ok(Some(record)) => {
                    tracing::info!(transfer = %record.id, attempt, "transfer indexed");
                    return Ok((record, attempt));
                }
                Ok(None) => {
                    tracing::debug!(attempt, max_attempts = self.config.max_attempts, "transfer not indexed yet");
                }
                Err(e) if self.is_fatal(&e) => {
                    tracing::error!(attempt, error = %e, "indexer rejected transfer lookup");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "transfer lookup failed, retrying");
                }
            }
        }

        Err(BridgeError::TransferNotIndexed {
            attempts: self.config.max_attempts,
        })
    }

    fn is_fatal(&self, error: &BridgeError) -> bool {
        match error {
            BridgeError::Cancelled => true,
            BridgeError::RequestRejected { .. } => {
                self.config.error_policy == PollErrorPolicy::FailFastOnRejected
            }
            _ => false,
        }
    }

    async fn lookup_by_tx(&self, tx_id: &TxId) -> BridgeResult<Option<TransferRecord>> {
        let found = self.indexer.find_transfers(tx_id).await?;
        match found.into_iter().next() {
            Some(summary) => self.indexer.get_transfer(summary.id).await.map(Some),
            None => Ok(None),
        }
    }

    async fn lookup_by_event(
        &self,
        event: &InitTransferEvent,
        source_chain: ChainKind,
    ) -> BridgeResult<TransferRecord> {
        let id = TransferId {
            origin_chain: event.origin_chain.unwrap_or(source_chain),
            origin_nonce: event.origin_nonce,
        };
        self.indexer.get_transfer(id).await
    }
}
