//! Transfer workflow behaviour against recording mocks.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use omnibridge_core::{
    BridgeError, CancelSignal, ChainKind, InitTransferEvent, OmniBridge, QueryStep,
    SourceSigner, SubmissionResult, TransferStage, TransferStatus, TxId,
};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_zero_amount_rejected_before_any_call() {
    let harness = Harness::default();
    let bridge = harness.bridge();

    let failure = bridge
        .run_transfer(
            &descriptor(),
            0,
            NEAR_RECIPIENT,
            &harness.source_signer(),
            &CancelSignal::never(),
        )
        .await
        .unwrap_err();

    assert!(matches!(failure.error, BridgeError::InvalidTransferParameters(_)));
    assert_eq!(failure.stage, TransferStage::Requested);
    assert!(!failure.submitted());
    assert_eq!(harness.fees.calls(), 0);
    assert_eq!(harness.source.transfer_calls(), 0);
    assert_eq!(harness.attestations.calls(), 0);
    assert_eq!(harness.indexer.find_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_bad_recipient_rejected_before_any_call() {
    let harness = Harness::default();
    let bridge = harness.bridge();
    let signer = harness.source_signer();

    for recipient in ["", "   ", "bob.testnet", "sol:SomeoneElse111"] {
        let failure = bridge
            .run_transfer(&descriptor(), 10, recipient, &signer, &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(
            matches!(failure.error, BridgeError::InvalidTransferParameters(_)),
            "{:?} should be rejected",
            recipient
        );
    }
    assert_eq!(harness.fees.calls(), 0);
    assert_eq!(harness.source.transfer_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fee_quote_is_submitted_unmodified() {
    let harness = Harness {
        fees: Arc::new(MockFeeApi::quoting(100, 0)),
        ..Harness::default()
    };
    let bridge = harness.bridge();

    let outcome = bridge
        .run_transfer(
            &descriptor(),
            1_000_000_000,
            NEAR_RECIPIENT,
            &harness.source_signer(),
            &CancelSignal::never(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.intent.fee(), 100);
    assert_eq!(outcome.intent.native_fee(), 0);
    assert_eq!(outcome.intent.amount(), 1_000_000_000);
    assert_eq!(outcome.intent.recipient().to_string(), NEAR_RECIPIENT);

    let submitted = harness.source.intents.lock().unwrap().clone();
    assert_eq!(submitted, vec![outcome.intent.clone()]);
    assert_eq!(harness.fees.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_record_found_on_fifth_attempt() {
    let expected = record(42);
    let harness = Harness {
        indexer: Arc::new(MockIndexer::found_on(5, expected.clone())),
        ..Harness::default()
    };
    let bridge = harness.bridge();

    let outcome = bridge
        .run_transfer(
            &descriptor(),
            1_000_000_000,
            NEAR_RECIPIENT,
            &harness.source_signer(),
            &CancelSignal::never(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.observation.record, expected);
    assert_eq!(outcome.observation.status, TransferStatus::Finalised);
    assert_eq!(outcome.observation.source_tx, Some(TxId::new("transfer-sig")));
    assert_eq!(outcome.observation.attestation, Some(vaa()));
    assert_eq!(harness.indexer.find_calls(), 5);
    assert_eq!(harness.indexer.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_attestation_failure_does_not_resubmit() {
    let harness = Harness {
        attestations: Arc::new(MockAttestations::returning(Err(transient(
            QueryStep::Attestation,
        )))),
        ..Harness::default()
    };
    let bridge = harness.bridge();

    let failure = bridge
        .run_transfer(
            &descriptor(),
            1_000_000_000,
            NEAR_RECIPIENT,
            &harness.source_signer(),
            &CancelSignal::never(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        BridgeError::AttestationUnavailable { .. }
    ));
    assert_eq!(failure.stage, TransferStage::Submitted);
    assert_eq!(
        failure.submission,
        Some(SubmissionResult::transaction(TxId::new("transfer-sig")))
    );
    assert_eq!(harness.source.transfer_calls(), 1);
    assert_eq!(harness.attestations.calls(), 1);
    assert_eq!(harness.indexer.find_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_attestation_is_unavailable() {
    let harness = Harness {
        attestations: Arc::new(MockAttestations::returning(Ok(None))),
        ..Harness::default()
    };

    let failure = harness
        .bridge()
        .run_transfer(
            &descriptor(),
            5,
            NEAR_RECIPIENT,
            &harness.source_signer(),
            &CancelSignal::never(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        BridgeError::AttestationUnavailable { .. }
    ));
    assert_eq!(harness.source.transfer_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fee_failure_aborts_before_submission() {
    let harness = Harness {
        fees: Arc::new(MockFeeApi::failing()),
        ..Harness::default()
    };

    let failure = harness
        .bridge()
        .run_transfer(
            &descriptor(),
            5,
            NEAR_RECIPIENT,
            &harness.source_signer(),
            &CancelSignal::never(),
        )
        .await
        .unwrap_err();

    assert!(matches!(failure.error, BridgeError::FeeQueryFailed(_)));
    assert_eq!(harness.fees.calls(), 1);
    assert_eq!(harness.source.transfer_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_submission_error_is_fatal() {
    let harness = Harness {
        source: Arc::new(MockSource {
            transfer_result: Err(BridgeError::Network("connection reset".into())),
            ..MockSource::default()
        }),
        ..Harness::default()
    };

    let failure = harness
        .bridge()
        .run_transfer(
            &descriptor(),
            5,
            NEAR_RECIPIENT,
            &harness.source_signer(),
            &CancelSignal::never(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        BridgeError::Submission {
            chain: ChainKind::Sol,
            ..
        }
    ));
    assert_eq!(failure.stage, TransferStage::FeeQuoted);
    assert_eq!(harness.source.transfer_calls(), 1);
    assert_eq!(harness.attestations.calls(), 0);
    assert_eq!(harness.indexer.find_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_event_submission_skips_attestation() {
    let indexer = Arc::new(LaggingEventIndexer {
        misses: 2,
        get_calls: Default::default(),
    });
    let harness = Harness {
        source: Arc::new(MockSource {
            transfer_result: Ok(SubmissionResult::Event(InitTransferEvent {
                origin_chain: None,
                origin_nonce: 9,
            })),
            ..MockSource::default()
        }),
        ..Harness::default()
    };
    let bridge = OmniBridge::new(
        Harness::config(),
        omnibridge_core::BridgeClients {
            reader: harness.reader.clone(),
            fees: harness.fees.clone(),
            attestations: harness.attestations.clone(),
            indexer: indexer.clone(),
        },
    )
    .unwrap();

    let outcome = bridge
        .run_transfer(
            &descriptor(),
            5,
            NEAR_RECIPIENT,
            &harness.source_signer(),
            &CancelSignal::never(),
        )
        .await
        .unwrap();

    assert_eq!(harness.attestations.calls(), 0);
    assert!(outcome.observation.attestation.is_none());
    assert!(outcome.observation.source_tx.is_none());
    assert_eq!(outcome.observation.record.id.origin_chain, ChainKind::Sol);
    assert_eq!(outcome.observation.record.id.origin_nonce, 9);
    assert_eq!(outcome.observation.status, TransferStatus::FinalisedOnNear);
    assert_eq!(
        indexer.get_calls.load(std::sync::atomic::Ordering::SeqCst),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn test_source_without_wormhole_skips_attestation() {
    struct NearSource(MockSource);

    #[async_trait::async_trait]
    impl omnibridge_core::SourceChainWriter for NearSource {
        fn chain(&self) -> ChainKind {
            ChainKind::Near
        }

        async fn log_metadata(
            &self,
            token: &omnibridge_core::OmniAddress,
        ) -> omnibridge_core::BridgeResult<TxId> {
            self.0.log_metadata(token).await
        }

        async fn init_transfer(
            &self,
            intent: &omnibridge_core::TransferIntent,
        ) -> omnibridge_core::BridgeResult<SubmissionResult> {
            self.0.init_transfer(intent).await
        }
    }

    let harness = Harness::default();
    let mut token = descriptor();
    token.address = omnibridge_core::OmniAddress::near("wrap.testnet").unwrap();
    let signer = SourceSigner::new(
        Arc::new(NearSource(MockSource::default())),
        near_account(),
    );

    let outcome = harness
        .bridge()
        .run_transfer(
            &token,
            5,
            &format!("sol:{}", SOL_SENDER),
            &signer,
            &CancelSignal::never(),
        )
        .await
        .unwrap();

    assert!(outcome.observation.attestation.is_none());
    assert_eq!(harness.attestations.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_attestation_wait_keeps_submission() {
    let harness = Harness::default();
    let bridge = harness.bridge();
    let signer = harness.source_signer();
    let (handle, cancel) = CancelSignal::new();

    let run = tokio::spawn(async move {
        bridge
            .run_transfer(&descriptor(), 5, NEAR_RECIPIENT, &signer, &cancel)
            .await
    });
    tokio::time::sleep(Duration::from_secs(10)).await;
    handle.cancel();

    let failure = run.await.unwrap().unwrap_err();
    assert_eq!(failure.error, BridgeError::Cancelled);
    assert!(failure.submitted());
    assert_eq!(harness.source.transfer_calls(), 1);
    assert_eq!(harness.attestations.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_external_timeout_honored_at_suspension_point() {
    let harness = Harness::default();
    let bridge = harness.bridge();

    let result = tokio::time::timeout(
        Duration::from_secs(30),
        bridge.run_transfer(
            &descriptor(),
            5,
            NEAR_RECIPIENT,
            &harness.source_signer(),
            &CancelSignal::never(),
        ),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(harness.source.transfer_calls(), 1);
    assert_eq!(harness.attestations.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_observe_transfer_does_not_submit() {
    let harness = Harness {
        indexer: Arc::new(MockIndexer::found_on(2, record(11))),
        ..Harness::default()
    };
    let submission = SubmissionResult::transaction(TxId::new("earlier-sig"));

    let observation = harness
        .bridge()
        .observe_transfer(&submission, ChainKind::Sol, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(observation.record, record(11));
    assert_eq!(observation.source_tx, Some(TxId::new("earlier-sig")));
    assert_eq!(harness.source.transfer_calls(), 0);
    assert_eq!(harness.attestations.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_full_transfer_elapsed_time() {
    let harness = Harness {
        indexer: Arc::new(MockIndexer::found_on(3, record(1))),
        ..Harness::default()
    };
    let start = Instant::now();

    harness
        .bridge()
        .run_transfer(
            &descriptor(),
            5,
            NEAR_RECIPIENT,
            &harness.source_signer(),
            &CancelSignal::never(),
        )
        .await
        .unwrap();

    // 80 s finality wait plus three 3 s poll intervals.
    assert_eq!(start.elapsed(), Duration::from_secs(89));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_transfers_are_independent() {
    let first = Harness {
        indexer: Arc::new(MockIndexer::found_on(2, record(1))),
        ..Harness::default()
    };
    let second = Harness {
        indexer: Arc::new(MockIndexer::found_on(6, record(2))),
        fees: Arc::new(MockFeeApi::quoting(7, 3)),
        ..Harness::default()
    };
    let (bridge_a, bridge_b) = (first.bridge(), second.bridge());
    let (signer_a, signer_b) = (first.source_signer(), second.source_signer());
    let cancel = CancelSignal::never();
    let start = Instant::now();

    let (desc_a, desc_b) = (descriptor(), descriptor());
    let (a, b) = tokio::join!(
        bridge_a.run_transfer(&desc_a, 5, NEAR_RECIPIENT, &signer_a, &cancel),
        bridge_b.run_transfer(&desc_b, 9, NEAR_RECIPIENT, &signer_b, &cancel),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.observation.record, record(1));
    assert_eq!(b.observation.record, record(2));
    assert_eq!(b.intent.fee(), 7);
    assert_eq!(b.intent.native_fee(), 3);
    // Waits overlap instead of running back to back.
    assert_eq!(start.elapsed(), Duration::from_secs(80 + 6 * 3));
}
