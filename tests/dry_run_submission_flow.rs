//! Exercises the wallet lock, circuit breaker, and submission driver
//! together the way a request handler composes them end to end, using
//! the dry-run ports so the whole flow runs with no external services.

use lp_engine::submission::dry_run::{DryRunCustody, DryRunRelay, DryRunRpc};
use lp_engine::submission::{CircuitBreaker, SubmissionDriver, SubmissionMode};
use lp_engine::wallet_lock::WalletLocks;
use solana_sdk::pubkey::Pubkey;

#[tokio::test]
async fn sequential_dry_run_submission_lands_every_transaction_in_order() {
    let locks = WalletLocks::new();
    let custody = DryRunCustody;
    let relay = DryRunRelay;
    let rpc = DryRunRpc;
    let breaker = CircuitBreaker::new();
    let driver = SubmissionDriver::new(&custody, &relay, &rpc, &breaker);

    let wallet = Pubkey::new_unique();
    let guard = locks
        .try_acquire(&wallet.to_string())
        .await
        .expect("wallet should be free");

    let unsigned_txs = vec![vec![1, 2, 3], vec![4, 5, 6, 7]];
    let result = driver
        .submit(&wallet, unsigned_txs.clone(), SubmissionMode::Sequential)
        .await
        .unwrap();

    assert!(result.fully_landed());
    assert_eq!(result.landed_txs.len(), unsigned_txs.len());

    drop(guard);
    // Releasing the guard lets a follow-up request on the same wallet
    // proceed immediately instead of failing fast.
    assert!(locks.try_acquire(&wallet.to_string()).await.is_ok());
}

#[tokio::test]
async fn bundle_dry_run_submission_reports_a_single_landed_bundle() {
    let custody = DryRunCustody;
    let relay = DryRunRelay;
    let rpc = DryRunRpc;
    let breaker = CircuitBreaker::new();
    let driver = SubmissionDriver::new(&custody, &relay, &rpc, &breaker);

    let wallet = Pubkey::new_unique();
    let result = driver
        .submit(&wallet, vec![vec![9, 9, 9]], SubmissionMode::Bundle)
        .await
        .unwrap();

    assert!(result.fully_landed());
    assert_eq!(result.landed_txs.len(), 1);
}

#[tokio::test]
async fn a_second_request_on_a_locked_wallet_fails_fast_instead_of_queueing() {
    let locks = WalletLocks::new();
    let wallet = Pubkey::new_unique().to_string();

    let _first = locks.try_acquire(&wallet).await.unwrap();
    let second = locks.try_acquire(&wallet).await;

    assert!(matches!(
        second,
        Err(lp_engine::error::EngineError::WalletBusy)
    ));
}
