//! Signs and submits the composer's ordered
//! transaction list either as an atomic private-relay bundle or
//! sequentially via direct RPC, tracking outcome and retrying
//! transient failures.

pub mod circuit_breaker;
pub mod dry_run;
pub mod live;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::error::{EngineError, Result};

pub use circuit_breaker::CircuitBreaker;

const BUNDLE_POLL_TIMEOUT: Duration = Duration::from_secs(60);
const BUNDLE_MAX_RETRIES: u32 = 2;
const BUNDLE_BACKOFF_BASE: Duration = Duration::from_secs(2);
const SEQUENTIAL_SETTLE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleOutcome {
    Landed,
    Dropped,
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub enum SubmissionMode {
    Bundle,
    Sequential,
}

/// Result of a submission attempt surfaced to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub landed_txs: Vec<String>,
    pub failed_at: Option<usize>,
    pub reason: Option<String>,
}

impl SubmissionResult {
    pub fn fully_landed(&self) -> bool {
        self.failed_at.is_none()
    }
}

/// custody oracle contract: never returns key material, idempotent per
/// (wallet, tx hash).
#[async_trait]
pub trait CustodyOracle: Send + Sync {
    /// Provision a new custodied wallet and return its public address.
    /// Never returns key material.
    async fn create_wallet(&self, label: &str) -> Result<String>;
    async fn sign(&self, wallet: &Pubkey, unsigned_tx: &[u8]) -> Result<Vec<u8>>;
    async fn sign_and_send(&self, wallet: &Pubkey, unsigned_tx: &[u8]) -> Result<String>;
}

/// private relay contract.
#[async_trait]
pub trait PrivateRelay: Send + Sync {
    async fn submit_bundle(&self, signed: Vec<Vec<u8>>) -> Result<String>;
    async fn wait_for_bundle(&self, bundle_id: &str, timeout: Duration) -> Result<BundleOutcome>;
}

/// node RPC contract, the subset the driver needs for sequential mode.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn send_and_confirm(&self, signed_tx: &[u8]) -> Result<String>;
    async fn get_balance_lamports(&self, wallet: &Pubkey) -> Result<u64>;
}

pub fn is_transient(error: &EngineError) -> bool {
    error.is_transient()
}

pub struct SubmissionDriver<'a> {
    custody: &'a dyn CustodyOracle,
    relay: &'a dyn PrivateRelay,
    rpc: &'a dyn NodeRpc,
    swap_router_breaker: &'a CircuitBreaker,
}

impl<'a> SubmissionDriver<'a> {
    pub fn new(
        custody: &'a dyn CustodyOracle,
        relay: &'a dyn PrivateRelay,
        rpc: &'a dyn NodeRpc,
        swap_router_breaker: &'a CircuitBreaker,
    ) -> Self {
        Self {
            custody,
            relay,
            rpc,
            swap_router_breaker,
        }
    }

    /// Guard a swap-router call behind the circuit breaker: the
    /// breaker surfaces `VENUE_UNAVAILABLE` immediately when open,
    /// without attempting the call.
    pub async fn call_swap_router<F, Fut, T>(&self, call: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        if !self.swap_router_breaker.allow().await {
            return Err(EngineError::VenueUnavailable(
                "swap router circuit breaker is open".into(),
            ));
        }

        match call().await {
            Ok(value) => {
                self.swap_router_breaker.record_success().await;
                Ok(value)
            }
            Err(err) => {
                self.swap_router_breaker.record_failure().await;
                Err(err)
            }
        }
    }

    /// Submit `unsigned_txs` in order under `mode`. The composer's
    /// ordering is preserved in both modes.
    pub async fn submit(
        &self,
        wallet: &Pubkey,
        unsigned_txs: Vec<Vec<u8>>,
        mode: SubmissionMode,
    ) -> Result<SubmissionResult> {
        match mode {
            SubmissionMode::Bundle => self.submit_bundle(wallet, unsigned_txs).await,
            SubmissionMode::Sequential => self.submit_sequential(wallet, unsigned_txs).await,
        }
    }

    async fn submit_bundle(&self, wallet: &Pubkey, unsigned_txs: Vec<Vec<u8>>) -> Result<SubmissionResult> {
        let mut attempt = 0;
        loop {
            let mut signed = Vec::with_capacity(unsigned_txs.len());
            for unsigned in &unsigned_txs {
                signed.push(self.custody.sign(wallet, unsigned).await?);
            }

            let bundle_id = match self.relay.submit_bundle(signed).await {
                Ok(id) => id,
                Err(err) if is_transient(&err) && attempt < BUNDLE_MAX_RETRIES => {
                    attempt += 1;
                    tokio::time::sleep(BUNDLE_BACKOFF_BASE * 2u32.pow(attempt - 1)).await;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let outcome = match self.relay.wait_for_bundle(&bundle_id, BUNDLE_POLL_TIMEOUT).await {
                Ok(outcome) => outcome,
                Err(err) if is_transient(&err) && attempt < BUNDLE_MAX_RETRIES => {
                    attempt += 1;
                    tokio::time::sleep(BUNDLE_BACKOFF_BASE * 2u32.pow(attempt - 1)).await;
                    continue;
                }
                Err(err) => return Err(err),
            };

            match outcome {
                BundleOutcome::Landed => {
                    return Ok(SubmissionResult {
                        landed_txs: vec![bundle_id],
                        failed_at: None,
                        reason: None,
                    });
                }
                BundleOutcome::Dropped if attempt < BUNDLE_MAX_RETRIES => {
                    attempt += 1;
                    tokio::time::sleep(BUNDLE_BACKOFF_BASE * 2u32.pow(attempt - 1)).await;
                    continue;
                }
                BundleOutcome::Dropped => {
                    return Err(EngineError::BundleDropped(format!(
                        "bundle {bundle_id} dropped after {attempt} retries"
                    )));
                }
                BundleOutcome::Failed => {
                    return Ok(SubmissionResult {
                        landed_txs: vec![],
                        failed_at: Some(0),
                        reason: Some(format!("bundle {bundle_id} failed on-chain")),
                    });
                }
            }
        }
    }

    /// Sequential mode: sign-and-send one transaction at a time,
    /// confirming via the node, waiting `SEQUENTIAL_SETTLE_DELAY` before
    /// the next; any on-chain failure aborts the remainder.
    /// Sequential mode omits the tip transaction — the caller must not
    /// include one in `unsigned_txs`.
    async fn submit_sequential(&self, wallet: &Pubkey, unsigned_txs: Vec<Vec<u8>>) -> Result<SubmissionResult> {
        let mut landed_txs = Vec::new();

        for (index, unsigned) in unsigned_txs.iter().enumerate() {
            let signed = match self.custody.sign(wallet, unsigned).await {
                Ok(signed) => signed,
                Err(err) => {
                    return Ok(SubmissionResult {
                        landed_txs,
                        failed_at: Some(index),
                        reason: Some(err.to_string()),
                    });
                }
            };

            match self.rpc.send_and_confirm(&signed).await {
                Ok(tx_hash) => {
                    landed_txs.push(tx_hash);
                    if index + 1 < unsigned_txs.len() {
                        tokio::time::sleep(SEQUENTIAL_SETTLE_DELAY).await;
                    }
                }
                Err(err) => {
                    return Ok(SubmissionResult {
                        landed_txs,
                        failed_at: Some(index),
                        reason: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(SubmissionResult {
            landed_txs,
            failed_at: None,
            reason: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct MockCustody;
    #[async_trait]
    impl CustodyOracle for MockCustody {
        async fn create_wallet(&self, _label: &str) -> Result<String> {
            Ok(Pubkey::new_unique().to_string())
        }
        async fn sign(&self, _wallet: &Pubkey, unsigned_tx: &[u8]) -> Result<Vec<u8>> {
            Ok(unsigned_tx.to_vec())
        }
        async fn sign_and_send(&self, _wallet: &Pubkey, unsigned_tx: &[u8]) -> Result<String> {
            Ok(format!("{}", unsigned_tx.len()))
        }
    }

    struct MockRelay {
        outcomes: Mutex<Vec<BundleOutcome>>,
    }
    #[async_trait]
    impl PrivateRelay for MockRelay {
        async fn submit_bundle(&self, _signed: Vec<Vec<u8>>) -> Result<String> {
            Ok("bundle-1".to_string())
        }
        async fn wait_for_bundle(&self, _id: &str, _timeout: Duration) -> Result<BundleOutcome> {
            let mut outcomes = self.outcomes.lock().unwrap();
            Ok(outcomes.remove(0))
        }
    }

    struct FlakyRelay {
        submit_failures_remaining: AtomicU32,
    }
    #[async_trait]
    impl PrivateRelay for FlakyRelay {
        async fn submit_bundle(&self, _signed: Vec<Vec<u8>>) -> Result<String> {
            if self.submit_failures_remaining.load(Ordering::SeqCst) > 0 {
                self.submit_failures_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(EngineError::RpcUnavailable("relay timeout".into()));
            }
            Ok("bundle-1".to_string())
        }
        async fn wait_for_bundle(&self, _id: &str, _timeout: Duration) -> Result<BundleOutcome> {
            Ok(BundleOutcome::Landed)
        }
    }

    struct MockRpc {
        fail_at: Option<usize>,
        calls: AtomicU32,
    }
    #[async_trait]
    impl NodeRpc for MockRpc {
        async fn send_and_confirm(&self, signed_tx: &[u8]) -> Result<String> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            if Some(index) == self.fail_at {
                return Err(EngineError::UnknownProgramError("boom".into()));
            }
            Ok(format!("tx-{}-{}", index, signed_tx.len()))
        }
        async fn get_balance_lamports(&self, _wallet: &Pubkey) -> Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn bundle_mode_returns_landed_on_success() {
        let custody = MockCustody;
        let relay = MockRelay { outcomes: Mutex::new(vec![BundleOutcome::Landed]) };
        let rpc = MockRpc { fail_at: None, calls: AtomicU32::new(0) };
        let breaker = CircuitBreaker::new();
        let driver = SubmissionDriver::new(&custody, &relay, &rpc, &breaker);

        let wallet = Pubkey::new_unique();
        let result = driver
            .submit(&wallet, vec![vec![1, 2, 3]], SubmissionMode::Bundle)
            .await
            .unwrap();
        assert!(result.fully_landed());
    }

    #[tokio::test]
    async fn bundle_mode_fails_to_surface_on_chain_failure() {
        let custody = MockCustody;
        let relay = MockRelay { outcomes: Mutex::new(vec![BundleOutcome::Failed]) };
        let rpc = MockRpc { fail_at: None, calls: AtomicU32::new(0) };
        let breaker = CircuitBreaker::new();
        let driver = SubmissionDriver::new(&custody, &relay, &rpc, &breaker);

        let wallet = Pubkey::new_unique();
        let result = driver
            .submit(&wallet, vec![vec![1]], SubmissionMode::Bundle)
            .await
            .unwrap();
        assert!(!result.fully_landed());
    }

    #[tokio::test(start_paused = true)]
    async fn bundle_mode_retries_a_transient_submit_error_and_then_lands() {
        let custody = MockCustody;
        let relay = FlakyRelay { submit_failures_remaining: AtomicU32::new(1) };
        let rpc = MockRpc { fail_at: None, calls: AtomicU32::new(0) };
        let breaker = CircuitBreaker::new();
        let driver = SubmissionDriver::new(&custody, &relay, &rpc, &breaker);

        let wallet = Pubkey::new_unique();
        let result = driver
            .submit(&wallet, vec![vec![1, 2, 3]], SubmissionMode::Bundle)
            .await
            .unwrap();
        assert!(result.fully_landed());
    }

    struct AlwaysRejects;
    #[async_trait]
    impl PrivateRelay for AlwaysRejects {
        async fn submit_bundle(&self, _signed: Vec<Vec<u8>>) -> Result<String> {
            Err(EngineError::SignRefused("policy denied".into()))
        }
        async fn wait_for_bundle(&self, _id: &str, _timeout: Duration) -> Result<BundleOutcome> {
            unreachable!("submit_bundle should fail before polling")
        }
    }

    #[tokio::test]
    async fn bundle_mode_surfaces_a_non_transient_submit_error_without_retrying() {
        let custody = MockCustody;
        let relay = AlwaysRejects;
        let rpc = MockRpc { fail_at: None, calls: AtomicU32::new(0) };
        let breaker = CircuitBreaker::new();
        let driver = SubmissionDriver::new(&custody, &relay, &rpc, &breaker);

        let wallet = Pubkey::new_unique();
        let result = driver
            .submit(&wallet, vec![vec![1]], SubmissionMode::Bundle)
            .await;
        assert!(matches!(result, Err(EngineError::SignRefused(_))));
    }

    #[tokio::test]
    async fn sequential_mode_aborts_remainder_on_failure() {
        let custody = MockCustody;
        let relay = MockRelay { outcomes: Mutex::new(vec![]) };
        let rpc = MockRpc { fail_at: Some(1), calls: AtomicU32::new(0) };
        let breaker = CircuitBreaker::new();
        let driver = SubmissionDriver::new(&custody, &relay, &rpc, &breaker);

        let wallet = Pubkey::new_unique();
        let result = driver
            .submit(
                &wallet,
                vec![vec![1], vec![2], vec![3]],
                SubmissionMode::Sequential,
            )
            .await
            .unwrap();
        assert_eq!(result.landed_txs.len(), 1);
        assert_eq!(result.failed_at, Some(1));
    }
}
