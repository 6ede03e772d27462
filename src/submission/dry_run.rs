//! Dry-run implementations of the submission ports, selected by
//! `EngineConfig.dry_run`. Logs what would have happened and returns
//! deterministic placeholder values instead of touching any external
//! service; lets `serve`/the CLI exercise the full pipeline without a
//! funded wallet or a live custody oracle.

use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::error::Result;

use super::{BundleOutcome, CustodyOracle, NodeRpc, PrivateRelay};

pub struct DryRunCustody;

#[async_trait]
impl CustodyOracle for DryRunCustody {
    async fn create_wallet(&self, label: &str) -> Result<String> {
        let address = Pubkey::new_unique();
        tracing::info!(%address, label, "dry-run: would provision custodied wallet");
        Ok(address.to_string())
    }

    async fn sign(&self, wallet: &Pubkey, unsigned_tx: &[u8]) -> Result<Vec<u8>> {
        tracing::info!(%wallet, bytes = unsigned_tx.len(), "dry-run: would sign transaction");
        Ok(unsigned_tx.to_vec())
    }

    async fn sign_and_send(&self, wallet: &Pubkey, unsigned_tx: &[u8]) -> Result<String> {
        tracing::info!(%wallet, bytes = unsigned_tx.len(), "dry-run: would sign and send transaction");
        Ok(format!("dry-run-{}", unsigned_tx.len()))
    }
}

pub struct DryRunRelay;

#[async_trait]
impl PrivateRelay for DryRunRelay {
    async fn submit_bundle(&self, signed: Vec<Vec<u8>>) -> Result<String> {
        tracing::info!(txs = signed.len(), "dry-run: would submit bundle");
        Ok("dry-run-bundle".to_string())
    }

    async fn wait_for_bundle(&self, bundle_id: &str, _timeout: Duration) -> Result<BundleOutcome> {
        tracing::info!(bundle_id, "dry-run: bundle assumed landed");
        Ok(BundleOutcome::Landed)
    }
}

pub struct DryRunRpc;

#[async_trait]
impl NodeRpc for DryRunRpc {
    async fn send_and_confirm(&self, signed_tx: &[u8]) -> Result<String> {
        tracing::info!(bytes = signed_tx.len(), "dry-run: would send and confirm transaction");
        Ok(format!("dry-run-{}", signed_tx.len()))
    }

    async fn get_balance_lamports(&self, wallet: &Pubkey) -> Result<u64> {
        tracing::info!(%wallet, "dry-run: reporting placeholder balance");
        Ok(0)
    }
}
