//! Production implementations of the external-collaborator contracts:
//! a custody oracle reached over HTTP, the node RPC via solana-client, and
//! a private relay (Jito-style block engine) over HTTP. None of these hold
//! key material; `HttpCustodyOracle` only ever forwards unsigned bytes out
//! and signed bytes back.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;

use crate::error::{EngineError, Result};

use super::{BundleOutcome, CustodyOracle, NodeRpc, PrivateRelay};

/// Talks to the custody oracle's HTTP surface: `POST /wallets`,
/// `POST /sign`, `POST /sign-and-send`. The oracle is assumed to hold
/// keys behind an HSM or MPC quorum the engine never sees.
pub struct HttpCustodyOracle {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCustodyOracle {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Serialize)]
struct CreateWalletRequest<'a> {
    label: &'a str,
}

#[derive(Deserialize)]
struct CreateWalletResponse {
    address: String,
}

#[derive(Serialize)]
struct SignRequest<'a> {
    wallet: String,
    unsigned_tx_b64: &'a str,
}

#[derive(Deserialize)]
struct SignResponse {
    signed_tx_b64: String,
}

#[derive(Deserialize)]
struct SignAndSendResponse {
    tx_hash: String,
}

#[async_trait]
impl CustodyOracle for HttpCustodyOracle {
    async fn create_wallet(&self, label: &str) -> Result<String> {
        let resp: CreateWalletResponse = self
            .client
            .post(format!("{}/wallets", self.base_url))
            .json(&CreateWalletRequest { label })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.address)
    }

    async fn sign(&self, wallet: &Pubkey, unsigned_tx: &[u8]) -> Result<Vec<u8>> {
        let unsigned_tx_b64 = BASE64.encode(unsigned_tx);
        let resp: SignResponse = self
            .client
            .post(format!("{}/sign", self.base_url))
            .json(&SignRequest { wallet: wallet.to_string(), unsigned_tx_b64: &unsigned_tx_b64 })
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                if e.status().map(|s| s.as_u16()) == Some(403) {
                    EngineError::SignRefused(e.to_string())
                } else {
                    EngineError::from(e)
                }
            })?
            .json()
            .await?;

        BASE64
            .decode(resp.signed_tx_b64)
            .map_err(|e| EngineError::Internal(format!("decoding signed tx: {e}")))
    }

    async fn sign_and_send(&self, wallet: &Pubkey, unsigned_tx: &[u8]) -> Result<String> {
        let unsigned_tx_b64 = BASE64.encode(unsigned_tx);
        let resp: SignAndSendResponse = self
            .client
            .post(format!("{}/sign-and-send", self.base_url))
            .json(&SignRequest { wallet: wallet.to_string(), unsigned_tx_b64: &unsigned_tx_b64 })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.tx_hash)
    }
}

/// Jito-style private relay: submits a bundle of already-signed
/// transactions and polls for its landing outcome.
pub struct HttpPrivateRelay {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPrivateRelay {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Serialize)]
struct SubmitBundleRequest {
    transactions_b64: Vec<String>,
}

#[derive(Deserialize)]
struct SubmitBundleResponse {
    bundle_id: String,
}

#[derive(Deserialize)]
struct BundleStatusResponse {
    status: String,
}

#[async_trait]
impl PrivateRelay for HttpPrivateRelay {
    async fn submit_bundle(&self, signed: Vec<Vec<u8>>) -> Result<String> {
        let transactions_b64 = signed.iter().map(|tx| BASE64.encode(tx)).collect();
        let resp: SubmitBundleResponse = self
            .client
            .post(format!("{}/api/v1/bundles", self.base_url))
            .json(&SubmitBundleRequest { transactions_b64 })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.bundle_id)
    }

    async fn wait_for_bundle(&self, bundle_id: &str, timeout: Duration) -> Result<BundleOutcome> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let resp: BundleStatusResponse = self
                .client
                .get(format!("{}/api/v1/bundles/{bundle_id}", self.base_url))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            match resp.status.as_str() {
                "landed" => return Ok(BundleOutcome::Landed),
                "failed" => return Ok(BundleOutcome::Failed),
                _ if tokio::time::Instant::now() >= deadline => return Ok(BundleOutcome::Dropped),
                _ => tokio::time::sleep(Duration::from_millis(500)).await,
            }
        }
    }
}

/// Thin wrapper over `solana_client::nonblocking::rpc_client::RpcClient`
/// for the subset the submission driver needs in sequential mode.
pub struct RpcNodeClient {
    rpc: RpcClient,
}

impl RpcNodeClient {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
        }
    }
}

#[async_trait]
impl NodeRpc for RpcNodeClient {
    async fn send_and_confirm(&self, signed_tx: &[u8]) -> Result<String> {
        let tx: solana_sdk::transaction::Transaction = bincode::deserialize(signed_tx)
            .map_err(|e| EngineError::Internal(format!("decoding signed transaction: {e}")))?;

        let signature = self
            .rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| EngineError::RpcUnavailable(e.to_string()))?;
        Ok(signature.to_string())
    }

    async fn get_balance_lamports(&self, wallet: &Pubkey) -> Result<u64> {
        self.rpc
            .get_balance(wallet)
            .await
            .map_err(|e| EngineError::RpcUnavailable(e.to_string()))
    }
}
