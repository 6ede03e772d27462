//! swap router contract: `quote(input, output, amount, slippageBps)`
//! and `swap(quote, owner) -> unsigned tx`. `JupiterSwapRouter` talks to a
//! Jupiter-compatible aggregator over HTTP; `DryRunSwapRouter` fabricates
//! a 1:1 quote with no instructions for exercising the composer without a
//! live router.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::{EngineError, Result};

use super::{SwapLeg, SwapRouter};

pub struct JupiterSwapRouter {
    client: reqwest::Client,
    base_url: String,
}

impl JupiterSwapRouter {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    out_amount: String,
    other_amount_threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction_b64: String,
}

#[async_trait]
impl SwapRouter for JupiterSwapRouter {
    async fn quote_and_build(
        &self,
        owner: &Pubkey,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u32,
    ) -> Result<SwapLeg> {
        let quote: QuoteResponse = self
            .client
            .get(format!("{}/quote", self.base_url))
            .query(&[
                ("inputMint", input_mint),
                ("outputMint", output_mint),
                ("amount", &amount.to_string()),
                ("slippageBps", &slippage_bps.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let expected_out: u64 = quote
            .out_amount
            .parse()
            .map_err(|_| EngineError::Internal("swap router returned a non-numeric outAmount".into()))?;
        let worst_case_out: u64 = quote
            .other_amount_threshold
            .parse()
            .map_err(|_| EngineError::Internal("swap router returned a non-numeric otherAmountThreshold".into()))?;

        let swap: SwapResponse = self
            .client
            .post(format!("{}/swap", self.base_url))
            .json(&serde_json::json!({
                "userPublicKey": owner.to_string(),
                "quoteResponse": quote,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let raw_tx = BASE64
            .decode(swap.swap_transaction_b64)
            .map_err(|e| EngineError::Internal(format!("decoding swap transaction: {e}")))?;
        let versioned: solana_sdk::transaction::VersionedTransaction = bincode::deserialize(&raw_tx)
            .map_err(|e| EngineError::Internal(format!("decoding versioned swap transaction: {e}")))?;
        let instructions = legacy_instructions_of(&versioned)?;

        Ok(SwapLeg { expected_out, worst_case_out, instructions })
    }
}

/// The composer only deals in legacy `Instruction` lists (it builds its
/// own `Message` at finalize time), so a versioned swap transaction's
/// instructions are extracted back out rather than nested whole.
fn legacy_instructions_of(
    versioned: &solana_sdk::transaction::VersionedTransaction,
) -> Result<Vec<solana_sdk::instruction::Instruction>> {
    use solana_sdk::message::VersionedMessage;

    let message = match &versioned.message {
        VersionedMessage::Legacy(m) => m,
        VersionedMessage::V0(_) => {
            return Err(EngineError::Internal(
                "swap router returned a v0 transaction with address lookup tables, which the composer cannot flatten".into(),
            ));
        }
    };

    Ok(message
        .instructions
        .iter()
        .map(|compiled| {
            let program_id = message.account_keys[compiled.program_id_index as usize];
            let accounts = compiled
                .accounts
                .iter()
                .map(|&index| {
                    let pubkey = message.account_keys[index as usize];
                    solana_sdk::instruction::AccountMeta {
                        pubkey,
                        is_signer: message.is_signer(index as usize),
                        is_writable: message.is_maybe_writable(index as usize, None),
                    }
                })
                .collect();
            solana_sdk::instruction::Instruction {
                program_id,
                accounts,
                data: compiled.data.clone(),
            }
        })
        .collect())
}

/// Fabricates a 1:1 quote with no instructions, for composing intents
/// against a `dry_run` engine configuration.
pub struct DryRunSwapRouter;

#[async_trait]
impl SwapRouter for DryRunSwapRouter {
    async fn quote_and_build(
        &self,
        _owner: &Pubkey,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u32,
    ) -> Result<SwapLeg> {
        tracing::info!(input_mint, output_mint, amount, slippage_bps, "dry-run: fabricating 1:1 swap quote");
        Ok(SwapLeg { expected_out: amount, worst_case_out: amount, instructions: vec![] })
    }
}
