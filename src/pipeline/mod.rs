//! Assembles the ordered, finalized transaction
//! list for the three intents — atomic-LP, withdraw-and-convert, atomic
//! rebalance — driving the slippage escalation state machine
//! on `SLIPPAGE_EXCEEDED`.

pub mod escalation;
pub mod swap_router;

use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;

use crate::budget::{self, BudgetEstimator};
use crate::error::{EngineError, Result};
use crate::model::{Pool, Position, Strategy, TipUrgency};
use crate::oracle::OracleAggregator;
use crate::seal::{PrivacySealer, SealedStrategy};
use crate::venues::{InputAmounts, VenueAdapter};
use async_trait::async_trait;

pub use escalation::{EscalationState, Escalator};

/// The external swap-routing service contract used during the swap
/// leg of composition. Returns the expected and worst-case output
/// alongside the instructions that perform the swap.
#[async_trait]
pub trait SwapRouter: Send + Sync {
    async fn quote_and_build(
        &self,
        owner: &Pubkey,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u32,
    ) -> Result<SwapLeg>;
}

#[derive(Debug, Clone)]
pub struct SwapLeg {
    pub expected_out: u64,
    pub worst_case_out: u64,
    pub instructions: Vec<Instruction>,
}

/// A finalized, unsigned transaction ready for the submission driver,
/// plus any auxiliary keypair it needs co-signed (a fresh position
/// account, for instance).
pub struct FinalizedTransaction {
    pub transaction: Transaction,
    pub auxiliary_signers: Vec<Keypair>,
}

pub struct ComposedIntent {
    pub transactions: Vec<FinalizedTransaction>,
    pub sealed_strategy: SealedStrategy,
    /// Whether the underlying asset was converted to the requested target
    /// mint. Always `true` outside of withdraw-and-convert, where a failed
    /// swap-back leaves the raw pool tokens in the wallet instead.
    pub converted: bool,
    pub conversion_failure_reason: Option<String>,
}

#[derive(Clone)]
pub struct TreasuryConfig {
    pub treasury_account: Pubkey,
    pub tip_account: Pubkey,
    pub protocol_fee_bps: u16,
}

pub struct PipelineComposer<'a> {
    sealer: &'a PrivacySealer,
    oracle: &'a OracleAggregator,
    budget: &'a BudgetEstimator,
    swap_router: &'a dyn SwapRouter,
    treasury: TreasuryConfig,
}

impl<'a> PipelineComposer<'a> {
    pub fn new(
        sealer: &'a PrivacySealer,
        oracle: &'a OracleAggregator,
        budget: &'a BudgetEstimator,
        swap_router: &'a dyn SwapRouter,
        treasury: TreasuryConfig,
    ) -> Self {
        Self {
            sealer,
            oracle,
            budget,
            swap_router,
            treasury,
        }
    }

    /// Composes the atomic-LP intent. `slippage_bps` is overridden by the
    /// escalator on retries; everything else is re-derived fresh.
    pub async fn compose_atomic_lp(
        &self,
        strategy: &Strategy,
        pool: &Pool,
        adapter: &dyn VenueAdapter,
        owner: &Pubkey,
        slippage_bps: u32,
        now_unix: i64,
    ) -> Result<ComposedIntent> {
        // Step 1: seal for audit. Never influences instruction bytes.
        let sealed_strategy = self.sealer.seal(strategy)?;

        // Step 2: price both sides, abort if either is unreliable.
        let price_a = self.oracle.price(&pool.token_a.mint, now_unix).await?;
        let price_b = self.oracle.price(&pool.token_b.mint, now_unix).await?;
        if price_a.unreliable || price_b.unreliable {
            return Err(EngineError::OracleUnreliable(format!(
                "{}/{}",
                pool.token_a.symbol, pool.token_b.symbol
            )));
        }

        // Step 3: swap leg(s) from the collateral mint to the pool's sides.
        let mint = &strategy.collateral_mint;
        let mut swap_instructions = Vec::new();
        let inputs = if *mint == pool.token_a.mint {
            let half = strategy.collateral_amount / 2;
            let leg = self
                .swap_router
                .quote_and_build(owner, mint, &pool.token_b.mint, half, slippage_bps)
                .await?;
            swap_instructions.extend(leg.instructions);
            InputAmounts {
                amount_a: strategy.collateral_amount - half,
                amount_b: leg.worst_case_out,
            }
        } else if *mint == pool.token_b.mint {
            let half = strategy.collateral_amount / 2;
            let leg = self
                .swap_router
                .quote_and_build(owner, mint, &pool.token_a.mint, half, slippage_bps)
                .await?;
            swap_instructions.extend(leg.instructions);
            InputAmounts {
                amount_a: leg.worst_case_out,
                amount_b: strategy.collateral_amount - half,
            }
        } else {
            let leg_a = self
                .swap_router
                .quote_and_build(
                    owner,
                    mint,
                    &pool.token_a.mint,
                    strategy.collateral_amount / 2,
                    slippage_bps,
                )
                .await?;
            let leg_b = self
                .swap_router
                .quote_and_build(
                    owner,
                    mint,
                    &pool.token_b.mint,
                    strategy.collateral_amount / 2,
                    slippage_bps,
                )
                .await?;
            swap_instructions.extend(leg_a.instructions);
            swap_instructions.extend(leg_b.instructions);
            InputAmounts {
                amount_a: leg_a.worst_case_out,
                amount_b: leg_b.worst_case_out,
            }
        };

        // Step 4: liquidity quote off the post-swap expected balances.
        let range = adapter.compute_range(
            pool,
            strategy.range_shape,
            strategy.custom_lower,
            strategy.custom_upper,
        )?;
        let quote = adapter.quote_liquidity(pool, range, inputs, slippage_bps)?;

        // Step 5: venue's open/add instructions.
        let built = adapter.build_open(
            pool,
            range,
            InputAmounts {
                amount_a: quote.expected_a,
                amount_b: quote.expected_b,
            },
            owner,
            strategy.distribution_shape.filter(|_| matches!(pool.venue, crate::model::VenueTag::Dlmm)),
        )?;

        let mut instructions = swap_instructions;
        instructions.extend(built.instructions);

        // Step 6: optional tip transaction.
        maybe_append_tip(&mut instructions, owner, &self.treasury.tip_account, strategy.tip_urgency);

        // Step 7: finalize compute budget and blockhash, serialize.
        let transaction = self
            .finalize(instructions, owner, strategy.tip_urgency)
            .await?;

        Ok(ComposedIntent {
            transactions: vec![FinalizedTransaction {
                transaction,
                auxiliary_signers: built.auxiliary_signers,
            }],
            sealed_strategy,
            converted: true,
            conversion_failure_reason: None,
        })
    }

    /// execute-open variant: the caller has already swapped into
    /// both pool-side tokens, so this skips straight to the liquidity
    /// quote and open.
    pub async fn compose_execute_open(
        &self,
        strategy: &Strategy,
        pool: &Pool,
        adapter: &dyn VenueAdapter,
        owner: &Pubkey,
        inputs: InputAmounts,
    ) -> Result<ComposedIntent> {
        let sealed_strategy = self.sealer.seal(strategy)?;

        let range = adapter.compute_range(pool, strategy.range_shape, strategy.custom_lower, strategy.custom_upper)?;
        let quote = adapter.quote_liquidity(pool, range, inputs, strategy.slippage_bps)?;

        let built = adapter.build_open(
            pool,
            range,
            InputAmounts { amount_a: quote.expected_a, amount_b: quote.expected_b },
            owner,
            strategy.distribution_shape.filter(|_| matches!(pool.venue, crate::model::VenueTag::Dlmm)),
        )?;

        let mut instructions = built.instructions;
        maybe_append_tip(&mut instructions, owner, &self.treasury.tip_account, strategy.tip_urgency);

        let transaction = self.finalize(instructions, owner, strategy.tip_urgency).await?;

        Ok(ComposedIntent {
            transactions: vec![FinalizedTransaction { transaction, auxiliary_signers: built.auxiliary_signers }],
            sealed_strategy,
            converted: true,
            conversion_failure_reason: None,
        })
    }

    /// Composes withdraw-and-convert. Falls back to returning pool tokens
    /// with no fee if the swap back to `target_mint` fails.
    pub async fn compose_withdraw_and_convert(
        &self,
        position: &Position,
        pool: &Pool,
        adapter: &dyn VenueAdapter,
        owner: &Pubkey,
        target_mint: &str,
        tip_urgency: TipUrgency,
    ) -> Result<ComposedIntent> {
        let mut instructions = adapter.build_decrease(position, 10_000, true)?;

        let fee_bps = self.treasury.protocol_fee_bps as u64;
        let swap_a = self
            .swap_router
            .quote_and_build(owner, &pool.token_a.mint, target_mint, position.deposited_a, 300)
            .await;
        let swap_b = self
            .swap_router
            .quote_and_build(owner, &pool.token_b.mint, target_mint, position.deposited_b, 300)
            .await;

        let (net_withdrawn, conversion_failure_reason) = match (swap_a, swap_b) {
            (Ok(a), Ok(b)) => {
                instructions.extend(a.instructions);
                instructions.extend(b.instructions);
                (Some(a.worst_case_out + b.worst_case_out), None)
            }
            _ => (None, Some("swap_unavailable".to_string())),
        };

        if let Some(net) = net_withdrawn {
            let protocol_fee = net * fee_bps / 10_000;
            instructions.push(system_instruction::transfer(
                owner,
                &self.treasury.treasury_account,
                protocol_fee,
            ));
        }
        // swap failed after exhausting the router's own retries: fall back
        // to returning the raw pool tokens with no protocol fee.

        maybe_append_tip(&mut instructions, owner, &self.treasury.tip_account, tip_urgency);

        let transaction = self.finalize(instructions, owner, tip_urgency).await?;

        Ok(ComposedIntent {
            transactions: vec![FinalizedTransaction {
                transaction,
                auxiliary_signers: vec![],
            }],
            sealed_strategy: SealedStrategy {
                ciphertext_b64: String::new(),
                nonce_b64: String::new(),
                ephemeral_public_key_b64: String::new(),
                cluster_id: String::new(),
            },
            converted: conversion_failure_reason.is_none(),
            conversion_failure_reason,
        })
    }

    /// Composes an atomic rebalance. Decrease+close of the old position and
    /// open at a new range centered on the current index, width
    /// preserved by default, in a single bundle so the new range
    /// replaces the old one atomically.
    pub async fn compose_atomic_rebalance(
        &self,
        position: &Position,
        pool: &Pool,
        adapter: &dyn VenueAdapter,
        owner: &Pubkey,
        tip_urgency: TipUrgency,
    ) -> Result<ComposedIntent> {
        let mut instructions = adapter.build_decrease(position, 10_000, true)?;

        let width = position.upper_index - position.lower_index;
        let half_width = width / 2;
        let new_lower = pool.current_index - half_width;
        let new_upper = new_lower + width;

        let granularity_units = pool.granularity.units() as i32;
        let new_range = (
            snap_down(new_lower, granularity_units),
            snap_down(new_upper, granularity_units).max(snap_down(new_lower, granularity_units) + granularity_units),
        );

        let built = adapter.build_open(
            pool,
            new_range,
            InputAmounts {
                amount_a: position.deposited_a,
                amount_b: position.deposited_b,
            },
            owner,
            None,
        )?;
        instructions.extend(built.instructions);

        maybe_append_tip(&mut instructions, owner, &self.treasury.tip_account, tip_urgency);

        let transaction = self.finalize(instructions, owner, tip_urgency).await?;

        Ok(ComposedIntent {
            transactions: vec![FinalizedTransaction {
                transaction,
                auxiliary_signers: built.auxiliary_signers,
            }],
            sealed_strategy: SealedStrategy {
                ciphertext_b64: String::new(),
                nonce_b64: String::new(),
                ephemeral_public_key_b64: String::new(),
                cluster_id: String::new(),
            },
            converted: true,
            conversion_failure_reason: None,
        })
    }

    /// collect-fees intent: a single venue `build_collect_fees`
    /// call plus the usual tip/budget finalization. No swap leg, no
    /// sealed strategy (there is no pre-execution intent to audit).
    pub async fn compose_collect_fees(
        &self,
        position: &Position,
        adapter: &dyn VenueAdapter,
        owner: &Pubkey,
        tip_urgency: TipUrgency,
    ) -> Result<ComposedIntent> {
        let mut instructions = adapter.build_collect_fees(position)?;
        maybe_append_tip(&mut instructions, owner, &self.treasury.tip_account, tip_urgency);

        let transaction = self.finalize(instructions, owner, tip_urgency).await?;

        Ok(ComposedIntent {
            transactions: vec![FinalizedTransaction { transaction, auxiliary_signers: vec![] }],
            sealed_strategy: SealedStrategy {
                ciphertext_b64: String::new(),
                nonce_b64: String::new(),
                ephemeral_public_key_b64: String::new(),
                cluster_id: String::new(),
            },
            converted: true,
            conversion_failure_reason: None,
        })
    }

    async fn finalize(
        &self,
        instructions: Vec<Instruction>,
        payer: &Pubkey,
        urgency: TipUrgency,
    ) -> Result<Transaction> {
        let writable = writable_accounts_of(&instructions);
        let estimate = self.budget.estimate(&instructions, payer, &writable, urgency).await?;
        let finalized = budget::prepend_compute_budget(instructions, estimate);

        let blockhash = self.budget.latest_blockhash().await?;
        let message = Message::new(&finalized, Some(payer));
        let mut tx = Transaction::new_unsigned(message);
        tx.message.recent_blockhash = blockhash;
        Ok(tx)
    }
}

fn maybe_append_tip(instructions: &mut Vec<Instruction>, payer: &Pubkey, tip_account: &Pubkey, urgency: TipUrgency) {
    let lamports = urgency.tip_lamports();
    if lamports > 0 {
        instructions.push(system_instruction::transfer(payer, tip_account, lamports));
    }
}

fn writable_accounts_of(instructions: &[Instruction]) -> Vec<Pubkey> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for ix in instructions {
        for meta in &ix.accounts {
            if meta.is_writable && seen.insert(meta.pubkey) {
                out.push(meta.pubkey);
            }
        }
    }
    out
}

fn snap_down(index: i32, granularity_units: i32) -> i32 {
    if granularity_units <= 0 {
        return index;
    }
    index.div_euclid(granularity_units) * granularity_units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_down_rounds_toward_negative_infinity() {
        assert_eq!(snap_down(5003, 10), 5000);
        assert_eq!(snap_down(-5003, 10), -5010);
        assert_eq!(snap_down(5000, 10), 5000);
    }

    #[test]
    fn writable_accounts_of_dedupes_and_skips_readonly() {
        use solana_sdk::instruction::AccountMeta;
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[],
            vec![
                AccountMeta::new(a, false),
                AccountMeta::new_readonly(b, false),
                AccountMeta::new(a, false),
            ],
        );
        let writable = writable_accounts_of(&[ix]);
        assert_eq!(writable, vec![a]);
    }
}
