//! Simulates a transaction to size its compute-unit
//! limit and derives a priority fee from recent prioritization fees.

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;

use solana_sdk::hash::Hash;

use crate::error::{EngineError, Result};
use crate::model::TipUrgency;

const MIN_COMPUTE_UNITS: u32 = 50_000;
const MAX_COMPUTE_UNITS: u32 = 1_400_000;
const DEFAULT_COMPUTE_UNITS: u32 = 400_000;
const SIMULATION_HEADROOM: f64 = 1.3;
const PRIORITY_FEE_FLOOR: u64 = 1_000;

#[derive(Debug, Clone, Copy)]
pub struct BudgetEstimate {
    pub compute_unit_limit: u32,
    pub priority_fee_micro_lamports: u64,
}

pub struct BudgetEstimator {
    rpc: RpcClient,
}

impl BudgetEstimator {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url),
        }
    }

    /// Simulate `instructions` under `replace-recent-blockhash` with
    /// signature verification disabled, then derive the compute-unit
    /// limit and priority fee.
    pub async fn estimate(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        writable_accounts: &[Pubkey],
        urgency: TipUrgency,
    ) -> Result<BudgetEstimate> {
        let compute_unit_limit = self.simulate_compute_units(instructions, payer).await;
        let priority_fee_micro_lamports = self
            .recent_priority_fee(writable_accounts, urgency)
            .await
            .unwrap_or(PRIORITY_FEE_FLOOR)
            .max(PRIORITY_FEE_FLOOR);

        Ok(BudgetEstimate {
            compute_unit_limit,
            priority_fee_micro_lamports,
        })
    }

    async fn simulate_compute_units(&self, instructions: &[Instruction], payer: &Pubkey) -> u32 {
        let message = Message::new(instructions, Some(payer));
        let mut tx = Transaction::new_unsigned(message);
        tx.message.recent_blockhash = Default::default();

        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            ..Default::default()
        };

        match self.rpc.simulate_transaction_with_config(&tx, config).await {
            Ok(response) => match response.value.units_consumed {
                Some(consumed) => {
                    let sized = (consumed as f64 * SIMULATION_HEADROOM).ceil() as u32;
                    sized.clamp(MIN_COMPUTE_UNITS, MAX_COMPUTE_UNITS)
                }
                None => DEFAULT_COMPUTE_UNITS,
            },
            Err(_) => DEFAULT_COMPUTE_UNITS,
        }
    }

    async fn recent_priority_fee(&self, writable_accounts: &[Pubkey], urgency: TipUrgency) -> Option<u64> {
        let fees = self
            .rpc
            .get_recent_prioritization_fees(writable_accounts)
            .await
            .ok()?;

        if fees.is_empty() {
            return None;
        }

        let mut values: Vec<u64> = fees.iter().map(|f| f.prioritization_fee).collect();
        values.sort_unstable();
        Some(percentile(&values, urgency.fee_percentile()))
    }

    /// Fresh blockhash for a transaction about to be finalized and
    /// serialized.
    pub async fn latest_blockhash(&self) -> Result<Hash> {
        self.rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| EngineError::RpcUnavailable(e.to_string()))
    }
}

fn percentile(sorted: &[u64], n: u8) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (n as f64 / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Rebuild an instruction list with the two compute-budget program
/// instructions prepended, filtering out any pre-existing ones.
pub fn prepend_compute_budget(
    instructions: Vec<Instruction>,
    estimate: BudgetEstimate,
) -> Vec<Instruction> {
    let mut filtered: Vec<Instruction> = instructions
        .into_iter()
        .filter(|ix| ix.program_id != solana_sdk::compute_budget::id())
        .collect();

    let mut out = vec![
        ComputeBudgetInstruction::set_compute_unit_limit(estimate.compute_unit_limit),
        ComputeBudgetInstruction::set_compute_unit_price(estimate.priority_fee_micro_lamports),
    ];
    out.append(&mut filtered);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_picks_the_right_rank() {
        let values = vec![10, 20, 30, 40, 50];
        assert_eq!(percentile(&values, 0), 10);
        assert_eq!(percentile(&values, 100), 50);
        assert_eq!(percentile(&values, 50), 30);
    }

    #[test]
    fn percentile_on_empty_is_zero() {
        assert_eq!(percentile(&[], 50), 0);
    }
}
