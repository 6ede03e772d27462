//! Meteora DLMM adapter.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::str::FromStr;

use crate::error::{EngineError, Result};
use crate::model::pool::{Granularity, TokenSide};
use crate::model::{DistributionShape, Pool, Position, RangeShape, VenueTag};

use super::math::{amounts_from_liquidity_bin, bin_to_price, snap_bin_range};
use super::{
    BuiltInstructions, InputAmounts, LiquidityQuote, VenueAdapter, validate_custom_range,
};

/// Meteora DLMM program id on mainnet.
pub const PROGRAM_ID: &str = "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo";

pub struct DlmmAdapter {
    rpc: RpcClient,
    program_id: Pubkey,
}

impl DlmmAdapter {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url),
            program_id: Pubkey::from_str(PROGRAM_ID).expect("valid DLMM program id"),
        }
    }
}

#[async_trait]
impl VenueAdapter for DlmmAdapter {
    fn tag(&self) -> VenueTag {
        VenueTag::Dlmm
    }

    async fn describe_pool(&self, pool_address: &str) -> Result<Pool> {
        let address =
            Pubkey::from_str(pool_address).map_err(|e| EngineError::Validation(e.to_string()))?;

        let account = self
            .rpc
            .get_account(&address)
            .await
            .map_err(|e| EngineError::VenueUnavailable(e.to_string()))?;

        if account.owner != self.program_id {
            return Err(EngineError::UnsupportedPoolType(format!(
                "{pool_address} is not owned by the DLMM program"
            )));
        }

        decode_lb_pair(pool_address, &account.data)
    }

    fn compute_range(
        &self,
        pool: &Pool,
        shape: RangeShape,
        custom_lower: Option<i32>,
        custom_upper: Option<i32>,
    ) -> Result<(i32, i32)> {
        let Granularity::BinStep(bin_step) = pool.granularity else {
            return Err(EngineError::Internal("pool is not a DLMM pool".into()));
        };

        match shape {
            RangeShape::Concentrated => Ok(snap_bin_range(pool.current_index, 5, bin_step)),
            RangeShape::Wide => Ok(snap_bin_range(pool.current_index, 20, bin_step)),
            RangeShape::Custom => {
                let lower = custom_lower
                    .ok_or_else(|| EngineError::Validation("custom_lower required".into()))?;
                let upper = custom_upper
                    .ok_or_else(|| EngineError::Validation("custom_upper required".into()))?;
                validate_custom_range(lower, upper, bin_step as i32)?;
                Ok((lower, upper))
            }
        }
    }

    fn quote_liquidity(
        &self,
        pool: &Pool,
        range: (i32, i32),
        inputs: InputAmounts,
        slippage_bps: u32,
    ) -> Result<LiquidityQuote> {
        let Granularity::BinStep(bin_step) = pool.granularity else {
            return Err(EngineError::Internal("pool is not a DLMM pool".into()));
        };
        let (lower, upper) = range;

        // Solve for the liquidity scalar that reproduces the offered
        // amounts at the active bin, then re-derive the two-sided
        // expected amounts from it (mirrors the tick-venue quote shape).
        let (unit_a, unit_b) =
            amounts_from_liquidity_bin(1.0, pool.current_index, lower, upper, bin_step);
        let price = bin_to_price(pool.current_index, bin_step);

        let value_per_unit_l = unit_a * price + unit_b;
        let offered_value = inputs.amount_a as f64 * price + inputs.amount_b as f64;
        let liquidity = if value_per_unit_l > 0.0 {
            offered_value / value_per_unit_l
        } else {
            0.0
        };

        let (expected_a, expected_b) =
            amounts_from_liquidity_bin(liquidity, pool.current_index, lower, upper, bin_step);

        let slip = slippage_bps as f64 / 10_000.0;
        Ok(LiquidityQuote {
            liquidity: liquidity as u128,
            expected_a: expected_a as u64,
            expected_b: expected_b as u64,
            worst_case_a: (expected_a * (1.0 - slip)).max(0.0) as u64,
            worst_case_b: (expected_b * (1.0 - slip)).max(0.0) as u64,
        })
    }

    fn build_open(
        &self,
        pool: &Pool,
        range: (i32, i32),
        inputs: InputAmounts,
        owner: &Pubkey,
        distribution: Option<DistributionShape>,
    ) -> Result<BuiltInstructions> {
        let position_keypair = Keypair::new();
        let (lower, upper) = range;
        let distribution = distribution.unwrap_or(DistributionShape::Spot);

        let pool_address = Pubkey::from_str(&pool.address)
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        let mut data = vec![OPCODE_INITIALIZE_POSITION];
        data.extend_from_slice(&lower.to_le_bytes());
        data.extend_from_slice(&upper.to_le_bytes());

        let init_position = Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(position_keypair.pubkey(), true),
                AccountMeta::new(pool_address, false),
                AccountMeta::new(*owner, true),
            ],
            data,
        };

        let mut add_data = vec![OPCODE_ADD_LIQUIDITY, distribution as u8];
        add_data.extend_from_slice(&inputs.amount_a.to_le_bytes());
        add_data.extend_from_slice(&inputs.amount_b.to_le_bytes());

        let add_liquidity = Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(position_keypair.pubkey(), false),
                AccountMeta::new(pool_address, false),
                AccountMeta::new(*owner, true),
            ],
            data: add_data,
        };

        Ok(BuiltInstructions {
            instructions: vec![init_position, add_liquidity],
            auxiliary_signers: vec![position_keypair],
        })
    }

    fn build_decrease(
        &self,
        position: &Position,
        bps_to_remove: u16,
        close_if_full: bool,
    ) -> Result<Vec<Instruction>> {
        let position_address = Pubkey::from_str(&position.id)
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        let owner =
            Pubkey::from_str(&position.owner).map_err(|e| EngineError::Validation(e.to_string()))?;

        let mut data = vec![OPCODE_REMOVE_LIQUIDITY];
        data.extend_from_slice(&bps_to_remove.to_le_bytes());

        let mut instructions = vec![Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(position_address, false),
                AccountMeta::new(owner, true),
            ],
            data,
        }];

        if bps_to_remove >= 10_000 && close_if_full {
            instructions.push(Instruction {
                program_id: self.program_id,
                accounts: vec![
                    AccountMeta::new(position_address, false),
                    AccountMeta::new(owner, true),
                ],
                data: vec![OPCODE_CLOSE_POSITION],
            });
        }

        Ok(instructions)
    }

    fn build_collect_fees(&self, position: &Position) -> Result<Vec<Instruction>> {
        let position_address = Pubkey::from_str(&position.id)
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        let owner =
            Pubkey::from_str(&position.owner).map_err(|e| EngineError::Validation(e.to_string()))?;

        Ok(vec![
            Instruction {
                program_id: self.program_id,
                accounts: vec![
                    AccountMeta::new(position_address, false),
                    AccountMeta::new(owner, true),
                ],
                data: vec![OPCODE_UPDATE_FEES_AND_REWARDS],
            },
            Instruction {
                program_id: self.program_id,
                accounts: vec![
                    AccountMeta::new(position_address, false),
                    AccountMeta::new(owner, true),
                ],
                data: vec![OPCODE_CLAIM_FEE],
            },
        ])
    }

    async fn enumerate_positions(&self, wallet: &Pubkey) -> Result<Vec<Position>> {
        // DLMM positions are account-based (no NFT): scan program accounts
        // filtered by the owner field at a fixed offset.
        use solana_client::rpc_filter::{Memcmp, RpcFilterType};
        use solana_client::rpc_config::{RpcProgramAccountsConfig, RpcAccountInfoConfig};

        const OWNER_OFFSET: usize = 8;

        let config = RpcProgramAccountsConfig {
            filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                OWNER_OFFSET,
                &wallet.to_bytes(),
            ))]),
            account_config: RpcAccountInfoConfig::default(),
            ..Default::default()
        };

        let accounts = self
            .rpc
            .get_program_accounts_with_config(&self.program_id, config)
            .await
            .map_err(|e| EngineError::VenueUnavailable(e.to_string()))?;

        accounts
            .into_iter()
            .map(|(address, account)| decode_position(&address.to_string(), wallet, &account.data))
            .collect()
    }
}

const OPCODE_INITIALIZE_POSITION: u8 = 1;
const OPCODE_ADD_LIQUIDITY: u8 = 2;
const OPCODE_REMOVE_LIQUIDITY: u8 = 3;
const OPCODE_CLOSE_POSITION: u8 = 4;
const OPCODE_CLAIM_FEE: u8 = 5;
const OPCODE_UPDATE_FEES_AND_REWARDS: u8 = 6;

fn decode_lb_pair(address: &str, data: &[u8]) -> Result<Pool> {
    if data.len() < 64 {
        return Err(EngineError::Internal(
            "lb_pair account too small to decode".into(),
        ));
    }
    let active_id = i32::from_le_bytes(data[8..12].try_into().unwrap());
    let bin_step = u16::from_le_bytes(data[12..14].try_into().unwrap());

    Ok(Pool {
        address: address.to_string(),
        venue: VenueTag::Dlmm,
        token_a: TokenSide {
            mint: String::new(),
            symbol: String::new(),
            decimals: 9,
        },
        token_b: TokenSide {
            mint: String::new(),
            symbol: String::new(),
            decimals: 6,
        },
        price: bin_to_price(active_id, bin_step),
        granularity: Granularity::BinStep(bin_step),
        tvl_usd: 0.0,
        volume_24h_usd: 0.0,
        fee_bps: bin_step,
        risk_score: 1,
        current_index: active_id,
    })
}

fn decode_position(address: &str, wallet: &Pubkey, data: &[u8]) -> Result<Position> {
    if data.len() < 24 {
        return Err(EngineError::Internal(
            "position account too small to decode".into(),
        ));
    }
    let lower = i32::from_le_bytes(data[8..12].try_into().unwrap());
    let upper = i32::from_le_bytes(data[12..16].try_into().unwrap());

    Ok(Position {
        id: address.to_string(),
        owner: wallet.to_string(),
        venue: VenueTag::Dlmm,
        pool: String::new(),
        lower_index: lower,
        upper_index: upper,
        lower_price: 0.0,
        upper_price: 0.0,
        liquidity: 0,
        deposited_a: 0,
        deposited_b: 0,
        fees_a: 0,
        fees_b: 0,
        in_range: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> Pool {
        Pool {
            address: Pubkey::new_unique().to_string(),
            venue: VenueTag::Dlmm,
            token_a: TokenSide {
                mint: String::new(),
                symbol: "SOL".into(),
                decimals: 9,
            },
            token_b: TokenSide {
                mint: String::new(),
                symbol: "USDC".into(),
                decimals: 6,
            },
            price: 1.0,
            granularity: Granularity::BinStep(10),
            tvl_usd: 1_000_000.0,
            volume_24h_usd: 50_000.0,
            fee_bps: 10,
            risk_score: 3,
            current_index: 5000,
        }
    }

    fn adapter() -> DlmmAdapter {
        DlmmAdapter::new("http://localhost:8899".into())
    }

    #[test]
    fn compute_range_concentrated_snaps_around_the_active_bin() {
        let (lower, upper) = adapter()
            .compute_range(&sample_pool(), RangeShape::Concentrated, None, None)
            .unwrap();
        assert_eq!((lower, upper), (4950, 5050));
    }

    #[test]
    fn compute_range_wide_is_wider_than_concentrated() {
        let pool = sample_pool();
        let (c_lower, c_upper) = adapter()
            .compute_range(&pool, RangeShape::Concentrated, None, None)
            .unwrap();
        let (w_lower, w_upper) = adapter()
            .compute_range(&pool, RangeShape::Wide, None, None)
            .unwrap();
        assert!(w_lower < c_lower);
        assert!(w_upper > c_upper);
    }

    #[test]
    fn compute_range_custom_rejects_unaligned_bounds() {
        let err = adapter()
            .compute_range(&sample_pool(), RangeShape::Custom, Some(4955), Some(5050))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn compute_range_custom_requires_both_bounds() {
        let err = adapter()
            .compute_range(&sample_pool(), RangeShape::Custom, Some(4950), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn compute_range_rejects_a_pool_with_tick_granularity() {
        let mut pool = sample_pool();
        pool.granularity = Granularity::TickSpacing(64);
        let err = adapter()
            .compute_range(&pool, RangeShape::Concentrated, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }

    #[test]
    fn quote_liquidity_at_the_active_bin_splits_both_sides() {
        let pool = sample_pool();
        let range = (4950, 5050);
        let inputs = InputAmounts {
            amount_a: 1_000_000_000,
            amount_b: 1_000_000,
        };
        let quote = adapter().quote_liquidity(&pool, range, inputs, 100).unwrap();
        assert!(quote.liquidity > 0);
        assert!(quote.expected_a > 0);
        assert!(quote.expected_b > 0);
    }

    #[test]
    fn quote_liquidity_worst_case_tightens_with_slippage() {
        let pool = sample_pool();
        let range = (4950, 5050);
        let inputs = InputAmounts {
            amount_a: 1_000_000_000,
            amount_b: 1_000_000,
        };
        let tight = adapter().quote_liquidity(&pool, range, inputs, 100).unwrap();
        let loose = adapter().quote_liquidity(&pool, range, inputs, 1000).unwrap();
        assert!(loose.worst_case_a <= tight.worst_case_a);
        assert!(loose.worst_case_b <= tight.worst_case_b);
    }

    #[test]
    fn quote_liquidity_with_no_offered_amounts_yields_zero_liquidity() {
        let pool = sample_pool();
        let quote = adapter()
            .quote_liquidity(&pool, (4950, 5050), InputAmounts::default(), 100)
            .unwrap();
        assert_eq!(quote.liquidity, 0);
    }

    #[test]
    fn build_open_produces_init_and_add_liquidity_with_one_auxiliary_signer() {
        let pool = sample_pool();
        let owner = Pubkey::new_unique();
        let inputs = InputAmounts {
            amount_a: 1_000_000_000,
            amount_b: 1_000_000,
        };
        let built = adapter()
            .build_open(&pool, (4950, 5050), inputs, &owner, None)
            .unwrap();
        assert_eq!(built.instructions.len(), 2);
        assert_eq!(built.auxiliary_signers.len(), 1);
        assert_eq!(built.instructions[0].data[0], OPCODE_INITIALIZE_POSITION);
        assert_eq!(built.instructions[1].data[0], OPCODE_ADD_LIQUIDITY);
        let position_key = built.auxiliary_signers[0].pubkey();
        assert_eq!(built.instructions[0].accounts[0].pubkey, position_key);
    }

    #[test]
    fn build_decrease_full_close_appends_a_close_instruction() {
        let position = Position {
            id: Pubkey::new_unique().to_string(),
            owner: Pubkey::new_unique().to_string(),
            venue: VenueTag::Dlmm,
            pool: String::new(),
            lower_index: 4950,
            upper_index: 5050,
            lower_price: 0.0,
            upper_price: 0.0,
            liquidity: 100,
            deposited_a: 0,
            deposited_b: 0,
            fees_a: 0,
            fees_b: 0,
            in_range: true,
        };
        let instructions = adapter().build_decrease(&position, 10_000, true).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[1].data[0], OPCODE_CLOSE_POSITION);
    }

    #[test]
    fn build_decrease_partial_does_not_close() {
        let position = Position {
            id: Pubkey::new_unique().to_string(),
            owner: Pubkey::new_unique().to_string(),
            venue: VenueTag::Dlmm,
            pool: String::new(),
            lower_index: 4950,
            upper_index: 5050,
            lower_price: 0.0,
            upper_price: 0.0,
            liquidity: 100,
            deposited_a: 0,
            deposited_b: 0,
            fees_a: 0,
            fees_b: 0,
            in_range: true,
        };
        let instructions = adapter().build_decrease(&position, 5_000, true).unwrap();
        assert_eq!(instructions.len(), 1);
    }
}
