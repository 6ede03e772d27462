//! Orca Whirlpools adapter.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::str::FromStr;

use crate::error::{EngineError, Result};
use crate::model::pool::{Granularity, TokenSide};
use crate::model::{DistributionShape, Pool, Position, RangeShape, VenueTag};

use super::math::{amounts_from_liquidity_tick, tick_to_price, tick_to_sqrt_price, snap_tick_range};
use super::{
    BuiltInstructions, InputAmounts, LiquidityQuote, VenueAdapter, validate_custom_range,
};

/// Orca Whirlpools program id on mainnet.
pub const PROGRAM_ID: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";

pub struct WhirlpoolAdapter {
    rpc: RpcClient,
    program_id: Pubkey,
}

impl WhirlpoolAdapter {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url),
            program_id: Pubkey::from_str(PROGRAM_ID).expect("valid Whirlpool program id"),
        }
    }
}

#[async_trait]
impl VenueAdapter for WhirlpoolAdapter {
    fn tag(&self) -> VenueTag {
        VenueTag::Whirlpool
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
                "{pool_address} is not owned by the Whirlpool program"
            )));
        }

        decode_whirlpool(pool_address, &account.data)
    }

    fn compute_range(
        &self,
        pool: &Pool,
        shape: RangeShape,
        custom_lower: Option<i32>,
        custom_upper: Option<i32>,
    ) -> Result<(i32, i32)> {
        let Granularity::TickSpacing(spacing) = pool.granularity else {
            return Err(EngineError::Internal("pool is not a Whirlpool pool".into()));
        };

        match shape {
            RangeShape::Concentrated => Ok(snap_tick_range(pool.current_index, 5, spacing as i32)),
            RangeShape::Wide => Ok(snap_tick_range(pool.current_index, 20, spacing as i32)),
            RangeShape::Custom => {
                let lower = custom_lower
                    .ok_or_else(|| EngineError::Validation("custom_lower required".into()))?;
                let upper = custom_upper
                    .ok_or_else(|| EngineError::Validation("custom_upper required".into()))?;
                validate_custom_range(lower, upper, spacing as i32)?;
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
        let (lower, upper) = range;
        let sqrt_current = tick_to_sqrt_price(pool.current_index);
        let sqrt_lower = tick_to_sqrt_price(lower);
        let sqrt_upper = tick_to_sqrt_price(upper);

        let (unit_a, unit_b) = amounts_from_liquidity_tick(1.0, sqrt_current, sqrt_lower, sqrt_upper);
        let price = tick_to_price(pool.current_index);

        let value_per_unit_l = unit_a * price + unit_b;
        let offered_value = inputs.amount_a as f64 * price + inputs.amount_b as f64;
        let liquidity = if value_per_unit_l > 0.0 {
            offered_value / value_per_unit_l
        } else {
            0.0
        };

        let (expected_a, expected_b) =
            amounts_from_liquidity_tick(liquidity, sqrt_current, sqrt_lower, sqrt_upper);

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
        // Whirlpools positions are NFT-gated: mint a fresh position NFT and
        // derive the position PDA from it.
        let position_mint = Keypair::new();
        let (lower, upper) = range;
        let _distribution = distribution.unwrap_or(DistributionShape::Spot);

        let pool_address = Pubkey::from_str(&pool.address)
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        let mut open_data = vec![OPCODE_OPEN_POSITION];
        open_data.extend_from_slice(&lower.to_le_bytes());
        open_data.extend_from_slice(&upper.to_le_bytes());

        let open_position = Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(position_mint.pubkey(), true),
                AccountMeta::new(pool_address, false),
                AccountMeta::new(*owner, true),
            ],
            data: open_data,
        };

        let mut increase_data = vec![OPCODE_INCREASE_LIQUIDITY];
        increase_data.extend_from_slice(&inputs.amount_a.to_le_bytes());
        increase_data.extend_from_slice(&inputs.amount_b.to_le_bytes());

        let increase_liquidity = Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(position_mint.pubkey(), false),
                AccountMeta::new(pool_address, false),
                AccountMeta::new(*owner, true),
            ],
            data: increase_data,
        };

        Ok(BuiltInstructions {
            instructions: vec![open_position, increase_liquidity],
            auxiliary_signers: vec![position_mint],
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

        let mut data = vec![OPCODE_DECREASE_LIQUIDITY];
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
                data: vec![OPCODE_COLLECT_FEES],
            },
        ])
    }

    async fn enumerate_positions(&self, wallet: &Pubkey) -> Result<Vec<Position>> {
        // Whirlpools positions are NFT-gated: enumerate the wallet's token
        // accounts and match mints against the position PDA seed.
        use solana_client::rpc_request::TokenAccountsFilter;

        let token_accounts = self
            .rpc
            .get_token_accounts_by_owner(wallet, TokenAccountsFilter::ProgramId(spl_token::id()))
            .await
            .map_err(|e| EngineError::VenueUnavailable(e.to_string()))?;

        let mut positions = Vec::new();
        for account in token_accounts {
            let Ok(position_address) = Pubkey::from_str(&account.pubkey) else {
                continue;
            };
            if let Ok(Some(position_account)) = self
                .rpc
                .get_account_with_commitment(&position_address, self.rpc.commitment())
                .await
                .map(|r| r.value)
            {
                if position_account.owner == self.program_id {
                    positions.push(decode_position(&account.pubkey, wallet, &position_account.data)?);
                }
            }
        }
        Ok(positions)
    }
}

const OPCODE_OPEN_POSITION: u8 = 1;
const OPCODE_INCREASE_LIQUIDITY: u8 = 2;
const OPCODE_DECREASE_LIQUIDITY: u8 = 3;
const OPCODE_CLOSE_POSITION: u8 = 4;
const OPCODE_COLLECT_FEES: u8 = 5;
const OPCODE_UPDATE_FEES_AND_REWARDS: u8 = 6;

fn decode_whirlpool(address: &str, data: &[u8]) -> Result<Pool> {
    if data.len() < 64 {
        return Err(EngineError::Internal(
            "whirlpool account too small to decode".into(),
        ));
    }
    let tick_current = i32::from_le_bytes(data[8..12].try_into().unwrap());
    let tick_spacing = u16::from_le_bytes(data[12..14].try_into().unwrap());

    Ok(Pool {
        address: address.to_string(),
        venue: VenueTag::Whirlpool,
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
        price: tick_to_price(tick_current),
        granularity: Granularity::TickSpacing(tick_spacing),
        tvl_usd: 0.0,
        volume_24h_usd: 0.0,
        fee_bps: tick_spacing,
        risk_score: 1,
        current_index: tick_current,
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
        venue: VenueTag::Whirlpool,
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
            venue: VenueTag::Whirlpool,
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
            granularity: Granularity::TickSpacing(64),
            tvl_usd: 1_000_000.0,
            volume_24h_usd: 50_000.0,
            fee_bps: 30,
            risk_score: 2,
            current_index: 6400,
        }
    }

    fn adapter() -> WhirlpoolAdapter {
        WhirlpoolAdapter::new("http://localhost:8899".into())
    }

    #[test]
    fn compute_range_concentrated_snaps_to_the_tick_spacing_grid() {
        let (lower, upper) = adapter()
            .compute_range(&sample_pool(), RangeShape::Concentrated, None, None)
            .unwrap();
        assert_eq!(lower % 64, 0);
        assert_eq!(upper % 64, 0);
        assert!(lower < 6400 && upper > 6400);
    }

    #[test]
    fn compute_range_custom_rejects_a_crossed_range() {
        let err = adapter()
            .compute_range(&sample_pool(), RangeShape::Custom, Some(6400), Some(6400))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn compute_range_rejects_a_pool_with_bin_granularity() {
        let mut pool = sample_pool();
        pool.granularity = Granularity::BinStep(10);
        let err = adapter()
            .compute_range(&pool, RangeShape::Concentrated, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }

    #[test]
    fn quote_liquidity_splits_across_both_sides_inside_the_range() {
        let pool = sample_pool();
        let range = (6400 - 5 * 64, 6400 + 5 * 64);
        let inputs = InputAmounts {
            amount_a: 1_000_000_000,
            amount_b: 1_000_000,
        };
        let quote = adapter().quote_liquidity(&pool, range, inputs, 50).unwrap();
        assert!(quote.liquidity > 0);
        assert!(quote.expected_a > 0);
        assert!(quote.expected_b > 0);
        assert!(quote.worst_case_a <= quote.expected_a);
        assert!(quote.worst_case_b <= quote.expected_b);
    }

    #[test]
    fn build_open_mints_a_position_nft_as_its_auxiliary_signer() {
        let pool = sample_pool();
        let owner = Pubkey::new_unique();
        let inputs = InputAmounts {
            amount_a: 1_000_000_000,
            amount_b: 1_000_000,
        };
        let built = adapter()
            .build_open(&pool, (6080, 6720), inputs, &owner, None)
            .unwrap();
        assert_eq!(built.instructions.len(), 2);
        assert_eq!(built.auxiliary_signers.len(), 1);
        let mint = built.auxiliary_signers[0].pubkey();
        assert_eq!(built.instructions[0].accounts[0].pubkey, mint);
        assert_eq!(built.instructions[0].data[0], OPCODE_OPEN_POSITION);
        assert_eq!(built.instructions[1].data[0], OPCODE_INCREASE_LIQUIDITY);
    }

    fn sample_position() -> Position {
        Position {
            id: Pubkey::new_unique().to_string(),
            owner: Pubkey::new_unique().to_string(),
            venue: VenueTag::Whirlpool,
            pool: String::new(),
            lower_index: 6080,
            upper_index: 6720,
            lower_price: 0.0,
            upper_price: 0.0,
            liquidity: 100,
            deposited_a: 0,
            deposited_b: 0,
            fees_a: 0,
            fees_b: 0,
            in_range: true,
        }
    }

    #[test]
    fn build_decrease_full_bps_with_close_flag_closes_the_position() {
        let instructions = adapter()
            .build_decrease(&sample_position(), 10_000, true)
            .unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[1].data[0], OPCODE_CLOSE_POSITION);
    }

    #[test]
    fn build_decrease_without_the_close_flag_never_closes() {
        let instructions = adapter()
            .build_decrease(&sample_position(), 10_000, false)
            .unwrap();
        assert_eq!(instructions.len(), 1);
    }

    #[test]
    fn build_collect_fees_targets_the_position_and_owner_accounts() {
        let position = sample_position();
        let instructions = adapter().build_collect_fees(&position).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].data[0], OPCODE_UPDATE_FEES_AND_REWARDS);
        assert_eq!(instructions[1].data[0], OPCODE_COLLECT_FEES);
        assert_eq!(
            instructions[0].accounts[0].pubkey.to_string(),
            position.id
        );
    }
}
