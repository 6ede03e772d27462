//! Runtime configuration: CLI flags fall back to environment variables,
//! which fall back to defaults.

use anyhow::{Result, bail};

use crate::model::VenueTag;

/// Which store backend the engine persists to.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Memory,
    Redis { url: String },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rpc_url: String,
    pub store: StoreBackend,
    pub venues: Vec<VenueTag>,
    pub pool_endpoints: Vec<(VenueTag, String)>,
    pub oracle_primary_endpoint: String,
    pub oracle_secondary_endpoint: String,
    pub relay_endpoint: String,
    pub swap_router_endpoint: String,
    pub custody_endpoint: String,
    pub treasury_account: String,
    pub tip_account: String,
    pub protocol_fee_bps: u16,
    pub environment_secret_file: Option<String>,
    pub cluster_id: String,
    pub dry_run: bool,
}

impl EngineConfig {
    /// Resolution order: explicit CLI flag, then the matching env var,
    /// then the hardcoded default. `ENGINE_` is the env var prefix.
    pub fn from_env_and_cli(
        rpc_url: Option<String>,
        store_url: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let rpc_url = resolve(rpc_url, "ENGINE_RPC_URL", "https://api.mainnet-beta.solana.com");

        let store = match resolve_optional(store_url, "ENGINE_REDIS_URL") {
            Some(url) => StoreBackend::Redis { url },
            None => StoreBackend::Memory,
        };

        let venues = vec![VenueTag::Dlmm, VenueTag::Whirlpool, VenueTag::Clmm];

        let pool_endpoints = vec![
            (
                VenueTag::Dlmm,
                resolve(None, "ENGINE_DLMM_POOL_ENDPOINT", "https://dlmm-api.meteora.ag/pairs"),
            ),
            (
                VenueTag::Whirlpool,
                resolve(None, "ENGINE_WHIRLPOOL_POOL_ENDPOINT", "https://api.orca.so/v2/solana/pools"),
            ),
            (
                VenueTag::Clmm,
                resolve(None, "ENGINE_CLMM_POOL_ENDPOINT", "https://api.raydium.io/v2/ammV3/ammPools"),
            ),
        ];

        let oracle_primary_endpoint = resolve(None, "ENGINE_ORACLE_PRIMARY_ENDPOINT", "https://hermes.pyth.network/v2/price_feeds");
        let oracle_secondary_endpoint = resolve(None, "ENGINE_ORACLE_SECONDARY_ENDPOINT", "https://api.switchboard.xyz/feeds");
        let relay_endpoint = resolve(None, "ENGINE_RELAY_ENDPOINT", "https://mainnet.block-engine.jito.wtf");
        let swap_router_endpoint = resolve(None, "ENGINE_SWAP_ROUTER_ENDPOINT", "https://quote-api.jup.ag/v6");
        let custody_endpoint = resolve(None, "ENGINE_CUSTODY_ENDPOINT", "http://127.0.0.1:9000");

        let treasury_account = resolve_optional(None, "ENGINE_TREASURY_ACCOUNT")
            .ok_or_else(|| anyhow::anyhow!("ENGINE_TREASURY_ACCOUNT must be set"))?;
        let tip_account = resolve_optional(None, "ENGINE_TIP_ACCOUNT").unwrap_or_default();

        let protocol_fee_bps: u16 = resolve(None, "ENGINE_PROTOCOL_FEE_BPS", "100")
            .parse()
            .map_err(|_| anyhow::anyhow!("ENGINE_PROTOCOL_FEE_BPS must be an integer"))?;

        let environment_secret_file = resolve_optional(None, "ENGINE_ENVIRONMENT_SECRET_FILE");
        let cluster_id = resolve(None, "ENGINE_CLUSTER_ID", "mainnet-beta");

        if protocol_fee_bps > 10_000 {
            bail!("ENGINE_PROTOCOL_FEE_BPS out of range: {protocol_fee_bps}");
        }

        Ok(Self {
            rpc_url,
            store,
            venues,
            pool_endpoints,
            oracle_primary_endpoint,
            oracle_secondary_endpoint,
            relay_endpoint,
            swap_router_endpoint,
            custody_endpoint,
            treasury_account,
            tip_account,
            protocol_fee_bps,
            environment_secret_file,
            cluster_id,
            dry_run,
        })
    }
}

fn resolve(explicit: Option<String>, env_var: &str, default: &str) -> String {
    explicit
        .or_else(|| std::env::var(env_var).ok())
        .unwrap_or_else(|| default.to_string())
}

fn resolve_optional(explicit: Option<String>, env_var: &str) -> Option<String> {
    explicit.or_else(|| std::env::var(env_var).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_value_wins_over_env_and_default() {
        assert_eq!(resolve(Some("explicit".into()), "ENGINE_DOES_NOT_EXIST_XYZ", "default"), "explicit");
    }

    #[test]
    fn default_is_used_when_nothing_else_set() {
        assert_eq!(resolve(None, "ENGINE_DOES_NOT_EXIST_XYZ", "default"), "default");
    }
}
