use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// LP execution and orchestration engine for Meteora DLMM, Orca
/// Whirlpools, and Raydium CLMM.
#[derive(Parser)]
#[command(name = "lp-engine", version, about)]
pub struct Cli {
    /// Override the Solana RPC endpoint (falls back to ENGINE_RPC_URL, then a
    /// mainnet-beta default).
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Redis connection URL; omit to use the in-memory store (ENGINE_REDIS_URL).
    #[arg(long, global = true)]
    pub store_url: Option<String>,

    /// Log every external effect instead of performing it: no signatures,
    /// no submissions, no real quotes.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API that exposes endpoints over the engine.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,

        /// Directory holding the operator auth database.
        #[arg(long, default_value = "~/.lp-engine")]
        data_dir: PathBuf,
    },

    /// Fetch and rank pools across every configured venue, print the top
    /// candidates, then exit.
    ScanPools {
        /// Base mint to rank pairs against.
        #[arg(long)]
        mint: String,

        /// Number of pools to print.
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Run the scheduler loop: periodic drift checks, rebalances, and DCA
    /// ticks against tracked wallets, without the HTTP API.
    Monitor {
        /// Seconds between scheduler ticks.
        #[arg(long, default_value = "60")]
        interval_secs: u64,
    },

    /// Exercise every collaborator (store, oracle, pool aggregator, RPC)
    /// once and report which are reachable, without submitting anything.
    SelfTest,
}
