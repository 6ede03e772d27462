//! The error taxonomy is organized by kind, not by origin. Every fallible
//! engine operation returns `Result<T>` with this enum; the API layer maps
//! it onto HTTP status + machine-readable code (see `api::error`).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("wallet busy: an operation is already in flight for this wallet")]
    WalletBusy,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("unsupported pool type: {0}")]
    UnsupportedPoolType(String),

    #[error("oracle unreliable for mint {0}")]
    OracleUnreliable(String),

    #[error("slippage exceeded at {bps} bps")]
    SlippageExceeded { bps: u32 },

    #[error("slippage escalation exhausted, last tried {last_bps} bps")]
    SlippageExhausted { last_bps: u32 },

    #[error("pool paused: {0}")]
    PoolPaused(String),

    #[error("venue unavailable: {0}")]
    VenueUnavailable(String),

    #[error("rpc unavailable: {0}")]
    RpcUnavailable(String),

    #[error("bundle dropped: {0}")]
    BundleDropped(String),

    #[error("bundle poll timed out after {0:?}")]
    BundleTimeout(std::time::Duration),

    #[error("signing refused: {0}")]
    SignRefused(String),

    #[error("unknown program error: {0}")]
    UnknownProgramError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Distinguishes which kinds the submission driver absorbs locally with
    /// bounded retry, versus surfacing to the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::VenueUnavailable(_)
                | EngineError::RpcUnavailable(_)
                | EngineError::BundleDropped(_)
                | EngineError::BundleTimeout(_)
        )
    }

    /// Short machine-readable code for the API envelope.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::WalletBusy => "WALLET_BUSY",
            EngineError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            EngineError::UnsupportedPoolType(_) => "UNSUPPORTED_POOL_TYPE",
            EngineError::OracleUnreliable(_) => "ORACLE_UNRELIABLE",
            EngineError::SlippageExceeded { .. } => "SLIPPAGE_EXCEEDED",
            EngineError::SlippageExhausted { .. } => "SLIPPAGE_EXHAUSTED",
            EngineError::PoolPaused(_) => "POOL_PAUSED",
            EngineError::VenueUnavailable(_) => "VENUE_UNAVAILABLE",
            EngineError::RpcUnavailable(_) => "RPC_UNAVAILABLE",
            EngineError::BundleDropped(_) => "BUNDLE_DROPPED",
            EngineError::BundleTimeout(_) => "BUNDLE_TIMEOUT",
            EngineError::SignRefused(_) => "SIGN_REFUSED",
            EngineError::UnknownProgramError(_) => "UNKNOWN_PROGRAM_ERROR",
            EngineError::Internal(_) => "INTERNAL",
        }
    }
}

#[cfg(feature = "full")]
impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            EngineError::VenueUnavailable(err.to_string())
        } else {
            EngineError::Internal(err.to_string())
        }
    }
}

#[cfg(feature = "full")]
impl From<redis::RedisError> for EngineError {
    fn from(err: redis::RedisError) -> Self {
        EngineError::Internal(format!("store: {err}"))
    }
}
