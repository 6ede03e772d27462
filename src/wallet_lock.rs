//! Per-wallet advisory operation lock: serializes LP-mutating intents
//! (open, withdraw, rebalance, claim) so two concurrent requests on the
//! same wallet are never both inside the submission driver at once. The
//! lock is in-process only; a second request on a locked wallet fails
//! fast with `WALLET_BUSY` instead of queueing.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{EngineError, Result};

#[derive(Clone, Default)]
pub struct WalletLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

pub struct WalletGuard {
    _permit: tokio::sync::OwnedMutexGuard<()>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to acquire the lock for `wallet` without waiting; returns
    /// `WALLET_BUSY` if another intent already holds it.
    pub async fn try_acquire(&self, wallet: &str) -> Result<WalletGuard> {
        let entry = {
            let mut locks = self.locks.lock().await;
            locks.entry(wallet.to_string()).or_default().clone()
        };

        match entry.try_lock_owned() {
            Ok(permit) => Ok(WalletGuard { _permit: permit }),
            Err(_) => Err(EngineError::WalletBusy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_concurrent_acquire_fails_fast() {
        let locks = WalletLocks::new();
        let _guard = locks.try_acquire("wallet-a").await.unwrap();
        let second = locks.try_acquire("wallet-a").await;
        assert!(matches!(second, Err(EngineError::WalletBusy)));
    }

    #[tokio::test]
    async fn different_wallets_do_not_contend() {
        let locks = WalletLocks::new();
        let _a = locks.try_acquire("wallet-a").await.unwrap();
        let b = locks.try_acquire("wallet-b").await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn lock_is_released_on_drop() {
        let locks = WalletLocks::new();
        {
            let _guard = locks.try_acquire("wallet-a").await.unwrap();
        }
        let again = locks.try_acquire("wallet-a").await;
        assert!(again.is_ok());
    }
}
