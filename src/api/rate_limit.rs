use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

const MAX_REQUESTS: usize = 10;
const WINDOW: Duration = Duration::from_secs(60);

pub struct RateLimiter {
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Returns Ok(()) if allowed, Err with seconds until next slot if rate limited.
    pub async fn check(&self, user_id: &str) -> Result<(), u64> {
        let mut map = self.requests.lock().await;
        let now = Instant::now();
        let entry = map.entry(user_id.to_string()).or_default();

        // Evict expired entries
        while entry.front().is_some_and(|t| now.duration_since(*t) > WINDOW) {
            entry.pop_front();
        }

        if entry.len() >= MAX_REQUESTS {
            let oldest = entry.front().unwrap();
            let retry_after = WINDOW.as_secs() - now.duration_since(*oldest).as_secs();
            return Err(retry_after.max(1));
        }

        entry.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_request_cap() {
        let limiter = RateLimiter::new();
        for _ in 0..MAX_REQUESTS {
            assert!(limiter.check("user-a").await.is_ok());
        }
        assert!(limiter.check("user-a").await.is_err());
    }

    #[tokio::test]
    async fn different_users_have_independent_windows() {
        let limiter = RateLimiter::new();
        for _ in 0..MAX_REQUESTS {
            limiter.check("user-a").await.unwrap();
        }
        assert!(limiter.check("user-a").await.is_err());
        assert!(limiter.check("user-b").await.is_ok());
    }

    #[tokio::test]
    async fn rate_limited_error_reports_a_positive_retry_after() {
        let limiter = RateLimiter::new();
        for _ in 0..MAX_REQUESTS {
            limiter.check("user-a").await.unwrap();
        }
        let retry_after = limiter.check("user-a").await.unwrap_err();
        assert!(retry_after >= 1 && retry_after <= WINDOW.as_secs());
    }
}
