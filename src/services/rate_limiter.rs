//! Sliding-window rate limiting for authentication endpoints
//!
//! - Failed logins per email (5 per 15 minutes)
//! - Sign-in code requests per email (3 per 15 minutes)
//! - Wrong sign-in code exchanges per email (5 per 15 minutes)
//! - Auth requests per IP address (10 per minute)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Attempts within a trailing window, per key
pub struct SlidingWindow<K> {
    max_attempts: usize,
    window: Duration,
    attempts: Arc<RwLock<HashMap<K, Vec<DateTime<Utc>>>>>,
}

impl<K: Eq + Hash + Clone> SlidingWindow<K> {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// True once `max_attempts` were recorded inside the window
    pub async fn is_limited(&self, key: &K) -> bool {
        let mut attempts = self.attempts.write().await;
        let cutoff = Utc::now() - self.window;
        match attempts.get_mut(key) {
            Some(times) => {
                times.retain(|time| *time > cutoff);
                times.len() >= self.max_attempts
            }
            None => false,
        }
    }

    pub async fn record(&self, key: K) {
        let mut attempts = self.attempts.write().await;
        attempts.entry(key).or_default().push(Utc::now());
    }

    pub async fn clear(&self, key: &K) {
        self.attempts.write().await.remove(key);
    }

    /// Drop expired timestamps and empty keys
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.window;
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
    }

    pub async fn tracked_keys(&self) -> usize {
        self.attempts.read().await.len()
    }
}

/// Limits shared by the login, register and code endpoints.
/// Email keys are compared case-insensitively.
pub struct LoginRateLimiter {
    failed_logins: SlidingWindow<String>,
    code_requests: SlidingWindow<String>,
    failed_codes: SlidingWindow<String>,
    ip_requests: SlidingWindow<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            failed_logins: SlidingWindow::new(5, Duration::minutes(15)),
            code_requests: SlidingWindow::new(3, Duration::minutes(15)),
            failed_codes: SlidingWindow::new(5, Duration::minutes(15)),
            ip_requests: SlidingWindow::new(10, Duration::minutes(1)),
        }
    }

    pub async fn is_email_limited(&self, email: &str) -> bool {
        self.failed_logins.is_limited(&normalize(email)).await
    }

    pub async fn record_failed_attempt(&self, email: &str) {
        self.failed_logins.record(normalize(email)).await;
    }

    /// Clear failed attempts (on successful login)
    pub async fn clear_email_attempts(&self, email: &str) {
        self.failed_logins.clear(&normalize(email)).await;
    }

    pub async fn is_code_request_limited(&self, email: &str) -> bool {
        self.code_requests.is_limited(&normalize(email)).await
    }

    pub async fn record_code_request(&self, email: &str) {
        self.code_requests.record(normalize(email)).await;
    }

    pub async fn is_code_exchange_limited(&self, email: &str) -> bool {
        self.failed_codes.is_limited(&normalize(email)).await
    }

    pub async fn record_failed_code(&self, email: &str) {
        self.failed_codes.record(normalize(email)).await;
    }

    pub async fn clear_failed_codes(&self, email: &str) {
        self.failed_codes.clear(&normalize(email)).await;
    }

    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        self.ip_requests.is_limited(&ip).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.ip_requests.record(ip).await;
    }

    /// Clean up old entries (called periodically from main)
    pub async fn cleanup(&self) {
        self.failed_logins.cleanup().await;
        self.code_requests.cleanup().await;
        self.failed_codes.cleanup().await;
        self.ip_requests.cleanup().await;
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_email_rate_limit() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..4 {
            assert!(!limiter.is_email_limited("ana@example.com").await);
            limiter.record_failed_attempt("ana@example.com").await;
        }

        limiter.record_failed_attempt("ana@example.com").await;
        assert!(limiter.is_email_limited("ana@example.com").await);

        limiter.clear_email_attempts("ana@example.com").await;
        assert!(!limiter.is_email_limited("ana@example.com").await);
    }

    #[tokio::test]
    async fn test_code_exchange_limit_is_separate_from_login() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..5 {
            assert!(!limiter.is_code_exchange_limited("ana@example.com").await);
            limiter.record_failed_code("Ana@example.com").await;
        }
        assert!(limiter.is_code_exchange_limited("ana@example.com").await);
        assert!(!limiter.is_email_limited("ana@example.com").await);
        assert!(!limiter.is_code_exchange_limited("bo@example.com").await);

        limiter.clear_failed_codes("ana@example.com").await;
        assert!(!limiter.is_code_exchange_limited("ana@example.com").await);
    }

    #[tokio::test]
    async fn test_ip_rate_limit() {
        let limiter = LoginRateLimiter::new();
        let ip = IpAddr::from_str("127.0.0.1").unwrap();

        for _ in 0..9 {
            assert!(!limiter.is_ip_limited(ip).await);
            limiter.record_ip_request(ip).await;
        }

        limiter.record_ip_request(ip).await;
        assert!(limiter.is_ip_limited(ip).await);
    }

    #[tokio::test]
    async fn test_email_keys_are_case_insensitive() {
        let limiter = LoginRateLimiter::new();

        limiter.record_code_request("Ana@Example.com").await;
        limiter.record_code_request(" ana@example.com").await;
        assert!(!limiter.is_code_request_limited("ana@example.com").await);

        limiter.record_code_request("ANA@EXAMPLE.COM").await;
        assert!(limiter.is_code_request_limited("ana@example.com").await);
    }

    #[tokio::test]
    async fn test_window_expiry_and_cleanup() {
        let window: SlidingWindow<&str> = SlidingWindow::new(1, Duration::milliseconds(20));
        window.record("k").await;
        assert!(window.is_limited(&"k").await);

        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        assert!(!window.is_limited(&"k").await);

        window.cleanup().await;
        assert_eq!(window.tracked_keys().await, 0);
    }
}
