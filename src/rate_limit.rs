use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Per-domain minimum-interval throttle shared across all scraping calls.
///
/// State lives for the process; one instance is constructed at startup and
/// injected into the scraper. The map lock is never held across the sleep,
/// so waiting on one domain does not stall requests to another. Scraping is
/// sequential, so each domain has a single logical writer; concurrent
/// scrapers would need a per-domain lock around the read-then-write here.
pub struct DomainRateLimiter {
    last_request: Mutex<HashMap<String, Instant>>,
    interval: Duration,
}

impl DomainRateLimiter {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(HashMap::new()),
            interval,
        }
    }

    /// Suspend until at least the configured interval has elapsed since the
    /// last permitted request to `domain`, then record the new request time.
    pub async fn wait_for_domain(&self, domain: &str) {
        let wait = {
            let last_request = self.last_request.lock().await;
            last_request.get(domain).and_then(|last| {
                self.interval.checked_sub(last.elapsed())
            })
        };

        if let Some(wait) = wait {
            debug!("Rate limiting {} for {:?}", domain, wait);
            tokio::time::sleep(wait).await;
        }

        self.last_request
            .lock()
            .await
            .insert(domain.to_string(), Instant::now());
    }
}

impl Default for DomainRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let limiter = DomainRateLimiter::with_interval(Duration::from_millis(200));

        let start = Instant::now();
        limiter.wait_for_domain("example.com").await;

        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_second_request_same_domain_waits() {
        let limiter = DomainRateLimiter::with_interval(Duration::from_millis(100));

        limiter.wait_for_domain("example.com").await;
        let start = Instant::now();
        limiter.wait_for_domain("example.com").await;

        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_different_domains_do_not_wait_on_each_other() {
        let limiter = DomainRateLimiter::with_interval(Duration::from_millis(500));

        limiter.wait_for_domain("one.example.com").await;
        let start = Instant::now();
        limiter.wait_for_domain("two.example.com").await;

        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_elapsed_interval_does_not_wait() {
        let limiter = DomainRateLimiter::with_interval(Duration::from_millis(50));

        limiter.wait_for_domain("example.com").await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let start = Instant::now();
        limiter.wait_for_domain("example.com").await;
        assert!(start.elapsed() < Duration::from_millis(30));
    }
}
