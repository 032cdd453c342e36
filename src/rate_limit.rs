//! Per-service call spacing and bounded retry.
//!
//! Every outbound adapter call goes through [`RateLimiter::call`], which
//! enforces a minimum interval since the previous call to the same service,
//! retries once on `RateLimited`, and retries transport failures a bounded
//! number of times. There is no exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

use crate::config::ServiceSettings;
use crate::error::{MigrateError, Result};
use crate::models::ServiceKind;

/// Longest `Retry-After` we are willing to honour for a single retry.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Call gate for one service. Owned by a single run; not shared.
#[derive(Debug)]
pub struct RateLimiter {
    service: ServiceKind,
    min_interval: Duration,
    batch_size: usize,
    transport_retries: u32,
    last_call: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` calls and `batch_size` items per write.
    pub fn new(service: ServiceKind, requests_per_second: f64, batch_size: usize) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };

        Self {
            service,
            min_interval,
            batch_size: batch_size.max(1),
            transport_retries: 0,
            last_call: None,
        }
    }

    /// Create a limiter from configured settings.
    pub fn from_settings(
        service: ServiceKind,
        settings: &ServiceSettings,
        transport_retries: u32,
    ) -> Self {
        Self::new(service, settings.requests_per_second, settings.batch_size)
            .with_transport_retries(transport_retries)
    }

    /// Set how many times a transport failure is retried.
    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.transport_retries = retries;
        self
    }

    /// Minimum spacing between two calls.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Maximum items per write call.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Wait until the next call is allowed, then mark it as made.
    pub async fn wait_turn(&mut self) {
        if let Some(last) = self.last_call {
            let next = last + self.min_interval;
            if Instant::now() < next {
                sleep_until(next).await;
            }
        }
        self.last_call = Some(Instant::now());
    }

    /// Delay before retrying a rate-limited call.
    fn retry_delay(&self, retry_after: Option<Duration>) -> Duration {
        retry_after
            .map(|d| d.min(MAX_RETRY_AFTER))
            .unwrap_or(Duration::ZERO)
            .max(self.min_interval)
    }

    /// Run `op` under this limiter.
    ///
    /// A second `RateLimited` for the same call is returned to the caller,
    /// as is any transport failure once the retries are used up.
    pub async fn call<T, F, Fut>(&mut self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut rate_limited = false;
        let mut transport_attempts = 0u32;

        loop {
            self.wait_turn().await;

            match op().await {
                Ok(value) => return Ok(value),
                Err(MigrateError::RateLimited { retry_after }) if !rate_limited => {
                    rate_limited = true;
                    let delay = self.retry_delay(retry_after);
                    warn!("{} rate limited, retrying in {:?}", self.service, delay);
                    sleep(delay).await;
                }
                Err(e) if e.is_transport() && transport_attempts < self.transport_retries => {
                    transport_attempts += 1;
                    warn!(
                        "{} transport failure (attempt {}/{}): {}",
                        self.service, transport_attempts, self.transport_retries, e
                    );
                }
                Err(e) => {
                    debug!("{} call failed: {}", self.service, e);
                    return Err(e);
                }
            }
        }
    }
}
