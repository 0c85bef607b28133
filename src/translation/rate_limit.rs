/*!
 * Provider-wide request budget.
 *
 * One `RateLimiter` is built per provider for a batch and shared by every
 * document job, so the requests-per-minute budget and the concurrent-call
 * cap hold for the whole batch and not per document.
 */

use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::app_config::ProviderKind;
use crate::errors::ProviderError;

/// Provider-specific concurrency profile with tuned defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Maximum concurrent requests
    pub max_concurrent_requests: usize,
    /// Target requests per minute (for rate limiting)
    pub target_rpm: Option<u32>,
}

impl ProviderProfile {
    /// Get the default profile for a given provider
    pub fn for_provider(provider: ProviderKind) -> Self {
        match provider {
            ProviderKind::OpenAI => Self {
                max_concurrent_requests: 10,
                target_rpm: Some(60),
            },
            ProviderKind::Anthropic => Self {
                // Lower rate limits but larger context
                max_concurrent_requests: 5,
                target_rpm: Some(45),
            },
            ProviderKind::Google => Self {
                max_concurrent_requests: 8,
                target_rpm: Some(300),
            },
            ProviderKind::Mock => Self {
                max_concurrent_requests: 4,
                target_rpm: None,
            },
        }
    }

    /// Apply user overrides from the provider configuration
    pub fn with_overrides(self, concurrent_requests: Option<usize>, rpm: Option<u32>) -> Self {
        Self {
            max_concurrent_requests: concurrent_requests.filter(|c| *c > 0).unwrap_or(self.max_concurrent_requests),
            target_rpm: rpm.filter(|r| *r > 0).or(self.target_rpm),
        }
    }
}

/// Held for the duration of one provider call
#[derive(Debug)]
pub struct RateLimitPermit {
    _permit: OwnedSemaphorePermit,
}

/// Shared limiter for one provider
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    min_interval: Option<Duration>,
    next_slot: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    pub fn new(profile: &ProviderProfile) -> Self {
        let min_interval = profile
            .target_rpm
            .map(|rpm| Duration::from_millis(60_000 / u64::from(rpm.max(1))));

        Self {
            semaphore: Arc::new(Semaphore::new(profile.max_concurrent_requests.max(1))),
            min_interval,
            next_slot: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Limiter without a request-rate budget
    pub fn unlimited(max_concurrent: usize) -> Self {
        Self::new(&ProviderProfile {
            max_concurrent_requests: max_concurrent,
            target_rpm: None,
        })
    }

    pub fn min_interval(&self) -> Option<Duration> {
        self.min_interval
    }

    /// Wait for a free call slot and for the next request time
    pub async fn acquire(&self) -> Result<RateLimitPermit, ProviderError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ProviderError::Transient(format!("Rate limiter closed: {}", e)))?;

        if let Some(interval) = self.min_interval {
            let wait_until = {
                let mut next_slot = self.next_slot.lock().await;
                let now = Instant::now();
                let slot = if *next_slot > now { *next_slot } else { now };
                *next_slot = slot + interval;
                slot
            };

            if wait_until > Instant::now() {
                debug!("Rate limit: waiting {:?} before next request", wait_until - Instant::now());
                tokio::time::sleep_until(wait_until).await;
            }
        }

        Ok(RateLimitPermit { _permit: permit })
    }

    /// Free call slots right now
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
