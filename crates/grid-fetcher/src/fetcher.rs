//! Retrying front end over a [`GridSource`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::FetcherConfig;
use crate::error::{FetchError, Result};
use crate::retry::RetryPolicy;
use crate::source::{create_source, GridSource, SampleRequest};

/// Fetches samples through a shared source, retrying transient failures.
///
/// Cheap to clone; clones share the source and its HTTP client.
#[derive(Clone)]
pub struct GridFetcher {
    source: Arc<dyn GridSource>,
    retry: RetryPolicy,
}

impl GridFetcher {
    pub fn new(source: Arc<dyn GridSource>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Build the configured source and wrap it with the configured policy.
    pub fn from_config(config: &FetcherConfig) -> Result<Self> {
        Ok(Self::new(create_source(config)?, config.retry))
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetch a raw value, retrying transient errors with a fixed delay.
    pub async fn fetch_with_retry(&self, request: &SampleRequest) -> Result<f64> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.source.fetch_value(request).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(request = %request.describe(), attempt, "Fetch succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    if attempt >= max_attempts {
                        return Err(FetchError::RetriesExhausted {
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }

                    debug!(
                        request = %request.describe(),
                        error = %e,
                        attempt,
                        max_attempts,
                        "Fetch failed, retrying"
                    );

                    if !self.retry.delay.is_zero() {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }
    }

    /// Fetch a raw value, or `None` once every attempt has failed.
    pub async fn fetch_sample(&self, request: &SampleRequest) -> Option<f64> {
        match self.fetch_with_retry(request).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    request = %request.describe(),
                    error = %e,
                    "Sample unavailable"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for GridFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridFetcher")
            .field("source", &self.source.name())
            .field("retry", &self.retry)
            .finish()
    }
}
