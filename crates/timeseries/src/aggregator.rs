//! Bounded concurrent assembly of a time series.
//!
//! Every (effective time, variable) pair is an independent task. Tasks are
//! spawned up front and gated by a semaphore, so at most `max_concurrent`
//! requests are in flight. Each task writes into the pre-allocated record for
//! its hour under that hour's own lock. Completions are counted by the single
//! loop that joins the tasks, so progress only ever increases. Output order
//! comes from the slots, never from completion order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use grid_fetcher::{GridFetcher, SampleRequest};
use kma_common::{format_tm, ForecastWindow, GridCell, Variable};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::series::{HourRecord, SeriesError, TimeSeries};

/// Upper bound on concurrent provider requests.
pub const MAX_CONCURRENT: usize = 4;

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Worker pool size, `1..=MAX_CONCURRENT`
    pub max_concurrent: usize,
    /// Report progress every this many completions
    pub progress_every: usize,
    /// Optional deadline for a whole series
    pub batch_timeout: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_CONCURRENT,
            progress_every: 5,
            batch_timeout: None,
        }
    }
}

impl AggregatorConfig {
    pub fn validate(&self) -> Result<(), SeriesError> {
        if self.max_concurrent == 0 || self.max_concurrent > MAX_CONCURRENT {
            return Err(SeriesError::InvalidConfig(format!(
                "max_concurrent must be between 1 and {}, got {}",
                MAX_CONCURRENT, self.max_concurrent
            )));
        }
        if self.progress_every == 0 {
            return Err(SeriesError::InvalidConfig(
                "progress_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Completed and total task counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Receives progress updates. Must return quickly.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

/// Builds time series through a shared [`GridFetcher`].
#[derive(Debug, Clone)]
pub struct SeriesAggregator {
    fetcher: GridFetcher,
    config: AggregatorConfig,
}

impl SeriesAggregator {
    pub fn new(fetcher: GridFetcher, config: AggregatorConfig) -> Result<Self, SeriesError> {
        config.validate()?;
        Ok(Self { fetcher, config })
    }

    /// Fetch every variable for every hour of `window` at `cell`.
    ///
    /// Always returns one record per effective time; failed samples are
    /// absent.
    pub async fn build_series(
        &self,
        cell: GridCell,
        window: &ForecastWindow,
        variables: &[Variable],
        progress: Option<&dyn ProgressSink>,
    ) -> TimeSeries {
        self.build_series_with_cancel(cell, window, variables, progress, CancellationToken::new())
            .await
    }

    /// Like [`build_series`](Self::build_series), but stops early when
    /// `cancel` fires or the batch deadline passes. Samples not fetched by
    /// then are absent.
    #[instrument(skip_all, fields(cell = %cell, base = %format_tm(window.base_time())))]
    pub async fn build_series_with_cancel(
        &self,
        cell: GridCell,
        window: &ForecastWindow,
        variables: &[Variable],
        progress: Option<&dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> TimeSeries {
        let started = Instant::now();
        let base_time = window.base_time();
        let cancel = cancel.child_token();

        let deadline = self.config.batch_timeout.map(|timeout| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!(timeout_secs = timeout.as_secs_f64(), "Batch deadline reached, cancelling");
                cancel.cancel();
            })
        });

        let slots: Vec<Arc<Mutex<HourRecord>>> = window
            .effective_times()
            .iter()
            .map(|t| Arc::new(Mutex::new(HourRecord::new(*t, variables))))
            .collect();

        let total = slots.len() * variables.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));

        info!(
            hours = slots.len(),
            variables = variables.len(),
            tasks = total,
            workers = self.config.max_concurrent,
            "Building series"
        );

        let mut tasks = FuturesUnordered::new();
        for (slot, effective_time) in slots.iter().zip(window.effective_times()) {
            for variable in variables {
                let request = SampleRequest::new(*variable, base_time, *effective_time, cell);
                let slot = slot.clone();
                let fetcher = self.fetcher.clone();
                let semaphore = semaphore.clone();
                let cancel = cancel.clone();

                tasks.push(tokio::spawn(run_task(request, slot, fetcher, semaphore, cancel)));
            }
        }

        let mut done = 0;
        while let Some(joined) = tasks.next().await {
            done += 1;
            if let Err(e) = joined {
                warn!(error = %e, "Series task failed to complete");
            }

            if let Some(sink) = progress {
                if done % self.config.progress_every == 0 || done == total {
                    sink.on_progress(Progress {
                        completed: done,
                        total,
                    });
                }
            }
        }

        if let Some(handle) = deadline {
            handle.abort();
        }

        let mut records = Vec::with_capacity(slots.len());
        for slot in &slots {
            records.push(slot.lock().await.clone());
        }
        let series = TimeSeries::new(cell, base_time, records);

        let coverage = series.coverage();
        info!(
            present = coverage.present,
            requested = coverage.requested,
            complete = coverage.is_complete(),
            cancelled = cancel.is_cancelled(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Series complete"
        );
        series
    }
}

async fn run_task(
    request: SampleRequest,
    slot: Arc<Mutex<HourRecord>>,
    fetcher: GridFetcher,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) {
    let _permit = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(request = %request.describe(), "Skipped, batch cancelled");
            return;
        }
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return,
        },
    };

    let raw = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(request = %request.describe(), "Dropped in-flight fetch, batch cancelled");
            return;
        }
        raw = fetcher.fetch_sample(&request) => raw,
    };

    let value = raw.and_then(|v| request.variable.normalize(v));
    if raw.is_some() && value.is_none() {
        debug!(request = %request.describe(), raw = ?raw, "Missing-value sentinel");
    }

    slot.lock().await.set(request.variable, value);
}
