//! The grid source capability and its factory.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use kma_common::{format_tm, GridCell, Variable};
use reqwest::Client;

use crate::apihub::ApiHubSource;
use crate::client::build_http_client;
use crate::config::{FetcherConfig, SourceKind};
use crate::error::Result;
use crate::portal::DataPortalSource;

/// One scalar the aggregator needs: a variable at a cell for one hour of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleRequest {
    pub variable: Variable,
    /// Forecast run (`tmfc`)
    pub base_time: NaiveDateTime,
    /// Valid time (`tmef`)
    pub effective_time: NaiveDateTime,
    pub cell: GridCell,
}

impl SampleRequest {
    pub fn new(
        variable: Variable,
        base_time: NaiveDateTime,
        effective_time: NaiveDateTime,
        cell: GridCell,
    ) -> Self {
        Self {
            variable,
            base_time,
            effective_time,
            cell,
        }
    }

    /// Short description used in errors and logs. Never carries the key.
    pub fn describe(&self) -> String {
        format!(
            "{} tmfc={} tmef={} cell={}",
            self.variable,
            format_tm(self.base_time),
            format_tm(self.effective_time),
            self.cell
        )
    }
}

/// A provider that can return the raw value for one sample.
///
/// One call is one attempt; retrying is the caller's job.
#[async_trait]
pub trait GridSource: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Fetch the raw (not yet normalized) value for a sample.
    async fn fetch_value(&self, request: &SampleRequest) -> Result<f64>;
}

/// Create the source selected by configuration, sharing `client`.
pub fn create_source_with_client(config: &FetcherConfig, client: Client) -> Arc<dyn GridSource> {
    match config.source {
        SourceKind::ApiHub => Arc::new(ApiHubSource::new(
            client,
            config.url().to_string(),
            config.credential.clone(),
        )),
        SourceKind::DataPortal => Arc::new(DataPortalSource::new(
            client,
            config.url().to_string(),
            config.credential.clone(),
        )),
    }
}

/// Create the source selected by configuration with its own pooled client.
pub fn create_source(config: &FetcherConfig) -> Result<Arc<dyn GridSource>> {
    let client = build_http_client(&config.http)?;
    Ok(create_source_with_client(config, client))
}
