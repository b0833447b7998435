//! KMA APIHub flat-grid source.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use kma_common::{format_tm, GridSpec, Variable};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::Credential;
use crate::error::{FetchError, Result};
use crate::parser::{extract_cell, parse_flat_grid};
use crate::source::{GridSource, SampleRequest};

/// Fetches one whole grid per (variable, run, hour) and reads a cell from it.
pub struct ApiHubSource {
    client: Client,
    base_url: String,
    credential: Credential,
    grid: GridSpec,
}

impl ApiHubSource {
    pub fn new(client: Client, base_url: String, credential: Credential) -> Self {
        Self {
            client,
            base_url,
            credential,
            grid: GridSpec::kma(),
        }
    }

    /// Download and parse the full grid of `variable` for one hour.
    #[instrument(skip(self), fields(variable = %variable, tmfc = %format_tm(base_time), tmef = %format_tm(effective_time)))]
    pub async fn fetch_variable_grid(
        &self,
        variable: Variable,
        base_time: NaiveDateTime,
        effective_time: NaiveDateTime,
    ) -> Result<Vec<f64>> {
        let key = self.credential.get()?;
        let tmfc = format_tm(base_time);
        let tmef = format_tm(effective_time);
        let request = format!("{} tmfc={} tmef={}", variable, tmfc, tmef);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("tmfc", tmfc.as_str()),
                ("tmef", tmef.as_str()),
                ("vars", variable.code()),
                ("authKey", key),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Network {
                request: request.clone(),
                source: e.without_url(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus { request, status });
        }

        let text = response.text().await.map_err(|e| FetchError::Network {
            request,
            source: e.without_url(),
        })?;

        let grid = parse_flat_grid(&text, self.grid.len())?;
        debug!(values = grid.len(), "Parsed flat grid");
        Ok(grid)
    }
}

#[async_trait]
impl GridSource for ApiHubSource {
    fn name(&self) -> &'static str {
        "apihub"
    }

    async fn fetch_value(&self, request: &SampleRequest) -> Result<f64> {
        // Reject bad cells before spending a request on them.
        let cell = self.grid.validate(request.cell)?;
        let grid = self
            .fetch_variable_grid(request.variable, request.base_time, request.effective_time)
            .await?;
        extract_cell(&grid, self.grid, cell)
    }
}
