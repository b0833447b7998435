//! data.go.kr village forecast source.
//!
//! One response holds every variable and hour of a run for a single cell, so
//! parsed documents are cached per `(run, cell)` and shared by all tasks that
//! ask for that pair. Only successful fetches are cached.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use kma_common::{format_tm, GridCell, GridSpec};
use reqwest::Client;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument};

use crate::config::Credential;
use crate::error::{FetchError, Result};
use crate::parser::{parse_portal_document, PortalDocument};
use crate::source::{GridSource, SampleRequest};

const ROWS_PER_PAGE: &str = "1000";

type DocumentSlot = Arc<OnceCell<Arc<PortalDocument>>>;

pub struct DataPortalSource {
    client: Client,
    base_url: String,
    credential: Credential,
    grid: GridSpec,
    documents: Mutex<HashMap<(NaiveDateTime, GridCell), DocumentSlot>>,
}

impl DataPortalSource {
    pub fn new(client: Client, base_url: String, credential: Credential) -> Self {
        Self {
            client,
            base_url,
            credential,
            grid: GridSpec::kma(),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached `(run, cell)` documents.
    pub async fn cached_documents(&self) -> usize {
        self.documents.lock().await.len()
    }

    /// Get the document for a run and cell, fetching it at most once.
    pub async fn document(&self, base_time: NaiveDateTime, cell: GridCell) -> Result<Arc<PortalDocument>> {
        let slot = {
            let mut documents = self.documents.lock().await;
            // Older runs are superseded once a newer one is requested.
            documents.retain(|(base, _), _| *base >= base_time);
            documents
                .entry((base_time, cell))
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let doc = slot
            .get_or_try_init(|| async {
                self.fetch_document(base_time, cell).await.map(Arc::new)
            })
            .await?;
        Ok(doc.clone())
    }

    #[instrument(skip(self), fields(base = %format_tm(base_time), cell = %cell))]
    async fn fetch_document(&self, base_time: NaiveDateTime, cell: GridCell) -> Result<PortalDocument> {
        let key = self.credential.get()?;
        let base_date = base_time.format("%Y%m%d").to_string();
        let base_hhmm = base_time.format("%H%M").to_string();
        let nx = cell.x.to_string();
        let ny = cell.y.to_string();
        let request = format!("portal base={} cell={}", format_tm(base_time), cell);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("serviceKey", key),
                ("numOfRows", ROWS_PER_PAGE),
                ("pageNo", "1"),
                ("dataType", "JSON"),
                ("base_date", base_date.as_str()),
                ("base_time", base_hhmm.as_str()),
                ("nx", nx.as_str()),
                ("ny", ny.as_str()),
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

        let doc = parse_portal_document(&text)?;
        info!(values = doc.len(), "Fetched portal document");
        Ok(doc)
    }
}

#[async_trait]
impl GridSource for DataPortalSource {
    fn name(&self) -> &'static str {
        "portal"
    }

    async fn fetch_value(&self, request: &SampleRequest) -> Result<f64> {
        let cell = self.grid.validate(request.cell)?;
        let doc = self.document(request.base_time, cell).await?;
        let value = doc.value(request.variable, request.effective_time)?;
        debug!(request = %request.describe(), value, "Portal value");
        Ok(value)
    }
}
