//! Grid Fetcher: retrieves forecast values from the KMA grid APIs.
//!
//! Two provider shapes sit behind one [`GridSource`] capability:
//!
//! - [`ApiHubSource`]: one flat 149 x 253 text grid per (variable, hour)
//! - [`DataPortalSource`]: one JSON document per (run, cell) with every
//!   variable and hour
//!
//! [`GridFetcher`] wraps a source with the fixed-delay retry policy and turns
//! exhausted retries into an absent sample instead of an error.
//!
//! ```text
//! SampleRequest ─► GridFetcher::fetch_sample
//!                      │
//!                      ├─► GridSource::fetch_value   (attempt 1..=5)
//!                      │        │
//!                      │        ├─► ApiHubSource: GET grid ─► parse_flat_grid ─► extract_cell
//!                      │        └─► DataPortalSource: cached document ─► value lookup
//!                      │
//!                      └─► Some(value) | None
//! ```

pub mod apihub;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod parser;
pub mod portal;
pub mod retry;
pub mod source;

pub use apihub::ApiHubSource;
pub use client::build_http_client;
pub use config::{Credential, FetcherConfig, HttpConfig, SourceKind};
pub use error::{FetchError, Result};
pub use fetcher::GridFetcher;
pub use parser::{
    extract_cell, parse_flat_grid, parse_portal_document, parse_portal_value, PortalDocument,
};
pub use portal::DataPortalSource;
pub use retry::RetryPolicy;
pub use source::{create_source, create_source_with_client, GridSource, SampleRequest};
