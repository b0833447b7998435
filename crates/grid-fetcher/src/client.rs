//! Shared HTTP client construction.

use reqwest::Client;

use crate::config::HttpConfig;
use crate::error::FetchError;

/// Build the single pooled client every worker shares.
pub fn build_http_client(config: &HttpConfig) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .tcp_nodelay(true)
        .build()
        .map_err(FetchError::ClientBuild)
}
