//! Error types for grid fetching.

use kma_common::{KmaError, Variable};
use thiserror::Error;

/// Result codes from the data portal that will not change on retry.
const PERMANENT_PROVIDER_CODES: [&str; 5] = [
    "03", // NO_DATA
    "10", // INVALID_REQUEST_PARAMETER_ERROR
    "30", // SERVICE_KEY_IS_NOT_REGISTERED_ERROR
    "31", // DEADLINE_HAS_EXPIRED_ERROR
    "32", // UNREGISTERED_IP_ERROR
];

/// Errors that can occur while fetching a single sample.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API key environment variable is unset or empty.
    #[error("missing API credential: set {0}")]
    MissingCredential(&'static str),

    /// Failed to construct the shared HTTP client.
    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// Connection, timeout or body read failure.
    #[error("network request failed for {request}")]
    Network {
        request: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status.
    #[error("HTTP request failed for {request} with status {status}")]
    HttpStatus {
        request: String,
        status: reqwest::StatusCode,
    },

    /// Fewer grid values than the grid holds.
    #[error("short payload: expected {expected} values, found {found}")]
    ShortPayload { expected: usize, found: usize },

    /// Body could not be decoded.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Data portal returned a non-"00" result code.
    #[error("provider error {code}: {message}")]
    Provider { code: String, message: String },

    /// Provider has no value for this variable and hour.
    #[error("no data for {variable} at {effective_time}")]
    NoData {
        variable: Variable,
        effective_time: String,
    },

    /// Invalid request input, e.g. a cell outside the grid.
    #[error(transparent)]
    Input(#[from] KmaError),

    /// Every attempt failed with a transient error.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. }
            | FetchError::HttpStatus { .. }
            | FetchError::ShortPayload { .. }
            | FetchError::InvalidPayload(_) => true,
            FetchError::Provider { code, .. } => !PERMANENT_PROVIDER_CODES.contains(&code.as_str()),
            FetchError::MissingCredential(_)
            | FetchError::ClientBuild(_)
            | FetchError::NoData { .. }
            | FetchError::Input(_)
            | FetchError::RetriesExhausted { .. } => false,
        }
    }
}

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
