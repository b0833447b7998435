//! Error types for KMA forecast inputs.

use thiserror::Error;

/// Result type alias using KmaError.
pub type KmaResult<T> = Result<T, KmaError>;

/// Input and configuration errors. None of these are retried.
#[derive(Debug, Error)]
pub enum KmaError {
    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Grid cell ({x}, {y}) is outside the {nx}x{ny} grid")]
    CellOutOfRange { x: i32, y: i32, nx: usize, ny: usize },

    #[error("Invalid forecast window: {0}")]
    InvalidWindow(String),

    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    #[error("Unknown variable code: {0}")]
    UnknownVariable(String),

    #[error("Failed to read location table '{path}': {message}")]
    LocationTable { path: String, message: String },
}

impl From<serde_json::Error> for KmaError {
    fn from(err: serde_json::Error) -> Self {
        KmaError::LocationTable {
            path: String::new(),
            message: format!("JSON error: {}", err),
        }
    }
}
