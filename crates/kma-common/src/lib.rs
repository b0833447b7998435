//! Common types and utilities shared across the KMA forecast crates.

pub mod error;
pub mod grid;
pub mod location;
pub mod time;
pub mod variable;

pub use error::{KmaError, KmaResult};
pub use grid::{is_valid_latitude, GeoPoint, GridCell, GridSpec, NX, NY};
pub use location::LocationTable;
pub use time::{
    current_base_time, format_tm, kst_now, parse_tm, target_effective_times, EffectivePolicy,
    ForecastClock, ForecastWindow, BASE_HOURS,
};
pub use variable::Variable;
