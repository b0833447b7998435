//! Time series assembly for one grid cell.
//!
//! [`SeriesAggregator`] turns a cell, a [`kma_common::ForecastWindow`] and a
//! list of variables into a [`TimeSeries`] by running one fetch per
//! (hour, variable) on a small bounded pool. The [`report`] module flattens a
//! finished series into the JSON artifact and the markdown summary.

pub mod aggregator;
pub mod report;
pub mod series;

pub use aggregator::{AggregatorConfig, Progress, ProgressSink, SeriesAggregator, MAX_CONCURRENT};
pub use report::{
    markdown_summary, rows_from_series, write_json, LocationSummary, PrecipitationType,
    ReportError, ReportRow, SkyCondition,
};
pub use series::{Coverage, HourRecord, SeriesError, TimeSeries};
