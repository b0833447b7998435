//! Report rows, the JSON artifact and the markdown summary.

use std::fmt;
use std::path::{Path, PathBuf};

use kma_common::Variable;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::series::{HourRecord, TimeSeries};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report")]
    Serialize(#[from] serde_json::Error),
}

/// Sky condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyCondition {
    Clear,
    Cloudy,
    Overcast,
    Unknown,
}

impl SkyCondition {
    pub fn from_code(code: f64) -> Self {
        match code.round() as i64 {
            1 => SkyCondition::Clear,
            3 => SkyCondition::Cloudy,
            4 => SkyCondition::Overcast,
            _ => SkyCondition::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SkyCondition::Clear => "Clear",
            SkyCondition::Cloudy => "Cloudy",
            SkyCondition::Overcast => "Overcast",
            SkyCondition::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SkyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Precipitation type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecipitationType {
    None,
    Rain,
    RainSnow,
    Snow,
    Shower,
    Unknown,
}

impl PrecipitationType {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PrecipitationType::None,
            1 => PrecipitationType::Rain,
            2 => PrecipitationType::RainSnow,
            3 => PrecipitationType::Snow,
            4 => PrecipitationType::Shower,
            _ => PrecipitationType::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrecipitationType::None => "None",
            PrecipitationType::Rain => "Rain",
            PrecipitationType::RainSnow => "Rain/Snow",
            PrecipitationType::Snow => "Snow",
            PrecipitationType::Shower => "Shower",
            PrecipitationType::Unknown => "-",
        }
    }
}

impl fmt::Display for PrecipitationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One hour of the output artifact. Absent values are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Effective hour as `HH:00`
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sky: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pty: Option<i32>,
}

impl ReportRow {
    /// `None` when the record holds no data at all.
    pub fn from_record(record: &HourRecord) -> Option<Self> {
        if !record.has_data() {
            return None;
        }
        Some(Self {
            time: record.effective_time.format("%H:00").to_string(),
            temp: record.get(Variable::Tmp),
            sky: record
                .get(Variable::Sky)
                .map(|code| SkyCondition::from_code(code).label().to_string()),
            wind: record.get(Variable::Wsd),
            pop: record.get(Variable::Pop).map(|v| v.round() as i32),
            pty: record.get(Variable::Pty).map(|v| v.round() as i32),
        })
    }
}

/// Rows for every hour of the series that has any data, in time order.
pub fn rows_from_series(series: &TimeSeries) -> Vec<ReportRow> {
    series
        .records()
        .iter()
        .filter_map(ReportRow::from_record)
        .collect()
}

/// Write rows as pretty-printed UTF-8 JSON.
pub fn write_json(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(rows)?;
    std::fs::write(path, json).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), rows = rows.len(), "Wrote report");
    Ok(())
}

/// One line of the markdown summary.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSummary {
    pub location: String,
    /// First hour with data; `None` if the fetch failed.
    pub first: Option<ReportRow>,
}

impl LocationSummary {
    pub fn from_rows(location: impl Into<String>, rows: &[ReportRow]) -> Self {
        Self {
            location: location.into(),
            first: rows.first().cloned(),
        }
    }

    pub fn failed(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            first: None,
        }
    }

    fn table_line(&self) -> String {
        let Some(row) = &self.first else {
            return format!("| {} | Fetch Failed | - | - | - | - |", self.location);
        };

        let temp = row
            .temp
            .map(|t| format!("{}℃", t))
            .unwrap_or_else(|| "-".to_string());
        let sky = row.sky.as_deref().unwrap_or("-");
        let precip = row
            .pty
            .map(|p| PrecipitationType::from_code(p).label())
            .unwrap_or("-");
        let pop = row
            .pop
            .map(|p| format!("{}%", p))
            .unwrap_or_else(|| "-".to_string());

        format!(
            "| {} | {} | {} | {} | {} | {} |",
            self.location, row.time, temp, sky, precip, pop
        )
    }
}

/// Render the summary table for a run.
pub fn markdown_summary(summaries: &[LocationSummary]) -> String {
    let mut out = String::from("### Weather Report Summary\n\n");
    out.push_str("| Location | Time | Temp | Sky | Precip | POP |\n");
    out.push_str("| --- | --- | --- | --- | --- | --- |\n");
    for summary in summaries {
        out.push_str(&summary.table_line());
        out.push('\n');
    }
    out
}
