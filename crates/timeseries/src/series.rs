//! Hour records and the assembled series.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use kma_common::{format_tm, GridCell, Variable};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeriesError {
    /// Every sample of the series is absent.
    #[error("no data for cell {cell} (base {base_time})")]
    NoData { cell: GridCell, base_time: String },

    #[error("invalid aggregator config: {0}")]
    InvalidConfig(String),
}

/// Samples for one effective time. Every requested variable has an entry;
/// `None` means the value is absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourRecord {
    pub effective_time: NaiveDateTime,
    pub samples: BTreeMap<Variable, Option<f64>>,
}

impl HourRecord {
    pub fn new(effective_time: NaiveDateTime, variables: &[Variable]) -> Self {
        Self {
            effective_time,
            samples: variables.iter().map(|v| (*v, None)).collect(),
        }
    }

    pub fn set(&mut self, variable: Variable, value: Option<f64>) {
        self.samples.insert(variable, value);
    }

    /// The value of `variable`, if requested and present.
    pub fn get(&self, variable: Variable) -> Option<f64> {
        self.samples.get(&variable).copied().flatten()
    }

    pub fn has_data(&self) -> bool {
        self.samples.values().any(Option::is_some)
    }

    pub fn present(&self) -> usize {
        self.samples.values().filter(|v| v.is_some()).count()
    }
}

/// Present / requested sample counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub present: usize,
    pub requested: usize,
}

impl Coverage {
    pub fn is_complete(&self) -> bool {
        self.present == self.requested
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.present, self.requested)
    }
}

/// Hour records for one cell, ordered by effective time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub cell: GridCell,
    pub base_time: NaiveDateTime,
    records: Vec<HourRecord>,
}

impl TimeSeries {
    pub fn new(cell: GridCell, base_time: NaiveDateTime, mut records: Vec<HourRecord>) -> Self {
        records.sort_by_key(|r| r.effective_time);
        Self {
            cell,
            base_time,
            records,
        }
    }

    pub fn records(&self) -> &[HourRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True if at least one sample is present.
    pub fn has_data(&self) -> bool {
        self.records.iter().any(HourRecord::has_data)
    }

    /// Fail with `SeriesError::NoData` when every sample is absent.
    pub fn ensure_data(&self) -> Result<&Self, SeriesError> {
        if self.has_data() {
            Ok(self)
        } else {
            Err(SeriesError::NoData {
                cell: self.cell,
                base_time: format_tm(self.base_time),
            })
        }
    }

    pub fn coverage(&self) -> Coverage {
        self.records.iter().fold(
            Coverage {
                present: 0,
                requested: 0,
            },
            |acc, r| Coverage {
                present: acc.present + r.present(),
                requested: acc.requested + r.samples.len(),
            },
        )
    }
}
