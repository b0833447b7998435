//! Forecast variables served by the short-term forecast products.

use crate::KmaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Values at or below this floor are "no data" for every variable.
pub const MISSING_FLOOR: f64 = -50.0;

/// A forecast variable and its provider category code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Variable {
    /// Hourly temperature (deg C)
    Tmp,
    /// Sky condition code (1 clear, 3 cloudy, 4 overcast)
    Sky,
    /// Precipitation type code (0 none, 1 rain, 2 rain/snow, 3 snow, 4 shower)
    Pty,
    /// Wind speed (m/s)
    Wsd,
    /// Hourly precipitation amount
    Pcp,
    /// Hourly snow amount
    Sno,
    /// Relative humidity (%)
    Reh,
    /// Probability of precipitation (%)
    Pop,
}

impl Variable {
    /// Every variable, in the order the report columns use.
    pub const ALL: [Variable; 8] = [
        Variable::Tmp,
        Variable::Sky,
        Variable::Pty,
        Variable::Wsd,
        Variable::Pcp,
        Variable::Sno,
        Variable::Reh,
        Variable::Pop,
    ];

    /// Provider category code (`vars=` / `category`).
    pub fn code(&self) -> &'static str {
        match self {
            Variable::Tmp => "TMP",
            Variable::Sky => "SKY",
            Variable::Pty => "PTY",
            Variable::Wsd => "WSD",
            Variable::Pcp => "PCP",
            Variable::Sno => "SNO",
            Variable::Reh => "REH",
            Variable::Pop => "POP",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.code().eq_ignore_ascii_case(code))
    }

    /// Sentinels this variable uses on top of [`MISSING_FLOOR`].
    pub fn extra_sentinels(&self) -> &'static [f64] {
        match self {
            Variable::Wsd | Variable::Reh | Variable::Pop => &[-1.0],
            _ => &[],
        }
    }

    /// Map a raw provider value to a reading, or `None` for a sentinel.
    pub fn normalize(&self, value: f64) -> Option<f64> {
        if !value.is_finite() || value <= MISSING_FLOOR {
            return None;
        }
        if self.extra_sentinels().contains(&value) {
            return None;
        }
        Some(value)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Variable {
    type Err = KmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::from_code(s.trim()).ok_or_else(|| KmaError::UnknownVariable(s.to_string()))
    }
}
