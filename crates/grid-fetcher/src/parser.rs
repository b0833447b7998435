//! Decoders for the two provider response shapes.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use kma_common::{format_tm, parse_tm, GridCell, GridSpec, Variable};
use serde::Deserialize;
use tracing::debug;

use crate::error::{FetchError, Result};

/// Parse a flat text grid into exactly `expected` values.
///
/// The body is split on commas and whitespace. Tokens starting with `=` and
/// tokens that are not numbers are header text. The last `expected` numbers
/// are the grid, row-major from the southern row.
pub fn parse_flat_grid(text: &str, expected: usize) -> Result<Vec<f64>> {
    let values: Vec<f64> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty() && !t.starts_with('='))
        .filter_map(|t| t.parse::<f64>().ok())
        .collect();

    if values.len() < expected {
        return Err(FetchError::ShortPayload {
            expected,
            found: values.len(),
        });
    }

    let skip = values.len() - expected;
    if skip > 0 {
        debug!(extra = skip, "Discarding leading header values");
    }
    Ok(values[skip..].to_vec())
}

/// Read the value for `cell` out of a parsed grid.
pub fn extract_cell(grid: &[f64], spec: GridSpec, cell: GridCell) -> Result<f64> {
    let index = spec.flat_index(cell)?;
    grid.get(index).copied().ok_or(FetchError::ShortPayload {
        expected: spec.len(),
        found: grid.len(),
    })
}

/// Parse a portal text value such as `"5"`, `"1.0mm"` or `"강수없음"`.
pub fn parse_portal_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.contains("없음") {
        return Some(0.0);
    }

    let end = raw
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Response,
}

#[derive(Debug, Deserialize)]
struct Response {
    header: Header,
    #[serde(default)]
    body: Option<Body>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    result_code: String,
    #[serde(default)]
    result_msg: String,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(default)]
    items: Option<Items>,
}

#[derive(Debug, Deserialize)]
struct Items {
    #[serde(default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    category: String,
    fcst_date: String,
    fcst_time: String,
    fcst_value: serde_json::Value,
}

/// Every value of one portal response, keyed by variable and valid time.
#[derive(Debug, Clone, Default)]
pub struct PortalDocument {
    values: HashMap<(Variable, NaiveDateTime), f64>,
}

impl PortalDocument {
    /// The value for `variable` at `effective_time`, or `NoData`.
    pub fn value(&self, variable: Variable, effective_time: NaiveDateTime) -> Result<f64> {
        self.values
            .get(&(variable, effective_time))
            .copied()
            .ok_or_else(|| FetchError::NoData {
                variable,
                effective_time: format_tm(effective_time),
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decode a portal JSON response.
///
/// A non-`"00"` result code becomes `FetchError::Provider`. Items with
/// categories outside [`Variable`] or unreadable values are skipped.
pub fn parse_portal_document(text: &str) -> Result<PortalDocument> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| FetchError::InvalidPayload(format!("portal response: {}", e)))?;

    let header = envelope.response.header;
    if header.result_code != "00" {
        return Err(FetchError::Provider {
            code: header.result_code,
            message: header.result_msg,
        });
    }

    let items = envelope
        .response
        .body
        .and_then(|b| b.items)
        .map(|i| i.item)
        .unwrap_or_default();

    let mut values = HashMap::with_capacity(items.len());
    for item in items {
        let Some(variable) = Variable::from_code(&item.category) else {
            continue;
        };
        let Ok(effective) = parse_tm(&format!("{}{}", item.fcst_date, item.fcst_time)) else {
            continue;
        };
        let value = match &item.fcst_value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => parse_portal_value(s),
            _ => None,
        };
        if let Some(value) = value {
            values.insert((variable, effective), value);
        }
    }

    Ok(PortalDocument { values })
}
