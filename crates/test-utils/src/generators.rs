//! Generators for synthetic provider payloads.
//!
//! These create predictable, verifiable data so parsers and cell extraction
//! can be checked without the network.

/// Creates a grid whose value encodes its own position.
///
/// Each cell value is `y * 1000 + x`, in row-major order (row 0 first).
///
/// # Example
///
/// ```
/// use test_utils::create_index_grid;
///
/// let grid = create_index_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1.0);     // x=1, y=0
/// assert_eq!(grid[10], 1000.0); // x=0, y=1
/// ```
pub fn create_index_grid(nx: usize, ny: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(nx * ny);
    for y in 0..ny {
        for x in 0..nx {
            data.push((y * 1000 + x) as f64);
        }
    }
    data
}

/// Renders grid values the way the flat-grid endpoint does.
///
/// `metadata_tokens` tokens starting with `=` are written first, followed by
/// the values, comma separated with ten values per line.
pub fn flat_grid_payload(values: &[f64], metadata_tokens: usize) -> String {
    let mut out = String::new();
    for i in 0..metadata_tokens {
        out.push_str(&format!("=META{} ", i));
    }
    out.push('\n');

    for (i, chunk) in values.chunks(10).enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        let line: Vec<String> = chunk.iter().map(|v| format!("{:.1}", v)).collect();
        out.push_str(&line.join(", "));
    }
    out.push('\n');
    out
}

/// One forecast item in the data portal JSON response.
#[derive(Debug, Clone)]
pub struct PortalItem {
    pub category: &'static str,
    pub fcst_date: String,
    pub fcst_time: String,
    pub value: String,
}

impl PortalItem {
    /// `effective` is a `%Y%m%d%H%M` timestamp.
    pub fn new(category: &'static str, effective: &str, value: impl Into<String>) -> Self {
        Self {
            category,
            fcst_date: effective[..8].to_string(),
            fcst_time: effective[8..12].to_string(),
            value: value.into(),
        }
    }
}

/// Renders a data portal response document.
pub fn portal_document(result_code: &str, base: &str, items: &[PortalItem]) -> String {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|item| {
            serde_json::json!({
                "baseDate": &base[..8],
                "baseTime": &base[8..12],
                "category": item.category,
                "fcstDate": item.fcst_date,
                "fcstTime": item.fcst_time,
                "fcstValue": item.value,
                "nx": 67,
                "ny": 101
            })
        })
        .collect();

    serde_json::json!({
        "response": {
            "header": { "resultCode": result_code, "resultMsg": "NORMAL_SERVICE" },
            "body": {
                "dataType": "JSON",
                "items": { "item": items },
                "pageNo": 1,
                "numOfRows": 1000,
                "totalCount": items.len()
            }
        }
    })
    .to_string()
}
