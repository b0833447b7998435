//! Location name -> grid cell lookup table.
//!
//! The table is pre-computed elsewhere and shipped as a JSON object:
//!
//! ```json
//! { "대전광역시 유성구 구성동": { "x": 67, "y": 101 } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::{GridCell, GridSpec, KmaError, KmaResult};

/// Static mapping from a human-readable location to its grid cell.
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    entries: BTreeMap<String, GridCell>,
}

impl LocationTable {
    /// Build a table, rejecting cells outside the KMA grid.
    pub fn new(entries: BTreeMap<String, GridCell>) -> KmaResult<Self> {
        let spec = GridSpec::kma();
        for cell in entries.values() {
            spec.validate(*cell)?;
        }
        Ok(Self { entries })
    }

    pub fn from_json(json: &str) -> KmaResult<Self> {
        let entries: BTreeMap<String, GridCell> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    /// Load the table from a JSON file.
    pub fn load(path: &Path) -> KmaResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| KmaError::LocationTable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let table = Self::from_json(&content).map_err(|e| match e {
            KmaError::LocationTable { message, .. } => KmaError::LocationTable {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        debug!(path = %path.display(), entries = table.len(), "Loaded location table");
        Ok(table)
    }

    pub fn lookup(&self, key: &str) -> KmaResult<GridCell> {
        self.entries
            .get(key)
            .copied()
            .ok_or_else(|| KmaError::UnknownLocation(key.to_string()))
    }

    /// Location keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keys containing `query`, for prefix/substring search.
    pub fn search<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.keys().filter(move |k| k.contains(query))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"{
        "서울특별시 강남구 역삼1동": {"x": 61, "y": 125},
        "대전광역시 유성구 구성동": {"x": 67, "y": 101}
    }"#;

    #[test]
    fn test_lookup() {
        let table = LocationTable::from_json(TABLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.lookup("대전광역시 유성구 구성동").unwrap(),
            GridCell::new(67, 101)
        );
    }

    #[test]
    fn test_unknown_location() {
        let table = LocationTable::from_json(TABLE).unwrap();
        let err = table.lookup("부산광역시 해운대구 우제1동").unwrap_err();
        assert!(matches!(err, KmaError::UnknownLocation(_)));
    }

    #[test]
    fn test_rejects_cell_outside_grid() {
        let result = LocationTable::from_json(r#"{"nowhere": {"x": 400, "y": 1}}"#);
        assert!(matches!(result, Err(KmaError::CellOutOfRange { .. })));
    }

    #[test]
    fn test_search() {
        let table = LocationTable::from_json(TABLE).unwrap();
        let hits: Vec<_> = table.search("유성구").collect();
        assert_eq!(hits, vec!["대전광역시 유성구 구성동"]);
    }
}
