//! Grid definition for the KMA short-term forecast grid.

use crate::{KmaError, KmaResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of columns in the KMA 5 km grid.
pub const NX: usize = 149;
/// Number of rows in the KMA 5 km grid.
pub const NY: usize = 253;

/// Whether `latitude` can be projected. The poles are excluded.
pub fn is_valid_latitude(latitude: f64) -> bool {
    latitude.is_finite() && latitude.abs() < 90.0
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a validated point. Latitude must lie strictly between the
    /// poles. Longitude may be given in either the [-180, 180] or [0, 360]
    /// convention.
    pub fn new(latitude: f64, longitude: f64) -> KmaResult<Self> {
        let valid = is_valid_latitude(latitude)
            && longitude.is_finite()
            && (-180.0..=360.0).contains(&longitude);

        if !valid {
            return Err(KmaError::InvalidCoordinate {
                lat: latitude,
                lon: longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// An integer cell of the KMA grid. Column `x`, row `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dimensions and memory layout of a flat provider grid.
///
/// Values are stored row-major with row 0 at the southern edge, so the
/// value for a cell lives at `y * nx + x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of points in X direction
    pub nx: usize,
    /// Number of points in Y direction
    pub ny: usize,
}

impl GridSpec {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self { nx, ny }
    }

    /// The 149 x 253 grid used by the short-term forecast products.
    pub fn kma() -> Self {
        Self::new(NX, NY)
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.nx && (cell.y as usize) < self.ny
    }

    /// Check that a cell lies inside the grid.
    pub fn validate(&self, cell: GridCell) -> KmaResult<GridCell> {
        if self.contains(cell) {
            Ok(cell)
        } else {
            Err(KmaError::CellOutOfRange {
                x: cell.x,
                y: cell.y,
                nx: self.nx,
                ny: self.ny,
            })
        }
    }

    /// Get the 1D array index for a cell.
    pub fn flat_index(&self, cell: GridCell) -> KmaResult<usize> {
        let cell = self.validate(cell)?;
        Ok(cell.y as usize * self.nx + cell.x as usize)
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::kma()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kma_grid_len() {
        let spec = GridSpec::kma();
        assert_eq!(spec.len(), 37_697);
        assert!(!spec.is_empty());
    }

    #[test]
    fn test_flat_index_row_major() {
        let spec = GridSpec::kma();
        assert_eq!(spec.flat_index(GridCell::new(0, 0)).unwrap(), 0);
        assert_eq!(spec.flat_index(GridCell::new(1, 0)).unwrap(), 1);
        assert_eq!(spec.flat_index(GridCell::new(0, 1)).unwrap(), NX);
        assert_eq!(
            spec.flat_index(GridCell::new(67, 101)).unwrap(),
            101 * 149 + 67
        );
        assert_eq!(
            spec.flat_index(GridCell::new(148, 252)).unwrap(),
            spec.len() - 1
        );
    }

    #[test]
    fn test_out_of_range_cell_is_error() {
        let spec = GridSpec::kma();
        assert!(spec.flat_index(GridCell::new(149, 0)).is_err());
        assert!(spec.flat_index(GridCell::new(0, 253)).is_err());
        assert!(spec.flat_index(GridCell::new(-1, 10)).is_err());
    }

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(37.5, 127.0).is_ok());
        assert!(GeoPoint::new(91.0, 127.0).is_err());
        assert!(GeoPoint::new(90.0, 127.0).is_err());
        assert!(GeoPoint::new(-90.0, 127.0).is_err());
        assert!(GeoPoint::new(89.9, 127.0).is_ok());
        assert!(GeoPoint::new(f64::NAN, 127.0).is_err());
        assert!(GeoPoint::new(37.5, f64::INFINITY).is_err());
    }
}
