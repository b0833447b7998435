//! Lambert Conformal Conic projection for the KMA forecast grid.
//!
//! The short-term forecast grid is a secant cone with standard parallels
//! 30N and 60N, origin 38N 126E, 5 km spacing and the origin placed at grid
//! cell (43, 136). Grid assignment must match the provider bit for bit, so the
//! arithmetic below follows the provider's own conversion step by step
//! (including the `floor(v + 0.5)` rounding).

use std::f64::consts::PI;

use kma_common::{is_valid_latitude, GeoPoint, GridCell, GridSpec};
use thiserror::Error;

const DEG_TO_RAD: f64 = PI / 180.0;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("lat={lat}, lon={lon} projects to ({x}, {y}), outside the grid")]
    OutsideGrid { lat: f64, lon: f64, x: i64, y: i64 },
}

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Earth radius (km)
    pub earth_radius_km: f64,
    /// Grid spacing (km)
    pub grid_km: f64,
    /// First standard parallel (degrees)
    pub latin1: f64,
    /// Second standard parallel (degrees)
    pub latin2: f64,
    /// Origin longitude (degrees)
    pub lon0: f64,
    /// Origin latitude (degrees)
    pub lat0: f64,
    /// Grid column of the origin
    pub x0: f64,
    /// Grid row of the origin
    pub y0: f64,
    /// Grid the projected cells must fall into
    pub grid: GridSpec,
    /// Earth radius in grid units
    re: f64,
    /// Cone constant
    sn: f64,
    /// Scale factor
    sf: f64,
    /// Projected radius of the origin latitude
    ro: f64,
}

impl LambertConformal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        earth_radius_km: f64,
        grid_km: f64,
        latin1: f64,
        latin2: f64,
        lon0: f64,
        lat0: f64,
        x0: f64,
        y0: f64,
        grid: GridSpec,
    ) -> Self {
        let re = earth_radius_km / grid_km;
        let slat1 = latin1 * DEG_TO_RAD;
        let slat2 = latin2 * DEG_TO_RAD;
        let olat = lat0 * DEG_TO_RAD;

        // Cone constant
        let sn = (PI * 0.25 + slat2 * 0.5).tan() / (PI * 0.25 + slat1 * 0.5).tan();
        let sn = (slat1.cos() / slat2.cos()).ln() / sn.ln();

        let sf = (PI * 0.25 + slat1 * 0.5).tan();
        let sf = sf.powf(sn) * slat1.cos() / sn;

        let ro = (PI * 0.25 + olat * 0.5).tan();
        let ro = re * sf / ro.powf(sn);

        Self {
            earth_radius_km,
            grid_km,
            latin1,
            latin2,
            lon0,
            lat0,
            x0,
            y0,
            grid,
            re,
            sn,
            sf,
            ro,
        }
    }

    /// The KMA short-term forecast grid (149 x 253, 5 km).
    pub fn kma() -> Self {
        Self::new(
            6371.00877, // earth radius (km)
            5.0,        // grid spacing (km)
            30.0,       // latin1
            60.0,       // latin2
            126.0,      // origin lon
            38.0,       // origin lat
            43.0,       // origin x
            136.0,      // origin y
            GridSpec::kma(),
        )
    }

    /// Cone constant `n`.
    pub fn cone_constant(&self) -> f64 {
        self.sn
    }

    /// Unrounded grid coordinates for a geographic point.
    ///
    /// The returned values already include the `+ 0.5` rounding offset, so
    /// `floor()` of each component yields the grid cell.
    pub fn geo_to_grid_f64(&self, lat: f64, lon: f64) -> (f64, f64) {
        let ra = (PI * 0.25 + lat * DEG_TO_RAD * 0.5).tan();
        let ra = self.re * self.sf / ra.powf(self.sn);

        let mut theta = lon * DEG_TO_RAD - self.lon0 * DEG_TO_RAD;
        if theta > PI {
            theta -= 2.0 * PI;
        }
        if theta < -PI {
            theta += 2.0 * PI;
        }
        theta *= self.sn;

        let x = ra * theta.sin() + self.x0 + 0.5;
        let y = self.ro - ra * theta.cos() + self.y0 + 0.5;
        (x, y)
    }

    /// Project a point onto its grid cell.
    pub fn to_grid(&self, point: GeoPoint) -> Result<GridCell, ProjectionError> {
        self.lat_lon_to_grid(point.latitude, point.longitude)
    }

    /// Project raw degrees onto a grid cell.
    pub fn lat_lon_to_grid(&self, lat: f64, lon: f64) -> Result<GridCell, ProjectionError> {
        if !is_valid_latitude(lat) || !lon.is_finite() {
            return Err(ProjectionError::InvalidCoordinate { lat, lon });
        }

        let (fx, fy) = self.geo_to_grid_f64(lat, lon);
        let x = fx.floor() as i64;
        let y = fy.floor() as i64;

        let cell = GridCell::new(x as i32, y as i32);
        let in_range = x >= 0 && y >= 0 && (x as usize) < self.grid.nx && (y as usize) < self.grid.ny;
        if !in_range {
            return Err(ProjectionError::OutsideGrid { lat, lon, x, y });
        }

        Ok(cell)
    }
}

impl Default for LambertConformal {
    fn default() -> Self {
        Self::kma()
    }
}
