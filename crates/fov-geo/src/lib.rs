//! Spherical geodesy for the FOV wedge: distances, bearings, the sector
//! polygon and point containment. Everything here is pure and map-engine
//! agnostic; callers hand in coordinates and get coordinates back.

pub mod geodesy;
pub mod sector;

use serde::{Deserialize, Serialize};

pub use geodesy::{
    angular_difference_deg, destination_point, haversine_m, initial_bearing_deg,
    normalize_heading, signed_delta_deg, EARTH_RADIUS_M,
};
pub use sector::{compute_fov_sector_points, is_point_in_fov, FovSector, DEFAULT_ARC_SEGMENTS};

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside the WGS84 coordinate ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && self.lat.abs() <= 90.0
            && self.lon.abs() <= 180.0
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}
