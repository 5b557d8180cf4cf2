use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::geodesy::{angular_difference_deg, destination_point, haversine_m, initial_bearing_deg};
use crate::GeoPoint;

pub const DEFAULT_ARC_SEGMENTS: usize = 20;

/// Polygon for a filled pie-slice: `[center, p_0, .., p_{n-1}]` where the arc
/// points are evenly spaced over `bearing ± fov_angle/2`, both ends included.
/// Drawn closed, the last arc point joins back to `center`.
///
/// Always returns `arc_segments + 1` points.
pub fn compute_fov_sector_points(
    center: GeoPoint,
    bearing: f64,
    fov_angle: f64,
    radius_m: f64,
    arc_segments: usize,
) -> Vec<GeoPoint> {
    let mut points = Vec::with_capacity(arc_segments + 1);
    points.push(center);

    match arc_segments {
        0 => {}
        1 => points.push(destination_point(center, radius_m, bearing)),
        n => {
            let start = bearing - fov_angle / 2.0;
            let step = fov_angle / (n - 1) as f64;
            for i in 0..n {
                points.push(destination_point(center, radius_m, start + step * i as f64));
            }
        }
    }
    points
}

/// True iff `target` is within `radius_m` of `user` and within `fov_angle/2`
/// of `heading`. Both bounds are inclusive.
///
/// A coincident target counts as inside since its bearing is undefined.
/// A negative radius excludes everything; `fov_angle >= 360` turns the wedge
/// into a disc.
pub fn is_point_in_fov(
    user: GeoPoint,
    target: GeoPoint,
    heading: f64,
    fov_angle: f64,
    radius_m: f64,
) -> bool {
    if radius_m.is_nan() || radius_m < 0.0 {
        return false;
    }

    let distance = haversine_m(user, target);
    match distance.partial_cmp(&radius_m) {
        Some(Ordering::Greater) | None => return false,
        _ => {}
    }
    if distance == 0.0 || fov_angle >= 360.0 {
        return true;
    }

    let bearing = initial_bearing_deg(user, target);
    angular_difference_deg(heading, bearing) <= fov_angle / 2.0
}

/// One observer's wedge, bundled so callers don't thread four floats around.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FovSector {
    pub center: GeoPoint,
    pub heading: f64,
    pub fov_angle: f64,
    pub radius_m: f64,
}

impl FovSector {
    pub fn boundary(&self, arc_segments: usize) -> Vec<GeoPoint> {
        compute_fov_sector_points(
            self.center,
            self.heading,
            self.fov_angle,
            self.radius_m,
            arc_segments,
        )
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        is_point_in_fov(self.center, point, self.heading, self.fov_angle, self.radius_m)
    }
}
