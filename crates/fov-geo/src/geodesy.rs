use crate::GeoPoint;

/// Mean earth radius used by every spherical formula in this crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    // rounding can push h a hair above 1 for antipodal points
    let h = h.min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `a` to `b`, degrees in [0, 360).
pub fn initial_bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    normalize_heading(y.atan2(x).to_degrees())
}

/// Wraps any angle into [0, 360).
pub fn normalize_heading(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid may round up to the modulus itself for tiny negatives
    if r >= 360.0 { 0.0 } else { r }
}

/// Shortest signed rotation taking `current` onto `target`, in [-180, 180).
/// Positive is clockwise.
pub fn signed_delta_deg(target: f64, current: f64) -> f64 {
    let d = normalize_heading(target - current);
    if d >= 180.0 { d - 360.0 } else { d }
}

/// Unsigned shortest angle between two bearings, in [0, 180].
/// 359° and 1° are 2° apart.
pub fn angular_difference_deg(a: f64, b: f64) -> f64 {
    signed_delta_deg(b, a).abs()
}

/// Spherical direct problem: the point reached after travelling
/// `distance_m` from `start` along initial bearing `bearing_deg`.
pub fn destination_point(start: GeoPoint, distance_m: f64, bearing_deg: f64) -> GeoPoint {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = start.lat.to_radians();
    let lon1 = start.lon.to_radians();

    let sin_lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos())
        .clamp(-1.0, 1.0);
    let lat2 = sin_lat2.asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * sin_lat2);

    GeoPoint {
        lat: lat2.to_degrees(),
        lon: normalize_lon(lon2.to_degrees()),
    }
}

fn normalize_lon(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        lon
    } else {
        (lon + 540.0).rem_euclid(360.0) - 180.0
    }
}
