use fov_geo::GeoPoint;
use thiserror::Error;

/// Why a raw sensor sample was refused. These never leave the engine; they
/// only end up in the log.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SampleError {
    #[error("non-finite coordinate ({lat}, {lon})")]
    NonFiniteCoordinate { lat: f64, lon: f64 },
    #[error("coordinate out of range ({lat}, {lon})")]
    CoordinateOutOfRange { lat: f64, lon: f64 },
    #[error("non-finite heading {0}")]
    NonFiniteHeading(f64),
    #[error("heading {0} outside [0, 360)")]
    HeadingOutOfRange(f64),
}

/// Returned when feeding an engine whose task has already shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("fov engine stopped")]
pub struct EngineStopped;

pub fn check_position(p: GeoPoint) -> Result<GeoPoint, SampleError> {
    if !p.lat.is_finite() || !p.lon.is_finite() {
        return Err(SampleError::NonFiniteCoordinate { lat: p.lat, lon: p.lon });
    }
    if !p.is_valid() {
        return Err(SampleError::CoordinateOutOfRange { lat: p.lat, lon: p.lon });
    }
    Ok(p)
}

pub fn check_heading(h: f64) -> Result<f64, SampleError> {
    if !h.is_finite() {
        return Err(SampleError::NonFiniteHeading(h));
    }
    if !(0.0..360.0).contains(&h) {
        return Err(SampleError::HeadingOutOfRange(h));
    }
    Ok(h)
}
