use fov_geo::GeoPoint;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Location,
    SignalLost,
    Camera,
    Highlight,
}

/// One line of presentation-layer output. Fields that don't apply to the
/// event kind are left out of the serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FovEvent {
    pub ts_unix_ms: i64,
    pub kind: EventKind,
    pub revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub boundary: Vec<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<Vec<String>>,
}

impl FovEvent {
    pub fn new(kind: EventKind, revision: u64) -> Self {
        Self {
            ts_unix_ms: now_unix_ms(),
            kind,
            revision,
            location: None,
            secondary: None,
            heading: None,
            boundary: Vec::new(),
            bearing: None,
            zoom: None,
            highlighted: None,
        }
    }
}

pub fn now_unix_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
