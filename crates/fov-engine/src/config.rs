use serde::{Deserialize, Serialize};

pub const DEFAULT_LOCATION_THRESHOLD_M: f64 = 0.5;
pub const DEFAULT_HEADING_THRESHOLD_DEG: f64 = 0.5;
pub const DEFAULT_BEARING_GATE_DEG: f64 = 1.0;
pub const DEFAULT_TARGET_GATE_M: f64 = 0.5;
pub const DEFAULT_ZOOM: f64 = 16.0;

/// Named wedge presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FovProfile {
    /// 68° wide, 250 m deep.
    #[default]
    Wide,
    /// 50° wide, 50 m deep.
    Narrow,
}

impl FovProfile {
    pub fn fov_angle(self) -> f64 {
        match self {
            FovProfile::Wide => 68.0,
            FovProfile::Narrow => 50.0,
        }
    }

    pub fn fov_radius(self) -> f64 {
        match self {
            FovProfile::Wide => 250.0,
            FovProfile::Narrow => 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub profile: FovProfile,

    /// Overrides the profile's full wedge width (degrees).
    pub fov_angle: Option<f64>,
    /// Overrides the profile's wedge radius (meters).
    pub fov_radius: Option<f64>,

    /// Minimum movement before a new position is published.
    pub location_threshold_m: f64,
    /// Minimum heading change before a new heading is published.
    pub heading_threshold_deg: f64,

    /// Camera rotates only when it would turn by more than this.
    pub bearing_gate_deg: f64,
    /// Camera recenters only when the target moved by more than this.
    pub target_gate_m: f64,
    pub default_zoom: f64,

    pub arc_segments: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: FovProfile::default(),
            fov_angle: None,
            fov_radius: None,
            location_threshold_m: DEFAULT_LOCATION_THRESHOLD_M,
            heading_threshold_deg: DEFAULT_HEADING_THRESHOLD_DEG,
            bearing_gate_deg: DEFAULT_BEARING_GATE_DEG,
            target_gate_m: DEFAULT_TARGET_GATE_M,
            default_zoom: DEFAULT_ZOOM,
            arc_segments: fov_geo::DEFAULT_ARC_SEGMENTS,
        }
    }
}

impl EngineConfig {
    pub fn with_profile(profile: FovProfile) -> Self {
        Self { profile, ..Self::default() }
    }

    pub fn fov_angle(&self) -> f64 {
        self.fov_angle.unwrap_or_else(|| self.profile.fov_angle())
    }

    pub fn fov_radius(&self) -> f64 {
        self.fov_radius.unwrap_or_else(|| self.profile.fov_radius())
    }
}
