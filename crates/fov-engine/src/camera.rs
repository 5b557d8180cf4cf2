//! Camera bearing gate. Decides whether the map should turn to follow the
//! fused heading; never animates anything itself.

use fov_geo::{angular_difference_deg, haversine_m, signed_delta_deg, GeoPoint};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::fusion::LocationState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraState {
    /// Set once by the map-loaded signal, never cleared.
    pub map_ready: bool,
    pub is_user_interacting: bool,
    pub bearing: f64,
    pub zoom: f64,
    pub target: Option<GeoPoint>,
    /// FOV overlay visibility; highlighting follows it.
    pub show_overlay: bool,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            map_ready: false,
            is_user_interacting: false,
            bearing: 0.0,
            zoom: crate::config::DEFAULT_ZOOM,
            target: None,
            show_overlay: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraUpdateKind {
    /// First framing once the map and a fix are both available.
    Initial,
    Rotate,
    Recenter,
}

/// What the external animator should move the camera to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraUpdate {
    pub kind: CameraUpdateKind,
    pub target: Option<GeoPoint>,
    pub bearing: f64,
    pub zoom: f64,
}

/// `Some(candidate)` when the camera should turn to `candidate`: nobody is
/// dragging the map and the shortest rotation exceeds `gate_deg`.
pub fn bearing_decision(
    candidate: f64,
    current: f64,
    is_user_interacting: bool,
    gate_deg: f64,
) -> Option<f64> {
    if is_user_interacting {
        return None;
    }
    let delta = signed_delta_deg(candidate, current);
    (delta.abs() > gate_deg).then_some(candidate)
}

pub struct CameraBearingController {
    bearing_gate_deg: f64,
    target_gate_m: f64,
    default_zoom: f64,
    state: CameraState,
    initially_positioned: bool,
}

impl CameraBearingController {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            bearing_gate_deg: cfg.bearing_gate_deg,
            target_gate_m: cfg.target_gate_m,
            default_zoom: cfg.default_zoom,
            state: CameraState { zoom: cfg.default_zoom, ..CameraState::default() },
            initially_positioned: false,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    /// Returns true the first time only.
    pub fn on_map_loaded(&mut self) -> bool {
        if self.state.map_ready {
            return false;
        }
        info!("map loaded");
        self.state.map_ready = true;
        true
    }

    /// Returns true if the flag actually changed.
    pub fn set_user_interacting(&mut self, interacting: bool) -> bool {
        if self.state.is_user_interacting == interacting {
            return false;
        }
        debug!(interacting, "camera interaction");
        self.state.is_user_interacting = interacting;
        true
    }

    /// Flips overlay visibility and returns the new value.
    pub fn toggle_overlay(&mut self) -> bool {
        self.state.show_overlay = !self.state.show_overlay;
        self.state.show_overlay
    }

    pub fn on_heading(&mut self, heading: f64) -> Option<CameraUpdate> {
        if !self.state.map_ready {
            return None;
        }
        let bearing = bearing_decision(
            heading,
            self.state.bearing,
            self.state.is_user_interacting,
            self.bearing_gate_deg,
        )?;
        self.state.bearing = bearing;
        Some(CameraUpdate {
            kind: CameraUpdateKind::Rotate,
            target: self.state.target,
            bearing,
            zoom: self.state.zoom,
        })
    }

    /// General camera move request. A `None` target keeps the current one.
    pub fn update_camera(
        &mut self,
        target: Option<GeoPoint>,
        bearing: f64,
        zoom: f64,
    ) -> Option<CameraUpdate> {
        if !self.state.map_ready || self.state.is_user_interacting {
            return None;
        }

        let target_changed = match (self.state.target, target) {
            (Some(current), Some(next)) => haversine_m(current, next) > self.target_gate_m,
            (_, next) => next.is_some(),
        };
        let bearing_changed =
            angular_difference_deg(bearing, self.state.bearing) > self.bearing_gate_deg;
        if !target_changed && !bearing_changed {
            return None;
        }

        self.state.target = target.or(self.state.target);
        self.state.bearing = bearing;
        self.state.zoom = zoom;
        Some(CameraUpdate {
            kind: CameraUpdateKind::Recenter,
            target: self.state.target,
            bearing,
            zoom,
        })
    }

    /// One-shot framing on the first primary fix after the map loads.
    pub fn initial_position(&mut self, location: &LocationState) -> Option<CameraUpdate> {
        if self.initially_positioned || !self.state.map_ready || self.state.is_user_interacting {
            return None;
        }
        let target = location.primary_location?;

        self.initially_positioned = true;
        self.state.target = Some(target);
        self.state.bearing = location.heading;
        self.state.zoom = self.default_zoom;
        info!("initial camera position at {:.6},{:.6}", target.lat, target.lon);
        Some(CameraUpdate {
            kind: CameraUpdateKind::Initial,
            target: Some(target),
            bearing: location.heading,
            zoom: self.default_zoom,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> CameraBearingController {
        let mut c = CameraBearingController::new(&EngineConfig::default());
        c.on_map_loaded();
        c
    }

    #[test]
    fn gate_passes_above_threshold() {
        assert_eq!(bearing_decision(11.2, 10.0, false, 1.0), Some(11.2));
        assert_eq!(bearing_decision(10.8, 10.0, false, 1.0), None);
        assert_eq!(bearing_decision(1.0, 10.0, false, 1.0), Some(1.0));
    }

    #[test]
    fn gate_blocks_while_interacting() {
        assert_eq!(bearing_decision(11.2, 10.0, true, 1.0), None);
        assert_eq!(bearing_decision(190.0, 10.0, true, 1.0), None);
    }

    #[test]
    fn gate_is_strict_and_wraps() {
        assert_eq!(bearing_decision(11.0, 10.0, false, 1.0), None);
        // 359.5 -> 0.7 is a 1.2° turn, not 358.8°
        assert_eq!(bearing_decision(0.7, 359.5, false, 1.0), Some(0.7));
        assert_eq!(bearing_decision(0.2, 359.5, false, 1.0), None);
        assert_eq!(bearing_decision(f64::NAN, 0.0, false, 1.0), None);
    }

    #[test]
    fn nothing_before_map_ready() {
        let mut c = CameraBearingController::new(&EngineConfig::default());
        assert!(c.on_heading(90.0).is_none());
        assert!(c.update_camera(Some(GeoPoint::new(1.0, 1.0)), 90.0, 16.0).is_none());
        assert!(c.on_map_loaded());
        assert!(!c.on_map_loaded());
        assert!(c.state().map_ready);
    }

    #[test]
    fn heading_rotates_and_tracks_current_bearing() {
        let mut c = ready();
        let u = c.on_heading(11.2).unwrap();
        assert_eq!(u.kind, CameraUpdateKind::Rotate);
        assert_eq!(u.bearing, 11.2);
        assert_eq!(c.state().bearing, 11.2);
        assert!(c.on_heading(12.0).is_none());
        assert!(c.on_heading(12.5).is_some());
    }

    #[test]
    fn interaction_suppresses_until_released() {
        let mut c = ready();
        assert!(c.set_user_interacting(true));
        assert!(!c.set_user_interacting(true));
        assert!(c.on_heading(90.0).is_none());
        assert_eq!(c.state().bearing, 0.0);
        c.set_user_interacting(false);
        assert_eq!(c.on_heading(90.0).map(|u| u.bearing), Some(90.0));
    }

    #[test]
    fn update_camera_needs_real_change() {
        let mut c = ready();
        let home = GeoPoint::new(37.0, -122.0);
        assert!(c.update_camera(Some(home), 0.0, 16.0).is_some());
        assert!(c.update_camera(Some(home), 0.5, 17.0).is_none());
        assert!(c.update_camera(None, 0.5, 16.0).is_none());
        let moved = fov_geo::destination_point(home, 2.0, 0.0);
        let u = c.update_camera(Some(moved), 0.5, 16.0).unwrap();
        assert_eq!(u.kind, CameraUpdateKind::Recenter);
        assert_eq!(u.target, Some(moved));
        // None keeps the current target
        let u = c.update_camera(None, 45.0, 16.0).unwrap();
        assert_eq!(u.target, Some(moved));
    }

    #[test]
    fn initial_position_fires_once() {
        let mut c = CameraBearingController::new(&EngineConfig::default());
        let mut loc = LocationState::default();
        assert!(c.initial_position(&loc).is_none());
        c.on_map_loaded();
        assert!(c.initial_position(&loc).is_none());

        loc.primary_location = Some(GeoPoint::new(37.0, -122.0));
        loc.heading = 33.0;
        let u = c.initial_position(&loc).unwrap();
        assert_eq!(u.kind, CameraUpdateKind::Initial);
        assert_eq!((u.bearing, u.zoom), (33.0, 16.0));
        assert!(c.initial_position(&loc).is_none());
    }

    #[test]
    fn overlay_toggles() {
        let mut c = ready();
        assert!(c.state().show_overlay);
        assert!(!c.toggle_overlay());
        assert!(c.toggle_overlay());
    }
}
