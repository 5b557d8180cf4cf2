//! Location/heading fusion.
//!
//! Position and heading arrive on independent streams at sensor rate. Each
//! stream is gated by its own hysteresis threshold against the last value
//! that was actually published; a sample that clears its gate republishes
//! the whole snapshot with the wedge rebuilt from the current pair.

use fov_geo::{angular_difference_deg, compute_fov_sector_points, haversine_m, FovSector, GeoPoint};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{check_heading, check_position};

// Float noise allowance so that a delta of exactly the threshold still passes.
const DISTANCE_EPSILON_M: f64 = 1e-6;
const ANGLE_EPSILON_DEG: f64 = 1e-9;

/// Immutable, whole-value snapshot of where the observer is and what it sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationState {
    pub primary_location: Option<GeoPoint>,
    /// Display-only reference track; never feeds the wedge.
    pub secondary_location: Option<GeoPoint>,
    pub heading: f64,
    pub fov_angle: f64,
    pub fov_radius: f64,
    /// `[center, arc..]`, empty iff `primary_location` is `None`.
    pub fov_boundary: Vec<GeoPoint>,
    /// Bumped on every published snapshot.
    pub revision: u64,
}

impl LocationState {
    pub fn empty(fov_angle: f64, fov_radius: f64) -> Self {
        Self {
            primary_location: None,
            secondary_location: None,
            heading: 0.0,
            fov_angle,
            fov_radius,
            fov_boundary: Vec::new(),
            revision: 0,
        }
    }

    pub fn sector(&self) -> Option<FovSector> {
        self.primary_location.map(|center| FovSector {
            center,
            heading: self.heading,
            fov_angle: self.fov_angle,
            radius_m: self.fov_radius,
        })
    }
}

impl Default for LocationState {
    fn default() -> Self {
        let cfg = EngineConfig::default();
        Self::empty(cfg.fov_angle(), cfg.fov_radius())
    }
}

pub struct LocationFusion {
    location_threshold_m: f64,
    heading_threshold_deg: f64,
    arc_segments: usize,
    state: LocationState,
    heading_seen: bool,
}

impl LocationFusion {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            location_threshold_m: cfg.location_threshold_m,
            heading_threshold_deg: cfg.heading_threshold_deg,
            arc_segments: cfg.arc_segments,
            state: LocationState::empty(cfg.fov_angle(), cfg.fov_radius()),
            heading_seen: false,
        }
    }

    pub fn state(&self) -> &LocationState {
        &self.state
    }

    /// `None` means the position source lost its fix.
    pub fn on_position(&mut self, sample: Option<GeoPoint>) -> Option<LocationState> {
        let Some(raw) = sample else {
            if self.state.primary_location.take().is_none() {
                debug!("position signal lost (already empty)");
                return None;
            }
            info!("position signal lost; clearing fov boundary");
            self.rebuild_boundary();
            return Some(self.publish());
        };

        let p = match check_position(raw) {
            Ok(p) => p,
            Err(e) => {
                warn!("dropping position sample: {}", e);
                return None;
            }
        };

        if let Some(last) = self.state.primary_location {
            let moved = haversine_m(last, p);
            if moved + DISTANCE_EPSILON_M < self.location_threshold_m {
                debug!(moved_m = moved, "position below threshold");
                return None;
            }
        }

        self.state.primary_location = Some(p);
        self.rebuild_boundary();
        Some(self.publish())
    }

    /// `None` means the heading source went quiet; the last heading is kept.
    pub fn on_heading(&mut self, sample: Option<f64>) -> Option<LocationState> {
        let Some(raw) = sample else {
            debug!("heading signal lost; keeping {:.1}", self.state.heading);
            return None;
        };

        let h = match check_heading(raw) {
            Ok(h) => h,
            Err(e) => {
                warn!("dropping heading sample: {}", e);
                return None;
            }
        };

        if self.heading_seen {
            let turned = angular_difference_deg(self.state.heading, h);
            if turned + ANGLE_EPSILON_DEG < self.heading_threshold_deg {
                debug!(turned_deg = turned, "heading below threshold");
                return None;
            }
        }

        self.heading_seen = true;
        self.state.heading = h;
        self.rebuild_boundary();
        Some(self.publish())
    }

    pub fn on_secondary(&mut self, sample: Option<GeoPoint>) -> Option<LocationState> {
        let next = match sample.map(check_position).transpose() {
            Ok(next) => next,
            Err(e) => {
                warn!("dropping secondary position sample: {}", e);
                return None;
            }
        };
        if next == self.state.secondary_location {
            return None;
        }
        self.state.secondary_location = next;
        Some(self.publish())
    }

    fn rebuild_boundary(&mut self) {
        self.state.fov_boundary = match self.state.primary_location {
            Some(center) => compute_fov_sector_points(
                center,
                self.state.heading,
                self.state.fov_angle,
                self.state.fov_radius,
                self.arc_segments,
            ),
            None => Vec::new(),
        };
    }

    fn publish(&mut self) -> LocationState {
        self.state.revision += 1;
        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fov_geo::{destination_point, initial_bearing_deg};
    use proptest::prelude::*;

    const HOME: GeoPoint = GeoPoint::new(37.0, -122.0);

    fn fusion() -> LocationFusion {
        LocationFusion::new(&EngineConfig::default())
    }

    #[test]
    fn first_position_always_emits() {
        let mut f = fusion();
        let s = f.on_position(Some(HOME)).expect("first sample");
        assert_eq!(s.primary_location, Some(HOME));
        assert_eq!(s.fov_boundary.len(), 21);
        assert_eq!(s.fov_boundary[0], HOME);
        assert_eq!(s.revision, 1);
    }

    #[test]
    fn repeated_position_is_suppressed() {
        let mut f = fusion();
        assert!(f.on_position(Some(HOME)).is_some());
        assert!(f.on_position(Some(HOME)).is_none());
        assert_eq!(f.state().revision, 1);
    }

    #[test]
    fn distance_threshold_is_inclusive() {
        let mut f = fusion();
        f.on_position(Some(HOME));
        assert!(f.on_position(Some(destination_point(HOME, 0.49, 10.0))).is_none());
        assert!(f.on_position(Some(destination_point(HOME, 0.5, 10.0))).is_some());

        let here = f.state().primary_location.unwrap();
        assert!(f.on_position(Some(destination_point(here, 3.0, 200.0))).is_some());
    }

    #[test]
    fn small_moves_do_not_accumulate_silently() {
        // the gate compares against the last *published* fix, so creeping
        // 0.3 m at a time publishes on the second step
        let mut f = fusion();
        f.on_position(Some(HOME));
        let a = destination_point(HOME, 0.3, 0.0);
        let b = destination_point(HOME, 0.6, 0.0);
        assert!(f.on_position(Some(a)).is_none());
        assert!(f.on_position(Some(b)).is_some());
    }

    #[test]
    fn heading_threshold_wraps_north() {
        let mut f = fusion();
        assert!(f.on_heading(Some(359.8)).is_some());
        // 0.3° across north
        assert!(f.on_heading(Some(0.1)).is_none());
        // 0.7° across north
        assert!(f.on_heading(Some(0.5)).is_some());
        assert_eq!(f.state().heading, 0.5);
    }

    #[test]
    fn heading_threshold_is_inclusive() {
        let mut f = fusion();
        f.on_heading(Some(10.0));
        assert!(f.on_heading(Some(10.4)).is_none());
        assert!(f.on_heading(Some(10.5)).is_some());
    }

    #[test]
    fn first_heading_emits_even_if_close_to_default() {
        let mut f = fusion();
        let s = f.on_heading(Some(0.2)).expect("first heading");
        assert_eq!(s.heading, 0.2);
        assert!(s.fov_boundary.is_empty());
    }

    #[test]
    fn heading_change_rebuilds_boundary_around_current_position() {
        let mut f = fusion();
        f.on_position(Some(HOME));
        let s = f.on_heading(Some(90.0)).unwrap();
        assert_eq!(s.fov_boundary[0], HOME);
        let mid = s.fov_boundary[1 + 10];
        // 20 arc points straddle the heading; the 11th sits just right of it
        let b = initial_bearing_deg(HOME, mid);
        assert!(angular_difference_deg(b, 90.0) < 68.0 / 19.0);
        assert_eq!(s.sector().unwrap().heading, 90.0);
    }

    #[test]
    fn signal_loss_clears_position_but_keeps_heading() {
        let mut f = fusion();
        f.on_heading(Some(45.0));
        f.on_position(Some(HOME));
        let s = f.on_position(None).expect("loss is a change");
        assert_eq!(s.primary_location, None);
        assert!(s.fov_boundary.is_empty());
        assert_eq!(s.heading, 45.0);

        assert!(f.on_position(None).is_none());
        // after a loss the next fix counts as a first fix
        assert!(f.on_position(Some(HOME)).is_some());
    }

    #[test]
    fn heading_loss_changes_nothing() {
        let mut f = fusion();
        f.on_heading(Some(45.0));
        assert!(f.on_heading(None).is_none());
        assert_eq!(f.state().heading, 45.0);
    }

    #[test]
    fn malformed_samples_keep_last_good_state() {
        let mut f = fusion();
        f.on_position(Some(HOME));
        f.on_heading(Some(12.0));
        let before = f.state().clone();

        assert!(f.on_position(Some(GeoPoint::new(f64::NAN, 1.0))).is_none());
        assert!(f.on_position(Some(GeoPoint::new(1.0, 181.0))).is_none());
        assert!(f.on_heading(Some(f64::NAN)).is_none());
        assert!(f.on_heading(Some(400.0)).is_none());
        assert!(f.on_secondary(Some(GeoPoint::new(f64::INFINITY, 0.0))).is_none());
        assert_eq!(f.state(), &before);
    }

    #[test]
    fn secondary_is_display_only() {
        let mut f = fusion();
        f.on_position(Some(HOME));
        let boundary = f.state().fov_boundary.clone();

        let s = f.on_secondary(Some(GeoPoint::new(37.001, -122.001))).unwrap();
        assert_eq!(s.primary_location, Some(HOME));
        assert_eq!(s.fov_boundary, boundary);
        assert!(f.on_secondary(Some(GeoPoint::new(37.001, -122.001))).is_none());
        assert!(f.on_secondary(None).unwrap().secondary_location.is_none());
    }

    #[test]
    fn zero_thresholds_publish_everything_new() {
        let cfg = EngineConfig {
            location_threshold_m: 0.0,
            heading_threshold_deg: 0.0,
            ..EngineConfig::default()
        };
        let mut f = LocationFusion::new(&cfg);
        f.on_position(Some(HOME));
        assert!(f.on_position(Some(destination_point(HOME, 0.01, 0.0))).is_some());
        f.on_heading(Some(1.0));
        assert!(f.on_heading(Some(1.0001)).is_some());
    }

    proptest! {
        #[test]
        fn repeated_sample_publishes_at_most_once(
            lat in -90.0f64..=90.0,
            lon in -180.0f64..=180.0,
            heading in 0.0f64..360.0,
        ) {
            let mut f = fusion();
            let p = GeoPoint::new(lat, lon);
            prop_assert!(f.on_position(Some(p)).is_some());
            prop_assert!(f.on_position(Some(p)).is_none());
            prop_assert!(f.on_heading(Some(heading)).is_some());
            prop_assert!(f.on_heading(Some(heading)).is_none());
            prop_assert_eq!(f.state().revision, 2);
            prop_assert_eq!(f.state().fov_boundary.len(), 21);
        }
    }
}
