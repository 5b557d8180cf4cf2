use fov_geo::{is_point_in_fov, GeoPoint};
use tracing::debug;

use crate::fusion::LocationState;
use crate::places::{HighlightSet, PlaceSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Inputs or result unchanged since the last pass.
    Unchanged,
    Changed(HighlightSet),
}

// Everything a classification pass depends on.
#[derive(Debug, Clone, PartialEq)]
struct Inputs {
    enabled: bool,
    location: Option<GeoPoint>,
    heading: f64,
    fov_angle: f64,
    fov_radius: f64,
    places_revision: u64,
}

/// Stateless core: ids of the places inside the wedge of `state`.
pub fn classify_places(state: &LocationState, places: &PlaceSet) -> HighlightSet {
    let Some(user) = state.primary_location else {
        return HighlightSet::new();
    };
    places
        .iter()
        .filter(|p| {
            is_point_in_fov(user, p.location, state.heading, state.fov_angle, state.fov_radius)
        })
        .map(|p| p.id.clone())
        .collect()
}

/// Remembers what it last classified against so repeated calls with the same
/// inputs are free. Never touches the places themselves.
pub struct PoiClassifier {
    enabled: bool,
    last: Option<Inputs>,
    current: HighlightSet,
    passes: u64,
}

impl Default for PoiClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PoiClassifier {
    pub fn new() -> Self {
        Self { enabled: true, last: None, current: HighlightSet::new(), passes: 0 }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn current(&self) -> &HighlightSet {
        &self.current
    }

    /// Number of full passes over the place set so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn classify(&mut self, state: &LocationState, places: &PlaceSet) -> Classification {
        let inputs = Inputs {
            enabled: self.enabled,
            location: state.primary_location,
            heading: state.heading,
            fov_angle: state.fov_angle,
            fov_radius: state.fov_radius,
            places_revision: places.revision(),
        };
        if self.last.as_ref() == Some(&inputs) {
            return Classification::Unchanged;
        }
        self.last = Some(inputs);

        let next = if self.enabled && state.primary_location.is_some() {
            self.passes += 1;
            classify_places(state, places)
        } else {
            HighlightSet::new()
        };

        if next == self.current {
            return Classification::Unchanged;
        }
        debug!(count = next.len(), "highlight set changed");
        self.current = next.clone();
        Classification::Changed(next)
    }
}
