use fov_geo::GeoPoint;
use tracing::info;

use crate::camera::{CameraBearingController, CameraState, CameraUpdate};
use crate::classifier::{Classification, PoiClassifier};
use crate::config::EngineConfig;
use crate::fusion::{LocationFusion, LocationState};
use crate::places::{HighlightSet, Place, PlaceSet};

/// Snapshots that changed as a result of one input. Empty means "no update".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    pub location: Option<LocationState>,
    pub highlights: Option<HighlightSet>,
    pub camera: Option<CameraState>,
    pub camera_update: Option<CameraUpdate>,
}

impl EngineOutput {
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.highlights.is_none()
            && self.camera.is_none()
            && self.camera_update.is_none()
    }
}

/// Synchronous composition of fusion, classification and camera gating.
/// One entry point per input; every call runs to completion before the next.
pub struct FovEngine {
    fusion: LocationFusion,
    classifier: PoiClassifier,
    camera: CameraBearingController,
    places: PlaceSet,
    stopped: bool,
}

impl FovEngine {
    pub fn new(cfg: &EngineConfig) -> Self {
        info!(
            "fov engine: angle={}° radius={}m arc_segments={}",
            cfg.fov_angle(),
            cfg.fov_radius(),
            cfg.arc_segments
        );
        Self {
            fusion: LocationFusion::new(cfg),
            classifier: PoiClassifier::new(),
            camera: CameraBearingController::new(cfg),
            places: PlaceSet::default(),
            stopped: false,
        }
    }

    pub fn location(&self) -> &LocationState {
        self.fusion.state()
    }

    pub fn camera(&self) -> &CameraState {
        self.camera.state()
    }

    pub fn highlights(&self) -> &HighlightSet {
        self.classifier.current()
    }

    pub fn places(&self) -> &PlaceSet {
        &self.places
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn on_position(&mut self, sample: Option<GeoPoint>) -> EngineOutput {
        if self.stopped {
            return EngineOutput::default();
        }
        let location = self.fusion.on_position(sample);
        self.after_location(location)
    }

    pub fn on_heading(&mut self, sample: Option<f64>) -> EngineOutput {
        if self.stopped {
            return EngineOutput::default();
        }
        let location = self.fusion.on_heading(sample);
        self.after_location(location)
    }

    pub fn on_secondary(&mut self, sample: Option<GeoPoint>) -> EngineOutput {
        if self.stopped {
            return EngineOutput::default();
        }
        EngineOutput { location: self.fusion.on_secondary(sample), ..EngineOutput::default() }
    }

    pub fn set_places(&mut self, places: Vec<Place>) -> EngineOutput {
        if self.stopped {
            return EngineOutput::default();
        }
        self.places.replace(places);
        info!("places: {} loaded", self.places.len());
        let highlights = self.reclassify();
        // fresh places carry no flags even when the highlight set is unchanged
        self.places.apply_highlights(self.classifier.current());
        EngineOutput { highlights, ..EngineOutput::default() }
    }

    pub fn on_map_loaded(&mut self) -> EngineOutput {
        if self.stopped || !self.camera.on_map_loaded() {
            return EngineOutput::default();
        }
        self.camera_output()
    }

    pub fn set_user_interacting(&mut self, interacting: bool) -> EngineOutput {
        if self.stopped || !self.camera.set_user_interacting(interacting) {
            return EngineOutput::default();
        }
        // a released gesture may leave the camera behind the heading
        self.camera_output()
    }

    /// Explicit camera move request, gated like heading-driven rotation.
    pub fn update_camera(
        &mut self,
        target: Option<GeoPoint>,
        bearing: f64,
        zoom: f64,
    ) -> EngineOutput {
        if self.stopped {
            return EngineOutput::default();
        }
        let Some(update) = self.camera.update_camera(target, bearing, zoom) else {
            return EngineOutput::default();
        };
        EngineOutput {
            camera: Some(self.camera.state().clone()),
            camera_update: Some(update),
            ..EngineOutput::default()
        }
    }

    pub fn toggle_overlay(&mut self) -> EngineOutput {
        if self.stopped {
            return EngineOutput::default();
        }
        let show = self.camera.toggle_overlay();
        self.classifier.set_enabled(show);
        EngineOutput {
            highlights: self.reclassify(),
            camera: Some(self.camera.state().clone()),
            ..EngineOutput::default()
        }
    }

    /// Returns false if the engine was already stopped.
    pub fn stop(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        info!("fov engine: stopped");
        self.stopped = true;
        true
    }

    fn after_location(&mut self, location: Option<LocationState>) -> EngineOutput {
        let Some(location) = location else {
            return EngineOutput::default();
        };
        let camera = self.camera_output();
        EngineOutput {
            highlights: self.reclassify(),
            location: Some(location),
            ..camera
        }
    }

    fn camera_output(&mut self) -> EngineOutput {
        let state = self.fusion.state();
        let update = self
            .camera
            .initial_position(state)
            .or_else(|| self.camera.on_heading(state.heading));
        EngineOutput {
            camera: Some(self.camera.state().clone()),
            camera_update: update,
            ..EngineOutput::default()
        }
    }

    fn reclassify(&mut self) -> Option<HighlightSet> {
        match self.classifier.classify(self.fusion.state(), &self.places) {
            Classification::Changed(set) => {
                self.places.apply_highlights(&set);
                Some(set)
            }
            Classification::Unchanged => None,
        }
    }
}
