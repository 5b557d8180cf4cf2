pub mod camera;
pub mod classifier;
pub mod config;
pub mod doctor;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod places;
pub mod runtime;
pub mod source;

pub use camera::{
    bearing_decision, CameraBearingController, CameraState, CameraUpdate, CameraUpdateKind,
};
pub use classifier::{classify_places, Classification, PoiClassifier};
pub use config::{EngineConfig, FovProfile};
pub use engine::{EngineOutput, FovEngine};
pub use error::{EngineStopped, SampleError};
pub use fusion::{LocationFusion, LocationState};
pub use places::{HighlightSet, Place, PlaceSet};
pub use runtime::{spawn, Control, EngineHandle, EngineInputs};
