use std::collections::BTreeSet;

use fov_geo::{haversine_m, GeoPoint};
use serde::{Deserialize, Serialize};

/// Ids of the places currently inside the wedge.
pub type HighlightSet = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub overture_id: Option<String>,
    /// Reflected from the last classification; ignored on input.
    #[serde(default, skip_deserializing)]
    pub is_in_fov: bool,
}

impl Place {
    pub fn new(id: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            location,
            overture_id: None,
            is_in_fov: false,
        }
    }
}

/// The externally supplied places plus a revision that changes whenever the
/// membership or positions do.
#[derive(Debug, Clone, Default)]
pub struct PlaceSet {
    places: Vec<Place>,
    revision: u64,
}

impl PlaceSet {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places, revision: 1 }
    }

    pub fn replace(&mut self, places: Vec<Place>) {
        self.places = places;
        self.revision += 1;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn iter(&self) -> impl Iterator<Item = &Place> {
        self.places.iter()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    pub fn near(&self, location: GeoPoint, radius_m: f64) -> Vec<&Place> {
        self.places
            .iter()
            .filter(|p| haversine_m(location, p.location) <= radius_m)
            .collect()
    }

    /// Copies a classification result onto `is_in_fov`. Does not bump the
    /// revision: the flag is derived output, not input.
    pub fn apply_highlights(&mut self, highlights: &HighlightSet) {
        for p in &mut self.places {
            p.is_in_fov = highlights.contains(&p.id);
        }
    }
}
