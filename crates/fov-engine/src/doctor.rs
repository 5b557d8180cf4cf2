use std::collections::HashSet;

use anyhow::Result;

use crate::config::EngineConfig;
use crate::places::Place;

pub fn check_engine(cfg: &EngineConfig) -> Result<()> {
    let angle = cfg.fov_angle();
    let radius = cfg.fov_radius();
    anyhow::ensure!(angle > 0.0 && angle <= 360.0, "engine.fov_angle must be in (0, 360]");
    anyhow::ensure!(radius > 0.0 && radius.is_finite(), "engine.fov_radius must be > 0");
    anyhow::ensure!(cfg.location_threshold_m >= 0.0, "engine.location_threshold_m must be >= 0");
    anyhow::ensure!(
        cfg.heading_threshold_deg >= 0.0 && cfg.heading_threshold_deg < 180.0,
        "engine.heading_threshold_deg should be 0..180"
    );
    anyhow::ensure!(
        cfg.bearing_gate_deg >= 0.0 && cfg.bearing_gate_deg < 180.0,
        "engine.bearing_gate_deg should be 0..180"
    );
    anyhow::ensure!(cfg.target_gate_m >= 0.0, "engine.target_gate_m must be >= 0");
    anyhow::ensure!(cfg.arc_segments >= 2, "engine.arc_segments must be >= 2");
    anyhow::ensure!((0.0..=22.0).contains(&cfg.default_zoom), "engine.default_zoom out of range");
    Ok(())
}

pub fn check_places(places: &[Place]) -> Result<()> {
    let mut seen = HashSet::new();
    for p in places {
        anyhow::ensure!(!p.id.is_empty(), "place with empty id");
        anyhow::ensure!(seen.insert(p.id.as_str()), "duplicate place id {}", p.id);
        anyhow::ensure!(p.location.is_valid(), "place {} has invalid coordinates", p.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FovProfile;
    use fov_geo::GeoPoint;

    #[test]
    fn defaults_and_profiles_pass() {
        check_engine(&EngineConfig::default()).unwrap();
        check_engine(&EngineConfig::with_profile(FovProfile::Narrow)).unwrap();
    }

    #[test]
    fn rejects_bad_wedges() {
        let bad = EngineConfig { fov_angle: Some(0.0), ..EngineConfig::default() };
        assert!(check_engine(&bad).is_err());
        let bad = EngineConfig { fov_radius: Some(-1.0), ..EngineConfig::default() };
        assert!(check_engine(&bad).is_err());
        let bad = EngineConfig { arc_segments: 1, ..EngineConfig::default() };
        let err = check_engine(&bad).unwrap_err();
        assert!(err.to_string().contains("arc_segments"));
    }

    #[test]
    fn place_checks() {
        let ok = vec![
            Place::new("a", GeoPoint::new(1.0, 1.0)),
            Place::new("b", GeoPoint::new(2.0, 2.0)),
        ];
        check_places(&ok).unwrap();

        let dup = vec![
            Place::new("a", GeoPoint::new(1.0, 1.0)),
            Place::new("a", GeoPoint::new(2.0, 2.0)),
        ];
        assert!(check_places(&dup).unwrap_err().to_string().contains("duplicate"));

        let off = vec![Place::new("x", GeoPoint::new(95.0, 0.0))];
        assert!(check_places(&off).is_err());
    }
}
