use anyhow::{Context, Result};
use fov_engine::source::{SensorSource, DEFAULT_BAUD};
use fov_engine::{EngineConfig, Place};
use serde::Deserialize;
use std::time::Duration;

/// Delay between replayed samples of a finite file, so subscribers see each one.
pub const DEFAULT_REPLAY_PACE_MS: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    /// Primary fix (and usually heading) stream.
    pub source: SourceCfg,
    /// Dedicated heading stream, when the compass is a separate device.
    pub heading: Option<SourceCfg>,
    /// Display-only reference track.
    pub secondary: Option<SourceCfg>,
    pub places: Option<PlacesCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceCfg {
    /// "nmea-serial" or "nmea-file"
    pub kind: String,
    pub nmea_device: Option<String>,
    pub nmea_file: Option<String>,
    pub baud: Option<u32>,
    #[serde(default)]
    pub follow: bool,
    /// Delay after each forwarded sample; 0 disables pacing.
    pub pace_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesCfg {
    pub file: String,
}

#[derive(Debug, Deserialize)]
struct PlacesFile {
    #[serde(default)]
    places: Vec<Place>,
}

impl SourceCfg {
    pub fn open(&self) -> Result<SensorSource> {
        match self.kind.as_str() {
            "nmea-serial" => SensorSource::serial(
                self.nmea_device.as_ref().context("nmea_device missing")?,
                self.baud.unwrap_or(DEFAULT_BAUD),
            ),
            "nmea-file" => {
                let path = self.nmea_file.as_ref().context("nmea_file missing")?;
                SensorSource::file(path, self.follow)
            }
            other => anyhow::bail!("unknown source kind: {}", other),
        }
    }

    /// Live sources run unpaced; a finite file replay defaults to
    /// [`DEFAULT_REPLAY_PACE_MS`].
    pub fn pace(&self) -> Option<Duration> {
        let default = match self.kind.as_str() {
            "nmea-file" if !self.follow => DEFAULT_REPLAY_PACE_MS,
            _ => 0,
        };
        match self.pace_ms.unwrap_or(default) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn check(&self, section: &str) -> Result<()> {
        match self.kind.as_str() {
            "nmea-serial" => {
                anyhow::ensure!(
                    self.nmea_device.as_ref().map(|s| !s.is_empty()).unwrap_or(false),
                    "{}.nmea_device missing",
                    section
                );
                anyhow::ensure!(self.baud.unwrap_or(DEFAULT_BAUD) > 0, "{}.baud invalid", section);
            }
            "nmea-file" => {
                anyhow::ensure!(self.nmea_file.is_some(), "{}.nmea_file missing", section);
            }
            other => anyhow::bail!("{}.kind unknown: {}", section, other),
        }
        Ok(())
    }
}

pub fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

pub fn load_places(cfg: &Config) -> Result<Vec<Place>> {
    let Some(p) = &cfg.places else { return Ok(Vec::new()); };
    let s = std::fs::read_to_string(&p.file).with_context(|| format!("read places {}", p.file))?;
    let file: PlacesFile = toml::from_str(&s).context("parse places toml")?;
    Ok(file.places)
}
