use anyhow::{Context, Result};
use fov_geo::GeoPoint;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::debug;

pub const DEFAULT_BAUD: u32 = 115_200;

/// One decoded sample. `None` payloads mean the sensor reported no value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    Position(Option<GeoPoint>),
    Heading(Option<f64>),
}

pub enum SensorSource {
    Serial(BufReader<SerialStream>),
    File { reader: BufReader<File>, follow: bool },
}

impl SensorSource {
    pub fn serial(dev: &str, baud: u32) -> Result<Self> {
        let port = tokio_serial::new(dev, baud)
            .open_native_async()
            .with_context(|| format!("open serial {}", dev))?;
        Ok(Self::Serial(BufReader::new(port)))
    }

    /// With `follow` the file is tailed like a live device; otherwise EOF ends
    /// the stream.
    pub fn file(path: &str, follow: bool) -> Result<Self> {
        let f = std::fs::File::open(path).with_context(|| format!("open nmea file {}", path))?;
        Ok(Self::File { reader: BufReader::new(File::from_std(f)), follow })
    }

    /// Next decodable event, or `None` at the end of a non-followed file.
    pub async fn next_event(&mut self) -> Result<Option<SensorEvent>> {
        let mut line = String::new();
        loop {
            line.clear();
            match self {
                SensorSource::Serial(r) => {
                    let n = r.read_line(&mut line).await.context("read serial")?;
                    anyhow::ensure!(n > 0, "serial port closed");
                }
                SensorSource::File { reader, follow } => {
                    let n = reader.read_line(&mut line).await.context("read nmea file")?;
                    if n == 0 {
                        if !*follow {
                            return Ok(None);
                        }
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        continue;
                    }
                }
            }
            if let Some(ev) = parse_sentence(line.trim()) {
                return Ok(Some(ev));
            }
        }
    }
}

// Supported sentences:
// - RMC: position, status V means no fix
// - HDT: true heading
// - THS: true heading with mode, mode V means invalid
pub fn parse_sentence(s: &str) -> Option<SensorEvent> {
    if s.is_empty() {
        return None;
    }
    let Some(body) = verify_checksum(s) else {
        debug!("nmea checksum mismatch: {}", s);
        return None;
    };
    let parts: Vec<&str> = body.split(',').collect();
    let kind = parts[0].strip_prefix('$')?.get(2..)?;

    match kind {
        "RMC" if parts.len() > 6 => {
            // parts[2]=status, parts[3]=lat ddmm.mmmm, parts[4]=N/S,
            // parts[5]=lon dddmm.mmmm, parts[6]=E/W
            if parts[2] != "A" {
                return Some(SensorEvent::Position(None));
            }
            let lat = parse_deg_min(parts[3], parts[4])?;
            let lon = parse_deg_min(parts[5], parts[6])?;
            Some(SensorEvent::Position(Some(GeoPoint { lat, lon })))
        }
        "HDT" if parts.len() > 1 => Some(SensorEvent::Heading(parse_heading(parts[1])?)),
        "THS" if parts.len() > 2 => {
            if parts[2] == "V" {
                return Some(SensorEvent::Heading(None));
            }
            Some(SensorEvent::Heading(parse_heading(parts[1])?))
        }
        _ => {
            debug!("ignoring nmea sentence {}", parts[0]);
            None
        }
    }
}

// Empty field is a valid "no heading"; garbage is not a sentence at all.
fn parse_heading(field: &str) -> Option<Option<f64>> {
    if field.is_empty() {
        return Some(None);
    }
    field.parse().ok().map(Some)
}

/// Strips and checks a trailing `*hh`. Sentences without one pass through.
fn verify_checksum(s: &str) -> Option<&str> {
    let Some((body, sum)) = s.split_once('*') else {
        return Some(s);
    };
    let expected = u8::from_str_radix(sum.trim(), 16).ok()?;
    (nmea_checksum(body) == expected).then_some(body)
}

pub fn nmea_checksum(body: &str) -> u8 {
    body.trim_start_matches('$').bytes().fold(0, |acc, b| acc ^ b)
}

fn parse_deg_min(v: &str, hemi: &str) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    // lat: ddmm.mmmm, lon: dddmm.mmmm
    let dot = v.find('.').unwrap_or(v.len());
    let deg_len = dot.checked_sub(2)?;
    let deg: f64 = v.get(..deg_len)?.parse().ok()?;
    let min: f64 = v.get(deg_len..)?.parse().ok()?;
    let mut out = deg + (min / 60.0);
    if hemi == "S" || hemi == "W" {
        out = -out;
    }
    Some(out)
}
