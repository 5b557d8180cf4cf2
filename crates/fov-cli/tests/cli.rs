use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use fov_proto::event::{EventKind, FovEvent};

fn nmea(body: &str) -> String {
    let sum = body.trim_start_matches('$').bytes().fold(0u8, |acc, b| acc ^ b);
    format!("{}*{:02X}", body, sum)
}

fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path.to_str().unwrap().to_string()
}

fn wait_with_deadline(mut child: Child, limit: Duration) -> (String, String) {
    let mut stdout = child.stdout.take().unwrap();
    let mut stderr = child.stderr.take().unwrap();
    let out = std::thread::spawn(move || {
        let mut s = String::new();
        stdout.read_to_string(&mut s).unwrap();
        s
    });
    let err = std::thread::spawn(move || {
        let mut s = String::new();
        stderr.read_to_string(&mut s).unwrap();
        s
    });

    let start = Instant::now();
    loop {
        if child.try_wait().unwrap().is_some() {
            break;
        }
        if start.elapsed() > limit {
            child.kill().unwrap();
            panic!("fovscout did not exit within {:?}", limit);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    (out.join().unwrap(), err.join().unwrap())
}

fn fovscout(config: &str, args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_fovscout"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "info")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}

#[test]
fn replay_exits_and_prints_only_events() {
    let dir = tempfile::tempdir().unwrap();
    let mut track = Vec::new();
    for i in 0..5 {
        // 0.01' of latitude is about 18.5 m
        let minutes = 47.79 - 0.01 * i as f64;
        track.push(nmea(&format!("$GPRMC,1200{:02},A,37{:07.4},N,12223.640,W,,,,,", i, minutes)));
        track.push(nmea(&format!("$HEHDT,{:.1},T", 150.0 + 2.0 * i as f64)));
    }
    track.push(nmea("$GPRMC,120006,V,,,,,,,,,"));
    let nmea_path = write(&dir, "walk.nmea", &(track.join("\n") + "\n"));
    let places_path = write(
        &dir,
        "places.toml",
        "[[places]]\nid = \"pier\"\nlocation = { lat = 37.7950, lon = -122.3930 }\n",
    );
    let config = write(
        &dir,
        "fovscout.toml",
        &format!(
            "[source]\nkind = \"nmea-file\"\nnmea_file = {:?}\npace_ms = 150\n\
             [places]\nfile = {:?}\n",
            nmea_path, places_path
        ),
    );

    let (out, err) = wait_with_deadline(fovscout(&config, &["run"]), Duration::from_secs(15));

    let events: Vec<FovEvent> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not an event {:?}: {}", l, e)))
        .collect();
    let fixes = events.iter().filter(|e| e.kind == EventKind::Location).count();
    assert!(fixes >= 5, "only {} location events", fixes);
    assert!(events.iter().any(|e| e.kind == EventKind::Camera));
    let last_fix = events
        .iter()
        .rev()
        .find(|e| matches!(e.kind, EventKind::Location | EventKind::SignalLost));
    assert_eq!(last_fix.map(|e| e.kind), Some(EventKind::SignalLost));
    assert!(err.contains("primary source finished"));
}

#[test]
fn classify_logs_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let places_path = write(
        &dir,
        "places.toml",
        "[[places]]\nid = \"ahead\"\nlocation = { lat = 37.0009, lon = -122.0 }\n\
         [[places]]\nid = \"behind\"\nlocation = { lat = 36.9991, lon = -122.0 }\n",
    );
    let config = write(
        &dir,
        "fovscout.toml",
        &format!(
            "[source]\nkind = \"nmea-file\"\nnmea_file = \"x\"\n[places]\nfile = {:?}\n",
            places_path
        ),
    );

    let child = fovscout(&config, &["classify", "37.0", "-122.0", "0"]);
    let (out, err) = wait_with_deadline(child, Duration::from_secs(10));

    let ids: Vec<String> = out
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["id"].to_string())
        .collect();
    assert_eq!(ids, vec!["\"ahead\""]);
    assert!(err.contains("1 of 2 nearby places in view"));
}
