use nalgebra::Vector3;
use regex::Regex;

use diag::Diagnostics;
use input::tables::{KeyTable, SoundHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    AllStop,
    AllPass,
    PlayerStop,
    PlayerPass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationType {
    Normal,
    ChangeEnds,
    Terminal,
}

/// One stop point of a station on the main rail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    pub position: f64,
    pub forward_tolerance: f64,
    pub backward_tolerance: f64,
    pub cars: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub key: String,
    pub name: String,
    pub arrival_time: Option<f64>,
    pub departure_time: Option<f64>,
    pub stop_mode: StopMode,
    pub station_type: StationType,
    pub open_left_doors: bool,
    pub open_right_doors: bool,
    pub stop_time: f64,
    pub forced_stop_signal: bool,
    pub alighting_time: f64,
    pub passenger_ratio: f64,
    pub arrival_sound: Option<SoundHandle>,
    pub departure_sound: Option<SoundHandle>,
    pub reopen_door: f64,
    pub interference_in_door: f64,
    /// Where arrival/departure sounds play from, filled in by the build.
    pub sound_origin: Option<Vector3<f64>>,
    pub stops: Vec<Stop>,
}

pub const DEFAULT_STOP_TIME: f64 = 15.0;
pub const MIN_STOP_TIME: f64 = 5.0;

impl Station {
    pub fn new(key: &str, name: &str) -> Station {
        Station {
            key: key.to_string(),
            name: name.to_string(),
            arrival_time: None,
            departure_time: None,
            stop_mode: StopMode::AllStop,
            station_type: StationType::Normal,
            open_left_doors: false,
            open_right_doors: false,
            stop_time: DEFAULT_STOP_TIME,
            forced_stop_signal: false,
            alighting_time: 0.0,
            passenger_ratio: 1.0,
            arrival_sound: None,
            departure_sound: None,
            reopen_door: 0.0,
            interference_in_door: 0.0,
            sound_origin: None,
            stops: Vec::new(),
        }
    }

    pub fn expects_stop(&self) -> bool {
        self.stop_mode == StopMode::AllStop || self.stop_mode == StopMode::PlayerStop
    }
}

#[derive(Debug, Fail, PartialEq, Eq)]
pub enum TimeError {
    #[fail(display = "invalid time of day: {}", _0)]
    Invalid(String),
    #[fail(display = "regex error: {}", _0)]
    Regex(String),
}

/// Parse a time of day (`h`, `h:mm` or `h:mm:ss`, `.` also accepted as
/// the separator) into seconds since midnight.
pub fn parse_time(text: &str) -> Result<f64, TimeError> {
    let re = Regex::new(r"^(\d{1,2})(?:[:.](\d{1,2})(?:[:.](\d{1,2}))?)?$")
        .map_err(|e| TimeError::Regex(format!("{:?}", e)))?;
    let caps = match re.captures(text.trim()) {
        Some(c) => c,
        None => return Err(TimeError::Invalid(text.to_string())),
    };
    let part = |i: usize| -> f64 {
        caps.get(i)
            .map(|m| m.as_str().parse::<f64>().unwrap_or(0.0))
            .unwrap_or(0.0)
    };
    Ok(3600.0 * part(1) + 60.0 * part(2) + part(3))
}

fn numeric_field(
    f: &[&str],
    idx: usize,
    default: f64,
    lineno: usize,
    diag: &mut Diagnostics,
) -> f64 {
    match f.get(idx) {
        None => default,
        Some(s) if s.is_empty() => default,
        Some(s) => match s.parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                diag.warning(format!(
                    "Station list line {}: {} is not a valid number, using {}",
                    lineno, s, default
                ));
                default
            }
        },
    }
}

/// Station list records:
/// `key, name, arrival, departure, stoptime, signal, alighting, ratio,
///  arr-sound, dep-sound, reopen, interference, doors`
/// The arrival field `p` (or empty) marks a pass-through station, the
/// departure field `t` a terminal. Stop times shorter than 5 s clamp to 5.
pub fn parse_station_list(
    content: &str,
    sounds: &KeyTable<SoundHandle>,
    diag: &mut Diagnostics,
) -> Vec<Station> {
    let mut stations = Vec::new();
    for (i, raw) in content.lines().enumerate() {
        let lineno = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("BveTs") {
            continue;
        }
        let f: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if f[0].is_empty() {
            diag.warning(format!("Station list line {}: missing station key", lineno));
            continue;
        }
        let name = if f.len() > 1 && !f[1].is_empty() { f[1] } else { f[0] };
        let mut st = Station::new(f[0], name);

        match f.get(2).cloned().unwrap_or("") {
            "" | "p" | "P" => st.stop_mode = StopMode::AllPass,
            s => match parse_time(s) {
                Ok(t) => st.arrival_time = Some(t),
                Err(e) => diag.warning(format!("Station list line {}: {}", lineno, e)),
            },
        }
        match f.get(3).cloned().unwrap_or("") {
            "" => {}
            "t" | "T" => st.station_type = StationType::Terminal,
            s => match parse_time(s) {
                Ok(t) => st.departure_time = Some(t),
                Err(e) => diag.warning(format!("Station list line {}: {}", lineno, e)),
            },
        }

        let stop_time = numeric_field(&f, 4, DEFAULT_STOP_TIME, lineno, diag);
        st.stop_time = if stop_time < MIN_STOP_TIME { MIN_STOP_TIME } else { stop_time };
        st.forced_stop_signal = numeric_field(&f, 5, 0.0, lineno, diag) != 0.0;
        st.alighting_time = numeric_field(&f, 6, 0.0, lineno, diag);
        st.passenger_ratio = numeric_field(&f, 7, 100.0, lineno, diag) / 100.0;

        st.arrival_sound = sound_field(&f, 8, sounds, diag);
        st.departure_sound = sound_field(&f, 9, sounds, diag);

        st.reopen_door = numeric_field(&f, 10, 0.0, lineno, diag) / 100.0;
        st.interference_in_door = numeric_field(&f, 11, 0.0, lineno, diag);

        match f.get(12).cloned().unwrap_or("").to_lowercase().as_str() {
            "l" => st.open_left_doors = true,
            "r" => st.open_right_doors = true,
            "b" => {
                st.open_left_doors = true;
                st.open_right_doors = true;
            }
            _ => {}
        }

        stations.push(st);
    }
    stations
}

fn sound_field(
    f: &[&str],
    idx: usize,
    sounds: &KeyTable<SoundHandle>,
    diag: &mut Diagnostics,
) -> Option<SoundHandle> {
    let key = f.get(idx).cloned().unwrap_or("");
    if key.is_empty() {
        return None;
    }
    let found = sounds.get(key).cloned();
    if found.is_none() {
        diag.warning(format!("The sound {} could not be found", key));
    }
    found
}
