//! JSON summary of a built route, for inspection and regression diffs.

use failure::Error;
use serde::Serialize;
use serde_json;
use std::io;

use input::stations::{StationType, StopMode};
use track::Route;

#[derive(Debug, Serialize)]
pub struct RouteSummary {
    pub length: f64,
    pub rails: usize,
    pub elements: usize,
    pub events: usize,
    pub sections: Vec<SectionSummary>,
    pub stations: Vec<StationSummary>,
    pub objects: usize,
    pub signals: usize,
    pub world_sounds: usize,
    pub points_of_interest: Vec<PoiSummary>,
}

#[derive(Debug, Serialize)]
pub struct SectionSummary {
    pub track_position: f64,
    pub aspects: Vec<i32>,
    pub previous: Option<usize>,
    pub next: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StationSummary {
    pub name: String,
    pub stop_mode: &'static str,
    pub station_type: &'static str,
    pub stops: usize,
}

#[derive(Debug, Serialize)]
pub struct PoiSummary {
    pub track_position: f64,
    pub text: String,
}

fn stop_mode_name(mode: StopMode) -> &'static str {
    match mode {
        StopMode::AllStop => "all_stop",
        StopMode::AllPass => "all_pass",
        StopMode::PlayerStop => "player_stop",
        StopMode::PlayerPass => "player_pass",
    }
}

fn station_type_name(typ: StationType) -> &'static str {
    match typ {
        StationType::Normal => "normal",
        StationType::ChangeEnds => "change_ends",
        StationType::Terminal => "terminal",
    }
}

impl RouteSummary {
    pub fn from_route(route: &Route) -> RouteSummary {
        RouteSummary {
            length: route.length,
            rails: route.tracks.len(),
            elements: route.tracks.iter().map(|t| t.elements.len()).sum(),
            events: route
                .tracks
                .iter()
                .flat_map(|t| t.elements.iter())
                .map(|e| e.events.len())
                .sum(),
            sections: route
                .sections
                .iter()
                .map(|s| SectionSummary {
                    track_position: s.track_position,
                    aspects: s.aspects.iter().map(|a| a.number).collect(),
                    previous: s.previous_section,
                    next: s.next_section,
                })
                .collect(),
            stations: route
                .stations
                .iter()
                .map(|s| StationSummary {
                    name: s.name.clone(),
                    stop_mode: stop_mode_name(s.stop_mode),
                    station_type: station_type_name(s.station_type),
                    stops: s.stops.len(),
                })
                .collect(),
            objects: route.objects.len(),
            signals: route.signals.len(),
            world_sounds: route.world_sounds.len(),
            points_of_interest: route
                .points_of_interest
                .iter()
                .map(|p| PoiSummary {
                    track_position: p.track_position,
                    text: p.text.clone(),
                })
                .collect(),
        }
    }
}

pub fn write_json<W: io::Write>(route: &Route, f: &mut W) -> Result<(), Error> {
    let summary = RouteSummary::from_route(route);
    serde_json::to_writer_pretty(f, &summary)?;
    Ok(())
}
