//! Drives the whole build: walks the block sequence accumulating the
//! world transform, creates track elements and their events, places
//! world geometry, then post-processes and finalizes the route.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use failure::Error;
use nalgebra::{Vector2, Vector3};
use ordered_float::OrderedFloat;

use build::cant;
use build::control::{BuildControl, BuildPhase};
use build::events::{self, AmbientState};
use build::geometry::{self, INTERPOLATE_INTERVAL};
use build::sections;
use diag::Diagnostics;
use geom::{direction3, Frame};
use input::blocks::{Block, RouteData, SoundPlacementKind, TiltMode};
use input::stations::{Station, StationType, StopMode};
use track::{
    Event, EventKind, InitialState, PlacedObject, PlacedSignal, PlacedSound,
    PointOfInterest, Route, Track, TrackElement,
};

/// Cancellation is polled every this many blocks.
pub const CANCEL_CHECK_INTERVAL: usize = 16;

#[derive(Debug)]
pub enum BuildOutcome {
    Completed(Route),
    Cancelled { blocks_built: usize },
}

/// Builds the route from parsed data. Progress and phase are published
/// through `control`; a cancel request stops the build at the next
/// check point and leaves the outcome partial.
pub fn build_route(
    data: &RouteData,
    control: &BuildControl,
    diag: &mut Diagnostics,
) -> BuildOutcome {
    control.set_phase(BuildPhase::BuildingBlocks);
    control.set_progress(0.0);
    debug!("building route from {} blocks", data.blocks.len());

    let nrails = data.rail_count();
    let mut tracks: Vec<Track> = (0..nrails).map(|_| Track::default()).collect();
    let mut sections = Vec::new();
    sections::seed(&mut sections);
    let mut amb = AmbientState::new(&data.blocks);
    let initial_brightness = amb.brightness_value;
    let mut stations = data.stations.clone();
    let mut objects = Vec::new();
    let mut signals = Vec::new();
    let mut world_sounds = Vec::new();

    let mut position = Vector3::zeros();
    let mut heading = Vector2::new(1.0, 0.0);

    let initial_background = data
        .blocks
        .first()
        .and_then(|b| b.background)
        .and_then(|b| data.backgrounds.get(b).cloned());

    let count = data.blocks.len();
    let step = if count > 0 { 0.9 / count as f64 } else { 0.9 };

    for i in 0..count {
        control.set_progress(i as f64 * step);
        if i % CANCEL_CHECK_INTERVAL == 0 {
            thread::sleep(Duration::from_millis(1));
            if control.is_cancelled() {
                info!("route build cancelled at block {} of {}", i, count);
                control.set_phase(BuildPhase::Cancelled);
                return BuildOutcome::Cancelled { blocks_built: i };
            }
        }

        heading = heading.normalize();
        let block = &data.blocks[i];
        let next = data.blocks.get(i + 1);
        let start = block.starting_distance;
        let interval = match next {
            Some(n) => n.starting_distance - start,
            None => INTERPOLATE_INTERVAL,
        };

        for (j, track) in tracks.iter_mut().enumerate() {
            let cant = if j == 0 { block.curve_cant } else { block.rail(j).cant };
            track.elements.push(TrackElement {
                starting_distance: start,
                position: position,
                frame: Frame::from_heading(heading, block.pitch),
                pitch: block.pitch,
                curve_radius: block.curve_radius,
                curve_cant: cant,
                cant_tangent: 0.0,
                events: Vec::new(),
            });
        }

        events::append_background(&mut tracks[0], i, i, &data.blocks, &data.backgrounds);
        events::append_brightness(&mut tracks, i, block, &mut amb);
        events::append_fog(&mut tracks[0], i, i, block, &mut amb);
        events::append_rail_sounds(&mut tracks[0], i, block, &mut amb);
        events::append_joint_sound(&mut tracks[0], i, block);
        let frame = tracks[0].elements[i].frame;
        events::append_station(&mut tracks[0], i, block, &mut stations, &position, &frame);
        events::append_limits(&mut tracks[0], i, block, &mut amb);
        events::append_static_sounds(&mut tracks[0], i, block, &data.sounds);
        events::append_sections(&mut tracks[0], i, block, &mut sections, &data.signal_speeds);

        place_rail_objects(&mut objects, data, block, next, &position, &heading, nrails, diag);
        place_cracks(&mut objects, data, block, next, &position, &heading, interval, diag);
        place_signals(
            &mut signals,
            data,
            block,
            next,
            &position,
            &heading,
            nrails,
            sections.len(),
            diag,
        );

        geometry::apply_turn(block.turn, &mut heading, &mut tracks[0].elements[i].frame);
        let adv =
            geometry::advance_heading(block.curve_radius, block.pitch, interval, &mut heading);

        let next_interval = match (next, data.blocks.get(i + 2)) {
            (Some(nb), Some(after)) => after.starting_distance - nb.starting_distance,
            _ => INTERPOLATE_INTERVAL,
        };
        let fallback = tracks[0].elements[i].frame;
        for j in 1..nrails {
            let (pos, frame) = geometry::rail_element_frame(
                &position,
                &heading,
                &adv,
                block,
                next,
                next_interval,
                j,
                &fallback,
            );
            tracks[j].elements[i].position = pos;
            tracks[j].elements[i].frame = frame;
        }

        place_world_sounds(&mut world_sounds, data, block, &position, &heading);

        position += Vector3::new(heading.x * adv.chord, adv.rise, heading.y * adv.chord);
        geometry::complete_rotation(&adv, &mut heading);
    }

    control.set_phase(BuildPhase::PostProcessing);
    control.set_progress(0.9);
    debug!("post-processing {} sections and {} stations", sections.len(), stations.len());

    events::append_transponders(&mut tracks[0], &data.blocks, sections.len());
    events::append_station_ends(&mut tracks[0], &stations);
    let mut points_of_interest = station_points_of_interest(&stations);
    points_of_interest.sort_by_key(|p| OrderedFloat(p.track_position));
    cant::apply(&mut tracks, &data.blocks);

    control.set_phase(BuildPhase::Finalizing);
    control.set_progress(0.97);

    for track in tracks.iter_mut() {
        track.elements.shrink_to_fit();
    }
    correct_stations(&mut stations, diag);

    let length = match tracks[0].elements.last() {
        Some(e) => e.starting_distance + INTERPOLATE_INTERVAL,
        None => 0.0,
    };
    if let Some(e) = tracks[0].elements.last_mut() {
        e.events.push(Event { offset: INTERPOLATE_INTERVAL, kind: EventKind::TrackEnd });
    }

    let route = Route {
        tracks: tracks,
        sections: sections,
        stations: stations,
        points_of_interest: points_of_interest,
        objects: objects,
        signals: signals,
        world_sounds: world_sounds,
        initial: InitialState {
            background: initial_background,
            brightness: initial_brightness,
            fog: amb.initial_fog,
        },
        length: length,
    };
    control.set_progress(1.0);
    control.set_phase(BuildPhase::Done);
    info!("route build finished: {:.0} m over {} blocks", length, count);
    BuildOutcome::Completed(route)
}

fn place_rail_objects(
    out: &mut Vec<PlacedObject>,
    data: &RouteData,
    block: &Block,
    next: Option<&Block>,
    position: &Vector3<f64>,
    heading: &Vector2<f64>,
    nrails: usize,
    diag: &mut Diagnostics,
) {
    for j in 0..nrails {
        for p in block.objects_on(j) {
            let object = match data.objects.get(&p.key) {
                Some(&o) => o,
                None => {
                    diag.warning(format!(
                        "The structure {} has not been declared and is ignored",
                        p.key
                    ));
                    continue;
                }
            };
            let (base, frame) = if j == 0 {
                geometry::primary_transform(position, heading, block, p.position, p.tilt)
            } else {
                geometry::rail_transform(
                    position, heading, block, next, j, p.position, p.span, p.tilt,
                )
            };
            let pos = base + p.x * frame.side + p.y * frame.up + p.z * frame.direction;
            out.push(PlacedObject {
                object: object,
                track_position: p.position,
                position: pos,
                frame: frame,
                yaw: p.yaw,
                pitch: p.pitch,
                roll: p.roll,
                span: p.span,
                stretch: None,
            });
        }
    }
}

fn place_cracks(
    out: &mut Vec<PlacedObject>,
    data: &RouteData,
    block: &Block,
    next: Option<&Block>,
    position: &Vector3<f64>,
    heading: &Vector2<f64>,
    interval: f64,
    diag: &mut Diagnostics,
) {
    for c in &block.cracks {
        let object = match data.objects.get(&c.key) {
            Some(&o) => o,
            None => {
                diag.warning(format!(
                    "The structure {} has not been declared and is ignored",
                    c.key
                ));
                continue;
            }
        };
        let (d0, d1) = geometry::crack_gaps(
            block,
            next,
            c.primary_rail,
            c.secondary_rail,
            c.position,
            interval,
        );
        let (pos, frame) = geometry::rail_transform(
            position,
            heading,
            block,
            next,
            c.primary_rail,
            c.position,
            interval,
            TiltMode::FOLLOW_ALL,
        );
        out.push(PlacedObject {
            object: object,
            track_position: c.position,
            position: pos,
            frame: frame,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            span: interval,
            stretch: Some((d0, d1)),
        });
    }
}

fn place_signals(
    out: &mut Vec<PlacedSignal>,
    data: &RouteData,
    block: &Block,
    next: Option<&Block>,
    position: &Vector3<f64>,
    heading: &Vector2<f64>,
    nrails: usize,
    section_count: usize,
    diag: &mut Diagnostics,
) {
    for j in 0..nrails {
        for s in block.signals_on(j) {
            let signal = match data.signals.get(&s.key) {
                Some(sd) => sd.clone(),
                None => {
                    diag.warning(format!(
                        "The signal {} has not been declared and is ignored",
                        s.key
                    ));
                    continue;
                }
            };
            if s.section >= section_count {
                diag.warning(format!(
                    "The signal {} references a section that does not exist and is ignored",
                    s.key
                ));
                continue;
            }
            let (base, frame) = if j == 0 {
                geometry::primary_transform(position, heading, block, s.position, s.tilt)
            } else {
                geometry::rail_transform(
                    position, heading, block, next, j, s.position, s.span, s.tilt,
                )
            };
            let pos = base + s.x * frame.side + s.y * frame.up + s.z * frame.direction;
            out.push(PlacedSignal {
                signal: signal,
                section: s.section,
                track_position: s.position,
                position: pos,
                frame: frame,
                yaw: s.yaw,
                pitch: s.pitch,
                roll: s.roll,
            });
        }
    }
}

/// World sound sources. The displacement along the track uses the mid
/// heading of the block, so sources inside curved blocks sit on the
/// chord rather than the arc.
fn place_world_sounds(
    out: &mut Vec<PlacedSound>,
    data: &RouteData,
    block: &Block,
    position: &Vector3<f64>,
    heading_mid: &Vector2<f64>,
) {
    for sp in &block.sounds {
        if sp.kind != SoundPlacementKind::World {
            continue;
        }
        if let Some(&sound) = data.sounds3d.get(&sp.key) {
            let d = sp.position - block.starting_distance;
            let w = direction3(*heading_mid, block.pitch);
            let s = Vector3::new(heading_mid.y, 0.0, -heading_mid.x);
            let u = w.cross(&s);
            out.push(PlacedSound {
                sound: sound,
                position: position + w * d + u * sp.y + s * sp.x,
            });
        }
    }
}

fn station_points_of_interest(stations: &[Station]) -> Vec<PointOfInterest> {
    let mut out = Vec::new();
    for station in stations {
        let stop = match station.stops.first() {
            Some(stop) => stop,
            None => continue,
        };
        let dx = if station.open_left_doors && !station.open_right_doors {
            -2.5
        } else if station.open_right_doors && !station.open_left_doors {
            2.5
        } else {
            0.0
        };
        out.push(PointOfInterest {
            track_position: stop.position,
            offset: Vector3::new(dx, 2.8, 0.0),
            text: station.name.clone(),
        });
    }
    out
}

/// Repairs station declarations that cannot work as declared. The last
/// station always terminates the route.
fn correct_stations(stations: &mut [Station], diag: &mut Diagnostics) {
    for s in 0..stations.len() {
        if stations[s].stops.is_empty() && stations[s].expects_stop() {
            stations[s].stop_mode = StopMode::AllPass;
            diag.warning(format!(
                "Station {} expects trains to stop but has no stop point, so it is converted to pass-through",
                stations[s].name
            ));
        }
        if stations[s].station_type == StationType::ChangeEnds {
            if s + 1 < stations.len() {
                if stations[s + 1].stop_mode != StopMode::AllStop {
                    stations[s + 1].stop_mode = StopMode::AllStop;
                    diag.warning(format!(
                        "Station {} follows a change-ends station and is converted to a stop for all trains",
                        stations[s + 1].name
                    ));
                }
            } else {
                stations[s].station_type = StationType::Terminal;
                diag.warning(format!(
                    "The change-ends station {} is the last station and is converted to a terminal station",
                    stations[s].name
                ));
            }
        }
    }
    if let Some(last) = stations.last_mut() {
        last.station_type = StationType::Terminal;
    }
}

/// Running build on its own thread, with the shared control handle.
pub struct BuildHandle {
    control: Arc<BuildControl>,
    worker: thread::JoinHandle<(BuildOutcome, Diagnostics)>,
}

impl BuildHandle {
    pub fn control(&self) -> Arc<BuildControl> {
        self.control.clone()
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn progress(&self) -> f64 {
        self.control.progress()
    }

    pub fn phase(&self) -> BuildPhase {
        self.control.phase()
    }

    pub fn join(self) -> (BuildOutcome, Diagnostics) {
        match self.worker.join() {
            Ok(result) => result,
            Err(panic) => ::std::panic::resume_unwind(panic),
        }
    }
}

/// Starts the build on a worker thread and returns immediately.
pub fn spawn_build(data: RouteData) -> Result<BuildHandle, Error> {
    let control = Arc::new(BuildControl::new());
    let thread_control = control.clone();
    let worker = thread::Builder::new()
        .name("route-build".to_string())
        .spawn(move || {
            let mut diag = Diagnostics::new();
            let outcome = build_route(&data, &thread_control, &mut diag);
            (outcome, diag)
        })?;
    Ok(BuildHandle { control: control, worker: worker })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::INFINITY;
    use approx::assert_relative_eq;
    use input::blocks::{
        BrightnessSample, LimitSample, ObjectPlacement, RailDef, SectionDef,
    };
    use input::stations::Stop;

    fn data_with_blocks(blocks: Vec<Block>) -> RouteData {
        let mut data = RouteData::new();
        data.blocks = blocks;
        data
    }

    fn build(data: &RouteData) -> (Route, Diagnostics) {
        let control = BuildControl::new();
        let mut diag = Diagnostics::new();
        match build_route(data, &control, &mut diag) {
            BuildOutcome::Completed(route) => (route, diag),
            BuildOutcome::Cancelled { .. } => panic!("build was cancelled"),
        }
    }

    #[test]
    fn straight_blocks_advance_along_x() {
        let mut data =
            data_with_blocks(vec![Block::at(0.0), Block::at(100.0), Block::at(250.0)]);
        data.blocks[0].limits = vec![LimitSample { position: 50.0, speed: 25.0 }];
        data.blocks[1].station = Some(0);
        data.stations = vec![Station::new("halt", "Byvik")];
        let (route, diag) = build(&data);
        let elements = &route.rail0().elements;
        assert_eq!(elements.len(), 3);
        assert_relative_eq!(elements[0].position, Vector3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(elements[1].position, Vector3::new(100.0, 0.0, 0.0));
        assert_relative_eq!(elements[2].position, Vector3::new(250.0, 0.0, 0.0));
        for e in elements {
            assert_relative_eq!(e.frame.direction, Vector3::new(1.0, 0.0, 0.0));
            assert_relative_eq!(e.frame.up, Vector3::new(0.0, 1.0, 0.0));
        }
        assert_relative_eq!(route.length, 275.0);
        let limit = Event {
            offset: 50.0,
            kind: EventKind::LimitChange { previous_speed: INFINITY, next_speed: 25.0 },
        };
        assert!(elements[0].events.contains(&limit));
        // the station has no stop point and is corrected to pass-through
        assert_eq!(route.stations[0].stop_mode, StopMode::AllPass);
        assert_eq!(diag.warnings().count(), 1);
        let last = elements.last().unwrap();
        assert_eq!(
            *last.events.last().unwrap(),
            Event { offset: 25.0, kind: EventKind::TrackEnd }
        );
    }

    #[test]
    fn empty_input_builds_an_empty_done_route() {
        let data = data_with_blocks(Vec::new());
        let control = BuildControl::new();
        let mut diag = Diagnostics::new();
        let outcome = build_route(&data, &control, &mut diag);
        match outcome {
            BuildOutcome::Completed(route) => {
                assert!(route.rail0().elements.is_empty());
                assert_eq!(route.length, 0.0);
                assert_eq!(route.sections.len(), 1);
            }
            BuildOutcome::Cancelled { .. } => panic!("build was cancelled"),
        }
        assert_eq!(control.phase(), BuildPhase::Done);
        assert_eq!(control.progress(), 1.0);
    }

    #[test]
    fn curved_block_displaces_by_the_chord() {
        let r = 300.0;
        let mut b0 = Block::at(0.0);
        b0.curve_radius = r;
        let data = data_with_blocks(vec![b0, Block::at(25.0)]);
        let (route, _) = build(&data);
        let p = route.rail0().elements[1].position;
        let arc = 25.0 / r;
        let chord = 2.0 * r * (0.5 * arc).sin();
        assert_relative_eq!(p.norm(), chord, epsilon = 1e-9);
        assert!(p.z < 0.0);
        let d = route.rail0().elements[1].frame.direction;
        assert_relative_eq!(d.x, arc.cos(), epsilon = 1e-9);
        assert_relative_eq!(d.z, -arc.sin(), epsilon = 1e-9);
    }

    #[test]
    fn frames_stay_orthonormal_through_curves_cant_and_turns() {
        let mut blocks = Vec::new();
        for i in 0..24 {
            let mut b = Block::at(25.0 * i as f64);
            b.curve_radius = match i % 4 {
                0 => 0.0,
                1 => 400.0,
                2 => -250.0,
                _ => 600.0,
            };
            b.pitch = if i % 3 == 0 { 0.025 } else { -0.01 };
            b.curve_cant = if i % 5 == 0 { 0.08 } else { 0.0 };
            if i == 7 {
                b.turn = 0.02;
            }
            b.rails = vec![
                RailDef::default(),
                RailDef { x: 3.8, y: 0.1, cant: 0.05, ..Default::default() },
            ];
            blocks.push(b);
        }
        let mut data = data_with_blocks(blocks);
        data.rail_keys = vec!["0".to_string(), "siding".to_string()];
        let (route, _) = build(&data);
        assert_eq!(route.tracks.len(), 2);
        for track in &route.tracks {
            for e in &track.elements {
                let f = &e.frame;
                assert_relative_eq!(f.direction.norm(), 1.0, epsilon = 1e-9);
                assert_relative_eq!(f.side.norm(), 1.0, epsilon = 1e-9);
                assert_relative_eq!(f.up.norm(), 1.0, epsilon = 1e-9);
                assert_relative_eq!(f.direction.dot(&f.side), 0.0, epsilon = 1e-9);
                assert_relative_eq!(f.direction.dot(&f.up), 0.0, epsilon = 1e-9);
                assert_relative_eq!(f.side.dot(&f.up), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn aux_rail_elements_sit_at_their_offsets() {
        let mut blocks = vec![Block::at(0.0), Block::at(25.0)];
        for b in blocks.iter_mut() {
            b.rails = vec![
                RailDef::default(),
                RailDef { x: 4.0, y: 0.5, ..Default::default() },
            ];
        }
        let mut data = data_with_blocks(blocks);
        data.rail_keys = vec!["0".to_string(), "1".to_string()];
        let (route, _) = build(&data);
        let e = &route.tracks[1].elements[0];
        assert_relative_eq!(e.position, Vector3::new(0.0, 0.5, -4.0));
        assert_relative_eq!(e.frame.direction, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn sections_chain_and_signal_is_placed() {
        let mut diag = Diagnostics::new();
        let mut data = data_with_blocks(vec![Block::at(0.0), Block::at(25.0)]);
        data.signal_speeds = vec![0.0, 6.94, 15.28];
        data.objects.insert("sig2", 11usize, &mut diag);
        data.signals.insert(
            "sig",
            ::input::tables::SignalData {
                key: "sig".to_string(),
                numbers: vec![0, 2, 4],
                objects: vec![Some(11), Some(11), Some(11)],
            },
            &mut diag,
        );
        data.blocks[1].sections = vec![SectionDef {
            position: 25.0,
            aspects: vec![0, 2, 4],
            departure_station: None,
        }];
        data.blocks[1].signals = vec![
            Vec::new(),
        ];
        data.blocks[1].signals[0].push(::input::blocks::SignalPlacement {
            key: "sig".to_string(),
            position: 25.0,
            section: 1,
            x: -3.0,
            y: 4.5,
            z: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            tilt: TiltMode::default(),
            span: 0.0,
        });
        let (route, diag) = build(&data);
        assert_eq!(route.sections.len(), 2);
        assert_eq!(route.sections[0].next_section, Some(1));
        assert_eq!(route.sections[1].previous_section, Some(0));
        assert_eq!(route.sections[1].track_position, 25.0);
        assert_eq!(route.signals.len(), 1);
        assert_eq!(route.signals[0].section, 1);
        assert_relative_eq!(route.signals[0].position.y, 4.5);
        assert!(diag.warnings().next().is_none());
        let has_change = route.rail0().elements[1]
            .events
            .iter()
            .any(|e| e.kind == EventKind::SectionChange { previous: 0, next: 1 });
        assert!(has_change);
    }

    #[test]
    fn missing_structure_key_is_reported_and_skipped() {
        let mut data = data_with_blocks(vec![Block::at(0.0)]);
        data.blocks[0].objects = vec![vec![ObjectPlacement {
            key: "ghost".to_string(),
            position: 5.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            tilt: TiltMode::default(),
            span: 0.0,
        }]];
        let (route, diag) = build(&data);
        assert!(route.objects.is_empty());
        assert_eq!(diag.warnings().count(), 1);
    }

    #[test]
    fn initial_state_reflects_the_first_block() {
        let mut data = data_with_blocks(vec![Block::at(0.0), Block::at(25.0)]);
        data.backgrounds = vec![40usize, 41usize];
        data.blocks[0].background = Some(1);
        data.blocks[1].brightness = vec![BrightnessSample { position: 30.0, value: 0.25 }];
        let (route, _) = build(&data);
        assert_eq!(route.initial.background, Some(41));
        assert_eq!(route.initial.brightness, 0.25);
        assert!(route.initial.fog.is_none());
    }

    #[test]
    fn cancelled_before_start_builds_nothing() {
        let data = data_with_blocks(vec![Block::at(0.0), Block::at(25.0)]);
        let control = BuildControl::new();
        control.cancel();
        let mut diag = Diagnostics::new();
        match build_route(&data, &control, &mut diag) {
            BuildOutcome::Cancelled { blocks_built } => assert_eq!(blocks_built, 0),
            BuildOutcome::Completed(_) => panic!("cancelled build completed"),
        }
        assert_eq!(control.phase(), BuildPhase::Cancelled);
    }

    #[test]
    fn spawned_build_cancels_at_a_check_point() {
        let blocks = (0..4096).map(|i| Block::at(25.0 * i as f64)).collect();
        let data = data_with_blocks(blocks);
        let handle = spawn_build(data).unwrap();
        handle.cancel();
        let (outcome, _) = handle.join();
        match outcome {
            BuildOutcome::Cancelled { blocks_built } => {
                assert_eq!(blocks_built % CANCEL_CHECK_INTERVAL, 0);
                assert!(blocks_built < 4096);
            }
            BuildOutcome::Completed(_) => panic!("cancel was ignored"),
        }
    }

    #[test]
    fn spawned_build_completes_and_reports_done() {
        let blocks = (0..32).map(|i| Block::at(25.0 * i as f64)).collect();
        let data = data_with_blocks(blocks);
        let handle = spawn_build(data).unwrap();
        let control = handle.control();
        let (outcome, _) = handle.join();
        match outcome {
            BuildOutcome::Completed(route) => {
                assert_eq!(route.rail0().elements.len(), 32)
            }
            BuildOutcome::Cancelled { .. } => panic!("build was cancelled"),
        }
        assert_eq!(control.phase(), BuildPhase::Done);
        assert_eq!(control.progress(), 1.0);
    }

    #[test]
    fn stations_get_pois_ends_and_corrections() {
        let mut station_a = Station::new("a", "Asahi");
        station_a.open_left_doors = true;
        station_a.stops.push(Stop {
            position: 30.0,
            forward_tolerance: 5.0,
            backward_tolerance: 5.0,
            cars: 4,
        });
        let station_b = Station::new("b", "Beppu");
        let mut data = data_with_blocks(vec![
            Block::at(0.0),
            Block::at(25.0),
            Block::at(50.0),
            Block::at(75.0),
        ]);
        data.blocks[1].station = Some(0);
        data.blocks[1].stop = Some(0);
        data.blocks[3].station = Some(1);
        data.stations = vec![station_a, station_b];
        let (route, diag) = build(&data);

        assert_eq!(route.points_of_interest.len(), 1);
        let poi = &route.points_of_interest[0];
        assert_eq!(poi.track_position, 30.0);
        assert_eq!(poi.offset, Vector3::new(-2.5, 2.8, 0.0));
        assert_eq!(poi.text, "Asahi");

        // stop at 30 m + 5 m tolerance lands in the second element
        let has_end = route.rail0().elements[1]
            .events
            .iter()
            .any(|e| *e == Event { offset: 10.0, kind: EventKind::StationEnd { station: 0 } });
        assert!(has_end);

        // the second station has no stop point and the route must still end somewhere
        assert_eq!(route.stations[1].stop_mode, StopMode::AllPass);
        assert_eq!(route.stations[1].station_type, StationType::Terminal);
        assert!(diag.warnings().count() >= 1);
    }

    #[test]
    fn change_ends_station_forces_the_next_stop() {
        let mut stations = vec![Station::new("a", "Aizu"), Station::new("b", "Banda")];
        stations[0].station_type = StationType::ChangeEnds;
        stations[1].stop_mode = StopMode::PlayerStop;
        for (i, s) in stations.iter_mut().enumerate() {
            s.stops.push(Stop {
                position: 25.0 * i as f64,
                forward_tolerance: 5.0,
                backward_tolerance: 5.0,
                cars: 2,
            });
        }
        let mut diag = Diagnostics::new();
        correct_stations(&mut stations, &mut diag);
        assert_eq!(stations[1].stop_mode, StopMode::AllStop);
        assert_eq!(stations[1].station_type, StationType::Terminal);
        assert_eq!(diag.warnings().count(), 1);
    }

    #[test]
    fn rebuilding_the_same_data_gives_the_same_cant() {
        let mut blocks = Vec::new();
        for i in 0..10 {
            let mut b = Block::at(25.0 * i as f64);
            b.curve_cant = match i % 4 {
                1 => 0.06,
                2 => -0.06,
                _ => 0.0,
            };
            blocks.push(b);
        }
        let data = data_with_blocks(blocks);
        let (first, _) = build(&data);
        let (second, _) = build(&data);
        let a: Vec<f64> = first.rail0().elements.iter().map(|e| e.curve_cant).collect();
        let b: Vec<f64> = second.rail0().elements.iter().map(|e| e.curve_cant).collect();
        assert_eq!(a, b);
        let ta: Vec<f64> = first.rail0().elements.iter().map(|e| e.cant_tangent).collect();
        let tb: Vec<f64> = second.rail0().elements.iter().map(|e| e.cant_tangent).collect();
        assert_eq!(ta, tb);
    }

    #[test]
    fn speed_limits_and_transponders_reach_the_timeline() {
        let mut data = data_with_blocks(vec![Block::at(0.0), Block::at(25.0)]);
        data.blocks[0].limits = vec![LimitSample { position: 10.0, speed: 25.0 }];
        data.blocks[1].transponders = vec![::input::blocks::TransponderDef {
            position: 30.0,
            kind: 0,
            data: 12,
            section: 0,
        }];
        let (route, _) = build(&data);
        let limit = route.rail0().elements[0].events.iter().any(|e| {
            e.kind
                == EventKind::LimitChange {
                    previous_speed: INFINITY,
                    next_speed: 25.0,
                }
        });
        assert!(limit);
        let transponder = route.rail0().elements[1].events.iter().any(|e| {
            *e == Event {
                offset: 5.0,
                kind: EventKind::Transponder { kind: 0, data: 12, section: Some(0) },
            }
        });
        assert!(transponder);
    }
}
