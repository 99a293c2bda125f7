//! Trigger event assembly. Events are appended to the main rail (and,
//! for brightness, to every rail) in block order; events that
//! interpolate towards their successor are patched in place when the
//! successor appears.

use std::f64::INFINITY;

use nalgebra::Vector3;
use smallvec::SmallVec;

use build::geometry::INTERPOLATE_INTERVAL;
use build::sections;
use geom::Frame;
use input::blocks::{Block, Fog, SoundPlacementKind};
use input::stations::Station;
use input::tables::{BackgroundHandle, KeyTable, SoundHandle};
use track::{Event, EventKind, FogState, Section, Track};

/// Running values carried across blocks while events are assembled.
#[derive(Debug)]
pub struct AmbientState {
    pub run_sound: i32,
    pub flange_sound: i32,
    pub speed_limit: f64,
    pub brightness_value: f32,
    pub brightness_position: f64,
    /// Element and per-rail event indices of the last brightness node.
    brightness_events: Option<(usize, SmallVec<[usize; 4]>)>,
    pub fog: Fog,
    fog_event: Option<(usize, usize)>,
    pub initial_fog: Option<FogState>,
}

impl AmbientState {
    pub fn new(blocks: &[Block]) -> AmbientState {
        // brightness is constant before the first node
        let first = blocks.iter().filter_map(|b| b.brightness.first()).next();
        let (value, position) = match first {
            Some(s) => (s.value, s.position),
            None => (1.0, 0.0),
        };
        AmbientState {
            run_sound: 0,
            flange_sound: 0,
            speed_limit: INFINITY,
            brightness_value: value,
            brightness_position: position,
            brightness_events: None,
            fog: Fog::none_at(-INTERPOLATE_INTERVAL),
            fog_event: None,
            initial_fog: None,
        }
    }
}

/// Background change at the start of block `i`. The outgoing background
/// is the last one declared before this block; either index out of
/// range drops the event.
pub fn append_background(
    track0: &mut Track,
    n: usize,
    i: usize,
    blocks: &[Block],
    backgrounds: &[BackgroundHandle],
) {
    let cur = match blocks[i].background {
        Some(b) => b,
        None => return,
    };
    let mut typ = if i == 0 { cur } else { 0 };
    for j in (0..i).rev() {
        if let Some(b) = blocks[j].background {
            typ = b;
            break;
        }
    }
    if typ >= backgrounds.len() || cur >= backgrounds.len() {
        return;
    }
    track0.elements[n].events.push(Event {
        offset: 0.0,
        kind: EventKind::BackgroundChange {
            previous: backgrounds[typ],
            next: backgrounds[cur],
        },
    });
}

/// Brightness nodes of one block. Each node puts an event on every
/// rail and patches the previous node's events so both sides of the
/// linear segment are known.
pub fn append_brightness(
    tracks: &mut [Track],
    n: usize,
    block: &Block,
    amb: &mut AmbientState,
) {
    for sample in &block.brightness {
        let d = sample.position - amb.brightness_position;
        if let Some((pn, ref idxs)) = amb.brightness_events {
            for (j, &ei) in idxs.iter().enumerate() {
                if let EventKind::BrightnessChange {
                    ref mut next_value,
                    ref mut next_distance,
                    ..
                } = tracks[j].elements[pn].events[ei].kind
                {
                    *next_value = sample.value;
                    *next_distance = d;
                }
            }
        }
        let offset = sample.position - block.starting_distance;
        let mut idxs = SmallVec::new();
        for track in tracks.iter_mut() {
            idxs.push(track.elements[n].events.len());
            track.elements[n].events.push(Event {
                offset: offset,
                kind: EventKind::BrightnessChange {
                    value: sample.value,
                    previous_value: amb.brightness_value,
                    previous_distance: d,
                    next_value: sample.value,
                    next_distance: 0.0,
                },
            });
        }
        amb.brightness_events = Some((n, idxs));
        amb.brightness_value = sample.value;
        amb.brightness_position = sample.position;
    }
}

/// Fog change at the start of block `i`. The previous fog event's
/// `next` is patched to point here; the first fog of the route seeds
/// the initial fog state instead.
pub fn append_fog(
    track0: &mut Track,
    n: usize,
    i: usize,
    block: &Block,
    amb: &mut AmbientState,
) {
    let mut fog = match block.fog {
        Some(f) => f,
        None => return,
    };
    fog.position = block.starting_distance;
    if i == 0 && block.starting_distance == 0.0 {
        // the route starts inside this fog, so there is nothing to fade from
        amb.fog = fog;
    }
    let previous = amb.fog;
    let event = track0.elements[n].events.len();
    track0.elements[n].events.push(Event {
        offset: 0.0,
        kind: EventKind::FogChange { previous: previous, current: fog, next: fog },
    });
    match amb.fog_event {
        Some((pn, pe)) => {
            if let EventKind::FogChange { ref mut next, .. } =
                track0.elements[pn].events[pe].kind
            {
                *next = fog;
            }
        }
        None => {
            amb.initial_fog =
                Some(FogState { previous: previous, current: previous, next: fog });
        }
    }
    amb.fog_event = Some((n, event));
    amb.fog = fog;
}

/// Run and flange surface sound changes. A change applies to the whole
/// block, so mid-block declarations are pinned to the block start.
pub fn append_rail_sounds(
    track0: &mut Track,
    n: usize,
    block: &Block,
    amb: &mut AmbientState,
) {
    for sample in &block.run_sounds {
        if sample.index == amb.run_sound {
            continue;
        }
        let mut d = sample.position - block.starting_distance;
        if d > 0.0 {
            d = 0.0;
        }
        track0.elements[n].events.push(Event {
            offset: d,
            kind: EventKind::RailSounds {
                run: sample.index,
                flange: amb.flange_sound,
                previous_run: amb.run_sound,
                previous_flange: amb.flange_sound,
            },
        });
        amb.run_sound = sample.index;
    }
    for sample in &block.flange_sounds {
        if sample.index == amb.flange_sound {
            continue;
        }
        let mut d = sample.position - block.starting_distance;
        if d > 0.0 {
            d = 0.0;
        }
        track0.elements[n].events.push(Event {
            offset: d,
            kind: EventKind::RailSounds {
                run: amb.run_sound,
                flange: sample.index,
                previous_run: amb.run_sound,
                previous_flange: amb.flange_sound,
            },
        });
        amb.flange_sound = sample.index;
    }
}

pub fn append_joint_sound(track0: &mut Track, n: usize, block: &Block) {
    if block.joint_sound {
        track0.elements[n].events.push(Event {
            offset: 0.5 * INTERPOLATE_INTERVAL,
            kind: EventKind::PointSound,
        });
    }
}

/// Station start marker and departure sound origin. A stop in the block
/// moves the sound origin to the stop point.
pub fn append_station(
    track0: &mut Track,
    n: usize,
    block: &Block,
    stations: &mut [Station],
    position: &Vector3<f64>,
    frame: &Frame,
) {
    if let Some(s) = block.station {
        track0.elements[n].events.push(Event {
            offset: 0.0,
            kind: EventKind::StationStart { station: s },
        });
        stations[s].sound_origin = Some(door_sound_origin(&stations[s], position, frame));
    }
    if let Some(s) = block.stop {
        stations[s].sound_origin = Some(door_sound_origin(&stations[s], position, frame));
    }
}

fn door_sound_origin(
    station: &Station,
    position: &Vector3<f64>,
    frame: &Frame,
) -> Vector3<f64> {
    let dx = if station.open_left_doors && !station.open_right_doors {
        -5.0
    } else if station.open_right_doors && !station.open_left_doors {
        5.0
    } else {
        0.0
    };
    position + dx * frame.side + 3.0 * frame.up
}

pub fn append_limits(track0: &mut Track, n: usize, block: &Block, amb: &mut AmbientState) {
    for sample in &block.limits {
        track0.elements[n].events.push(Event {
            offset: sample.position - block.starting_distance,
            kind: EventKind::LimitChange {
                previous_speed: amb.speed_limit,
                next_speed: sample.speed,
            },
        });
        amb.speed_limit = sample.speed;
    }
}

/// Sounds triggered under the passing train. Unknown keys are dropped.
pub fn append_static_sounds(
    track0: &mut Track,
    n: usize,
    block: &Block,
    sounds: &KeyTable<SoundHandle>,
) {
    for placement in &block.sounds {
        if placement.kind != SoundPlacementKind::TrainStatic {
            continue;
        }
        if let Some(&sound) = sounds.get(&placement.key) {
            track0.elements[n].events.push(Event {
                offset: placement.position - block.starting_distance,
                kind: EventKind::SoundTrigger { sound: sound },
            });
        }
    }
}

/// Extends the section chain with the block's declared sections and
/// marks each boundary with a change event.
pub fn append_sections(
    track0: &mut Track,
    n: usize,
    block: &Block,
    sections: &mut Vec<Section>,
    speeds: &[f64],
) {
    for def in &block.sections {
        let m = sections::append(sections, def, speeds);
        track0.elements[n].events.push(Event {
            offset: def.position - block.starting_distance,
            kind: EventKind::SectionChange { previous: m - 1, next: m },
        });
    }
}

/// Transponder events, placed after the whole chain is known so that
/// forward section references can be validated.
pub fn append_transponders(track0: &mut Track, blocks: &[Block], section_count: usize) {
    for (i, block) in blocks.iter().enumerate() {
        for t in &block.transponders {
            if t.kind < 0 {
                continue;
            }
            let section = if t.section >= 0 && (t.section as usize) < section_count {
                Some(t.section as usize)
            } else {
                None
            };
            let offset = t.position - track0.elements[i].starting_distance;
            track0.elements[i].events.push(Event {
                offset: offset,
                kind: EventKind::Transponder { kind: t.kind, data: t.data, section: section },
            });
        }
    }
}

/// End-of-station markers at the last stop point plus its forward
/// tolerance, placed once all elements exist.
pub fn append_station_ends(track0: &mut Track, stations: &[Station]) {
    for (s, station) in stations.iter().enumerate() {
        let stop = match station.stops.last() {
            Some(stop) => *stop,
            None => continue,
        };
        let p = stop.position + stop.forward_tolerance;
        if let Some(k) = track0.element_at(p) {
            let offset = p - track0.elements[k].starting_distance;
            track0.elements[k].events.push(Event {
                offset: offset,
                kind: EventKind::StationEnd { station: s },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diag::Diagnostics;
    use geom::Frame;
    use input::blocks::{
        BrightnessSample, Color24, LimitSample, SoundIndexSample, SoundPlacement,
    };
    use input::stations::Stop;
    use nalgebra::Vector2;

    fn element(start: f64) -> ::track::TrackElement {
        ::track::TrackElement {
            starting_distance: start,
            position: Vector3::new(start, 0.0, 0.0),
            frame: Frame::from_heading(Vector2::new(1.0, 0.0), 0.0),
            pitch: 0.0,
            curve_radius: 0.0,
            curve_cant: 0.0,
            cant_tangent: 0.0,
            events: Vec::new(),
        }
    }

    fn tracks(n: usize, starts: &[f64]) -> Vec<Track> {
        (0..n)
            .map(|_| Track { elements: starts.iter().map(|&s| element(s)).collect() })
            .collect()
    }

    #[test]
    fn brightness_nodes_patch_their_predecessor_on_every_rail() {
        let mut blocks = vec![Block::at(0.0), Block::at(25.0)];
        blocks[0].brightness = vec![BrightnessSample { position: 10.0, value: 0.5 }];
        blocks[1].brightness = vec![BrightnessSample { position: 30.0, value: 1.0 }];
        let mut tr = tracks(2, &[0.0, 25.0]);
        let mut amb = AmbientState::new(&blocks);
        assert_eq!(amb.brightness_value, 0.5);
        assert_eq!(amb.brightness_position, 10.0);

        append_brightness(&mut tr, 0, &blocks[0], &mut amb);
        append_brightness(&mut tr, 1, &blocks[1], &mut amb);

        for track in &tr {
            assert_eq!(track.elements[0].events.len(), 1);
            assert_eq!(track.elements[1].events.len(), 1);
            match track.elements[0].events[0].kind {
                EventKind::BrightnessChange {
                    value,
                    previous_distance,
                    next_value,
                    next_distance,
                    ..
                } => {
                    assert_eq!(value, 0.5);
                    assert_eq!(previous_distance, 0.0);
                    assert_eq!(next_value, 1.0);
                    assert_eq!(next_distance, 20.0);
                }
                ref k => panic!("unexpected event {:?}", k),
            }
            match track.elements[1].events[0].kind {
                EventKind::BrightnessChange { value, next_distance, .. } => {
                    assert_eq!(value, 1.0);
                    // the last node stays constant
                    assert_eq!(next_distance, 0.0);
                }
                ref k => panic!("unexpected event {:?}", k),
            }
            assert_eq!(track.elements[1].events[0].offset, 5.0);
        }
    }

    #[test]
    fn first_fog_seeds_initial_state_and_later_fog_patches_next() {
        let fog_a = Fog {
            start: 10.0,
            end: 200.0,
            color: Color24 { r: 200, g: 200, b: 255 },
            position: 0.0,
        };
        let fog_b = Fog { start: 5.0, end: 100.0, color: Color24::GREY, position: 0.0 };
        let mut blocks = vec![Block::at(0.0), Block::at(25.0), Block::at(50.0)];
        blocks[1].fog = Some(fog_a);
        blocks[2].fog = Some(fog_b);
        let mut tr = tracks(1, &[0.0, 25.0, 50.0]);
        let mut amb = AmbientState::new(&blocks);

        for i in 0..blocks.len() {
            append_fog(&mut tr[0], i, i, &blocks[i], &mut amb);
        }

        // the fog before the first event is the disabled sentinel
        let initial = amb.initial_fog.unwrap();
        assert_eq!(initial.previous.start, ::input::blocks::NO_FOG_START);
        assert_eq!(initial.next.position, 25.0);
        match tr[0].elements[1].events[0].kind {
            EventKind::FogChange { previous, current, next } => {
                assert_eq!(previous.start, ::input::blocks::NO_FOG_START);
                assert_eq!(current.position, 25.0);
                assert_eq!(next.position, 50.0);
                assert_eq!(next.start, 5.0);
            }
            ref k => panic!("unexpected event {:?}", k),
        }
        match tr[0].elements[2].events[0].kind {
            EventKind::FogChange { previous, next, .. } => {
                assert_eq!(previous.position, 25.0);
                assert_eq!(next.position, 50.0);
            }
            ref k => panic!("unexpected event {:?}", k),
        }
    }

    #[test]
    fn fog_in_the_first_block_has_nothing_to_fade_from() {
        let fog = Fog { start: 50.0, end: 400.0, color: Color24::GREY, position: 0.0 };
        let mut blocks = vec![Block::at(0.0)];
        blocks[0].fog = Some(fog);
        let mut tr = tracks(1, &[0.0]);
        let mut amb = AmbientState::new(&blocks);
        append_fog(&mut tr[0], 0, 0, &blocks[0], &mut amb);
        let initial = amb.initial_fog.unwrap();
        assert_eq!(initial.previous.start, 50.0);
        assert_eq!(initial.current.start, 50.0);
        assert_eq!(initial.next.start, 50.0);
    }

    #[test]
    fn rail_sound_changes_are_pinned_to_the_block_start() {
        let mut blocks = vec![Block::at(0.0)];
        blocks[0].run_sounds = vec![
            SoundIndexSample { position: 10.0, index: 0 },
            SoundIndexSample { position: 15.0, index: 3 },
        ];
        blocks[0].flange_sounds = vec![SoundIndexSample { position: 20.0, index: 2 }];
        let mut tr = tracks(1, &[0.0]);
        let mut amb = AmbientState::new(&blocks);
        append_rail_sounds(&mut tr[0], 0, &blocks[0], &mut amb);
        // index 0 equals the ambient state and produces no event
        assert_eq!(tr[0].elements[0].events.len(), 2);
        let e = &tr[0].elements[0].events[0];
        assert_eq!(e.offset, 0.0);
        assert_eq!(
            e.kind,
            EventKind::RailSounds { run: 3, flange: 0, previous_run: 0, previous_flange: 0 }
        );
        let e = &tr[0].elements[0].events[1];
        assert_eq!(
            e.kind,
            EventKind::RailSounds { run: 3, flange: 2, previous_run: 3, previous_flange: 0 }
        );
        assert_eq!(amb.run_sound, 3);
        assert_eq!(amb.flange_sound, 2);
    }

    #[test]
    fn limits_chain_previous_speeds() {
        let mut blocks = vec![Block::at(0.0)];
        blocks[0].limits = vec![
            LimitSample { position: 5.0, speed: 20.0 },
            LimitSample { position: 20.0, speed: 10.0 },
        ];
        let mut tr = tracks(1, &[0.0]);
        let mut amb = AmbientState::new(&blocks);
        append_limits(&mut tr[0], 0, &blocks[0], &mut amb);
        match tr[0].elements[0].events[0].kind {
            EventKind::LimitChange { previous_speed, next_speed } => {
                assert!(previous_speed.is_infinite());
                assert_eq!(next_speed, 20.0);
            }
            ref k => panic!("unexpected event {:?}", k),
        }
        match tr[0].elements[0].events[1].kind {
            EventKind::LimitChange { previous_speed, next_speed } => {
                assert_eq!(previous_speed, 20.0);
                assert_eq!(next_speed, 10.0);
            }
            ref k => panic!("unexpected event {:?}", k),
        }
        assert_eq!(tr[0].elements[0].events[1].offset, 20.0);
    }

    #[test]
    fn background_uses_last_declared_as_previous() {
        let mut blocks = vec![Block::at(0.0), Block::at(25.0), Block::at(50.0)];
        blocks[0].background = Some(1);
        blocks[2].background = Some(0);
        let backgrounds = vec![7usize, 8usize];
        let mut tr = tracks(1, &[0.0, 25.0, 50.0]);
        for i in 0..blocks.len() {
            append_background(&mut tr[0], i, i, &blocks, &backgrounds);
        }
        assert_eq!(
            tr[0].elements[0].events[0].kind,
            EventKind::BackgroundChange { previous: 8, next: 8 }
        );
        assert!(tr[0].elements[1].events.is_empty());
        assert_eq!(
            tr[0].elements[2].events[0].kind,
            EventKind::BackgroundChange { previous: 8, next: 7 }
        );
    }

    #[test]
    fn background_out_of_range_is_dropped() {
        let mut blocks = vec![Block::at(0.0)];
        blocks[0].background = Some(3);
        let mut tr = tracks(1, &[0.0]);
        append_background(&mut tr[0], 0, 0, &blocks, &[7usize]);
        assert!(tr[0].elements[0].events.is_empty());
    }

    #[test]
    fn station_start_places_sound_origin_by_doors() {
        let mut station = Station::new("st", "Sakura");
        station.open_left_doors = true;
        let mut stations = vec![station];
        let mut blocks = vec![Block::at(0.0)];
        blocks[0].station = Some(0);
        let mut tr = tracks(1, &[0.0]);
        let frame = Frame::from_heading(Vector2::new(1.0, 0.0), 0.0);
        let position = Vector3::new(0.0, 0.0, 0.0);
        append_station(&mut tr[0], 0, &blocks[0], &mut stations, &position, &frame);
        assert_eq!(
            tr[0].elements[0].events[0],
            Event { offset: 0.0, kind: EventKind::StationStart { station: 0 } }
        );
        // left doors only: origin sits 5 m to the left of the track
        let origin = stations[0].sound_origin.unwrap();
        assert_eq!(origin, Vector3::new(0.0, 3.0, 5.0));
    }

    #[test]
    fn unknown_static_sound_is_dropped() {
        let mut sounds = KeyTable::new("sound");
        let mut diag = Diagnostics::new();
        sounds.insert("clack", 4usize, &mut diag);
        let mut blocks = vec![Block::at(0.0)];
        blocks[0].sounds = vec![
            SoundPlacement {
                key: "clack".to_string(),
                kind: SoundPlacementKind::TrainStatic,
                position: 6.0,
                x: 0.0,
                y: 0.0,
            },
            SoundPlacement {
                key: "missing".to_string(),
                kind: SoundPlacementKind::TrainStatic,
                position: 8.0,
                x: 0.0,
                y: 0.0,
            },
        ];
        let mut tr = tracks(1, &[0.0]);
        append_static_sounds(&mut tr[0], 0, &blocks[0], &sounds);
        assert_eq!(tr[0].elements[0].events.len(), 1);
        assert_eq!(
            tr[0].elements[0].events[0],
            Event { offset: 6.0, kind: EventKind::SoundTrigger { sound: 4 } }
        );
    }

    #[test]
    fn transponders_validate_section_references() {
        let mut blocks = vec![Block::at(0.0), Block::at(25.0)];
        blocks[0].transponders = vec![
            ::input::blocks::TransponderDef { position: 5.0, kind: -1, data: 0, section: 0 },
            ::input::blocks::TransponderDef { position: 10.0, kind: 0, data: 9, section: 1 },
        ];
        blocks[1].transponders =
            vec![::input::blocks::TransponderDef { position: 30.0, kind: 2, data: 0, section: 5 }];
        let mut tr = tracks(1, &[0.0, 25.0]);
        append_transponders(&mut tr[0], &blocks, 2);
        assert_eq!(tr[0].elements[0].events.len(), 1);
        assert_eq!(
            tr[0].elements[0].events[0],
            Event {
                offset: 10.0,
                kind: EventKind::Transponder { kind: 0, data: 9, section: Some(1) },
            }
        );
        assert_eq!(
            tr[0].elements[1].events[0],
            Event {
                offset: 5.0,
                kind: EventKind::Transponder { kind: 2, data: 0, section: None },
            }
        );
    }

    #[test]
    fn station_end_lands_after_the_last_stop() {
        let mut station = Station::new("st", "Kiso");
        station.stops.push(Stop {
            position: 60.0,
            forward_tolerance: 10.0,
            backward_tolerance: 10.0,
            cars: 4,
        });
        let stations = vec![station];
        let mut tr = tracks(1, &[0.0, 25.0, 50.0, 75.0]);
        append_station_ends(&mut tr[0], &stations);
        assert_eq!(
            tr[0].elements[2].events[0],
            Event { offset: 20.0, kind: EventKind::StationEnd { station: 0 } }
        );
    }

    #[test]
    fn sections_get_boundary_events() {
        let mut blocks = vec![Block::at(0.0)];
        blocks[0].sections = vec![::input::blocks::SectionDef {
            position: 12.0,
            aspects: vec![0, 4],
            departure_station: None,
        }];
        let mut tr = tracks(1, &[0.0]);
        let mut secs = Vec::new();
        sections::seed(&mut secs);
        append_sections(&mut tr[0], 0, &blocks[0], &mut secs, &[]);
        assert_eq!(secs.len(), 2);
        assert_eq!(
            tr[0].elements[0].events[0],
            Event { offset: 12.0, kind: EventKind::SectionChange { previous: 0, next: 1 } }
        );
    }
}
