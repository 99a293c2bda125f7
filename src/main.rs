extern crate platelayer;
extern crate failure;
extern crate structopt;
extern crate env_logger;

use platelayer::*;
use platelayer::input::blocks::{
    Block, BrightnessSample, Color24, CrackPlacement, Fog, LimitSample, ObjectPlacement,
    RailDef, SectionDef, SignalPlacement, SoundIndexSample, SoundPlacement,
    SoundPlacementKind, TiltMode, TransponderDef,
};
use platelayer::input::stations::{Station, Stop, StopMode};
use platelayer::input::tables::{self, ObjectHandle, ResourceLoader, SoundHandle};
use std::cmp::max;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

/// Platelayer -- train route geometry and timeline builder
#[derive(StructOpt, Debug)]
#[structopt(name="platelayer")]
struct Opt {
    /// Verbose mode (-v, -vv)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,

    /// Number of 25 m blocks in the generated route
    #[structopt(short = "n", long = "blocks", default_value = "240")]
    blocks: usize,

    /// Station list file in the comma-separated station list format
    #[structopt(short = "s", long = "stations", parse(from_os_str))]
    stations: Option<PathBuf>,

    /// Output JSON route summary file
    #[structopt(short = "j", long = "json", parse(from_os_str))]
    json: Option<PathBuf>,

    /// Request cancellation this many milliseconds into the build
    #[structopt(short = "c", long = "cancel-after")]
    cancel_after: Option<u64>,
}

static DEMO_STRUCTURES: &'static str = "\
rail, objects/rail.csv
pole, objects/pole.csv
platform, objects/platform.csv
gap, objects/gap.csv
sig_r, objects/sig_r.csv
sig_y, objects/sig_y.csv
sig_g, objects/sig_g.csv
";

static DEMO_SOUNDS: &'static str = "\
chime, sounds/chime.wav
brook, sounds/brook.wav
";

static DEMO_SIGNALS: &'static str = "\
main, 0, sig_r
main, 2, sig_y
main, 4, sig_g
";

/// Stands in for the host program's resource manager: every path is
/// accepted and handed the next resource slot.
struct SequentialLoader {
    next: usize,
}

impl ResourceLoader for SequentialLoader {
    fn object(&mut self, _path: &str) -> Option<ObjectHandle> {
        let handle = self.next;
        self.next += 1;
        Some(handle)
    }

    fn sound(&mut self, path: &str) -> Option<SoundHandle> {
        self.object(path)
    }
}

fn demo_stations() -> Vec<Station> {
    let mut west = Station::new("west", "Nishihara");
    west.open_right_doors = true;
    let mut mid = Station::new("mid", "Nakamachi");
    mid.open_left_doors = true;
    mid.stop_mode = StopMode::PlayerStop;
    let mut east = Station::new("east", "Higashiguchi");
    east.open_left_doors = true;
    vec![west, mid, east]
}

/// Synthesizes route data: gentle curves with cant, a climb, a tunnel
/// with fog and brightness fades, a siding with gap fillers, signalled
/// sections and the given stations spread evenly along the line.
fn demo_route(count: usize, mut stations: Vec<Station>, diag: &mut Diagnostics) -> RouteData {
    let mut data = RouteData::new();
    let mut loader = SequentialLoader { next: 0 };
    data.objects = tables::load_structure_list(DEMO_STRUCTURES, &mut loader, diag);
    data.sounds = tables::load_sound_list(DEMO_SOUNDS, &mut loader, diag);
    data.sounds3d = data.sounds.clone();
    data.signals = tables::load_signal_list(DEMO_SIGNALS, &data.objects, diag);
    data.signal_speeds = vec![0.0, 6.94, 15.28, 20.83];
    data.backgrounds = vec![0, 1];
    data.rail_keys = vec!["0".to_string(), "siding".to_string()];

    let spacing = max(1, count / (stations.len() + 1));
    let mut section_count = 1;
    let mut last_station = None;

    for i in 0..count {
        let start = 25.0 * i as f64;
        let mut b = Block::at(start);
        b.joint_sound = true;
        b.rails = vec![RailDef::default(), RailDef { x: 3.8, ..Default::default() }];

        match i % 24 {
            4..=9 => {
                b.curve_radius = 600.0;
                b.curve_cant = 0.06;
            }
            10..=13 => b.pitch = 0.02,
            14..=18 => {
                b.curve_radius = -450.0;
                b.curve_cant = -0.06;
            }
            _ => {}
        }

        if i == 0 {
            b.background = Some(0);
            b.brightness = vec![BrightnessSample { position: 0.0, value: 1.0 }];
        } else if i == count / 2 {
            b.background = Some(1);
        }

        // a short tunnel on every second lap of the pattern
        if i % 48 == 24 {
            b.brightness = vec![BrightnessSample { position: start + 5.0, value: 0.4 }];
            b.fog = Some(Fog {
                start: 5.0,
                end: 250.0,
                color: Color24 { r: 90, g: 90, b: 100 },
                position: start,
            });
            b.run_sounds = vec![SoundIndexSample { position: start, index: 1 }];
        }
        if i % 48 == 30 {
            b.brightness = vec![BrightnessSample { position: start + 5.0, value: 1.0 }];
            b.fog = Some(Fog::none_at(start));
            b.run_sounds = vec![SoundIndexSample { position: start, index: 0 }];
        }

        if i % 24 == 13 {
            b.limits = vec![LimitSample { position: start + 12.5, speed: 15.3 }];
        }
        if i % 24 == 19 {
            b.limits = vec![LimitSample { position: start + 12.5, speed: 27.8 }];
        }

        if i % 8 == 2 {
            b.cracks = vec![CrackPlacement {
                key: "gap".to_string(),
                position: start + 5.0,
                primary_rail: 0,
                secondary_rail: 1,
            }];
        }
        if i % 48 == 40 {
            b.sounds.push(SoundPlacement {
                key: "brook".to_string(),
                kind: SoundPlacementKind::World,
                position: start + 10.0,
                x: 12.0,
                y: 1.0,
            });
        }

        let mut trackside = Vec::new();
        if i % 4 == 0 {
            trackside.push(ObjectPlacement {
                key: "pole".to_string(),
                position: start,
                x: -2.2,
                y: 0.0,
                z: 0.0,
                yaw: 0.0,
                pitch: 0.0,
                roll: 0.0,
                tilt: TiltMode::default(),
                span: 0.0,
            });
        }

        for (k, station) in stations.iter_mut().enumerate() {
            if i == (k + 1) * spacing {
                b.station = Some(k);
                b.stop = Some(k);
                last_station = Some(k);
                station.stops.push(Stop {
                    position: start + 15.0,
                    forward_tolerance: 5.0,
                    backward_tolerance: 5.0,
                    cars: 4,
                });
                b.sounds.push(SoundPlacement {
                    key: "chime".to_string(),
                    kind: SoundPlacementKind::TrainStatic,
                    position: start + 15.0,
                    x: 0.0,
                    y: 0.0,
                });
                trackside.push(ObjectPlacement {
                    key: "platform".to_string(),
                    position: start,
                    x: 2.6,
                    y: 0.0,
                    z: 0.0,
                    yaw: 0.0,
                    pitch: 0.0,
                    roll: 0.0,
                    tilt: TiltMode::FOLLOW_ALL,
                    span: 25.0,
                });
            }
        }
        if !trackside.is_empty() {
            b.objects = vec![trackside];
        }

        if i % 8 == 0 && i > 0 {
            b.sections = vec![SectionDef {
                position: start,
                aspects: vec![0, 2, 4],
                departure_station: last_station.take(),
            }];
            b.signals = vec![vec![SignalPlacement {
                key: "main".to_string(),
                position: start,
                section: section_count,
                x: -3.0,
                y: 4.5,
                z: 0.0,
                yaw: 0.0,
                pitch: 0.0,
                roll: 0.0,
                tilt: TiltMode::default(),
                span: 0.0,
            }]];
            b.transponders = vec![TransponderDef {
                position: start + 5.0,
                kind: 0,
                data: 0,
                section: section_count as i32,
            }];
            section_count += 1;
        }

        data.blocks.push(b);
    }

    data.stations = stations;
    data
}

fn run(opt :&Opt) -> AppResult<()> {
    let mut diag = Diagnostics::new();

    // Stations
    let stations = match opt.stations {
        Some(ref path) => {
            let sounds = tables::KeyTable::new("sound");
            get_stations(path, &sounds, &mut diag)?
        }
        None => demo_stations(),
    };
    if opt.verbose >= 1 {
        println!("Stations:");
        for s in &stations {
            println!("  - {} ({})", s.name, s.key);
        }
    }

    // Route data
    let data = demo_route(opt.blocks, stations, &mut diag);
    if opt.verbose >= 2 {
        println!("Blocks:");
        for b in &data.blocks {
            println!("  - {:?}", b);
        }
    }

    // Build -> route
    let handle = spawn_build(data)?;
    let control = handle.control();
    if let Some(ms) = opt.cancel_after {
        let canceller = control.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms));
            canceller.cancel();
        });
    }
    if opt.verbose >= 1 {
        loop {
            let phase = control.phase();
            println!("{:?} {:3.0}%", phase, 100.0 * control.progress());
            match phase {
                BuildPhase::Done | BuildPhase::Cancelled => break,
                _ => thread::sleep(Duration::from_millis(20)),
            }
        }
    }
    let (outcome, build_diag) = handle.join();
    diag.extend(build_diag);

    match outcome {
        BuildOutcome::Cancelled { blocks_built } => {
            println!("Build cancelled after {} of {} blocks", blocks_built, opt.blocks);
        }
        BuildOutcome::Completed(route) => {
            println!(
                "Built {:.0} m of route: {} elements on {} rails, {} sections, {} objects, {} signals",
                route.length,
                route.rail0().elements.len(),
                route.tracks.len(),
                route.sections.len(),
                route.objects.len(),
                route.signals.len()
            );
            for p in &route.points_of_interest {
                println!("  {:>7.1} m  {}", p.track_position, p.text);
            }
            if let Some(ref json) = opt.json {
                use std::fs::File;
                use std::io::BufWriter;
                let file = File::create(json)?;
                let mut writer = BufWriter::new(&file);
                output::dump::write_json(&route, &mut writer)?;
            }
        }
    }

    for m in &diag.messages {
        println!("[{:?}] {}", m.severity, m.text);
    }

    Ok(())
}

pub fn main() {
    env_logger::init();
    let opt = Opt::from_args();
    println!("{:?}", opt);
    match run(&opt) {
        Ok(()) => {},
        Err(e) => {
            println!("Error:\n{}", e.as_fail());
            std::process::exit(1);
        },
    }
}
