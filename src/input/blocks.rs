use input::stations::Station;
use input::tables::{BackgroundHandle, KeyTable, ObjectHandle, SignalData, SoundHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color24 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color24 {
    pub const GREY: Color24 = Color24 { r: 128, g: 128, b: 128 };
}

pub const NO_FOG_START: f64 = 800.0;
pub const NO_FOG_END: f64 = 1600.0;

/// Fog extents around a track position. `none_at` is the disabled
/// sentinel, its extents pushed beyond the viewing distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub start: f64,
    pub end: f64,
    pub color: Color24,
    pub position: f64,
}

impl Fog {
    pub fn none_at(position: f64) -> Fog {
        Fog {
            start: NO_FOG_START,
            end: NO_FOG_END,
            color: Color24::GREY,
            position: position,
        }
    }
}

/// Offsets and transition radii of one rail at a block start.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RailDef {
    pub x: f64,
    pub y: f64,
    pub radius_h: f64,
    pub radius_v: f64,
    pub cant: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessSample {
    pub position: f64,
    pub value: f32,
}

/// Run or flange sound index taking effect at a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundIndexSample {
    pub position: f64,
    pub index: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitSample {
    pub position: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundPlacementKind {
    /// Triggered under the passing train, played on board.
    TrainStatic,
    /// Looping ambient source anchored in the world.
    World,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundPlacement {
    pub key: String,
    pub kind: SoundPlacementKind,
    pub position: f64,
    pub x: f64,
    pub y: f64,
}

/// Whether a placed object's basis follows the track gradient and/or cant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TiltMode {
    pub gradient: bool,
    pub cant: bool,
}

impl TiltMode {
    pub const FOLLOW_ALL: TiltMode = TiltMode { gradient: true, cant: true };
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPlacement {
    pub key: String,
    pub position: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub tilt: TiltMode,
    pub span: f64,
}

/// A filler object stretched between two rails.
#[derive(Debug, Clone, PartialEq)]
pub struct CrackPlacement {
    pub key: String,
    pub position: f64,
    pub primary_rail: usize,
    pub secondary_rail: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalPlacement {
    pub key: String,
    pub position: f64,
    /// Section the signal head displays, as a global section index.
    pub section: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub tilt: TiltMode,
    pub span: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransponderDef {
    pub position: f64,
    /// Negative kinds are inert and skipped.
    pub kind: i32,
    pub data: i32,
    /// Raw section reference, validated against the built section count.
    pub section: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionDef {
    pub position: f64,
    pub aspects: Vec<i32>,
    pub departure_station: Option<usize>,
}

/// One parsed route segment. Produced by the upstream parser, read-only
/// to the build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub starting_distance: f64,
    pub turn: f64,
    pub pitch: f64,
    pub curve_radius: f64,
    pub curve_cant: f64,
    pub rails: Vec<RailDef>,
    pub background: Option<usize>,
    pub brightness: Vec<BrightnessSample>,
    pub fog: Option<Fog>,
    pub run_sounds: Vec<SoundIndexSample>,
    pub flange_sounds: Vec<SoundIndexSample>,
    pub joint_sound: bool,
    pub station: Option<usize>,
    pub stop: Option<usize>,
    pub limits: Vec<LimitSample>,
    pub sounds: Vec<SoundPlacement>,
    /// Free objects per rail index.
    pub objects: Vec<Vec<ObjectPlacement>>,
    pub cracks: Vec<CrackPlacement>,
    /// Signal heads per rail index.
    pub signals: Vec<Vec<SignalPlacement>>,
    pub transponders: Vec<TransponderDef>,
    pub sections: Vec<SectionDef>,
}

impl Block {
    pub fn at(starting_distance: f64) -> Block {
        Block { starting_distance: starting_distance, ..Default::default() }
    }

    /// Rail record for index `j`; rails the parser did not mention ride
    /// centered on the main track.
    pub fn rail(&self, j: usize) -> RailDef {
        self.rails.get(j).cloned().unwrap_or_default()
    }

    pub fn objects_on(&self, j: usize) -> &[ObjectPlacement] {
        self.objects.get(j).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn signals_on(&self, j: usize) -> &[SignalPlacement] {
        self.signals.get(j).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Everything the build consumes: the block list plus the side tables
/// produced by the list loaders.
#[derive(Debug)]
pub struct RouteData {
    pub blocks: Vec<Block>,
    /// Rail key per rail index; index 0 is the main rail.
    pub rail_keys: Vec<String>,
    pub backgrounds: Vec<BackgroundHandle>,
    pub objects: KeyTable<ObjectHandle>,
    pub sounds: KeyTable<SoundHandle>,
    pub sounds3d: KeyTable<SoundHandle>,
    pub signals: KeyTable<SignalData>,
    /// Speed limit per signal aspect number.
    pub signal_speeds: Vec<f64>,
    pub stations: Vec<Station>,
}

impl RouteData {
    pub fn new() -> RouteData {
        RouteData {
            blocks: Vec::new(),
            rail_keys: vec!["0".to_string()],
            backgrounds: Vec::new(),
            objects: KeyTable::new("structure"),
            sounds: KeyTable::new("sound"),
            sounds3d: KeyTable::new("sound"),
            signals: KeyTable::new("signal"),
            signal_speeds: Vec::new(),
            stations: Vec::new(),
        }
    }

    pub fn rail_count(&self) -> usize {
        if self.rail_keys.is_empty() { 1 } else { self.rail_keys.len() }
    }
}
