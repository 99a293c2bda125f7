//! Built route model: track elements with their trigger events, the
//! signalling section chain, and the placed world geometry.

use std::collections::HashSet;
use nalgebra::Vector3;
use smallvec::SmallVec;

use geom::Frame;
use input::blocks::Fog;
use input::stations::Station;
use input::tables::{BackgroundHandle, ObjectHandle, SignalData, SoundHandle};

pub type SectionId = usize;
pub type TrainId = usize;

/// Something that happens when a train front passes a point on a rail.
/// The offset is measured from the start of the owning element.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub offset: f64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    BackgroundChange {
        previous: BackgroundHandle,
        next: BackgroundHandle,
    },
    /// Piecewise-linear brightness node. The previous/next fields are
    /// patched in once the neighbouring nodes are known.
    BrightnessChange {
        value: f32,
        previous_value: f32,
        previous_distance: f64,
        next_value: f32,
        next_distance: f64,
    },
    FogChange {
        previous: Fog,
        current: Fog,
        next: Fog,
    },
    RailSounds {
        run: i32,
        flange: i32,
        previous_run: i32,
        previous_flange: i32,
    },
    PointSound,
    StationStart { station: usize },
    StationEnd { station: usize },
    LimitChange {
        previous_speed: f64,
        next_speed: f64,
    },
    SoundTrigger { sound: SoundHandle },
    SectionChange {
        previous: SectionId,
        next: SectionId,
    },
    Transponder {
        kind: i32,
        data: i32,
        section: Option<SectionId>,
    },
    TrackEnd,
}

/// One interpolation interval of one rail.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackElement {
    pub starting_distance: f64,
    pub position: Vector3<f64>,
    pub frame: Frame,
    pub pitch: f64,
    pub curve_radius: f64,
    pub curve_cant: f64,
    /// Slope of the cant spline at this node, filled in after smoothing.
    pub cant_tangent: f64,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Default)]
pub struct Track {
    pub elements: Vec<TrackElement>,
}

impl Track {
    /// Index of the last element starting at or before `position`.
    pub fn element_at(&self, position: f64) -> Option<usize> {
        if self.elements.is_empty() {
            return None;
        }
        let mut k = 0;
        for (i, e) in self.elements.iter().enumerate() {
            if e.starting_distance <= position {
                k = i;
            } else {
                break;
            }
        }
        Some(k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionAspect {
    pub number: i32,
    pub speed: f64,
}

/// One signalling section. Sections form a chain in track order;
/// `trains` holds the trains currently occupying the section.
#[derive(Debug, Clone)]
pub struct Section {
    pub track_position: f64,
    pub aspects: SmallVec<[SectionAspect; 4]>,
    pub current_aspect: Option<usize>,
    pub previous_section: Option<SectionId>,
    pub next_section: Option<SectionId>,
    /// Station whose departure releases this section, if any.
    pub station: Option<usize>,
    pub invisible: bool,
    pub trains: HashSet<TrainId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    pub track_position: f64,
    pub offset: Vector3<f64>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedObject {
    pub object: ObjectHandle,
    pub track_position: f64,
    pub position: Vector3<f64>,
    pub frame: Frame,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub span: f64,
    /// Rail gap at the start and end of the span, for objects stretched
    /// between two rails.
    pub stretch: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSignal {
    pub signal: SignalData,
    pub section: SectionId,
    pub track_position: f64,
    pub position: Vector3<f64>,
    pub frame: Frame,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSound {
    pub sound: SoundHandle,
    pub position: Vector3<f64>,
}

/// Fog interpolation endpoints active when the route starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogState {
    pub previous: Fog,
    pub current: Fog,
    pub next: Fog,
}

/// Ambient values in effect at track position zero.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialState {
    pub background: Option<BackgroundHandle>,
    pub brightness: f32,
    pub fog: Option<FogState>,
}

/// The finished route.
#[derive(Debug, Clone)]
pub struct Route {
    /// One track per rail; index 0 is the main rail and carries the
    /// events.
    pub tracks: Vec<Track>,
    pub sections: Vec<Section>,
    pub stations: Vec<Station>,
    pub points_of_interest: Vec<PointOfInterest>,
    pub objects: Vec<PlacedObject>,
    pub signals: Vec<PlacedSignal>,
    pub world_sounds: Vec<PlacedSound>,
    pub initial: InitialState,
    pub length: f64,
}

impl Route {
    pub fn rail0(&self) -> &Track {
        &self.tracks[0]
    }
}
