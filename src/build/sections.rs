use std::collections::HashSet;
use std::f64::INFINITY;
use smallvec::SmallVec;

use input::blocks::SectionDef;
use input::tables::aspect_speed;
use track::{Section, SectionAspect, SectionId};

/// Default section covering the track before the first declared one:
/// stop at aspect 0, clear at aspect 4.
pub fn seed(sections: &mut Vec<Section>) {
    let mut aspects = SmallVec::new();
    aspects.push(SectionAspect { number: 0, speed: 0.0 });
    aspects.push(SectionAspect { number: 4, speed: INFINITY });
    sections.push(Section {
        track_position: 0.0,
        aspects: aspects,
        current_aspect: Some(0),
        previous_section: None,
        next_section: None,
        station: None,
        invisible: false,
        trains: HashSet::new(),
    });
}

/// Appends a declared section to the chain, linking it to its
/// predecessor. Aspect numbers keep their declared order; speeds come
/// from the per-aspect limit table.
pub fn append(
    sections: &mut Vec<Section>,
    def: &SectionDef,
    speeds: &[f64],
) -> SectionId {
    let m = sections.len();
    let mut aspects = SmallVec::new();
    for &number in &def.aspects {
        aspects.push(SectionAspect {
            number: number,
            speed: aspect_speed(speeds, number),
        });
    }
    sections[m - 1].next_section = Some(m);
    sections.push(Section {
        track_position: def.position,
        aspects: aspects,
        current_aspect: None,
        previous_section: Some(m - 1),
        next_section: None,
        station: def.departure_station,
        invisible: false,
        trains: HashSet::new(),
    });
    m
}
