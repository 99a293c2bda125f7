//! Curve and gradient accumulation along the block sequence, and the
//! placement transforms derived from it.

use nalgebra::{Vector2, Vector3};

use geom::{rotate2, Frame};
use input::blocks::{Block, TiltMode};

/// Nominal distance between interpolation points, and the length
/// assumed for the final block.
pub const INTERPOLATE_INTERVAL: f64 = 25.0;

/// Result of advancing along one interval of curve and gradient.
/// `arc_angle` is half the turned angle; the heading is rotated by it
/// once before the position advance and once after.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    pub arc_angle: f64,
    pub chord: f64,
    pub rise: f64,
}

/// Advances `heading` through an interval of the given curve radius and
/// gradient. The position displacement is `heading * chord` in the
/// ground plane plus `rise` vertically, taken after the first half
/// rotation; completing the rotation afterwards is the caller's job.
pub fn advance_heading(
    radius: f64,
    pitch: f64,
    interval: f64,
    heading: &mut Vector2<f64>,
) -> Advance {
    let radius = if radius.is_finite() { radius } else { 0.0 };
    if radius != 0.0 && pitch != 0.0 {
        let d = interval / (1.0 + pitch * pitch).sqrt();
        let rise = d * pitch;
        let b = d / radius.abs();
        let chord = (2.0 * radius * radius * (1.0 - b.cos())).sqrt();
        let a = 0.5 * radius.signum() * b;
        rotate2(heading, a.cos(), -a.sin());
        Advance { arc_angle: a, chord: chord, rise: rise }
    } else if radius != 0.0 {
        let b = interval / radius.abs();
        let chord = (2.0 * radius * radius * (1.0 - b.cos())).sqrt();
        let a = 0.5 * radius.signum() * b;
        rotate2(heading, a.cos(), -a.sin());
        Advance { arc_angle: a, chord: chord, rise: 0.0 }
    } else if pitch != 0.0 {
        let chord = interval / (1.0 + pitch * pitch).sqrt();
        Advance { arc_angle: 0.0, chord: chord, rise: chord * pitch }
    } else {
        Advance { arc_angle: 0.0, chord: interval, rise: 0.0 }
    }
}

/// Second half of the rotation started by `advance_heading`.
pub fn complete_rotation(adv: &Advance, heading: &mut Vector2<f64>) {
    if adv.arc_angle != 0.0 {
        rotate2(heading, adv.arc_angle.cos(), -adv.arc_angle.sin());
    }
}

/// Instantaneous direction change at a block start. Rotates the running
/// heading and the already created element frame.
pub fn apply_turn(turn: f64, heading: &mut Vector2<f64>, frame: &mut Frame) {
    if turn != 0.0 {
        let ag = -turn.atan();
        let cosag = ag.cos();
        let sinag = ag.sin();
        rotate2(heading, cosag, sinag);
        frame.yaw_ground(cosag, sinag);
    }
}

/// Linear interpolation of a rail coordinate between two block starts,
/// clamped to the segment.
pub fn rail_coordinate(s0: f64, v0: f64, s1: f64, v1: f64, position: f64) -> f64 {
    if s1 <= s0 {
        return v0;
    }
    let mut t = (position - s0) / (s1 - s0);
    if t < 0.0 {
        t = 0.0;
    } else if t > 1.0 {
        t = 1.0;
    }
    v0 + t * (v1 - v0)
}

/// World position and frame of the main rail at track position `tpos`
/// inside `block`. `position` and `heading` are the accumulator state
/// at the block start, before the block's turn.
pub fn primary_transform(
    position: &Vector3<f64>,
    heading: &Vector2<f64>,
    block: &Block,
    tpos: f64,
    tilt: TiltMode,
) -> (Vector3<f64>, Frame) {
    let mut heading = *heading;
    if block.turn != 0.0 {
        let ag = -block.turn.atan();
        rotate2(&mut heading, ag.cos(), ag.sin());
    }
    let d = tpos - block.starting_distance;
    let adv = advance_heading(block.curve_radius, block.pitch, d, &mut heading);
    let pos = position
        + Vector3::new(heading.x * adv.chord, adv.rise, heading.y * adv.chord);
    complete_rotation(&adv, &mut heading);
    let pitch = if tilt.gradient { block.pitch } else { 0.0 };
    let mut frame = Frame::from_heading(heading, pitch);
    if tilt.cant && block.curve_cant != 0.0 {
        frame.roll(block.curve_cant.atan());
    }
    (pos, frame)
}

/// End of the interpolation segment that starts at `block`.
fn segment_end(block: &Block, next: Option<&Block>) -> f64 {
    match next {
        Some(n) => n.starting_distance,
        None => block.starting_distance + INTERPOLATE_INTERVAL,
    }
}

/// World point of rail `j` at track position `tpos`, offsetting the
/// main rail by the linearly interpolated rail coordinates. The lateral
/// offset is applied in the ground plane.
pub fn rail_point(
    position: &Vector3<f64>,
    heading: &Vector2<f64>,
    block: &Block,
    next: Option<&Block>,
    j: usize,
    tpos: f64,
) -> Vector3<f64> {
    let (pos, frame) = primary_transform(position, heading, block, tpos, TiltMode::default());
    let s0 = block.starting_distance;
    let s1 = segment_end(block, next);
    let r0 = block.rail(j);
    let r1 = next.map(|b| b.rail(j)).unwrap_or(r0);
    let x = rail_coordinate(s0, r0.x, s1, r1.x, tpos);
    let y = rail_coordinate(s0, r0.y, s1, r1.y, tpos);
    pos + x * frame.side + Vector3::new(0.0, y, 0.0)
}

/// Position and frame for an object on rail `j` at `tpos`, looking
/// along the rail over `span`. A degenerate chord keeps the main rail's
/// frame.
pub fn rail_transform(
    position: &Vector3<f64>,
    heading: &Vector2<f64>,
    block: &Block,
    next: Option<&Block>,
    j: usize,
    tpos: f64,
    span: f64,
    tilt: TiltMode,
) -> (Vector3<f64>, Frame) {
    let p0 = rail_point(position, heading, block, next, j, tpos);
    let p1 = rail_point(position, heading, block, next, j, tpos + span);
    let (_, fallback) = primary_transform(position, heading, block, tpos, tilt);
    let mut chord = p1 - p0;
    if !tilt.gradient {
        chord.y = 0.0;
    }
    let mut frame = Frame::from_chord(chord, &fallback);
    let cant = block.rail(j).cant;
    if tilt.cant && cant != 0.0 {
        frame.roll(cant.atan());
    }
    (p0, frame)
}

/// Lateral gaps between two rails at the start and end of a span,
/// for objects stretched across the gap.
pub fn crack_gaps(
    block: &Block,
    next: Option<&Block>,
    primary: usize,
    secondary: usize,
    tpos: f64,
    span: f64,
) -> (f64, f64) {
    let s0 = block.starting_distance;
    let s1 = segment_end(block, next);
    let p0 = block.rail(primary);
    let q0 = block.rail(secondary);
    let (p1, q1) = match next {
        Some(n) => (n.rail(primary), n.rail(secondary)),
        None => (p0, q0),
    };
    let d0 = rail_coordinate(s0, q0.x - p0.x, s1, q1.x - p1.x, tpos);
    let d1 = rail_coordinate(s0, q0.x - p0.x, s1, q1.x - p1.x, tpos + span);
    (d0, d1)
}

/// Element position and frame for rail `j` over the block starting at
/// `position`. `heading_mid` is the accumulator heading after the first
/// half rotation of the block's advance; the frame looks along the
/// chord from this block's rail point to the next block's, with the
/// heading there predicted through the next block's turn and the first
/// half of its advance.
pub fn rail_element_frame(
    position: &Vector3<f64>,
    heading_mid: &Vector2<f64>,
    adv: &Advance,
    block: &Block,
    next: Option<&Block>,
    next_interval: f64,
    j: usize,
    fallback: &Frame,
) -> (Vector3<f64>, Frame) {
    let h = *heading_mid;
    let r0 = block.rail(j);
    let pos = position + Vector3::new(h.y * r0.x, r0.y, -h.x * r0.x);

    let mut dir2 = h;
    complete_rotation(adv, &mut dir2);
    let (x2, y2) = match next {
        Some(n) => {
            if n.turn != 0.0 {
                let ag = -n.turn.atan();
                rotate2(&mut dir2, ag.cos(), ag.sin());
            }
            advance_heading(n.curve_radius, n.pitch, next_interval, &mut dir2);
            let r2 = n.rail(j);
            (r2.x, r2.y)
        }
        None => (r0.x, r0.y),
    };
    let mut pos2 =
        position + Vector3::new(h.x * adv.chord, adv.rise, h.y * adv.chord);
    pos2 += Vector3::new(dir2.y * x2, y2, -dir2.x * x2);

    let mut frame = Frame::from_chord(pos2 - pos, fallback);
    if r0.cant != 0.0 {
        frame.roll(r0.cant.atan());
    }
    (pos, frame)
}
