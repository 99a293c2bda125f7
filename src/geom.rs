use nalgebra::{Vector2, Vector3};

/// Rotate a 2-d heading by the angle whose cosine/sine are given.
pub fn rotate2(v: &mut Vector2<f64>, cosa: f64, sina: f64) {
    let x = cosa * v.x - sina * v.y;
    let y = sina * v.x + cosa * v.y;
    v.x = x;
    v.y = y;
}

/// Rotate a world vector about the vertical axis (ground plane).
pub fn rotate_ground(v: &mut Vector3<f64>, cosa: f64, sina: f64) {
    let x = v.x * cosa - v.z * sina;
    let z = v.x * sina + v.z * cosa;
    v.x = x;
    v.z = z;
}

/// Lift a 2-d heading into a unit world direction with the given grade.
pub fn direction3(heading: Vector2<f64>, pitch: f64) -> Vector3<f64> {
    let t = (heading.x * heading.x + heading.y * heading.y + pitch * pitch).sqrt();
    Vector3::new(heading.x / t, pitch / t, heading.y / t)
}

/// Orthonormal basis of a track point: forward, side, up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub direction: Vector3<f64>,
    pub side: Vector3<f64>,
    pub up: Vector3<f64>,
}

impl Frame {
    /// Frame of the main track at a point with the given heading and grade.
    /// The side vector stays in the ground plane.
    pub fn from_heading(heading: Vector2<f64>, pitch: f64) -> Frame {
        let direction = direction3(heading, pitch);
        let side = Vector3::new(heading.y, 0.0, -heading.x);
        let up = direction.cross(&side);
        Frame { direction: direction, side: side, up: up }
    }

    /// Frame looking along an arbitrary chord. Falls back to `fallback`
    /// when the chord or its ground projection degenerates.
    pub fn from_chord(chord: Vector3<f64>, fallback: &Frame) -> Frame {
        let direction = match try_unit(chord) {
            Some(d) => d,
            None => return *fallback,
        };
        let side = match try_unit(Vector3::new(chord.z, 0.0, -chord.x)) {
            Some(s) => s,
            None => return *fallback,
        };
        let up = direction.cross(&side);
        Frame { direction: direction, side: side, up: up }
    }

    /// Yaw about the vertical axis; side follows, up is recomputed.
    pub fn yaw_ground(&mut self, cosa: f64, sina: f64) {
        rotate_ground(&mut self.direction, cosa, sina);
        rotate_ground(&mut self.side, cosa, sina);
        self.up = self.direction.cross(&self.side);
    }

    /// Roll about the direction axis (cant).
    pub fn roll(&mut self, angle: f64) {
        let (sina, cosa) = angle.sin_cos();
        let side = self.side * cosa + self.up * sina;
        self.up = self.up * cosa - self.side * sina;
        self.side = side;
    }
}

fn try_unit(v: Vector3<f64>) -> Option<Vector3<f64>> {
    let n = v.norm();
    if n > 1e-12 {
        Some(v / n)
    } else {
        None
    }
}
