//! Cant smoothing. Point cants are re-derived from the block records on
//! every run, blended pairwise against the preceding block, and given
//! monotone spline tangents for interpolation between elements.

use input::blocks::Block;
use track::Track;

/// Blends each block's cant against its predecessor's declared value.
/// A zero inherits the predecessor, equal signs keep the larger
/// magnitude, opposite signs meet at the mean.
fn blend(source: &[f64]) -> Vec<f64> {
    let mut out = source.to_vec();
    for i in (1..source.len()).rev() {
        let cur = source[i];
        let prev = source[i - 1];
        if cur == 0.0 {
            out[i] = prev;
        } else if prev != 0.0 {
            if prev * cur > 0.0 {
                if prev.abs() > cur.abs() {
                    out[i] = prev;
                }
            } else {
                out[i] = 0.5 * (cur + prev);
            }
        }
    }
    out
}

/// Spline tangents over `(positions, values)`, clamped so the curve
/// stays monotone over each data interval.
fn tangents(positions: &[f64], values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0.0];
    }
    let mut d = vec![0.0; n - 1];
    for i in 0..n - 1 {
        let h = positions[i + 1] - positions[i];
        if h != 0.0 {
            d[i] = (values[i + 1] - values[i]) / h;
        }
    }
    let mut t = vec![0.0; n];
    t[0] = d[0];
    t[n - 1] = d[n - 2];
    for i in 1..n - 1 {
        t[i] = 0.5 * (d[i - 1] + d[i]);
    }
    for i in 0..n - 1 {
        if d[i] == 0.0 {
            t[i] = 0.0;
            t[i + 1] = 0.0;
        } else {
            let a = t[i] / d[i];
            let b = t[i + 1] / d[i];
            let r = a * a + b * b;
            if r > 9.0 {
                let s = 3.0 / r.sqrt();
                t[i] = s * a * d[i];
                t[i + 1] = s * b * d[i];
            }
        }
    }
    t
}

/// Smooths the cant of every rail. Reads the cant sources from the
/// immutable block records, so applying again to the same blocks
/// reproduces the same result.
pub fn apply(tracks: &mut [Track], blocks: &[Block]) {
    for (j, track) in tracks.iter_mut().enumerate() {
        let n = track.elements.len();
        if n == 0 {
            continue;
        }
        let source: Vec<f64> = blocks[..n]
            .iter()
            .map(|b| if j == 0 { b.curve_cant } else { b.rail(j).cant })
            .collect();
        let blended = blend(&source);
        for (element, &cant) in track.elements.iter_mut().zip(&blended) {
            element.curve_cant = cant;
        }
        let positions: Vec<f64> =
            track.elements.iter().map(|e| e.starting_distance).collect();
        let slopes = tangents(&positions, &blended);
        for (element, &slope) in track.elements.iter_mut().zip(&slopes) {
            element.cant_tangent = slope;
        }
    }
}
