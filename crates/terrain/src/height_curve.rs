//! Keyframe response curve mapping normalized height [0,1] to output height.
//!
//! The heightmap generator evaluates one of these per cell, so evaluation has
//! to stay allocation-free and deterministic. Segments interpolate with
//! smoothstep: keys are hit exactly and slopes ease in and out at each key.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub position: f32,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
}

impl HeightCurve {
    /// Builds a curve from `(position, value)` pairs. Keys are sorted by
    /// position; an empty list falls back to the unit ramp.
    pub fn new(keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut keys: Vec<CurveKey> = keys
            .into_iter()
            .map(|(position, value)| CurveKey { position, value })
            .collect();
        if keys.is_empty() {
            return Self::unit_ramp();
        }
        keys.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self { keys }
    }

    /// Ramp from (0,0) to (1,1). Keys are hit exactly; in between the
    /// segment eases like any other, so this is not a straight line.
    pub fn unit_ramp() -> Self {
        Self {
            keys: vec![
                CurveKey {
                    position: 0.0,
                    value: 0.0,
                },
                CurveKey {
                    position: 1.0,
                    value: 1.0,
                },
            ],
        }
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    /// Evaluates the curve at `t`. Outside the key range the nearest end
    /// key's value is returned (clamp semantics).
    pub fn evaluate(&self, t: f32) -> f32 {
        let first = match self.keys.first() {
            Some(key) => *key,
            // Deserialized curves can arrive empty; behave like the unit
            // ramp so both empty-curve paths agree.
            None => {
                let s = t.clamp(0.0, 1.0);
                return s * s * (3.0 - 2.0 * s);
            }
        };
        let last = self.keys[self.keys.len() - 1];
        if t <= first.position {
            return first.value;
        }
        if t >= last.position {
            return last.value;
        }
        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.position {
                let span = b.position - a.position;
                if span <= f32::EPSILON {
                    return b.value;
                }
                let s = (t - a.position) / span;
                let s = s * s * (3.0 - 2.0 * s);
                return a.value + (b.value - a.value) * s;
            }
        }
        last.value
    }
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::unit_ramp()
    }
}
