//! Radial attenuation mask tapering height toward region edges, for
//! bounded/island-style terrains. Purely a function of size; no seed.

use crate::config::{FALLOFF_SHIFT, FALLOFF_STEEPNESS};

/// Square-domain falloff field: 0 at the center rising to 1 at the border.
/// Distance is `max(|x|, |y|)` over coordinates mapped into [-1, 1], so the
/// taper follows the square outline rather than an inscribed circle.
#[derive(Debug, Clone)]
pub struct FalloffField {
    size: usize,
    values: Vec<f32>,
}

impl FalloffField {
    pub fn generate(size: usize) -> Self {
        let mut values = vec![0.0; size * size];
        for y in 0..size {
            for x in 0..size {
                let nx = x as f32 / size as f32 * 2.0 - 1.0;
                let ny = y as f32 / size as f32 * 2.0 - 1.0;
                values[y * size + x] = ease(nx.abs().max(ny.abs()));
            }
        }
        Self { size, values }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.size + x]
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// `v^a / (v^a + (b - b*v)^a)`: a plateau near 0 with a sharp rise toward 1.
fn ease(v: f32) -> f32 {
    let a = FALLOFF_STEEPNESS;
    let b = FALLOFF_SHIFT;
    let va = v.powf(a);
    va / (va + (b - b * v).powf(a))
}
