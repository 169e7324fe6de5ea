//! Pluggable chunk retention policies.
//!
//! The streamer prefilter guarantees candidates are hidden and have no work
//! in flight, so a policy only decides how many of them to drop and in what
//! order.

use super::chunk::ChunkCoord;

#[derive(Debug, Clone, Copy)]
pub struct EvictionCandidate {
    pub coord: ChunkCoord,
    pub sqr_distance: f32,
}

pub trait EvictionPolicy: Send + Sync {
    /// Chunks to drop from the registry this recompute. `resident` is the
    /// total registry size including chunks that are not candidates.
    fn plan(&self, resident: usize, candidates: &[EvictionCandidate]) -> Vec<ChunkCoord>;
}

/// Keep every chunk forever. Hidden chunks cost memory but revisits are
/// free.
pub struct RetainAll;

impl EvictionPolicy for RetainAll {
    fn plan(&self, _resident: usize, _candidates: &[EvictionCandidate]) -> Vec<ChunkCoord> {
        Vec::new()
    }
}

/// Cap the registry at `max_resident` chunks, dropping the furthest hidden
/// chunks first once over budget.
pub struct FurthestFirst {
    pub max_resident: usize,
}

impl EvictionPolicy for FurthestFirst {
    fn plan(&self, resident: usize, candidates: &[EvictionCandidate]) -> Vec<ChunkCoord> {
        if resident <= self.max_resident {
            return Vec::new();
        }
        let excess = resident - self.max_resident;
        let mut ordered: Vec<&EvictionCandidate> = candidates.iter().collect();
        ordered.sort_by(|a, b| b.sqr_distance.total_cmp(&a.sqr_distance));
        ordered.into_iter().take(excess).map(|c| c.coord).collect()
    }
}
