use crate::color::ColorCode;
use crate::constants::{MUTATION_LOG_OFFSET, MUTATION_RANGE, PALETTE_SIZE};
use crate::weighted::pick_weighted;
use rand::Rng;

/// Largest reach that still visits each ring position at most once.
pub const MAX_MUTATION_RANGE: u8 = PALETTE_SIZE / 2;

/// Circular-neighborhood color mutation.
///
/// A mutated offspring lands on a code within `range` steps of its parent on
/// the color ring, biased toward near neighbors on a log curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MutationModel {
    pub range: u8,
    /// When false, candidates outside the parent's family are discarded.
    pub allow_cross_family: bool,
}

impl Default for MutationModel {
    fn default() -> Self {
        Self {
            range: MUTATION_RANGE,
            allow_cross_family: false,
        }
    }
}

/// Draw weight for a candidate `distance` ring steps away. Distance is floored at 1.
pub fn neighbor_weight(distance: u8) -> f64 {
    let distance = f64::from(distance.max(1));
    1.0 / (distance + MUTATION_LOG_OFFSET).log10()
}

impl MutationModel {
    pub fn new(range: u8, allow_cross_family: bool) -> Self {
        Self {
            range: range.min(MAX_MUTATION_RANGE),
            allow_cross_family,
        }
    }

    /// Reachable codes and their weights, ordered from `-range` to `+range`.
    pub fn candidates(&self, parent: ColorCode) -> Vec<(ColorCode, f64)> {
        let range = i32::from(self.range.min(MAX_MUTATION_RANGE));
        let family = parent.family();
        (-range..=range)
            .filter(|&step| step != 0)
            .map(|step| parent.offset(step))
            .filter(|target| self.allow_cross_family || target.family() == family)
            .map(|target| (target, neighbor_weight(parent.ring_distance(target))))
            .collect()
    }

    /// Pick a mutated color for an offspring of `parent`.
    ///
    /// Falls back to `parent` when no candidate survives the family filter.
    pub fn mutate<R: Rng + ?Sized>(&self, parent: ColorCode, rng: &mut R) -> ColorCode {
        let candidates = self.candidates(parent);
        let weights: Vec<f64> = candidates.iter().map(|&(_, w)| w).collect();
        pick_weighted(&weights, rng)
            .map(|idx| candidates[idx].0)
            .unwrap_or(parent)
    }
}
