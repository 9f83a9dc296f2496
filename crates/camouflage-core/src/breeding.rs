use crate::color::ColorCode;
use crate::constants::{DEFAULT_BREED_FACTOR, DEFAULT_MUTATION_RATE, TARGET_POPULATION};
use crate::mutation::MutationModel;
use crate::population::GenerationConfig;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BreedingParams {
    /// Offspring per survivor, rounded half away from zero.
    pub breed_factor: f64,
    /// Per-offspring probability of drawing a mutated color.
    pub mutation_rate: f64,
    /// Raw offspring totals above this are scaled down to it.
    pub target_population: u32,
    pub mutation: MutationModel,
}

impl Default for BreedingParams {
    fn default() -> Self {
        Self {
            breed_factor: DEFAULT_BREED_FACTOR,
            mutation_rate: DEFAULT_MUTATION_RATE,
            target_population: TARGET_POPULATION,
            mutation: MutationModel::default(),
        }
    }
}

impl BreedingParams {
    pub fn offspring_per_parent(&self) -> u32 {
        // f64::round already rounds half away from zero.
        self.breed_factor.max(0.0).round() as u32
    }
}

/// Raw offspring counts per color, before any renormalization.
pub fn expand<R: Rng + ?Sized>(
    survivors: &[ColorCode],
    params: &BreedingParams,
    rng: &mut R,
) -> GenerationConfig {
    let per_parent = params.offspring_per_parent();
    let mut offspring = GenerationConfig::new();
    for &parent in survivors {
        for _ in 0..per_parent {
            let child = if rng.random::<f64>() < params.mutation_rate {
                params.mutation.mutate(parent, rng)
            } else {
                parent
            };
            offspring.add(child, 1);
        }
    }
    offspring
}

/// Scale `raw` down to exactly `target` organisms when it overshoots.
///
/// Each color is scaled by `target / total` and rounded. The rounding error
/// lands on the largest scaled color (smallest code on ties); an excess that
/// would push it below zero spills over to the next largest color in the same
/// order. Totals at or below `target` are returned unchanged.
pub fn renormalize(raw: &GenerationConfig, target: u32) -> GenerationConfig {
    let raw_total = raw.total();
    if raw_total <= u64::from(target) {
        return raw.clone();
    }

    let scale = f64::from(target) / raw_total as f64;
    let mut scaled: BTreeMap<ColorCode, u64> = raw
        .iter()
        .map(|(code, count)| (code, (f64::from(count) * scale).round() as u64))
        .collect();
    let scaled_total: u64 = scaled.values().sum();

    let mut by_size: Vec<(ColorCode, u64)> = scaled.iter().map(|(&c, &n)| (c, n)).collect();
    by_size.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    if scaled_total < u64::from(target) {
        if let Some((code, _)) = by_size.first() {
            if let Some(count) = scaled.get_mut(code) {
                *count += u64::from(target) - scaled_total;
            }
        }
    } else if scaled_total > u64::from(target) {
        let mut excess = scaled_total - u64::from(target);
        for (code, size) in by_size {
            if excess == 0 {
                break;
            }
            let taken = size.min(excess);
            if taken < excess {
                debug!(%code, excess, "rounding excess exceeds color count; spilling over");
            }
            if let Some(count) = scaled.get_mut(&code) {
                *count -= taken;
            }
            excess -= taken;
        }
    }

    scaled
        .into_iter()
        .map(|(code, count)| (code, u32::try_from(count).unwrap_or(u32::MAX)))
        .collect()
}

/// Offspring composition of the next generation.
///
/// Pure over colors and randomness; organisms are built separately from the
/// returned config.
pub fn breed<R: Rng + ?Sized>(
    survivors: &[ColorCode],
    params: &BreedingParams,
    rng: &mut R,
) -> GenerationConfig {
    let raw = expand(survivors, params, rng);
    renormalize(&raw, params.target_population)
}
