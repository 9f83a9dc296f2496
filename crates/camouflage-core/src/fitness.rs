use crate::color::{ColorCode, Rgb};
use crate::constants::BASE_CAPTURE_WEIGHT;

/// Capture weight of a color against an environment color.
///
/// `weight = base_weight + |rgb(code) - environment|`. A color far from the
/// background is easy to spot and gets a proportionally larger chance of
/// being drawn for elimination. `base_weight` keeps a perfectly camouflaged
/// color catchable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitnessModel {
    base_weight: f64,
}

impl Default for FitnessModel {
    fn default() -> Self {
        Self {
            base_weight: BASE_CAPTURE_WEIGHT,
        }
    }
}

impl FitnessModel {
    /// `base_weight` is checked by `SimConfig::validate` to be positive and finite.
    pub fn new(base_weight: f64) -> Self {
        debug_assert!(base_weight.is_finite() && base_weight > 0.0);
        Self { base_weight }
    }

    pub fn capture_weight(&self, code: ColorCode, environment: Rgb) -> f64 {
        self.base_weight + code.rgb().distance(environment)
    }
}
