use crate::breeding::BreedingParams;
use crate::color::{ColorCode, Rgb};
use crate::constants::{
    BASE_CAPTURE_WEIGHT, DEFAULT_BREED_FACTOR, DEFAULT_MUTATION_RATE, DEFAULT_TICK_INTERVAL_MS,
    MIN_SURVIVORS, MUTATION_RANGE, TARGET_POPULATION, TRACKED_COLORS,
};
use crate::fitness::FitnessModel;
use crate::mutation::{MutationModel, MAX_MUTATION_RANGE};
use crate::population::GenerationConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible runs.
    pub seed: u64,
    /// Size every generation is built or renormalized toward.
    pub target_population: u32,
    /// Automatic elimination stops once this many organisms are left.
    pub min_survivors: u32,
    /// Added to every color distance when computing capture weight.
    pub base_capture_weight: f64,
    /// Offspring per survivor (rounded half away from zero).
    pub breed_factor: f64,
    /// Per-offspring mutation probability.
    pub mutation_rate: f64,
    /// Ring steps a mutation can reach.
    pub mutation_range: u8,
    /// Whether mutation may leave the parent's color family.
    pub allow_cross_family: bool,
    /// Background the organisms are hunted against.
    pub environment_color: Rgb,
    /// Delay between scheduled ticks. Pacing only.
    pub tick_interval_ms: u64,
    /// Display-only: renderers re-scatter survivors after each capture.
    pub reshuffle_positions: bool,
    /// Composition of generation 1. Must sum to `target_population`.
    pub initial_population: GenerationConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        let per_color = TARGET_POPULATION / TRACKED_COLORS.len() as u32;
        Self {
            seed: 42,
            target_population: TARGET_POPULATION,
            min_survivors: MIN_SURVIVORS,
            base_capture_weight: BASE_CAPTURE_WEIGHT,
            breed_factor: DEFAULT_BREED_FACTOR,
            mutation_rate: DEFAULT_MUTATION_RATE,
            mutation_range: MUTATION_RANGE,
            allow_cross_family: false,
            environment_color: Rgb::WHITE,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            reshuffle_positions: false,
            initial_population: TRACKED_COLORS
                .iter()
                .filter_map(|&c| ColorCode::new(c).ok())
                .map(|code| (code, per_color))
                .collect(),
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidTargetPopulation => "target_population must be greater than 0";
    TargetPopulationTooLarge { max: u32, actual: u32 } => "target_population ({actual}) exceeds supported maximum ({max})";
    InvalidMinSurvivors => "min_survivors must be smaller than target_population";
    InvalidBaseCaptureWeight => "base_capture_weight must be positive and finite";
    InvalidBreedFactor => "breed_factor must be finite and non-negative";
    InvalidMutationRate => "mutation_rate must be finite and within [0,1]";
    InvalidMutationRange { max: u8, actual: u8 } => "mutation_range ({actual}) exceeds supported maximum ({max})";
    InvalidTickInterval => "tick_interval_ms must be positive";
    InitialPopulationMismatch { expected: u32, actual: u64 } => "initial_population must total {expected}, got {actual}";
}

impl std::error::Error for SimConfigError {}

impl SimConfig {
    pub const MAX_TARGET_POPULATION: u32 = 10_000;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_population()?;
        self.validate_selection()?;
        self.validate_breeding()?;
        self.validate_pacing()?;
        Ok(())
    }

    fn validate_population(&self) -> Result<(), SimConfigError> {
        if self.target_population == 0 {
            return Err(SimConfigError::InvalidTargetPopulation);
        }
        if self.target_population > Self::MAX_TARGET_POPULATION {
            return Err(SimConfigError::TargetPopulationTooLarge {
                max: Self::MAX_TARGET_POPULATION,
                actual: self.target_population,
            });
        }
        let actual = self.initial_population.total();
        if actual != u64::from(self.target_population) {
            return Err(SimConfigError::InitialPopulationMismatch {
                expected: self.target_population,
                actual,
            });
        }
        Ok(())
    }

    fn validate_selection(&self) -> Result<(), SimConfigError> {
        if self.min_survivors >= self.target_population {
            return Err(SimConfigError::InvalidMinSurvivors);
        }
        if !(self.base_capture_weight.is_finite() && self.base_capture_weight > 0.0) {
            return Err(SimConfigError::InvalidBaseCaptureWeight);
        }
        Ok(())
    }

    fn validate_breeding(&self) -> Result<(), SimConfigError> {
        if !(self.breed_factor.is_finite() && self.breed_factor >= 0.0) {
            return Err(SimConfigError::InvalidBreedFactor);
        }
        if !(self.mutation_rate.is_finite() && (0.0..=1.0).contains(&self.mutation_rate)) {
            return Err(SimConfigError::InvalidMutationRate);
        }
        if self.mutation_range > MAX_MUTATION_RANGE {
            return Err(SimConfigError::InvalidMutationRange {
                max: MAX_MUTATION_RANGE,
                actual: self.mutation_range,
            });
        }
        Ok(())
    }

    fn validate_pacing(&self) -> Result<(), SimConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(SimConfigError::InvalidTickInterval);
        }
        Ok(())
    }

    pub fn fitness_model(&self) -> FitnessModel {
        FitnessModel::new(self.base_capture_weight)
    }

    pub fn mutation_model(&self, allow_cross_family: bool) -> MutationModel {
        MutationModel::new(self.mutation_range, allow_cross_family)
    }

    pub fn breeding_params(&self, allow_cross_family: bool) -> BreedingParams {
        BreedingParams {
            breed_factor: self.breed_factor,
            mutation_rate: self.mutation_rate,
            target_population: self.target_population,
            mutation: self.mutation_model(allow_cross_family),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
