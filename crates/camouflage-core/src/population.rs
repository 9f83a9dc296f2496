use crate::color::{ColorCode, ColorError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopulationError {
    Color(ColorError),
    NegativeCount { code: ColorCode, count: i64 },
    CountOverflow,
    TotalMismatch { expected: u32, actual: u64 },
    EmptyPopulation,
}

impl fmt::Display for PopulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationError::Color(e) => write!(f, "{e}"),
            PopulationError::NegativeCount { code, count } => {
                write!(f, "count for color {code} must not be negative (got {count})")
            }
            PopulationError::CountOverflow => write!(f, "color count does not fit in u32"),
            PopulationError::TotalMismatch { expected, actual } => {
                write!(f, "population total must be {expected}, got {actual}")
            }
            PopulationError::EmptyPopulation => write!(f, "population has no organisms"),
        }
    }
}

impl From<ColorError> for PopulationError {
    fn from(err: ColorError) -> Self {
        PopulationError::Color(err)
    }
}

impl Error for PopulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PopulationError::Color(e) => Some(e),
            _ => None,
        }
    }
}

/// Color composition of a population before it is instantiated.
///
/// Zero counts are never stored, so iteration only yields present colors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ColorCode, u32>",
    into = "BTreeMap<ColorCode, u32>"
)]
pub struct GenerationConfig {
    counts: BTreeMap<ColorCode, u32>,
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw operator input, rejecting bad codes and negative counts.
    pub fn try_from_raw<I>(entries: I) -> Result<Self, PopulationError>
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut config = Self::new();
        for (raw_code, count) in entries {
            let code = ColorCode::try_from(raw_code)?;
            if count < 0 {
                return Err(PopulationError::NegativeCount { code, count });
            }
            let count = u32::try_from(count).map_err(|_| PopulationError::CountOverflow)?;
            config.add(code, count);
        }
        Ok(config)
    }

    pub fn add(&mut self, code: ColorCode, count: u32) {
        if count == 0 {
            return;
        }
        *self.counts.entry(code).or_insert(0) += count;
    }

    pub fn set(&mut self, code: ColorCode, count: u32) {
        if count == 0 {
            self.counts.remove(&code);
        } else {
            self.counts.insert(code, count);
        }
    }

    pub fn get(&self, code: ColorCode) -> u32 {
        self.counts.get(&code).copied().unwrap_or(0)
    }

    /// Present colors in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = (ColorCode, u32)> + '_ {
        self.counts.iter().map(|(&code, &count)| (code, count))
    }

    pub fn colors(&self) -> impl Iterator<Item = ColorCode> + '_ {
        self.counts.keys().copied()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn validate_total(&self, expected: u32) -> Result<(), PopulationError> {
        let actual = self.total();
        if actual != u64::from(expected) {
            return Err(PopulationError::TotalMismatch { expected, actual });
        }
        Ok(())
    }
}

impl From<BTreeMap<ColorCode, u32>> for GenerationConfig {
    fn from(counts: BTreeMap<ColorCode, u32>) -> Self {
        counts.into_iter().collect()
    }
}

impl From<GenerationConfig> for BTreeMap<ColorCode, u32> {
    fn from(config: GenerationConfig) -> Self {
        config.counts
    }
}

impl FromIterator<(ColorCode, u32)> for GenerationConfig {
    fn from_iter<T: IntoIterator<Item = (ColorCode, u32)>>(iter: T) -> Self {
        let mut config = Self::new();
        for (code, count) in iter {
            config.add(code, count);
        }
        config
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganismId(u64);

impl OrganismId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out organism ids that stay unique across generations of one run.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn next_id(&mut self) -> OrganismId {
        let id = OrganismId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Clone, Debug)]
pub struct Organism {
    // Color is fixed at birth and `eliminated` only ever goes false -> true;
    // state changes go through the crate-private mutators below.
    id: OrganismId,
    color_code: ColorCode,
    eliminated: bool,
    being_captured: bool,
}

impl Organism {
    pub fn new(id: OrganismId, color_code: ColorCode) -> Self {
        Self {
            id,
            color_code,
            eliminated: false,
            being_captured: false,
        }
    }

    pub fn id(&self) -> OrganismId {
        self.id
    }

    pub fn color_code(&self) -> ColorCode {
        self.color_code
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    pub fn is_alive(&self) -> bool {
        !self.eliminated
    }

    pub fn is_being_captured(&self) -> bool {
        self.being_captured
    }

    pub(crate) fn set_being_captured(&mut self, value: bool) {
        self.being_captured = value;
    }

    pub(crate) fn eliminate(&mut self) {
        self.eliminated = true;
        self.being_captured = false;
    }
}

/// The organisms of the current generation.
#[derive(Clone, Debug, Default)]
pub struct Population {
    organisms: Vec<Organism>,
}

impl Population {
    /// Instantiate one organism per counted color, in ascending color order.
    pub fn from_config(config: &GenerationConfig, ids: &mut IdAllocator) -> Self {
        let organisms = config
            .iter()
            .flat_map(|(code, count)| std::iter::repeat_n(code, count as usize))
            .map(|code| Organism::new(ids.next_id(), code))
            .collect();
        Self { organisms }
    }

    pub fn organisms(&self) -> &[Organism] {
        &self.organisms
    }

    pub(crate) fn organisms_mut(&mut self) -> &mut [Organism] {
        &mut self.organisms
    }

    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }

    pub fn get(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.iter().find(|o| o.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: OrganismId) -> Option<&mut Organism> {
        self.organisms.iter_mut().find(|o| o.id == id)
    }

    pub fn living(&self) -> impl Iterator<Item = &Organism> + '_ {
        self.organisms.iter().filter(|o| o.is_alive())
    }

    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    /// Colors of the living organisms, one entry per organism.
    pub fn survivor_colors(&self) -> Vec<ColorCode> {
        self.living().map(|o| o.color_code).collect()
    }

    /// Color multiset of every organism, eliminated or not.
    pub fn composition(&self) -> GenerationConfig {
        self.organisms.iter().map(|o| (o.color_code, 1)).collect()
    }

    pub(crate) fn clear_capture_markers(&mut self) {
        for organism in &mut self.organisms {
            organism.being_captured = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn code(n: u8) -> ColorCode {
        ColorCode::new(n).unwrap()
    }

    #[test]
    fn raw_input_validation() {
        assert!(matches!(
            GenerationConfig::try_from_raw([(36, 4)]),
            Err(PopulationError::Color(ColorError::InvalidColorCode(36)))
        ));
        assert!(matches!(
            GenerationConfig::try_from_raw([(3, -1)]),
            Err(PopulationError::NegativeCount { count: -1, .. })
        ));
        let config = GenerationConfig::try_from_raw([(3, 10), (4, 0), (3, 5)]).unwrap();
        assert_eq!(config.get(code(3)), 15);
        assert_eq!(config.colors().count(), 1, "zero counts are dropped");
    }

    #[test]
    fn total_mismatch_is_reported() {
        let config: GenerationConfig = [(code(1), 40), (code(2), 39)].into_iter().collect();
        assert_eq!(
            config.validate_total(80),
            Err(PopulationError::TotalMismatch {
                expected: 80,
                actual: 79
            })
        );
    }

    #[test]
    fn population_matches_config_multiset() {
        let config: GenerationConfig = [(code(15), 30), (code(29), 25), (code(35), 25)]
            .into_iter()
            .collect();
        config.validate_total(80).unwrap();
        let mut ids = IdAllocator::default();
        let pop = Population::from_config(&config, &mut ids);
        assert_eq!(pop.len(), 80);
        assert_eq!(pop.living_count(), 80);
        assert_eq!(pop.composition(), config);

        let mut seen: Vec<u64> = pop.organisms().iter().map(|o| o.id().get()).collect();
        seen.dedup();
        assert_eq!(seen.len(), 80, "ids are unique");
    }

    #[test]
    fn ids_continue_across_populations() {
        let config: GenerationConfig = [(code(1), 2)].into_iter().collect();
        let mut ids = IdAllocator::default();
        let first = Population::from_config(&config, &mut ids);
        let second = Population::from_config(&config, &mut ids);
        assert!(first.organisms().last().unwrap().id() < second.organisms()[0].id());
    }

    #[test]
    fn json_map_keys_are_color_codes() {
        let config: GenerationConfig = serde_json::from_str(r#"{"1": 3, "12": 0, "35": 2}"#).unwrap();
        assert_eq!(config.total(), 5);
        assert_eq!(config.colors().map(|c| c.get()).collect::<Vec<_>>(), vec![1, 35]);
        assert!(serde_json::from_str::<GenerationConfig>(r#"{"40": 1}"#).is_err());
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"1":3,"35":2}"#);
    }

    proptest! {
        #[test]
        fn proptest_full_config_builds_matching_population(
            colors in proptest::collection::vec(1u8..=35, 80),
        ) {
            let config: GenerationConfig = colors.iter().map(|&n| (code(n), 1)).collect();
            prop_assert!(config.validate_total(80).is_ok());

            let pop = Population::from_config(&config, &mut IdAllocator::default());
            prop_assert_eq!(pop.len(), 80);
            prop_assert_eq!(pop.living_count(), 80);
            prop_assert_eq!(pop.composition(), config);
        }
    }
}
