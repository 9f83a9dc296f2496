use crate::color::{ColorCode, Rgb};
use crate::constants::TRACKED_COLORS;
use crate::population::{GenerationConfig, OrganismId, Population};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTally {
    pub start: u32,
    pub survived: u32,
}

/// Start/survived counts of one finished generation. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRecord {
    generation: u32,
    total_start: u32,
    total_survived: u32,
    colors: BTreeMap<ColorCode, ColorTally>,
}

impl GenerationRecord {
    pub fn from_population(generation: u32, population: &Population) -> Self {
        let mut colors: BTreeMap<ColorCode, ColorTally> = BTreeMap::new();
        for organism in population.organisms() {
            let tally = colors.entry(organism.color_code()).or_default();
            tally.start += 1;
            if organism.is_alive() {
                tally.survived += 1;
            }
        }
        Self {
            generation,
            total_start: colors.values().map(|t| t.start).sum(),
            total_survived: colors.values().map(|t| t.survived).sum(),
            colors,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn total_start(&self) -> u32 {
        self.total_start
    }

    pub fn total_survived(&self) -> u32 {
        self.total_survived
    }

    /// Present colors in ascending code order.
    pub fn colors(&self) -> impl Iterator<Item = (ColorCode, ColorTally)> + '_ {
        self.colors.iter().map(|(&code, &tally)| (code, tally))
    }

    pub fn tally(&self, code: ColorCode) -> Option<ColorTally> {
        self.colors.get(&code).copied()
    }

    pub fn survival_rate(&self) -> f64 {
        if self.total_start == 0 {
            return 0.0;
        }
        f64::from(self.total_survived) / f64::from(self.total_start)
    }
}

/// Every color that started at least one generation, ascending.
pub fn colors_ever_seen(history: &[GenerationRecord]) -> Vec<ColorCode> {
    history
        .iter()
        .flat_map(|record| record.colors.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Start count of `code` per recorded generation; 0 where it was absent.
pub fn start_count_series(history: &[GenerationRecord], code: ColorCode) -> Vec<u32> {
    history
        .iter()
        .map(|record| record.tally(code).map_or(0, |t| t.start))
        .collect()
}

/// Colors a chart shows unless the viewer opts into more.
pub fn tracked_colors() -> Vec<ColorCode> {
    TRACKED_COLORS
        .iter()
        .filter_map(|&c| ColorCode::new(c).ok())
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganismSnapshot {
    pub id: OrganismId,
    pub color_code: ColorCode,
    pub eliminated: bool,
    pub being_captured: bool,
}

/// Read-only view of the population after a committed state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFrame {
    pub generation: u32,
    pub living: usize,
    pub organisms: Vec<OrganismSnapshot>,
}

impl SnapshotFrame {
    pub fn capture(generation: u32, population: &Population) -> Self {
        let organisms = population
            .organisms()
            .iter()
            .map(|o| OrganismSnapshot {
                id: o.id(),
                color_code: o.color_code(),
                eliminated: o.is_eliminated(),
                being_captured: o.is_being_captured(),
            })
            .collect();
        Self {
            generation,
            living: population.living_count(),
            organisms,
        }
    }
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub generations: usize,
    pub environment: Rgb,
    pub history: Vec<GenerationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<GenerationConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::IdAllocator;
    use crate::selection;

    fn code(n: u8) -> ColorCode {
        ColorCode::new(n).unwrap()
    }

    fn record(generation: u32, entries: &[(u8, u32, u32)]) -> GenerationRecord {
        let config: GenerationConfig = entries.iter().map(|&(c, n, _)| (code(c), n)).collect();
        let mut pop = Population::from_config(&config, &mut IdAllocator::default());
        for &(c, start, survived) in entries {
            let victims: Vec<OrganismId> = pop
                .organisms()
                .iter()
                .filter(|o| o.color_code() == code(c))
                .take((start - survived) as usize)
                .map(|o| o.id())
                .collect();
            for id in victims {
                selection::eliminate(&mut pop, id).unwrap();
            }
        }
        GenerationRecord::from_population(generation, &pop)
    }

    #[test]
    fn record_tallies_start_and_survivors() {
        let r = record(1, &[(1, 30, 10), (22, 50, 10)]);
        assert_eq!(r.generation(), 1);
        assert_eq!(r.total_start(), 80);
        assert_eq!(r.total_survived(), 20);
        assert_eq!(r.tally(code(1)), Some(ColorTally { start: 30, survived: 10 }));
        assert_eq!(r.tally(code(2)), None);
        assert_eq!(r.survival_rate(), 0.25);
        let order: Vec<u8> = r.colors().map(|(c, _)| c.get()).collect();
        assert_eq!(order, vec![1, 22]);
    }

    #[test]
    fn series_fill_absent_generations_with_zero() {
        let history = vec![
            record(1, &[(1, 40, 10), (15, 40, 10)]),
            record(2, &[(15, 60, 15), (16, 20, 5)]),
            record(3, &[(1, 10, 5), (16, 70, 15)]),
        ];
        assert_eq!(
            colors_ever_seen(&history).iter().map(|c| c.get()).collect::<Vec<_>>(),
            vec![1, 15, 16]
        );
        assert_eq!(start_count_series(&history, code(1)), vec![40, 0, 10]);
        assert_eq!(start_count_series(&history, code(16)), vec![0, 20, 70]);
        assert_eq!(start_count_series(&history, code(35)), vec![0, 0, 0]);
    }

    #[test]
    fn tracked_colors_are_valid_codes() {
        assert_eq!(tracked_colors().len(), TRACKED_COLORS.len());
    }

    #[test]
    fn snapshot_reflects_flags() {
        let config: GenerationConfig = [(code(4), 3)].into_iter().collect();
        let mut pop = Population::from_config(&config, &mut IdAllocator::default());
        let first = pop.organisms()[0].id();
        let second = pop.organisms()[1].id();
        selection::eliminate(&mut pop, first).unwrap();
        selection::mark_capture(&mut pop, second).unwrap();
        let frame = SnapshotFrame::capture(2, &pop);
        assert_eq!(frame.living, 2);
        assert!(frame.organisms[0].eliminated);
        assert!(frame.organisms[1].being_captured);
        assert!(!frame.organisms[2].eliminated && !frame.organisms[2].being_captured);
    }
}
