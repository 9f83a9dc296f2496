use crate::color::{ColorCode, Rgb};
use crate::fitness::FitnessModel;
use crate::population::{OrganismId, Population};
use crate::weighted::pick_weighted;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// The operator picks each organism to eliminate.
    Manual,
    /// Organisms are drawn by capture weight until the survivor floor is reached.
    Automatic,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Manual => write!(f, "manual"),
            SelectionMode::Automatic => write!(f, "automatic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    UnknownOrganism(OrganismId),
    AlreadyEliminated(OrganismId),
    CaptureInProgress(OrganismId),
    NotBeingCaptured(OrganismId),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::UnknownOrganism(id) => write!(f, "organism {id} does not exist"),
            SelectionError::AlreadyEliminated(id) => {
                write!(f, "organism {id} is already eliminated")
            }
            SelectionError::CaptureInProgress(id) => {
                write!(f, "organism {id} is already being captured")
            }
            SelectionError::NotBeingCaptured(id) => {
                write!(f, "organism {id} was not marked for capture")
            }
        }
    }
}

impl Error for SelectionError {}

fn living_target(
    population: &Population,
    id: OrganismId,
) -> Result<(), SelectionError> {
    let organism = population
        .get(id)
        .ok_or(SelectionError::UnknownOrganism(id))?;
    if organism.is_eliminated() {
        return Err(SelectionError::AlreadyEliminated(id));
    }
    Ok(())
}

/// Flag a living organism as in-flight; `commit_capture` finishes the job.
pub fn mark_capture(population: &mut Population, id: OrganismId) -> Result<(), SelectionError> {
    living_target(population, id)?;
    let organism = population
        .get_mut(id)
        .ok_or(SelectionError::UnknownOrganism(id))?;
    if organism.is_being_captured() {
        return Err(SelectionError::CaptureInProgress(id));
    }
    organism.set_being_captured(true);
    Ok(())
}

pub fn commit_capture(
    population: &mut Population,
    id: OrganismId,
) -> Result<ColorCode, SelectionError> {
    living_target(population, id)?;
    let organism = population
        .get_mut(id)
        .ok_or(SelectionError::UnknownOrganism(id))?;
    if !organism.is_being_captured() {
        return Err(SelectionError::NotBeingCaptured(id));
    }
    organism.eliminate();
    Ok(organism.color_code())
}

/// Manual elimination in one step.
pub fn eliminate(population: &mut Population, id: OrganismId) -> Result<ColorCode, SelectionError> {
    mark_capture(population, id)?;
    commit_capture(population, id)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    MinimumSurvivorsReached,
    /// Every living organism has zero capture weight. Unreachable while the
    /// base weight is positive.
    NoCaptureWeight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoStep {
    Eliminated { id: OrganismId, color: ColorCode },
    Finished(StopReason),
}

/// One automatic elimination run.
///
/// The target is fixed when the run starts; later environment changes only
/// affect the weights of the remaining draws.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoElimination {
    target: usize,
    eliminated: usize,
    min_survivors: usize,
}

impl AutoElimination {
    /// Target is `living - min_survivors`, or zero when already at the floor.
    pub fn start(living: usize, min_survivors: usize) -> Self {
        Self::with_target(living.saturating_sub(min_survivors), min_survivors)
    }

    pub fn with_target(target: usize, min_survivors: usize) -> Self {
        Self {
            target,
            eliminated: 0,
            min_survivors,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn eliminated(&self) -> usize {
        self.eliminated
    }

    pub fn stop_reason(&self, population: &Population) -> Option<StopReason> {
        if self.eliminated >= self.target {
            Some(StopReason::TargetReached)
        } else if population.living_count() <= self.min_survivors {
            Some(StopReason::MinimumSurvivorsReached)
        } else {
            None
        }
    }

    /// Eliminate one organism, drawn by capture weight against `environment`.
    ///
    /// Weights are computed from the population as it stands now, so each
    /// step sees the previous step's elimination.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        population: &mut Population,
        fitness: &FitnessModel,
        environment: Rgb,
        rng: &mut R,
    ) -> AutoStep {
        if let Some(reason) = self.stop_reason(population) {
            return AutoStep::Finished(reason);
        }

        let (indices, weights): (Vec<usize>, Vec<f64>) = population
            .organisms()
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_alive())
            .map(|(idx, o)| (idx, fitness.capture_weight(o.color_code(), environment)))
            .unzip();

        let Some(pick) = pick_weighted(&weights, rng) else {
            return AutoStep::Finished(StopReason::NoCaptureWeight);
        };
        let organism = &mut population.organisms_mut()[indices[pick]];
        organism.eliminate();
        self.eliminated += 1;
        AutoStep::Eliminated {
            id: organism.id(),
            color: organism.color_code(),
        }
    }

    /// Step until the run stops. Returns the reason it stopped.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        population: &mut Population,
        fitness: &FitnessModel,
        environment: Rgb,
        rng: &mut R,
    ) -> StopReason {
        loop {
            if let AutoStep::Finished(reason) = self.step(population, fitness, environment, rng) {
                return reason;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{GenerationConfig, IdAllocator};
    use crate::rng::create_rng;

    fn code(n: u8) -> ColorCode {
        ColorCode::new(n).unwrap()
    }

    fn population(entries: &[(u8, u32)]) -> Population {
        let config: GenerationConfig = entries.iter().map(|&(c, n)| (code(c), n)).collect();
        Population::from_config(&config, &mut IdAllocator::default())
    }

    #[test]
    fn manual_elimination_validates_target() {
        let mut pop = population(&[(1, 3)]);
        let id = pop.organisms()[0].id();
        assert_eq!(eliminate(&mut pop, id), Ok(code(1)));
        assert_eq!(eliminate(&mut pop, id), Err(SelectionError::AlreadyEliminated(id)));

        let mut other = population(&[(1, 10)]);
        let stranger = other.organisms()[9].id();
        let mut small = population(&[(1, 1)]);
        assert_eq!(
            eliminate(&mut small, stranger),
            Err(SelectionError::UnknownOrganism(stranger))
        );
        assert_eq!(eliminate(&mut other, stranger), Ok(code(1)));
    }

    #[test]
    fn capture_marker_blocks_double_selection() {
        let mut pop = population(&[(2, 2)]);
        let id = pop.organisms()[0].id();
        mark_capture(&mut pop, id).unwrap();
        assert!(pop.get(id).unwrap().is_being_captured());
        assert_eq!(mark_capture(&mut pop, id), Err(SelectionError::CaptureInProgress(id)));
        assert_eq!(eliminate(&mut pop, id), Err(SelectionError::CaptureInProgress(id)));
        assert_eq!(commit_capture(&mut pop, id), Ok(code(2)));
        let organism = pop.get(id).unwrap();
        assert!(organism.is_eliminated());
        assert!(!organism.is_being_captured());

        let other = pop.organisms()[1].id();
        assert_eq!(commit_capture(&mut pop, other), Err(SelectionError::NotBeingCaptured(other)));
    }

    #[test]
    fn automatic_run_stops_at_target_or_floor() {
        let fitness = FitnessModel::default();
        let mut rng = create_rng(5);
        for (living, target) in [(80usize, 60usize), (80, 10), (80, 100), (30, 5), (25, 50)] {
            let mut pop = population(&[(15, living as u32)]);
            let mut run = AutoElimination::with_target(target, 20);
            run.run(&mut pop, &fitness, Rgb::WHITE, &mut rng);
            assert_eq!(run.eliminated(), target.min(living - 20), "L={living} T={target}");
            assert_eq!(pop.living_count(), 20.max(living - target.min(living)), "L={living} T={target}");
        }
    }

    #[test]
    fn start_fixes_target_from_living_count() {
        let run = AutoElimination::start(80, 20);
        assert_eq!(run.target(), 60);
        let idle = AutoElimination::start(12, 20);
        assert_eq!(idle.target(), 0);
        let mut pop = population(&[(3, 12)]);
        let mut idle = idle;
        let mut rng = create_rng(1);
        assert_eq!(
            idle.step(&mut pop, &FitnessModel::default(), Rgb::BLACK, &mut rng),
            AutoStep::Finished(StopReason::TargetReached)
        );
        assert_eq!(pop.living_count(), 12);
    }

    #[test]
    fn no_organism_is_selected_twice() {
        let mut pop = population(&[(29, 40), (35, 40)]);
        let mut run = AutoElimination::start(80, 20);
        let mut rng = create_rng(8);
        let mut picked = std::collections::HashSet::new();
        while let AutoStep::Eliminated { id, .. } =
            run.step(&mut pop, &FitnessModel::default(), Rgb::BLACK, &mut rng)
        {
            assert!(picked.insert(id), "organism {id} drawn twice");
        }
        assert_eq!(picked.len(), 60);
    }

    #[test]
    fn conspicuous_color_is_eliminated_more_often() {
        let fitness = FitnessModel::default();
        assert!(fitness.capture_weight(code(35), Rgb::BLACK) > fitness.capture_weight(code(29), Rgb::BLACK));

        let mut rng = create_rng(99);
        let trials = 200;
        let mut light_lost = 0usize;
        let mut dark_lost = 0usize;
        for _ in 0..trials {
            let mut pop = population(&[(29, 40), (35, 40)]);
            let mut run = AutoElimination::start(pop.living_count(), 20);
            run.run(&mut pop, &fitness, Rgb::BLACK, &mut rng);
            for o in pop.organisms().iter().filter(|o| o.is_eliminated()) {
                match o.color_code().get() {
                    35 => light_lost += 1,
                    _ => dark_lost += 1,
                }
            }
        }
        assert_eq!(light_lost + dark_lost, trials * 60);
        // Weights are ~88 vs ~419, so the light color dominates every run.
        assert!(light_lost as f64 > 1.5 * dark_lost as f64, "light {light_lost} dark {dark_lost}");
    }

    #[test]
    fn weights_follow_environment_between_steps() {
        let fitness = FitnessModel::default();
        // Organisms in color order: 29, 29, 35, 35.
        let mut pop = population(&[(29, 2), (35, 2)]);
        let mut run = AutoElimination::with_target(2, 0);
        let mut rng = crate::rng::ScriptedRng::new(vec![0.5]);

        // Against white the dark pair holds ~94% of the weight: 0.5 lands on a 29.
        match run.step(&mut pop, &fitness, Rgb::WHITE, &mut rng) {
            AutoStep::Eliminated { color, .. } => assert_eq!(color, code(29)),
            other => panic!("unexpected {other:?}"),
        }
        // Same draw against black: the remaining 29 now holds ~10%, so a 35 goes.
        match run.step(&mut pop, &fitness, Rgb::BLACK, &mut rng) {
            AutoStep::Eliminated { color, .. } => assert_eq!(color, code(35)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            run.step(&mut pop, &fitness, Rgb::BLACK, &mut rng),
            AutoStep::Finished(StopReason::TargetReached)
        );
    }
}
