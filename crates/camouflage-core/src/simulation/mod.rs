use crate::breeding;
use crate::color::{ColorCode, Rgb};
use crate::config::{SimConfig, SimConfigError};
use crate::fitness::FitnessModel;
use crate::metrics::{GenerationRecord, SnapshotFrame};
use crate::population::{GenerationConfig, IdAllocator, OrganismId, Population, PopulationError};
use crate::rng::create_rng;
use crate::schedule::{TickScheduler, TickToken};
use crate::selection::{self, AutoElimination, AutoStep, SelectionError, SelectionMode, StopReason};
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    AwaitingConfig,
    SelectionInProgress(SelectionMode),
    Breeding,
    AwaitingNextGenerationStart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    Config(SimConfigError),
    Population(PopulationError),
    Selection(SelectionError),
    InvalidPhase { operation: &'static str, phase: Phase },
    NoPendingConfig,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(e) => write!(f, "{e}"),
            SimulationError::Population(e) => write!(f, "{e}"),
            SimulationError::Selection(e) => write!(f, "{e}"),
            SimulationError::InvalidPhase { operation, phase } => {
                write!(f, "cannot {operation} while in phase {phase:?}")
            }
            SimulationError::NoPendingConfig => {
                write!(f, "no bred configuration is waiting for the next generation")
            }
        }
    }
}

impl From<SimConfigError> for SimulationError {
    fn from(err: SimConfigError) -> Self {
        SimulationError::Config(err)
    }
}

impl From<PopulationError> for SimulationError {
    fn from(err: PopulationError) -> Self {
        SimulationError::Population(err)
    }
}

impl From<SelectionError> for SimulationError {
    fn from(err: SelectionError) -> Self {
        SimulationError::Selection(err)
    }
}

impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimulationError::Config(e) => Some(e),
            SimulationError::Population(e) => Some(e),
            SimulationError::Selection(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The token belongs to a cancelled or superseded run; nothing changed.
    Stale,
    Eliminated { id: OrganismId, color: ColorCode },
    /// The run ended, the generation was recorded and the next one bred.
    Completed(StopReason),
}

/// Receives committed state changes. Both callbacks default to no-ops.
pub trait SimulationObserver {
    fn on_tick(&mut self, _frame: &SnapshotFrame) {}

    fn on_generation(&mut self, _record: &GenerationRecord, _next: &GenerationConfig) {}
}

/// Everything that changes over a run. Only the controller mutates it.
#[derive(Clone, Debug)]
pub struct SimulationState {
    generation: u32,
    population: Population,
    history: Vec<GenerationRecord>,
    pending: Option<GenerationConfig>,
    phase: Phase,
    environment: Rgb,
    allow_cross_family: bool,
}

impl SimulationState {
    fn new(environment: Rgb, allow_cross_family: bool) -> Self {
        Self {
            generation: 1,
            population: Population::default(),
            history: Vec::new(),
            pending: None,
            phase: Phase::AwaitingConfig,
            environment,
            allow_cross_family,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn history(&self) -> &[GenerationRecord] {
        &self.history
    }

    pub fn pending(&self) -> Option<&GenerationConfig> {
        self.pending.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn environment(&self) -> Rgb {
        self.environment
    }

    pub fn allow_cross_family(&self) -> bool {
        self.allow_cross_family
    }
}

/// Drives the generation lifecycle.
///
/// `AwaitingConfig -> SelectionInProgress(mode) -> Breeding ->
/// AwaitingNextGenerationStart -> SelectionInProgress(mode) -> ...`
///
/// Automatic elimination is tick-driven: starting a run hands out a
/// [`TickToken`] and the caller delivers [`tick`](Self::tick) at whatever pace
/// it likes. Starting another run, resetting, or finishing cancels the token.
pub struct SimulationController<R = ChaCha12Rng> {
    config: SimConfig,
    fitness: FitnessModel,
    state: SimulationState,
    auto_run: Option<AutoElimination>,
    scheduler: TickScheduler,
    ids: IdAllocator,
    rng: R,
    observers: Vec<Box<dyn SimulationObserver>>,
}

impl SimulationController<ChaCha12Rng> {
    pub fn new(config: SimConfig) -> Result<Self, SimulationError> {
        let rng = create_rng(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> SimulationController<R> {
    pub fn with_rng(config: SimConfig, rng: R) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            fitness: config.fitness_model(),
            state: SimulationState::new(config.environment_color, config.allow_cross_family),
            auto_run: None,
            scheduler: TickScheduler::new(config.tick_interval()),
            ids: IdAllocator::default(),
            rng,
            observers: Vec::new(),
            config,
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn generation(&self) -> u32 {
        self.state.generation
    }

    pub fn population(&self) -> &Population {
        &self.state.population
    }

    pub fn history(&self) -> &[GenerationRecord] {
        &self.state.history
    }

    pub fn pending_config(&self) -> Option<&GenerationConfig> {
        self.state.pending.as_ref()
    }

    pub fn living_count(&self) -> usize {
        self.state.population.living_count()
    }

    pub fn environment(&self) -> Rgb {
        self.state.environment
    }

    pub fn snapshot(&self) -> SnapshotFrame {
        SnapshotFrame::capture(self.state.generation, &self.state.population)
    }

    /// Takes effect from the next weight computation; a running target is kept.
    pub fn set_environment(&mut self, environment: Rgb) {
        debug!(%environment, "environment color changed");
        self.state.environment = environment;
    }

    /// Read when the next generation is bred.
    pub fn set_allow_cross_family(&mut self, allow: bool) {
        self.state.allow_cross_family = allow;
    }

    /// Start generation 1 from an operator-supplied composition.
    ///
    /// Returns a tick token when `mode` is automatic and there is something to
    /// eliminate.
    pub fn start_generation(
        &mut self,
        initial: GenerationConfig,
        mode: SelectionMode,
    ) -> Result<Option<TickToken>, SimulationError> {
        self.require_phase("start a generation", Phase::AwaitingConfig)?;
        initial.validate_total(self.config.target_population)?;
        Ok(self.begin(initial, mode))
    }

    /// Start the next generation from the bred configuration as-is.
    pub fn confirm_next_generation(
        &mut self,
        mode: SelectionMode,
    ) -> Result<Option<TickToken>, SimulationError> {
        self.require_phase("confirm the next generation", Phase::AwaitingNextGenerationStart)?;
        let pending = self
            .state
            .pending
            .clone()
            .ok_or(SimulationError::NoPendingConfig)?;
        if pending.is_empty() {
            return Err(PopulationError::EmptyPopulation.into());
        }
        Ok(self.begin(pending, mode))
    }

    /// Start the next generation from an operator-edited composition.
    pub fn start_next_generation(
        &mut self,
        config: GenerationConfig,
        mode: SelectionMode,
    ) -> Result<Option<TickToken>, SimulationError> {
        self.require_phase("start the next generation", Phase::AwaitingNextGenerationStart)?;
        config.validate_total(self.config.target_population)?;
        Ok(self.begin(config, mode))
    }

    pub fn mark_capture(&mut self, id: OrganismId) -> Result<(), SimulationError> {
        self.require_manual("mark a capture")?;
        selection::mark_capture(&mut self.state.population, id)?;
        self.notify_tick();
        Ok(())
    }

    pub fn commit_capture(&mut self, id: OrganismId) -> Result<ColorCode, SimulationError> {
        self.require_manual("commit a capture")?;
        let color = selection::commit_capture(&mut self.state.population, id)?;
        debug!(%id, %color, "manual capture committed");
        self.notify_tick();
        Ok(color)
    }

    pub fn eliminate(&mut self, id: OrganismId) -> Result<ColorCode, SimulationError> {
        self.require_manual("eliminate an organism")?;
        let color = selection::eliminate(&mut self.state.population, id)?;
        debug!(%id, %color, "manual elimination");
        self.notify_tick();
        Ok(color)
    }

    /// Close a manual phase.
    ///
    /// Survivors above the floor are culled automatically first, so a token is
    /// returned in that case; otherwise the generation is bred immediately.
    pub fn end_manual_selection(&mut self) -> Result<Option<TickToken>, SimulationError> {
        self.require_manual("end manual selection")?;
        self.state.population.clear_capture_markers();
        self.state.phase = Phase::SelectionInProgress(SelectionMode::Automatic);
        Ok(self.start_auto_run())
    }

    /// Deliver one scheduled tick.
    ///
    /// Never fails: a token from a cancelled or superseded run is ignored.
    pub fn tick(&mut self, token: &TickToken) -> TickOutcome {
        if !self.scheduler.accepts(token) {
            debug!(epoch = token.epoch().get(), "ignoring stale tick");
            return TickOutcome::Stale;
        }
        let Some(run) = self.auto_run.as_mut() else {
            warn!("tick accepted without an elimination run; cancelling");
            self.scheduler.cancel();
            return TickOutcome::Stale;
        };

        match run.step(
            &mut self.state.population,
            &self.fitness,
            self.state.environment,
            &mut self.rng,
        ) {
            AutoStep::Eliminated { id, color } => {
                debug!(
                    %id,
                    %color,
                    eliminated = run.eliminated(),
                    target = run.target(),
                    "captured"
                );
                self.notify_tick();
                TickOutcome::Eliminated { id, color }
            }
            AutoStep::Finished(reason) => {
                debug!(?reason, "elimination run finished");
                self.scheduler.cancel();
                self.auto_run = None;
                self.breed();
                TickOutcome::Completed(reason)
            }
        }
    }

    /// Deliver ticks back to back until the run behind `token` ends.
    /// Returns the number of eliminations performed.
    pub fn run_to_completion(&mut self, token: &TickToken) -> usize {
        let mut eliminated = 0;
        while let TickOutcome::Eliminated { .. } = self.tick(token) {
            eliminated += 1;
        }
        eliminated
    }

    /// Cancel everything and return to `AwaitingConfig` with an empty history.
    ///
    /// The environment color and cross-family toggle are operator inputs and
    /// survive the reset.
    pub fn reset(&mut self) {
        self.scheduler.cancel();
        self.auto_run = None;
        self.state = SimulationState::new(self.state.environment, self.state.allow_cross_family);
        info!("simulation reset");
        self.notify_tick();
    }

    fn begin(&mut self, config: GenerationConfig, mode: SelectionMode) -> Option<TickToken> {
        self.scheduler.cancel();
        self.auto_run = None;
        self.state.population = Population::from_config(&config, &mut self.ids);
        self.state.pending = None;
        self.state.phase = Phase::SelectionInProgress(mode);
        info!(
            generation = self.state.generation,
            size = self.state.population.len(),
            %mode,
            "generation started"
        );
        self.notify_tick();
        match mode {
            SelectionMode::Manual => None,
            SelectionMode::Automatic => self.start_auto_run(),
        }
    }

    fn start_auto_run(&mut self) -> Option<TickToken> {
        let run = AutoElimination::start(
            self.state.population.living_count(),
            self.config.min_survivors as usize,
        );
        if run.target() == 0 {
            debug!("nothing above the survivor floor; recording immediately");
            self.breed();
            return None;
        }
        debug!(target = run.target(), "automatic elimination scheduled");
        self.auto_run = Some(run);
        Some(self.scheduler.start())
    }

    fn breed(&mut self) {
        self.state.phase = Phase::Breeding;
        self.state.population.clear_capture_markers();

        let record =
            GenerationRecord::from_population(self.state.generation, &self.state.population);
        self.state.history.push(record.clone());
        self.state.generation += 1;

        let params = self.config.breeding_params(self.state.allow_cross_family);
        let survivors = self.state.population.survivor_colors();
        let next = breeding::breed(&survivors, &params, &mut self.rng);
        info!(
            generation = record.generation(),
            started = record.total_start(),
            survived = record.total_survived(),
            next_size = next.total(),
            "generation recorded"
        );
        if next.total() < u64::from(self.config.target_population) {
            debug!(next_size = next.total(), "population below target; not topped up");
        }

        for observer in &mut self.observers {
            observer.on_generation(&record, &next);
        }
        self.state.pending = Some(next);
        self.state.phase = Phase::AwaitingNextGenerationStart;
    }

    fn notify_tick(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let frame = self.snapshot();
        for observer in &mut self.observers {
            observer.on_tick(&frame);
        }
    }

    fn require_phase(
        &self,
        operation: &'static str,
        expected: Phase,
    ) -> Result<(), SimulationError> {
        if self.state.phase != expected {
            return Err(SimulationError::InvalidPhase {
                operation,
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn require_manual(&self, operation: &'static str) -> Result<(), SimulationError> {
        self.require_phase(operation, Phase::SelectionInProgress(SelectionMode::Manual))
    }
}
