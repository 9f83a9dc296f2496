pub mod breeding;
pub mod color;
pub mod config;
pub mod constants;
pub mod fitness;
pub mod metrics;
pub mod mutation;
pub mod population;
pub mod rng;
pub mod schedule;
pub mod selection;
pub mod simulation;
pub mod weighted;

pub use color::{ColorCode, ColorError, ColorFamily, Rgb};
pub use config::{SimConfig, SimConfigError};
pub use metrics::{GenerationRecord, OrganismSnapshot, RunSummary, SnapshotFrame};
pub use population::{GenerationConfig, OrganismId, Population, PopulationError};
pub use selection::SelectionMode;
pub use simulation::{
    Phase, SimulationController, SimulationError, SimulationObserver, TickOutcome,
};
