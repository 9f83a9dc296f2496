/// Number of codes on the color ring. Codes are 1-based, so valid codes are `1..=PALETTE_SIZE`.
pub const PALETTE_SIZE: u8 = 35;

/// Size every generation is built or renormalized toward.
pub const TARGET_POPULATION: u32 = 80;

/// Floor below which an automatic elimination run stops.
pub const MIN_SURVIVORS: u32 = 20;

/// Constant added to every color distance so no organism is ever uncatchable.
pub const BASE_CAPTURE_WEIGHT: f64 = 0.5;

/// Offspring per surviving parent before rounding.
pub const DEFAULT_BREED_FACTOR: f64 = 4.0;

/// Probability that a single offspring mutates away from its parent color.
pub const DEFAULT_MUTATION_RATE: f64 = 1.0 / 3.0;

/// Reach of a single mutation step on the color ring.
pub const MUTATION_RANGE: u8 = 2;

/// Additive offset inside the mutation log curve. Keeps `log10` positive at distance 1.
pub const MUTATION_LOG_OFFSET: f64 = 1.1;

/// Pacing for scheduled ticks (milliseconds). Timing only, never outcome.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 500;

/// Colors whose series a chart shows by default.
pub const TRACKED_COLORS: [u8; 5] = [15, 1, 10, 22, 29];
