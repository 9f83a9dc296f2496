use anyhow::{bail, Context, Result};
use camouflage_core::color::{ColorCode, Rgb};
use camouflage_core::config::SimConfig;
use camouflage_core::metrics::{self, GenerationRecord, RunSummary};
use camouflage_core::population::GenerationConfig;
use camouflage_core::schedule::TickToken;
use camouflage_core::selection::SelectionMode;
use camouflage_core::simulation::{SimulationController, SimulationObserver, TickOutcome};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "camouflage")]
#[command(about = "Predation selection simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run automatic generations from a config file
    Run {
        /// Path to config file (JSON). Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for the run summary (optional)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of generations to record
        #[arg(long, default_value_t = 10)]
        generations: usize,

        /// Override the environment color (#RRGGBB)
        #[arg(long)]
        environment: Option<Rgb>,

        /// Override the seed
        #[arg(long)]
        seed: Option<u64>,

        /// Allow mutation across color families
        #[arg(long)]
        cross_family: bool,

        /// Sleep `tick_interval_ms` between ticks instead of running flat out
        #[arg(long)]
        pace: bool,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
    /// List the color palette with families and capture weights
    Palette {
        /// Path to config file (JSON); supplies the base capture weight.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Environment color the weights are computed against.
        /// Defaults to the config's environment color.
        #[arg(long)]
        environment: Option<Rgb>,
    },
}

/// Prints one line per recorded generation.
struct GenerationPrinter;

impl SimulationObserver for GenerationPrinter {
    fn on_generation(&mut self, record: &GenerationRecord, next: &GenerationConfig) {
        let colors: Vec<String> = record
            .colors()
            .map(|(code, tally)| format!("{code}:{}/{}", tally.survived, tally.start))
            .collect();
        println!(
            "gen {:>3}  survived {:>3}/{:<3}  next {:>3}  [{}]",
            record.generation(),
            record.total_survived(),
            record.total_start(),
            next.total(),
            colors.join(" ")
        );
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let file = File::open(path).context("failed to open config file")?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).context("failed to parse config")
}

fn palette_weights(config: &SimConfig, environment: Rgb) -> Vec<(ColorCode, f64)> {
    let fitness = config.fitness_model();
    ColorCode::all()
        .map(|code| (code, fitness.capture_weight(code, environment)))
        .collect()
}

fn drive(sim: &mut SimulationController, token: &TickToken, pace: bool) {
    if !pace {
        sim.run_to_completion(token);
        return;
    }
    while let TickOutcome::Eliminated { .. } = sim.tick(token) {
        std::thread::sleep(token.interval());
    }
}

fn run_generations(
    config: SimConfig,
    generations: usize,
    pace: bool,
) -> Result<RunSummary> {
    let environment = config.environment_color;
    let initial = config.initial_population.clone();
    let mut sim = SimulationController::new(config).context("invalid simulation config")?;
    sim.add_observer(Box::new(GenerationPrinter));

    let mut token = sim.start_generation(initial, SelectionMode::Automatic)?;
    while sim.history().len() < generations {
        if let Some(t) = token.take() {
            drive(&mut sim, &t, pace);
            continue;
        }
        match sim.confirm_next_generation(SelectionMode::Automatic) {
            Ok(next) => token = next,
            Err(e) => {
                warn!(error = %e, "population cannot continue");
                break;
            }
        }
    }

    Ok(RunSummary {
        schema_version: 1,
        generations: sim.history().len(),
        environment,
        history: sim.history().to_vec(),
        pending: sim.pending_config().cloned(),
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Palette {
            config,
            environment,
        } => {
            let sim_config = load_config(config.as_ref())?;
            sim_config.validate().context("Config validation error")?;
            let environment = environment.unwrap_or(sim_config.environment_color);
            println!("code  hex      family  weight vs {environment}");
            for (code, weight) in palette_weights(&sim_config, environment) {
                println!(
                    "{:>4}  {}  {:>6}  {:>8.2}",
                    code.get(),
                    code.rgb(),
                    code.family().id(),
                    weight
                );
            }
        }
        Commands::Run {
            config,
            out,
            generations,
            environment,
            seed,
            cross_family,
            pace,
        } => {
            if generations == 0 {
                bail!("--generations must be positive");
            }
            let mut sim_config = load_config(config.as_ref())?;
            if let Some(environment) = environment {
                sim_config.environment_color = environment;
            }
            if let Some(seed) = seed {
                sim_config.seed = seed;
            }
            sim_config.allow_cross_family |= cross_family;
            sim_config.validate().context("Config validation error")?;

            println!(
                "Simulating {} generations against {}...",
                generations, sim_config.environment_color
            );
            let summary = run_generations(sim_config, generations, pace)?;

            let history = &summary.history;
            for code in metrics::tracked_colors() {
                let series = metrics::start_count_series(history, code);
                println!("color {:>2} starts: {:?}", code.get(), series);
            }

            if let Some(out_dir) = out {
                std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
                let summary_path = out_dir.join("summary.json");
                let file = File::create(summary_path).context("failed to create summary file")?;
                serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
                println!("Run complete. Results saved to {:?}", out_dir);
            } else {
                println!("Run complete. Generations recorded: {}", summary.generations);
            }
        }
    }
    Ok(())
}
