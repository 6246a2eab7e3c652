//! Possession simulator CLI
//!
//! Event logs load from CSV or JSON (chosen by file extension); posterior
//! draws, perturbation rules and configuration are JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use possession_sim_core::extract::{extract_initial_states, observed_points, teams};
use possession_sim_core::models::{EventRecord, TeamId};
use possession_sim_core::orchestrator::{
    SimulationConfig, SimulationDriver, SimulationReport, TeamResult, VariantResult,
};
use possession_sim_core::policy::{PerturbationRule, PolicyStore, PosteriorDraws};
use possession_sim_core::TimeLapseModel;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "possession-sim")]
#[command(about = "Simulate basketball possessions from a fitted decision model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate team scores under the baseline policy and an optional variant
    Simulate {
        /// Event log (.csv or .json)
        #[arg(long)]
        events: PathBuf,

        /// Posterior draw bundle (JSON)
        #[arg(long)]
        draws: PathBuf,

        /// Simulation config (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Perturbation rules (JSON array) defining the variant policy
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Only simulate this team
        #[arg(long)]
        team: Option<String>,

        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the configured number of iterations
        #[arg(long)]
        iterations: Option<usize>,

        /// Report output path; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print each play's starting state and shot clock
    InitialStates {
        /// Event log (.csv or .json)
        #[arg(long)]
        events: PathBuf,

        /// Only this team
        #[arg(long)]
        team: Option<String>,
    },

    /// Print the per-bucket time-lapse observations
    Lapses {
        /// Event log (.csv or .json)
        #[arg(long)]
        events: PathBuf,

        /// Simulation config (JSON) for the bucket layout
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            events,
            draws,
            config,
            rules,
            team,
            seed,
            iterations,
            out,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(iterations) = iterations {
                config.num_iterations = iterations;
            }
            let rules: Vec<PerturbationRule> = match rules {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            let history = load_events(&events)?;
            let draws: PosteriorDraws = read_json(&draws)?;

            let report = simulate(config, &history, &draws, &rules, team)?;
            let json = report.to_json()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write report to {}", path.display()))?;
                    info!(path = %path.display(), run_id = %report.run_id, "report written");
                }
                None => println!("{}", json),
            }
        }

        Commands::InitialStates { events, team } => {
            let history = load_events(&events)?;
            for team in selected_teams(&history, team)? {
                let starts = extract_initial_states(&history, &team);
                println!("{} ({} plays)", team, starts.len());
                for start in starts {
                    println!("  play {:>5}  {:<24} {:>6.2}", start.play, start.state.to_string(), start.shot_clock);
                }
            }
        }

        Commands::Lapses { events, config } => {
            let config = load_config(config.as_deref())?;
            let history = load_events(&events)?;
            let phases = config.clock_phases(&history)?;
            let model = TimeLapseModel::estimate(&history, phases)?;
            for (bucket, (count, mean)) in model.bucket_stats().into_iter().enumerate() {
                let (lo, hi) = model.phases().range(bucket).unwrap_or((0.0, 0.0));
                match mean {
                    Some(mean) => println!(
                        "bucket {} [{:>5.2}, {:>5.2}): {:>6} lapses, mean {:.3}s",
                        bucket, lo, hi, count, mean
                    ),
                    None => println!(
                        "bucket {} [{:>5.2}, {:>5.2}): empty, sampled from bucket {}",
                        bucket,
                        lo,
                        hi,
                        model.source_bucket(bucket)
                    ),
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn simulate(
    config: SimulationConfig,
    history: &[EventRecord],
    draws: &PosteriorDraws,
    rules: &[PerturbationRule],
    team: Option<String>,
) -> Result<SimulationReport> {
    let driver = SimulationDriver::new(config.clone())?;
    let phases = config.clock_phases(history)?;
    let lapses = TimeLapseModel::estimate(history, phases).context("failed to fit time lapses")?;
    let baseline = PolicyStore::from_draws(draws).context("invalid posterior draws")?;
    let variant = if rules.is_empty() {
        None
    } else {
        Some(baseline.perturbed(rules).context("invalid perturbation rules")?)
    };

    let mut results = Vec::new();
    for team in selected_teams(history, team)? {
        let plays = extract_initial_states(history, &team);
        let observed = observed_points(history, &team);
        info!(team = %team, plays = plays.len(), observed, "simulating team");

        let run = driver
            .run_detailed(&plays, &baseline, &lapses, config.num_iterations)
            .with_context(|| format!("baseline simulation failed for {}", team))?;
        let mut variants = vec![VariantResult::new("baseline", Vec::new(), run, Some(observed))];

        if let Some(store) = &variant {
            let run = driver
                .run_detailed(&plays, store, &lapses, config.num_iterations)
                .with_context(|| format!("perturbed simulation failed for {}", team))?;
            variants.push(VariantResult::new("perturbed", rules.to_vec(), run, Some(observed)));
        }

        results.push(TeamResult {
            team,
            plays: plays.len(),
            observed_points: Some(observed),
            variants,
        });
    }

    Ok(SimulationReport::new(config, rules, results)?)
}

fn selected_teams(history: &[EventRecord], team: Option<String>) -> Result<Vec<TeamId>> {
    let all = teams(history);
    match team {
        None => Ok(all),
        Some(name) => {
            let team = TeamId::new(name);
            if !all.contains(&team) {
                bail!("team {} owns no plays in the event log", team);
            }
            Ok(vec![team])
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let config = match path {
        Some(path) => read_json(path)?,
        None => SimulationConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn load_events(path: &Path) -> Result<Vec<EventRecord>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
    let history: Vec<EventRecord> = if is_csv {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        reader
            .deserialize::<EventRecord>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to parse {}", path.display()))?
    } else {
        read_json(path)?
    };
    info!(path = %path.display(), events = history.len(), "loaded event log");
    Ok(history)
}
