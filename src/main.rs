//! Racer Env entry point
//!
//! Drives the environment with a seeded random agent and reports one summary
//! per episode. Useful as a smoke test and for timing the simulation.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use racer_env::sim::track_ids;
use racer_env::{Action, EnvConfig, EnvError, EnvResult, RacerEnv};

#[derive(Parser, Debug)]
#[command(name = "racer-env", about = "Run a random agent against the racing environment")]
struct Args {
    /// Track id (overrides the config file)
    #[arg(short, long)]
    track: Option<String>,
    /// Number of episodes to run
    #[arg(short, long, default_value_t = 5)]
    episodes: u32,
    /// Seed for the random agent
    #[arg(short, long, default_value_t = 0)]
    seed: u64,
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override the episode step limit
    #[arg(long)]
    max_steps: Option<u64>,
    /// Print one JSON summary per episode instead of text
    #[arg(long)]
    json: bool,
    /// List the registered tracks and exit
    #[arg(long)]
    list_tracks: bool,
}

#[derive(Debug, Default, Serialize)]
struct EpisodeSummary {
    episode: u32,
    steps: u64,
    total_reward: f64,
    laps_completed: u32,
    last_checkpoint: usize,
    wall_contact_ticks: u64,
    terminated: bool,
    truncated: bool,
    elapsed_ms: f64,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.list_tracks {
        for id in track_ids() {
            println!("{id}");
        }
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let status = exit_status(e.as_ref());
            if status == PROTOCOL_EXIT_STATUS {
                log::error!("Random agent broke the reset/step protocol: {e}");
            } else {
                log::error!("{e}");
            }
            eprintln!("error: {e}");
            ExitCode::from(status)
        }
    }
}

/// Exit status for a misused environment; clap already claims 2 for usage errors
const PROTOCOL_EXIT_STATUS: u8 = 3;

/// Map a run failure to the process exit status
fn exit_status(err: &(dyn std::error::Error + 'static)) -> u8 {
    match err.downcast_ref::<EnvError>() {
        Some(e) if e.is_protocol_error() => PROTOCOL_EXIT_STATUS,
        _ => 1,
    }
}

fn load_config(args: &Args) -> EnvResult<EnvConfig> {
    let mut config = match &args.config {
        Some(path) => EnvConfig::load(path)?,
        None => EnvConfig::default(),
    };
    if let Some(track) = &args.track {
        config.track_id = track.clone();
    }
    if let Some(max_steps) = args.max_steps {
        config.episode.max_steps = max_steps;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    let mut env = RacerEnv::new(config)?;
    let mut rng = Pcg32::seed_from_u64(args.seed);
    log::info!(
        "Running {} episodes on {} (seed {})",
        args.episodes,
        env.config().track_id,
        args.seed
    );

    for episode in 0..args.episodes {
        let summary = run_episode(&mut env, &mut rng, episode)?;
        if args.json {
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            println!(
                "episode {:>3}: {:>5} steps, reward {:>9.3}, laps {}, checkpoint {}, walls {}, {} ({:.1} ms)",
                summary.episode,
                summary.steps,
                summary.total_reward,
                summary.laps_completed,
                summary.last_checkpoint,
                summary.wall_contact_ticks,
                if summary.terminated { "terminated" } else { "truncated" },
                summary.elapsed_ms
            );
        }
    }
    Ok(())
}

fn random_action(rng: &mut Pcg32) -> Action {
    [
        rng.random_range(-1.0..=1.0),
        rng.random_range(0.0..=1.0),
        rng.random_range(0.0..=1.0),
    ]
}

fn run_episode(env: &mut RacerEnv, rng: &mut Pcg32, episode: u32) -> EnvResult<EpisodeSummary> {
    let start = Instant::now();
    env.reset();

    let mut summary = EpisodeSummary {
        episode,
        ..EpisodeSummary::default()
    };
    loop {
        let result = env.step(&random_action(rng))?;
        summary.steps += 1;
        summary.total_reward += result.reward;
        if result.info.get("wall_contact").is_some_and(|&v| v > 0.0) {
            summary.wall_contact_ticks += 1;
        }
        if result.done() {
            let lap = result.info.get("lap").copied().unwrap_or(1.0);
            summary.laps_completed = (lap as u32).saturating_sub(1);
            summary.last_checkpoint =
                result.info.get("checkpoint").copied().unwrap_or(0.0) as usize;
            summary.terminated = result.terminated;
            summary.truncated = result.truncated;
            break;
        }
    }
    summary.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_for_protocol_errors() {
        let not_reset: Box<dyn std::error::Error> = Box::new(EnvError::NotReset);
        assert_eq!(exit_status(not_reset.as_ref()), PROTOCOL_EXIT_STATUS);

        let bad_action: Box<dyn std::error::Error> =
            Box::new(EnvError::invalid_action("expected 3 values, got 2"));
        assert_eq!(exit_status(bad_action.as_ref()), PROTOCOL_EXIT_STATUS);
    }

    #[test]
    fn test_exit_status_for_other_errors() {
        let unknown: Box<dyn std::error::Error> = Box::new(EnvError::unknown_track("nowhere"));
        assert_eq!(exit_status(unknown.as_ref()), 1);

        let io: Box<dyn std::error::Error> = Box::new(std::io::Error::other("stdout closed"));
        assert_eq!(exit_status(io.as_ref()), 1);
    }

    #[test]
    fn test_run_with_unknown_track_maps_to_failure() {
        let args = Args::parse_from(["racer-env", "--track", "nowhere", "--episodes", "1"]);
        let err = run(&args).unwrap_err();
        assert_eq!(exit_status(err.as_ref()), 1);
    }
}
