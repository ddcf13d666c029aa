//! OGame Engine - Entry Point
//!
//! `play` runs the universe in real time and answers commands typed on
//! stdin. `simulate` runs a headless build order on the virtual clock and
//! prints the resulting player state as JSON.

use clap::{Parser, Subcommand};
use ogame_engine::core::error::EngineError;
use ogame_engine::economy::BuildingReport;
use ogame_engine::simulation::run_realtime;
use ogame_engine::Universe;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Persistent multiplayer economy simulation
#[derive(Parser, Debug)]
#[command(name = "ogame")]
#[command(about = "Run the economy simulation interactively or headless")]
struct Args {
    /// Game configuration (.toml or .json)
    #[arg(long, default_value = "data/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Real-time session driven by stdin commands
    Play,
    /// Headless run of a build order on the virtual clock
    Simulate {
        /// Player to create
        #[arg(long, default_value = "test")]
        player: String,

        /// Building to upgrade; repeat to queue more. Each entry is issued
        /// once it is affordable and the building is idle.
        #[arg(long = "build")]
        builds: Vec<String>,

        /// Simulated hours to run
        #[arg(long, default_value_t = 1.0)]
        hours: f64,
    },
}

/// JSON output of a headless run
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationResult {
    now_ms: u64,
    unissued_builds: Vec<String>,
    player: ogame_engine::economy::PlayerSnapshot,
    buildings: Vec<BuildingReport>,
}

/// Errors surfaced by the binary
#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

type CliResult<T> = std::result::Result<T, CliError>;

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ogame_engine=info,ogame=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let universe = Arc::new(Universe::from_path(&args.config)?);

    match args.command {
        Command::Play => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(play(universe))?;
        }
        Command::Simulate {
            player,
            builds,
            hours,
        } => simulate(&universe, &player, builds, hours)?,
    }
    Ok(())
}

fn simulate(
    universe: &Universe,
    player: &str,
    builds: Vec<String>,
    hours: f64,
) -> CliResult<()> {
    universe.create_player(player)?;

    let tick = universe.tick_length().millis();
    let end = ogame_engine::core::config::hours_to_millis(hours);
    let mut queue: VecDeque<String> = builds.into();

    while universe.now_ms() < end {
        if let Some(next) = queue.front() {
            match universe.upgrade_building(player, next) {
                Ok(()) => {
                    tracing::info!(at_ms = universe.now_ms(), building = %next, "build issued");
                    queue.pop_front();
                }
                Err(EngineError::InsufficientResources { .. })
                | Err(EngineError::UpgradeInProgress { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
        universe.advance_by(tick.min(end - universe.now_ms()));
    }

    let state = universe.player_state(player)?;
    let mut buildings = Vec::new();
    for name in state.buildings.keys() {
        if let Some(report) = universe.building_report(player, name)? {
            buildings.push(report);
        }
    }

    let result = SimulationResult {
        now_ms: universe.now_ms(),
        unissued_builds: queue.into(),
        player: state,
        buildings,
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn play(universe: Arc<Universe>) -> CliResult<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let driver = tokio::spawn(run_realtime(universe.clone(), shutdown_rx));

    println!("\n=== OGAME ENGINE ===");
    println!("Commands:");
    println!("  create <name>            - Create a player");
    println!("  upgrade <name> <type>    - Buy or upgrade a building");
    println!("  state <name>             - Show player state");
    println!("  report <name> <type>     - Show building details");
    println!("  exists <name>            - Check whether a player exists");
    println!("  static                   - Dump the building catalog");
    println!("  quit / q                 - Exit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }
        match handle_command(&universe, input) {
            Ok(output) => println!("{output}"),
            Err(err) => {
                tracing::warn!(command = input, %err, "request rejected");
                println!("{}", serde_json::json!({ "error": err.to_string() }));
            }
        }
    }

    // Receiver may already be gone if the driver exited
    let _ = shutdown_tx.send(true);
    driver.await?;
    Ok(())
}

fn handle_command(universe: &Universe, input: &str) -> CliResult<String> {
    let (verb, rest) = input.split_once(' ').unwrap_or((input, ""));
    let rest = rest.trim();

    let value = match verb {
        "create" => {
            if rest.is_empty() {
                return Err(CliError::Usage("create <name>"));
            }
            serde_json::to_value(universe.create_player(rest)?)?
        }
        "upgrade" => {
            let (name, building) = split_player_arg(rest);
            universe.upgrade_building(name, building)?;
            serde_json::to_value(universe.player_state(name)?)?
        }
        "state" | "s" => serde_json::to_value(universe.player_state(rest)?)?,
        "report" => {
            let (name, building) = split_player_arg(rest);
            serde_json::to_value(universe.building_report(name, building)?)?
        }
        "exists" => serde_json::json!({ "exists": universe.player_exists(rest) }),
        "static" => serde_json::to_value(universe.static_config())?,
        _ => serde_json::json!({ "error": format!("unknown command: {verb}") }),
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Split `<player> <building type...>`; building names may contain spaces
fn split_player_arg(rest: &str) -> (&str, &str) {
    let (name, building) = rest.split_once(' ').unwrap_or((rest, ""));
    (name, building.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_create_requires_a_name() {
        let universe = Universe::from_path(Path::new("data/config.toml")).unwrap();
        for input in ["create", "create   "] {
            let err = handle_command(&universe, input).unwrap_err();
            assert!(matches!(err, CliError::Usage(_)));
        }
        assert!(universe.player_names().is_empty());

        handle_command(&universe, "create alice").unwrap();
        assert_eq!(universe.player_names(), vec!["alice".to_string()]);
    }
}
