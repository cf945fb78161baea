use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use contraband::ContrabandGame;
use contraband::actor::{LocalSessionRegistry, MatchClosed, MatchPorts, spawn_match};
use contraband::csv::{CsvError, ScriptStep, read_script, write_balances};
use contraband::game::GameError;
use contraband::model::{MatchId, RosterError, TeamRole, TeamRoster};
use thiserror::Error;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{StreamExt, StreamMap};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_TOTAL_ROUNDS: u32 = 3;
const MATCH_ID: MatchId = 1;

#[derive(Debug, Error)]
enum ReplayError {
    #[error("usage: contraband <script.csv> [total_rounds]")]
    Usage,

    #[error("invalid total rounds '{0}'")]
    InvalidRounds(String),

    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Closed(#[from] MatchClosed),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    match replay().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Play a scripted match and print the final balances.
async fn replay() -> Result<(), ReplayError> {
    let mut args = env::args().skip(1);
    let path = args.next().ok_or(ReplayError::Usage)?;
    let total_rounds = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| ReplayError::InvalidRounds(raw))?,
        None => DEFAULT_TOTAL_ROUNDS,
    };

    if !path.ends_with(".csv") {
        warn!(path, "input file seems to not be a csv file");
    }

    let mut profiles = Vec::new();
    let mut commands = Vec::new();
    for result in read_script(&path)? {
        match result {
            Ok(ScriptStep::Join(profile)) => profiles.push(profile),
            Ok(ScriptStep::Command(command)) => commands.push(command),
            Err(e) => warn!("{e}"),
        }
    }

    let (smugglers, inspectors): (Vec<_>, Vec<_>) = profiles
        .iter()
        .cloned()
        .partition(|profile| profile.role == TeamRole::Smuggler);
    let game = ContrabandGame::not_started(
        TeamRoster::new("smugglers", TeamRole::Smuggler, smugglers)?,
        TeamRoster::new("inspectors", TeamRole::Inspector, inspectors)?,
        total_rounds,
    )?;

    let sessions = Arc::new(LocalSessionRegistry::new());
    let mut streams = StreamMap::new();
    for profile in &profiles {
        let receiver = sessions.connect(profile.id, profile.role);
        streams.insert(profile.id, UnboundedReceiverStream::new(receiver));
    }
    let listener = tokio::spawn(async move {
        while let Some((player, event)) = streams.next().await {
            debug!(player, event = %event.to_json(), "event delivered");
        }
    });

    let handle = spawn_match(MATCH_ID, game, MatchPorts::with_sessions(sessions.clone()));
    for command in commands {
        if let Err(e) = handle.send(command).await {
            warn!("{e}, remaining commands dropped");
            break;
        }
    }
    let snapshot = handle.shutdown().await?;

    // Closing every session lets the listener finish.
    drop(sessions);
    if let Err(e) = listener.await {
        warn!("event listener failed: {e}");
    }

    write_balances(&snapshot.players)?;
    Ok(())
}
