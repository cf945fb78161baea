//! Replay scripts and balance reports.
//!
//! A script is a csv file with the columns `type,player,target,role,amount`.
//! `join` rows build the rosters; every other row becomes one
//! [`MatchCommand`] sent by `player`.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::Money;
use crate::actor::MatchCommand;
use crate::game::PlayerEntry;
use crate::model::{PlayerId, PlayerProfile, TeamRole};

/// Errors that can occur when reading a script or writing a report
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open script: {0}")]
    Open(#[source] csv::Error),

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized command type '{row_type}'")]
    UnrecognizedType { line: usize, row_type: String },

    #[error("line {line}: unrecognized role '{role}'")]
    UnrecognizedRole { line: usize, role: String },

    #[error("line {line}: {row_type} missing {field}")]
    MissingField {
        line: usize,
        row_type: String,
        field: &'static str,
    },

    #[error("failed to write report: {0}")]
    Write(#[from] csv::Error),
}

/// One parsed script row.
#[derive(Debug)]
pub enum ScriptStep {
    Join(PlayerProfile),
    Command(MatchCommand),
}

#[derive(Debug, Deserialize)]
struct ScriptRow {
    r#type: String,
    player: PlayerId,
    target: Option<PlayerId>,
    role: Option<String>,
    amount: Option<i64>,
}

#[derive(Debug, Serialize)]
struct BalanceRow<'a> {
    player: PlayerId,
    name: &'a str,
    role: String,
    balance: Money,
}

/// Read script steps from a csv file
pub fn read_script(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<ScriptStep, CsvError>>, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(CsvError::Open)?;

    Ok(reader
        .into_deserialize::<ScriptRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            row.into_step(line)
        }))
}

/// Write player balances to stdout in csv format
pub fn write_balances(players: &[PlayerEntry]) -> Result<(), CsvError> {
    write_balances_to(io::stdout().lock(), players)
}

pub fn write_balances_to(out: impl io::Write, players: &[PlayerEntry]) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(out);

    for entry in players {
        writer.serialize(BalanceRow {
            player: entry.player_id,
            name: &entry.name,
            role: entry.role.to_string(),
            balance: entry.balance,
        })?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

impl ScriptRow {
    fn into_step(self, line: usize) -> Result<ScriptStep, CsvError> {
        let player_id = self.player;
        let command = match self.r#type.as_str() {
            "join" => {
                let role = self.role(line)?;
                return Ok(ScriptStep::Join(PlayerProfile::new(
                    player_id,
                    format!("player-{player_id}"),
                    role,
                )));
            }
            "register" => MatchCommand::RegisterCandidate {
                role: self.role(line)?,
                player_id,
                round: None,
            },
            "approve" => MatchCommand::ToggleApproval {
                role: self.role(line)?,
                voter_id: player_id,
            },
            "fix" => MatchCommand::FixCandidate {
                role: self.role(line)?,
                requester_id: player_id,
            },
            "declare" => MatchCommand::DecideSmuggleAmount {
                player_id,
                amount: self.amount(line)?,
            },
            "pass" => MatchCommand::DecidePass { player_id },
            "inspect" => MatchCommand::DecideInspection {
                player_id,
                amount: self.amount(line)?,
            },
            "transfer" => MatchCommand::TransferAmount {
                from_id: player_id,
                to_id: self.target.ok_or_else(|| self.missing(line, "target"))?,
                amount: self.amount(line)?,
            },
            "reconnect" => MatchCommand::SyncReconnectedPlayer { player_id },
            other => {
                return Err(CsvError::UnrecognizedType {
                    line,
                    row_type: other.to_string(),
                });
            }
        };
        Ok(ScriptStep::Command(command))
    }

    fn role(&self, line: usize) -> Result<TeamRole, CsvError> {
        match self.role.as_deref() {
            Some("smuggler") => Ok(TeamRole::Smuggler),
            Some("inspector") => Ok(TeamRole::Inspector),
            Some(other) => Err(CsvError::UnrecognizedRole {
                line,
                role: other.to_string(),
            }),
            None => Err(self.missing(line, "role")),
        }
    }

    fn amount(&self, line: usize) -> Result<i64, CsvError> {
        self.amount.ok_or_else(|| self.missing(line, "amount"))
    }

    fn missing(&self, line: usize, field: &'static str) -> CsvError {
        CsvError::MissingField {
            line,
            row_type: self.r#type.clone(),
            field,
        }
    }
}
