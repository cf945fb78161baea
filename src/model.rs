//! Core domain types shared by the match engine and the actor layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Money;

/// Player identifier.
pub type PlayerId = u64;

/// Match identifier.
pub type MatchId = u64;

/// The two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamRole {
    Smuggler,
    Inspector,
}

impl TeamRole {
    pub fn is_smuggler(self) -> bool {
        self == TeamRole::Smuggler
    }

    pub fn is_inspector(self) -> bool {
        self == TeamRole::Inspector
    }

    /// The role of the other team.
    pub fn opponent(self) -> TeamRole {
        match self {
            TeamRole::Smuggler => TeamRole::Inspector,
            TeamRole::Inspector => TeamRole::Smuggler,
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamRole::Smuggler => write!(f, "smuggler"),
            TeamRole::Inspector => write!(f, "inspector"),
        }
    }
}

/// Errors raised while assembling a [`TeamRoster`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("플레이어 역할이 로스터와 일치하지 않습니다.")]
    RoleMismatch(PlayerId),
    #[error("이미 로스터에 포함된 플레이어입니다.")]
    DuplicatePlayer(PlayerId),
    #[error("로스터에 존재하지 않는 플레이어입니다.")]
    MissingPlayer(PlayerId),
}

/// Identity of a player for the duration of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub name: String,
    pub role: TeamRole,
}

impl PlayerProfile {
    pub fn new(id: PlayerId, name: impl Into<String>, role: TeamRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }

    pub fn to_player(&self, starting: Money) -> Player {
        Player {
            profile: self.clone(),
            balance: starting,
        }
    }
}

/// Ordered list of players that all share one team role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRoster {
    name: String,
    role: TeamRole,
    players: Vec<PlayerProfile>,
}

impl TeamRoster {
    pub fn new(
        name: impl Into<String>,
        role: TeamRole,
        players: impl IntoIterator<Item = PlayerProfile>,
    ) -> Result<Self, RosterError> {
        players
            .into_iter()
            .try_fold(Self::empty(name, role), |roster, profile| {
                roster.add_player(profile)
            })
    }

    pub fn empty(name: impl Into<String>, role: TeamRole) -> Self {
        Self {
            name: name.into(),
            role,
            players: Vec::new(),
        }
    }

    pub fn add_player(mut self, profile: PlayerProfile) -> Result<Self, RosterError> {
        if profile.role != self.role {
            return Err(RosterError::RoleMismatch(profile.id));
        }
        if self.has_player(profile.id) {
            return Err(RosterError::DuplicatePlayer(profile.id));
        }
        self.players.push(profile);
        Ok(self)
    }

    pub fn remove_player(mut self, id: PlayerId) -> Result<Self, RosterError> {
        if !self.has_player(id) {
            return Err(RosterError::MissingPlayer(id));
        }
        self.players.retain(|profile| profile.id != id);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> TeamRole {
        self.role
    }

    pub fn players(&self) -> &[PlayerProfile] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn has_player(&self, id: PlayerId) -> bool {
        self.players.iter().any(|profile| profile.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|profile| profile.id)
    }
}

/// A player with a live balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    profile: PlayerProfile,
    balance: Money,
}

impl Player {
    pub fn id(&self) -> PlayerId {
        self.profile.id
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn role(&self) -> TeamRole {
        self.profile.role
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn can_transfer(&self, amount: Money) -> bool {
        self.balance >= amount
    }

    pub fn credit(&mut self, amount: Money) {
        self.balance += amount;
    }

    pub fn debit(&mut self, amount: Money) -> Result<(), crate::MoneyError> {
        self.balance = self.balance.minus(amount)?;
        Ok(())
    }

    /// Debit at most `amount`, returning what was actually taken.
    pub fn debit_up_to(&mut self, amount: Money) -> Money {
        let taken = amount.min(self.balance);
        self.balance = self.balance.minus(taken).unwrap_or_default();
        taken
    }
}
