use std::collections::HashMap;

use crate::Money;
use crate::model::{Player, PlayerId, PlayerProfile, TeamRole, TeamRoster};

use super::{GameError, TransferFailure, TransferFailureReason};

/// Both rosters of a match and the live balance of every player.
#[derive(Debug, Clone)]
pub struct TeamState {
    smugglers: TeamRoster,
    inspectors: TeamRoster,
    players: HashMap<PlayerId, Player>,
}

impl TeamState {
    pub fn new(
        smugglers: TeamRoster,
        inspectors: TeamRoster,
        starting: Money,
    ) -> Result<Self, GameError> {
        if smugglers.role() != TeamRole::Smuggler || inspectors.role() != TeamRole::Inspector {
            return Err(GameError::InvalidTeamRoles);
        }

        let mut players = HashMap::with_capacity(smugglers.len() + inspectors.len());
        for profile in smugglers.players().iter().chain(inspectors.players()) {
            if players.contains_key(&profile.id) {
                return Err(GameError::PlayerInBothTeams(profile.id));
            }
            players.insert(profile.id, profile.to_player(starting));
        }

        Ok(Self {
            smugglers,
            inspectors,
            players,
        })
    }

    pub fn roster(&self, role: TeamRole) -> &TeamRoster {
        match role {
            TeamRole::Smuggler => &self.smugglers,
            TeamRole::Inspector => &self.inspectors,
        }
    }

    pub fn members(&self, role: TeamRole) -> &[PlayerProfile] {
        self.roster(role).players()
    }

    pub fn team_size(&self, role: TeamRole) -> usize {
        self.roster(role).len()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_smuggler(&self, id: PlayerId) -> bool {
        self.smugglers.has_player(id)
    }

    pub fn is_inspector(&self, id: PlayerId) -> bool {
        self.inspectors.has_player(id)
    }

    pub fn role_of(&self, id: PlayerId) -> Option<TeamRole> {
        if self.is_smuggler(id) {
            Some(TeamRole::Smuggler)
        } else if self.is_inspector(id) {
            Some(TeamRole::Inspector)
        } else {
            None
        }
    }

    pub fn is_one_versus_one(&self) -> bool {
        self.smugglers.len() == 1 && self.inspectors.len() == 1
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn require_player(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.players.get(&id).ok_or(GameError::UnknownPlayer(id))
    }

    pub(crate) fn require_player_mut(&mut self, id: PlayerId) -> Result<&mut Player, GameError> {
        self.players.get_mut(&id).ok_or(GameError::UnknownPlayer(id))
    }

    /// Replace a player's state with an updated copy (same id).
    pub(crate) fn replace(&mut self, player: Player) {
        self.players.insert(player.id(), player);
    }

    pub fn validate_smuggler_in_roster(&self, id: PlayerId) -> Result<(), GameError> {
        if !self.is_smuggler(id) {
            return Err(GameError::SmugglerNotInRoster(id));
        }
        Ok(())
    }

    pub fn validate_inspector_in_roster(&self, id: PlayerId) -> Result<(), GameError> {
        if !self.is_inspector(id) {
            return Err(GameError::InspectorNotInRoster(id));
        }
        Ok(())
    }

    pub fn validate_same_team(&self, a: PlayerId, b: PlayerId) -> Result<(), TransferFailure> {
        let smugglers = self.is_smuggler(a) && self.is_smuggler(b);
        let inspectors = self.is_inspector(a) && self.is_inspector(b);
        if !(smugglers || inspectors) {
            return Err(TransferFailureReason::CrossTeam.into());
        }
        Ok(())
    }

    pub fn total_balance(&self, role: TeamRole) -> Money {
        self.roster(role)
            .ids()
            .filter_map(|id| self.players.get(&id))
            .map(Player::balance)
            .sum()
    }

    /// Sum of every player's balance across both teams.
    pub fn grand_total(&self) -> Money {
        self.players.values().map(Player::balance).sum()
    }

    pub fn both_teams_out_of_money(&self) -> bool {
        self.total_balance(TeamRole::Smuggler).is_zero()
            && self.total_balance(TeamRole::Inspector).is_zero()
    }
}
