//! Match aggregate.
//!
//! A [`ContrabandGame`] owns both teams and the round engine of one match.
//! It enforces the phase rules (not started, in progress, finished), the
//! transfer rules between teammates and the winner decision.

use serde::Serialize;
use tracing::info;

use crate::Money;
use crate::model::{PlayerId, TeamRole, TeamRoster};

mod engine;
pub use engine::RoundEngine;

mod error;
pub use error::{GameError, RoundError, TransferFailure, TransferFailureReason};

mod round;
pub use round::{
    InspectionDecision, MAX_INSPECTION_THRESHOLD, MAX_SMUGGLE_AMOUNT, Round, RoundStatus,
};

mod settle;
pub use settle::{Account, Movement, RoundOutcomeType, RoundRecord, RoundSettlement, settle};

mod team;
pub use team::TeamState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    NotStarted,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    SmugglerTeam,
    InspectorTeam,
    /// Both teams hold exactly the same total.
    Draw,
}

/// A transfer that went through, with both balances after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from: PlayerId,
    pub to: PlayerId,
    pub amount: Money,
    pub from_balance: Money,
    pub to_balance: Money,
}

/// Public view of one player, used in start and resync payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub role: TeamRole,
    pub balance: Money,
}

/// Read-only snapshot of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    pub status: GameStatus,
    pub total_rounds: u32,
    pub completed_rounds: u32,
    pub current_round: Option<u32>,
    pub players: Vec<PlayerEntry>,
    pub smuggler_total: Money,
    pub inspector_total: Money,
    pub bank_paid_out: Money,
}

#[derive(Debug, Clone)]
pub struct ContrabandGame {
    total_rounds: u32,
    status: GameStatus,
    teams: TeamState,
    engine: RoundEngine,
}

/// Public API
impl ContrabandGame {
    /// Create a match where every player holds [`Money::STARTING`].
    pub fn not_started(
        smugglers: TeamRoster,
        inspectors: TeamRoster,
        total_rounds: u32,
    ) -> Result<Self, GameError> {
        if total_rounds < 1 {
            return Err(GameError::InvalidTotalRounds);
        }
        let teams = TeamState::new(smugglers, inspectors, Money::STARTING)?;

        Ok(Self {
            total_rounds,
            status: GameStatus::NotStarted,
            teams,
            engine: RoundEngine::new(),
        })
    }

    pub fn start_new_round(
        &mut self,
        smuggler_id: PlayerId,
        inspector_id: PlayerId,
    ) -> Result<&Round, GameError> {
        if self.is_finished() {
            return Err(GameError::AlreadyFinished);
        }
        if self.engine.current_round().is_some() {
            return Err(GameError::RoundInProgress);
        }
        if self.engine.completed_round_count() >= self.total_rounds {
            return Err(GameError::RoundsExhausted);
        }

        let round = self
            .engine
            .start_round(&self.teams, smuggler_id, inspector_id)?;
        self.status = GameStatus::InProgress;
        Ok(round)
    }

    pub fn decide_smuggle_amount_for_current_round(
        &mut self,
        requester: PlayerId,
        amount: Money,
    ) -> Result<&Round, GameError> {
        self.engine
            .decide_smuggle_amount_for_current_round(&self.teams, requester, amount)
    }

    pub fn decide_pass_for_current_round(
        &mut self,
        requester: PlayerId,
    ) -> Result<&Round, GameError> {
        self.engine.decide_pass_for_current_round(requester)
    }

    pub fn decide_inspection_for_current_round(
        &mut self,
        requester: PlayerId,
        threshold: Money,
    ) -> Result<&Round, GameError> {
        self.engine
            .decide_inspection_for_current_round(requester, threshold)
    }

    /// Settle the current round. The match finishes once every round is
    /// played or both teams are out of money.
    pub fn finish_current_round(&mut self) -> Result<RoundRecord, GameError> {
        let record = self.engine.finish_current_round(&mut self.teams)?;
        if self.engine.completed_round_count() >= self.total_rounds
            || self.teams.both_teams_out_of_money()
        {
            self.status = GameStatus::Finished;
        }
        info!(
            round = record.round.number(),
            outcome = ?record.settlement.outcome,
            status = ?self.status,
            "round settled"
        );
        Ok(record)
    }

    pub fn can_finish_current_round(&self) -> bool {
        self.engine.can_finish_current_round()
    }

    /// Move `amount` between two teammates. Nothing changes on failure.
    pub fn transfer_within_team(
        &mut self,
        from: PlayerId,
        to: PlayerId,
        amount: Money,
    ) -> Result<TransferReceipt, TransferFailure> {
        self.validate_transfer(from, to, amount)?;

        let sender = self
            .teams
            .require_player_mut(from)
            .map_err(|_| TransferFailureReason::UnknownSender)?;
        sender
            .debit(amount)
            .map_err(|_| TransferFailureReason::InsufficientBalance)?;
        let from_balance = sender.balance();

        let recipient = self
            .teams
            .require_player_mut(to)
            .map_err(|_| TransferFailureReason::UnknownRecipient)?;
        recipient.credit(amount);
        let to_balance = recipient.balance();

        self.engine.mark_transfer_used(from, to);
        Ok(TransferReceipt {
            from,
            to,
            amount,
            from_balance,
            to_balance,
        })
    }

    pub fn can_transfer_next_round(&self, id: PlayerId) -> bool {
        self.engine.can_transfer_next_round(id)
    }

    pub fn prepare_next_round(&mut self) {
        self.engine.prepare_next_round();
    }

    pub fn determine_winner(&self) -> Result<Winner, GameError> {
        if !self.is_finished() {
            return Err(GameError::NotFinished);
        }
        let smugglers = self.smuggler_total_balance();
        let inspectors = self.inspector_total_balance();
        Ok(match smugglers.cmp(&inspectors) {
            std::cmp::Ordering::Greater => Winner::SmugglerTeam,
            std::cmp::Ordering::Less => Winner::InspectorTeam,
            std::cmp::Ordering::Equal => Winner::Draw,
        })
    }

    pub fn player_balance(&self, id: PlayerId) -> Result<Money, GameError> {
        self.teams.require_player(id).map(|player| player.balance())
    }

    pub fn smuggler_total_balance(&self) -> Money {
        self.teams.total_balance(TeamRole::Smuggler)
    }

    pub fn inspector_total_balance(&self) -> Money {
        self.teams.total_balance(TeamRole::Inspector)
    }

    pub fn has_current_round(&self) -> bool {
        self.engine.current_round().is_some()
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.engine.current_round()
    }

    /// Number the next started round will get.
    pub fn next_round_number(&self) -> u32 {
        self.engine.next_round_number()
    }

    pub fn completed_round_count(&self) -> u32 {
        self.engine.completed_round_count()
    }

    pub fn completed_rounds(&self) -> &[RoundRecord] {
        self.engine.completed_rounds()
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    pub fn bank_paid_out(&self) -> Money {
        self.engine.bank_paid_out()
    }

    pub fn teams(&self) -> &TeamState {
        &self.teams
    }

    /// Every player in roster order, smugglers first.
    pub fn roster_entries(&self) -> Vec<PlayerEntry> {
        [TeamRole::Smuggler, TeamRole::Inspector]
            .into_iter()
            .flat_map(|role| self.teams.members(role))
            .filter_map(|profile| self.teams.player(profile.id))
            .map(|player| PlayerEntry {
                player_id: player.id(),
                name: player.name().to_string(),
                role: player.role(),
                balance: player.balance(),
            })
            .collect()
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            status: self.status,
            total_rounds: self.total_rounds,
            completed_rounds: self.completed_round_count(),
            current_round: self.engine.current_round_number(),
            players: self.roster_entries(),
            smuggler_total: self.smuggler_total_balance(),
            inspector_total: self.inspector_total_balance(),
            bank_paid_out: self.bank_paid_out(),
        }
    }
}

/// Private API
impl ContrabandGame {
    /// Check every transfer rule before anything is mutated.
    fn validate_transfer(
        &self,
        from: PlayerId,
        to: PlayerId,
        amount: Money,
    ) -> Result<(), TransferFailure> {
        if self.is_finished() {
            return Err(TransferFailureReason::GameFinished.into());
        }
        if from == to {
            return Err(TransferFailureReason::SelfTransfer.into());
        }
        if amount.is_zero() {
            return Err(TransferFailureReason::InvalidAmount.into());
        }
        if !amount.is_hundreds_unit() {
            return Err(TransferFailureReason::InvalidUnit.into());
        }
        let sender = self
            .teams
            .player(from)
            .ok_or(TransferFailureReason::UnknownSender)?;
        if self.teams.player(to).is_none() {
            return Err(TransferFailureReason::UnknownRecipient.into());
        }
        self.teams.validate_same_team(from, to)?;
        if self.engine.cannot_transfer_next_round(from) || self.engine.cannot_transfer_next_round(to)
        {
            return Err(TransferFailureReason::AlreadyParticipated.into());
        }
        if !sender.can_transfer(amount) {
            return Err(TransferFailureReason::InsufficientBalance.into());
        }
        Ok(())
    }
}
