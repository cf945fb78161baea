//! Round lifecycle inside a match.
//!
//! The engine owns the current round slot, the history of settled rounds,
//! the per-round transfer allowance and the running total the bank paid out.

use std::collections::HashSet;

use crate::Money;
use crate::model::PlayerId;

use super::{GameError, Round, RoundRecord, TeamState, settle};

/// Players who already took part in a transfer for one round number.
///
/// The window covers both candidate selection and round play of that round.
#[derive(Debug, Clone, Default)]
struct TransferUsage {
    round: u32,
    used: HashSet<PlayerId>,
}

impl TransferUsage {
    fn open(round: u32) -> Self {
        Self {
            round,
            used: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundEngine {
    current: Option<Round>,
    completed: Vec<RoundRecord>,
    transfers: TransferUsage,
    bank_paid_out: Money,
}

impl Default for RoundEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Public API
impl RoundEngine {
    pub fn new() -> Self {
        Self {
            current: None,
            completed: Vec::new(),
            transfers: TransferUsage::open(1),
            bank_paid_out: Money::ZERO,
        }
    }

    /// Start round `completed + 1` between two role-correct players.
    pub fn start_round(
        &mut self,
        teams: &TeamState,
        smuggler_id: PlayerId,
        inspector_id: PlayerId,
    ) -> Result<&Round, GameError> {
        if self.current.is_some() {
            return Err(GameError::RoundInProgress);
        }
        teams.validate_smuggler_in_roster(smuggler_id)?;
        teams.validate_inspector_in_roster(inspector_id)?;

        let round = Round::new(self.next_round_number(), smuggler_id, inspector_id);
        Ok(self.current.insert(round))
    }

    pub fn decide_smuggle_amount_for_current_round(
        &mut self,
        teams: &TeamState,
        requester: PlayerId,
        amount: Money,
    ) -> Result<&Round, GameError> {
        let round = self.require_current()?;
        let balance = teams.require_player(round.smuggler_id())?.balance();
        let next = round.declare_smuggle_amount(requester, amount, balance)?;
        Ok(self.current.insert(next))
    }

    pub fn decide_pass_for_current_round(
        &mut self,
        requester: PlayerId,
    ) -> Result<&Round, GameError> {
        let next = self.require_current()?.decide_pass(requester)?;
        Ok(self.current.insert(next))
    }

    pub fn decide_inspection_for_current_round(
        &mut self,
        requester: PlayerId,
        threshold: Money,
    ) -> Result<&Round, GameError> {
        let next = self
            .require_current()?
            .decide_inspection(requester, threshold)?;
        Ok(self.current.insert(next))
    }

    /// Settle the current round and move it into the history:
    /// - Ensure a round is current and both participants acted
    /// - Apply the settlement to both participants
    /// - Record the bank payout
    /// - Clear the slot and open the transfer window of the next round
    pub fn finish_current_round(&mut self, teams: &mut TeamState) -> Result<RoundRecord, GameError> {
        let round = self.require_current()?.clone();
        round.validate_ready_to_settle()?;

        let smuggler = teams.require_player(round.smuggler_id())?;
        let inspector = teams.require_player(round.inspector_id())?;
        let settlement = settle(&round, smuggler, inspector)?;

        teams.replace(settlement.smuggler.clone());
        teams.replace(settlement.inspector.clone());
        self.bank_paid_out += settlement.bank_paid_out();

        let record = RoundRecord { round, settlement };
        self.current = None;
        self.completed.push(record.clone());
        self.prepare_next_round();
        Ok(record)
    }

    pub fn can_finish_current_round(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|round| round.validate_ready_to_settle().is_ok())
    }

    pub fn cannot_finish_current_round(&self) -> bool {
        !self.can_finish_current_round()
    }

    /// Open the transfer window for the round that follows the completed ones.
    pub fn prepare_next_round(&mut self) {
        let next = self.next_round_number();
        if self.transfers.round != next {
            self.transfers = TransferUsage::open(next);
        }
    }

    /// Consume the allowance of both transfer participants for the open round.
    pub fn mark_transfer_used(&mut self, from: PlayerId, to: PlayerId) {
        self.transfers.used.insert(from);
        self.transfers.used.insert(to);
    }

    pub fn can_transfer_next_round(&self, id: PlayerId) -> bool {
        !self.transfers.used.contains(&id)
    }

    pub fn cannot_transfer_next_round(&self, id: PlayerId) -> bool {
        !self.can_transfer_next_round(id)
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.current.as_ref()
    }

    pub fn current_round_number(&self) -> Option<u32> {
        self.current.as_ref().map(Round::number)
    }

    /// Number the next started round will get.
    pub fn next_round_number(&self) -> u32 {
        self.completed.len() as u32 + 1
    }

    pub fn completed_rounds(&self) -> &[RoundRecord] {
        &self.completed
    }

    pub fn completed_round_count(&self) -> u32 {
        self.completed.len() as u32
    }

    pub fn bank_paid_out(&self) -> Money {
        self.bank_paid_out
    }
}

/// Private API
impl RoundEngine {
    fn require_current(&self) -> Result<&Round, GameError> {
        self.current.as_ref().ok_or(GameError::NoCurrentRound)
    }
}
