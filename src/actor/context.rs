use std::collections::VecDeque;

use tokio::sync::mpsc::WeakSender;
use tracing::{debug, info};

use super::{MatchCommand, MatchPorts, ServerEvent};
use crate::Money;
use crate::game::{ContrabandGame, TransferFailure, TransferFailureReason};
use crate::model::{MatchId, PlayerId, TeamRole};

/// Participants fixed by the selection phase, waiting for the round to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSelection {
    pub round: u32,
    pub smuggler_id: PlayerId,
    pub inspector_id: PlayerId,
}

/// State shared by the facade and whichever coordinator is active.
pub(crate) struct MatchContext {
    pub match_id: MatchId,
    pub game: ContrabandGame,
    pub ports: MatchPorts,
    pub mailbox: WeakSender<MatchCommand>,
    pub pending_round: Option<RoundSelection>,
    follow_ups: VecDeque<MatchCommand>,
}

impl MatchContext {
    pub fn new(
        match_id: MatchId,
        game: ContrabandGame,
        ports: MatchPorts,
        mailbox: WeakSender<MatchCommand>,
    ) -> Self {
        Self {
            match_id,
            game,
            ports,
            mailbox,
            pending_round: None,
            follow_ups: VecDeque::new(),
        }
    }

    /// Queue a command handled before the next inbound message.
    pub fn tell_self(&mut self, command: MatchCommand) {
        self.follow_ups.push_back(command);
    }

    pub fn next_follow_up(&mut self) -> Option<MatchCommand> {
        self.follow_ups.pop_front()
    }

    /// Send to one player. Returns `false` when the player has no session.
    pub fn send_to(&self, player: PlayerId, event: ServerEvent) -> bool {
        match self.ports.sessions.session_for(player) {
            Some(session) => session.send(event),
            None => {
                debug!(match_id = self.match_id, player, "no session, event not sent");
                false
            }
        }
    }

    pub fn broadcast_all(&self, event: ServerEvent) {
        debug!(match_id = self.match_id, event = %event.to_json(), "broadcast");
        self.ports.sessions.broadcast_all(&event);
    }

    pub fn broadcast_team(&self, role: TeamRole, event: ServerEvent) {
        debug!(match_id = self.match_id, team = %role, event = %event.to_json(), "team broadcast");
        self.ports.sessions.broadcast_team(role, &event);
    }

    pub fn game_started_event(&self) -> ServerEvent {
        ServerEvent::GameStarted {
            players: self.game.roster_entries(),
        }
    }

    /// Final result, present once the match is over.
    pub fn game_finished_event(&self) -> Option<ServerEvent> {
        let winner = self.game.determine_winner().ok()?;
        Some(ServerEvent::GameFinished {
            winner_team: winner,
            smuggler_total: self.game.smuggler_total_balance(),
            inspector_total: self.game.inspector_total_balance(),
        })
    }

    /// Apply a teammate transfer requested in any phase:
    /// - Ignore senders without a session
    /// - Report failures to the sender only
    /// - Report success to both sender and recipient
    pub fn apply_transfer(&mut self, from: PlayerId, to: PlayerId, amount: i64) {
        let Some(sender) = self.ports.sessions.session_for(from) else {
            debug!(match_id = self.match_id, from, "transfer from unknown session ignored");
            return;
        };

        let result = Money::from_amount(amount)
            .map_err(|_| TransferFailure::from(TransferFailureReason::InvalidAmount))
            .and_then(|amount| self.game.transfer_within_team(from, to, amount));

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(failure) => {
                info!(
                    match_id = self.match_id,
                    from,
                    to,
                    amount,
                    reason = %failure,
                    "transfer skipped"
                );
                sender.send(failure.into());
                return;
            }
        };
        info!(match_id = self.match_id, from, to, amount, "transfer applied");

        let Some(recipient) = self.ports.sessions.session_for(to) else {
            sender.send(
                TransferFailure {
                    reason: TransferFailureReason::UnknownRecipient,
                    message: "수신자 세션을 찾을 수 없습니다.",
                }
                .into(),
            );
            return;
        };

        let applied = ServerEvent::TransferApplied {
            from_id: receipt.from,
            to_id: receipt.to,
            from_balance: receipt.from_balance,
            to_balance: receipt.to_balance,
            amount: receipt.amount,
        };
        sender.send(applied.clone());
        recipient.send(applied);
    }
}
