//! Round play phase: decisions, timeout forcing and settlement.

use tracing::{debug, info, warn};

use super::context::{MatchContext, RoundSelection};
use super::timer::{PhaseTimer, ROUND_DURATION, epoch_millis};
use super::{ErrorCode, MatchCommand, ServerEvent};
use crate::Money;
use crate::game::{GameError, InspectionDecision};
use crate::model::{PlayerId, TeamRole};

const NOT_ROUND_SMUGGLER: &str = "현재 라운드를 진행하는 밀수꾼이 아닙니다.";
const NOT_ROUND_INSPECTOR: &str = "현재 라운드를 진행하는 검사관이 아닙니다.";

/// Notice sent to a player whose decision does not belong to the current round.
pub(crate) fn not_current_participant(role: TeamRole) -> ServerEvent {
    match role {
        TeamRole::Smuggler => ServerEvent::error(ErrorCode::NotCurrentRoundSmuggler, NOT_ROUND_SMUGGLER),
        TeamRole::Inspector => ServerEvent::error(ErrorCode::NotCurrentRoundInspector, NOT_ROUND_INSPECTOR),
    }
}

/// Control-flow step of the round being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    WaitingActions,
    PendingFinish,
    Finished,
}

/// Participants and per-role progress of the round being played.
#[derive(Debug, Default)]
pub struct RoundFlowState {
    round: u32,
    smuggler_id: Option<PlayerId>,
    inspector_id: Option<PlayerId>,
    smuggler_done: bool,
    inspector_done: bool,
    timer: PhaseTimer,
}

impl RoundFlowState {
    pub fn assign(&mut self, round: u32, smuggler_id: PlayerId, inspector_id: PlayerId) {
        self.round = round;
        self.smuggler_id = Some(smuggler_id);
        self.inspector_id = Some(inspector_id);
        self.smuggler_done = false;
        self.inspector_done = false;
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn smuggler_id(&self) -> Option<PlayerId> {
        self.smuggler_id
    }

    pub fn inspector_id(&self) -> Option<PlayerId> {
        self.inspector_id
    }

    pub fn is_current(&self, role: TeamRole, player: PlayerId) -> bool {
        let current = match role {
            TeamRole::Smuggler => self.smuggler_id,
            TeamRole::Inspector => self.inspector_id,
        };
        current == Some(player)
    }

    pub fn is_done(&self, role: TeamRole) -> bool {
        match role {
            TeamRole::Smuggler => self.smuggler_done,
            TeamRole::Inspector => self.inspector_done,
        }
    }

    pub fn mark_done(&mut self, role: TeamRole) {
        match role {
            TeamRole::Smuggler => self.smuggler_done = true,
            TeamRole::Inspector => self.inspector_done = true,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        if self.smuggler_id.is_none() {
            RoundPhase::Finished
        } else if self.smuggler_done && self.inspector_done {
            RoundPhase::PendingFinish
        } else {
            RoundPhase::WaitingActions
        }
    }

    /// Forget the participants and stop the round timer.
    pub fn reset_after_finish(&mut self) {
        self.smuggler_id = None;
        self.inspector_id = None;
        self.smuggler_done = false;
        self.inspector_done = false;
        self.timer.cancel();
    }
}

/// Drives one round from start to settlement.
#[derive(Debug)]
pub struct RoundCoordinator {
    flow: RoundFlowState,
}

/// Public API
impl RoundCoordinator {
    /// Open the round the selection phase fixed and start its timer.
    ///
    /// Nothing is broadcast when the match refuses the round.
    pub(crate) fn start(ctx: &mut MatchContext, selection: RoundSelection) -> Result<Self, GameError> {
        let number = ctx
            .game
            .start_new_round(selection.smuggler_id, selection.inspector_id)?
            .number();

        let mut flow = RoundFlowState::default();
        flow.assign(number, selection.smuggler_id, selection.inspector_id);
        let timer = flow.timer.start(
            &ctx.mailbox,
            ROUND_DURATION,
            MatchCommand::RoundTimeout { round: number },
        );

        info!(
            match_id = ctx.match_id,
            round = number,
            smuggler = selection.smuggler_id,
            inspector = selection.inspector_id,
            "round started"
        );
        ctx.broadcast_all(ServerEvent::RoundStarted {
            round: number,
            smuggler_id: selection.smuggler_id,
            inspector_id: selection.inspector_id,
            started_at_ms: timer.started_at_ms,
            duration_ms: timer.duration_ms(),
            server_now_ms: timer.started_at_ms,
            end_at_ms: timer.end_at_ms(),
        });

        Ok(Self { flow })
    }

    pub fn flow(&self) -> &RoundFlowState {
        &self.flow
    }

    pub(crate) fn decide_smuggle_amount(&mut self, ctx: &mut MatchContext, player: PlayerId, amount: i64) {
        if !self.flow.is_current(TeamRole::Smuggler, player) {
            ctx.send_to(player, not_current_participant(TeamRole::Smuggler));
            return;
        }

        let result = Money::from_amount(amount)
            .map_err(GameError::from)
            .and_then(|amount| {
                ctx.game
                    .decide_smuggle_amount_for_current_round(player, amount)
                    .map(|_| amount)
            });
        match result {
            Ok(amount) => {
                info!(match_id = ctx.match_id, round = self.flow.round, player, %amount, "smuggle amount declared");
                ctx.broadcast_all(ServerEvent::SmuggleAmountDeclared {
                    smuggler_id: player,
                    amount,
                });
                self.action_done(ctx, TeamRole::Smuggler);
            }
            Err(e) => self.reject(ctx, player, e),
        }
    }

    pub(crate) fn decide_pass(&mut self, ctx: &mut MatchContext, player: PlayerId) {
        if !self.flow.is_current(TeamRole::Inspector, player) {
            ctx.send_to(player, not_current_participant(TeamRole::Inspector));
            return;
        }

        match ctx.game.decide_pass_for_current_round(player) {
            Ok(_) => {
                info!(match_id = ctx.match_id, round = self.flow.round, player, "pass decided");
                ctx.broadcast_all(ServerEvent::PassDecided { inspector_id: player });
                self.action_done(ctx, TeamRole::Inspector);
            }
            Err(e) => self.reject(ctx, player, e),
        }
    }

    pub(crate) fn decide_inspection(&mut self, ctx: &mut MatchContext, player: PlayerId, amount: i64) {
        if !self.flow.is_current(TeamRole::Inspector, player) {
            ctx.send_to(player, not_current_participant(TeamRole::Inspector));
            return;
        }

        let result = Money::from_amount(amount)
            .map_err(GameError::from)
            .and_then(|threshold| {
                ctx.game
                    .decide_inspection_for_current_round(player, threshold)
                    .map(|_| threshold)
            });
        match result {
            Ok(threshold) => {
                info!(match_id = ctx.match_id, round = self.flow.round, player, %threshold, "inspection decided");
                ctx.broadcast_all(ServerEvent::InspectionDecided {
                    inspector_id: player,
                    amount: Some(threshold),
                });
                self.action_done(ctx, TeamRole::Inspector);
            }
            Err(e) => self.reject(ctx, player, e),
        }
    }

    /// Settle the round once both participants acted.
    ///
    /// The round timer is cancelled on every attempt. A failed settlement
    /// leaves the round open and notifies everyone.
    pub(crate) fn finish(&mut self, ctx: &mut MatchContext) {
        if !ctx.game.can_finish_current_round() {
            debug!(match_id = ctx.match_id, round = self.flow.round, "round not finishable yet");
            return;
        }
        self.flow.timer.cancel();

        let record = match ctx.game.finish_current_round() {
            Ok(record) => record,
            Err(e) => {
                warn!(match_id = ctx.match_id, round = self.flow.round, reason = %e, "round settlement failed");
                ctx.broadcast_all(ServerEvent::invalid_state(e.to_string()));
                return;
            }
        };

        let settlement = &record.settlement;
        ctx.broadcast_all(ServerEvent::RoundFinished {
            smuggler_id: settlement.smuggler.id(),
            smuggler_balance: settlement.smuggler.balance(),
            inspector_id: settlement.inspector.id(),
            inspector_balance: settlement.inspector.balance(),
            outcome_type: settlement.outcome,
        });
        ctx.ports.chat.clear_round_chat();

        if ctx.game.is_finished() {
            ctx.tell_self(MatchCommand::FinishedGame);
        } else {
            ctx.tell_self(MatchCommand::PrepareNextSelection {
                round: self.flow.round + 1,
            });
        }
        self.flow.reset_after_finish();
    }

    /// Force the default decision of every participant who has not acted:
    /// the smuggler declares nothing and the inspector passes.
    pub(crate) fn timeout(&mut self, ctx: &mut MatchContext, round: u32) {
        if round != self.flow.round || self.flow.phase() != RoundPhase::WaitingActions {
            debug!(match_id = ctx.match_id, round, current = self.flow.round, "round timeout ignored");
            return;
        }
        info!(match_id = ctx.match_id, round, "round timed out");

        if let (Some(player_id), false) = (self.flow.smuggler_id, self.flow.smuggler_done) {
            ctx.tell_self(MatchCommand::DecideSmuggleAmount { player_id, amount: 0 });
        }
        if let (Some(player_id), false) = (self.flow.inspector_id, self.flow.inspector_done) {
            ctx.tell_self(MatchCommand::DecidePass { player_id });
        }
    }

    /// Replay the open round to `player`.
    pub(crate) fn sync(&self, ctx: &MatchContext, player: PlayerId) {
        let Some(round) = ctx.game.current_round() else {
            return;
        };

        let now = epoch_millis();
        let (started_at_ms, duration_ms, end_at_ms) = match self.flow.timer.snapshot() {
            Some(timer) => (timer.started_at_ms, timer.duration_ms(), timer.end_at_ms()),
            None => {
                let duration_ms = ROUND_DURATION.as_millis() as u64;
                (now, duration_ms, now + duration_ms)
            }
        };

        let mut events = vec![ServerEvent::RoundStarted {
            round: round.number(),
            smuggler_id: round.smuggler_id(),
            inspector_id: round.inspector_id(),
            started_at_ms,
            duration_ms,
            server_now_ms: now,
            end_at_ms,
        }];
        if let Some(amount) = round.smuggle_amount() {
            events.push(ServerEvent::SmuggleAmountDeclared {
                smuggler_id: round.smuggler_id(),
                amount,
            });
        }
        match round.inspection() {
            InspectionDecision::Pending => {}
            InspectionDecision::Pass => events.push(ServerEvent::PassDecided {
                inspector_id: round.inspector_id(),
            }),
            InspectionDecision::Inspect { threshold } => events.push(ServerEvent::InspectionDecided {
                inspector_id: round.inspector_id(),
                amount: Some(threshold),
            }),
        }

        for event in events {
            ctx.send_to(player, event);
        }
    }
}

/// Private API
impl RoundCoordinator {
    fn action_done(&mut self, ctx: &mut MatchContext, role: TeamRole) {
        self.flow.mark_done(role);
        if self.flow.phase() == RoundPhase::PendingFinish && ctx.game.can_finish_current_round() {
            ctx.tell_self(MatchCommand::FinishCurrentRound);
        }
    }

    fn reject(&self, ctx: &MatchContext, player: PlayerId, error: GameError) {
        info!(match_id = ctx.match_id, round = self.flow.round, player, reason = %error, "decision skipped");
        ctx.send_to(player, ServerEvent::invalid_state(error.to_string()));
    }
}
