//! Match task.
//!
//! A match runs as a single tokio task that owns the [`ContrabandGame`] and
//! consumes [`MatchCommand`]s from its mailbox one at a time. The facade
//! routes each command to the coordinator of the current phase (candidate
//! selection or round play). Follow-up commands a coordinator issues are
//! handled before the next message from the mailbox.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::game::{ContrabandGame, MatchSnapshot};
use crate::model::{MatchId, PlayerId, TeamRole};

mod command;
pub use command::MatchCommand;

mod context;
use context::MatchContext;
pub use context::RoundSelection;

mod event;
pub use event::{ErrorCode, ServerEvent};

pub mod ports;
pub use ports::{
    ChatRelay, EventSink, LifecycleNotifier, LocalSessionRegistry, MatchPorts, SessionRegistry,
    Supervisor, TracingPorts,
};

mod round;
pub use round::{RoundCoordinator, RoundFlowState, RoundPhase};

mod selection;
pub use selection::{
    RoleSelection, SelectionCoordinator, SelectionError, SelectionParticipants, SelectionState,
};

mod timer;
pub use timer::{PhaseTimer, ROUND_DURATION, SELECTION_DURATION, TimerSnapshot, epoch_millis};

/// Capacity of a match mailbox.
const MAILBOX_CAPACITY: usize = 64;

/// The match task is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("match {0} is closed")]
pub struct MatchClosed(pub MatchId);

/// Handle to a running match task.
#[derive(Debug)]
pub struct MatchHandle {
    match_id: MatchId,
    sender: mpsc::Sender<MatchCommand>,
    task: JoinHandle<MatchSnapshot>,
}

impl MatchHandle {
    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    pub async fn send(&self, command: MatchCommand) -> Result<(), MatchClosed> {
        self.sender
            .send(command)
            .await
            .map_err(|_| MatchClosed(self.match_id))
    }

    /// Read-only view of the match, ordered after every command sent before.
    pub async fn snapshot(&self) -> Result<MatchSnapshot, MatchClosed> {
        let (reply, response) = oneshot::channel();
        self.send(MatchCommand::Snapshot { reply }).await?;
        response.await.map_err(|_| MatchClosed(self.match_id))
    }

    /// Whether the match task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Close the mailbox and wait for the task to stop, returning the final state.
    pub async fn shutdown(self) -> Result<MatchSnapshot, MatchClosed> {
        let Self {
            match_id,
            sender,
            task,
        } = self;
        drop(sender);
        task.await.map_err(|_| MatchClosed(match_id))
    }
}

/// Spawn the task of a freshly created match.
///
/// Every connected session receives `GameStarted`, then the first round's
/// candidate selection begins.
pub fn spawn_match(match_id: MatchId, game: ContrabandGame, ports: MatchPorts) -> MatchHandle {
    let (sender, receiver) = mpsc::channel(MAILBOX_CAPACITY);
    let ctx = MatchContext::new(match_id, game, ports, sender.downgrade());
    let task = tokio::spawn(MatchFacade::new(ctx).run(ReceiverStream::new(receiver)));

    MatchHandle {
        match_id,
        sender,
        task,
    }
}

/// Coordinator owning the current phase.
#[derive(Debug)]
enum Active {
    Selection(SelectionCoordinator),
    Round(RoundCoordinator),
    Closed,
}

struct MatchFacade {
    ctx: MatchContext,
    active: Active,
}

/// Public API
impl MatchFacade {
    fn new(ctx: MatchContext) -> Self {
        Self {
            ctx,
            active: Active::Closed,
        }
    }

    async fn run(mut self, mut mailbox: ReceiverStream<MatchCommand>) -> MatchSnapshot {
        self.open();
        self.drain_follow_ups();

        while !self.is_closed() {
            let Some(command) = mailbox.next().await else {
                debug!(match_id = self.ctx.match_id, "mailbox closed");
                break;
            };
            self.handle(command);
            self.drain_follow_ups();
        }

        // Drop timers before reporting the final state.
        self.active = Active::Closed;
        info!(match_id = self.ctx.match_id, "match stopped");
        self.ctx.game.snapshot()
    }
}

/// Private API
impl MatchFacade {
    fn open(&mut self) {
        info!(
            match_id = self.ctx.match_id,
            players = self.ctx.game.teams().player_count(),
            total_rounds = self.ctx.game.total_rounds(),
            "match started"
        );
        self.ctx.broadcast_all(self.ctx.game_started_event());
        let round = self.ctx.game.next_round_number();
        self.active = Active::Selection(SelectionCoordinator::start(&mut self.ctx, round));
    }

    fn is_closed(&self) -> bool {
        matches!(self.active, Active::Closed)
    }

    fn drain_follow_ups(&mut self) {
        while !self.is_closed() {
            let Some(command) = self.ctx.next_follow_up() else {
                break;
            };
            self.handle(command);
        }
    }

    fn handle(&mut self, command: MatchCommand) {
        debug!(match_id = self.ctx.match_id, command = command.kind(), "handling command");
        let ctx = &mut self.ctx;

        match command {
            MatchCommand::TransferAmount { from_id, to_id, amount } => {
                ctx.apply_transfer(from_id, to_id, amount);
            }
            MatchCommand::Snapshot { reply } => {
                // The requester may have given up waiting.
                let _ = reply.send(ctx.game.snapshot());
            }
            MatchCommand::SyncReconnectedPlayer { player_id } => self.sync_reconnected(player_id),
            MatchCommand::StartNewRound => self.start_new_round(),
            MatchCommand::PrepareNextSelection { round } => self.prepare_next_selection(round),
            MatchCommand::FinishedGame => self.finish_game(),
            MatchCommand::GameCleanup => {
                info!(match_id = ctx.match_id, "match cleaned up");
                self.active = Active::Closed;
            }

            MatchCommand::RegisterCandidate { role, player_id, round } => match &mut self.active {
                Active::Selection(selection) => selection.register_candidate(ctx, role, player_id, round),
                _ => Self::reject_outside_selection(ctx, player_id),
            },
            MatchCommand::ToggleApproval { role, voter_id } => match &mut self.active {
                Active::Selection(selection) => selection.toggle_approval(ctx, role, voter_id),
                _ => Self::reject_outside_selection(ctx, voter_id),
            },
            MatchCommand::FixCandidate { role, requester_id } => match &mut self.active {
                Active::Selection(selection) => selection.fix_candidate(ctx, role, requester_id),
                _ => Self::reject_outside_selection(ctx, requester_id),
            },
            MatchCommand::RoundSelectionTimeout { round } => match &mut self.active {
                Active::Selection(selection) => selection.timeout(ctx, round),
                _ => debug!(match_id = ctx.match_id, round, "selection timeout outside selection ignored"),
            },

            MatchCommand::DecideSmuggleAmount { player_id, amount } => match &mut self.active {
                Active::Round(round) => round.decide_smuggle_amount(ctx, player_id, amount),
                _ => Self::reject_outside_round(ctx, TeamRole::Smuggler, player_id),
            },
            MatchCommand::DecidePass { player_id } => match &mut self.active {
                Active::Round(round) => round.decide_pass(ctx, player_id),
                _ => Self::reject_outside_round(ctx, TeamRole::Inspector, player_id),
            },
            MatchCommand::DecideInspection { player_id, amount } => match &mut self.active {
                Active::Round(round) => round.decide_inspection(ctx, player_id, amount),
                _ => Self::reject_outside_round(ctx, TeamRole::Inspector, player_id),
            },
            MatchCommand::FinishCurrentRound => match &mut self.active {
                Active::Round(round) => round.finish(ctx),
                _ => debug!(match_id = ctx.match_id, "finish outside round ignored"),
            },
            MatchCommand::RoundTimeout { round: number } => match &mut self.active {
                Active::Round(round) => round.timeout(ctx, number),
                _ => debug!(match_id = ctx.match_id, round = number, "round timeout outside round ignored"),
            },
        }
    }

    /// Leave selection for round play.
    ///
    /// On refusal selection stays active and keeps the fixed participants,
    /// so a later `StartNewRound` retries. A match that is already over
    /// finishes instead.
    fn start_new_round(&mut self) {
        if !matches!(self.active, Active::Selection(_)) {
            debug!(match_id = self.ctx.match_id, "start outside selection ignored");
            return;
        }
        let Some(selection) = self.ctx.pending_round.take() else {
            debug!(match_id = self.ctx.match_id, "no selection ready, start ignored");
            return;
        };

        match RoundCoordinator::start(&mut self.ctx, selection) {
            Ok(round) => self.active = Active::Round(round),
            Err(e) => {
                warn!(
                    match_id = self.ctx.match_id,
                    round = selection.round,
                    reason = %e,
                    "round start failed"
                );
                self.ctx.broadcast_all(ServerEvent::invalid_state(e.to_string()));
                self.ctx.pending_round = Some(selection);
                if self.ctx.game.is_finished() {
                    self.ctx.tell_self(MatchCommand::FinishedGame);
                }
            }
        }
    }

    fn prepare_next_selection(&mut self, round: u32) {
        if let Active::Selection(selection) = &mut self.active {
            selection.prepare_next(&mut self.ctx, round);
        } else if matches!(self.active, Active::Round(_)) {
            self.active = Active::Selection(SelectionCoordinator::start(&mut self.ctx, round));
        }
    }

    fn finish_game(&mut self) {
        let Some(finished) = self.ctx.game_finished_event() else {
            debug!(match_id = self.ctx.match_id, "match not finished, ignored");
            return;
        };
        info!(match_id = self.ctx.match_id, event = %finished.to_json(), "match finished");

        self.ctx.broadcast_all(finished);
        self.ctx.ports.lifecycle.publish_game_ended(self.ctx.match_id);
        self.ctx.ports.chat.clear_all_game_chat();
        self.ctx.ports.supervisor.notify_game_ended();
        self.ctx.tell_self(MatchCommand::GameCleanup);
    }

    /// Send `GameStarted`, the progress of the current phase and, once the
    /// match is over, its result.
    fn sync_reconnected(&self, player: PlayerId) {
        let ctx = &self.ctx;
        if ctx.ports.sessions.session_for(player).is_none() {
            debug!(match_id = ctx.match_id, player, "sync without session ignored");
            return;
        }
        if ctx.game.teams().role_of(player).is_none() {
            debug!(match_id = ctx.match_id, player, "sync for unknown player ignored");
            return;
        }

        ctx.send_to(player, ctx.game_started_event());
        match &self.active {
            Active::Selection(selection) => selection.sync(ctx, player),
            Active::Round(round) => round.sync(ctx, player),
            Active::Closed => {}
        }
        if let Some(finished) = ctx.game_finished_event() {
            ctx.send_to(player, finished);
        }
        info!(match_id = ctx.match_id, player, "player resynced");
    }

    fn reject_outside_selection(ctx: &MatchContext, player: PlayerId) {
        debug!(match_id = ctx.match_id, player, "selection request outside selection");
        ctx.send_to(player, ServerEvent::invalid_state(SelectionError::NotSelecting.to_string()));
    }

    fn reject_outside_round(ctx: &MatchContext, role: TeamRole, player: PlayerId) {
        debug!(match_id = ctx.match_id, player, %role, "decision outside round");
        ctx.send_to(player, round::not_current_participant(role));
    }
}
