use tokio::sync::oneshot;

use crate::game::MatchSnapshot;
use crate::model::{PlayerId, TeamRole};

/// Everything a match task can receive.
///
/// Player commands arrive from the transport layer already decoded. Timer
/// expiries and phase transitions travel through the same mailbox so that
/// every change to a match is totally ordered.
#[derive(Debug)]
pub enum MatchCommand {
    /// Start the round whose participants the selection phase fixed.
    StartNewRound,
    /// Nominate `player_id` as this round's candidate for `role`.
    /// `round` of `None` targets the round currently being selected.
    RegisterCandidate {
        role: TeamRole,
        player_id: PlayerId,
        round: Option<u32>,
    },
    /// Add or withdraw `voter_id`'s approval of the registered candidate.
    ToggleApproval { role: TeamRole, voter_id: PlayerId },
    FixCandidate {
        role: TeamRole,
        requester_id: PlayerId,
    },
    DecideSmuggleAmount { player_id: PlayerId, amount: i64 },
    DecidePass { player_id: PlayerId },
    DecideInspection { player_id: PlayerId, amount: i64 },
    TransferAmount {
        from_id: PlayerId,
        to_id: PlayerId,
        amount: i64,
    },
    FinishCurrentRound,
    SyncReconnectedPlayer { player_id: PlayerId },
    RoundTimeout { round: u32 },
    RoundSelectionTimeout { round: u32 },
    PrepareNextSelection { round: u32 },
    FinishedGame,
    GameCleanup,
    Snapshot {
        reply: oneshot::Sender<MatchSnapshot>,
    },
}

impl MatchCommand {
    /// Short name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            MatchCommand::StartNewRound => "start_new_round",
            MatchCommand::RegisterCandidate { .. } => "register_candidate",
            MatchCommand::ToggleApproval { .. } => "toggle_approval",
            MatchCommand::FixCandidate { .. } => "fix_candidate",
            MatchCommand::DecideSmuggleAmount { .. } => "decide_smuggle_amount",
            MatchCommand::DecidePass { .. } => "decide_pass",
            MatchCommand::DecideInspection { .. } => "decide_inspection",
            MatchCommand::TransferAmount { .. } => "transfer_amount",
            MatchCommand::FinishCurrentRound => "finish_current_round",
            MatchCommand::SyncReconnectedPlayer { .. } => "sync_reconnected_player",
            MatchCommand::RoundTimeout { .. } => "round_timeout",
            MatchCommand::RoundSelectionTimeout { .. } => "round_selection_timeout",
            MatchCommand::PrepareNextSelection { .. } => "prepare_next_selection",
            MatchCommand::FinishedGame => "finished_game",
            MatchCommand::GameCleanup => "game_cleanup",
            MatchCommand::Snapshot { .. } => "snapshot",
        }
    }
}
