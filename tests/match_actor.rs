use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contraband::actor::{
    ChatRelay, ErrorCode, LifecycleNotifier, LocalSessionRegistry, MatchCommand, MatchHandle,
    MatchPorts, ROUND_DURATION, SELECTION_DURATION, ServerEvent, Supervisor, spawn_match,
};
use contraband::game::{GameStatus, RoundOutcomeType, TransferFailureReason, Winner};
use contraband::model::{MatchId, PlayerId, PlayerProfile, TeamRole, TeamRoster};
use contraband::{ContrabandGame, MatchSnapshot, Money};
use tokio::sync::mpsc::UnboundedReceiver;

const MATCH_ID: MatchId = 7;

/// Records every call made to the chat, lifecycle and supervisor ports.
#[derive(Default)]
struct SpyPorts {
    calls: Mutex<Vec<String>>,
}

impl SpyPorts {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ChatRelay for SpyPorts {
    fn sync_round_participants(&self, smuggler: PlayerId, inspector: PlayerId) {
        self.record(format!("sync_round_participants({smuggler},{inspector})"));
    }

    fn clear_round_chat(&self) {
        self.record("clear_round_chat".to_string());
    }

    fn clear_all_game_chat(&self) {
        self.record("clear_all_game_chat".to_string());
    }
}

impl LifecycleNotifier for SpyPorts {
    fn publish_game_ended(&self, match_id: MatchId) {
        self.record(format!("publish_game_ended({match_id})"));
    }
}

impl Supervisor for SpyPorts {
    fn notify_game_ended(&self) {
        self.record("notify_game_ended".to_string());
    }
}

struct Harness {
    handle: MatchHandle,
    inboxes: BTreeMap<PlayerId, UnboundedReceiver<ServerEvent>>,
    spy: Arc<SpyPorts>,
}

impl Harness {
    fn start(smugglers: &[PlayerId], inspectors: &[PlayerId], total_rounds: u32) -> Self {
        let game = ContrabandGame::not_started(
            roster(TeamRole::Smuggler, smugglers),
            roster(TeamRole::Inspector, inspectors),
            total_rounds,
        )
        .unwrap();

        let sessions = Arc::new(LocalSessionRegistry::new());
        let mut inboxes = BTreeMap::new();
        for &id in smugglers {
            inboxes.insert(id, sessions.connect(id, TeamRole::Smuggler));
        }
        for &id in inspectors {
            inboxes.insert(id, sessions.connect(id, TeamRole::Inspector));
        }

        let spy = Arc::new(SpyPorts::default());
        let ports = MatchPorts {
            sessions,
            chat: spy.clone(),
            lifecycle: spy.clone(),
            supervisor: spy.clone(),
        };

        Self {
            handle: spawn_match(MATCH_ID, game, ports),
            inboxes,
            spy,
        }
    }

    async fn send(&self, command: MatchCommand) {
        self.handle.send(command).await.unwrap();
    }

    /// Wait until every command sent so far has been handled.
    async fn snapshot(&self) -> MatchSnapshot {
        self.handle.snapshot().await.unwrap()
    }

    fn drain(&mut self, player: PlayerId) -> Vec<ServerEvent> {
        let inbox = self.inboxes.get_mut(&player).unwrap();
        let mut events = Vec::new();
        while let Ok(event) = inbox.try_recv() {
            events.push(event);
        }
        events
    }

    fn drain_all(&mut self) {
        let players: Vec<PlayerId> = self.inboxes.keys().copied().collect();
        for player in players {
            self.drain(player);
        }
    }
}

fn roster(role: TeamRole, ids: &[PlayerId]) -> TeamRoster {
    let name = format!("{role}s");
    TeamRoster::new(
        name,
        role,
        ids.iter()
            .map(|&id| PlayerProfile::new(id, format!("player-{id}"), role)),
    )
    .unwrap()
}

fn kind(event: &ServerEvent) -> &'static str {
    match event {
        ServerEvent::GameStarted { .. } => "GAME_STARTED",
        ServerEvent::RoundStarted { .. } => "ROUND_STARTED",
        ServerEvent::SmuggleAmountDeclared { .. } => "SMUGGLE_AMOUNT_DECLARED",
        ServerEvent::InspectionDecided { .. } => "INSPECTION_DECIDED",
        ServerEvent::PassDecided { .. } => "PASS_DECIDED",
        ServerEvent::RoundFinished { .. } => "ROUND_FINISHED",
        ServerEvent::GameFinished { .. } => "GAME_FINISHED",
        ServerEvent::TransferApplied { .. } => "TRANSFER_APPLIED",
        ServerEvent::TransferFailed { .. } => "TRANSFER_FAILED",
        ServerEvent::CandidateRegistered { .. } => "CANDIDATE_REGISTERED",
        ServerEvent::CandidateFixed { .. } => "CANDIDATE_FIXED",
        ServerEvent::CandidateFixedForOpponent { .. } => "CANDIDATE_FIXED_FOR_OPPONENT",
        ServerEvent::ApprovalState { .. } => "APPROVAL_STATE",
        ServerEvent::SelectionTimer { .. } => "SELECTION_TIMER",
        ServerEvent::ErrorNotice { .. } => "ERROR_NOTICE",
    }
}

fn kinds(events: &[ServerEvent]) -> Vec<&'static str> {
    events.iter().map(kind).collect()
}

fn balance(snapshot: &MatchSnapshot, player: PlayerId) -> Money {
    snapshot
        .players
        .iter()
        .find(|entry| entry.player_id == player)
        .map(|entry| entry.balance)
        .unwrap()
}

fn round_participants(events: &[ServerEvent]) -> (PlayerId, PlayerId) {
    events
        .iter()
        .find_map(|event| match event {
            ServerEvent::RoundStarted {
                smuggler_id,
                inspector_id,
                ..
            } => Some((*smuggler_id, *inspector_id)),
            _ => None,
        })
        .unwrap()
}

fn after(duration: Duration) -> Duration {
    duration + Duration::from_millis(1)
}

// Two-player match

#[tokio::test(start_paused = true)]
async fn one_versus_one_seeds_and_starts_round() {
    let mut harness = Harness::start(&[1], &[2], 1);
    let snapshot = harness.snapshot().await;

    assert_eq!(snapshot.status, GameStatus::InProgress);
    assert_eq!(snapshot.current_round, Some(1));

    let smuggler = harness.drain(1);
    assert_eq!(
        kinds(&smuggler),
        [
            "GAME_STARTED",
            "CANDIDATE_REGISTERED",
            "CANDIDATE_FIXED",
            "ROUND_STARTED"
        ]
    );
    assert_eq!(
        smuggler[2],
        ServerEvent::CandidateFixed {
            role: TeamRole::Smuggler,
            player_id: 1
        }
    );
    assert_eq!(round_participants(&smuggler), (1, 2));

    let inspector = harness.drain(2);
    assert_eq!(
        inspector[2],
        ServerEvent::CandidateFixed {
            role: TeamRole::Inspector,
            player_id: 2
        }
    );
    assert_eq!(harness.spy.calls(), ["sync_round_participants(1,2)"]);
}

#[tokio::test(start_paused = true)]
async fn one_versus_one_runs_to_completion() {
    let mut harness = Harness::start(&[1], &[2], 1);
    harness.snapshot().await;
    harness.drain_all();

    harness
        .send(MatchCommand::DecideSmuggleAmount {
            player_id: 1,
            amount: 500,
        })
        .await;
    harness.send(MatchCommand::DecidePass { player_id: 2 }).await;

    // The match stops by itself once it is over.
    assert!(harness.handle.snapshot().await.is_err());

    let events = harness.drain(2);
    assert_eq!(
        kinds(&events),
        [
            "SMUGGLE_AMOUNT_DECLARED",
            "PASS_DECIDED",
            "ROUND_FINISHED",
            "GAME_FINISHED"
        ]
    );
    assert_eq!(
        events[2],
        ServerEvent::RoundFinished {
            smuggler_id: 1,
            smuggler_balance: Money::new(3_500),
            inspector_id: 2,
            inspector_balance: Money::new(3_000),
            outcome_type: RoundOutcomeType::Pass,
        }
    );
    assert_eq!(
        events[3],
        ServerEvent::GameFinished {
            winner_team: Winner::SmugglerTeam,
            smuggler_total: Money::new(3_500),
            inspector_total: Money::new(3_000),
        }
    );
    assert_eq!(
        harness.spy.calls(),
        [
            "sync_round_participants(1,2)",
            "clear_round_chat",
            "publish_game_ended(7)",
            "clear_all_game_chat",
            "notify_game_ended",
        ]
    );

    let Harness { handle, .. } = harness;
    let last = handle.shutdown().await.unwrap();
    assert_eq!(last.status, GameStatus::Finished);
    assert_eq!(last.completed_rounds, 1);
    assert_eq!(last.bank_paid_out, Money::new(500));
}

#[tokio::test(start_paused = true)]
async fn next_round_starts_after_settlement() {
    let mut harness = Harness::start(&[1], &[2], 3);
    harness.snapshot().await;
    harness.drain_all();

    harness
        .send(MatchCommand::DecideInspection {
            player_id: 2,
            amount: 800,
        })
        .await;
    harness
        .send(MatchCommand::DecideSmuggleAmount {
            player_id: 1,
            amount: 300,
        })
        .await;
    let snapshot = harness.snapshot().await;

    assert_eq!(snapshot.completed_rounds, 1);
    assert_eq!(snapshot.current_round, Some(2));
    assert_eq!(balance(&snapshot, 1), Money::new(3_700));
    assert_eq!(balance(&snapshot, 2), Money::new(2_600));

    let events = harness.drain(1);
    assert_eq!(
        kinds(&events),
        [
            "INSPECTION_DECIDED",
            "SMUGGLE_AMOUNT_DECLARED",
            "ROUND_FINISHED",
            "CANDIDATE_REGISTERED",
            "CANDIDATE_FIXED",
            "ROUND_STARTED"
        ]
    );
    assert!(matches!(
        events[2],
        ServerEvent::RoundFinished {
            outcome_type: RoundOutcomeType::InspectionUnder,
            ..
        }
    ));
    assert!(matches!(events[5], ServerEvent::RoundStarted { round: 2, .. }));
}

// Round timer

#[tokio::test(start_paused = true)]
async fn round_timeout_forces_empty_declaration_and_pass() {
    let mut harness = Harness::start(&[1], &[2], 2);
    harness.snapshot().await;
    harness.drain_all();

    tokio::time::sleep(after(ROUND_DURATION)).await;
    let snapshot = harness.snapshot().await;

    assert_eq!(snapshot.completed_rounds, 1);
    assert_eq!(snapshot.current_round, Some(2));
    assert_eq!(balance(&snapshot, 1), Money::STARTING);
    assert_eq!(balance(&snapshot, 2), Money::STARTING);

    let events = harness.drain(2);
    assert_eq!(
        events[0],
        ServerEvent::SmuggleAmountDeclared {
            smuggler_id: 1,
            amount: Money::ZERO
        }
    );
    assert_eq!(events[1], ServerEvent::PassDecided { inspector_id: 2 });
    assert!(matches!(
        events[2],
        ServerEvent::RoundFinished {
            outcome_type: RoundOutcomeType::Pass,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn round_timeout_keeps_decisions_already_made() {
    let mut harness = Harness::start(&[1], &[2], 1);
    harness.snapshot().await;
    harness
        .send(MatchCommand::DecideSmuggleAmount {
            player_id: 1,
            amount: 400,
        })
        .await;
    harness.snapshot().await;
    harness.drain_all();

    tokio::time::sleep(after(ROUND_DURATION)).await;
    let events = harness.drain(1);

    assert_eq!(
        kinds(&events),
        ["PASS_DECIDED", "ROUND_FINISHED", "GAME_FINISHED"]
    );
    assert!(matches!(
        events[1],
        ServerEvent::RoundFinished {
            smuggler_balance,
            ..
        } if smuggler_balance == Money::new(3_400)
    ));
}

#[tokio::test(start_paused = true)]
async fn stale_timeouts_are_ignored() {
    let mut harness = Harness::start(&[1], &[2], 3);
    harness.snapshot().await;
    harness.drain_all();

    harness.send(MatchCommand::RoundTimeout { round: 5 }).await;
    harness
        .send(MatchCommand::RoundSelectionTimeout { round: 1 })
        .await;
    let snapshot = harness.snapshot().await;

    assert_eq!(snapshot.current_round, Some(1));
    assert_eq!(snapshot.completed_rounds, 0);
    assert!(harness.drain(1).is_empty());
    assert!(harness.drain(2).is_empty());
}

// Candidate selection

#[tokio::test(start_paused = true)]
async fn selection_timer_is_broadcast() {
    let mut harness = Harness::start(&[1, 3], &[2, 4], 1);
    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.current_round, None);

    for player in [1, 2, 3, 4] {
        let events = harness.drain(player);
        assert_eq!(kinds(&events), ["GAME_STARTED", "SELECTION_TIMER"]);
        match &events[1] {
            ServerEvent::SelectionTimer {
                round,
                started_at_ms,
                duration_ms,
                end_at_ms,
                ..
            } => {
                assert_eq!(*round, 1);
                assert_eq!(*duration_ms, 33_000);
                assert_eq!(*end_at_ms, started_at_ms + 33_000);
            }
            other => panic!("expected selection timer, got {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn three_versus_three_fixes_on_second_approval() {
    let mut harness = Harness::start(&[1, 2, 3], &[4, 5, 6], 1);
    harness.snapshot().await;
    harness.drain_all();

    harness
        .send(MatchCommand::RegisterCandidate {
            role: TeamRole::Smuggler,
            player_id: 1,
            round: Some(1),
        })
        .await;
    harness
        .send(MatchCommand::ToggleApproval {
            role: TeamRole::Smuggler,
            voter_id: 2,
        })
        .await;
    harness.snapshot().await;

    let events = harness.drain(3);
    assert_eq!(
        events,
        [
            ServerEvent::CandidateRegistered {
                role: TeamRole::Smuggler,
                player_id: 1
            },
            ServerEvent::ApprovalState {
                role: TeamRole::Smuggler,
                candidate_id: Some(1),
                approver_ids: vec![],
                fixed: false
            },
            ServerEvent::ApprovalState {
                role: TeamRole::Smuggler,
                candidate_id: Some(1),
                approver_ids: vec![2],
                fixed: false
            },
        ]
    );
    assert!(harness.drain(4).is_empty());
    harness.drain_all();

    harness
        .send(MatchCommand::ToggleApproval {
            role: TeamRole::Smuggler,
            voter_id: 3,
        })
        .await;
    harness.snapshot().await;

    assert_eq!(
        harness.drain(2),
        [
            ServerEvent::CandidateFixed {
                role: TeamRole::Smuggler,
                player_id: 1
            },
            ServerEvent::ApprovalState {
                role: TeamRole::Smuggler,
                candidate_id: Some(1),
                approver_ids: vec![2, 3],
                fixed: true
            },
        ]
    );
    assert_eq!(
        harness.drain(5),
        [ServerEvent::CandidateFixedForOpponent {
            role: TeamRole::Smuggler
        }]
    );

    // Inspectors fix through an explicit request once approved.
    harness
        .send(MatchCommand::RegisterCandidate {
            role: TeamRole::Inspector,
            player_id: 6,
            round: None,
        })
        .await;
    harness
        .send(MatchCommand::FixCandidate {
            role: TeamRole::Inspector,
            requester_id: 6,
        })
        .await;
    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.current_round, None);

    for voter_id in [4, 5] {
        harness
            .send(MatchCommand::ToggleApproval {
                role: TeamRole::Inspector,
                voter_id,
            })
            .await;
    }
    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.current_round, Some(1));
    assert_eq!(round_participants(&harness.drain(4)), (1, 6));
    assert_eq!(harness.spy.calls(), ["sync_round_participants(1,6)"]);
}

#[tokio::test(start_paused = true)]
async fn approved_candidate_cannot_be_replaced() {
    let mut harness = Harness::start(&[1, 2, 3], &[4, 5, 6], 1);
    harness.snapshot().await;

    harness
        .send(MatchCommand::RegisterCandidate {
            role: TeamRole::Smuggler,
            player_id: 1,
            round: None,
        })
        .await;
    harness
        .send(MatchCommand::ToggleApproval {
            role: TeamRole::Smuggler,
            voter_id: 2,
        })
        .await;
    harness.snapshot().await;
    harness.drain_all();

    harness
        .send(MatchCommand::RegisterCandidate {
            role: TeamRole::Smuggler,
            player_id: 3,
            round: None,
        })
        .await;
    harness.snapshot().await;

    assert_eq!(
        harness.drain(3),
        [ServerEvent::invalid_state(
            "이미 찬성이 진행된 후보는 교체할 수 없습니다."
        )]
    );
    assert!(harness.drain(1).is_empty());
}

#[tokio::test(start_paused = true)]
async fn selection_requests_from_outsiders_are_rejected() {
    let mut harness = Harness::start(&[1, 3], &[2, 4], 1);
    harness.snapshot().await;
    harness.drain_all();

    harness
        .send(MatchCommand::RegisterCandidate {
            role: TeamRole::Smuggler,
            player_id: 2,
            round: None,
        })
        .await;
    harness
        .send(MatchCommand::ToggleApproval {
            role: TeamRole::Inspector,
            voter_id: 4,
        })
        .await;
    harness.snapshot().await;

    let events = harness.drain(2);
    assert_eq!(
        events,
        [ServerEvent::invalid_state("해당 팀에 속한 플레이어가 아닙니다.")]
    );
    assert_eq!(
        harness.drain(4),
        [ServerEvent::invalid_state("등록된 후보가 없습니다.")]
    );
    assert!(harness.drain(1).is_empty());
}

#[tokio::test(start_paused = true)]
async fn selection_timeout_fixes_registered_or_random_candidates() {
    let mut harness = Harness::start(&[1, 3], &[2, 4], 1);
    harness.snapshot().await;
    harness
        .send(MatchCommand::RegisterCandidate {
            role: TeamRole::Smuggler,
            player_id: 3,
            round: None,
        })
        .await;
    harness.snapshot().await;
    harness.drain_all();

    tokio::time::sleep(after(SELECTION_DURATION)).await;
    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.current_round, Some(1));

    let (smuggler, inspector) = round_participants(&harness.drain(1));
    assert_eq!(smuggler, 3);
    assert!([2, 4].contains(&inspector));
}

// Phase guards

#[tokio::test(start_paused = true)]
async fn decisions_outside_round_are_rejected() {
    let mut harness = Harness::start(&[1, 3], &[2, 4], 1);
    harness.snapshot().await;
    harness.drain_all();

    harness
        .send(MatchCommand::DecideSmuggleAmount {
            player_id: 1,
            amount: 500,
        })
        .await;
    harness.send(MatchCommand::DecidePass { player_id: 2 }).await;
    harness.snapshot().await;

    assert_eq!(
        harness.drain(1),
        [ServerEvent::error(
            ErrorCode::NotCurrentRoundSmuggler,
            "현재 라운드를 진행하는 밀수꾼이 아닙니다."
        )]
    );
    assert_eq!(
        harness.drain(2),
        [ServerEvent::error(
            ErrorCode::NotCurrentRoundInspector,
            "현재 라운드를 진행하는 검사관이 아닙니다."
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn invalid_decisions_reach_the_requester_only() {
    let mut harness = Harness::start(&[1], &[2], 1);
    harness.snapshot().await;
    harness.drain_all();

    harness
        .send(MatchCommand::DecideSmuggleAmount {
            player_id: 1,
            amount: 150,
        })
        .await;
    harness.send(MatchCommand::DecidePass { player_id: 1 }).await;
    harness
        .send(MatchCommand::RegisterCandidate {
            role: TeamRole::Inspector,
            player_id: 2,
            round: None,
        })
        .await;
    harness.snapshot().await;

    assert_eq!(
        harness.drain(1),
        [
            ServerEvent::invalid_state("밀수 금액은 100원 단위여야 합니다."),
            ServerEvent::error(
                ErrorCode::NotCurrentRoundInspector,
                "현재 라운드를 진행하는 검사관이 아닙니다."
            ),
        ]
    );
    assert_eq!(
        harness.drain(2),
        [ServerEvent::invalid_state("후보 선정 단계가 아닙니다.")]
    );
}

// Transfers

#[tokio::test(start_paused = true)]
async fn transfers_report_to_sender_and_recipient() {
    let mut harness = Harness::start(&[1, 3], &[2, 4], 1);
    harness.snapshot().await;
    harness.drain_all();

    harness
        .send(MatchCommand::TransferAmount {
            from_id: 1,
            to_id: 2,
            amount: 100,
        })
        .await;
    harness.snapshot().await;
    assert_eq!(
        harness.drain(1),
        [ServerEvent::TransferFailed {
            reason: TransferFailureReason::CrossTeam,
            message: "같은 팀 플레이어 간에만 송금할 수 있습니다.".to_string(),
        }]
    );
    assert!(harness.drain(2).is_empty());

    harness
        .send(MatchCommand::TransferAmount {
            from_id: 1,
            to_id: 3,
            amount: 500,
        })
        .await;
    let snapshot = harness.snapshot().await;
    let applied = ServerEvent::TransferApplied {
        from_id: 1,
        to_id: 3,
        from_balance: Money::new(2_500),
        to_balance: Money::new(3_500),
        amount: Money::new(500),
    };
    assert_eq!(harness.drain(1), [applied.clone()]);
    assert_eq!(harness.drain(3), [applied]);
    assert_eq!(balance(&snapshot, 3), Money::new(3_500));

    harness
        .send(MatchCommand::TransferAmount {
            from_id: 1,
            to_id: 3,
            amount: 100,
        })
        .await;
    harness
        .send(MatchCommand::TransferAmount {
            from_id: 4,
            to_id: 2,
            amount: -100,
        })
        .await;
    harness.snapshot().await;
    assert!(matches!(
        harness.drain(1).as_slice(),
        [ServerEvent::TransferFailed {
            reason: TransferFailureReason::AlreadyParticipated,
            ..
        }]
    ));
    assert!(matches!(
        harness.drain(4).as_slice(),
        [ServerEvent::TransferFailed {
            reason: TransferFailureReason::InvalidAmount,
            ..
        }]
    ));
}

// Reconnection

#[tokio::test(start_paused = true)]
async fn reconnect_replays_round_progress() {
    let mut harness = Harness::start(&[1], &[2], 1);
    harness.snapshot().await;
    harness
        .send(MatchCommand::DecideSmuggleAmount {
            player_id: 1,
            amount: 500,
        })
        .await;
    harness.snapshot().await;
    harness.drain_all();

    harness
        .send(MatchCommand::SyncReconnectedPlayer { player_id: 2 })
        .await;
    harness.snapshot().await;

    let events = harness.drain(2);
    assert_eq!(
        kinds(&events),
        ["GAME_STARTED", "ROUND_STARTED", "SMUGGLE_AMOUNT_DECLARED"]
    );
    match &events[0] {
        ServerEvent::GameStarted { players } => assert_eq!(players.len(), 2),
        other => panic!("expected game started, got {other:?}"),
    }
    assert_eq!(round_participants(&events), (1, 2));
    assert!(harness.drain(1).is_empty());
}

#[tokio::test(start_paused = true)]
async fn reconnect_replays_selection_progress() {
    let mut harness = Harness::start(&[1, 3], &[2, 4], 1);
    harness.snapshot().await;
    harness
        .send(MatchCommand::RegisterCandidate {
            role: TeamRole::Smuggler,
            player_id: 1,
            round: None,
        })
        .await;
    harness
        .send(MatchCommand::ToggleApproval {
            role: TeamRole::Smuggler,
            voter_id: 3,
        })
        .await;
    harness.snapshot().await;
    harness.drain_all();

    harness
        .send(MatchCommand::SyncReconnectedPlayer { player_id: 3 })
        .await;
    harness
        .send(MatchCommand::SyncReconnectedPlayer { player_id: 2 })
        .await;
    harness.snapshot().await;

    let own = harness.drain(3);
    assert_eq!(
        kinds(&own),
        [
            "GAME_STARTED",
            "CANDIDATE_REGISTERED",
            "CANDIDATE_FIXED",
            "APPROVAL_STATE",
            "SELECTION_TIMER"
        ]
    );
    assert_eq!(
        own[3],
        ServerEvent::ApprovalState {
            role: TeamRole::Smuggler,
            candidate_id: Some(1),
            approver_ids: vec![3],
            fixed: true
        }
    );

    let opponent = harness.drain(2);
    assert_eq!(
        kinds(&opponent),
        [
            "GAME_STARTED",
            "CANDIDATE_FIXED_FOR_OPPONENT",
            "APPROVAL_STATE",
            "SELECTION_TIMER"
        ]
    );
    assert_eq!(
        opponent[2],
        ServerEvent::ApprovalState {
            role: TeamRole::Inspector,
            candidate_id: None,
            approver_ids: vec![],
            fixed: false
        }
    );
}

// Shutdown

#[tokio::test(start_paused = true)]
async fn shutdown_returns_final_state() {
    let harness = Harness::start(&[1], &[2], 2);
    harness
        .send(MatchCommand::DecideSmuggleAmount {
            player_id: 1,
            amount: 200,
        })
        .await;

    let snapshot = harness.handle.shutdown().await.unwrap();
    assert_eq!(snapshot.status, GameStatus::InProgress);
    assert_eq!(snapshot.current_round, Some(1));
    assert_eq!(snapshot.total_rounds, 2);
}
