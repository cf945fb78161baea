//! Candidate selection phase.
//!
//! Before each round both teams agree on the player who represents them.
//! A two-player match seeds both candidates directly. Larger teams register
//! a candidate and approve it; once every other teammate (at least one)
//! approves, the candidate is fixed. A selection timer resolves whatever is
//! still open when it expires.

use std::collections::BTreeSet;

use rand::seq::IndexedRandom;
use thiserror::Error;
use tracing::{debug, info};

use super::context::{MatchContext, RoundSelection};
use super::timer::{PhaseTimer, SELECTION_DURATION, epoch_millis};
use super::{MatchCommand, ServerEvent};
use crate::game::TeamState;
use crate::model::{PlayerId, TeamRole};

/// Rejection of a selection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("현재 진행중인 라운드가 아닙니다.")]
    NotCurrentRound(u32),
    #[error("이미 이번 라운드에 참여할 밀수꾼이 확정되었습니다.")]
    SmugglerAlreadyFixed,
    #[error("이미 이번 라운드에 참여할 검사관이 확정되었습니다.")]
    InspectorAlreadyFixed,
    #[error("이미 찬성이 진행된 후보는 교체할 수 없습니다.")]
    CandidateLocked,
    #[error("해당 팀에 속한 플레이어가 아닙니다.")]
    NotTeamMember(PlayerId),
    #[error("등록된 후보가 없습니다.")]
    NoCandidate,
    #[error("후보 선정 단계가 아닙니다.")]
    NotSelecting,
}

impl SelectionError {
    fn already_fixed(role: TeamRole) -> Self {
        match role {
            TeamRole::Smuggler => SelectionError::SmugglerAlreadyFixed,
            TeamRole::Inspector => SelectionError::InspectorAlreadyFixed,
        }
    }
}

/// Candidate, approvals and fixed flag of one role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSelection {
    candidate: Option<PlayerId>,
    fixed: bool,
    approvals: BTreeSet<PlayerId>,
}

impl RoleSelection {
    pub fn candidate(&self) -> Option<PlayerId> {
        self.candidate
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn approvals(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.approvals.iter().copied()
    }

    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }

    /// A candidate may change freely until someone else approved it.
    fn can_replace_with(&self, candidate: PlayerId) -> bool {
        self.approvals.is_empty() || self.candidate == Some(candidate)
    }

    fn set_candidate(&mut self, candidate: PlayerId) {
        if self.candidate != Some(candidate) {
            self.candidate = Some(candidate);
            self.approvals.clear();
        }
    }

    /// Flip `voter`'s approval. Returns whether the voter now approves.
    fn toggle(&mut self, voter: PlayerId) -> bool {
        match self.candidate {
            Some(candidate) if candidate != voter => {
                if self.approvals.remove(&voter) {
                    false
                } else {
                    self.approvals.insert(voter);
                    true
                }
            }
            _ => false,
        }
    }

    fn has_enough_approvals(&self, required: usize) -> bool {
        self.candidate.is_some() && self.approvals.len() >= required
    }
}

/// Selection progress of one round.
#[derive(Debug, Default)]
pub struct SelectionState {
    round: u32,
    smuggler: RoleSelection,
    inspector: RoleSelection,
    timer: PhaseTimer,
}

impl SelectionState {
    pub fn new(round: u32) -> Self {
        Self {
            round,
            ..Self::default()
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn role(&self, role: TeamRole) -> &RoleSelection {
        match role {
            TeamRole::Smuggler => &self.smuggler,
            TeamRole::Inspector => &self.inspector,
        }
    }

    fn role_mut(&mut self, role: TeamRole) -> &mut RoleSelection {
        match role {
            TeamRole::Smuggler => &mut self.smuggler,
            TeamRole::Inspector => &mut self.inspector,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.smuggler.fixed && self.inspector.fixed
    }

    pub fn register(
        &mut self,
        round: u32,
        role: TeamRole,
        candidate: PlayerId,
    ) -> Result<(), SelectionError> {
        if round != self.round {
            return Err(SelectionError::NotCurrentRound(round));
        }
        let selection = self.role_mut(role);
        if selection.fixed {
            return Err(SelectionError::already_fixed(role));
        }
        if !selection.can_replace_with(candidate) {
            return Err(SelectionError::CandidateLocked);
        }
        selection.set_candidate(candidate);
        Ok(())
    }

    pub fn toggle_approval(&mut self, role: TeamRole, voter: PlayerId) -> Result<bool, SelectionError> {
        let selection = self.role_mut(role);
        if selection.fixed {
            return Err(SelectionError::already_fixed(role));
        }
        if selection.candidate.is_none() {
            return Err(SelectionError::NoCandidate);
        }
        Ok(selection.toggle(voter))
    }

    pub fn has_enough_approvals(&self, role: TeamRole, required: usize) -> bool {
        self.role(role).has_enough_approvals(required)
    }

    /// Fix the registered candidate of `role`.
    pub fn fix(&mut self, role: TeamRole) -> Result<PlayerId, SelectionError> {
        let selection = self.role_mut(role);
        let candidate = selection.candidate.ok_or(SelectionError::NoCandidate)?;
        selection.fixed = true;
        Ok(candidate)
    }

    /// Register and fix `candidate` regardless of approvals.
    pub fn force_fix(&mut self, role: TeamRole, candidate: PlayerId) {
        let selection = self.role_mut(role);
        selection.set_candidate(candidate);
        selection.fixed = true;
    }

    pub fn seed(&mut self, smuggler: PlayerId, inspector: PlayerId) {
        self.force_fix(TeamRole::Smuggler, smuggler);
        self.force_fix(TeamRole::Inspector, inspector);
        self.smuggler.approvals.clear();
        self.inspector.approvals.clear();
    }

    /// Advance to the next round, dropping candidates, approvals and the timer.
    pub fn prepare_next_round(&mut self) {
        self.round += 1;
        self.smuggler = RoleSelection::default();
        self.inspector = RoleSelection::default();
        self.timer.cancel();
    }

    /// Both fixed participants, once the round is ready.
    pub fn selection(&self) -> Option<RoundSelection> {
        if !self.is_ready() {
            return None;
        }
        Some(RoundSelection {
            round: self.round,
            smuggler_id: self.smuggler.candidate?,
            inspector_id: self.inspector.candidate?,
        })
    }
}

/// Team composition as seen by the selection phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionParticipants {
    smugglers: Vec<PlayerId>,
    inspectors: Vec<PlayerId>,
}

impl SelectionParticipants {
    pub fn new(smugglers: Vec<PlayerId>, inspectors: Vec<PlayerId>) -> Self {
        Self {
            smugglers,
            inspectors,
        }
    }

    pub fn from_teams(teams: &TeamState) -> Self {
        Self::new(
            teams.roster(TeamRole::Smuggler).ids().collect(),
            teams.roster(TeamRole::Inspector).ids().collect(),
        )
    }

    pub fn members(&self, role: TeamRole) -> &[PlayerId] {
        match role {
            TeamRole::Smuggler => &self.smugglers,
            TeamRole::Inspector => &self.inspectors,
        }
    }

    pub fn contains(&self, role: TeamRole, player: PlayerId) -> bool {
        self.members(role).contains(&player)
    }

    pub fn is_two_player_game(&self) -> bool {
        self.smugglers.len() == 1 && self.inspectors.len() == 1
    }

    pub fn requires_consensus(&self, role: TeamRole) -> bool {
        !self.is_two_player_game() && self.members(role).len() > 1
    }

    /// Every teammate except the candidate, and never fewer than one.
    pub fn required_approvals(&self, role: TeamRole) -> usize {
        self.members(role).len().saturating_sub(1).max(1)
    }

    pub fn first(&self, role: TeamRole) -> Option<PlayerId> {
        self.members(role).first().copied()
    }

    pub fn pick_random(&self, role: TeamRole) -> Option<PlayerId> {
        self.members(role).choose(&mut rand::rng()).copied()
    }
}

/// Drives the selection phase of one round.
#[derive(Debug)]
pub struct SelectionCoordinator {
    state: SelectionState,
    participants: SelectionParticipants,
}

/// Public API
impl SelectionCoordinator {
    /// Enter the selection phase of `round`.
    pub(crate) fn start(ctx: &mut MatchContext, round: u32) -> Self {
        let mut coordinator = Self {
            state: SelectionState::new(round),
            participants: SelectionParticipants::from_teams(ctx.game.teams()),
        };
        coordinator.begin_round(ctx);
        coordinator
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub(crate) fn register_candidate(
        &mut self,
        ctx: &mut MatchContext,
        role: TeamRole,
        player: PlayerId,
        round: Option<u32>,
    ) {
        let round = round.unwrap_or(self.state.round);
        if !self.align_round(ctx, round) {
            debug!(match_id = ctx.match_id, round, current = self.state.round, "stale register ignored");
            return;
        }

        let result = self.ensure_member(role, player).and_then(|()| {
            self.state.register(round, role, player)
        });
        match result {
            Ok(()) => {
                info!(match_id = ctx.match_id, round, %role, player, "candidate registered");
                ctx.broadcast_team(role, ServerEvent::CandidateRegistered { role, player_id: player });
                self.broadcast_approval_state(ctx, role);
            }
            Err(e) => self.reject(ctx, player, e),
        }
    }

    pub(crate) fn toggle_approval(&mut self, ctx: &mut MatchContext, role: TeamRole, voter: PlayerId) {
        let result = self
            .ensure_member(role, voter)
            .and_then(|()| self.state.toggle_approval(role, voter));
        let approved = match result {
            Ok(approved) => approved,
            Err(e) => return self.reject(ctx, voter, e),
        };
        info!(match_id = ctx.match_id, %role, voter, approved, "approval toggled");

        if self.participants.requires_consensus(role)
            && self
                .state
                .has_enough_approvals(role, self.participants.required_approvals(role))
        {
            self.fix_and_announce(ctx, role);
            self.start_round_if_ready(ctx);
        } else {
            self.broadcast_approval_state(ctx, role);
        }
    }

    pub(crate) fn fix_candidate(&mut self, ctx: &mut MatchContext, role: TeamRole, requester: PlayerId) {
        if let Err(e) = self.ensure_member(role, requester) {
            return self.reject(ctx, requester, e);
        }
        let selection = self.state.role(role);
        if selection.is_fixed() {
            return self.reject(ctx, requester, SelectionError::already_fixed(role));
        }
        if selection.candidate().is_none() {
            return self.reject(ctx, requester, SelectionError::NoCandidate);
        }

        let required = self.participants.required_approvals(role);
        if self.participants.requires_consensus(role) && !self.state.has_enough_approvals(role, required) {
            debug!(match_id = ctx.match_id, %role, required, "fix requested before consensus");
            self.broadcast_approval_state(ctx, role);
            return;
        }

        self.fix_and_announce(ctx, role);
        self.start_round_if_ready(ctx);
    }

    /// Resolve every open role when the selection timer fires:
    /// - Fix a registered candidate as is
    /// - Otherwise pick a random teammate
    pub(crate) fn timeout(&mut self, ctx: &mut MatchContext, round: u32) {
        if round != self.state.round || self.state.is_ready() {
            debug!(match_id = ctx.match_id, round, current = self.state.round, "stale selection timeout ignored");
            return;
        }

        for role in [TeamRole::Smuggler, TeamRole::Inspector] {
            if self.state.role(role).is_fixed() {
                continue;
            }
            let picked = self
                .state
                .role(role)
                .candidate()
                .or_else(|| self.participants.pick_random(role));
            let Some(player) = picked else {
                continue;
            };
            info!(match_id = ctx.match_id, round, %role, player, "candidate fixed by timeout");
            self.state.force_fix(role, player);
            ctx.broadcast_team(role, ServerEvent::CandidateRegistered { role, player_id: player });
            self.announce_fixed(ctx, role, player);
        }

        self.start_round_if_ready(ctx);
    }

    /// Fast-forward to `round` when it is ahead of the current one.
    pub(crate) fn prepare_next(&mut self, ctx: &mut MatchContext, round: u32) {
        if round <= self.state.round {
            debug!(match_id = ctx.match_id, round, current = self.state.round, "selection already at round");
            return;
        }
        while self.state.round < round {
            self.state.prepare_next_round();
        }
        self.begin_round(ctx);
    }

    /// Replay the selection progress visible to `player`'s team.
    pub(crate) fn sync(&self, ctx: &MatchContext, player: PlayerId) {
        let Some(role) = ctx.game.teams().role_of(player) else {
            return;
        };
        let own = self.state.role(role);
        let mut events = Vec::new();

        if let Some(candidate) = own.candidate() {
            events.push(ServerEvent::CandidateRegistered { role, player_id: candidate });
            if own.is_fixed() {
                events.push(ServerEvent::CandidateFixed { role, player_id: candidate });
            }
        }
        let opponent = role.opponent();
        if self.state.role(opponent).is_fixed() {
            events.push(ServerEvent::CandidateFixedForOpponent { role: opponent });
        }
        events.push(self.approval_state(role));
        if !self.state.is_ready() {
            if let Some(timer) = self.state.timer.snapshot() {
                events.push(ServerEvent::SelectionTimer {
                    round: self.state.round,
                    started_at_ms: timer.started_at_ms,
                    duration_ms: timer.duration_ms(),
                    server_now_ms: epoch_millis(),
                    end_at_ms: timer.end_at_ms(),
                });
            }
        }

        for event in events {
            ctx.send_to(player, event);
        }
    }
}

/// Private API
impl SelectionCoordinator {
    /// Seed a two-player match, otherwise start the selection timer.
    fn begin_round(&mut self, ctx: &mut MatchContext) {
        if self.participants.is_two_player_game() {
            self.seed(ctx);
        } else if !self.state.is_ready() {
            self.start_timer(ctx);
        }
    }

    fn seed(&mut self, ctx: &mut MatchContext) {
        let (Some(smuggler), Some(inspector)) = (
            self.participants.first(TeamRole::Smuggler),
            self.participants.first(TeamRole::Inspector),
        ) else {
            return;
        };
        self.state.seed(smuggler, inspector);
        for (role, player) in [(TeamRole::Smuggler, smuggler), (TeamRole::Inspector, inspector)] {
            ctx.broadcast_team(role, ServerEvent::CandidateRegistered { role, player_id: player });
            ctx.broadcast_team(role, ServerEvent::CandidateFixed { role, player_id: player });
        }
        self.start_round_if_ready(ctx);
    }

    fn start_timer(&mut self, ctx: &mut MatchContext) {
        let round = self.state.round;
        let timer = self.state.timer.start(
            &ctx.mailbox,
            SELECTION_DURATION,
            MatchCommand::RoundSelectionTimeout { round },
        );
        ctx.broadcast_all(ServerEvent::SelectionTimer {
            round,
            started_at_ms: timer.started_at_ms,
            duration_ms: timer.duration_ms(),
            server_now_ms: timer.started_at_ms,
            end_at_ms: timer.end_at_ms(),
        });
    }

    /// Align to `round`: `false` when it is behind and must be ignored.
    fn align_round(&mut self, ctx: &mut MatchContext, round: u32) -> bool {
        if round > self.state.round {
            self.prepare_next(ctx, round);
        }
        round == self.state.round
    }

    fn ensure_member(&self, role: TeamRole, player: PlayerId) -> Result<(), SelectionError> {
        if !self.participants.contains(role, player) {
            return Err(SelectionError::NotTeamMember(player));
        }
        Ok(())
    }

    fn fix_and_announce(&mut self, ctx: &mut MatchContext, role: TeamRole) {
        match self.state.fix(role) {
            Ok(player) => {
                info!(match_id = ctx.match_id, round = self.state.round, %role, player, "candidate fixed");
                self.announce_fixed(ctx, role, player);
            }
            Err(e) => debug!(match_id = ctx.match_id, %role, reason = %e, "fix skipped"),
        }
    }

    fn announce_fixed(&self, ctx: &mut MatchContext, role: TeamRole, player: PlayerId) {
        ctx.broadcast_team(role, ServerEvent::CandidateFixed { role, player_id: player });
        ctx.broadcast_team(role.opponent(), ServerEvent::CandidateFixedForOpponent { role });
        self.broadcast_approval_state(ctx, role);
    }

    fn start_round_if_ready(&mut self, ctx: &mut MatchContext) {
        let Some(selection) = self.state.selection() else {
            return;
        };
        self.state.timer.cancel();
        ctx.ports
            .chat
            .sync_round_participants(selection.smuggler_id, selection.inspector_id);
        ctx.pending_round = Some(selection);
        ctx.tell_self(MatchCommand::StartNewRound);
    }

    fn approval_state(&self, role: TeamRole) -> ServerEvent {
        let selection = self.state.role(role);
        ServerEvent::ApprovalState {
            role,
            candidate_id: selection.candidate(),
            approver_ids: selection.approvals().collect(),
            fixed: selection.is_fixed(),
        }
    }

    fn broadcast_approval_state(&self, ctx: &MatchContext, role: TeamRole) {
        ctx.broadcast_team(role, self.approval_state(role));
    }

    fn reject(&self, ctx: &MatchContext, player: PlayerId, error: SelectionError) {
        info!(match_id = ctx.match_id, player, reason = %error, "selection request rejected");
        ctx.send_to(player, ServerEvent::invalid_state(error.to_string()));
    }
}
