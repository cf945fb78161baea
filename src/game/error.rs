//! Error types for match and round processing.
//!
//! Every variant renders the message shown to players, so the `Display`
//! output is part of the contract.

use serde::Serialize;
use thiserror::Error;

use crate::MoneyError;
use crate::model::{PlayerId, RosterError};

/// Top-level error returned by [`ContrabandGame`](super::ContrabandGame) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Round(#[from] RoundError),

    #[error("팀 역할이 올바르지 않습니다.")]
    InvalidTeamRoles,

    #[error("총 진행 라운드는 1 이상이어야 합니다.")]
    InvalidTotalRounds,

    #[error("이미 다른 팀에 참가한 플레이어입니다.")]
    PlayerInBothTeams(PlayerId),

    #[error("플레이어를 찾을 수 없습니다.")]
    UnknownPlayer(PlayerId),

    #[error("밀수꾼은 밀수꾼 로스터에 포함되어야 합니다.")]
    SmugglerNotInRoster(PlayerId),

    #[error("검사관은 검사관 로스터에 포함되어야 합니다.")]
    InspectorNotInRoster(PlayerId),

    #[error("이미 게임이 종료되었습니다.")]
    AlreadyFinished,

    #[error("이전 라운드가 아직 완료되지 않았습니다.")]
    RoundInProgress,

    #[error("모든 라운드를 이미 소진했습니다.")]
    RoundsExhausted,

    #[error("진행 중인 라운드가 없습니다.")]
    NoCurrentRound,

    #[error("게임이 아직 종료되지 않았습니다.")]
    NotFinished,
}

/// Error raised by a [`Round`](super::Round) transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("라운드에 지정된 밀수꾼만 밀수 금액을 선언할 수 있습니다.")]
    NotRoundSmuggler(PlayerId),

    #[error("라운드에 지정된 검사관만 검문 결정을 내릴 수 있습니다.")]
    NotRoundInspector(PlayerId),

    #[error("이미 밀수 금액을 선언했습니다.")]
    AlreadyDeclared,

    #[error("허용된 최대 밀수 금액을 초과할 수 없습니다.")]
    SmuggleAboveMaximum,

    #[error("보유 금액보다 많이 밀수할 수 없습니다.")]
    SmuggleAboveBalance,

    #[error("밀수 금액은 100원 단위여야 합니다.")]
    SmuggleNotHundreds,

    #[error("검사관의 선택은 한 번만 할 수 있습니다.")]
    AlreadyDecided,

    #[error("검문 기준 금액은 0보다 커야 합니다.")]
    ThresholdNotPositive,

    #[error("검문 기준 금액은 100원 단위여야 합니다.")]
    ThresholdNotHundreds,

    #[error("검문 기준 금액은 최대 1000원을 초과할 수 없습니다.")]
    ThresholdAboveMaximum,

    #[error("밀수 금액이 선언되어야 정산할 수 있습니다.")]
    SmuggleNotDeclared,

    #[error("정산을 위해서는 검사관 선택이 완료된 상태여야 합니다.")]
    InspectionNotDecided,

    #[error("라운드에 지정된 플레이어와 정산 대상 플레이어가 일치하지 않습니다.")]
    ParticipantMismatch,
}

/// Why a transfer between teammates was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferFailureReason {
    GameFinished,
    SelfTransfer,
    InvalidAmount,
    InvalidUnit,
    UnknownSender,
    UnknownRecipient,
    CrossTeam,
    AlreadyParticipated,
    InsufficientBalance,
}

impl TransferFailureReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::GameFinished => "게임이 종료된 후에는 송금할 수 없습니다.",
            Self::SelfTransfer => "자기 자신에게 송금할 수 없습니다.",
            Self::InvalidAmount => "송금 금액은 0보다 커야 합니다.",
            Self::InvalidUnit => "송금 금액은 100원 단위여야 합니다.",
            Self::UnknownSender => "플레이어를 찾을 수 없습니다.",
            Self::UnknownRecipient => "송금 대상 플레이어를 찾을 수 없습니다.",
            Self::CrossTeam => "같은 팀 플레이어 간에만 송금할 수 있습니다.",
            Self::AlreadyParticipated => "이미 해당 라운드에서 송금에 참여했습니다.",
            Self::InsufficientBalance => "송금 금액이 보유 금액을 초과합니다.",
        }
    }
}

/// An expected business refusal of a transfer, carrying the player-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransferFailure {
    pub reason: TransferFailureReason,
    pub message: &'static str,
}

impl From<TransferFailureReason> for TransferFailure {
    fn from(reason: TransferFailureReason) -> Self {
        Self {
            reason,
            message: reason.message(),
        }
    }
}
