//! Outbound events delivered to player sessions.

use serde::Serialize;

use crate::Money;
use crate::game::{PlayerEntry, RoundOutcomeType, TransferFailure, TransferFailureReason, Winner};
use crate::model::{PlayerId, TeamRole};

/// Category attached to an [`ServerEvent::ErrorNotice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    GameInvalidState,
    NotCurrentRoundSmuggler,
    NotCurrentRoundInspector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    GameStarted { players: Vec<PlayerEntry> },

    #[serde(rename_all = "camelCase")]
    RoundStarted {
        round: u32,
        smuggler_id: PlayerId,
        inspector_id: PlayerId,
        started_at_ms: u64,
        duration_ms: u64,
        server_now_ms: u64,
        end_at_ms: u64,
    },

    #[serde(rename_all = "camelCase")]
    SmuggleAmountDeclared { smuggler_id: PlayerId, amount: Money },

    #[serde(rename_all = "camelCase")]
    InspectionDecided {
        inspector_id: PlayerId,
        amount: Option<Money>,
    },

    #[serde(rename_all = "camelCase")]
    PassDecided { inspector_id: PlayerId },

    #[serde(rename_all = "camelCase")]
    RoundFinished {
        smuggler_id: PlayerId,
        smuggler_balance: Money,
        inspector_id: PlayerId,
        inspector_balance: Money,
        outcome_type: RoundOutcomeType,
    },

    #[serde(rename_all = "camelCase")]
    GameFinished {
        winner_team: Winner,
        smuggler_total: Money,
        inspector_total: Money,
    },

    #[serde(rename_all = "camelCase")]
    TransferApplied {
        from_id: PlayerId,
        to_id: PlayerId,
        from_balance: Money,
        to_balance: Money,
        amount: Money,
    },

    TransferFailed {
        reason: TransferFailureReason,
        message: String,
    },

    #[serde(rename_all = "camelCase")]
    CandidateRegistered { role: TeamRole, player_id: PlayerId },

    #[serde(rename_all = "camelCase")]
    CandidateFixed { role: TeamRole, player_id: PlayerId },

    /// The opposing team only learns that the role was fixed, not by whom.
    CandidateFixedForOpponent { role: TeamRole },

    #[serde(rename_all = "camelCase")]
    ApprovalState {
        role: TeamRole,
        candidate_id: Option<PlayerId>,
        approver_ids: Vec<PlayerId>,
        fixed: bool,
    },

    #[serde(rename_all = "camelCase")]
    SelectionTimer {
        round: u32,
        started_at_ms: u64,
        duration_ms: u64,
        server_now_ms: u64,
        end_at_ms: u64,
    },

    ErrorNotice { code: ErrorCode, message: String },
}

impl ServerEvent {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerEvent::ErrorNotice {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::error(ErrorCode::GameInvalidState, message)
    }

    /// JSON rendering used in logs.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("<unserializable event: {e}>"))
    }
}

impl From<TransferFailure> for ServerEvent {
    fn from(failure: TransferFailure) -> Self {
        ServerEvent::TransferFailed {
            reason: failure.reason,
            message: failure.message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_with_screaming_type_and_camel_fields() {
        let event = ServerEvent::SmuggleAmountDeclared {
            smuggler_id: 1,
            amount: Money::new(500),
        };
        assert_eq!(
            event.to_json(),
            r#"{"type":"SMUGGLE_AMOUNT_DECLARED","smugglerId":1,"amount":500}"#
        );
    }

    #[test]
    fn pass_inspection_has_null_amount() {
        let event = ServerEvent::InspectionDecided {
            inspector_id: 2,
            amount: None,
        };
        assert_eq!(
            event.to_json(),
            r#"{"type":"INSPECTION_DECIDED","inspectorId":2,"amount":null}"#
        );
    }

    #[test]
    fn error_notice_carries_code() {
        let event = ServerEvent::error(ErrorCode::NotCurrentRoundSmuggler, "x");
        assert_eq!(
            event.to_json(),
            r#"{"type":"ERROR_NOTICE","code":"NOT_CURRENT_ROUND_SMUGGLER","message":"x"}"#
        );
    }

    #[test]
    fn transfer_failure_converts() {
        let event: ServerEvent = TransferFailure::from(TransferFailureReason::CrossTeam).into();
        assert_eq!(
            event,
            ServerEvent::TransferFailed {
                reason: TransferFailureReason::CrossTeam,
                message: "같은 팀 플레이어 간에만 송금할 수 있습니다.".to_string(),
            }
        );
    }

    #[test]
    fn game_finished_serializes_winner() {
        let event = ServerEvent::GameFinished {
            winner_team: Winner::SmugglerTeam,
            smuggler_total: Money::new(3_500),
            inspector_total: Money::STARTING,
        };
        let json = event.to_json();
        assert!(json.contains(r#""winnerTeam":"SMUGGLER_TEAM""#));
        assert!(json.contains(r#""smugglerTotal":3500"#));
    }
}
