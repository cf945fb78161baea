use serde::Serialize;

use crate::Money;
use crate::model::PlayerId;

use super::RoundError;

/// Largest amount a smuggler may declare in one round.
pub const MAX_SMUGGLE_AMOUNT: Money = Money::new(1_000);

/// Largest threshold an inspector may claim in one round.
pub const MAX_INSPECTION_THRESHOLD: Money = Money::new(1_000);

/// Progress of a round, derived from which participants have acted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    New,
    SmuggleDeclared,
    /// The inspector decided before the smuggler declared.
    InspectionDeclared,
    InspectionDecided,
}

/// What the inspector chose to do this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InspectionDecision {
    #[default]
    Pending,
    Pass,
    Inspect { threshold: Money },
}

impl InspectionDecision {
    pub fn is_provided(self) -> bool {
        self != InspectionDecision::Pending
    }

    /// Threshold claimed by the inspector, present only for an inspection.
    pub fn threshold(self) -> Option<Money> {
        match self {
            InspectionDecision::Inspect { threshold } => Some(threshold),
            _ => None,
        }
    }
}

/// One round between a fixed smuggler and inspector.
///
/// Transitions never mutate in place: each returns the next `Round`, leaving
/// the caller's copy untouched when validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    number: u32,
    smuggler_id: PlayerId,
    inspector_id: PlayerId,
    smuggle_amount: Option<Money>,
    inspection: InspectionDecision,
}

impl Round {
    pub fn new(number: u32, smuggler_id: PlayerId, inspector_id: PlayerId) -> Self {
        Self {
            number,
            smuggler_id,
            inspector_id,
            smuggle_amount: None,
            inspection: InspectionDecision::Pending,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn smuggler_id(&self) -> PlayerId {
        self.smuggler_id
    }

    pub fn inspector_id(&self) -> PlayerId {
        self.inspector_id
    }

    pub fn smuggle_amount(&self) -> Option<Money> {
        self.smuggle_amount
    }

    pub fn inspection(&self) -> InspectionDecision {
        self.inspection
    }

    pub fn status(&self) -> RoundStatus {
        match (self.smuggle_amount.is_some(), self.inspection.is_provided()) {
            (true, true) => RoundStatus::InspectionDecided,
            (true, false) => RoundStatus::SmuggleDeclared,
            (false, true) => RoundStatus::InspectionDeclared,
            (false, false) => RoundStatus::New,
        }
    }

    pub fn is_smuggle_declared(&self) -> bool {
        self.smuggle_amount.is_some()
    }

    pub fn is_inspection_provided(&self) -> bool {
        self.inspection.is_provided()
    }

    pub fn is_inspection_decided(&self) -> bool {
        self.status() == RoundStatus::InspectionDecided
    }

    /// Declare the hidden amount. `balance` is the smuggler's current balance.
    pub fn declare_smuggle_amount(
        &self,
        requester: PlayerId,
        amount: Money,
        balance: Money,
    ) -> Result<Round, RoundError> {
        if requester != self.smuggler_id {
            return Err(RoundError::NotRoundSmuggler(requester));
        }
        if self.is_smuggle_declared() {
            return Err(RoundError::AlreadyDeclared);
        }
        if amount > MAX_SMUGGLE_AMOUNT {
            return Err(RoundError::SmuggleAboveMaximum);
        }
        if amount > balance {
            return Err(RoundError::SmuggleAboveBalance);
        }
        if !amount.is_hundreds_unit() {
            return Err(RoundError::SmuggleNotHundreds);
        }

        Ok(Round {
            smuggle_amount: Some(amount),
            ..self.clone()
        })
    }

    pub fn decide_pass(&self, requester: PlayerId) -> Result<Round, RoundError> {
        self.validate_inspector(requester)?;

        Ok(Round {
            inspection: InspectionDecision::Pass,
            ..self.clone()
        })
    }

    pub fn decide_inspection(
        &self,
        requester: PlayerId,
        threshold: Money,
    ) -> Result<Round, RoundError> {
        self.validate_inspector(requester)?;
        if threshold.is_zero() {
            return Err(RoundError::ThresholdNotPositive);
        }
        if !threshold.is_hundreds_unit() {
            return Err(RoundError::ThresholdNotHundreds);
        }
        if threshold > MAX_INSPECTION_THRESHOLD {
            return Err(RoundError::ThresholdAboveMaximum);
        }

        Ok(Round {
            inspection: InspectionDecision::Inspect { threshold },
            ..self.clone()
        })
    }

    /// Ensure both participants have acted.
    pub fn validate_ready_to_settle(&self) -> Result<(), RoundError> {
        if !self.is_smuggle_declared() {
            return Err(RoundError::SmuggleNotDeclared);
        }
        if !self.is_inspection_provided() {
            return Err(RoundError::InspectionNotDecided);
        }
        Ok(())
    }

    fn validate_inspector(&self, requester: PlayerId) -> Result<(), RoundError> {
        if requester != self.inspector_id {
            return Err(RoundError::NotRoundInspector(requester));
        }
        if self.is_inspection_provided() {
            return Err(RoundError::AlreadyDecided);
        }
        Ok(())
    }
}
