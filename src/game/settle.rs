//! Round settlement: turns a fully decided [`Round`] into balance changes.

use serde::Serialize;

use crate::Money;
use crate::model::{Player, PlayerId};

use super::{InspectionDecision, Round, RoundError};

/// Outcome category of a settled round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundOutcomeType {
    /// Inspector let the goods through.
    Pass,
    /// Inspector claimed more than was smuggled and compensates the smuggler.
    InspectionUnder,
    /// Inspector claimed at most the smuggled amount and confiscates the claim.
    InspectionHit,
}

impl RoundOutcomeType {
    fn select(decision: InspectionDecision, smuggled: Money) -> Self {
        match decision.threshold() {
            None => RoundOutcomeType::Pass,
            Some(threshold) if threshold > smuggled => RoundOutcomeType::InspectionUnder,
            Some(_) => RoundOutcomeType::InspectionHit,
        }
    }
}

/// Where money moves from or to during settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Account {
    Bank,
    Player(PlayerId),
}

/// A single money movement applied by a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub from: Account,
    pub to: Account,
    pub amount: Money,
}

/// Result of settling a round: both participants after payout, plus the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSettlement {
    pub smuggler: Player,
    pub inspector: Player,
    pub outcome: RoundOutcomeType,
    pub movements: Vec<Movement>,
}

impl RoundSettlement {
    /// Total amount the bank paid into player balances.
    pub fn bank_paid_out(&self) -> Money {
        self.movements
            .iter()
            .filter(|movement| movement.from == Account::Bank)
            .map(|movement| movement.amount)
            .sum()
    }
}

/// A finished round together with how it was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRecord {
    pub round: Round,
    pub settlement: RoundSettlement,
}

/// Settle `round` against copies of its two participants.
///
/// Payouts:
/// - pass: the bank pays the smuggled amount to the smuggler
/// - under: the bank pays the smuggled amount, and the inspector pays half
///   the claimed threshold (at most their balance) to the smuggler
/// - hit: the bank pays the claimed threshold to the inspector
pub fn settle(
    round: &Round,
    smuggler: &Player,
    inspector: &Player,
) -> Result<RoundSettlement, RoundError> {
    round.validate_ready_to_settle()?;
    if smuggler.id() != round.smuggler_id() || inspector.id() != round.inspector_id() {
        return Err(RoundError::ParticipantMismatch);
    }

    let smuggled = round.smuggle_amount().unwrap_or_default();
    let outcome = RoundOutcomeType::select(round.inspection(), smuggled);
    let threshold = round.inspection().threshold().unwrap_or_default();

    let smuggler_account = Account::Player(smuggler.id());
    let inspector_account = Account::Player(inspector.id());
    let mut smuggler = smuggler.clone();
    let mut inspector = inspector.clone();

    let movements = match outcome {
        RoundOutcomeType::Pass => {
            smuggler.credit(smuggled);
            vec![Movement {
                from: Account::Bank,
                to: smuggler_account,
                amount: smuggled,
            }]
        }
        RoundOutcomeType::InspectionUnder => {
            let claimed_half = threshold
                .half()
                .map_err(|_| RoundError::ThresholdNotHundreds)?;
            let compensation = inspector.debit_up_to(claimed_half);
            smuggler.credit(smuggled + compensation);
            vec![
                Movement {
                    from: Account::Bank,
                    to: smuggler_account,
                    amount: smuggled,
                },
                Movement {
                    from: inspector_account,
                    to: smuggler_account,
                    amount: compensation,
                },
            ]
        }
        RoundOutcomeType::InspectionHit => {
            inspector.credit(threshold);
            vec![Movement {
                from: Account::Bank,
                to: inspector_account,
                amount: threshold,
            }]
        }
    };

    Ok(RoundSettlement {
        smuggler,
        inspector,
        outcome,
        movements,
    })
}
