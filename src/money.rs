use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by [`Money`] arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("금액은 0원 이상이어야 합니다.")]
    Negative(i64),
    #[error("결과 금액이 0원 미만이 될 수 없습니다.")]
    Underflow,
    #[error("배수는 양수여야 합니다.")]
    NonPositiveFactor(i64),
    #[error("2로 나눌 수 없는 금액입니다.")]
    OddHalf(u64),
    #[error("금액이 허용 범위를 넘었습니다.")]
    Overflow,
}

/// Non-negative integer amount of in-game currency.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Balance every player starts a match with.
    pub const STARTING: Money = Money(3_000);

    const UNIT: u64 = 100;

    pub fn from_amount(amount: i64) -> Result<Self, MoneyError> {
        u64::try_from(amount)
            .map(Money)
            .map_err(|_| MoneyError::Negative(amount))
    }

    pub const fn new(amount: u64) -> Self {
        Money(amount)
    }

    pub fn amount(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_hundreds_unit(self) -> bool {
        self.0 % Self::UNIT == 0
    }

    pub fn plus(self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(MoneyError::Overflow)
    }

    pub fn minus(self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or(MoneyError::Underflow)
    }

    pub fn multiply(self, factor: i64) -> Result<Money, MoneyError> {
        if factor <= 0 {
            return Err(MoneyError::NonPositiveFactor(factor));
        }
        self.0
            .checked_mul(factor as u64)
            .map(Money)
            .ok_or(MoneyError::Overflow)
    }

    pub fn half(self) -> Result<Money, MoneyError> {
        if self.0 % 2 != 0 {
            return Err(MoneyError::OddHalf(self.0));
        }
        Ok(Money(self.0 / 2))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operators saturate at `u64::MAX`; use [`Money::plus`] to detect overflow.
impl std::ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |total, amount| total + amount)
    }
}
