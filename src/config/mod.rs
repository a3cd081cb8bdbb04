#[cfg(test)]
mod tests;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use clap::ValueEnum;
use rust_decimal::Decimal;
use thiserror::Error;

/// Granularity at which interest may be applied at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AccrualPeriod {
    #[default]
    Day,
    Month
}

impl AccrualPeriod {
    /// First calendar day of the period containing `at`. Two instants share a
    /// period exactly when their keys are equal.
    pub fn period_key(self, at: DateTime<Utc>) -> NaiveDate {
        let date = at.date_naive();

        match self {
            AccrualPeriod::Day => date,
            AccrualPeriod::Month => date.with_day(1).unwrap_or(date)
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Configuration error: [{name}] must be positive, got [{value}]")]
    NotPositive {
        name: &'static str,
        value: String
    },
    #[error("Configuration error: [{name}] must be at most [{max}], got [{value}]")]
    TooLarge {
        name: &'static str,
        value: i64,
        max: i64
    }
}

/// Longest grace period or inactivity threshold accepted, one hundred years.
pub const MAX_PERIOD_DAYS: i64 = 36_500;

/// Named constants owned by the loan and fine engines.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Fraction of the principal added per accrual period.
    pub interest_rate: Decimal,
    pub accrual_period: AccrualPeriod,
    /// Flat penalty added for every full week a loan is overdue.
    pub penalty_per_week: Decimal,
    /// Days between loan approval and its due date.
    pub grace_period_days: i64,
    pub inactivity_threshold_days: i64,
    pub inactivity_fine: Decimal,
    /// Lowest balance a member may reach. `None` leaves balances unbounded.
    pub balance_floor: Option<Decimal>,
    /// Group savings target used by the progress report.
    pub group_goal: Decimal
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            interest_rate: Decimal::new(10, 2),
            accrual_period: AccrualPeriod::Day,
            penalty_per_week: Decimal::from(50),
            grace_period_days: 30,
            inactivity_threshold_days: 90,
            inactivity_fine: Decimal::from(100),
            balance_floor: None,
            group_goal: Decimal::from(100_000)
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("interest_rate", self.interest_rate)?;
        check_positive("penalty_per_week", self.penalty_per_week)?;
        check_positive("grace_period_days", Decimal::from(self.grace_period_days))?;
        check_positive("inactivity_threshold_days", Decimal::from(self.inactivity_threshold_days))?;
        check_at_most("grace_period_days", self.grace_period_days, MAX_PERIOD_DAYS)?;
        check_at_most("inactivity_threshold_days", self.inactivity_threshold_days, MAX_PERIOD_DAYS)?;
        check_positive("inactivity_fine", self.inactivity_fine)?;
        check_positive("group_goal", self.group_goal)?;

        Ok(())
    }

}

fn check_positive(name: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value <= Decimal::ZERO {
        return Err(ConfigError::NotPositive { name, value: value.to_string() })
    }

    Ok(())
}

fn check_at_most(name: &'static str, value: i64, max: i64) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::TooLarge { name, value, max })
    }

    Ok(())
}
