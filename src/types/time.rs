use chrono::{DateTime, TimeDelta, Utc};

use crate::types::{Context, LedgerError};

/// `days` as a duration, `Overflow` when it does not fit.
pub fn checked_days(days: i64, context: Context) -> Result<TimeDelta, LedgerError> {
    TimeDelta::try_days(days).ok_or_else(|| LedgerError::overflow(context))
}

pub fn checked_later(at: DateTime<Utc>, delta: TimeDelta, context: Context) -> Result<DateTime<Utc>, LedgerError> {
    at.checked_add_signed(delta).ok_or_else(|| LedgerError::overflow(context))
}

pub fn checked_earlier(at: DateTime<Utc>, delta: TimeDelta, context: Context) -> Result<DateTime<Utc>, LedgerError> {
    at.checked_sub_signed(delta).ok_or_else(|| LedgerError::overflow(context))
}
