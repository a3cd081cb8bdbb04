use super::{AccrualPeriod, ConfigError, LedgerConfig, MAX_PERIOD_DAYS};

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

fn at(year: i32, month: u32, day: u32, hour: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).single()
        .ok_or_else(|| anyhow!("invalid fixture timestamp"))
}

#[test]
fn test_default_config_is_valid() {
    assert_eq!(LedgerConfig::default().validate(), Ok(()));
}

#[test]
fn test_non_positive_constants_are_rejected() {
    let config = LedgerConfig { penalty_per_week: Decimal::ZERO, ..LedgerConfig::default() };

    assert!(matches!(config.validate(), Err(ConfigError::NotPositive { name: "penalty_per_week", .. })));

    let config = LedgerConfig { grace_period_days: -1, ..LedgerConfig::default() };

    assert!(matches!(config.validate(), Err(ConfigError::NotPositive { name: "grace_period_days", .. })));
}

#[test]
fn test_daily_period_key_separates_calendar_days() -> Result<()> {
    let morning = at(2026, 3, 14, 1)?;
    let evening = at(2026, 3, 14, 23)?;
    let next_day = at(2026, 3, 15, 0)?;

    assert_eq!(AccrualPeriod::Day.period_key(morning), AccrualPeriod::Day.period_key(evening));
    assert_ne!(AccrualPeriod::Day.period_key(evening), AccrualPeriod::Day.period_key(next_day));

    Ok(())
}

#[test]
fn test_monthly_period_key_is_first_of_month() -> Result<()> {
    let key = AccrualPeriod::Month.period_key(at(2026, 3, 31, 12)?);

    assert_eq!(Some(key), NaiveDate::from_ymd_opt(2026, 3, 1));
    assert_ne!(key, AccrualPeriod::Month.period_key(at(2026, 4, 1, 0)?));

    Ok(())
}

#[test]
fn test_periods_beyond_the_calendar_are_rejected() {
    let config = LedgerConfig { grace_period_days: 100_000_000, ..LedgerConfig::default() };

    assert!(matches!(config.validate(), Err(ConfigError::TooLarge { name: "grace_period_days", .. })));

    let config = LedgerConfig { inactivity_threshold_days: MAX_PERIOD_DAYS + 1, ..LedgerConfig::default() };

    assert!(matches!(config.validate(), Err(ConfigError::TooLarge { name: "inactivity_threshold_days", .. })));

    let config = LedgerConfig { grace_period_days: MAX_PERIOD_DAYS, inactivity_threshold_days: MAX_PERIOD_DAYS, ..LedgerConfig::default() };

    assert_eq!(config.validate(), Ok(()));
}
