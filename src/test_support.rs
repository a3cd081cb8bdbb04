//! Fixtures shared by the engine unit tests.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::clock::ReplayClock;
use crate::config::LedgerConfig;
use crate::events::RecordingSink;
use crate::fines::FineEngine;
use crate::gateway::Gateway;
use crate::loans::LoanEngine;
use crate::storage::{LedgerStorage, Storage};
use crate::types::{MemberId, Role};

pub const MEMBER: MemberId = 1;
pub const OTHER_MEMBER: MemberId = 2;
pub const TREASURER: MemberId = 9;

pub fn start() -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single()
        .ok_or_else(|| anyhow!("invalid fixture timestamp"))
}

pub fn amount(value: &str) -> Result<Decimal> {
    Ok(Decimal::from_str(value)?)
}

pub struct Fixture {
    pub clock: Arc<ReplayClock>,
    pub storage: Arc<LedgerStorage>,
    pub events: Arc<RecordingSink>,
    pub config: LedgerConfig
}

impl Fixture {
    pub fn new() -> Result<Self> {
        let clock = Arc::new(ReplayClock::new(start()?));
        let storage = Arc::new(LedgerStorage::new(clock.clone()));

        storage.register_member(MEMBER, Role::Member)?;
        storage.register_member(OTHER_MEMBER, Role::Member)?;
        storage.register_member(TREASURER, Role::Treasurer)?;

        Ok(Self {
            clock,
            storage,
            events: Arc::new(RecordingSink::default()),
            config: LedgerConfig::default()
        })
    }

    pub fn loans(&self) -> LoanEngine<LedgerStorage> {
        LoanEngine::new(self.storage.clone(), self.events.clone(), &self.config)
    }

    pub fn fines(&self) -> FineEngine<LedgerStorage> {
        FineEngine::new(self.storage.clone(), self.events.clone(), &self.config)
    }

    pub fn gateway(&self) -> Gateway<LedgerStorage> {
        Gateway::new(self.storage.clone(), Arc::new(self.loans()), Arc::new(self.fines()), self.events.clone())
    }
}
