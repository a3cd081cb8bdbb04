use std::fmt;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::{Context, FineId, LedgerError, MemberId, Operation};

const INACTIVITY_TAG: &str = "inactivity";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FineReason {
    /// Issued automatically by the inactivity scan.
    Inactivity,
    /// Issued by an official, with their free text reason.
    Manual(String)
}

impl Display for FineReason {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FineReason::Inactivity => formatter.write_str(INACTIVITY_TAG),
            FineReason::Manual(reason) => formatter.write_str(reason)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fine {
    pub fine_id: FineId,
    pub member_id: MemberId,
    pub amount: Decimal,
    pub reason: FineReason,
    pub created_at: DateTime<Utc>,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>
}

impl Fine {
    /// Marks the fine as paid. A second call fails rather than succeeding silently.
    pub fn pay(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.ensure_unpaid()?;
        self.paid = true;
        self.paid_at = Some(now);

        Ok(())
    }

    pub fn ensure_unpaid(&self) -> Result<(), LedgerError> {
        if self.paid {
            return Err(LedgerError::already_paid(Context::fine(self.fine_id, Operation::PayFine)))
        }

        Ok(())
    }

    pub fn is_open_inactivity_flag(&self) -> bool {
        !self.paid && self.reason == FineReason::Inactivity
    }
}
