use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::{checked_add, Context, LedgerError, MemberId, Role};

/// A group member as seen by the ledger.
///
/// Profile data lives elsewhere; the ledger only tracks what its own
/// operations need: the balance and when the member last saved.
#[derive(Debug, Clone)]
pub struct Member {
    pub member_id: MemberId,
    pub role: Role,
    /// Savings and after-school contributions less fines settled from the balance.
    /// Loans never touch this figure, their debt is tracked on the loan record.
    pub balance: Decimal,
    /// Time of the last confirmed savings or after-school contribution.
    pub last_activity_at: Option<DateTime<Utc>>
}

impl Member {
    pub fn new(member_id: MemberId, role: Role) -> Self {
        Self {
            member_id,
            role,
            balance: Decimal::ZERO,
            last_activity_at: None
        }
    }

    /// Applies `delta` to the balance.
    ///
    /// # Errors
    /// `InvalidAmount` when a floor is configured and a debit would take the balance below it,
    /// `Overflow` when the addition overflows. The balance is untouched on error.
    pub fn adjust_balance(&mut self, delta: Decimal, floor: Option<Decimal>, context: Context) -> Result<Decimal, LedgerError> {
        let balance = checked_add(self.balance, delta, context)?;

        if let Some(floor) = floor {
            if delta.is_sign_negative() && balance < floor {
                return Err(LedgerError::invalid_amount(context, delta))
            }
        }

        self.balance = balance;

        Ok(balance)
    }

    pub fn record_activity(&mut self, at: DateTime<Utc>) {
        self.last_activity_at = Some(match self.last_activity_at {
            Some(previous) if previous > at => previous,
            _ => at
        });
    }

    pub fn is_inactive(&self, cutoff: DateTime<Utc>) -> bool {
        match self.last_activity_at {
            Some(at) => at < cutoff,
            None => true
        }
    }
}
