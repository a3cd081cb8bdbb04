use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::{Context, EntryId, LedgerError, MemberId, Operation, RecordKind};

/// A confirmed savings deposit. Immutable once written.
#[derive(Debug, Clone)]
pub struct SavingsEntry {
    pub entry_id: EntryId,
    pub member_id: MemberId,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>
}

/// A confirmed after-school fund contribution.
///
/// `paid` flips once the fund pays the contribution out; it never flips back.
#[derive(Debug, Clone)]
pub struct AfterschoolEntry {
    pub entry_id: EntryId,
    pub member_id: MemberId,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub paid: bool
}

impl AfterschoolEntry {
    pub fn mark_paid(&mut self) -> Result<(), LedgerError> {
        if self.paid {
            let context = Context::new(RecordKind::AfterschoolEntry, self.entry_id, Operation::MarkAfterschoolPaid);
            return Err(LedgerError::already_paid(context))
        }

        self.paid = true;

        Ok(())
    }
}
