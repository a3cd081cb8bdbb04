#[cfg(test)]
mod tests;

use std::sync::{Mutex, PoisonError};

use rust_decimal::Decimal;
use tracing::info;

use crate::types::{EntryId, FineId, LoanId, MemberId};

/// Mutations an outside notifier may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    SavingsConfirmed {
        member_id: MemberId,
        entry_id: EntryId,
        amount: Decimal
    },
    AfterschoolConfirmed {
        member_id: MemberId,
        entry_id: EntryId,
        amount: Decimal
    },
    FineIssued {
        member_id: MemberId,
        fine_id: FineId,
        amount: Decimal
    },
    LoanApproved {
        member_id: MemberId,
        loan_id: LoanId
    },
    LoanClosed {
        member_id: MemberId,
        loan_id: LoanId
    }
}

/// Receives events after the mutation they describe has been committed.
///
/// Implementations must not call back into the ledger and must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: LedgerEvent);
}

/// Default sink: writes every event to the log.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: LedgerEvent) {
        info!("Ledger event: {event:?}");
    }
}

/// Keeps every published event in memory, in publication order.
#[derive(Debug, Default)]
pub struct RecordingSink(Mutex<Vec<LedgerEvent>>);

impl RecordingSink {
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: LedgerEvent) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}
