use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::{Context, FineId, LedgerError, LoanId, MemberId, Operation, PendingId, RecordId};

/// What a member claims to have paid or asks for, awaiting an official's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingKind {
    Savings,
    Afterschool,
    LoanRequest {
        reason: String
    },
    LoanRepayment {
        loan_id: LoanId
    },
    FinePayment {
        fine_id: FineId
    }
}

impl PendingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingKind::Savings => "savings",
            PendingKind::Afterschool => "afterschool",
            PendingKind::LoanRequest { .. } => "loan_request",
            PendingKind::LoanRepayment { .. } => "loan_repayment",
            PendingKind::FinePayment { .. } => "fine_payment"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStatus {
    Pending,
    Approved,
    Rejected
}

impl PendingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PendingStatus::Pending => "pending",
            PendingStatus::Approved => "approved",
            PendingStatus::Rejected => "rejected"
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub pending_id: PendingId,
    pub member_id: MemberId,
    pub kind: PendingKind,
    pub amount: Decimal,
    pub status: PendingStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<MemberId>,
    pub rejection_reason: Option<String>,
    /// Entry, loan or fine written or settled by the approval.
    pub record_id: Option<RecordId>
}

impl PendingTransaction {
    pub fn new(pending_id: PendingId, member_id: MemberId, kind: PendingKind, amount: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            pending_id,
            member_id,
            kind,
            amount,
            status: PendingStatus::Pending,
            created_at: now,
            resolved_at: None,
            resolved_by: None,
            rejection_reason: None,
            record_id: None
        }
    }

    pub fn ensure_pending(&self, operation: Operation) -> Result<(), LedgerError> {
        if self.status != PendingStatus::Pending {
            return Err(LedgerError::invalid_state(Context::pending(self.pending_id, operation), self.status.as_str()))
        }

        Ok(())
    }

    /// Moves the transaction to its terminal state. Only valid from `Pending`.
    pub fn resolve(&mut self, status: PendingStatus, resolved_by: MemberId, now: DateTime<Utc>, reason: Option<String>) -> Result<(), LedgerError> {
        let operation = match status {
            PendingStatus::Rejected => Operation::Reject,
            _ => Operation::Approve
        };

        self.ensure_pending(operation)?;

        self.status = status;
        self.resolved_at = Some(now);
        self.resolved_by = Some(resolved_by);
        self.rejection_reason = reason;

        Ok(())
    }
}
