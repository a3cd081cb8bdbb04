use std::fmt;
use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{LoanId, MemberId, RecordId, Role};

/// Which kind of ledger record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Member,
    SavingsEntry,
    AfterschoolEntry,
    Loan,
    Fine,
    PendingTransaction
}

/// The operation that was being attempted when an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Lookup,
    RegisterMember,
    AdjustBalance,
    RecordSavings,
    RecordAfterschool,
    MarkAfterschoolPaid,
    IssueFine,
    PayFine,
    FlagInactive,
    RequestLoan,
    ApproveLoan,
    RejectLoan,
    AccrueInterest,
    AccruePenalty,
    Repay,
    Submit,
    Approve,
    Reject
}

/// Flat classification of a [`LedgerError`] for handlers that only need the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidAmount,
    InvalidState,
    OverPayment,
    AlreadyPaid,
    Forbidden,
    Overflow
}

/// Minimal context attached to every error: the record touched and the attempted operation.
///
/// `id` is `None` when the operation spans every record of a kind (the batch jobs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub record: RecordKind,
    pub id: Option<RecordId>,
    pub operation: Operation
}

impl Context {
    pub fn new(record: RecordKind, id: RecordId, operation: Operation) -> Self {
        Self { record, id: Some(id), operation }
    }

    pub fn batch(record: RecordKind, operation: Operation) -> Self {
        Self { record, id: None, operation }
    }

    pub fn member(id: MemberId, operation: Operation) -> Self {
        Self::new(RecordKind::Member, id, operation)
    }

    pub fn loan(id: LoanId, operation: Operation) -> Self {
        Self::new(RecordKind::Loan, id, operation)
    }

    pub fn fine(id: RecordId, operation: Operation) -> Self {
        Self::new(RecordKind::Fine, id, operation)
    }

    pub fn pending(id: RecordId, operation: Operation) -> Self {
        Self::new(RecordKind::PendingTransaction, id, operation)
    }
}

impl Display for Context {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(formatter, "{:?} [{}] during [{:?}]", self.record, id, self.operation),
            None => write!(formatter, "every {:?} during [{:?}]", self.record, self.operation)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Not found: {context}")]
    NotFound {
        context: Context
    },
    #[error("Invalid amount [{amount}]: {context}")]
    InvalidAmount {
        context: Context,
        amount: Decimal
    },
    #[error("Invalid state [{state}]: {context}")]
    InvalidState {
        context: Context,
        state: &'static str
    },
    #[error("Over payment [{amount}] exceeds remaining [{remaining}]: {context}")]
    OverPayment {
        context: Context,
        amount: Decimal,
        remaining: Decimal
    },
    #[error("Already paid: {context}")]
    AlreadyPaid {
        context: Context
    },
    #[error("Caller [{caller}]:[{role:?}] is not allowed: {context}")]
    Forbidden {
        context: Context,
        caller: MemberId,
        role: Role
    },
    #[error("Numeric overflow: {context}")]
    Overflow {
        context: Context
    }
}

impl LedgerError {
    //NOTE: Every variant carries a context, the factories keep call sites to one line.

    pub fn not_found(context: Context) -> Self {
        Self::NotFound { context }
    }

    pub fn invalid_amount(context: Context, amount: Decimal) -> Self {
        Self::InvalidAmount { context, amount }
    }

    pub fn invalid_state(context: Context, state: &'static str) -> Self {
        Self::InvalidState { context, state }
    }

    pub fn over_payment(context: Context, amount: Decimal, remaining: Decimal) -> Self {
        Self::OverPayment { context, amount, remaining }
    }

    pub fn already_paid(context: Context) -> Self {
        Self::AlreadyPaid { context }
    }

    pub fn forbidden(context: Context, caller: MemberId, role: Role) -> Self {
        Self::Forbidden { context, caller, role }
    }

    pub fn overflow(context: Context) -> Self {
        Self::Overflow { context }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::OverPayment { .. } => ErrorKind::OverPayment,
            Self::AlreadyPaid { .. } => ErrorKind::AlreadyPaid,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Overflow { .. } => ErrorKind::Overflow
        }
    }

    pub fn context(&self) -> Context {
        match self {
            Self::NotFound { context }
            | Self::InvalidAmount { context, .. }
            | Self::InvalidState { context, .. }
            | Self::OverPayment { context, .. }
            | Self::AlreadyPaid { context }
            | Self::Forbidden { context, .. }
            | Self::Overflow { context } => *context
        }
    }
}
