use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::config::AccrualPeriod;
use crate::types::{checked_add, checked_later, ensure_positive, round_money, Context, LedgerError, LoanId, MemberId, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Closed
}

impl LoanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Closed => "closed"
        }
    }
}

/// Derived, read-only view of how late a loan is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverdueStatus {
    pub is_overdue: bool,
    pub days_overdue: i64
}

/// A single loan and everything accrued or repaid against it.
///
/// The record enforces its own state machine:
/// `Pending -> Approved -> Closed` and `Pending -> Rejected`. Interest, penalties
/// and repayments only ever apply to an `Approved` loan, and the loan closes the
/// moment nothing remains to be repaid.
#[derive(Debug, Clone)]
pub struct Loan {
    pub loan_id: LoanId,
    pub member_id: MemberId,
    /// Borrowed amount, fixed at request time.
    pub principal: Decimal,
    pub interest_accrued: Decimal,
    pub penalty_accrued: Decimal,
    pub paid_amount: Decimal,
    pub status: LoanStatus,
    pub reason: String,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Set on approval and on every interest run that applied interest.
    pub last_interest_run_at: Option<DateTime<Utc>>,
    /// Period key of the last run that actually applied interest.
    last_interest_period: Option<NaiveDate>,
    pub last_penalty_run_at: Option<DateTime<Utc>>,
    /// Number of overdue weeks already charged.
    weeks_penalized: i64
}

impl Loan {
    /// Creates a loan request in the `Pending` state.
    ///
    /// # Errors
    /// `InvalidAmount` when `principal` is not positive.
    pub fn request(loan_id: LoanId, member_id: MemberId, principal: Decimal, reason: String, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        let principal = ensure_positive(principal, Context::loan(loan_id, Operation::RequestLoan))?;

        Ok(Self {
            loan_id,
            member_id,
            principal,
            interest_accrued: Decimal::ZERO,
            penalty_accrued: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            status: LoanStatus::Pending,
            reason,
            rejection_reason: None,
            created_at: now,
            approved_at: None,
            due_date: None,
            closed_at: None,
            last_interest_run_at: None,
            last_interest_period: None,
            last_penalty_run_at: None,
            weeks_penalized: 0
        })
    }

    pub fn approve(&mut self, now: DateTime<Utc>, grace_period: TimeDelta) -> Result<(), LedgerError> {
        self.ensure_status(LoanStatus::Pending, Operation::ApproveLoan)?;
        let due_date = checked_later(now, grace_period, Context::loan(self.loan_id, Operation::ApproveLoan))?;

        self.status = LoanStatus::Approved;
        self.approved_at = Some(now);
        self.due_date = Some(due_date);
        self.last_interest_run_at = Some(now);
        self.last_penalty_run_at = Some(now);

        Ok(())
    }

    pub fn reject(&mut self, reason: String) -> Result<(), LedgerError> {
        self.ensure_status(LoanStatus::Pending, Operation::RejectLoan)?;

        self.status = LoanStatus::Rejected;
        self.rejection_reason = Some(reason);

        Ok(())
    }

    /// Principal plus everything accrued, minus what has been repaid.
    pub fn remaining(&self) -> Decimal {
        self.principal
            .saturating_add(self.interest_accrued)
            .saturating_add(self.penalty_accrued)
            .saturating_sub(self.paid_amount)
    }

    /// Adds `rate * principal` to the accrued interest, once per accrual period.
    ///
    /// Returns the interest applied, zero when this period was already charged.
    pub fn accrue_interest(&mut self, rate: Decimal, period: AccrualPeriod, now: DateTime<Utc>) -> Result<Decimal, LedgerError> {
        self.ensure_status(LoanStatus::Approved, Operation::AccrueInterest)?;

        let current_period = period.period_key(now);

        if self.last_interest_period == Some(current_period) {
            return Ok(Decimal::ZERO)
        }

        let context = Context::loan(self.loan_id, Operation::AccrueInterest);
        let interest = self.principal.checked_mul(rate)
            .map(round_money)
            .ok_or_else(|| LedgerError::overflow(context))?;

        self.interest_accrued = checked_add(self.interest_accrued, interest, context)?;
        self.last_interest_period = Some(current_period);
        self.last_interest_run_at = Some(now);

        Ok(interest)
    }

    /// Tops the penalty up to `penalty_per_week` for every full week past the due date.
    ///
    /// Weeks already charged are never charged again, so repeated runs inside the
    /// same overdue week apply nothing. Returns the penalty applied.
    pub fn accrue_penalty(&mut self, penalty_per_week: Decimal, now: DateTime<Utc>) -> Result<Decimal, LedgerError> {
        self.ensure_status(LoanStatus::Approved, Operation::AccruePenalty)?;

        let weeks_overdue = self.weeks_overdue(now);
        let weeks_due = weeks_overdue - self.weeks_penalized;

        if weeks_due <= 0 {
            return Ok(Decimal::ZERO)
        }

        let context = Context::loan(self.loan_id, Operation::AccruePenalty);
        let penalty = penalty_per_week.checked_mul(Decimal::from(weeks_due))
            .ok_or_else(|| LedgerError::overflow(context))?;

        self.penalty_accrued = checked_add(self.penalty_accrued, penalty, context)?;
        self.weeks_penalized = weeks_overdue;
        self.last_penalty_run_at = Some(now);

        Ok(penalty)
    }

    /// Applies a repayment against the undifferentiated remaining amount.
    ///
    /// # Errors
    /// - `InvalidAmount` when `amount` is not positive.
    /// - `InvalidState` when the loan is not `Approved`.
    /// - `OverPayment` when `amount` exceeds what remains; nothing is capped.
    pub fn repay(&mut self, amount: Decimal, now: DateTime<Utc>) -> Result<(), LedgerError> {
        let context = Context::loan(self.loan_id, Operation::Repay);

        ensure_positive(amount, context)?;
        self.ensure_status(LoanStatus::Approved, Operation::Repay)?;

        let remaining = self.remaining();

        if amount > remaining {
            return Err(LedgerError::over_payment(context, amount, remaining))
        }

        self.paid_amount = checked_add(self.paid_amount, amount, context)?;

        if self.remaining() <= Decimal::ZERO {
            self.status = LoanStatus::Closed;
            self.closed_at = Some(now);
        }

        Ok(())
    }

    pub fn overdue_status(&self, now: DateTime<Utc>) -> OverdueStatus {
        match self.due_date {
            Some(due_date) if self.status == LoanStatus::Approved && now > due_date => OverdueStatus {
                is_overdue: true,
                days_overdue: (now - due_date).num_days()
            },
            _ => OverdueStatus { is_overdue: false, days_overdue: 0 }
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == LoanStatus::Approved
    }

    pub fn weeks_penalized(&self) -> i64 {
        self.weeks_penalized
    }

    fn weeks_overdue(&self, now: DateTime<Utc>) -> i64 {
        match self.due_date {
            Some(due_date) if now > due_date => (now - due_date).num_weeks(),
            _ => 0
        }
    }

    fn ensure_status(&self, expected: LoanStatus, operation: Operation) -> Result<(), LedgerError> {
        if self.status != expected {
            return Err(LedgerError::invalid_state(Context::loan(self.loan_id, operation), self.status.as_str()))
        }

        Ok(())
    }
}
