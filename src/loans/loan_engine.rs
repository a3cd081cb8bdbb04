use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::{AccrualPeriod, LedgerConfig};
use crate::events::{EventSink, LedgerEvent};
use crate::models::{Loan, LoanStatus, OverdueStatus};
use crate::storage::Storage;
use crate::types::{checked_days, ensure_positive, Context, ErrorKind, LedgerError, LoanId, MemberId, Operation, RecordKind};

/// Outcome of one interest or penalty batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccrualSummary {
    pub loans_affected: usize,
    pub total_applied: Decimal
}

/// Owns every loan state transition and the periodic accrual jobs.
///
/// Batch jobs may be triggered redundantly (a retried scheduler tick, a double
/// click on the admin trigger). Each loan remembers what it has already been
/// charged, so a repeated run inside the same period changes nothing.
pub struct LoanEngine<S: Storage> {
    storage: Arc<S>,
    events: Arc<dyn EventSink>,
    interest_rate: Decimal,
    accrual_period: AccrualPeriod,
    penalty_per_week: Decimal,
    grace_period_days: i64
}

impl<S: Storage> LoanEngine<S> {
    pub fn new(storage: Arc<S>, events: Arc<dyn EventSink>, config: &LedgerConfig) -> Self {
        Self {
            storage,
            events,
            interest_rate: config.interest_rate,
            accrual_period: config.accrual_period,
            penalty_per_week: config.penalty_per_week,
            grace_period_days: config.grace_period_days
        }
    }

    /// Records a loan request in the `Pending` state.
    pub fn request_loan(&self, member_id: MemberId, principal: Decimal, reason: impl Into<String>) -> Result<Loan, LedgerError> {
        let loan = self.storage.insert_loan(member_id, principal, reason.into())?;
        debug!("Loan [{}] of [{}] requested by member [{}]", loan.loan_id, principal, member_id);

        Ok(loan)
    }

    /// Approves a pending loan and starts its grace period.
    pub fn approve_loan(&self, loan_id: LoanId) -> Result<Loan, LedgerError> {
        let now = self.storage.now();
        let grace_period = checked_days(self.grace_period_days, Context::loan(loan_id, Operation::ApproveLoan))?;
        let (loan, _) = self.storage.update_loan(loan_id, Operation::ApproveLoan, |loan| loan.approve(now, grace_period))?;

        debug!("Loan [{}] approved, due [{:?}]", loan_id, loan.due_date);
        self.events.publish(LedgerEvent::LoanApproved { member_id: loan.member_id, loan_id });

        Ok(loan)
    }

    pub fn reject_loan(&self, loan_id: LoanId, reason: impl Into<String>) -> Result<Loan, LedgerError> {
        let reason = reason.into();
        let (loan, _) = self.storage.update_loan(loan_id, Operation::RejectLoan, |loan| loan.reject(reason))?;
        debug!("Loan [{}] rejected", loan_id);

        Ok(loan)
    }

    /// Applies a repayment. The loan closes when nothing remains.
    ///
    /// # Errors
    /// `InvalidAmount`, `InvalidState` (loan not approved) or `OverPayment`
    /// (amount above what remains). `paid_amount` is unchanged on any error.
    pub fn repay(&self, loan_id: LoanId, amount: Decimal) -> Result<Loan, LedgerError> {
        let now = self.storage.now();
        let (loan, _) = self.storage.update_loan(loan_id, Operation::Repay, |loan| loan.repay(amount, now))?;

        debug!("Loan [{}] repaid [{}], remaining [{}]", loan_id, amount, loan.remaining());

        if loan.status == LoanStatus::Closed {
            self.events.publish(LedgerEvent::LoanClosed { member_id: loan.member_id, loan_id });
        }

        Ok(loan)
    }

    pub fn get_loan(&self, loan_id: LoanId) -> Result<Loan, LedgerError> {
        self.storage.get_loan(loan_id)
    }

    pub fn loans_for(&self, member_id: MemberId) -> Vec<Loan> {
        self.storage.loans().into_iter()
            .filter(|loan| loan.member_id == member_id)
            .collect()
    }

    pub fn overdue_status(&self, loan_id: LoanId) -> Result<OverdueStatus, LedgerError> {
        Ok(self.storage.get_loan(loan_id)?.overdue_status(self.storage.now()))
    }

    /// Every approved loan past its due date, with how late it is.
    pub fn overdue_loans(&self) -> Vec<(Loan, OverdueStatus)> {
        let now = self.storage.now();

        self.storage.loans().into_iter()
            .map(|loan| {
                let status = loan.overdue_status(now);
                (loan, status)
            })
            .filter(|(_, status)| status.is_overdue)
            .collect()
    }

    /// Runs the interest job at the configured rate.
    pub fn apply_interest_batch(&self) -> AccrualSummary {
        self.accrue(Operation::AccrueInterest, |loan, now| loan.accrue_interest(self.interest_rate, self.accrual_period, now))
    }

    /// Adds `rate * principal` to every approved loan not yet charged this period.
    pub fn apply_interest_batch_at(&self, rate: Decimal) -> Result<AccrualSummary, LedgerError> {
        ensure_positive(rate, Context::batch(RecordKind::Loan, Operation::AccrueInterest))?;

        Ok(self.accrue(Operation::AccrueInterest, |loan, now| loan.accrue_interest(rate, self.accrual_period, now)))
    }

    /// Runs the penalty job at the configured weekly penalty.
    pub fn apply_penalty_batch(&self) -> AccrualSummary {
        self.accrue(Operation::AccruePenalty, |loan, now| loan.accrue_penalty(self.penalty_per_week, now))
    }

    /// Tops every overdue loan's penalty up to `penalty_per_week` per elapsed overdue week.
    pub fn apply_penalty_batch_at(&self, penalty_per_week: Decimal) -> Result<AccrualSummary, LedgerError> {
        ensure_positive(penalty_per_week, Context::batch(RecordKind::Loan, Operation::AccruePenalty))?;

        Ok(self.accrue(Operation::AccruePenalty, |loan, now| loan.accrue_penalty(penalty_per_week, now)))
    }

    fn accrue<F>(&self, operation: Operation, charge: F) -> AccrualSummary
    where
        F: Fn(&mut Loan, DateTime<Utc>) -> Result<Decimal, LedgerError>
    {
        let now = self.storage.now();
        let mut summary = AccrualSummary::default();

        for loan in self.storage.loans().into_iter().filter(Loan::is_approved) {
            match self.storage.update_loan(loan.loan_id, operation, |loan| charge(loan, now)) {
                Ok((_, applied)) if applied > Decimal::ZERO => {
                    summary.loans_affected += 1;
                    summary.total_applied = summary.total_applied.saturating_add(applied);
                }
                Ok(_) => {}
                Err(error) if error.kind() == ErrorKind::InvalidState => {
                    //NOTE: The loan closed between the snapshot and the update, nothing to charge.
                    debug!("{error}");
                }
                Err(error) => {
                    warn!("{error}");
                }
            }
        }

        info!("[{:?}] batch charged [{}] loans a total of [{}]", operation, summary.loans_affected, summary.total_applied);

        summary
    }
}
