use std::sync::Arc;

use rust_decimal::Decimal;

use crate::clock::SharedClock;
use crate::config::LedgerConfig;
use crate::events::EventSink;
use crate::fines::FineEngine;
use crate::gateway::Gateway;
use crate::loans::{AccrualSummary, LoanEngine};
use crate::models::{AfterschoolEntry, Fine, Loan, Member, PendingKind, PendingTransaction, SavingsEntry};
use crate::reporting::Reporter;
use crate::storage::{LedgerStorage, Storage};
use crate::types::{Caller, Context, FineId, LedgerError, LoanId, MemberId, Operation, PendingId, Role};

/// The operation surface handed to request handlers and the scheduler.
///
/// Wires the ledger components together and applies the caller preconditions:
/// officials for admin operations, the member themselves for submissions.
/// Identity is trusted as given; authentication happens before this point.
pub struct Sacco<S: Storage> {
    storage: Arc<S>,
    loans: Arc<LoanEngine<S>>,
    fines: Arc<FineEngine<S>>,
    gateway: Gateway<S>,
    reporter: Reporter<S>
}

impl Sacco<LedgerStorage> {
    pub fn in_memory(config: &LedgerConfig, clock: SharedClock, events: Arc<dyn EventSink>) -> Self {
        let storage = LedgerStorage::new(clock).with_balance_floor(config.balance_floor);
        Self::new(Arc::new(storage), config, events)
    }
}

impl<S: Storage> Sacco<S> {
    pub fn new(storage: Arc<S>, config: &LedgerConfig, events: Arc<dyn EventSink>) -> Self {
        let loans = Arc::new(LoanEngine::new(storage.clone(), events.clone(), config));
        let fines = Arc::new(FineEngine::new(storage.clone(), events.clone(), config));
        let gateway = Gateway::new(storage.clone(), loans.clone(), fines.clone(), events);
        let reporter = Reporter::new(storage.clone(), config.group_goal);

        Self { storage, loans, fines, gateway, reporter }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn loans(&self) -> &LoanEngine<S> {
        &self.loans
    }

    pub fn fines(&self) -> &FineEngine<S> {
        &self.fines
    }

    pub fn gateway(&self) -> &Gateway<S> {
        &self.gateway
    }

    pub fn reporter(&self) -> &Reporter<S> {
        &self.reporter
    }

    /// Entry point for the external registration flow.
    pub fn register_member(&self, member_id: MemberId, role: Role) -> Result<Member, LedgerError> {
        self.storage.register_member(member_id, role)
    }

    pub fn submit(&self, caller: &Caller, member_id: MemberId, kind: PendingKind, amount: Decimal) -> Result<PendingTransaction, LedgerError> {
        if caller.member_id != member_id {
            return Err(LedgerError::forbidden(Context::member(member_id, Operation::Submit), caller.member_id, caller.role))
        }

        self.gateway.submit(member_id, kind, amount)
    }

    pub fn approve(&self, caller: &Caller, pending_id: PendingId) -> Result<PendingTransaction, LedgerError> {
        require_admin(caller, Context::pending(pending_id, Operation::Approve))?;
        self.gateway.approve(pending_id, caller.member_id)
    }

    pub fn reject(&self, caller: &Caller, pending_id: PendingId, reason: impl Into<String>) -> Result<PendingTransaction, LedgerError> {
        require_admin(caller, Context::pending(pending_id, Operation::Reject))?;
        self.gateway.reject(pending_id, caller.member_id, reason)
    }

    /// Records a savings deposit directly, bypassing the pending stage.
    pub fn deposit_savings(&self, caller: &Caller, member_id: MemberId, amount: Decimal) -> Result<SavingsEntry, LedgerError> {
        require_admin(caller, Context::member(member_id, Operation::RecordSavings))?;
        self.storage.record_savings(member_id, amount)
    }

    pub fn deposit_afterschool(&self, caller: &Caller, member_id: MemberId, amount: Decimal) -> Result<AfterschoolEntry, LedgerError> {
        require_admin(caller, Context::member(member_id, Operation::RecordAfterschool))?;
        self.storage.record_afterschool(member_id, amount)
    }

    pub fn request_loan(&self, caller: &Caller, member_id: MemberId, principal: Decimal, reason: impl Into<String>) -> Result<Loan, LedgerError> {
        require_admin(caller, Context::member(member_id, Operation::RequestLoan))?;
        self.loans.request_loan(member_id, principal, reason)
    }

    pub fn approve_loan(&self, caller: &Caller, loan_id: LoanId) -> Result<Loan, LedgerError> {
        require_admin(caller, Context::loan(loan_id, Operation::ApproveLoan))?;
        self.loans.approve_loan(loan_id)
    }

    pub fn reject_loan(&self, caller: &Caller, loan_id: LoanId, reason: impl Into<String>) -> Result<Loan, LedgerError> {
        require_admin(caller, Context::loan(loan_id, Operation::RejectLoan))?;
        self.loans.reject_loan(loan_id, reason)
    }

    pub fn repay(&self, caller: &Caller, loan_id: LoanId, amount: Decimal) -> Result<Loan, LedgerError> {
        require_admin(caller, Context::loan(loan_id, Operation::Repay))?;
        self.loans.repay(loan_id, amount)
    }

    pub fn issue_fine(&self, caller: &Caller, member_id: MemberId, amount: Decimal, reason: impl Into<String>) -> Result<Fine, LedgerError> {
        require_admin(caller, Context::member(member_id, Operation::IssueFine))?;
        self.fines.issue_fine(member_id, amount, reason)
    }

    pub fn pay_fine(&self, caller: &Caller, fine_id: FineId) -> Result<Fine, LedgerError> {
        require_admin(caller, Context::fine(fine_id, Operation::PayFine))?;
        self.fines.pay_fine(fine_id)
    }

    pub fn apply_interest_batch(&self) -> AccrualSummary {
        self.loans.apply_interest_batch()
    }

    pub fn apply_penalty_batch(&self) -> AccrualSummary {
        self.loans.apply_penalty_batch()
    }

    pub fn flag_inactive_members(&self) -> Result<Vec<Fine>, LedgerError> {
        self.fines.flag_inactive_members()
    }
}

fn require_admin(caller: &Caller, context: Context) -> Result<(), LedgerError> {
    if !caller.role.is_admin() {
        return Err(LedgerError::forbidden(context, caller.member_id, caller.role))
    }

    Ok(())
}
