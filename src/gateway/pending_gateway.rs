use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::events::{EventSink, LedgerEvent};
use crate::fines::FineEngine;
use crate::loans::LoanEngine;
use crate::models::{PendingKind, PendingStatus, PendingTransaction};
use crate::storage::Storage;
use crate::types::{ensure_positive, Context, LedgerError, MemberId, Operation, PendingId, RecordId};

/// Intake for member submitted value changes.
///
/// A submission only records the member's claim. The ledger is touched when an
/// official approves it, and the approval is recorded only if the downstream
/// mutation succeeded. Each transaction resolves exactly once: the record stays
/// locked from the status check until the resolution is written, so a second
/// concurrent `approve` or `reject` waits and then finds it already resolved.
pub struct Gateway<S: Storage> {
    storage: Arc<S>,
    loans: Arc<LoanEngine<S>>,
    fines: Arc<FineEngine<S>>,
    events: Arc<dyn EventSink>,
    transactions: DashMap<PendingId, PendingTransaction>,
    sequence: AtomicU64
}

impl<S: Storage> Gateway<S> {
    pub fn new(storage: Arc<S>, loans: Arc<LoanEngine<S>>, fines: Arc<FineEngine<S>>, events: Arc<dyn EventSink>) -> Self {
        Self {
            storage,
            loans,
            fines,
            events,
            transactions: DashMap::new(),
            sequence: AtomicU64::new(0)
        }
    }

    /// Stages a member's claim.
    ///
    /// # Errors
    /// - `InvalidAmount` when `amount` is not positive, or a fine payment does not match the fine.
    /// - `NotFound` for an unknown member, or a target loan/fine that is not the member's.
    /// - `InvalidState` when a repayment targets a loan that is not approved.
    /// - `AlreadyPaid` when a fine payment targets a settled fine.
    pub fn submit(&self, member_id: MemberId, kind: PendingKind, amount: Decimal) -> Result<PendingTransaction, LedgerError> {
        let context = Context::member(member_id, Operation::Submit);

        ensure_positive(amount, context)?;
        self.storage.get_member(member_id)
            .map_err(|_| LedgerError::not_found(context))?;
        self.validate_target(member_id, &kind, amount)?;

        let pending_id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let transaction = PendingTransaction::new(pending_id, member_id, kind, amount, self.storage.now());
        self.transactions.insert(pending_id, transaction.clone());

        debug!("Pending [{}]:[{}] of [{}] submitted by member [{}]", pending_id, transaction.kind.as_str(), amount, member_id);

        Ok(transaction)
    }

    /// Approves a pending transaction and applies it to the ledger.
    ///
    /// # Errors
    /// `InvalidState` when the transaction is already resolved. Any error from the
    /// downstream engine is returned as is and the transaction stays `Pending`.
    pub fn approve(&self, pending_id: PendingId, approver_id: MemberId) -> Result<PendingTransaction, LedgerError> {
        let mut transaction = self.transactions.get_mut(&pending_id)
            .ok_or_else(|| LedgerError::not_found(Context::pending(pending_id, Operation::Approve)))?;

        transaction.ensure_pending(Operation::Approve)?;

        let record_id = self.apply(&transaction).inspect_err(|error| {
            warn!("Pending [{}] approval rolled back: {error}", pending_id);
        })?;

        transaction.resolve(PendingStatus::Approved, approver_id, self.storage.now(), None)?;
        transaction.record_id = Some(record_id);

        debug!("Pending [{}] approved by [{}]", pending_id, approver_id);

        Ok(transaction.clone())
    }

    /// Discards a pending transaction. Nothing in the ledger changes.
    pub fn reject(&self, pending_id: PendingId, approver_id: MemberId, reason: impl Into<String>) -> Result<PendingTransaction, LedgerError> {
        let mut transaction = self.transactions.get_mut(&pending_id)
            .ok_or_else(|| LedgerError::not_found(Context::pending(pending_id, Operation::Reject)))?;

        transaction.resolve(PendingStatus::Rejected, approver_id, self.storage.now(), Some(reason.into()))?;
        debug!("Pending [{}] rejected by [{}]", pending_id, approver_id);

        Ok(transaction.clone())
    }

    pub fn get(&self, pending_id: PendingId) -> Result<PendingTransaction, LedgerError> {
        self.transactions.get(&pending_id)
            .map(|transaction| transaction.value().clone())
            .ok_or_else(|| LedgerError::not_found(Context::pending(pending_id, Operation::Lookup)))
    }

    /// Transactions in `status`, oldest first. `None` lists every transaction.
    pub fn list(&self, status: Option<PendingStatus>) -> Vec<PendingTransaction> {
        let mut transactions: Vec<_> = self.transactions.iter()
            .filter(|item| status.is_none_or(|status| item.status == status))
            .map(|item| item.value().clone())
            .collect();

        transactions.sort_by_key(|transaction| transaction.pending_id);
        transactions
    }

    pub fn submitted_by(&self, member_id: MemberId) -> Vec<PendingTransaction> {
        self.list(None).into_iter()
            .filter(|transaction| transaction.member_id == member_id)
            .collect()
    }

    fn validate_target(&self, member_id: MemberId, kind: &PendingKind, amount: Decimal) -> Result<(), LedgerError> {
        match kind {
            PendingKind::LoanRepayment { loan_id } => {
                let context = Context::loan(*loan_id, Operation::Submit);
                let loan = self.storage.get_loan(*loan_id)
                    .ok()
                    .filter(|loan| loan.member_id == member_id)
                    .ok_or_else(|| LedgerError::not_found(context))?;

                if !loan.is_approved() {
                    return Err(LedgerError::invalid_state(context, loan.status.as_str()))
                }
            }
            PendingKind::FinePayment { fine_id } => {
                let context = Context::fine(*fine_id, Operation::Submit);
                let fine = self.storage.get_fine(*fine_id)
                    .ok()
                    .filter(|fine| fine.member_id == member_id)
                    .ok_or_else(|| LedgerError::not_found(context))?;

                fine.ensure_unpaid()?;

                if fine.amount != amount {
                    return Err(LedgerError::invalid_amount(context, amount))
                }
            }
            PendingKind::Savings | PendingKind::Afterschool | PendingKind::LoanRequest { .. } => {}
        }

        Ok(())
    }

    /// Hands the transaction to the engine that owns its effect.
    fn apply(&self, transaction: &PendingTransaction) -> Result<RecordId, LedgerError> {
        let member_id = transaction.member_id;
        let amount = transaction.amount;

        match &transaction.kind {
            PendingKind::Savings => {
                let entry = self.storage.record_savings(member_id, amount)?;
                self.events.publish(LedgerEvent::SavingsConfirmed { member_id, entry_id: entry.entry_id, amount });
                Ok(entry.entry_id)
            }
            PendingKind::Afterschool => {
                let entry = self.storage.record_afterschool(member_id, amount)?;
                self.events.publish(LedgerEvent::AfterschoolConfirmed { member_id, entry_id: entry.entry_id, amount });
                Ok(entry.entry_id)
            }
            PendingKind::LoanRequest { reason } => {
                //NOTE: The official's approval of the request is the vetting, the loan goes straight to approved.
                let loan = self.loans.request_loan(member_id, amount, reason.clone())?;

                if let Err(error) = self.loans.approve_loan(loan.loan_id) {
                    if let Err(cleanup) = self.loans.reject_loan(loan.loan_id, "approval of pending request failed") {
                        warn!("Loan [{}] left pending after failed approval: {cleanup}", loan.loan_id);
                    }

                    return Err(error)
                }

                Ok(loan.loan_id)
            }
            PendingKind::LoanRepayment { loan_id } => {
                self.loans.repay(*loan_id, amount)?;
                Ok(*loan_id)
            }
            PendingKind::FinePayment { fine_id } => {
                self.fines.pay_fine(*fine_id)?;
                Ok(*fine_id)
            }
        }
    }
}
