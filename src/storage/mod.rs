mod ledger_storage;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{AfterschoolEntry, Fine, Loan, Member, SavingsEntry};
use crate::types::{EntryId, FineId, LedgerError, LoanId, MemberId, Operation, Role};

pub use ledger_storage::LedgerStorage;

/// The ledger's single source of truth for members, entries, loans and fines.
///
/// Every mutation is atomic with respect to the record it touches. No method
/// spans more than one member, and batch jobs go through here one record at a time.
pub trait Storage: Send + Sync + 'static {
    /// Current time as seen by the ledger. Every timestamp written goes through this.
    fn now(&self) -> DateTime<Utc>;

    fn register_member(&self, member_id: MemberId, role: Role) -> Result<Member, LedgerError>;
    fn get_member(&self, member_id: MemberId) -> Result<Member, LedgerError>;
    fn members(&self) -> Vec<Member>;
    fn adjust_balance(&self, member_id: MemberId, delta: Decimal) -> Result<Member, LedgerError>;

    fn record_savings(&self, member_id: MemberId, amount: Decimal) -> Result<SavingsEntry, LedgerError>;
    fn savings(&self) -> Vec<SavingsEntry>;
    fn record_afterschool(&self, member_id: MemberId, amount: Decimal) -> Result<AfterschoolEntry, LedgerError>;
    fn mark_afterschool_paid(&self, entry_id: EntryId) -> Result<AfterschoolEntry, LedgerError>;
    fn afterschool(&self) -> Vec<AfterschoolEntry>;

    fn record_fine(&self, member_id: MemberId, amount: Decimal, reason: String) -> Result<Fine, LedgerError>;
    /// Issues an inactivity fine unless the member already has one open.
    /// Returns `None` when the member was skipped.
    fn record_inactivity_fine(&self, member_id: MemberId, amount: Decimal) -> Result<Option<Fine>, LedgerError>;
    fn get_fine(&self, fine_id: FineId) -> Result<Fine, LedgerError>;
    /// Settles the fine from the member's balance and marks it paid, all or nothing.
    fn mark_fine_paid(&self, fine_id: FineId) -> Result<Fine, LedgerError>;
    fn fines(&self) -> Vec<Fine>;

    fn insert_loan(&self, member_id: MemberId, principal: Decimal, reason: String) -> Result<Loan, LedgerError>;
    fn get_loan(&self, loan_id: LoanId) -> Result<Loan, LedgerError>;
    fn loans(&self) -> Vec<Loan>;
    /// Runs `update` against a copy of the loan and commits the copy only if it succeeds.
    fn update_loan<T, F>(&self, loan_id: LoanId, operation: Operation, update: F) -> Result<(Loan, T), LedgerError>
    where
        F: FnOnce(&mut Loan) -> Result<T, LedgerError>;
}
