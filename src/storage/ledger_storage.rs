use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use crate::clock::SharedClock;
use crate::models::{AfterschoolEntry, Fine, FineReason, Loan, Member, SavingsEntry};
use crate::storage::Storage;
use crate::types::{ensure_positive, Context, EntryId, FineId, LedgerError, LoanId, MemberId, Operation, RecordId, RecordKind, Role};

/// In-memory ledger backed by one `DashMap` per record type.
///
/// Each record sits behind its shard lock, so a mutation of one record is atomic
/// without a store wide lock. When two maps are locked together the order is
/// always loans/fines before members, which keeps concurrent writers deadlock free.
pub struct LedgerStorage {
    clock: SharedClock,
    balance_floor: Option<Decimal>,
    members: DashMap<MemberId, Member>,
    savings: DashMap<EntryId, SavingsEntry>,
    afterschool: DashMap<EntryId, AfterschoolEntry>,
    fines: DashMap<FineId, Fine>,
    /// Latest inactivity fine per member, checked before another one is issued.
    inactivity_flags: DashMap<MemberId, FineId>,
    loans: DashMap<LoanId, Loan>,
    entry_sequence: AtomicU64,
    fine_sequence: AtomicU64,
    loan_sequence: AtomicU64
}

impl LedgerStorage {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            balance_floor: None,
            members: DashMap::new(),
            savings: DashMap::new(),
            afterschool: DashMap::new(),
            fines: DashMap::new(),
            inactivity_flags: DashMap::new(),
            loans: DashMap::new(),
            entry_sequence: AtomicU64::new(0),
            fine_sequence: AtomicU64::new(0),
            loan_sequence: AtomicU64::new(0)
        }
    }

    /// Refuses debits that would take a member below `floor`.
    pub fn with_balance_floor(mut self, floor: Option<Decimal>) -> Self {
        self.balance_floor = floor;
        self
    }

    /// Credits a member and writes the matching entry while the member is locked.
    fn credit<T, F>(&self, member_id: MemberId, amount: Decimal, operation: Operation, write_entry: F) -> Result<T, LedgerError>
    where
        F: FnOnce(EntryId, DateTime<Utc>) -> T
    {
        let context = Context::member(member_id, operation);
        ensure_positive(amount, context)?;

        let now = self.now();
        let mut member = self.members.get_mut(&member_id)
            .ok_or_else(|| LedgerError::not_found(context))?;

        member.adjust_balance(amount, self.balance_floor, context)?;
        member.record_activity(now);

        Ok(write_entry(next_id(&self.entry_sequence), now))
    }

    fn new_fine(&self, member_id: MemberId, amount: Decimal, reason: FineReason) -> Fine {
        Fine {
            fine_id: next_id(&self.fine_sequence),
            member_id,
            amount,
            reason,
            created_at: self.now(),
            paid: false,
            paid_at: None
        }
    }

    fn ensure_member(&self, member_id: MemberId, operation: Operation) -> Result<(), LedgerError> {
        if !self.members.contains_key(&member_id) {
            return Err(LedgerError::not_found(Context::member(member_id, operation)))
        }

        Ok(())
    }
}

impl Storage for LedgerStorage {
    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    fn register_member(&self, member_id: MemberId, role: Role) -> Result<Member, LedgerError> {
        match self.members.entry(member_id) {
            Entry::Occupied(_) => {
                Err(LedgerError::invalid_state(Context::member(member_id, Operation::RegisterMember), "registered"))
            }
            Entry::Vacant(vacant) => {
                let member = Member::new(member_id, role);
                vacant.insert(member.clone());
                debug!("Member [{}]:[{:?}] registered", member_id, role);
                Ok(member)
            }
        }
    }

    fn get_member(&self, member_id: MemberId) -> Result<Member, LedgerError> {
        self.members.get(&member_id)
            .map(|member| member.value().clone())
            .ok_or_else(|| LedgerError::not_found(Context::member(member_id, Operation::Lookup)))
    }

    fn members(&self) -> Vec<Member> {
        sorted_by_id(&self.members, |member| member.member_id)
    }

    fn adjust_balance(&self, member_id: MemberId, delta: Decimal) -> Result<Member, LedgerError> {
        let context = Context::member(member_id, Operation::AdjustBalance);
        let mut member = self.members.get_mut(&member_id)
            .ok_or_else(|| LedgerError::not_found(context))?;

        member.adjust_balance(delta, self.balance_floor, context)?;

        Ok(member.clone())
    }

    fn record_savings(&self, member_id: MemberId, amount: Decimal) -> Result<SavingsEntry, LedgerError> {
        let entry = self.credit(member_id, amount, Operation::RecordSavings, |entry_id, created_at| {
            let entry = SavingsEntry { entry_id, member_id, amount, created_at };
            self.savings.insert(entry_id, entry.clone());
            entry
        })?;

        debug!("Savings [{}] of [{}] recorded for member [{}]", entry.entry_id, amount, member_id);

        Ok(entry)
    }

    fn savings(&self) -> Vec<SavingsEntry> {
        sorted_by_id(&self.savings, |entry| entry.entry_id)
    }

    fn record_afterschool(&self, member_id: MemberId, amount: Decimal) -> Result<AfterschoolEntry, LedgerError> {
        let entry = self.credit(member_id, amount, Operation::RecordAfterschool, |entry_id, created_at| {
            let entry = AfterschoolEntry { entry_id, member_id, amount, created_at, paid: false };
            self.afterschool.insert(entry_id, entry.clone());
            entry
        })?;

        debug!("After-school contribution [{}] of [{}] recorded for member [{}]", entry.entry_id, amount, member_id);

        Ok(entry)
    }

    fn mark_afterschool_paid(&self, entry_id: EntryId) -> Result<AfterschoolEntry, LedgerError> {
        let context = Context::new(RecordKind::AfterschoolEntry, entry_id, Operation::MarkAfterschoolPaid);
        let mut entry = self.afterschool.get_mut(&entry_id)
            .ok_or_else(|| LedgerError::not_found(context))?;

        entry.mark_paid()?;

        Ok(entry.clone())
    }

    fn afterschool(&self) -> Vec<AfterschoolEntry> {
        sorted_by_id(&self.afterschool, |entry| entry.entry_id)
    }

    fn record_fine(&self, member_id: MemberId, amount: Decimal, reason: String) -> Result<Fine, LedgerError> {
        ensure_positive(amount, Context::member(member_id, Operation::IssueFine))?;
        self.ensure_member(member_id, Operation::IssueFine)?;

        let fine = self.new_fine(member_id, amount, FineReason::Manual(reason));
        self.fines.insert(fine.fine_id, fine.clone());
        debug!("Fine [{}] of [{}] recorded for member [{}]", fine.fine_id, amount, member_id);

        Ok(fine)
    }

    fn record_inactivity_fine(&self, member_id: MemberId, amount: Decimal) -> Result<Option<Fine>, LedgerError> {
        ensure_positive(amount, Context::member(member_id, Operation::FlagInactive))?;
        self.ensure_member(member_id, Operation::FlagInactive)?;

        //NOTE: The flag entry stays locked until the new fine is in place, two overlapping scans cannot both issue one.
        let flag = self.inactivity_flags.entry(member_id);

        if let Entry::Occupied(existing) = &flag {
            let still_open = self.fines.get(existing.get())
                .is_some_and(|fine| fine.is_open_inactivity_flag());

            if still_open {
                return Ok(None)
            }
        }

        let fine = self.new_fine(member_id, amount, FineReason::Inactivity);
        self.fines.insert(fine.fine_id, fine.clone());
        flag.insert(fine.fine_id);
        debug!("Inactivity fine [{}] recorded for member [{}]", fine.fine_id, member_id);

        Ok(Some(fine))
    }

    fn get_fine(&self, fine_id: FineId) -> Result<Fine, LedgerError> {
        self.fines.get(&fine_id)
            .map(|fine| fine.value().clone())
            .ok_or_else(|| LedgerError::not_found(Context::fine(fine_id, Operation::Lookup)))
    }

    fn mark_fine_paid(&self, fine_id: FineId) -> Result<Fine, LedgerError> {
        let now = self.now();
        let mut fine = self.fines.get_mut(&fine_id)
            .ok_or_else(|| LedgerError::not_found(Context::fine(fine_id, Operation::PayFine)))?;

        fine.ensure_unpaid()?;

        let member_context = Context::member(fine.member_id, Operation::PayFine);
        let mut member = self.members.get_mut(&fine.member_id)
            .ok_or_else(|| LedgerError::not_found(member_context))?;

        member.adjust_balance(-fine.amount, self.balance_floor, member_context)?;
        drop(member);

        fine.pay(now)?;
        debug!("Fine [{}] of [{}] paid by member [{}]", fine_id, fine.amount, fine.member_id);

        Ok(fine.clone())
    }

    fn fines(&self) -> Vec<Fine> {
        sorted_by_id(&self.fines, |fine| fine.fine_id)
    }

    fn insert_loan(&self, member_id: MemberId, principal: Decimal, reason: String) -> Result<Loan, LedgerError> {
        self.ensure_member(member_id, Operation::RequestLoan)?;

        let loan = Loan::request(next_id(&self.loan_sequence), member_id, principal, reason, self.now())?;
        self.loans.insert(loan.loan_id, loan.clone());

        Ok(loan)
    }

    fn get_loan(&self, loan_id: LoanId) -> Result<Loan, LedgerError> {
        self.loans.get(&loan_id)
            .map(|loan| loan.value().clone())
            .ok_or_else(|| LedgerError::not_found(Context::loan(loan_id, Operation::Lookup)))
    }

    fn loans(&self) -> Vec<Loan> {
        sorted_by_id(&self.loans, |loan| loan.loan_id)
    }

    fn update_loan<T, F>(&self, loan_id: LoanId, operation: Operation, update: F) -> Result<(Loan, T), LedgerError>
    where
        F: FnOnce(&mut Loan) -> Result<T, LedgerError>
    {
        let mut loan = self.loans.get_mut(&loan_id)
            .ok_or_else(|| LedgerError::not_found(Context::loan(loan_id, operation)))?;

        let mut draft = loan.clone();
        let output = update(&mut draft)?;
        *loan = draft;

        Ok((loan.clone(), output))
    }
}

fn next_id(sequence: &AtomicU64) -> RecordId {
    sequence.fetch_add(1, Ordering::Relaxed) + 1
}

fn sorted_by_id<K, V, F>(map: &DashMap<K, V>, id: F) -> Vec<V>
where
    K: Eq + std::hash::Hash,
    V: Clone,
    F: Fn(&V) -> RecordId
{
    let mut records: Vec<V> = map.iter().map(|item| item.value().clone()).collect();
    records.sort_by_key(|record| id(record));
    records
}
