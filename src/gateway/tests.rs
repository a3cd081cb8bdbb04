use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::TimeDelta;
use tokio::task::spawn_blocking;

use super::Gateway;
use crate::config::LedgerConfig;
use crate::events::LedgerEvent;
use crate::loans::LoanEngine;
use crate::models::{LoanStatus, PendingKind, PendingStatus};
use crate::storage::Storage;
use crate::test_support::{amount, start, Fixture, MEMBER, OTHER_MEMBER, TREASURER};
use crate::types::{ErrorKind, LedgerError};

#[test]
fn test_approved_savings_credit_balance_and_activity() -> Result<()> {
    let fixture = Fixture::new()?;
    let gateway = fixture.gateway();
    fixture.clock.advance(TimeDelta::hours(4));

    let pending = gateway.submit(MEMBER, PendingKind::Savings, amount("500")?)?;

    assert_eq!(pending.status, PendingStatus::Pending);
    assert!(fixture.storage.get_member(MEMBER)?.balance.is_zero());

    let approved = gateway.approve(pending.pending_id, TREASURER)?;
    let member = fixture.storage.get_member(MEMBER)?;

    assert_eq!(approved.status, PendingStatus::Approved);
    assert_eq!(approved.resolved_by, Some(TREASURER));
    assert_eq!(member.balance, amount("500")?);
    assert_eq!(member.last_activity_at, Some(start()? + TimeDelta::hours(4)));
    assert!(matches!(fixture.events.events().as_slice(), [LedgerEvent::SavingsConfirmed { member_id: MEMBER, .. }]));

    Ok(())
}

#[test]
fn test_second_resolution_fails_without_ledger_change() -> Result<()> {
    let fixture = Fixture::new()?;
    let gateway = fixture.gateway();

    let pending = gateway.submit(MEMBER, PendingKind::Afterschool, amount("200")?)?;
    gateway.approve(pending.pending_id, TREASURER)?;

    assert!(matches!(gateway.approve(pending.pending_id, TREASURER), Err(LedgerError::InvalidState { .. })));
    assert!(matches!(gateway.reject(pending.pending_id, TREASURER, "late"), Err(LedgerError::InvalidState { .. })));
    assert_eq!(fixture.storage.get_member(MEMBER)?.balance, amount("200")?);
    assert_eq!(fixture.storage.afterschool().len(), 1);

    Ok(())
}

#[test]
fn test_rejection_has_no_ledger_side_effect() -> Result<()> {
    let fixture = Fixture::new()?;
    let gateway = fixture.gateway();

    let pending = gateway.submit(MEMBER, PendingKind::Savings, amount("500")?)?;
    let rejected = gateway.reject(pending.pending_id, TREASURER, "no M-Pesa receipt")?;

    assert_eq!(rejected.status, PendingStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("no M-Pesa receipt"));
    assert!(fixture.storage.get_member(MEMBER)?.balance.is_zero());
    assert!(fixture.storage.savings().is_empty());
    assert!(matches!(gateway.approve(pending.pending_id, TREASURER), Err(LedgerError::InvalidState { .. })));

    Ok(())
}

#[test]
fn test_submit_validates_amount_and_member() -> Result<()> {
    let fixture = Fixture::new()?;
    let gateway = fixture.gateway();

    assert!(matches!(gateway.submit(MEMBER, PendingKind::Savings, amount("0")?), Err(LedgerError::InvalidAmount { .. })));
    assert!(matches!(gateway.submit(55, PendingKind::Savings, amount("10")?), Err(LedgerError::NotFound { .. })));
    assert!(gateway.list(None).is_empty());

    Ok(())
}

#[test]
fn test_repayment_must_target_members_own_approved_loan() -> Result<()> {
    let fixture = Fixture::new()?;
    let gateway = fixture.gateway();
    let loans = fixture.loans();

    let pending_loan = loans.request_loan(MEMBER, amount("1000")?, "stock")?;
    let repay_pending = PendingKind::LoanRepayment { loan_id: pending_loan.loan_id };

    assert!(matches!(gateway.submit(MEMBER, repay_pending.clone(), amount("10")?), Err(LedgerError::InvalidState { .. })));

    loans.approve_loan(pending_loan.loan_id)?;

    assert!(matches!(gateway.submit(OTHER_MEMBER, repay_pending.clone(), amount("10")?), Err(LedgerError::NotFound { .. })));
    assert!(matches!(gateway.submit(MEMBER, PendingKind::LoanRepayment { loan_id: 404 }, amount("10")?), Err(LedgerError::NotFound { .. })));
    assert!(gateway.submit(MEMBER, repay_pending, amount("10")?).is_ok());

    Ok(())
}

#[test]
fn test_failed_downstream_mutation_keeps_transaction_pending() -> Result<()> {
    let fixture = Fixture::new()?;
    let gateway = fixture.gateway();
    let loans = fixture.loans();

    let loan = loans.request_loan(MEMBER, amount("1000")?, "stock")?;
    loans.approve_loan(loan.loan_id)?;

    let pending = gateway.submit(MEMBER, PendingKind::LoanRepayment { loan_id: loan.loan_id }, amount("1200")?)?;
    let result = gateway.approve(pending.pending_id, TREASURER);

    assert_eq!(result.map_err(|error| error.kind()).err(), Some(ErrorKind::OverPayment));
    assert_eq!(gateway.get(pending.pending_id)?.status, PendingStatus::Pending);
    assert!(loans.get_loan(loan.loan_id)?.paid_amount.is_zero());

    gateway.reject(pending.pending_id, TREASURER, "amount exceeds loan")?;
    let corrected = gateway.submit(MEMBER, PendingKind::LoanRepayment { loan_id: loan.loan_id }, amount("1000")?)?;
    let approved = gateway.approve(corrected.pending_id, TREASURER)?;

    assert_eq!(approved.record_id, Some(loan.loan_id));
    assert_eq!(loans.get_loan(loan.loan_id)?.status, LoanStatus::Closed);

    Ok(())
}

#[test]
fn test_approved_loan_request_skips_pending_loan_state() -> Result<()> {
    let fixture = Fixture::new()?;
    let gateway = fixture.gateway();

    let pending = gateway.submit(MEMBER, PendingKind::LoanRequest { reason: "school fees".to_string() }, amount("3000")?)?;

    assert!(fixture.storage.loans().is_empty());

    let approved = gateway.approve(pending.pending_id, TREASURER)?;
    let loan_id = approved.record_id.ok_or_else(|| anyhow!("approval should link the loan"))?;
    let loan = fixture.storage.get_loan(loan_id)?;

    assert_eq!(loan.status, LoanStatus::Approved);
    assert_eq!(loan.principal, amount("3000")?);
    assert_eq!(loan.reason, "school fees");
    assert!(fixture.storage.get_member(MEMBER)?.balance.is_zero());

    Ok(())
}

#[test]
fn test_failed_loan_request_approval_rejects_the_orphan_loan() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = LedgerConfig { grace_period_days: 100_000_000, ..LedgerConfig::default() };
    let loans = Arc::new(LoanEngine::new(fixture.storage.clone(), fixture.events.clone(), &config));
    let gateway = Gateway::new(fixture.storage.clone(), loans, Arc::new(fixture.fines()), fixture.events.clone());

    let pending = gateway.submit(MEMBER, PendingKind::LoanRequest { reason: "roof".to_string() }, amount("800")?)?;
    let result = gateway.approve(pending.pending_id, TREASURER);
    let orphans = fixture.storage.loans();

    assert!(matches!(result, Err(LedgerError::Overflow { .. })));
    assert_eq!(gateway.get(pending.pending_id)?.status, PendingStatus::Pending);
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].status, LoanStatus::Rejected);

    Ok(())
}

#[test]
fn test_fine_payment_submission_settles_the_fine() -> Result<()> {
    let fixture = Fixture::new()?;
    let gateway = fixture.gateway();
    let fine = fixture.fines().issue_fine(MEMBER, amount("50")?, "late")?;
    fixture.storage.record_savings(MEMBER, amount("100")?)?;

    assert!(matches!(gateway.submit(MEMBER, PendingKind::FinePayment { fine_id: fine.fine_id }, amount("40")?), Err(LedgerError::InvalidAmount { .. })));
    assert!(matches!(gateway.submit(OTHER_MEMBER, PendingKind::FinePayment { fine_id: fine.fine_id }, amount("50")?), Err(LedgerError::NotFound { .. })));

    let pending = gateway.submit(MEMBER, PendingKind::FinePayment { fine_id: fine.fine_id }, amount("50")?)?;
    let duplicate = gateway.submit(MEMBER, PendingKind::FinePayment { fine_id: fine.fine_id }, amount("50")?)?;

    gateway.approve(pending.pending_id, TREASURER)?;

    assert!(fixture.storage.get_fine(fine.fine_id)?.paid);
    assert_eq!(fixture.storage.get_member(MEMBER)?.balance, amount("50")?);
    assert!(matches!(gateway.approve(duplicate.pending_id, TREASURER), Err(LedgerError::AlreadyPaid { .. })));
    assert_eq!(gateway.get(duplicate.pending_id)?.status, PendingStatus::Pending);

    Ok(())
}

#[test]
fn test_listing_filters_by_status_and_member() -> Result<()> {
    let fixture = Fixture::new()?;
    let gateway = fixture.gateway();

    let first = gateway.submit(MEMBER, PendingKind::Savings, amount("10")?)?;
    gateway.submit(OTHER_MEMBER, PendingKind::Savings, amount("20")?)?;
    gateway.submit(MEMBER, PendingKind::Afterschool, amount("30")?)?;
    gateway.approve(first.pending_id, TREASURER)?;

    assert_eq!(gateway.list(Some(PendingStatus::Pending)).len(), 2);
    assert_eq!(gateway.list(Some(PendingStatus::Approved)).len(), 1);
    assert_eq!(gateway.submitted_by(MEMBER).len(), 2);
    assert!(matches!(gateway.get(99), Err(LedgerError::NotFound { .. })));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_apply_exactly_once() -> Result<()> {
    let fixture = Fixture::new()?;
    let gateway = Arc::new(fixture.gateway());
    let rounds = 50;

    for _ in 0..rounds {
        let pending = gateway.submit(MEMBER, PendingKind::Savings, amount("10")?)?;

        let handles: Vec<_> = (0..2).map(|_| {
            let gateway = gateway.clone();
            spawn_blocking(move || gateway.approve(pending.pending_id, TREASURER))
        }).collect();

        let mut successes = 0;
        let mut conflicts = 0;

        for handle in handles {
            match handle.await? {
                Ok(_) => successes += 1,
                Err(error) if error.kind() == ErrorKind::InvalidState => conflicts += 1,
                Err(error) => return Err(error.into())
            }
        }

        assert_eq!((successes, conflicts), (1, 1));
    }

    assert_eq!(fixture.storage.get_member(MEMBER)?.balance, amount("500")?);
    assert_eq!(fixture.storage.savings().len(), rounds);

    Ok(())
}
