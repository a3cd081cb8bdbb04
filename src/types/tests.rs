use super::{checked_add, ensure_positive, round_money, Context, ErrorKind, LedgerError, Operation, RecordKind, Role};

use std::str::FromStr;

use anyhow::Result;
use rstest::rstest;
use rust_decimal::Decimal;

#[rstest]
#[case("0")]
#[case("-0.01")]
#[case("-500")]
fn test_non_positive_amounts_are_rejected(#[case] amount: &str) -> Result<()> {
    let context = Context::member(1, Operation::RecordSavings);
    let result = ensure_positive(Decimal::from_str(amount)?, context);

    assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));

    Ok(())
}

#[test]
fn test_positive_amount_passes_through_unchanged() -> Result<()> {
    let amount = Decimal::from_str("0.01")?;

    assert_eq!(ensure_positive(amount, Context::member(1, Operation::RecordSavings))?, amount);

    Ok(())
}

#[test]
fn test_checked_add_reports_overflow_instead_of_panicking() {
    let context = Context::loan(7, Operation::AccrueInterest);
    let result = checked_add(Decimal::MAX, Decimal::ONE, context);

    assert_eq!(result, Err(LedgerError::overflow(context)));
}

#[rstest]
#[case("100.005", "100.01")]
#[case("100.004", "100.00")]
#[case("33.3333", "33.33")]
#[case("50", "50")]
fn test_round_money_rounds_to_cents(#[case] input: &str, #[case] expected: &str) -> Result<()> {
    assert_eq!(round_money(Decimal::from_str(input)?), Decimal::from_str(expected)?);

    Ok(())
}

#[test]
fn test_error_kind_and_context_are_exposed_for_handlers() {
    let context = Context::new(RecordKind::PendingTransaction, 12, Operation::Approve);
    let error = LedgerError::invalid_state(context, "approved");

    assert_eq!(error.kind(), ErrorKind::InvalidState);
    assert_eq!(error.context(), context);
    assert_eq!(error.to_string(), "Invalid state [approved]: PendingTransaction [12] during [Approve]");
}

#[test]
fn test_batch_context_names_no_record() {
    let context = Context::batch(RecordKind::Loan, Operation::AccrueInterest);
    let error = LedgerError::invalid_amount(context, Decimal::ZERO);

    assert_eq!(error.context().id, None);
    assert_eq!(error.to_string(), "Invalid amount [0]: every Loan during [AccrueInterest]");
}

#[test]
fn test_only_officials_hold_admin_roles() {
    assert!(!Role::Member.is_admin());
    assert!(Role::Treasurer.is_admin());
    assert!(Role::Chairperson.is_admin());
    assert!(Role::Secretary.is_admin());
}
