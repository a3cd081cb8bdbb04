use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{Context, LedgerError};

const MONEY_DECIMAL_PLACES: u32 = 2;

/// Rejects zero and negative amounts at the boundary.
pub fn ensure_positive(amount: Decimal, context: Context) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(context, amount))
    }

    Ok(amount)
}

pub fn checked_add(lhs: Decimal, rhs: Decimal, context: Context) -> Result<Decimal, LedgerError> {
    lhs.checked_add(rhs).ok_or_else(|| LedgerError::overflow(context))
}

/// Rounds a computed amount (interest) to whole cents, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}
