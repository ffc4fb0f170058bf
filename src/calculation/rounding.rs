//! Yen rounding helpers shared by the calculation modules.

use rust_decimal::{Decimal, RoundingStrategy};

/// Truncates to whole yen toward negative infinity.
///
/// Premiums and the resident tax estimate drop fractional yen.
pub fn truncate_yen(amount: Decimal) -> Decimal {
    amount.floor()
}

/// Rounds to whole yen, halves away from zero.
pub fn round_yen(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds to two decimal places, halves away from zero.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
