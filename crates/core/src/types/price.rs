//! Price arithmetic using decimal amounts.
//!
//! The catalog reports prices and discount percentages as JSON numbers. They
//! are parsed into [`Decimal`] so that line totals and discounted totals are
//! exact (`100 × 0.9 == 90`, not `89.999…`).

use rust_decimal::Decimal;

/// Multiplier applied to a price for the given discount percentage.
///
/// `discount_percentage` is expected in `0..=100`; values outside that range
/// are clamped so a malformed catalog entry can never produce a negative or
/// inflated total.
#[must_use]
pub fn discount_factor(discount_percentage: Decimal) -> Decimal {
    let hundred = Decimal::ONE_HUNDRED;
    let pct = discount_percentage.clamp(Decimal::ZERO, hundred);
    Decimal::ONE - pct / hundred
}

/// Apply a percentage discount to an amount.
///
/// # Example
///
/// ```
/// use rust_decimal::Decimal;
/// use tote_core::apply_discount;
///
/// assert_eq!(apply_discount(Decimal::from(200), Decimal::from(10)), Decimal::from(180));
/// ```
#[must_use]
pub fn apply_discount(amount: Decimal, discount_percentage: Decimal) -> Decimal {
    amount * discount_factor(discount_percentage)
}

/// Format an amount for display (e.g., `"$19.99"`).
#[must_use]
pub fn format_usd(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}
