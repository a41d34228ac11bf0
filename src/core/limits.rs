//! Daily transfer limit policy
//!
//! Pure arithmetic over a per-account, per-UTC-day spending window. The
//! window itself lives inside the ledger's account state and is rolled
//! under the account lock; this module only answers whether a prospective
//! amount fits under the cap. Spending exactly up to the cap is allowed;
//! the first amount that would push the total past it is refused.

use rust_decimal::Decimal;

/// Outcome of a limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitCheck {
    /// The amount fits under the cap
    Allowed,

    /// Spending the amount would exceed the cap
    Exceeded,
}

/// Check a prospective amount against the daily cap
///
/// # Arguments
///
/// * `spent_today` - Outgoing volume already accumulated this UTC day
/// * `amount` - The prospective transfer amount
/// * `cap` - The configured daily cap
///
/// # Returns
///
/// `Exceeded` when `spent_today + amount` would pass the cap. An
/// arithmetic overflow in the addition is treated as exceeded.
pub fn check(spent_today: Decimal, amount: Decimal, cap: Decimal) -> LimitCheck {
    match spent_today.checked_add(amount) {
        Some(total) if total <= cap => LimitCheck::Allowed,
        _ => LimitCheck::Exceeded,
    }
}
