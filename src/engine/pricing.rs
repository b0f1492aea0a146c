//! Line and order totals.

use crate::domain::value_objects::Money;
use crate::ComboLineItem;
use rust_decimal::Decimal;

/// Sum of `unit_price * quantity` over `items`, at full precision.
///
/// Lines with no unit price, or a quantity that did not parse, contribute
/// zero. An empty slice totals zero.
pub fn compute_total(items: &[ComboLineItem]) -> Decimal {
    items
        .iter()
        .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.line_total()))
}

/// The total of `items` as shown to the user, truncated to cents.
pub fn display_total(items: &[ComboLineItem]) -> String {
    Money::new(compute_total(items)).display()
}
