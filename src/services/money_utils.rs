//! Currency helpers. Money is two-decimal `Decimal` end to end; no value
//! passes through `f64`.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::LedgerError;

/// Money columns are DECIMAL(15, 2)
pub const MONEY_SCALE: u32 = 2;
pub const MAX_AMOUNT: Decimal = dec!(9999999999999.99);

/// Round half away from zero and pin the scale to two decimals.
pub fn to_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Check that `amount` is a strictly positive currency value with at most
/// two decimal places.
pub fn validate_positive_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(
            "Amount must be greater than 0".to_string(),
        ));
    }
    check_currency_shape(amount)
}

/// Same as [`validate_positive_amount`] but zero is accepted.
pub fn validate_non_negative_amount(field: &str, amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::InvalidAmount(format!("{} cannot be negative", field)));
    }
    check_currency_shape(amount)
}

fn check_currency_shape(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::InvalidAmount(
            "Amount cannot have more than two decimal places".to_string(),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount("Amount is too large".to_string()));
    }
    Ok(to_cents(amount))
}

/// Human formatting for notification bodies, e.g. `$13,840.00`.
pub fn format_usd(value: Decimal) -> String {
    let cents = to_cents(value);
    let negative = cents.is_sign_negative() && !cents.is_zero();
    let text = cents.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cents_pins_scale() {
        assert_eq!(to_cents(dec!(13840)).to_string(), "13840.00");
        assert_eq!(to_cents(dec!(2.768)).to_string(), "2.77");
        assert_eq!(to_cents(dec!(0.125)).to_string(), "0.13");
    }

    #[test]
    fn test_positive_amount_rules() {
        assert!(validate_positive_amount(dec!(0.01)).is_ok());
        assert!(validate_positive_amount(dec!(100.50)).is_ok());
        assert!(validate_positive_amount(dec!(100.500)).is_ok());
        assert!(matches!(
            validate_positive_amount(Decimal::ZERO),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_positive_amount(dec!(-5)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_positive_amount(dec!(1.005)),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_non_negative_accepts_zero() {
        assert_eq!(
            validate_non_negative_amount("initialDeposit", Decimal::ZERO).unwrap(),
            dec!(0.00)
        );
        assert!(validate_non_negative_amount("initialDeposit", dec!(-0.01)).is_err());
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(dec!(13840)), "$13,840.00");
        assert_eq!(format_usd(dec!(500000)), "$500,000.00");
        assert_eq!(format_usd(dec!(99.5)), "$99.50");
        assert_eq!(format_usd(dec!(1234567.891)), "$1,234,567.89");
    }
}
