//! Conversion between user-entered decimal amounts and token base units.

use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::DepositError;

/// Largest scale `rust_decimal` can represent.
const MAX_DECIMAL_SCALE: u32 = 28;

/// A user-facing amount together with its base-unit value for one token.
///
/// `base_units` is always `round(decimal * 10^precision)`; the fields are
/// private so the two can never drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    decimal: Decimal,
    precision: u8,
    base_units: U256,
}

impl TokenAmount {
    /// Builds an amount, rejecting anything that is not strictly positive
    /// once expressed in base units.
    pub fn new(decimal: Decimal, precision: u8) -> Result<Self, DepositError> {
        if decimal <= Decimal::ZERO {
            return Err(DepositError::InvalidAmount(format!(
                "amount must be positive, got {decimal}"
            )));
        }

        let base_units = normalize(decimal, precision)?;
        if base_units.is_zero() {
            return Err(DepositError::InvalidAmount(format!(
                "{decimal} is smaller than one base unit at {precision} decimals"
            )));
        }

        Ok(Self {
            decimal,
            precision,
            base_units,
        })
    }

    /// Parses user input and converts it at `precision`.
    pub fn parse(input: &str, precision: u8) -> Result<Self, DepositError> {
        Self::new(parse_decimal(input)?, precision)
    }

    /// Re-derives the base units for a token with a different precision.
    pub fn with_precision(&self, precision: u8) -> Result<Self, DepositError> {
        Self::new(self.decimal, precision)
    }

    pub fn decimal(&self) -> Decimal {
        self.decimal
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn base_units(&self) -> U256 {
        self.base_units
    }

    /// Base units as a `u64`, as SPL token instructions require.
    pub fn base_units_u64(&self) -> Result<u64, DepositError> {
        if self.base_units > U256::from(u64::MAX) {
            return Err(DepositError::InvalidAmount(format!(
                "{} base units do not fit in a u64",
                self.base_units
            )));
        }
        Ok(self.base_units.to::<u64>())
    }
}

/// Parses a user-entered amount. Only strictly positive numbers pass.
pub fn parse_decimal(input: &str) -> Result<Decimal, DepositError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DepositError::InvalidAmount("amount is empty".into()));
    }

    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| DepositError::InvalidAmount(format!("{trimmed:?} is not a number")))?;

    if value <= Decimal::ZERO {
        return Err(DepositError::InvalidAmount(format!(
            "amount must be positive, got {value}"
        )));
    }

    Ok(value)
}

/// Converts a non-negative decimal to base units: `round(amount * 10^precision)`,
/// rounding half away from zero.
pub fn normalize(amount: Decimal, precision: u8) -> Result<U256, DepositError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DepositError::InvalidAmount(format!(
            "cannot normalize negative amount {amount}"
        )));
    }

    let precision = u32::from(precision);
    let rounded = if precision < MAX_DECIMAL_SCALE {
        amount.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
    } else {
        amount
    };

    let mantissa = u128::try_from(rounded.mantissa())
        .map_err(|_| DepositError::InvalidAmount(format!("cannot normalize {amount}")))?;
    let shift = precision.checked_sub(rounded.scale()).ok_or_else(|| {
        DepositError::InvalidAmount(format!("{amount} has more decimals than {precision}"))
    })?;

    U256::from(10u8)
        .checked_pow(U256::from(shift))
        .and_then(|factor| U256::from(mantissa).checked_mul(factor))
        .ok_or_else(|| DepositError::InvalidAmount(format!("{amount} overflows 256 bits")))
}

/// Converts base units back to a decimal amount.
pub fn denormalize(base_units: U256, precision: u8) -> Result<Decimal, DepositError> {
    if base_units > U256::from(u128::MAX) || u32::from(precision) > MAX_DECIMAL_SCALE {
        return Err(DepositError::InvalidAmount(format!(
            "{base_units} at {precision} decimals is out of decimal range"
        )));
    }

    let raw = i128::try_from(base_units.to::<u128>()).map_err(|_| {
        DepositError::InvalidAmount(format!("{base_units} is out of decimal range"))
    })?;

    Decimal::try_from_i128_with_scale(raw, u32::from(precision))
        .map_err(|e| DepositError::InvalidAmount(format!("{base_units}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn ten_usdc_is_ten_million_base_units() {
        let amount = TokenAmount::parse("10", 6).unwrap();
        assert_eq!(amount.base_units(), U256::from(10_000_000u64));
        assert_eq!(amount.precision(), 6);
    }

    #[test]
    fn fractional_amounts() {
        assert_eq!(normalize(dec("0.5"), 6).unwrap(), U256::from(500_000u64));
        assert_eq!(normalize(dec("1.000001"), 6).unwrap(), U256::from(1_000_001u64));
    }

    #[test]
    fn excess_decimals_round_half_away_from_zero() {
        assert_eq!(normalize(dec("1.0000005"), 6).unwrap(), U256::from(1_000_001u64));
        assert_eq!(normalize(dec("1.0000004"), 6).unwrap(), U256::from(1_000_000u64));
    }

    #[test]
    fn eighteen_decimals() {
        assert_eq!(
            normalize(dec("1.5"), 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
    }

    #[test]
    fn zero_precision() {
        assert_eq!(normalize(dec("42.4"), 0).unwrap(), U256::from(42u64));
    }

    #[test]
    fn round_trip_stays_within_one_base_unit() {
        let cases = [
            ("10", 6),
            ("0.123456789", 6),
            ("12345.6789", 2),
            ("0.000001", 6),
            ("99999999.999999", 6),
            ("3.14159265358979", 9),
            ("7", 0),
        ];

        for (input, precision) in cases {
            let entered = dec(input);
            let units = normalize(entered, precision).unwrap();
            let back = denormalize(units, precision).unwrap();
            let one_unit = Decimal::new(1, u32::from(precision));
            assert!(
                (back - entered).abs() <= one_unit,
                "{input} at {precision}: got {back}"
            );
        }
    }

    #[test]
    fn precision_change_recomputes_base_units() {
        let six = TokenAmount::parse("2.5", 6).unwrap();
        let nine = six.with_precision(9).unwrap();

        assert_eq!(six.base_units(), U256::from(2_500_000u64));
        assert_eq!(nine.base_units(), U256::from(2_500_000_000u64));
        assert_eq!(nine.decimal(), six.decimal());
    }

    #[test]
    fn rejects_non_numbers() {
        for input in ["", "   ", "abc", "1,5", "ten"] {
            assert!(
                matches!(parse_decimal(input), Err(DepositError::InvalidAmount(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_zero_and_negative() {
        assert!(parse_decimal("0").is_err());
        assert!(parse_decimal("0.00").is_err());
        assert!(parse_decimal("-5").is_err());
    }

    #[test]
    fn accepts_whitespace_and_scientific() {
        assert_eq!(parse_decimal(" 10 ").unwrap(), dec("10"));
        assert_eq!(parse_decimal("1e2").unwrap(), dec("100"));
    }

    #[test]
    fn dust_below_one_base_unit_is_invalid() {
        assert!(matches!(
            TokenAmount::parse("0.0000001", 6),
            Err(DepositError::InvalidAmount(_))
        ));
    }

    #[test]
    fn base_units_u64_limits() {
        let small = TokenAmount::parse("10", 6).unwrap();
        assert_eq!(small.base_units_u64().unwrap(), 10_000_000);

        let huge = TokenAmount::parse("100000000000000000000", 18).unwrap();
        assert!(huge.base_units_u64().is_err());
    }

    #[test]
    fn denormalize_six_decimals() {
        assert_eq!(denormalize(U256::from(5_000_000u64), 6).unwrap(), dec("5"));
    }
}
