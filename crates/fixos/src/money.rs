//! Brazilian real formatting and input parsing.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Error, Result};

/// Format an amount as pt-BR with two decimals: `1.234,56`.
#[must_use]
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!("{}{grouped},{frac_part}", if negative { "-" } else { "" })
}

/// Format with the currency symbol: `R$ 1.234,56`.
#[must_use]
pub fn format_currency(amount: Decimal) -> String {
    format!("R$ {}", format_brl(amount))
}

/// Interpret typed input as cents, ignoring every non-digit.
///
/// `"1.234,56"`, `"R$ 1234,56"` and `"123456"` all give `1234.56`. Input
/// without digits gives zero.
#[must_use]
pub fn parse_currency_input(input: &str) -> Decimal {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(digits)
        .map(|cents| cents / Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::MAX)
}

/// Parse an amount written either as `1234.56` or pt-BR `1.234,56`.
///
/// # Errors
///
/// Returns a validation error when the text is not a number.
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let trimmed = input.trim().trim_start_matches("R$").trim();
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    Decimal::from_str(&normalized)
        .map_err(|_| Error::validation(format!("valor inválido: {input}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(dec("0")), "0,00");
        assert_eq!(format_brl(dec("5.5")), "5,50");
        assert_eq!(format_brl(dec("999.99")), "999,99");
        assert_eq!(format_brl(dec("1234.56")), "1.234,56");
        assert_eq!(format_brl(dec("1234567.8")), "1.234.567,80");
        assert_eq!(format_brl(dec("100000")), "100.000,00");
    }

    #[test]
    fn test_format_brl_rounding_and_sign() {
        assert_eq!(format_brl(dec("2.005")), "2,01");
        assert_eq!(format_brl(dec("-1500")), "-1.500,00");
        assert_eq!(format_brl(dec("-0.001")), "0,00");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec("80")), "R$ 80,00");
    }

    #[test]
    fn test_parse_currency_input() {
        assert_eq!(parse_currency_input("123456"), dec("1234.56"));
        assert_eq!(parse_currency_input("R$ 1.234,56"), dec("1234.56"));
        assert_eq!(parse_currency_input("5"), dec("0.05"));
        assert_eq!(parse_currency_input("000150"), dec("1.50"));
        assert_eq!(parse_currency_input(""), Decimal::ZERO);
        assert_eq!(parse_currency_input("abc"), Decimal::ZERO);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1234.56").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount("1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount("R$ 80,00").unwrap(), dec("80"));
        assert_eq!(parse_amount(" 12 ").unwrap(), dec("12"));
        assert!(parse_amount("doze").unwrap_err().is_validation());
    }
}
