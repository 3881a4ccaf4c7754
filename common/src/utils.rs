use crate::config::{COIN_DECIMALS, COIN_VALUE};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Empty amount")]
    Empty,

    #[error("Invalid amount: {0}")]
    Invalid(String),

    #[error("Too many decimals in {}, at most {} are allowed", _0, COIN_DECIMALS)]
    TooManyDecimals(String),

    #[error("Amount {0} overflows")]
    Overflow(String),
}

// Convert a decimal LTO amount ("1.5") to atomic units without going through floats
pub fn parse_lto_amount(value: &str) -> Result<u64, AmountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Invalid(value.to_owned()));
    }

    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) {
        return Err(AmountError::Invalid(value.to_owned()));
    }

    if fraction.len() > COIN_DECIMALS as usize {
        return Err(AmountError::TooManyDecimals(value.to_owned()));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| AmountError::Overflow(value.to_owned()))?
    };

    let mut fraction_units: u64 = 0;
    if !fraction.is_empty() {
        let padded = format!("{:0<width$}", fraction, width = COIN_DECIMALS as usize);
        fraction_units = padded
            .parse()
            .map_err(|_| AmountError::Invalid(value.to_owned()))?;
    }

    whole
        .checked_mul(COIN_VALUE)
        .and_then(|units| units.checked_add(fraction_units))
        .ok_or_else(|| AmountError::Overflow(value.to_owned()))
}

// Format atomic units back as a decimal LTO string, trimming trailing zeros
pub fn format_lto_amount(units: u64) -> String {
    let whole = units / COIN_VALUE;
    let fraction = units % COIN_VALUE;
    if fraction == 0 {
        return whole.to_string();
    }

    let fraction = format!("{:0>width$}", fraction, width = COIN_DECIMALS as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional_amounts() {
        assert_eq!(parse_lto_amount("1").unwrap(), COIN_VALUE);
        assert_eq!(parse_lto_amount("0.1").unwrap(), COIN_VALUE / 10);
        assert_eq!(parse_lto_amount("1.5").unwrap(), 150_000_000);
        assert_eq!(parse_lto_amount(".35").unwrap(), 35_000_000);
        assert_eq!(parse_lto_amount("0.00000001").unwrap(), 1);
        assert_eq!(parse_lto_amount(" 10 ").unwrap(), 10 * COIN_VALUE);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(parse_lto_amount(""), Err(AmountError::Empty));
        assert!(matches!(parse_lto_amount("."), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_lto_amount("-1"), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_lto_amount("1e5"), Err(AmountError::Invalid(_))));
        assert!(matches!(
            parse_lto_amount("0.000000001"),
            Err(AmountError::TooManyDecimals(_))
        ));
        assert!(matches!(
            parse_lto_amount("999999999999999"),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_lto_amount(COIN_VALUE), "1");
        assert_eq!(format_lto_amount(150_000_000), "1.5");
        assert_eq!(format_lto_amount(1), "0.00000001");
        assert_eq!(format_lto_amount(0), "0");
    }

    proptest::proptest! {
        #[test]
        fn test_formatted_amount_parses_back(units in 0u64..u64::MAX) {
            proptest::prop_assert_eq!(parse_lto_amount(&format_lto_amount(units)), Ok(units));
        }
    }
}
