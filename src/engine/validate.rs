//! Candidate validation.
//!
//! A candidate is reduced to its digits and then judged on two things:
//!
//! - **Length**: 7 to 15 digits. Shorter runs are dates, prices, counters;
//!   15 is the longest number the international numbering plan allows.
//! - **Luhn**: a 13 to 19 digit run that satisfies the Luhn checksum is most
//!   likely a payment card and is left alone.
//!
//! The Luhn test trades recall for safety. A genuine 13 to 15 digit phone
//! number whose digits happen to satisfy the checksum will not be linked, and
//! there is no second chance for it.

use crate::ValidatedPhone;
use thiserror::Error;

pub const MIN_DIGITS: usize = 7;
pub const MAX_DIGITS: usize = 15;
pub const CARD_MIN_DIGITS: usize = 13;
pub const CARD_MAX_DIGITS: usize = 19;

/// Why a candidate was not turned into a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    #[error("fewer than 7 digits")]
    TooShort,
    #[error("more than 15 digits")]
    TooLong,
    #[error("passes the Luhn checksum (probable payment card)")]
    ProbableCard,
}

/// Validate one raw candidate.
pub fn validate(raw: &str) -> Result<ValidatedPhone, Rejection> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let plus = raw.starts_with('+');
    let len = digits.len();

    // Card-shaped runs are classified first so that a 16-digit card number is
    // reported as a card rather than as merely too long.
    if (CARD_MIN_DIGITS..=CARD_MAX_DIGITS).contains(&len) && luhn_valid(&digits) {
        return Err(Rejection::ProbableCard);
    }
    if len < MIN_DIGITS {
        return Err(Rejection::TooShort);
    }
    if len > MAX_DIGITS {
        return Err(Rejection::TooLong);
    }

    Ok(ValidatedPhone { digits, plus })
}

/// Luhn checksum over an ASCII digit string.
///
/// From the rightmost digit, every second digit is doubled (minus 9 when the
/// result exceeds 9); the number is valid when the total is a multiple of 10.
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, b) in digits.bytes().rev().enumerate() {
        if !b.is_ascii_digit() {
            return false;
        }
        let mut d = u32::from(b - b'0');
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    !digits.is_empty() && sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn luhn_reference_values() {
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("79927398713"));
        assert!(luhn_valid("378282246310005"));
        assert!(!luhn_valid("79927398710"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid(""));
        assert!(!luhn_valid("41a1"));
    }

    #[test]
    fn validation_table() {
        let cases: Vec<(&str, Result<(&str, bool), Rejection>)> = vec![
            ("(415) 555-2671", Ok(("4155552671", false))),
            ("415.555.2671", Ok(("4155552671", false))),
            ("+1 415 555 2671", Ok(("14155552671", true))),
            ("555-2671", Ok(("5552671", false))),
            ("555-267", Err(Rejection::TooShort)),
            ("4111 1111 1111 1111", Err(Rejection::ProbableCard)),
            ("4111111111111111", Err(Rejection::ProbableCard)),
            ("378282246310005", Err(Rejection::ProbableCard)),
            ("4111111111111112", Err(Rejection::TooLong)),
            ("1234567890123456789012", Err(Rejection::TooLong)),
            // 13 digits, fails Luhn: still a phone.
            ("+44 1234 567890 2", Ok(("4412345678902", true))),
        ];

        for (raw, expected) in cases {
            let got = validate(raw);
            match expected {
                Ok((digits, plus)) => {
                    let phone = got.unwrap_or_else(|e| panic!("{raw:?} rejected: {e}"));
                    assert_eq!(phone.digits, digits, "{raw:?}");
                    assert_eq!(phone.plus, plus, "{raw:?}");
                }
                Err(reason) => assert_eq!(got, Err(reason), "{raw:?}"),
            }
        }
    }

    #[test]
    fn canonical_form_keeps_the_plus() {
        assert_eq!(validate("+1 (415) 555-2671").unwrap().canonical(), "+14155552671");
        assert_eq!(validate("(415) 555-2671").unwrap().canonical(), "4155552671");
    }

    proptest! {
        #[test]
        fn accepts_every_in_range_non_card(digits in "[0-9]{7,15}", plus in any::<bool>()) {
            let card = (CARD_MIN_DIGITS..=CARD_MAX_DIGITS).contains(&digits.len()) && luhn_valid(&digits);
            prop_assume!(!card);

            let raw = if plus { format!("+{digits}") } else { digits.clone() };
            let phone = validate(&raw).unwrap();
            let expected = if plus { format!("+{digits}") } else { digits.clone() };
            prop_assert_eq!(phone.canonical(), expected);
        }

        #[test]
        fn separators_do_not_change_the_verdict(digits in "[0-9]{7,15}", sep in "[ .()-]") {
            let spaced: String = digits.chars().flat_map(|c| [c].into_iter().chain(sep.chars())).collect();
            prop_assert_eq!(validate(&spaced), validate(&digits));
        }
    }
}
