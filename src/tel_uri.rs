//! Dialable-number link targets.
//!
//! Links produced by the engine point at `tel:<canonical>`. The reverse
//! direction, turning whatever a handler receives into a dialable number,
//! accepts both `tel:` and `callto:` (including the `callto://` form), undoes
//! percent-encoding, keeps a single leading `+` and drops every other non-digit.

use crate::ValidatedPhone;
use percent_encoding::percent_decode_str;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const SCHEMES: &[&str] = &["tel", "callto"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelUriError {
    #[error("missing URI scheme in {0:?}")]
    MissingScheme(String),
    #[error("unsupported scheme {0:?} (expected tel: or callto:)")]
    UnsupportedScheme(String),
    #[error("number is not valid UTF-8 after percent-decoding")]
    InvalidEncoding,
    #[error("no digits in {0:?}")]
    NoDigits(String),
}

/// A canonical dialable number: optional `+` followed by digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TelUri {
    canonical: String,
}

impl TelUri {
    /// Parse a `tel:` or `callto:` URI.
    pub fn parse(uri: &str) -> Result<Self, TelUriError> {
        let uri = uri.trim();
        let (scheme, rest) = uri.split_once(':').ok_or_else(|| TelUriError::MissingScheme(uri.to_string()))?;
        if !SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
            return Err(TelUriError::UnsupportedScheme(scheme.to_string()));
        }

        let decoded = percent_decode_str(rest).decode_utf8().map_err(|_| TelUriError::InvalidEncoding)?;
        let number = decoded.trim().trim_start_matches('/');
        let plus = number.starts_with('+');
        let digits: String = number.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(TelUriError::NoDigits(uri.to_string()));
        }

        let canonical = if plus { format!("+{digits}") } else { digits };
        Ok(TelUri { canonical })
    }

    pub fn from_phone(phone: &ValidatedPhone) -> Self {
        TelUri { canonical: phone.canonical() }
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Link target, e.g. `tel:+14155552671`.
    pub fn href(&self) -> String {
        format!("tel:{}", self.canonical)
    }
}

impl FromStr for TelUri {
    type Err = TelUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TelUri::parse(s)
    }
}

impl fmt::Display for TelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tel:{}", self.canonical)
    }
}
