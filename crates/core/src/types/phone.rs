//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains a character that is not a digit or separator.
    #[error("phone number contains invalid character '{0}'")]
    InvalidCharacter(char),
    /// The number of digits is out of range.
    #[error("phone number must have {min}-{max} digits, got {len}")]
    InvalidLength {
        /// Digits found.
        len: usize,
        /// Minimum allowed digits.
        min: usize,
        /// Maximum allowed digits.
        max: usize,
    },
}

/// A phone number normalized to `+<digits>`.
///
/// Telegram reports contact numbers with or without the leading `+`
/// depending on the client, and allowlist entries are typed by hand, so both
/// sides are normalized before comparison.
///
/// ## Constraints
///
/// - Separators (space, `-`, `.`, `(`, `)`) are removed
/// - A single leading `+` is optional
/// - 7-15 digits (E.164 upper bound)
///
/// ## Examples
///
/// ```
/// use granary_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse("+7 (900) 123-45-67").unwrap();
/// assert_eq!(phone.as_str(), "+79001234567");
///
/// // Telegram contacts often omit the plus sign
/// assert_eq!(PhoneNumber::parse("79001234567").unwrap(), phone);
///
/// assert!(PhoneNumber::parse("").is_err());
/// assert!(PhoneNumber::parse("12-34").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 7;
    /// Maximum number of digits (E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse and normalize a `PhoneNumber`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains letters or other
    /// symbols, has a `+` anywhere but the start, or has too few or too many
    /// digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let body = s.strip_prefix('+').unwrap_or(s);
        let mut digits = String::with_capacity(body.len() + 1);
        digits.push('+');

        for c in body.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                other => return Err(PhoneError::InvalidCharacter(other)),
            }
        }

        let len = digits.len() - 1;
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&len) {
            return Err(PhoneError::InvalidLength {
                len,
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(digits))
    }

    /// Returns the normalized number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `PhoneNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PhoneNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PhoneNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Only normalized values are ever written
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PhoneNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_separators() {
        let phone = PhoneNumber::parse(" +7 (900) 123-45.67 ").unwrap();
        assert_eq!(phone.as_str(), "+79001234567");
    }

    #[test]
    fn test_parse_adds_missing_plus() {
        assert_eq!(
            PhoneNumber::parse("380501234567").unwrap().as_str(),
            "+380501234567"
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(PhoneNumber::parse("   "), Err(PhoneError::Empty));
    }

    #[test]
    fn test_parse_rejects_letters_and_inner_plus() {
        assert_eq!(
            PhoneNumber::parse("+7900abc4567"),
            Err(PhoneError::InvalidCharacter('a'))
        );
        assert_eq!(
            PhoneNumber::parse("7900+1234567"),
            Err(PhoneError::InvalidCharacter('+'))
        );
    }

    #[test]
    fn test_parse_length_bounds() {
        assert!(matches!(
            PhoneNumber::parse("123456"),
            Err(PhoneError::InvalidLength { len: 6, .. })
        ));
        assert!(PhoneNumber::parse("1234567").is_ok());
        assert!(PhoneNumber::parse("123456789012345").is_ok());
        assert!(matches!(
            PhoneNumber::parse("1234567890123456"),
            Err(PhoneError::InvalidLength { len: 16, .. })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let phone: PhoneNumber = serde_json::from_str("\"8 900 123 45 67\"").unwrap();
        assert_eq!(phone.as_str(), "+89001234567");
        assert!(serde_json::from_str::<PhoneNumber>("\"call me\"").is_err());
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"+89001234567\"");
    }
}
