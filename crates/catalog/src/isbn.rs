use serde::{Deserialize, Serialize};

use shelfkeep_core::{DomainError, DomainResult, ValueObject};

/// Which ISBN lengths are acceptable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum IsbnKind {
    Isbn10,
    Isbn13,
    #[default]
    Any,
}

/// A normalized ISBN: only digits and `X`, 10 or 13 characters long.
///
/// Separators (hyphens, spaces) are stripped on parse, so `978-0-306-40615-7`
/// and `9780306406157` are the same value. Check digits are not verified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl ValueObject for Isbn {}

impl Isbn {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        Self::parse_as(raw, IsbnKind::Any)
    }

    pub fn parse_as(raw: &str, kind: IsbnKind) -> DomainResult<Self> {
        let digits: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == 'X')
            .collect();

        let ok = match kind {
            IsbnKind::Isbn10 => digits.len() == 10,
            IsbnKind::Isbn13 => digits.len() == 13,
            IsbnKind::Any => digits.len() == 10 || digits.len() == 13,
        };
        if !ok {
            return Err(DomainError::validation(format!(
                "invalid ISBN '{raw}': expected {kind:?} length, found {} digits",
                digits.len()
            )));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> IsbnKind {
        if self.0.len() == 10 {
            IsbnKind::Isbn10
        } else {
            IsbnKind::Isbn13
        }
    }
}

impl core::fmt::Display for Isbn {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Isbn {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Isbn::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(value: Isbn) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_are_stripped() {
        let isbn = Isbn::parse("978-0-306-40615-7").unwrap();
        assert_eq!(isbn.as_str(), "9780306406157");
        assert_eq!(isbn.kind(), IsbnKind::Isbn13);
    }

    #[test]
    fn isbn10_with_check_x_is_accepted() {
        let isbn = Isbn::parse("0-8044-2957-X").unwrap();
        assert_eq!(isbn.as_str(), "080442957X");
        assert_eq!(isbn.kind(), IsbnKind::Isbn10);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(Isbn::parse("12345").is_err());
        assert!(Isbn::parse("").is_err());
    }

    #[test]
    fn kind_restricts_length() {
        assert!(Isbn::parse_as("0306406152", IsbnKind::Isbn13).is_err());
        assert!(Isbn::parse_as("0306406152", IsbnKind::Isbn10).is_ok());
        assert!(Isbn::parse_as("9780306406157", IsbnKind::Isbn10).is_err());
    }

    #[test]
    fn lowercase_x_is_not_a_digit() {
        // 9 digits + 'x' normalizes to 9 characters.
        assert!(Isbn::parse("080442957x").is_err());
    }
}
