//! Anonymous session identifier.
//!
//! A [`SessionId`] is the partition key for cart lines and orders. It is an
//! RFC 4122 UUID in its canonical hyphenated text form, normalized to
//! lowercase so the same client always lands in the same partition.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing a [`SessionId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionIdError {
    /// Not 36 characters of hyphenated hex.
    #[error("session id must be a hyphenated UUID")]
    Malformed,
    /// Version nibble outside 1-5.
    #[error("unsupported UUID version {0}")]
    UnsupportedVersion(usize),
    /// Variant is not the RFC 4122 variant.
    #[error("UUID variant is not RFC 4122")]
    WrongVariant,
}

/// An anonymous client's session token.
///
/// ```
/// use pola_core::SessionId;
///
/// assert!(SessionId::parse("3f2b6c1e-8d4a-4c1b-9a7e-2d5f6a8b9c0d").is_ok());
/// assert!(SessionId::parse("not-a-session").is_err());
/// // version nibble 0
/// assert!(SessionId::parse("3f2b6c1e-8d4a-0c1b-9a7e-2d5f6a8b9c0d").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Length of the hyphenated textual form.
    pub const LENGTH: usize = 36;

    /// Mint a fresh random (v4) session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    /// Parse and normalize a session token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionIdError`] unless the input is a hyphenated UUID with
    /// version 1-5 and the RFC 4122 variant (`8`, `9`, `a` or `b`).
    pub fn parse(s: &str) -> Result<Self, SessionIdError> {
        let bytes = s.as_bytes();
        if bytes.len() != Self::LENGTH {
            return Err(SessionIdError::Malformed);
        }
        for (i, b) in bytes.iter().enumerate() {
            let hyphen_slot = matches!(i, 8 | 13 | 18 | 23);
            if hyphen_slot != (*b == b'-') || (!hyphen_slot && !b.is_ascii_hexdigit()) {
                return Err(SessionIdError::Malformed);
            }
        }

        let uuid = Uuid::try_parse(s).map_err(|_| SessionIdError::Malformed)?;

        let version = uuid.get_version_num();
        if !(1..=5).contains(&version) {
            return Err(SessionIdError::UnsupportedVersion(version));
        }

        if uuid.get_variant() != uuid::Variant::RFC4122 {
            return Err(SessionIdError::WrongVariant);
        }

        Ok(Self(uuid.hyphenated().to_string()))
    }

    /// Returns `true` if `s` would be accepted by [`SessionId::parse`].
    #[must_use]
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = SessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for SessionId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SessionId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Only validated ids are ever written
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for SessionId {
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
    fn test_generate_is_valid_v4() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), SessionId::LENGTH);
        assert!(SessionId::is_valid(id.as_str()));
        assert_eq!(id.as_str().as_bytes()[14], b'4');
    }

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_parse_accepts_versions_one_through_five() {
        for version in ['1', '2', '3', '4', '5'] {
            let token = format!("3f2b6c1e-8d4a-{version}c1b-9a7e-2d5f6a8b9c0d");
            assert!(SessionId::is_valid(&token), "version {version}");
        }
    }

    #[test]
    fn test_parse_rejects_other_versions() {
        assert_eq!(
            SessionId::parse("3f2b6c1e-8d4a-6c1b-9a7e-2d5f6a8b9c0d"),
            Err(SessionIdError::UnsupportedVersion(6))
        );
        assert_eq!(
            SessionId::parse("00000000-0000-0000-0000-000000000000"),
            Err(SessionIdError::UnsupportedVersion(0))
        );
    }

    #[test]
    fn test_parse_variant_nibble() {
        for variant in ['8', '9', 'a', 'b', 'A', 'B'] {
            let token = format!("3f2b6c1e-8d4a-4c1b-{variant}a7e-2d5f6a8b9c0d");
            assert!(SessionId::is_valid(&token), "variant {variant}");
        }
        for variant in ['0', '7', 'c', 'f'] {
            let token = format!("3f2b6c1e-8d4a-4c1b-{variant}a7e-2d5f6a8b9c0d");
            assert_eq!(
                SessionId::parse(&token),
                Err(SessionIdError::WrongVariant),
                "variant {variant}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_hyphenated_forms() {
        assert_eq!(
            SessionId::parse("3f2b6c1e8d4a4c1b9a7e2d5f6a8b9c0d"),
            Err(SessionIdError::Malformed)
        );
        assert_eq!(
            SessionId::parse("{3f2b6c1e-8d4a-4c1b-9a7e-2d5f6a8b9c0d}"),
            Err(SessionIdError::Malformed)
        );
        assert_eq!(
            SessionId::parse("3f2b6c1e-8d4a-4c1b-9a7e-2d5f6a8b9c0g"),
            Err(SessionIdError::Malformed)
        );
        assert_eq!(SessionId::parse(""), Err(SessionIdError::Malformed));
    }

    #[test]
    fn test_parse_normalizes_case() {
        let id = SessionId::parse("3F2B6C1E-8D4A-4C1B-9A7E-2D5F6A8B9C0D").unwrap();
        assert_eq!(id.as_str(), "3f2b6c1e-8d4a-4c1b-9a7e-2d5f6a8b9c0d");
    }

    #[test]
    fn test_serde_transparent() {
        let id = SessionId::parse("3f2b6c1e-8d4a-4c1b-9a7e-2d5f6a8b9c0d").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"3f2b6c1e-8d4a-4c1b-9a7e-2d5f6a8b9c0d\"");
    }
}
