//! [`Codes`] definitions.
//!
//! A user sets up two exit codes: a safe one, ending a monitored session
//! normally, and a decoy one, outwardly doing the same while covertly raising
//! an emergency. Only one-way hashes of the codes are ever stored.

use std::fmt;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{Debug, Display};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use secrecy::{zeroize::Zeroize, CloneableSecret};
use sha2::{Digest as _, Sha256};
use subtle::ConstantTimeEq as _;

use crate::domain::user;

/// Pair of exit code hashes of a user.
#[derive(Clone, Debug)]
pub struct Codes {
    /// ID of the user these [`Codes`] belong to.
    pub user_id: user::Id,

    /// [`CodeHash`] of the safe exit code.
    pub safe: CodeHash,

    /// [`CodeHash`] of the decoy (duress) code.
    pub decoy: CodeHash,

    /// [`DateTime`] when these [`Codes`] were set.
    pub created_at: CreationDateTime,
}

impl Codes {
    /// Classifies the submitted [`ExitCode`] against these [`Codes`].
    ///
    /// Both hashes are always evaluated, keeping the work done independent of
    /// which (if any) of the codes matched.
    #[must_use]
    pub fn classify(&self, code: &ExitCode) -> Classification {
        let safe = self.safe.matches(code);
        let decoy = self.decoy.matches(code);

        if safe {
            Classification::Safe
        } else if decoy {
            Classification::Decoy
        } else {
            Classification::Unknown
        }
    }
}

/// Classification of a submitted [`ExitCode`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Classification {
    /// The safe exit code: end the session normally.
    Safe,

    /// The decoy code: end the session visibly, raise an emergency covertly.
    Decoy,

    /// Neither of the configured codes.
    Unknown,
}

/// Exit code as submitted by a user.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[debug("ExitCode(***)")]
#[display("***")]
pub struct ExitCode(String);

impl ExitCode {
    /// Creates a new [`ExitCode`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`ExitCode`].
    fn check(code: impl AsRef<str>) -> bool {
        let code = code.as_ref();
        code.len() >= 4 && code.len() <= 64
    }
}

impl CloneableSecret for ExitCode {}
impl Zeroize for ExitCode {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// One-way [SHA-256] hash of an [`ExitCode`].
///
/// [SHA-256]: https://wikipedia.org/wiki/SHA-2
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct CodeHash([u8; 32]);

impl CodeHash {
    /// Creates a new [`CodeHash`] of the provided [`ExitCode`].
    #[must_use]
    pub fn new(code: &ExitCode) -> Self {
        Self(Sha256::digest(code.0.as_bytes()).into())
    }

    /// Checks whether the provided [`ExitCode`] hashes to this [`CodeHash`],
    /// in constant time.
    #[must_use]
    pub fn matches(&self, code: &ExitCode) -> bool {
        bool::from(Self::new(code).0.ct_eq(&self.0))
    }
}

impl fmt::Debug for CodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeHash(")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

impl From<[u8; 32]> for CodeHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<CodeHash> for [u8; 32] {
    fn from(hash: CodeHash) -> Self {
        hash.0
    }
}

#[cfg(feature = "postgres")]
impl FromSql<'_> for CodeHash {
    accepts!(BYTEA);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(<&[u8]>::from_sql(ty, raw)?.try_into().map_err(
            |_| format!("invalid `CodeHash` length: {}", raw.len()),
        )?))
    }
}

#[cfg(feature = "postgres")]
impl ToSql for CodeHash {
    accepts!(BYTEA);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        self.0.as_slice().to_sql(ty, w)
    }
}

/// [`DateTime`] when [`Codes`] were set.
pub type CreationDateTime = DateTimeOf<(Codes, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Classification, CodeHash, Codes, ExitCode};

    fn codes() -> Codes {
        Codes {
            user_id: crate::domain::user::Id::new(),
            safe: CodeHash::new(&ExitCode::new("sunny day").unwrap()),
            decoy: CodeHash::new(&ExitCode::new("rainy day").unwrap()),
            created_at: common::DateTime::now().coerce(),
        }
    }

    #[test]
    fn hashing_is_deterministic() {
        let code = ExitCode::new("sunny day").unwrap();
        assert_eq!(CodeHash::new(&code), CodeHash::new(&code));
    }

    #[test]
    fn different_codes_hash_differently() {
        assert_ne!(
            CodeHash::new(&ExitCode::new("sunny day").unwrap()),
            CodeHash::new(&ExitCode::new("rainy day").unwrap()),
        );
    }

    #[test]
    fn classifies_both_codes() {
        let codes = codes();

        assert_eq!(
            codes.classify(&ExitCode::new("sunny day").unwrap()),
            Classification::Safe,
        );
        assert_eq!(
            codes.classify(&ExitCode::new("rainy day").unwrap()),
            Classification::Decoy,
        );
        assert_eq!(
            codes.classify(&ExitCode::new("cloudy day").unwrap()),
            Classification::Unknown,
        );
    }

    #[test]
    fn code_is_not_printed() {
        let code = ExitCode::new("sunny day").unwrap();
        assert_eq!(format!("{code}"), "***");
        assert_eq!(format!("{code:?}"), "ExitCode(***)");
    }
}
