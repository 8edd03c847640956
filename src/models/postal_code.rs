//! Postal code validation shared by the gateway and the resolver

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, error::ServiceError};

/// Number of digits in a CEP
pub const POSTAL_CODE_LEN: usize = 8;

/// A postal code that is known to be exactly eight ASCII digits.
///
/// Instances only come out of [`PostalCode::parse`], so holding one is proof
/// the value passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    /// Validate a raw postal code
    pub fn parse(raw: &str) -> Result<Self> {
        if is_valid_postal_code(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(ServiceError::InvalidFormat)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns true iff `raw` is exactly eight ASCII digits
#[must_use]
pub fn is_valid_postal_code(raw: &str) -> bool {
    raw.len() == POSTAL_CODE_LEN && raw.bytes().all(|b| b.is_ascii_digit())
}

impl TryFrom<String> for PostalCode {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self> {
        if is_valid_postal_code(&value) {
            Ok(Self(value))
        } else {
            Err(ServiceError::InvalidFormat)
        }
    }
}

impl From<PostalCode> for String {
    fn from(value: PostalCode) -> Self {
        value.0
    }
}

impl AsRef<str> for PostalCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
