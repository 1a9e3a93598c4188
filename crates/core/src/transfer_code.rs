//! Transfer codes - 4-digit verification codes attached to transfer requests
//!
//! The code travels with the request so the admin can verify it out of band.
//! Approval only ever checks that a well-formed code is PRESENT; the code is
//! never matched against anything automatically.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of digits in a transfer code
const CODE_LEN: usize = 4;

/// Errors that can occur when parsing transfer codes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferCodeError {
    #[error("transfer code must be exactly {CODE_LEN} digits: {0}")]
    InvalidFormat(String),
}

/// A 4-digit transfer verification code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransferCode(String);

impl TransferCode {
    /// Parse a code, requiring exactly four ASCII digits.
    pub fn parse(s: &str) -> Result<Self, TransferCodeError> {
        if s.len() != CODE_LEN || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(TransferCodeError::InvalidFormat(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Generate a random code in the range 1000..=9999.
    pub fn generate() -> Self {
        let n: u16 = rand::thread_rng().gen_range(1000..=9999);
        Self(n.to_string())
    }

    /// The raw digit string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TransferCode {
    type Error = TransferCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TransferCode> for String {
    fn from(code: TransferCode) -> Self {
        code.0
    }
}
