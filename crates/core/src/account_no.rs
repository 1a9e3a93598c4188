//! Account numbers - sequential `PREFIX####` identifiers
//!
//! Format: a fixed uppercase prefix followed by a zero-padded 4-digit
//! sequence number, e.g. `SNCY0001`. Numbers are allocated sequentially by
//! scanning the existing set, so allocation is deterministic under a single
//! writer; concurrent creation is serialized by the store commit guards.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default account number prefix
pub const DEFAULT_PREFIX: &str = "SNCY";

/// Width of the numeric suffix
const SUFFIX_WIDTH: usize = 4;

/// Errors that can occur when parsing account numbers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountNoError {
    #[error("invalid account number format: {0}")]
    InvalidFormat(String),
}

/// A sequential account number: prefix + zero-padded numeric suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNo(String);

impl AccountNo {
    /// Parse an account number, validating prefix and suffix shape.
    pub fn parse(s: &str, prefix: &str) -> Result<Self, AccountNoError> {
        let suffix = s
            .strip_prefix(prefix)
            .ok_or_else(|| AccountNoError::InvalidFormat(s.to_string()))?;
        if suffix.len() < SUFFIX_WIDTH || !suffix.chars().all(|c| c.is_ascii_digit()) {
            return Err(AccountNoError::InvalidFormat(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Build the account number for a given sequence position.
    pub fn from_sequence(prefix: &str, n: u32) -> Self {
        Self(format!("{}{:0width$}", prefix, n, width = SUFFIX_WIDTH))
    }

    /// Compute the next account number after the given existing set.
    ///
    /// Identifiers that do not carry the prefix or a numeric suffix are
    /// ignored. An empty set yields `PREFIX0001`.
    pub fn next_in_sequence<'a>(
        existing: impl IntoIterator<Item = &'a AccountNo>,
        prefix: &str,
    ) -> Self {
        let max = existing
            .into_iter()
            .filter_map(|no| no.sequence(prefix))
            .max()
            .unwrap_or(0);
        Self::from_sequence(prefix, max + 1)
    }

    /// Numeric suffix of this account number, if it matches the prefix.
    pub fn sequence(&self, prefix: &str) -> Option<u32> {
        self.0.strip_prefix(prefix)?.parse().ok()
    }

    /// The raw string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
