//! Account records
//!
//! An account holds the user's profile, credential hash, and balance.
//! Balances are mutated only through `credit`/`debit`, and those mutations
//! are only ever persisted inside an atomic store commit together with the
//! transaction record that explains them.

use chrono::{DateTime, Utc};
use sanchay_core::{AccountNo, Amount};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LedgerError;

/// A balance-holding account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Sequential account number (e.g. SNCY0001)
    pub account_no: AccountNo,

    /// Full legal name
    pub name: String,

    /// Display name shown to other users
    pub display: String,

    pub email: String,
    pub phone: String,

    /// SHA-256 hex digest of the password
    pub password_hash: String,

    /// Set when an admin issued a temporary password; cleared on the next
    /// approved password change
    pub temp_password: bool,

    /// Admin accounts may approve requests and receive submission notices
    pub is_admin: bool,

    /// Current balance, never negative
    pub balance: Amount,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account with the given profile and opening balance.
    pub fn open(
        account_no: AccountNo,
        name: impl Into<String>,
        display: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        password_hash: impl Into<String>,
        opening_balance: Amount,
    ) -> Self {
        Self {
            account_no,
            name: name.into(),
            display: display.into(),
            email: email.into(),
            phone: phone.into(),
            password_hash: password_hash.into(),
            temp_password: false,
            is_admin: false,
            balance: opening_balance,
            created_at: Utc::now(),
        }
    }

    /// Add funds to the balance. The amount must be positive.
    pub fn credit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::NonPositiveAmount);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::NonPositiveAmount)?;
        Ok(())
    }

    /// Remove funds from the balance.
    ///
    /// The amount must be positive and covered by the current balance;
    /// otherwise the balance is left untouched and `InsufficientFunds`
    /// is returned.
    pub fn debit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::NonPositiveAmount);
        }
        match self.balance.checked_sub(amount) {
            Some(remaining) => {
                self.balance = remaining;
                Ok(())
            }
            None => Err(LedgerError::InsufficientFunds {
                account: self.account_no.clone(),
                balance: self.balance.value(),
                requested: amount.value(),
            }),
        }
    }

    /// Check a raw password against the stored hash
    pub fn verify_password(&self, raw: &str) -> bool {
        self.password_hash == hash_password(raw)
    }

    /// Storage path of this account's document
    pub fn path(&self) -> String {
        account_path(&self.account_no)
    }
}

/// Storage path for an account document
pub fn account_path(no: &AccountNo) -> String {
    format!("accounts/{}", no)
}

/// SHA-256 hex digest used for stored credentials
pub fn hash_password(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sanchay_core::DEFAULT_PREFIX;

    fn account(balance: Amount) -> Account {
        Account::open(
            AccountNo::parse("SNCY0001", DEFAULT_PREFIX).unwrap(),
            "Alice Rahman",
            "alice",
            "alice@example.com",
            "01712345678",
            hash_password("secret-pass"),
            balance,
        )
    }

    #[test]
    fn test_credit_adds_to_balance() {
        let mut acct = account(Amount::new(dec!(100)).unwrap());
        acct.credit(Amount::new(dec!(50)).unwrap()).unwrap();
        assert_eq!(acct.balance.value(), dec!(150));
    }

    #[test]
    fn test_debit_requires_cover() {
        let mut acct = account(Amount::new(dec!(100)).unwrap());
        let result = acct.debit(Amount::new(dec!(150)).unwrap());
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(acct.balance.value(), dec!(100)); // untouched
    }

    #[test]
    fn test_debit_success() {
        let mut acct = account(Amount::new(dec!(500)).unwrap());
        acct.debit(Amount::new(dec!(200)).unwrap()).unwrap();
        assert_eq!(acct.balance.value(), dec!(300));
    }

    #[test]
    fn test_zero_mutations_rejected() {
        let mut acct = account(Amount::ZERO);
        assert!(matches!(acct.credit(Amount::ZERO), Err(LedgerError::NonPositiveAmount)));
        assert!(matches!(acct.debit(Amount::ZERO), Err(LedgerError::NonPositiveAmount)));
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let acct = account(Amount::ZERO);
        assert!(acct.verify_password("secret-pass"));
        assert!(!acct.verify_password("wrong"));
        assert_eq!(acct.password_hash.len(), 64); // SHA-256 hex
    }

    #[test]
    fn test_account_path() {
        let acct = account(Amount::ZERO);
        assert_eq!(acct.path(), "accounts/SNCY0001");
    }
}
