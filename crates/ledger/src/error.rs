//! Ledger errors

use rust_decimal::Decimal;
use sanchay_core::AccountNo;
use sanchay_store::StoreError;
use thiserror::Error;

/// Errors that can occur in account and transaction operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountNo),

    #[error("insufficient funds in {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountNo,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("balance mutation amount must be positive")]
    NonPositiveAmount,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Store(StoreError::Serialization(err))
    }
}
