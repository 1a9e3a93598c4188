//! Sanchay Core - Domain primitives
//!
//! This crate contains the fundamental types used across Sanchay:
//! - `Amount`: Non-negative decimal wrapper for balances and request amounts
//! - `AccountNo`: Sequential `PREFIX####` account identifier
//! - `TransferCode`: 4-digit transfer verification code

pub mod account_no;
pub mod amount;
pub mod transfer_code;

pub use account_no::{AccountNo, AccountNoError, DEFAULT_PREFIX};
pub use amount::{Amount, AmountError};
pub use transfer_code::{TransferCode, TransferCodeError};
