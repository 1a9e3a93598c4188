//! Sanchay Ledger - accounts and immutable transaction records
//!
//! Owns the `accounts/` subtree of the store: account records (profile,
//! credential hash, balance) and their append-only transaction history.
//! Balance mutations are staged as guarded store ops so the approval
//! engine can commit them atomically with the request transition.

pub mod account;
pub mod error;
pub mod repository;
pub mod transaction;

pub use account::{account_path, hash_password, Account};
pub use error::LedgerError;
pub use repository::AccountRepository;
pub use transaction::{Transaction, TransactionKind};
