//! Account repository
//!
//! Reads are plain store lookups. Writes are STAGED: the repository appends
//! guarded ops to a `Txn` and the caller commits everything at once, so a
//! balance never changes without its transaction record and a stale read
//! never overwrites a concurrent update.

use std::sync::Arc;

use sanchay_core::AccountNo;
use sanchay_store::{LedgerStore, Txn, Versioned};

use crate::account::{account_path, Account};
use crate::error::LedgerError;
use crate::transaction::Transaction;

/// Repository over the `accounts/` subtree of the store
pub struct AccountRepository {
    store: Arc<LedgerStore>,
    prefix: String,
}

impl AccountRepository {
    /// Create a repository allocating ids with the given account prefix
    pub fn new(store: Arc<LedgerStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// The configured account number prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fetch an account if it exists
    pub fn find(&self, no: &AccountNo) -> Result<Option<Versioned<Account>>, LedgerError> {
        Ok(self.store.get(&account_path(no))?)
    }

    /// Fetch an account, failing with `AccountNotFound` if absent
    pub fn get(&self, no: &AccountNo) -> Result<Versioned<Account>, LedgerError> {
        self.find(no)?
            .ok_or_else(|| LedgerError::AccountNotFound(no.clone()))
    }

    /// All accounts, ordered by account number
    pub fn list(&self) -> Result<Vec<Account>, LedgerError> {
        let rows: Vec<(String, Versioned<Account>)> = self.store.list("accounts")?;
        Ok(rows.into_iter().map(|(_, doc)| doc.value).collect())
    }

    /// Account numbers of all admin accounts
    pub fn admins(&self) -> Result<Vec<AccountNo>, LedgerError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|a| a.is_admin)
            .map(|a| a.account_no)
            .collect())
    }

    /// Next sequential account number after all existing ones.
    ///
    /// Deterministic under a single writer; racing creators are serialized
    /// by the `guard_absent` that `stage_create` attaches.
    pub fn next_account_no(&self) -> Result<AccountNo, LedgerError> {
        let existing: Vec<AccountNo> = self
            .list()?
            .into_iter()
            .map(|a| a.account_no)
            .collect();
        Ok(AccountNo::next_in_sequence(&existing, &self.prefix))
    }

    /// Transactions recorded against an account, oldest first
    pub fn transactions(&self, no: &AccountNo) -> Result<Vec<Transaction>, LedgerError> {
        let prefix = format!("{}/transactions", account_path(no));
        let rows: Vec<(String, Versioned<Transaction>)> = self.store.list(&prefix)?;
        let mut txns: Vec<Transaction> = rows.into_iter().map(|(_, doc)| doc.value).collect();
        txns.sort_by_key(|t| t.timestamp);
        Ok(txns)
    }

    /// Stage the creation of a new account (guarded against an id collision)
    pub fn stage_create(&self, txn: Txn, account: &Account) -> Result<Txn, LedgerError> {
        let path = account.path();
        let value = serde_json::to_value(account)?;
        Ok(txn.put(path.clone(), value).guard_absent(path))
    }

    /// Stage an update of an existing account, guarded by the version it
    /// was read at
    pub fn stage_update(
        &self,
        txn: Txn,
        account: &Versioned<Account>,
    ) -> Result<Txn, LedgerError> {
        let path = account.value.path();
        let value = serde_json::to_value(&account.value)?;
        Ok(txn.put(path.clone(), value).guard(path, account.version))
    }

    /// Stage an immutable transaction record
    pub fn stage_transaction(&self, txn: Txn, record: &Transaction) -> Result<Txn, LedgerError> {
        let path = record.path();
        let value = serde_json::to_value(record)?;
        Ok(txn.put(path.clone(), value).guard_absent(path))
    }

    /// Create an account immediately (outside any larger commit).
    ///
    /// Only used for seeding; the approval path always goes through
    /// `stage_create`.
    pub fn insert(&self, account: &Account) -> Result<(), LedgerError> {
        let txn = self.stage_create(Txn::new(), account)?;
        Ok(self.store.commit(txn)?)
    }
}
