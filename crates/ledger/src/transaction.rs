//! Immutable transaction records
//!
//! Every approved balance mutation appends exactly one transaction per
//! touched account. Records are append-only: they are written once inside
//! the same commit as the balance change and never updated afterwards.
//! The two legs of a transfer or donation share a correlation id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sanchay_core::{AccountNo, Amount};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Category of a balance change
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionKind {
    Add,
    Withdraw,
    TransferSent,
    TransferReceived,
    Donate,
    DonationReceived,
    Profit,
    Loss,
}

impl TransactionKind {
    /// Whether this kind increases the owning account's balance
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            TransactionKind::Add
                | TransactionKind::TransferReceived
                | TransactionKind::DonationReceived
                | TransactionKind::Profit
        )
    }
}

/// An immutable record of one balance change on one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier (TXN-XXXXXXXX)
    pub id: String,

    /// The account whose balance changed
    pub account_no: AccountNo,

    /// Signed amount: positive for credits, negative for debits
    pub amount: Decimal,

    pub kind: TransactionKind,

    /// Shared by the paired legs of transfers and donations
    pub correlation_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Record a balance change; the sign is derived from the kind.
    pub fn record(account_no: AccountNo, kind: TransactionKind, amount: Amount) -> Self {
        let signed = if kind.is_credit() {
            amount.value()
        } else {
            -amount.value()
        };
        Self {
            id: format!("TXN-{}", short_id()),
            account_no,
            amount: signed,
            kind,
            correlation_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a correlation id linking this record to its paired leg
    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Generate a fresh correlation id for a two-legged operation
    pub fn new_correlation_id() -> String {
        format!("COR-{}", short_id())
    }

    /// Storage path of this record, nested under its account
    pub fn path(&self) -> String {
        format!("accounts/{}/transactions/{}", self.account_no, self.id)
    }
}

fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sanchay_core::DEFAULT_PREFIX;

    fn no(s: &str) -> AccountNo {
        AccountNo::parse(s, DEFAULT_PREFIX).unwrap()
    }

    #[test]
    fn test_credit_kinds_positive_debit_kinds_negative() {
        let amount = Amount::new(dec!(200)).unwrap();

        let add = Transaction::record(no("SNCY0001"), TransactionKind::Add, amount);
        assert_eq!(add.amount, dec!(200));

        let withdraw = Transaction::record(no("SNCY0001"), TransactionKind::Withdraw, amount);
        assert_eq!(withdraw.amount, dec!(-200));

        let sent = Transaction::record(no("SNCY0001"), TransactionKind::TransferSent, amount);
        assert_eq!(sent.amount, dec!(-200));

        let received =
            Transaction::record(no("SNCY0002"), TransactionKind::TransferReceived, amount);
        assert_eq!(received.amount, dec!(200));
    }

    #[test]
    fn test_correlation_pairs_legs() {
        let amount = Amount::new(dec!(150)).unwrap();
        let correlation = Transaction::new_correlation_id();

        let sent = Transaction::record(no("SNCY0001"), TransactionKind::TransferSent, amount)
            .with_correlation(&correlation);
        let received =
            Transaction::record(no("SNCY0002"), TransactionKind::TransferReceived, amount)
                .with_correlation(&correlation);

        assert_eq!(sent.correlation_id, received.correlation_id);
        assert_eq!(sent.amount, -received.amount);
    }

    #[test]
    fn test_path_nests_under_account() {
        let txn = Transaction::record(
            no("SNCY0003"),
            TransactionKind::Profit,
            Amount::new(dec!(10)).unwrap(),
        );
        assert!(txn.path().starts_with("accounts/SNCY0003/transactions/TXN-"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionKind::DonationReceived).unwrap();
        assert_eq!(json, "\"donation_received\"");
        assert_eq!(TransactionKind::TransferSent.to_string(), "transfer_sent");
    }
}
