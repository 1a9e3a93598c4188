//! Approval engine
//!
//! `approve` applies the financial effect of exactly one request exactly
//! once. The status transition and every balance/transaction write land in
//! ONE guarded store commit; a failed guard retries the whole approval
//! from a fresh read, and a re-read showing a resolved request surfaces
//! `InvalidState` instead of re-applying the effect. Notifications are
//! fired only after the commit succeeded, and never fail the caller.

use std::sync::Arc;

use sanchay_core::{AccountNo, Amount};
use sanchay_ledger::{hash_password, Account, AccountRepository, Transaction, TransactionKind};
use sanchay_notify::Notifier;
use sanchay_store::{LedgerStore, Txn, Versioned};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::ApprovalError;
use crate::queue::RequestQueue;
use crate::request::{Request, RequestKind};

/// The result of a successful approval
#[derive(Debug)]
pub struct ApprovalOutcome {
    /// The request in its approved state
    pub request: Request,
    /// The account number allocated by an approved signup
    pub new_account: Option<AccountNo>,
}

/// Applies admin decisions to the ledger
pub struct ApprovalEngine {
    accounts: AccountRepository,
    queue: RequestQueue,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
}

impl ApprovalEngine {
    pub fn new(store: Arc<LedgerStore>, notifier: Arc<dyn Notifier>, config: EngineConfig) -> Self {
        let accounts = AccountRepository::new(Arc::clone(&store), config.account_prefix.clone());
        let queue = RequestQueue::new(store);
        Self {
            accounts,
            queue,
            notifier,
            config,
        }
    }

    pub fn accounts(&self) -> &AccountRepository {
        &self.accounts
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Approve a pending request, applying its effect atomically.
    ///
    /// Retries from a fresh read when a version guard fails; any other
    /// error aborts with the request still `Pending`.
    pub fn approve(&self, id: &str) -> Result<ApprovalOutcome, ApprovalError> {
        for attempt in 1..=self.config.max_commit_retries {
            let current = self.queue.get(id)?;
            if !current.value.is_pending() {
                return Err(ApprovalError::InvalidState {
                    id: id.to_string(),
                    status: current.value.status,
                });
            }

            match self.try_apply(&current) {
                Ok(outcome) => {
                    info!(request = %id, kind = outcome.request.kind.label(), "request approved");
                    return Ok(outcome);
                }
                Err(ApprovalError::Store(err)) if err.is_retryable() => {
                    warn!(request = %id, attempt, error = %err, "approval commit conflicted, retrying");
                }
                Err(other) => return Err(other),
            }
        }
        Err(ApprovalError::Conflict {
            id: id.to_string(),
            attempts: self.config.max_commit_retries,
        })
    }

    /// Reject a pending request. No balance is touched; the requester is
    /// notified with a type-specific message.
    pub fn reject(&self, id: &str, reason: Option<&str>) -> Result<Request, ApprovalError> {
        for attempt in 1..=self.config.max_commit_retries {
            let current = self.queue.get(id)?;
            if !current.value.is_pending() {
                return Err(ApprovalError::InvalidState {
                    id: id.to_string(),
                    status: current.value.status,
                });
            }

            let rejected = current.value.clone().rejected(reason.map(str::to_string));
            let txn = self.queue.stage_resolution(Txn::new(), &current, &rejected)?;
            match self.queue.commit(txn) {
                Ok(()) => {
                    info!(request = %id, "request rejected");
                    if let Some(requester) = &rejected.requester {
                        self.notifier.notify(requester, &rejection_notice(&rejected));
                    }
                    return Ok(rejected);
                }
                Err(err) if err.is_retryable() => {
                    warn!(request = %id, attempt, error = %err, "rejection commit conflicted, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ApprovalError::Conflict {
            id: id.to_string(),
            attempts: self.config.max_commit_retries,
        })
    }

    /// Credit a profit adjustment directly, bypassing the queue
    pub fn add_profit(&self, no: &AccountNo, amount: Amount) -> Result<(), ApprovalError> {
        self.adjust(no, amount, TransactionKind::Profit)?;
        self.notifier
            .notify(no, &format!("A profit of {} has been added to your account", amount));
        Ok(())
    }

    /// Debit a loss adjustment directly; requires sufficient balance
    pub fn add_loss(&self, no: &AccountNo, amount: Amount) -> Result<(), ApprovalError> {
        self.adjust(no, amount, TransactionKind::Loss)?;
        self.notifier
            .notify(no, &format!("A loss of {} has been deducted from your account", amount));
        Ok(())
    }

    /// Grant or revoke admin access
    pub fn set_admin(&self, no: &AccountNo, is_admin: bool) -> Result<(), ApprovalError> {
        for attempt in 1..=self.config.max_commit_retries {
            let mut account = self.accounts.get(no)?;
            if account.value.is_admin == is_admin {
                return Ok(());
            }
            account.value.is_admin = is_admin;
            let txn = self.accounts.stage_update(Txn::new(), &account)?;
            match self.queue.commit(txn) {
                Ok(()) => {
                    if is_admin {
                        self.notifier
                            .notify(no, "You have been granted administrator access");
                    }
                    return Ok(());
                }
                Err(err) if err.is_retryable() => {
                    warn!(account = %no, attempt, error = %err, "admin flag commit conflicted, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ApprovalError::Conflict {
            id: no.to_string(),
            attempts: self.config.max_commit_retries,
        })
    }

    /// Publish a notice visible to every account
    pub fn broadcast(&self, message: &str) {
        self.notifier.broadcast(message);
    }

    /// Build and commit the single transaction for one approval attempt,
    /// then fan out the post-commit notifications.
    fn try_apply(&self, current: &Versioned<Request>) -> Result<ApprovalOutcome, ApprovalError> {
        let approved = current.value.clone().approved();
        let txn = self.queue.stage_resolution(Txn::new(), current, &approved)?;

        match &approved.kind {
            RequestKind::NewAccount {
                name,
                display,
                email,
                phone,
                password,
            } => {
                let no = self.accounts.next_account_no()?;
                let account = Account::open(
                    no.clone(),
                    name,
                    display,
                    email,
                    phone,
                    hash_password(password),
                    self.config.signup_bonus,
                );
                let txn = self.accounts.stage_create(txn, &account)?;
                self.queue.commit(txn)?;

                self.notifier.notify(
                    &no,
                    &format!(
                        "Welcome! Your account {} is ready with a signup bonus of {}",
                        no, self.config.signup_bonus
                    ),
                );
                return Ok(ApprovalOutcome {
                    request: approved,
                    new_account: Some(no),
                });
            }
            RequestKind::Add { amount, .. } => {
                let requester = require_requester(&approved)?;
                let mut account = self.accounts.get(requester)?;
                account.value.credit(*amount)?;
                let record = Transaction::record(requester.clone(), TransactionKind::Add, *amount);
                let txn = self.accounts.stage_update(txn, &account)?;
                let txn = self.accounts.stage_transaction(txn, &record)?;
                self.queue.commit(txn)?;

                self.notifier.notify(
                    requester,
                    &format!("Your add money request of {} has been approved", amount),
                );
            }
            RequestKind::Withdraw { amount, .. } => {
                let requester = require_requester(&approved)?;
                let mut account = self.accounts.get(requester)?;
                account.value.debit(*amount)?;
                let record =
                    Transaction::record(requester.clone(), TransactionKind::Withdraw, *amount);
                let txn = self.accounts.stage_update(txn, &account)?;
                let txn = self.accounts.stage_transaction(txn, &record)?;
                self.queue.commit(txn)?;

                self.notifier.notify(
                    requester,
                    &format!("Your withdraw request of {} has been approved", amount),
                );
            }
            RequestKind::Transfer { to, amount, .. } => {
                let requester = require_requester(&approved)?;
                let txn = self.stage_two_legged(
                    txn,
                    requester,
                    to,
                    *amount,
                    TransactionKind::TransferSent,
                    TransactionKind::TransferReceived,
                )?;
                self.queue.commit(txn)?;

                self.notifier.notify(
                    requester,
                    &format!("Your transfer of {} to {} has been approved", amount, to),
                );
                self.notifier
                    .notify(to, &format!("You received a transfer of {} from {}", amount, requester));
            }
            RequestKind::Donate { amount, .. } => {
                let requester = require_requester(&approved)?;
                let beneficiary = &self.config.donation_beneficiary;
                if requester == beneficiary {
                    return Err(ApprovalError::validation(
                        "requester",
                        "the beneficiary account cannot donate to itself",
                    ));
                }
                let txn = self.stage_two_legged(
                    txn,
                    requester,
                    beneficiary,
                    *amount,
                    TransactionKind::Donate,
                    TransactionKind::DonationReceived,
                )?;
                self.queue.commit(txn)?;

                self.notifier
                    .notify(requester, &format!("Thank you! Your donation of {} has been approved", amount));
                self.notifier.notify(
                    beneficiary,
                    &format!("A donation of {} was received from {}", amount, requester),
                );
            }
            RequestKind::ProfileUpdate {
                name,
                phone,
                email,
                password,
            } => {
                let requester = require_requester(&approved)?;
                let mut account = self.accounts.get(requester)?;
                let mut changed: Vec<&str> = Vec::new();
                if let Some(name) = name {
                    account.value.name = name.clone();
                    changed.push("name");
                }
                if let Some(phone) = phone {
                    account.value.phone = phone.clone();
                    changed.push("phone");
                }
                if let Some(email) = email {
                    account.value.email = email.clone();
                    changed.push("email");
                }
                if let Some(password) = password {
                    account.value.password_hash = hash_password(password);
                    account.value.temp_password = false;
                    changed.push("password");
                }
                let txn = self.accounts.stage_update(txn, &account)?;
                self.queue.commit(txn)?;

                self.notifier.notify(
                    requester,
                    &format!("Your profile update ({}) has been approved", changed.join(", ")),
                );
            }
            RequestKind::ForgotPassword => {
                let requester = require_requester(&approved)?;
                let mut account = self.accounts.get(requester)?;
                account.value.password_hash = hash_password(&self.config.temp_password);
                account.value.temp_password = true;
                let txn = self.accounts.stage_update(txn, &account)?;
                self.queue.commit(txn)?;

                self.notifier.notify(
                    requester,
                    &format!(
                        "Your temporary password is \"{}\". Log in and change it right away",
                        self.config.temp_password
                    ),
                );
            }
        }

        Ok(ApprovalOutcome {
            request: approved,
            new_account: None,
        })
    }

    /// Stage a paired debit/credit across two accounts with correlated
    /// transaction records
    fn stage_two_legged(
        &self,
        txn: Txn,
        from: &AccountNo,
        to: &AccountNo,
        amount: Amount,
        debit_kind: TransactionKind,
        credit_kind: TransactionKind,
    ) -> Result<Txn, ApprovalError> {
        let mut sender = self.accounts.get(from)?;
        let mut recipient = self.accounts.get(to)?;
        sender.value.debit(amount)?;
        recipient.value.credit(amount)?;

        let correlation = Transaction::new_correlation_id();
        let sent =
            Transaction::record(from.clone(), debit_kind, amount).with_correlation(&correlation);
        let received =
            Transaction::record(to.clone(), credit_kind, amount).with_correlation(&correlation);

        let txn = self.accounts.stage_update(txn, &sender)?;
        let txn = self.accounts.stage_update(txn, &recipient)?;
        let txn = self.accounts.stage_transaction(txn, &sent)?;
        let txn = self.accounts.stage_transaction(txn, &received)?;
        Ok(txn)
    }

    /// Single-account adjustment: balance change + transaction in one commit
    fn adjust(
        &self,
        no: &AccountNo,
        amount: Amount,
        kind: TransactionKind,
    ) -> Result<(), ApprovalError> {
        if amount.is_zero() {
            return Err(ApprovalError::validation(
                "amount",
                "amount must be greater than zero",
            ));
        }
        for attempt in 1..=self.config.max_commit_retries {
            let mut account = self.accounts.get(no)?;
            if kind.is_credit() {
                account.value.credit(amount)?;
            } else {
                account.value.debit(amount)?;
            }
            let record = Transaction::record(no.clone(), kind, amount);
            let txn = self.accounts.stage_update(Txn::new(), &account)?;
            let txn = self.accounts.stage_transaction(txn, &record)?;
            match self.queue.commit(txn) {
                Ok(()) => {
                    info!(account = %no, kind = %kind, %amount, "adjustment applied");
                    return Ok(());
                }
                Err(err) if err.is_retryable() => {
                    warn!(account = %no, attempt, error = %err, "adjustment commit conflicted, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ApprovalError::Conflict {
            id: no.to_string(),
            attempts: self.config.max_commit_retries,
        })
    }
}

fn require_requester(request: &Request) -> Result<&AccountNo, ApprovalError> {
    request
        .requester
        .as_ref()
        .ok_or_else(|| ApprovalError::validation("requester", "this request requires an account"))
}

/// Requester-facing notice for a rejected request
fn rejection_notice(request: &Request) -> String {
    let base = match &request.kind {
        RequestKind::NewAccount { .. } => "Your account application was rejected".to_string(),
        RequestKind::Add { amount, .. } => {
            format!("Your add money request of {} was rejected", amount)
        }
        RequestKind::Withdraw { amount, .. } => {
            format!("Your withdraw request of {} was rejected", amount)
        }
        RequestKind::Transfer { to, amount, .. } => {
            format!("Your transfer of {} to {} was rejected", amount, to)
        }
        RequestKind::Donate { amount, .. } => {
            format!("Your donation of {} was rejected", amount)
        }
        RequestKind::ProfileUpdate { .. } => "Your profile update was rejected".to_string(),
        RequestKind::ForgotPassword => "Your password reset request was rejected".to_string(),
    };
    match &request.rejection_reason {
        Some(reason) => format!("{}: {}", base, reason),
        None => base,
    }
}
