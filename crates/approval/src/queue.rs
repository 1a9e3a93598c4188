//! Request queue
//!
//! Submissions are validated, persisted under `requests/`, and announced
//! to every admin account. Resolution never happens here directly: the
//! queue only STAGES the guarded status transition, and the engine commits
//! it together with the balance writes it implies.

use std::sync::Arc;

use sanchay_core::AccountNo;
use sanchay_ledger::AccountRepository;
use sanchay_notify::Notifier;
use sanchay_store::{LedgerStore, StoreError, Subscription, Txn, Versioned};

use crate::error::ApprovalError;
use crate::request::{request_path, Request, RequestKind};

/// The `requests/` subtree: submission, listing, and staged resolution
pub struct RequestQueue {
    store: Arc<LedgerStore>,
}

impl RequestQueue {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Validate and enqueue a request, announcing it to all admins.
    ///
    /// The announcement is best-effort; the request is in the queue either
    /// way. The requester is skipped if they are an admin themselves.
    pub fn submit(
        &self,
        requester: Option<AccountNo>,
        kind: RequestKind,
        accounts: &AccountRepository,
        notifier: &dyn Notifier,
    ) -> Result<Request, ApprovalError> {
        let request = Request::new(requester, kind);
        crate::validate::validate(&request, accounts)?;

        let path = request.path();
        let txn = Txn::new()
            .put(path.clone(), serde_json::to_value(&request)?)
            .guard_absent(path);
        self.store.commit(txn)?;

        let message = submission_notice(&request);
        let admins: Vec<AccountNo> = accounts
            .admins()?
            .into_iter()
            .filter(|no| Some(no) != request.requester.as_ref())
            .collect();
        notifier.notify_each(&admins, &message);

        Ok(request)
    }

    /// Fetch a request with its version, failing with `NotFound` if absent
    pub fn get(&self, id: &str) -> Result<Versioned<Request>, ApprovalError> {
        self.store
            .get(&request_path(id))?
            .ok_or_else(|| ApprovalError::NotFound(id.to_string()))
    }

    /// Pending requests, oldest first
    pub fn list_pending(&self) -> Result<Vec<Request>, ApprovalError> {
        let rows: Vec<(String, Versioned<Request>)> = self.store.list("requests")?;
        let mut pending: Vec<Request> = rows
            .into_iter()
            .map(|(_, doc)| doc.value)
            .filter(Request::is_pending)
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    /// All requests submitted by one account, newest first
    pub fn list_for(&self, requester: &AccountNo) -> Result<Vec<Request>, ApprovalError> {
        let rows: Vec<(String, Versioned<Request>)> = self.store.list("requests")?;
        let mut mine: Vec<Request> = rows
            .into_iter()
            .map(|(_, doc)| doc.value)
            .filter(|r| r.requester.as_ref() == Some(requester))
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    /// Stage the terminal status transition of `current` into `resolved`,
    /// guarded by the version the request was read at.
    ///
    /// The commit carrying this op fails with `StoreError::Conflict` if
    /// anyone resolved the request first; that guard is what makes approval
    /// apply at most once.
    pub fn stage_resolution(
        &self,
        txn: Txn,
        current: &Versioned<Request>,
        resolved: &Request,
    ) -> Result<Txn, ApprovalError> {
        let path = resolved.path();
        let value = serde_json::to_value(resolved)?;
        Ok(txn.put(path.clone(), value).guard(path, current.version))
    }

    /// Watch the pending set; the callback receives the current pending
    /// requests (oldest first) after every change under `requests/`.
    /// Dropping the returned guard stops delivery.
    pub fn watch<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Vec<Request>) + Send + Sync + 'static,
    {
        self.store.subscribe("requests", move |snapshot| {
            let mut pending: Vec<Request> = snapshot
                .as_object()
                .map(|docs| {
                    docs.values()
                        .filter_map(|value| serde_json::from_value(value.clone()).ok())
                        .filter(Request::is_pending)
                        .collect()
                })
                .unwrap_or_default();
            pending.sort_by_key(|r| r.created_at);
            callback(pending);
        })
    }

    pub(crate) fn commit(&self, txn: Txn) -> Result<(), StoreError> {
        self.store.commit(txn)
    }
}

/// Admin-facing notice emitted when a request enters the queue
fn submission_notice(request: &Request) -> String {
    let who = request
        .requester
        .as_ref()
        .map(|no| no.to_string())
        .unwrap_or_else(|| "a new user".to_string());
    match request.kind.amount() {
        Some(amount) => format!(
            "New {} request of {} from {}",
            request.kind.label(),
            amount,
            who
        ),
        None => format!("New {} request from {}", request.kind.label(), who),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sanchay_core::{Amount, DEFAULT_PREFIX};
    use sanchay_ledger::{hash_password, Account};
    use sanchay_notify::{NotificationLog, NullNotifier, StoreNotifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn no(s: &str) -> AccountNo {
        AccountNo::parse(s, DEFAULT_PREFIX).unwrap()
    }

    fn fixture() -> (Arc<LedgerStore>, RequestQueue, AccountRepository) {
        let store = Arc::new(LedgerStore::in_memory().unwrap());
        let queue = RequestQueue::new(Arc::clone(&store));
        let accounts = AccountRepository::new(Arc::clone(&store), DEFAULT_PREFIX);
        (store, queue, accounts)
    }

    fn member(no_str: &str, balance: Amount, is_admin: bool) -> Account {
        let mut account = Account::open(
            no(no_str),
            format!("User {}", no_str),
            format!("user-{}", no_str.to_lowercase()),
            format!("{}@example.com", no_str.to_lowercase()),
            format!("017123456{}", &no_str[no_str.len() - 2..]),
            hash_password("secret-pass"),
            balance,
        );
        account.is_admin = is_admin;
        account
    }

    fn withdraw(amount: Amount) -> RequestKind {
        RequestKind::Withdraw {
            amount,
            method: "bkash".to_string(),
            note: None,
        }
    }

    #[test]
    fn test_submit_persists_and_lists() {
        let (_store, queue, accounts) = fixture();
        accounts.insert(&member("SNCY0002", Amount::new(dec!(500)).unwrap(), false)).unwrap();

        let request = queue
            .submit(
                Some(no("SNCY0002")),
                withdraw(Amount::new(dec!(200)).unwrap()),
                &accounts,
                &NullNotifier,
            )
            .unwrap();

        let pending = queue.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, request.id);
    }

    #[test]
    fn test_submit_notifies_admins_but_not_requester() {
        let (store, queue, accounts) = fixture();
        accounts.insert(&member("SNCY0001", Amount::ZERO, true)).unwrap();
        accounts.insert(&member("SNCY0002", Amount::new(dec!(500)).unwrap(), false)).unwrap();

        let notifier = StoreNotifier::new(Arc::clone(&store));
        queue
            .submit(
                Some(no("SNCY0002")),
                withdraw(Amount::new(dec!(200)).unwrap()),
                &accounts,
                &notifier,
            )
            .unwrap();

        let log = NotificationLog::new(store);
        let admin_inbox = log.list_for(&no("SNCY0001")).unwrap();
        assert_eq!(admin_inbox.len(), 1);
        assert!(admin_inbox[0].message.contains("withdraw"));
        assert!(log.list_for(&no("SNCY0002")).unwrap().is_empty());
    }

    #[test]
    fn test_submit_rejects_invalid_payload() {
        let (_store, queue, accounts) = fixture();
        let result = queue.submit(
            Some(no("SNCY0002")),
            withdraw(Amount::ZERO),
            &accounts,
            &NullNotifier,
        );
        assert!(matches!(result, Err(ApprovalError::Validation { .. })));
        assert!(queue.list_pending().unwrap().is_empty());
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let (_store, queue, _accounts) = fixture();
        assert!(matches!(
            queue.get("REQ-MISSING"),
            Err(ApprovalError::NotFound(_))
        ));
    }

    #[test]
    fn test_stale_resolution_conflicts() {
        let (_store, queue, accounts) = fixture();
        accounts.insert(&member("SNCY0002", Amount::new(dec!(500)).unwrap(), false)).unwrap();
        let request = queue
            .submit(
                Some(no("SNCY0002")),
                withdraw(Amount::new(dec!(100)).unwrap()),
                &accounts,
                &NullNotifier,
            )
            .unwrap();

        let first = queue.get(&request.id).unwrap();
        let second = queue.get(&request.id).unwrap();

        let txn = queue
            .stage_resolution(Txn::new(), &first, &first.value.clone().approved())
            .unwrap();
        queue.commit(txn).unwrap();

        let txn = queue
            .stage_resolution(Txn::new(), &second, &second.value.clone().rejected(None))
            .unwrap();
        assert!(matches!(queue.commit(txn), Err(StoreError::Conflict { .. })));
    }

    #[test]
    fn test_watch_delivers_pending_set() {
        let (_store, queue, accounts) = fixture();
        accounts.insert(&member("SNCY0002", Amount::new(dec!(500)).unwrap(), false)).unwrap();

        static SEEN: AtomicUsize = AtomicUsize::new(0);
        let _guard = queue.watch(|pending| {
            SEEN.store(pending.len(), Ordering::SeqCst);
        });

        queue
            .submit(
                Some(no("SNCY0002")),
                withdraw(Amount::new(dec!(100)).unwrap()),
                &accounts,
                &NullNotifier,
            )
            .unwrap();

        assert_eq!(SEEN.load(Ordering::SeqCst), 1);
    }
}
