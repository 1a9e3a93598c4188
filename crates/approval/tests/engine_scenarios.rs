//! End-to-end approval scenarios against an in-memory store

use std::sync::Arc;
use std::thread;

use rust_decimal_macros::dec;
use sanchay_approval::{ApprovalEngine, ApprovalError, EngineConfig, RequestKind, RequestStatus};
use sanchay_core::{AccountNo, Amount, TransferCode, DEFAULT_PREFIX};
use sanchay_ledger::{hash_password, Account, LedgerError, TransactionKind};
use sanchay_notify::{NotificationLog, StoreNotifier};
use sanchay_store::LedgerStore;

fn no(s: &str) -> AccountNo {
    AccountNo::parse(s, DEFAULT_PREFIX).unwrap()
}

fn amount(d: rust_decimal::Decimal) -> Amount {
    Amount::new(d).unwrap()
}

fn engine() -> (Arc<LedgerStore>, ApprovalEngine) {
    let store = Arc::new(LedgerStore::in_memory().unwrap());
    let notifier = Arc::new(StoreNotifier::new(Arc::clone(&store)));
    let engine = ApprovalEngine::new(Arc::clone(&store), notifier, EngineConfig::default());
    (store, engine)
}

fn seed(engine: &ApprovalEngine, no_str: &str, balance: Amount, is_admin: bool) {
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
    engine.accounts().insert(&account).unwrap();
}

fn submit(engine: &ApprovalEngine, requester: Option<&str>, kind: RequestKind) -> String {
    let store_notifier = sanchay_notify::NullNotifier;
    engine
        .queue()
        .submit(requester.map(no), kind, engine.accounts(), &store_notifier)
        .unwrap()
        .id
}

fn withdraw(amt: Amount) -> RequestKind {
    RequestKind::Withdraw {
        amount: amt,
        method: "bkash".to_string(),
        note: None,
    }
}

fn transfer(to: &str, amt: Amount) -> RequestKind {
    RequestKind::Transfer {
        to: no(to),
        amount: amt,
        code: TransferCode::parse("1234").unwrap(),
    }
}

#[test]
fn test_withdraw_debits_and_records() {
    let (_store, engine) = engine();
    seed(&engine, "SNCY0002", amount(dec!(500)), false);

    let id = submit(&engine, Some("SNCY0002"), withdraw(amount(dec!(200))));
    let outcome = engine.approve(&id).unwrap();
    assert_eq!(outcome.request.status, RequestStatus::Approved);

    let account = engine.accounts().get(&no("SNCY0002")).unwrap();
    assert_eq!(account.value.balance.value(), dec!(300));

    let txns = engine.accounts().transactions(&no("SNCY0002")).unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].kind, TransactionKind::Withdraw);
    assert_eq!(txns[0].amount, dec!(-200));
}

#[test]
fn test_transfer_moves_money_between_accounts() {
    let (store, engine) = engine();
    seed(&engine, "SNCY0002", amount(dec!(500)), false);
    seed(&engine, "SNCY0003", amount(dec!(100)), false);

    let id = submit(
        &engine,
        Some("SNCY0002"),
        transfer("SNCY0003", amount(dec!(150))),
    );
    engine.approve(&id).unwrap();

    let sender = engine.accounts().get(&no("SNCY0002")).unwrap();
    let recipient = engine.accounts().get(&no("SNCY0003")).unwrap();
    assert_eq!(sender.value.balance.value(), dec!(350));
    assert_eq!(recipient.value.balance.value(), dec!(250));

    // Paired legs share a correlation id and cancel out.
    let sent = engine.accounts().transactions(&no("SNCY0002")).unwrap();
    let received = engine.accounts().transactions(&no("SNCY0003")).unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(received.len(), 1);
    assert_eq!(sent[0].kind, TransactionKind::TransferSent);
    assert_eq!(received[0].kind, TransactionKind::TransferReceived);
    assert!(sent[0].correlation_id.is_some());
    assert_eq!(sent[0].correlation_id, received[0].correlation_id);
    assert_eq!(sent[0].amount + received[0].amount, dec!(0));

    // Both parties are told.
    let log = NotificationLog::new(store);
    assert_eq!(log.list_for(&no("SNCY0002")).unwrap().len(), 1);
    assert_eq!(log.list_for(&no("SNCY0003")).unwrap().len(), 1);
}

#[test]
fn test_insufficient_funds_leaves_everything_untouched() {
    let (_store, engine) = engine();
    seed(&engine, "SNCY0002", amount(dec!(100)), false);

    let id = submit(&engine, Some("SNCY0002"), withdraw(amount(dec!(500))));
    let result = engine.approve(&id);
    assert!(matches!(
        result,
        Err(ApprovalError::Ledger(LedgerError::InsufficientFunds { .. }))
    ));

    // Balance unchanged, no transaction, request still pending.
    let account = engine.accounts().get(&no("SNCY0002")).unwrap();
    assert_eq!(account.value.balance.value(), dec!(100));
    assert!(engine.accounts().transactions(&no("SNCY0002")).unwrap().is_empty());
    let request = engine.queue().get(&id).unwrap();
    assert_eq!(request.value.status, RequestStatus::Pending);
}

#[test]
fn test_rejection_mutates_nothing() {
    let (store, engine) = engine();
    seed(&engine, "SNCY0002", amount(dec!(500)), false);

    let id = submit(&engine, Some("SNCY0002"), withdraw(amount(dec!(200))));
    let rejected = engine.reject(&id, Some("could not verify the payment")).unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);

    let account = engine.accounts().get(&no("SNCY0002")).unwrap();
    assert_eq!(account.value.balance.value(), dec!(500));
    assert!(engine.accounts().transactions(&no("SNCY0002")).unwrap().is_empty());

    // The requester still hears about it.
    let log = NotificationLog::new(store);
    let inbox = log.list_for(&no("SNCY0002")).unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(inbox[0].message.contains("rejected"));
    assert!(inbox[0].message.contains("could not verify the payment"));
}

#[test]
fn test_double_approval_is_idempotent() {
    let (_store, engine) = engine();
    seed(&engine, "SNCY0002", amount(dec!(500)), false);

    let id = submit(&engine, Some("SNCY0002"), withdraw(amount(dec!(200))));
    engine.approve(&id).unwrap();

    let second = engine.approve(&id);
    assert!(matches!(
        second,
        Err(ApprovalError::InvalidState {
            status: RequestStatus::Approved,
            ..
        })
    ));

    // The effect applied exactly once.
    let account = engine.accounts().get(&no("SNCY0002")).unwrap();
    assert_eq!(account.value.balance.value(), dec!(300));
    assert_eq!(engine.accounts().transactions(&no("SNCY0002")).unwrap().len(), 1);
}

#[test]
fn test_concurrent_approvals_have_one_winner() {
    let (_store, engine) = engine();
    seed(&engine, "SNCY0002", amount(dec!(500)), false);
    let id = submit(&engine, Some("SNCY0002"), withdraw(amount(dec!(200))));

    let engine = Arc::new(engine);
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let id = id.clone();
            thread::spawn(move || engine.approve(&id).is_ok())
        })
        .collect();
    let wins: usize = handles
        .into_iter()
        .map(|h| h.join().unwrap() as usize)
        .sum();

    assert_eq!(wins, 1);
    let account = engine.accounts().get(&no("SNCY0002")).unwrap();
    assert_eq!(account.value.balance.value(), dec!(300));
    assert_eq!(engine.accounts().transactions(&no("SNCY0002")).unwrap().len(), 1);
}

#[test]
fn test_new_account_allocates_number_and_bonus() {
    let (store, engine) = engine();
    seed(&engine, "SNCY0001", Amount::ZERO, true);

    let id = submit(
        &engine,
        None,
        RequestKind::NewAccount {
            name: "Alice Rahman".to_string(),
            display: "alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "01712345678".to_string(),
            password: "secret-pass".to_string(),
        },
    );
    let outcome = engine.approve(&id).unwrap();
    let new_no = outcome.new_account.unwrap();
    assert_eq!(new_no.as_str(), "SNCY0002");

    let account = engine.accounts().get(&new_no).unwrap();
    assert_eq!(account.value.balance.value(), dec!(100)); // signup bonus
    assert!(account.value.verify_password("secret-pass"));
    assert!(!account.value.is_admin);

    let log = NotificationLog::new(store);
    let inbox = log.list_for(&new_no).unwrap();
    assert!(inbox.iter().any(|n| n.message.contains("SNCY0002")));
}

#[test]
fn test_donation_goes_to_beneficiary() {
    let (_store, engine) = engine();
    seed(&engine, "SNCY0001", Amount::ZERO, true); // beneficiary
    seed(&engine, "SNCY0002", amount(dec!(300)), false);

    let id = submit(
        &engine,
        Some("SNCY0002"),
        RequestKind::Donate {
            amount: amount(dec!(50)),
            note: Some("for the fund".to_string()),
        },
    );
    engine.approve(&id).unwrap();

    let donor = engine.accounts().get(&no("SNCY0002")).unwrap();
    let beneficiary = engine.accounts().get(&no("SNCY0001")).unwrap();
    assert_eq!(donor.value.balance.value(), dec!(250));
    assert_eq!(beneficiary.value.balance.value(), dec!(50));

    let legs = engine.accounts().transactions(&no("SNCY0001")).unwrap();
    assert_eq!(legs[0].kind, TransactionKind::DonationReceived);
}

#[test]
fn test_forgot_password_issues_temp_password() {
    let (_store, engine) = engine();
    seed(&engine, "SNCY0002", amount(dec!(100)), false);

    let id = submit(&engine, Some("SNCY0002"), RequestKind::ForgotPassword);
    engine.approve(&id).unwrap();

    let account = engine.accounts().get(&no("SNCY0002")).unwrap();
    assert!(account.value.temp_password);
    assert!(account.value.verify_password("123"));
}

#[test]
fn test_password_change_clears_temp_flag() {
    let (_store, engine) = engine();
    seed(&engine, "SNCY0002", amount(dec!(100)), false);

    let id = submit(&engine, Some("SNCY0002"), RequestKind::ForgotPassword);
    engine.approve(&id).unwrap();

    let id = submit(
        &engine,
        Some("SNCY0002"),
        RequestKind::ProfileUpdate {
            name: None,
            phone: None,
            email: None,
            password: Some("fresh-password".to_string()),
        },
    );
    engine.approve(&id).unwrap();

    let account = engine.accounts().get(&no("SNCY0002")).unwrap();
    assert!(!account.value.temp_password);
    assert!(account.value.verify_password("fresh-password"));
}

#[test]
fn test_profit_and_loss_adjustments() {
    let (_store, engine) = engine();
    seed(&engine, "SNCY0002", amount(dec!(100)), false);

    engine.add_profit(&no("SNCY0002"), amount(dec!(40))).unwrap();
    engine.add_loss(&no("SNCY0002"), amount(dec!(15))).unwrap();

    let account = engine.accounts().get(&no("SNCY0002")).unwrap();
    assert_eq!(account.value.balance.value(), dec!(125));

    let txns = engine.accounts().transactions(&no("SNCY0002")).unwrap();
    assert_eq!(txns.len(), 2);

    // Loss bigger than the balance is refused.
    let result = engine.add_loss(&no("SNCY0002"), amount(dec!(1000)));
    assert!(matches!(
        result,
        Err(ApprovalError::Ledger(LedgerError::InsufficientFunds { .. }))
    ));
}

#[test]
fn test_set_admin_grants_and_notifies() {
    let (store, engine) = engine();
    seed(&engine, "SNCY0002", amount(dec!(100)), false);

    engine.set_admin(&no("SNCY0002"), true).unwrap();
    assert_eq!(engine.accounts().admins().unwrap(), vec![no("SNCY0002")]);

    let log = NotificationLog::new(store);
    let inbox = log.list_for(&no("SNCY0002")).unwrap();
    assert!(inbox.iter().any(|n| n.message.contains("administrator")));
}
