//! Request payload validation
//!
//! Runs once at submission. Approval-time preconditions (balance cover,
//! recipient existence) are re-checked by the engine inside the commit;
//! everything checked here is about the shape of the payload itself.

use sanchay_core::Amount;
use sanchay_ledger::AccountRepository;

use crate::error::ApprovalError;
use crate::request::{Request, RequestKind};

const MIN_PASSWORD_LEN: usize = 8;

/// Validate a request payload before it enters the queue
pub fn validate(request: &Request, accounts: &AccountRepository) -> Result<(), ApprovalError> {
    match &request.kind {
        RequestKind::NewAccount {
            name,
            display,
            email,
            phone,
            password,
        } => {
            require_non_empty("name", name)?;
            require_non_empty("display", display)?;
            require_email(email)?;
            require_phone(phone)?;
            require_password(password)?;
            require_unique_profile(accounts, display, email, phone)?;
        }
        RequestKind::Add {
            amount,
            method,
            phone_number,
        } => {
            require_requester(request)?;
            require_positive(*amount)?;
            require_non_empty("method", method)?;
            require_phone(phone_number)?;
        }
        RequestKind::Withdraw { amount, method, .. } => {
            require_requester(request)?;
            require_positive(*amount)?;
            require_non_empty("method", method)?;
        }
        RequestKind::Transfer { to, amount, .. } => {
            let requester = require_requester(request)?;
            require_positive(*amount)?;
            if to == requester {
                return Err(ApprovalError::validation(
                    "to",
                    "cannot transfer to your own account",
                ));
            }
        }
        RequestKind::Donate { amount, .. } => {
            require_requester(request)?;
            require_positive(*amount)?;
        }
        RequestKind::ProfileUpdate {
            name,
            phone,
            email,
            password,
        } => {
            require_requester(request)?;
            if name.is_none() && phone.is_none() && email.is_none() && password.is_none() {
                return Err(ApprovalError::validation(
                    "profile",
                    "at least one field must change",
                ));
            }
            if let Some(name) = name {
                require_non_empty("name", name)?;
            }
            if let Some(email) = email {
                require_email(email)?;
            }
            if let Some(phone) = phone {
                require_phone(phone)?;
            }
            if let Some(password) = password {
                require_password(password)?;
            }
        }
        RequestKind::ForgotPassword => {
            require_requester(request)?;
        }
    }
    Ok(())
}

fn require_requester(request: &Request) -> Result<&sanchay_core::AccountNo, ApprovalError> {
    request
        .requester
        .as_ref()
        .ok_or_else(|| ApprovalError::validation("requester", "this request requires an account"))
}

fn require_positive(amount: Amount) -> Result<(), ApprovalError> {
    if amount.is_zero() {
        return Err(ApprovalError::validation(
            "amount",
            "amount must be greater than zero",
        ));
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ApprovalError> {
    if value.trim().is_empty() {
        return Err(ApprovalError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn require_email(email: &str) -> Result<(), ApprovalError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ApprovalError::validation("email", "not a valid address"));
    }
    Ok(())
}

/// Bangladeshi mobile numbers: `01XXXXXXXXX` (optionally `+88`-prefixed),
/// where the digit after `01` is 3-9.
fn require_phone(phone: &str) -> Result<(), ApprovalError> {
    let digits: String = phone.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    let local = digits.strip_prefix("+88").unwrap_or(&digits);
    let valid = local.len() == 11
        && local.starts_with("01")
        && local.chars().all(|c| c.is_ascii_digit())
        && matches!(local.as_bytes()[2], b'3'..=b'9');
    if !valid {
        return Err(ApprovalError::validation("phone", "not a valid mobile number"));
    }
    Ok(())
}

fn require_password(password: &str) -> Result<(), ApprovalError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApprovalError::validation(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

/// Signup must not collide with an existing display name, email, or phone
fn require_unique_profile(
    accounts: &AccountRepository,
    display: &str,
    email: &str,
    phone: &str,
) -> Result<(), ApprovalError> {
    for account in accounts.list()? {
        if account.display.eq_ignore_ascii_case(display) {
            return Err(ApprovalError::validation("display", "already in use"));
        }
        if account.email.eq_ignore_ascii_case(email) {
            return Err(ApprovalError::validation("email", "already in use"));
        }
        if account.phone == phone {
            return Err(ApprovalError::validation("phone", "already in use"));
        }
    }
    Ok(())
}
