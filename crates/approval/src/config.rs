//! Engine configuration

use rust_decimal::Decimal;
use sanchay_core::{AccountNo, Amount, DEFAULT_PREFIX};

/// Tunables for the approval engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prefix for allocated account numbers
    pub account_prefix: String,

    /// Opening balance credited to every approved new account
    pub signup_bonus: Amount,

    /// Account receiving all approved donations
    pub donation_beneficiary: AccountNo,

    /// Password issued by an approved forgot-password request
    pub temp_password: String,

    /// How many times a commit is retried after a version-guard conflict
    pub max_commit_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            account_prefix: DEFAULT_PREFIX.to_string(),
            signup_bonus: Amount::new_unchecked(Decimal::ONE_HUNDRED),
            donation_beneficiary: AccountNo::from_sequence(DEFAULT_PREFIX, 1),
            temp_password: "123".to_string(),
            max_commit_retries: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.account_prefix, "SNCY");
        assert_eq!(config.signup_bonus.value(), dec!(100));
        assert_eq!(config.donation_beneficiary.as_str(), "SNCY0001");
        assert_eq!(config.max_commit_retries, 3);
    }
}
