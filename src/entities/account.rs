// 💳 Account Entity - customer record with checking + savings balances
//
// Identity: checking number (canonical registry key) and savings number,
// both fixed at creation.
// Values: name, address, and one balance per account type.
//
// Balances are unsigned, and withdraw either applies in full or not at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AtmError, Result};

/// Canonical registry key: the checking-account number
pub type AccountId = String;

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Checking balance (daily transactions)
    #[default]
    Checking,

    /// Savings balance
    Savings,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = AtmError;

    /// Accepts "checking", "savings" and the short "saving" form
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "checking" => Ok(AccountType::Checking),
            "savings" | "saving" => Ok(AccountType::Savings),
            other => Err(AtmError::UnknownAccountType(other.to_string())),
        }
    }
}

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

/// Customer record held by the bank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    // ========================================================================
    // IDENTITY (never changes)
    // ========================================================================
    /// Checking-account number, also the registry key
    pub checking_number: AccountId,

    /// Savings-account number
    pub savings_number: String,

    // ========================================================================
    // VALUES
    // ========================================================================
    pub name: String,

    /// Opaque postal address
    pub address: String,

    pub balance_checking: u64,
    pub balance_savings: u64,

    // ========================================================================
    // VERSIONING
    // ========================================================================
    /// Bumped on every mutation; saves must present the current version
    pub version: i64,
    /// Time of the last mutation
    pub system_time: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zero balances
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        checking_number: impl Into<String>,
        savings_number: impl Into<String>,
    ) -> Self {
        Account {
            checking_number: checking_number.into(),
            savings_number: savings_number.into(),
            name: name.into(),
            address: address.into(),
            balance_checking: 0,
            balance_savings: 0,
            version: 1,
            system_time: Utc::now(),
        }
    }

    /// Set opening balances (builder style, used at provisioning)
    pub fn with_balances(mut self, checking: u64, savings: u64) -> Self {
        self.balance_checking = checking;
        self.balance_savings = savings;
        self
    }

    pub fn id(&self) -> &str {
        &self.checking_number
    }

    pub fn balance_of(&self, account_type: AccountType) -> u64 {
        match account_type {
            AccountType::Checking => self.balance_checking,
            AccountType::Savings => self.balance_savings,
        }
    }

    fn balance_mut(&mut self, account_type: AccountType) -> &mut u64 {
        match account_type {
            AccountType::Checking => &mut self.balance_checking,
            AccountType::Savings => &mut self.balance_savings,
        }
    }

    /// Add `amount` to the selected balance and return the new balance.
    ///
    /// Zero amounts and overflow are rejected without touching the balance.
    pub fn deposit(&mut self, account_type: AccountType, amount: u64) -> Result<u64> {
        if amount == 0 {
            return Err(AtmError::InvalidAmount("deposit must be greater than zero".into()));
        }

        let balance = self.balance_mut(account_type);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| AtmError::InvalidAmount(format!("deposit of {} overflows balance", amount)))?;
        *balance = updated;
        self.touch();

        Ok(updated)
    }

    /// Take `amount` from the selected balance if it is covered.
    ///
    /// On `InsufficientFunds` the balance is left as it was.
    pub fn withdraw(&mut self, account_type: AccountType, amount: u64) -> Result<u64> {
        if amount == 0 {
            return Err(AtmError::InvalidAmount("withdrawal must be greater than zero".into()));
        }

        let balance = self.balance_mut(account_type);
        if amount > *balance {
            return Err(AtmError::InsufficientFunds {
                account_type,
                balance: *balance,
                requested: amount,
            });
        }
        *balance -= amount;
        let updated = *balance;
        self.touch();

        Ok(updated)
    }

    /// Record a mutation: next version, current time
    pub(crate) fn touch(&mut self) {
        self.version += 1;
        self.system_time = Utc::now();
    }

    /// Serialize for a future persistence backend
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Account> {
        serde_json::from_str(json)
    }

    /// Mask account number (show only last 4 digits)
    ///
    /// Example: "1234512345" → "*2345"
    pub fn mask_account_number(full_number: &str) -> String {
        if full_number.len() <= 4 {
            return full_number.to_string();
        }
        let last4 = &full_number[full_number.len() - 4..];
        format!("*{}", last4)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_account() -> Account {
        Account::new("User 2", "address 1", "1234512345", "67896789").with_balances(100, 1000)
    }

    #[test]
    fn test_account_creation() {
        let account = test_account();

        assert_eq!(account.id(), "1234512345");
        assert_eq!(account.savings_number, "67896789");
        assert_eq!(account.name, "User 2");
        assert_eq!(account.balance_of(AccountType::Checking), 100);
        assert_eq!(account.balance_of(AccountType::Savings), 1000);
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_deposit_increases_selected_balance_only() {
        let mut account = test_account();

        let balance = account.deposit(AccountType::Savings, 343).unwrap();
        assert_eq!(balance, 1343);
        assert_eq!(account.balance_checking, 100);
        assert_eq!(account.version, 2);
    }

    #[test]
    fn test_mutations_advance_version_and_time() {
        let mut account = test_account();
        let created = account.system_time;

        account.withdraw(AccountType::Checking, 10).unwrap();
        assert_eq!(account.version, 2);
        assert!(account.system_time >= created);

        let after_withdraw = account.system_time;
        assert!(account.withdraw(AccountType::Checking, 10_000).is_err());
        assert_eq!(account.version, 2);
        assert_eq!(account.system_time, after_withdraw);
    }

    #[test]
    fn test_deposit_rejects_zero_and_overflow() {
        let mut account = test_account();

        assert!(matches!(
            account.deposit(AccountType::Checking, 0),
            Err(AtmError::InvalidAmount(_))
        ));

        account.balance_checking = u64::MAX;
        assert!(matches!(
            account.deposit(AccountType::Checking, 1),
            Err(AtmError::InvalidAmount(_))
        ));
        assert_eq!(account.balance_checking, u64::MAX);
    }

    #[test]
    fn test_withdraw_success_and_insufficient_funds() {
        let mut account = test_account().with_balances(100, 1343);

        assert_eq!(account.withdraw(AccountType::Savings, 43), Ok(1300));

        let err = account.withdraw(AccountType::Savings, 43000).unwrap_err();
        assert_eq!(
            err,
            AtmError::InsufficientFunds {
                account_type: AccountType::Savings,
                balance: 1300,
                requested: 43000,
            }
        );
        assert_eq!(account.balance_savings, 1300);
    }

    #[test]
    fn test_withdraw_exact_balance_drains_to_zero() {
        let mut account = test_account();
        assert_eq!(account.withdraw(AccountType::Checking, 100), Ok(0));
        assert!(account.withdraw(AccountType::Checking, 1).is_err());
    }

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("checking".parse::<AccountType>().unwrap(), AccountType::Checking);
        assert_eq!("Savings".parse::<AccountType>().unwrap(), AccountType::Savings);
        assert_eq!("saving".parse::<AccountType>().unwrap(), AccountType::Savings);
        assert!(matches!(
            "credit".parse::<AccountType>(),
            Err(AtmError::UnknownAccountType(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_keeps_identity_and_balances() {
        let account = test_account();
        let json = account.to_json().unwrap();

        assert!(json.contains("\"checking_number\":\"1234512345\""));
        assert_eq!(Account::from_json(&json).unwrap(), account);
    }

    #[test]
    fn test_mask_account_number() {
        assert_eq!(Account::mask_account_number("1234512345"), "*2345");
        assert_eq!(Account::mask_account_number("1234"), "1234");
        assert_eq!(Account::mask_account_number(""), "");
    }

    proptest! {
        #[test]
        fn test_withdraw_never_goes_negative(
            opening in 0u64..1_000_000,
            amounts in proptest::collection::vec(1u64..50_000, 1..20),
        ) {
            let mut account = test_account().with_balances(opening, opening);
            let mut expected = opening;
            for amount in amounts {
                match account.withdraw(AccountType::Checking, amount) {
                    Ok(balance) => {
                        prop_assert!(amount <= expected);
                        expected -= amount;
                        prop_assert_eq!(balance, expected);
                    }
                    Err(_) => prop_assert!(amount > expected),
                }
            }
            prop_assert_eq!(account.balance_checking, expected);
        }

        #[test]
        fn test_deposit_then_withdraw_restores_balance(
            opening in 0u64..1_000_000,
            amount in 1u64..1_000_000,
        ) {
            let mut account = test_account().with_balances(opening, opening);
            account.deposit(AccountType::Savings, amount).unwrap();
            account.withdraw(AccountType::Savings, amount).unwrap();
            prop_assert_eq!(account.balance_savings, opening);
        }
    }
}
