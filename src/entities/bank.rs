// 🏦 Bank - account registry + authentication
//
// Owns every Account and its Credential, keyed by checking number.
// Each record has its own lock, so balance changes on one account are
// serialized while other accounts proceed in parallel. The map lock is held
// only for lookups and for create/delete.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::account::{Account, AccountId, AccountType};
use crate::credentials::Credential;
use crate::error::{AtmError, Result};

/// Minimum PIN length accepted at account creation
pub const DEFAULT_MIN_PIN_LENGTH: usize = 5;

// ============================================================================
// AUTHENTICATED ACCOUNT
// ============================================================================

/// Proof that a PIN was verified for an account.
///
/// Balance operations on `BankApi` take this instead of a bare id, so code
/// that never authenticated has nothing to pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    id: AccountId,
    name: String,
}

impl AuthenticatedAccount {
    /// Issued by a `BankApi` implementation after a successful PIN check
    pub fn new(id: impl Into<AccountId>, name: impl Into<String>) -> Self {
        AuthenticatedAccount {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// BANK API
// ============================================================================

/// Registry operations the ATM needs from a bank backend.
///
/// `Bank` is the in-memory implementation; a networked or database-backed
/// bank plugs in here.
pub trait BankApi: Send + Sync {
    /// Register a new account and derive its credential from `pin`
    fn create_account(&self, account: Account, pin: &str) -> Result<AccountId>;

    /// Snapshot of the account, if registered
    fn get_account(&self, id: &str) -> Option<Account>;

    /// Verify `pin` for the account; `None` on unknown account or mismatch
    fn authenticate(&self, id: &str, pin: &str) -> Option<AuthenticatedAccount>;

    /// Store updated profile values and balances for an existing account.
    ///
    /// `account.version` must match the stored version, so a snapshot taken
    /// before another deposit or withdrawal is rejected with `StaleAccount`.
    fn save_account(&self, account: &Account) -> Result<()>;

    /// Remove an account and return its final state
    fn delete_account(&self, id: &str) -> Result<Account>;

    fn balance(&self, auth: &AuthenticatedAccount, account_type: AccountType) -> Result<u64>;

    fn deposit(&self, auth: &AuthenticatedAccount, account_type: AccountType, amount: u64) -> Result<u64>;

    fn withdraw(&self, auth: &AuthenticatedAccount, account_type: AccountType, amount: u64) -> Result<u64>;
}

// ============================================================================
// IN-MEMORY BANK
// ============================================================================

struct AccountRecord {
    /// Copied out of the account so duplicate checks need no record lock
    savings_number: String,
    credential: Credential,
    account: Mutex<Account>,
}

pub struct Bank {
    accounts: RwLock<HashMap<AccountId, Arc<AccountRecord>>>,
    min_pin_length: usize,
}

impl Bank {
    /// Create an empty bank with the default PIN policy
    pub fn new() -> Self {
        Self::with_min_pin_length(DEFAULT_MIN_PIN_LENGTH)
    }

    pub fn with_min_pin_length(min_pin_length: usize) -> Self {
        Bank {
            accounts: RwLock::new(HashMap::new()),
            min_pin_length,
        }
    }

    pub fn min_pin_length(&self) -> usize {
        self.min_pin_length
    }

    /// Count registered accounts
    pub fn count(&self) -> usize {
        self.read_accounts().len()
    }

    /// Snapshots of all accounts, ordered by checking number
    pub fn all_accounts(&self) -> Vec<Account> {
        let records: Vec<Arc<AccountRecord>> = self.read_accounts().values().cloned().collect();
        let mut accounts: Vec<Account> = records.iter().map(|r| lock(&r.account).clone()).collect();
        accounts.sort_by(|a, b| a.checking_number.cmp(&b.checking_number));
        accounts
    }

    fn check_pin_policy(&self, pin: &str) -> Result<()> {
        if pin.chars().count() < self.min_pin_length {
            return Err(AtmError::InvalidCredentialPolicy(format!(
                "PIN must be at least {} digits",
                self.min_pin_length
            )));
        }
        if !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(AtmError::InvalidCredentialPolicy("PIN must be numeric".into()));
        }
        Ok(())
    }

    fn record(&self, id: &str) -> Option<Arc<AccountRecord>> {
        self.read_accounts().get(id).cloned()
    }

    fn authorized_record(&self, auth: &AuthenticatedAccount) -> Result<Arc<AccountRecord>> {
        self.record(auth.id())
            .ok_or_else(|| AtmError::AccountNotFound(auth.id().to_string()))
    }

    fn read_accounts(&self) -> RwLockReadGuard<'_, HashMap<AccountId, Arc<AccountRecord>>> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_accounts(&self) -> RwLockWriteGuard<'_, HashMap<AccountId, Arc<AccountRecord>>> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Bank {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(account: &Mutex<Account>) -> MutexGuard<'_, Account> {
    account.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BankApi for Bank {
    fn create_account(&self, account: Account, pin: &str) -> Result<AccountId> {
        self.check_pin_policy(pin)?;

        let id = account.checking_number.trim().to_string();
        if id.is_empty() {
            return Err(AtmError::InvalidProfile("checking number is required".into()));
        }

        // Hash outside the map lock
        let credential = Credential::create(pin);

        let mut accounts = self.write_accounts();
        if accounts.contains_key(&id) {
            return Err(AtmError::DuplicateAccount(id));
        }
        if !account.savings_number.is_empty()
            && accounts.values().any(|r| r.savings_number == account.savings_number)
        {
            return Err(AtmError::DuplicateAccount(account.savings_number));
        }

        let mut account = account;
        account.checking_number = id.clone();
        accounts.insert(
            id.clone(),
            Arc::new(AccountRecord {
                savings_number: account.savings_number.clone(),
                credential,
                account: Mutex::new(account),
            }),
        );

        info!(account = %Account::mask_account_number(&id), "account created");
        Ok(id)
    }

    fn get_account(&self, id: &str) -> Option<Account> {
        let found = self.record(id).map(|r| lock(&r.account).clone());
        debug!(account = %Account::mask_account_number(id), found = found.is_some(), "account lookup");
        found
    }

    fn authenticate(&self, id: &str, pin: &str) -> Option<AuthenticatedAccount> {
        let record = self.record(id)?;
        if record.credential.verify(pin) {
            let name = lock(&record.account).name.clone();
            Some(AuthenticatedAccount::new(id, name))
        } else {
            warn!(account = %Account::mask_account_number(id), "PIN verification failed");
            None
        }
    }

    fn save_account(&self, account: &Account) -> Result<()> {
        let record = self
            .record(&account.checking_number)
            .ok_or_else(|| AtmError::AccountNotFound(account.checking_number.clone()))?;

        if record.savings_number != account.savings_number {
            return Err(AtmError::InvalidProfile("savings number cannot change".into()));
        }

        let mut stored = lock(&record.account);
        if stored.version != account.version {
            return Err(AtmError::StaleAccount {
                id: account.checking_number.clone(),
                expected: account.version,
                found: stored.version,
            });
        }
        *stored = account.clone();
        stored.touch();
        Ok(())
    }

    fn delete_account(&self, id: &str) -> Result<Account> {
        let record = self
            .write_accounts()
            .remove(id)
            .ok_or_else(|| AtmError::AccountNotFound(id.to_string()))?;

        info!(account = %Account::mask_account_number(id), "account deleted");
        let account = lock(&record.account).clone();
        Ok(account)
    }

    fn balance(&self, auth: &AuthenticatedAccount, account_type: AccountType) -> Result<u64> {
        let record = self.authorized_record(auth)?;
        let balance = lock(&record.account).balance_of(account_type);
        Ok(balance)
    }

    fn deposit(&self, auth: &AuthenticatedAccount, account_type: AccountType, amount: u64) -> Result<u64> {
        let record = self.authorized_record(auth)?;
        let result = lock(&record.account).deposit(account_type, amount);
        result
    }

    fn withdraw(&self, auth: &AuthenticatedAccount, account_type: AccountType, amount: u64) -> Result<u64> {
        let record = self.authorized_record(auth)?;
        let result = lock(&record.account).withdraw(account_type, amount);
        result
    }
}

// ============================================================================
// TESTS
// ============================================================================
