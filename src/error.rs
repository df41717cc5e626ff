// Error taxonomy for the bank and ATM session
//
// Every failure crosses component boundaries as a value. None of them is
// fatal to the service: a session either stays where it is (auth retry,
// declined withdrawal) or goes back to the welcome screen.

use thiserror::Error;

use crate::atm::ViewState;
use crate::entities::AccountType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtmError {
    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("authentication failed for account {0}")]
    AuthenticationFailed(String),

    #[error("insufficient funds in {account_type}: balance={balance}, requested={requested}")]
    InsufficientFunds {
        account_type: AccountType,
        balance: u64,
        requested: u64,
    },

    #[error("event '{event}' is not allowed in view {state:?}")]
    InvalidStateTransition { state: ViewState, event: &'static str },

    #[error("PIN rejected: {0}")]
    InvalidCredentialPolicy(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("account number already registered: {0}")]
    DuplicateAccount(String),

    #[error("account {id} changed since it was read: version {expected} expected, {found} stored")]
    StaleAccount { id: String, expected: i64, found: i64 },

    #[error("invalid account profile: {0}")]
    InvalidProfile(String),

    #[error("unknown account type: {0}")]
    UnknownAccountType(String),
}

pub type Result<T> = std::result::Result<T, AtmError>;
