// Entity Models - customer accounts and the bank that owns them
//
// - Account: identity (checking/savings numbers) + per-type balances
// - Bank: registry keyed by checking number, with credentials and per-account locks

pub mod account;
pub mod bank;

pub use account::{Account, AccountId, AccountType};
pub use bank::{AuthenticatedAccount, Bank, BankApi, DEFAULT_MIN_PIN_LENGTH};
