// Bank ATM - Core Library
// Account registry, PIN credentials and the ATM session state machine,
// shared by the simulation driver, the terminal UI, and tests

pub mod atm;
pub mod config;
pub mod credentials;
pub mod entities;
pub mod error;
pub mod seed;

// Re-export commonly used types
pub use atm::{
    AtmController, AtmEvent, FanoutNotifier, LogNotifier, Notifier, RecordingNotifier, Session,
    ViewChange, ViewPayload, ViewState,
};
pub use config::AtmConfig;
pub use credentials::Credential;
pub use entities::{Account, AccountId, AccountType, AuthenticatedAccount, Bank, BankApi};
pub use error::{AtmError, Result};
pub use seed::{demo_accounts, load_accounts_csv, provision, SeedAccount};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
