// ATM view states and input events
//
// Closed enums for what the screen shows and what the hardware can send.

use serde::{Deserialize, Serialize};

use crate::entities::AccountType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewState {
    Welcome,
    CardInserted,
    /// Transient: shown while a PIN is being verified
    PinEntry,
    AccountSelected,
    Balance,
    Deposit,
    Withdraw,
}

impl ViewState {
    /// Views reachable only after a successful PIN check
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            ViewState::AccountSelected | ViewState::Balance | ViewState::Deposit | ViewState::Withdraw
        )
    }

    pub fn title(&self) -> &'static str {
        match self {
            ViewState::Welcome => "Welcome",
            ViewState::CardInserted => "Card Inserted",
            ViewState::PinEntry => "Enter PIN",
            ViewState::AccountSelected => "Select Account",
            ViewState::Balance => "Balance",
            ViewState::Deposit => "Deposit",
            ViewState::Withdraw => "Withdraw",
        }
    }
}

/// Input from the ATM hardware (card reader, keypad)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtmEvent {
    CardInserted(String),
    PinEntered(String),
    AccountTypeSelected(AccountType),
    BalanceRequested,
    DepositRequested(u64),
    WithdrawRequested(u64),
    CardEjected,
}

impl AtmEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AtmEvent::CardInserted(_) => "insert_card",
            AtmEvent::PinEntered(_) => "enter_pin",
            AtmEvent::AccountTypeSelected(_) => "select_account_type",
            AtmEvent::BalanceRequested => "see_balance",
            AtmEvent::DepositRequested(_) => "deposit",
            AtmEvent::WithdrawRequested(_) => "withdraw",
            AtmEvent::CardEjected => "eject_card",
        }
    }
}
