// Display side of the ATM
//
// A Notifier gets one ViewChange per state transition and renders it.
// It returns nothing and cannot fail, so a broken display never stalls a session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use super::state::ViewState;
use crate::entities::AccountType;

/// What a screen needs to render a view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewPayload {
    Welcome,
    /// Card read; `account` is masked
    CardInserted { account: String },
    PinEntry,
    AuthenticationFailed { account: String },
    AccountSelected { name: String },
    Balance { account_type: AccountType, balance: u64 },
    Deposit { account_type: AccountType, amount: u64, balance: u64 },
    Withdraw {
        account_type: AccountType,
        requested: u64,
        balance: u64,
        approved: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewChange {
    pub state: ViewState,
    pub payload: ViewPayload,
    pub at: DateTime<Utc>,
}

impl ViewChange {
    pub fn new(state: ViewState, payload: ViewPayload) -> Self {
        ViewChange {
            state,
            payload,
            at: Utc::now(),
        }
    }

    /// One-line text for console-style displays
    pub fn message(&self) -> String {
        match &self.payload {
            ViewPayload::Welcome => "Welcome. Please insert your card.".to_string(),
            ViewPayload::CardInserted { account } => format!("Card {} read. Please enter your PIN.", account),
            ViewPayload::PinEntry => "Verifying PIN...".to_string(),
            ViewPayload::AuthenticationFailed { account } => {
                format!("Incorrect PIN for card {}. Please try again.", account)
            }
            ViewPayload::AccountSelected { name } => format!("Hello {}. Select checking or savings.", name),
            ViewPayload::Balance { account_type, balance } => {
                format!("{} balance: {}", account_type, balance)
            }
            ViewPayload::Deposit { account_type, amount, balance } => {
                format!("Deposited {} to {}. New balance: {}", amount, account_type, balance)
            }
            ViewPayload::Withdraw { account_type, requested, balance, approved: true } => {
                format!("Withdrew {} from {}. New balance: {}", requested, account_type, balance)
            }
            ViewPayload::Withdraw { account_type, requested, balance, approved: false } => format!(
                "Insufficient funds in {}. Current balance: {}, requested: {}",
                account_type, balance, requested
            ),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn on_view_change(&self, change: &ViewChange);
}

// ============================================================================
// IMPLEMENTATIONS
// ============================================================================

/// Renders view changes as tracing events
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn on_view_change(&self, change: &ViewChange) {
        match &change.payload {
            ViewPayload::AuthenticationFailed { .. }
            | ViewPayload::Withdraw { approved: false, .. } => {
                warn!(view = change.state.title(), "{}", change.message())
            }
            _ => info!(view = change.state.title(), "{}", change.message()),
        }
    }
}

/// Keeps every view change in memory (tests, TUI)
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    history: Mutex<Vec<ViewChange>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<ViewChange> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The newest `n` changes, oldest first
    pub fn recent(&self, n: usize) -> Vec<ViewChange> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = history.len().saturating_sub(n);
        history[skip..].to_vec()
    }

    pub fn last(&self) -> Option<ViewChange> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }

    pub fn states(&self) -> Vec<ViewState> {
        self.history().into_iter().map(|c| c.state).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn on_view_change(&self, change: &ViewChange) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(change.clone());
    }
}

/// Forwards each change to several notifiers in order
#[derive(Default)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        FanoutNotifier { sinks }
    }
}

impl Notifier for FanoutNotifier {
    fn on_view_change(&self, change: &ViewChange) {
        for sink in &self.sinks {
            sink.on_view_change(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let declined = ViewChange::new(
            ViewState::Withdraw,
            ViewPayload::Withdraw {
                account_type: AccountType::Savings,
                requested: 43000,
                balance: 1300,
                approved: false,
            },
        );
        assert_eq!(
            declined.message(),
            "Insufficient funds in savings. Current balance: 1300, requested: 43000"
        );

        let balance = ViewChange::new(
            ViewState::Balance,
            ViewPayload::Balance { account_type: AccountType::Checking, balance: 20 },
        );
        assert_eq!(balance.message(), "checking balance: 20");
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = Arc::new(RecordingNotifier::new());
        let second = Arc::new(RecordingNotifier::new());
        let fanout = FanoutNotifier::new(vec![
            first.clone() as Arc<dyn Notifier>,
            second.clone() as Arc<dyn Notifier>,
        ]);

        fanout.on_view_change(&ViewChange::new(ViewState::Welcome, ViewPayload::Welcome));

        assert_eq!(first.states(), vec![ViewState::Welcome]);
        assert_eq!(second.states(), vec![ViewState::Welcome]);
    }

    #[test]
    fn test_recent_returns_newest_tail() {
        let recorder = RecordingNotifier::new();
        assert!(recorder.recent(3).is_empty());

        recorder.on_view_change(&ViewChange::new(ViewState::Welcome, ViewPayload::Welcome));
        recorder.on_view_change(&ViewChange::new(
            ViewState::CardInserted,
            ViewPayload::CardInserted { account: "*2345".into() },
        ));
        recorder.on_view_change(&ViewChange::new(ViewState::PinEntry, ViewPayload::PinEntry));

        let states: Vec<ViewState> = recorder.recent(2).into_iter().map(|c| c.state).collect();
        assert_eq!(states, vec![ViewState::CardInserted, ViewState::PinEntry]);
        assert_eq!(recorder.recent(10).len(), 3);
    }

    #[test]
    fn test_payload_serializes_with_kind_tag() {
        let change = ViewChange::new(
            ViewState::Deposit,
            ViewPayload::Deposit { account_type: AccountType::Savings, amount: 343, balance: 1343 },
        );
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["payload"]["kind"], "deposit");
        assert_eq!(json["payload"]["account_type"], "savings");
        assert_eq!(json["state"], "Deposit");
    }
}
