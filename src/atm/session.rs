// 🏧 ATM Controller - session state machine
//
// Welcome → CardInserted → PinEntry → AccountSelected → {Balance, Deposit, Withdraw}
//
// One controller drives one session, one event at a time. Balance changes go
// through the injected BankApi, which serializes them per account, so several
// controllers can share a bank.

use std::sync::Arc;
use tracing::{info, warn};

use super::notifier::{Notifier, ViewChange, ViewPayload};
use super::state::{AtmEvent, ViewState};
use crate::entities::{Account, AccountId, AccountType, AuthenticatedAccount, BankApi};
use crate::error::{AtmError, Result};

// ============================================================================
// SESSION
// ============================================================================

/// State of one ATM interaction
#[derive(Debug, Clone)]
pub struct Session {
    view: ViewState,
    /// Card that was read; a registry key, not the account itself
    card: Option<AccountId>,
    /// Set only after a successful PIN check for `card`
    auth: Option<AuthenticatedAccount>,
    account_type: AccountType,
}

impl Session {
    fn new(account_type: AccountType) -> Self {
        Session {
            view: ViewState::Welcome,
            card: None,
            auth: None,
            account_type,
        }
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn card(&self) -> Option<&str> {
        self.card.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct AtmController {
    bank: Arc<dyn BankApi>,
    notifier: Arc<dyn Notifier>,
    session: Session,
    default_account_type: AccountType,
}

impl AtmController {
    pub fn new(bank: Arc<dyn BankApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_default_account_type(bank, notifier, AccountType::default())
    }

    /// `default_account_type` applies until the customer picks one
    pub fn with_default_account_type(
        bank: Arc<dyn BankApi>,
        notifier: Arc<dyn Notifier>,
        default_account_type: AccountType,
    ) -> Self {
        let controller = AtmController {
            bank,
            notifier,
            session: Session::new(default_account_type),
            default_account_type,
        };
        controller.notify(ViewState::Welcome, ViewPayload::Welcome);
        controller
    }

    pub fn view(&self) -> ViewState {
        self.session.view
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Route a hardware event to its handler; returns the resulting view
    pub fn dispatch(&mut self, event: AtmEvent) -> Result<ViewState> {
        match event {
            AtmEvent::CardInserted(id) => self.insert_card(&id)?,
            AtmEvent::PinEntered(pin) => self.enter_pin(&pin)?,
            AtmEvent::AccountTypeSelected(account_type) => {
                self.select_account_type(account_type)?;
            }
            AtmEvent::BalanceRequested => {
                self.see_balance()?;
            }
            AtmEvent::DepositRequested(amount) => {
                self.deposit(amount)?;
            }
            AtmEvent::WithdrawRequested(amount) => {
                self.withdraw(amount)?;
            }
            AtmEvent::CardEjected => self.reset(),
        }
        Ok(self.session.view)
    }

    /// Read a card and bind the session to its account
    pub fn insert_card(&mut self, account_id: &str) -> Result<()> {
        self.require(&[ViewState::Welcome], "insert_card")?;

        if self.bank.get_account(account_id).is_none() {
            warn!(account = %Account::mask_account_number(account_id), "card rejected: unknown account");
            return Err(AtmError::AccountNotFound(account_id.to_string()));
        }

        self.session.card = Some(account_id.to_string());
        self.transition(
            ViewState::CardInserted,
            ViewPayload::CardInserted {
                account: Account::mask_account_number(account_id),
            },
        );
        Ok(())
    }

    /// Verify the PIN for the inserted card.
    ///
    /// A mismatch leaves the session at `CardInserted` so the customer can retry.
    /// If the account was removed since the card was read, the session resets.
    pub fn enter_pin(&mut self, pin: &str) -> Result<()> {
        self.require(&[ViewState::CardInserted], "enter_pin")?;
        let card = self
            .session
            .card
            .clone()
            .ok_or_else(|| self.reject("enter_pin"))?;

        self.transition(ViewState::PinEntry, ViewPayload::PinEntry);

        match self.bank.authenticate(&card, pin) {
            Some(auth) => {
                let name = auth.name().to_string();
                self.session.auth = Some(auth);
                info!(account = %Account::mask_account_number(&card), "session authenticated");
                self.transition(ViewState::AccountSelected, ViewPayload::AccountSelected { name });
                Ok(())
            }
            None if self.bank.get_account(&card).is_none() => {
                warn!(account = %Account::mask_account_number(&card), "card account no longer exists");
                self.reset();
                Err(AtmError::AccountNotFound(card))
            }
            None => {
                self.transition(
                    ViewState::CardInserted,
                    ViewPayload::AuthenticationFailed {
                        account: Account::mask_account_number(&card),
                    },
                );
                Err(AtmError::AuthenticationFailed(card))
            }
        }
    }

    /// Choose checking or savings and show its balance
    pub fn select_account_type(&mut self, account_type: AccountType) -> Result<u64> {
        let auth = self.authenticated("select_account_type")?;
        let balance = self.bank_call(|bank| bank.balance(&auth, account_type))?;

        self.session.account_type = account_type;
        self.transition(ViewState::Balance, ViewPayload::Balance { account_type, balance });
        Ok(balance)
    }

    /// Show the balance of the currently selected account type again
    pub fn see_balance(&mut self) -> Result<u64> {
        let account_type = self.session.account_type;
        let auth = self.authenticated("see_balance")?;
        let balance = self.bank_call(|bank| bank.balance(&auth, account_type))?;

        self.transition(ViewState::Balance, ViewPayload::Balance { account_type, balance });
        Ok(balance)
    }

    pub fn deposit(&mut self, amount: u64) -> Result<u64> {
        let account_type = self.session.account_type;
        let auth = self.authenticated("deposit")?;
        let balance = self.bank_call(|bank| bank.deposit(&auth, account_type, amount))?;

        info!(%account_type, amount, balance, "deposit applied");
        self.transition(
            ViewState::Deposit,
            ViewPayload::Deposit { account_type, amount, balance },
        );
        Ok(balance)
    }

    /// Withdraw from the selected account type.
    ///
    /// A declined withdrawal still moves to the `Withdraw` view so the screen
    /// can show the current balance; the error is returned to the caller.
    pub fn withdraw(&mut self, amount: u64) -> Result<u64> {
        let account_type = self.session.account_type;
        let auth = self.authenticated("withdraw")?;

        match self.bank_call(|bank| bank.withdraw(&auth, account_type, amount)) {
            Ok(balance) => {
                info!(%account_type, amount, balance, "withdrawal applied");
                self.transition(
                    ViewState::Withdraw,
                    ViewPayload::Withdraw { account_type, requested: amount, balance, approved: true },
                );
                Ok(balance)
            }
            Err(AtmError::InsufficientFunds { account_type, balance, requested }) => {
                warn!(%account_type, balance, requested, "withdrawal declined");
                self.transition(
                    ViewState::Withdraw,
                    ViewPayload::Withdraw { account_type, requested, balance, approved: false },
                );
                Err(AtmError::InsufficientFunds { account_type, balance, requested })
            }
            Err(err) => Err(err),
        }
    }

    /// End the session (logout / card removal) from any view
    pub fn reset(&mut self) {
        if let Some(card) = self.session.card.take() {
            info!(account = %Account::mask_account_number(&card), "card ejected");
        }
        self.session = Session::new(self.default_account_type);
        self.notify(ViewState::Welcome, ViewPayload::Welcome);
    }

    // ========================================================================
    // GUARDS + HELPERS
    // ========================================================================

    fn require(&self, allowed: &[ViewState], event: &'static str) -> Result<()> {
        if allowed.contains(&self.session.view) {
            Ok(())
        } else {
            Err(self.reject(event))
        }
    }

    /// Authentication guard for balance and transaction events
    fn authenticated(&self, event: &'static str) -> Result<AuthenticatedAccount> {
        match &self.session.auth {
            Some(auth) if self.session.view.is_authenticated() => Ok(auth.clone()),
            _ => Err(self.reject(event)),
        }
    }

    fn reject(&self, event: &'static str) -> AtmError {
        warn!(view = ?self.session.view, event, "event rejected in current view");
        AtmError::InvalidStateTransition { state: self.session.view, event }
    }

    /// Run a bank call; an account that vanished mid-session ends the session
    fn bank_call<T>(&mut self, call: impl FnOnce(&dyn BankApi) -> Result<T>) -> Result<T> {
        let result = call(self.bank.as_ref());
        if let Err(AtmError::AccountNotFound(_)) = &result {
            self.reset();
        }
        result
    }

    fn transition(&mut self, to: ViewState, payload: ViewPayload) {
        self.session.view = to;
        self.notify(to, payload);
    }

    fn notify(&self, state: ViewState, payload: ViewPayload) {
        self.notifier.on_view_change(&ViewChange::new(state, payload));
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atm::RecordingNotifier;
    use crate::entities::Bank;

    fn setup() -> (Arc<Bank>, Arc<RecordingNotifier>, AtmController) {
        let bank = Arc::new(Bank::new());
        bank.create_account(
            Account::new("User 1", "address 1", "12345", "6789").with_balances(20, 200),
            "345676",
        )
        .unwrap();
        bank.create_account(
            Account::new("User 2", "address 1", "1234512345", "67896789").with_balances(100, 1000),
            "234212",
        )
        .unwrap();

        let notifier = Arc::new(RecordingNotifier::new());
        let controller = AtmController::new(bank.clone(), notifier.clone());
        (bank, notifier, controller)
    }

    fn logged_in() -> (Arc<Bank>, Arc<RecordingNotifier>, AtmController) {
        let (bank, notifier, mut atm) = setup();
        atm.insert_card("1234512345").unwrap();
        atm.enter_pin("234212").unwrap();
        (bank, notifier, atm)
    }

    fn is_invalid_transition<T>(result: Result<T>) -> bool {
        matches!(result, Err(AtmError::InvalidStateTransition { .. }))
    }

    #[test]
    fn test_full_session_flow() {
        let (bank, notifier, mut atm) = logged_in();
        assert_eq!(atm.view(), ViewState::AccountSelected);
        assert!(atm.session().is_authenticated());

        assert_eq!(atm.select_account_type(AccountType::Savings), Ok(1000));
        assert_eq!(atm.view(), ViewState::Balance);

        assert_eq!(atm.deposit(343), Ok(1343));
        assert_eq!(atm.view(), ViewState::Deposit);

        assert_eq!(atm.withdraw(43), Ok(1300));
        assert_eq!(atm.view(), ViewState::Withdraw);

        assert_eq!(
            atm.withdraw(43000),
            Err(AtmError::InsufficientFunds {
                account_type: AccountType::Savings,
                balance: 1300,
                requested: 43000,
            })
        );
        assert_eq!(atm.view(), ViewState::Withdraw);
        assert_eq!(bank.get_account("1234512345").unwrap().balance_savings, 1300);

        assert_eq!(atm.see_balance(), Ok(1300));

        assert_eq!(
            notifier.states(),
            vec![
                ViewState::Welcome,
                ViewState::CardInserted,
                ViewState::PinEntry,
                ViewState::AccountSelected,
                ViewState::Balance,
                ViewState::Deposit,
                ViewState::Withdraw,
                ViewState::Withdraw,
                ViewState::Balance,
            ]
        );
        let declined = &notifier.history()[7];
        assert!(matches!(declined.payload, ViewPayload::Withdraw { approved: false, balance: 1300, .. }));
    }

    #[test]
    fn test_unknown_card_stays_at_welcome() {
        let (_, _, mut atm) = setup();
        assert_eq!(
            atm.insert_card("000"),
            Err(AtmError::AccountNotFound("000".into()))
        );
        assert_eq!(atm.view(), ViewState::Welcome);
        assert!(atm.session().card().is_none());
    }

    #[test]
    fn test_wrong_pin_allows_retry_and_blocks_transactions() {
        let (bank, notifier, mut atm) = setup();
        atm.insert_card("1234512345").unwrap();

        assert_eq!(
            atm.enter_pin("111111"),
            Err(AtmError::AuthenticationFailed("1234512345".into()))
        );
        assert_eq!(atm.view(), ViewState::CardInserted);
        assert!(matches!(
            notifier.last().unwrap().payload,
            ViewPayload::AuthenticationFailed { .. }
        ));

        assert!(is_invalid_transition(atm.deposit(100)));
        assert_eq!(atm.view(), ViewState::CardInserted);
        assert_eq!(bank.get_account("1234512345").unwrap().balance_checking, 100);

        // Retry with the right PIN
        atm.enter_pin("234212").unwrap();
        assert_eq!(atm.view(), ViewState::AccountSelected);
    }

    #[test]
    fn test_events_rejected_at_welcome() {
        let (_, notifier, mut atm) = setup();
        let before = notifier.history().len();

        assert!(is_invalid_transition(atm.enter_pin("234212")));
        assert!(is_invalid_transition(atm.select_account_type(AccountType::Checking)));
        assert!(is_invalid_transition(atm.see_balance()));
        assert!(is_invalid_transition(atm.deposit(10)));
        assert!(is_invalid_transition(atm.withdraw(10)));

        assert_eq!(atm.view(), ViewState::Welcome);
        assert_eq!(notifier.history().len(), before);
    }

    #[test]
    fn test_events_rejected_after_card_inserted() {
        let (_, _, mut atm) = setup();
        atm.insert_card("12345").unwrap();

        assert!(is_invalid_transition(atm.insert_card("1234512345")));
        assert!(is_invalid_transition(atm.select_account_type(AccountType::Savings)));
        assert!(is_invalid_transition(atm.see_balance()));
        assert!(is_invalid_transition(atm.withdraw(1)));

        assert_eq!(atm.view(), ViewState::CardInserted);
        assert_eq!(atm.session().card(), Some("12345"));
    }

    #[test]
    fn test_events_rejected_after_authentication() {
        let (_, _, mut atm) = logged_in();
        atm.select_account_type(AccountType::Checking).unwrap();

        assert!(is_invalid_transition(atm.insert_card("12345")));
        assert!(is_invalid_transition(atm.enter_pin("234212")));
        assert_eq!(atm.view(), ViewState::Balance);
    }

    #[test]
    fn test_transaction_without_selection_uses_checking() {
        let (bank, _, mut atm) = logged_in();

        assert_eq!(atm.deposit(5), Ok(105));
        assert_eq!(bank.get_account("1234512345").unwrap().balance_savings, 1000);
    }

    #[test]
    fn test_configured_default_account_type() {
        let (bank, notifier, _) = setup();
        let mut atm =
            AtmController::with_default_account_type(bank.clone(), notifier, AccountType::Savings);
        atm.insert_card("12345").unwrap();
        atm.enter_pin("345676").unwrap();

        assert_eq!(atm.withdraw(50), Ok(150));
        assert_eq!(bank.get_account("12345").unwrap().balance_checking, 20);
    }

    #[test]
    fn test_zero_deposit_rejected_without_transition() {
        let (_, _, mut atm) = logged_in();
        assert!(matches!(atm.deposit(0), Err(AtmError::InvalidAmount(_))));
        assert_eq!(atm.view(), ViewState::AccountSelected);
    }

    #[test]
    fn test_reset_returns_to_welcome() {
        let (_, notifier, mut atm) = logged_in();
        atm.select_account_type(AccountType::Savings).unwrap();

        atm.reset();
        assert_eq!(atm.view(), ViewState::Welcome);
        assert!(!atm.session().is_authenticated());
        assert_eq!(atm.session().account_type(), AccountType::Checking);
        assert_eq!(notifier.last().unwrap().state, ViewState::Welcome);
        assert!(is_invalid_transition(atm.deposit(1)));

        // A new card can be inserted after reset
        atm.insert_card("12345").unwrap();
    }

    #[test]
    fn test_deleted_account_ends_session() {
        let (bank, _, mut atm) = logged_in();
        bank.delete_account("1234512345").unwrap();

        assert!(matches!(atm.see_balance(), Err(AtmError::AccountNotFound(_))));
        assert_eq!(atm.view(), ViewState::Welcome);
    }

    #[test]
    fn test_account_deleted_before_pin_entry_ends_session() {
        let (bank, notifier, mut atm) = setup();
        atm.insert_card("12345").unwrap();
        bank.delete_account("12345").unwrap();

        assert_eq!(
            atm.enter_pin("345676"),
            Err(AtmError::AccountNotFound("12345".into()))
        );
        assert_eq!(atm.view(), ViewState::Welcome);
        assert!(atm.session().card().is_none());
        assert_eq!(notifier.last().unwrap().payload, ViewPayload::Welcome);

        // Wrong PIN on a live account is still a retryable failure
        atm.insert_card("1234512345").unwrap();
        assert!(matches!(atm.enter_pin("000000"), Err(AtmError::AuthenticationFailed(_))));
        assert_eq!(atm.view(), ViewState::CardInserted);
    }

    #[test]
    fn test_dispatch_hardware_events() {
        let (_, _, mut atm) = setup();

        assert_eq!(atm.dispatch(AtmEvent::CardInserted("12345".into())), Ok(ViewState::CardInserted));
        assert_eq!(atm.dispatch(AtmEvent::PinEntered("345676".into())), Ok(ViewState::AccountSelected));
        assert_eq!(
            atm.dispatch(AtmEvent::AccountTypeSelected(AccountType::Savings)),
            Ok(ViewState::Balance)
        );
        assert_eq!(atm.dispatch(AtmEvent::DepositRequested(50)), Ok(ViewState::Deposit));
        assert_eq!(atm.dispatch(AtmEvent::WithdrawRequested(250)), Ok(ViewState::Withdraw));
        assert!(matches!(
            atm.dispatch(AtmEvent::WithdrawRequested(1)),
            Err(AtmError::InsufficientFunds { balance: 0, .. })
        ));
        assert_eq!(atm.dispatch(AtmEvent::BalanceRequested), Ok(ViewState::Balance));
        assert_eq!(atm.dispatch(AtmEvent::CardEjected), Ok(ViewState::Welcome));
    }

    #[test]
    fn test_two_sessions_share_one_account() {
        let (bank, notifier, mut first) = logged_in();
        let mut second = AtmController::new(bank.clone(), notifier);
        second.insert_card("1234512345").unwrap();
        second.enter_pin("234212").unwrap();

        first.select_account_type(AccountType::Savings).unwrap();
        second.select_account_type(AccountType::Savings).unwrap();

        assert_eq!(first.withdraw(600), Ok(400));
        assert!(matches!(
            second.withdraw(600),
            Err(AtmError::InsufficientFunds { balance: 400, .. })
        ));
    }
}
