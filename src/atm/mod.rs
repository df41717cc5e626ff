// ATM terminal - view states, display notifications, session controller

pub mod notifier;
pub mod session;
pub mod state;

pub use notifier::{FanoutNotifier, LogNotifier, Notifier, RecordingNotifier, ViewChange, ViewPayload};
pub use session::{AtmController, Session};
pub use state::{AtmEvent, ViewState};
