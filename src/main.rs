// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// Use library instead of local modules
use bank_atm::{
    demo_accounts, load_accounts_csv, provision, AccountType, AtmConfig, AtmController, AtmError,
    AtmEvent, Bank, LogNotifier,
};

#[derive(Parser)]
#[command(name = "bank-atm", version, about = "Bank + ATM session simulator")]
struct Cli {
    /// JSON config file (falls back to BANK_ATM_CONFIG, then defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// CSV file of accounts to provision instead of the demo customers
    #[arg(long, global = true)]
    accounts: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scripted ATM session and log every view change
    Simulate,
    /// Interactive ATM screen
    Tui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AtmConfig::load(cli.config.as_deref())?;
    if cli.accounts.is_some() {
        config.accounts_file = cli.accounts.clone();
    }

    match cli.command.unwrap_or(Command::Simulate) {
        Command::Simulate => {
            init_logging(&config);
            run_simulation(&config)
        }
        Command::Tui => run_ui_mode(&config),
    }
}

fn init_logging(config: &AtmConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build the bank and provision accounts from the configured CSV or the demo set
fn build_bank(config: &AtmConfig) -> Result<Arc<Bank>> {
    let bank = Arc::new(config.build_bank());
    let seeds = match &config.accounts_file {
        Some(path) => load_accounts_csv(path)?,
        None => demo_accounts(),
    };
    provision(bank.as_ref(), &seeds)?;
    Ok(bank)
}

fn run_simulation(config: &AtmConfig) -> Result<()> {
    println!("🏧 Bank ATM simulation");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let bank = build_bank(config)?;
    let mut atm =
        AtmController::with_default_account_type(bank, Arc::new(LogNotifier), config.default_account_type);

    let script = [
        AtmEvent::CardInserted("1234512345".to_string()),
        AtmEvent::PinEntered("234212".to_string()),
        AtmEvent::AccountTypeSelected(AccountType::Savings),
        AtmEvent::BalanceRequested,
        AtmEvent::DepositRequested(343),
        AtmEvent::WithdrawRequested(43),
        // Overdraw and fail
        AtmEvent::WithdrawRequested(43000),
        AtmEvent::CardEjected,
    ];

    for event in script {
        let name = event.name();
        match atm.dispatch(event) {
            Ok(view) => info!(event = name, view = view.title(), "event handled"),
            // Already rendered by the notifier
            Err(AtmError::InsufficientFunds { .. }) | Err(AtmError::AuthenticationFailed(_)) => {}
            Err(err) => error!(event = name, %err, "event failed"),
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Simulation complete");
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AtmConfig) -> Result<()> {
    let bank = build_bank(config)?;
    let mut app = ui::App::new(bank, config.default_account_type);
    ui::run_ui(&mut app)?;

    println!("\n✅ ATM closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AtmConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or run the scripted session: bank-atm simulate");
    std::process::exit(1);
}
