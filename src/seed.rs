// 🌱 Account provisioning - demo customers and CSV seed files
//
// CSV columns: name,address,checking_number,savings_number,balance_checking,balance_savings,pin
// The pin column is consumed by create_account and never kept.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::entities::{Account, BankApi};

#[derive(Clone, Deserialize)]
pub struct SeedAccount {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub checking_number: String,
    #[serde(default)]
    pub savings_number: String,
    #[serde(default)]
    pub balance_checking: u64,
    #[serde(default)]
    pub balance_savings: u64,
    pub pin: String,
}

impl fmt::Debug for SeedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedAccount")
            .field("name", &self.name)
            .field("checking_number", &self.checking_number)
            .field("savings_number", &self.savings_number)
            .field("pin", &"<redacted>")
            .finish()
    }
}

impl SeedAccount {
    fn to_account(&self) -> Account {
        Account::new(
            self.name.clone(),
            self.address.clone(),
            self.checking_number.clone(),
            self.savings_number.clone(),
        )
        .with_balances(self.balance_checking, self.balance_savings)
    }
}

/// The two reference customers used by the simulation
pub fn demo_accounts() -> Vec<SeedAccount> {
    vec![
        SeedAccount {
            name: "User 1".to_string(),
            address: "address 1".to_string(),
            checking_number: "12345".to_string(),
            savings_number: "6789".to_string(),
            balance_checking: 20,
            balance_savings: 200,
            pin: "345676".to_string(),
        },
        SeedAccount {
            name: "User 2".to_string(),
            address: "address 1".to_string(),
            checking_number: "1234512345".to_string(),
            savings_number: "67896789".to_string(),
            balance_checking: 100,
            balance_savings: 1000,
            pin: "234212".to_string(),
        },
    ]
}

pub fn load_accounts_csv(csv_path: &Path) -> Result<Vec<SeedAccount>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open accounts file {}", csv_path.display()))?;

    let mut seeds = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let seed: SeedAccount =
            result.with_context(|| format!("Failed to parse account on data row {}", line + 1))?;
        seeds.push(seed);
    }

    Ok(seeds)
}

/// Create every seed account; stops at the first rejected one
pub fn provision(bank: &dyn BankApi, seeds: &[SeedAccount]) -> Result<usize> {
    for seed in seeds {
        bank.create_account(seed.to_account(), &seed.pin)
            .with_context(|| format!("Failed to provision account for {}", seed.name))?;
    }
    info!(count = seeds.len(), "accounts provisioned");
    Ok(seeds.len())
}
