mod commands;
mod config;

use clap::Parser;
use env_logger::Env;
use owo_colors::OwoColorize;
use std::error::Error;

use udao_core::{AuthContext, KnownAccounts, Timestamp, TokenRegistry};
use udao_mining::{Action, MiningContract, Receipt};
use udao_storage::{LedgerSnapshot, LedgerStore, SnapshotStore};

use commands::{Cli, Defaults, Request};
use config::NodeConfig;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = NodeConfig::load(&cli.config)?;
    let contract_config = config.contract_config()?;

    let store = LedgerStore::open(config.ledger_path())?;
    let registry = store.load_registry(
        TokenRegistry::new(contract_config.contract.clone())
            .with_protected_symbol(contract_config.reward_symbol.code().clone()),
    )?;
    log::debug!("ledger loaded from {}", store.path());

    let defaults = Defaults {
        contract: &contract_config.contract,
        deposit_contract: &contract_config.deposit_contract,
        reward_symbol: &contract_config.reward_symbol,
    };
    let request = cli.command.into_request(&defaults);

    let mut contract = MiningContract::with_registry(
        contract_config.clone(),
        registry,
        config.account_directory()?,
    );
    let now = cli.now.unwrap_or_else(current_time);
    let me = contract_config.contract.clone();

    match request {
        Request::Apply(action) => {
            let action_name = action.name();
            let auth = AuthContext::new(cli.auth);
            let receipt = commit(&mut contract, &store, action, &auth, now)?;
            print_receipt(action_name, &receipt);
        }
        Request::Supply(code) => {
            let stat = contract.query_supply(&me, &code)?;
            println!("{}: {}", "Supply".yellow().bold(), stat.current_supply.green());
            println!("{}: {}", "Max supply".yellow().bold(), stat.max_supply);
            println!("{}: {}", "Issuer".yellow().bold(), stat.issuer);
            println!("{}: {}", "Created".yellow().bold(), format_time(stat.created_at));
            println!("{}: {}", "Last reward".yellow().bold(), format_time(stat.last_reward_at));
        }
        Request::Balance(owner, code) => {
            let balance = contract.balance_of(&me, &owner, &code)?;
            println!("{}: {}", owner.yellow().bold(), balance.green());
        }
        Request::LastReward(code) => {
            let at = contract.query_last_reward_time(&me, &code)?;
            println!("{} ({})", at, format_time(at));
        }
        Request::Export(name) => {
            export(&contract, &config, &name, now)?;
        }
    }

    Ok(())
}

/// Applies one action and persists the ledger only if it committed
fn commit(
    contract: &mut MiningContract<KnownAccounts>,
    store: &LedgerStore,
    action: Action,
    auth: &AuthContext,
    now: Timestamp,
) -> Result<Receipt, Box<dyn Error>> {
    let receipt = contract.apply(action, auth, now)?;
    store.save_registry(contract.registry())?;
    Ok(receipt)
}

fn export(
    contract: &MiningContract<KnownAccounts>,
    config: &NodeConfig,
    name: &str,
    now: Timestamp,
) -> Result<(), Box<dyn Error>> {
    let snapshots = SnapshotStore::open(config.snapshot_dir())?;
    let snapshot = LedgerSnapshot::capture(contract.registry(), now);
    let path = snapshots.save(name, &snapshot)?;
    println!("{} {}", "✓ Snapshot written to".green(), path.display());
    Ok(())
}

fn print_receipt(action_name: &str, receipt: &Receipt) {
    println!("{} {}", "✓".green().bold(), action_name);

    if let Some(mining) = &receipt.mining {
        println!("  {}: {}", "Tranches".yellow(), mining.tranches);
        if let Some(issued) = &mining.issued {
            println!("  {}: {}", "Issued".yellow(), issued.green());
        }
        if let Some(payout) = &mining.payout {
            println!("  {}: {}", "Payout".yellow(), payout.green());
        }
    }
    for effect in &receipt.executed {
        println!("  {} {}", "→".cyan(), effect);
    }
    for effect in &receipt.external {
        println!("  {} {}", "⇢".bright_blue(), effect);
    }
}

fn current_time() -> Timestamp {
    Timestamp::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

fn format_time(at: Timestamp) -> String {
    i64::try_from(at)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| at.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use udao_core::{LedgerError, SymbolCode};

    #[test]
    fn test_failed_action_is_returned_and_not_saved() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::open(dir.path().join("ledger")).unwrap();
        let config = NodeConfig::default();
        let contract_config = config.contract_config().unwrap();
        let miner = AuthContext::signed_by(contract_config.contract.clone());
        let mut contract = MiningContract::new(
            contract_config.clone(),
            config.account_directory().unwrap(),
        );
        let code = SymbolCode::new("UDAO").unwrap();

        let issue = Action::Issue {
            to: contract_config.contract.clone(),
            quantity: "1.00000000 UDAO".parse().unwrap(),
            memo: String::new(),
        };
        let err = commit(&mut contract, &store, issue, &miner, 1_700_000_000).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LedgerError>(),
            Some(&LedgerError::NotFound("UDAO".to_string()))
        );
        assert_eq!(store.load_supply(&code).unwrap(), None);

        let create = Action::Create {
            issuer: contract_config.contract.clone(),
            max_supply: "21000000.00000000 UDAO".parse().unwrap(),
        };
        commit(&mut contract, &store, create, &miner, 1_700_000_000).unwrap();
        assert!(store.load_supply(&code).unwrap().is_some());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_time(1_700_000_000), "2023-11-14 22:13:20 UTC");
        assert_eq!(format_time(u64::MAX), u64::MAX.to_string());
    }
}
