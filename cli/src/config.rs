//! `udao.toml` loading

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};

use udao_core::{KnownAccounts, Name, Symbol};
use udao_mining::constants::{DEFAULT_CONTRACT, DEFAULT_DEPOSIT_CONTRACT, DEFAULT_REWARD_SYMBOL};
use udao_mining::ContractConfig;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// The contract's own account
    pub contract: String,
    /// Ledger whose transfer notifications trigger mining
    pub deposit_contract: String,
    /// Mined symbol, e.g. "8,UDAO"
    pub reward_symbol: String,
    pub data_dir: PathBuf,
    /// Accounts the host can resolve besides the contract itself
    pub accounts: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            contract: DEFAULT_CONTRACT.to_string(),
            deposit_contract: DEFAULT_DEPOSIT_CONTRACT.to_string(),
            reward_symbol: DEFAULT_REWARD_SYMBOL.to_string(),
            data_dir: PathBuf::from("data"),
            accounts: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: NodeConfig = toml::from_str(&contents)
            .map_err(|e| format!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn contract_config(&self) -> Result<ContractConfig, Box<dyn Error>> {
        Ok(ContractConfig {
            contract: self.contract.parse()?,
            deposit_contract: self.deposit_contract.parse()?,
            reward_symbol: self.reward_symbol()?,
        })
    }

    pub fn reward_symbol(&self) -> Result<Symbol, Box<dyn Error>> {
        Ok(self.reward_symbol.parse()?)
    }

    /// Configured accounts plus the contract and deposit contract
    pub fn account_directory(&self) -> Result<KnownAccounts, Box<dyn Error>> {
        let mut directory = KnownAccounts::default();
        directory.insert(self.contract.parse()?);
        directory.insert(self.deposit_contract.parse()?);
        for account in &self.accounts {
            let name: Name = account
                .parse()
                .map_err(|e| format!("account {:?}: {}", account, e))?;
            directory.insert(name);
        }
        Ok(directory)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }
}
