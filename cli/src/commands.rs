use clap::{Parser, Subcommand};
use std::path::PathBuf;

use udao_core::{Asset, Name, Symbol, SymbolCode, Timestamp};
use udao_mining::{Action, Deposit};

#[derive(Parser, Debug)]
#[command(name = "udao")]
#[command(about = "UDAO mining contract ledger", version)]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("UDAO_GIT_HASH"), ")"))]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "udao.toml")]
    pub config: PathBuf,

    /// Invocation time in seconds since the Unix epoch (defaults to now)
    #[arg(long, value_name = "SECONDS")]
    pub now: Option<Timestamp>,

    /// Account authorising the action (repeatable)
    #[arg(short, long = "auth", value_name = "NAME")]
    pub auth: Vec<Name>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a new token with a supply cap
    Create {
        issuer: Name,
        /// Maximum supply, e.g. "21000000.00000000 UDAO"
        max_supply: Asset,
    },

    /// Issue new supply
    Issue {
        to: Name,
        quantity: Asset,
        memo: Option<String>,
    },

    /// Retire supply from the issuer's balance
    Retire {
        quantity: Asset,
        memo: Option<String>,
    },

    /// Move tokens between accounts
    Transfer {
        from: Name,
        to: Name,
        quantity: Asset,
        memo: Option<String>,
    },

    /// Create a zero balance row, paid for by `payer`
    Open {
        owner: Name,
        symbol: Symbol,
        payer: Name,
    },

    /// Delete an empty balance row
    Close { owner: Name, symbol: Symbol },

    /// Initialise a miner's reward balance
    SetupMiner {
        user: Name,
        /// Defaults to the configured reward symbol
        symbol: Option<Symbol>,
    },

    /// Deliver a deposit notification from the deposit ledger
    Deposit {
        from: Name,
        /// Deposited amount, e.g. "1.0000 EOS"
        quantity: Asset,
        memo: Option<String>,

        /// Notifying ledger (defaults to the configured deposit contract)
        #[arg(long, value_name = "NAME")]
        token_contract: Option<Name>,

        /// Recipient (defaults to the contract itself)
        #[arg(long, value_name = "NAME")]
        to: Option<Name>,
    },

    /// Show the supply record of a symbol
    Supply { symbol: Option<SymbolCode> },

    /// Show an account balance
    Balance {
        owner: Name,
        symbol: Option<SymbolCode>,
    },

    /// Show when the last reward tranche was minted
    LastReward { symbol: Option<SymbolCode> },

    /// Write a JSON/bincode snapshot of the ledger
    Export {
        #[arg(default_value = "ledger")]
        name: String,
    },
}

/// What a parsed command asks the node to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Apply(Action),
    Supply(SymbolCode),
    Balance(Name, SymbolCode),
    LastReward(SymbolCode),
    Export(String),
}

/// Chain defaults used to fill in omitted arguments
pub struct Defaults<'a> {
    pub contract: &'a Name,
    pub deposit_contract: &'a Name,
    pub reward_symbol: &'a Symbol,
}

impl Commands {
    pub fn into_request(self, defaults: &Defaults<'_>) -> Request {
        let reward_code = || defaults.reward_symbol.code().clone();

        match self {
            Commands::Create { issuer, max_supply } => {
                Request::Apply(Action::Create { issuer, max_supply })
            }
            Commands::Issue { to, quantity, memo } => Request::Apply(Action::Issue {
                to,
                quantity,
                memo: memo.unwrap_or_default(),
            }),
            Commands::Retire { quantity, memo } => Request::Apply(Action::Retire {
                quantity,
                memo: memo.unwrap_or_default(),
            }),
            Commands::Transfer {
                from,
                to,
                quantity,
                memo,
            } => Request::Apply(Action::Transfer {
                from,
                to,
                quantity,
                memo: memo.unwrap_or_default(),
            }),
            Commands::Open {
                owner,
                symbol,
                payer,
            } => Request::Apply(Action::Open {
                owner,
                symbol,
                payer,
            }),
            Commands::Close { owner, symbol } => Request::Apply(Action::Close { owner, symbol }),
            Commands::SetupMiner { user, symbol } => Request::Apply(Action::SetupMiner {
                user,
                symbol: symbol.unwrap_or_else(|| defaults.reward_symbol.clone()),
            }),
            Commands::Deposit {
                from,
                quantity,
                memo,
                token_contract,
                to,
            } => Request::Apply(Action::Notify(Deposit {
                token_contract: token_contract.unwrap_or_else(|| defaults.deposit_contract.clone()),
                from,
                to: to.unwrap_or_else(|| defaults.contract.clone()),
                quantity,
                memo: memo.unwrap_or_default(),
            })),
            Commands::Supply { symbol } => Request::Supply(symbol.unwrap_or_else(reward_code)),
            Commands::Balance { owner, symbol } => {
                Request::Balance(owner, symbol.unwrap_or_else(reward_code))
            }
            Commands::LastReward { symbol } => {
                Request::LastReward(symbol.unwrap_or_else(reward_code))
            }
            Commands::Export { name } => Request::Export(name),
        }
    }
}
