use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use custody_ledger::assets::{AssetToken, InMemoryAsset};
use custody_ledger::ledger::FundLedger;

mod config;

use config::Config;

/// Fund-custody ledger operator tool.
///
/// State lives in a JSON document on disk; each invocation loads it, applies
/// exactly one operation, and writes it back, so the file sees one writer at
/// a time.
#[derive(Parser)]
#[command(name = "custody", version, about = "Fund-custody ledger operator tool")]
struct Cli {
    /// Authenticated caller identity for state-changing commands
    #[arg(long, global = true, default_value = "operator")]
    caller: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config (if missing) and an empty ledger state
    Init,
    /// Register a new fund with its claim token
    CreateFund {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Claim token symbol suffix
        #[arg(long)]
        symbol: String,
        #[arg(long = "reference")]
        references: Vec<String>,
    },
    /// Stop deposits and new withdrawal requests on a fund (manager only)
    CloseFund { fund: u64 },
    /// Mint asset units to an account (local faucet)
    Mint { to: String, amount: u64 },
    /// Allow the custody account to pull units from the caller
    Approve { amount: u64 },
    /// Deposit asset into a fund, minting claims 1:1
    Deposit { fund: u64, amount: u64 },
    /// Move claim tokens to another holder
    TransferClaims { fund: u64, to: String, amount: u64 },
    /// File a withdrawal request against a fund
    Request {
        fund: u64,
        amount: u64,
        #[arg(long)]
        title: String,
        #[arg(long = "reference")]
        references: Vec<String>,
    },
    /// Cast a balance-weighted vote on a pending request
    Vote {
        fund: u64,
        request: u64,
        /// Vote against instead of in favor
        #[arg(long)]
        against: bool,
    },
    /// Print a fund, its requests, or the event log as JSON
    Show {
        #[command(subcommand)]
        what: ShowWhat,
    },
    /// Write a full snapshot with its merkle root
    Snapshot {
        /// Output path
        #[arg(long, default_value = "custody-snapshot.json")]
        out: String,
    },
}

#[derive(Subcommand)]
enum ShowWhat {
    Fund { fund: u64 },
    Requests { fund: u64 },
    Events,
}

/// Everything the CLI persists between invocations: the ledger itself plus
/// the local asset it settles against.
#[derive(Serialize, Deserialize)]
struct CliState {
    ledger: FundLedger,
    asset: InMemoryAsset,
}

fn load_state(path: &str) -> Result<CliState> {
    let bytes = fs::read(path).context(format!("Failed to read state file: {}", path))?;
    serde_json::from_slice(&bytes).context("Failed to parse state JSON")
}

fn save_state(path: &str, state: &CliState) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(state).context("Failed to serialize state")?;
    fs::write(path, bytes).context(format!("Failed to write state to {}", path))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Command::Init = cli.command {
        let config_path = Config::path();
        if !Path::new(&config_path).exists() {
            Config::write_default(&config_path)?;
        }
        let config = Config::load()?;
        let state = CliState {
            ledger: FundLedger::new(config.custodian.clone()),
            asset: InMemoryAsset::new(config.custodian.clone()),
        };
        save_state(&config.state_path, &state)?;
        log::info!("Initialized empty ledger at {}", config.state_path);
        return Ok(());
    }

    let config = Config::load()?;
    let mut state = load_state(&config.state_path)?;
    let caller = cli.caller.clone();

    match cli.command {
        Command::Init => unreachable!("handled above"),
        Command::CreateFund {
            name,
            description,
            symbol,
            references,
        } => {
            let fund_id =
                state
                    .ledger
                    .create_fund(&caller, &name, &description, &symbol, references)?;
            log::info!("Fund {} created by {}", fund_id, caller);
            println!("Created fund {fund_id}");
        }
        Command::CloseFund { fund } => {
            state.ledger.close_fund(&caller, fund)?;
            println!("Closed fund {fund} for deposits and new requests");
        }
        Command::Mint { to, amount } => {
            state.asset.mint(&to, amount);
            println!("Minted {amount} asset units to {to}");
        }
        Command::Approve { amount } => {
            let operator = state.asset.operator().clone();
            state.asset.approve(&caller, &operator, amount);
            println!("Approved {operator} to pull up to {amount} from {caller}");
        }
        Command::Deposit { fund, amount } => {
            state
                .ledger
                .deposit_asset(&mut state.asset, &caller, fund, amount)?;
            let balance = state.ledger.claim_balance(fund, &caller)?;
            log::info!("{} deposited {} into fund {}", caller, amount, fund);
            println!("Deposited {amount} into fund {fund}; claim balance now {balance}");
        }
        Command::TransferClaims { fund, to, amount } => {
            state.ledger.transfer_claims(&caller, fund, &to, amount)?;
            println!("Moved {amount} claims on fund {fund} from {caller} to {to}");
        }
        Command::Request {
            fund,
            amount,
            title,
            references,
        } => {
            let request_id =
                state
                    .ledger
                    .create_withdraw_request(&caller, fund, amount, &title, references)?;
            log::info!("{} filed request {} on fund {}", caller, request_id, fund);
            println!("Filed withdraw request {request_id} on fund {fund}");
        }
        Command::Vote {
            fund,
            request,
            against,
        } => {
            let status = state
                .ledger
                .cast_vote(&mut state.asset, &caller, fund, request, !against)?;
            log::info!(
                "{} voted {} on fund {} request {}",
                caller,
                if against { "against" } else { "for" },
                fund,
                request
            );
            println!("Request {request} is now {status:?}");
        }
        Command::Show { what } => match what {
            ShowWhat::Fund { fund } => {
                let record = state.ledger.fund(fund)?;
                println!("{}", serde_json::to_string_pretty(record)?);
            }
            ShowWhat::Requests { fund } => {
                let record = state.ledger.fund(fund)?;
                println!("{}", serde_json::to_string_pretty(&record.requests)?);
            }
            ShowWhat::Events => {
                println!("{}", serde_json::to_string_pretty(state.ledger.events())?);
            }
        },
        Command::Snapshot { out } => {
            let snapshot = state.ledger.snapshot();
            fs::write(&out, serde_json::to_vec_pretty(&snapshot)?)
                .context(format!("Failed to write snapshot to {}", out))?;
            println!(
                "Snapshot → {} (root {})",
                out,
                hex::encode(snapshot.merkle_root)
            );
        }
    }

    save_state(&config.state_path, &state)?;
    Ok(())
}
