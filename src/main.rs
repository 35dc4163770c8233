use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mintgate_core::{merkle, Account, Digest};
use serde_json::json;
use tracing_subscriber::EnvFilter;

mod access;
mod config;
mod ledger;
mod metadata;
mod store;

use config::{parse_amount, LedgerConfig};
use ledger::{Amount, IssuanceLedger};
use store::StateFile;

//==================== CLI ====================//

#[derive(Parser)]
#[command(name = "mintgate", version, about = "Issuance ledger: paid mint, allowlist claims, authority-gated admin")]
struct Cli {
    /// Ledger state file.
    #[arg(long, global = true, default_value = "mintgate.state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new ledger.
    Init {
        /// Initial authority; overrides the config file.
        #[arg(long)]
        authority: Option<Account>,
        /// JSON file with initial parameters.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        max_supply: Option<u64>,
        /// Unit price: wei, or e.g. `0.01ether`.
        #[arg(long, value_parser = parse_amount)]
        price: Option<Amount>,
        #[arg(long)]
        base_uri: Option<String>,
        /// Replace an existing state file.
        #[arg(long)]
        force: bool,
    },
    /// Paid mint of one unit.
    Mint {
        #[arg(long)]
        caller: Account,
        #[arg(long, value_parser = parse_amount)]
        payment: Amount,
    },
    /// Free allowlist mint.
    FreeMint {
        #[arg(long)]
        caller: Account,
        /// Sibling digests, bottom-up, comma separated.
        #[arg(long, value_delimiter = ',', value_parser = merkle::parse_digest)]
        proof: Vec<Digest>,
    },
    /// Authority batch mint.
    AdminMint {
        #[arg(long)]
        caller: Account,
        #[arg(long)]
        to: Account,
        #[arg(long)]
        count: u64,
    },
    SetRoot {
        #[arg(long)]
        caller: Account,
        #[arg(long, value_parser = merkle::parse_digest)]
        root: Digest,
    },
    SetPrice {
        #[arg(long)]
        caller: Account,
        #[arg(long, value_parser = parse_amount)]
        price: Amount,
    },
    SetMaxSupply {
        #[arg(long)]
        caller: Account,
        #[arg(long)]
        value: u64,
    },
    SetBaseUri {
        #[arg(long)]
        caller: Account,
        #[arg(long)]
        uri: String,
    },
    Pause {
        #[arg(long)]
        caller: Account,
    },
    Resume {
        #[arg(long)]
        caller: Account,
    },
    /// Release treasury funds to the authority.
    Withdraw {
        #[arg(long)]
        caller: Account,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
    TransferAuthority {
        #[arg(long)]
        caller: Account,
        #[arg(long)]
        to: Account,
    },
    Balance {
        account: Account,
    },
    TokenUri {
        unit_id: u64,
    },
    OwnerOf {
        unit_id: u64,
    },
    /// Print ledger parameters and counters.
    Info,
    /// Print the event log.
    Events,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

//==================== commands ====================//

fn init_cmd(
    store: &StateFile,
    authority: Option<Account>,
    config_path: Option<PathBuf>,
    max_supply: Option<u64>,
    price: Option<Amount>,
    base_uri: Option<String>,
    force: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => LedgerConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LedgerConfig::default(),
    };
    if authority.is_some() {
        config.authority = authority;
    }
    if let Some(max_supply) = max_supply {
        config.max_supply = max_supply;
    }
    if let Some(price) = price {
        config.unit_price = price;
    }
    if let Some(base_uri) = base_uri {
        config.base_locator = base_uri;
    }

    let authority = config.authority()?;
    if authority.is_zero() {
        anyhow::bail!("the zero account cannot be the authority");
    }
    let ledger = IssuanceLedger::new(authority, &config);
    store.create(&ledger, force)?;
    tracing::info!(path = %store.path().display(), %authority, "ledger initialised");
    info_cmd(&ledger)
}

/// Load, apply `op`, and persist only if it succeeded. The state lock is held
/// from load to save so concurrent invocations apply one after another.
fn mutate<T>(
    store: &StateFile,
    op: impl FnOnce(&mut IssuanceLedger) -> Result<T, ledger::LedgerError>,
) -> Result<T> {
    let _lock = store.lock()?;
    let mut ledger = store.load()?;
    let out = op(&mut ledger)?;
    store.save(&ledger)?;
    Ok(out)
}

fn info_cmd(ledger: &IssuanceLedger) -> Result<()> {
    print_json(json!({
        "owner": ledger.owner(),
        "total_issued": ledger.total_issued(),
        "max_supply": ledger.max_supply(),
        "unit_price": ledger.unit_price().to_string(),
        "treasury_balance": ledger.treasury_balance().to_string(),
        "paused": ledger.is_paused(),
        "allowlist_root": ledger.allowlist_root().map(|root| merkle::digest_hex(&root)),
        "base_uri": ledger.base_locator(),
    }))
}

fn run(cli: Cli) -> Result<()> {
    let store = StateFile::new(cli.state);
    match cli.command {
        Command::Init {
            authority,
            config,
            max_supply,
            price,
            base_uri,
            force,
        } => init_cmd(&store, authority, config, max_supply, price, base_uri, force),
        Command::Mint { caller, payment } => {
            let unit_id = mutate(&store, |l| l.mint(caller, payment))?;
            print_json(json!({ "minted": unit_id, "account": caller }))
        }
        Command::FreeMint { caller, proof } => {
            let unit_id = mutate(&store, |l| l.free_mint(caller, &proof))?;
            print_json(json!({ "minted": unit_id, "account": caller }))
        }
        Command::AdminMint { caller, to, count } => {
            let start_id = mutate(&store, |l| l.admin_mint(&caller, to, count))?;
            print_json(json!({ "start_id": start_id, "count": count, "account": to }))
        }
        Command::SetRoot { caller, root } => {
            mutate(&store, |l| l.set_allowlist_root(&caller, root))?;
            print_json(json!({ "allowlist_root": merkle::digest_hex(&root) }))
        }
        Command::SetPrice { caller, price } => {
            mutate(&store, |l| l.update_unit_price(&caller, price))?;
            print_json(json!({ "unit_price": price.to_string() }))
        }
        Command::SetMaxSupply { caller, value } => {
            mutate(&store, |l| l.update_max_supply(&caller, value))?;
            print_json(json!({ "max_supply": value }))
        }
        Command::SetBaseUri { caller, uri } => {
            mutate(&store, |l| l.set_base_locator(&caller, uri.clone()))?;
            print_json(json!({ "base_uri": uri }))
        }
        Command::Pause { caller } => {
            mutate(&store, |l| l.pause(&caller))?;
            print_json(json!({ "paused": true }))
        }
        Command::Resume { caller } => {
            mutate(&store, |l| l.resume(&caller))?;
            print_json(json!({ "paused": false }))
        }
        Command::Withdraw { caller, amount } => {
            let payout = mutate(&store, |l| l.withdraw(&caller, amount))?;
            print_json(json!({ "to": payout.to, "amount": payout.amount.to_string() }))
        }
        Command::TransferAuthority { caller, to } => {
            mutate(&store, |l| l.transfer_authority(&caller, to))?;
            print_json(json!({ "owner": to }))
        }
        Command::Balance { account } => {
            let ledger = store.load()?;
            print_json(json!({ "account": account, "balance": ledger.balance_of(&account) }))
        }
        Command::TokenUri { unit_id } => {
            let uri = store.load()?.token_uri(unit_id)?;
            print_json(json!({ "unit_id": unit_id, "token_uri": uri }))
        }
        Command::OwnerOf { unit_id } => {
            let owner = store.load()?.owner_of(unit_id)?;
            print_json(json!({ "unit_id": unit_id, "owner": owner }))
        }
        Command::Info => info_cmd(&store.load()?),
        Command::Events => print_json(serde_json::to_value(store.load()?.events())?),
    }
}

fn main() -> Result<()> {
    init_tracing();
    run(Cli::parse())
}
