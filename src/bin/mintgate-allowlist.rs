use std::{collections::BTreeMap, fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mintgate_core::{
    merkle::{self, serde_digest_vec},
    Account, AllowlistTree, Digest,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Off-line allowlist tooling: commits a list of accounts to a Merkle root and
/// hands out the per-account proofs `mintgate free-mint` expects.
#[derive(Parser)]
#[command(name = "mintgate-allowlist", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the tree over an account list (one `0x…` account per line,
    /// `#` comments allowed) and print root and proofs as JSON.
    Build {
        accounts: PathBuf,
        /// Write the JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check one account's proof against a root.
    Verify {
        #[arg(long, value_parser = merkle::parse_digest)]
        root: Digest,
        #[arg(long)]
        account: Account,
        #[arg(long, value_delimiter = ',', value_parser = merkle::parse_digest)]
        proof: Vec<Digest>,
    },
}

#[derive(Serialize)]
struct AllowlistManifest {
    root: String,
    size: usize,
    proofs: BTreeMap<Account, ProofEntry>,
}

#[derive(Serialize)]
struct ProofEntry {
    #[serde(with = "serde_digest_vec")]
    proof: Vec<Digest>,
}

fn read_accounts(path: &PathBuf) -> Result<Vec<Account>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut accounts = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let account: Account = line
            .parse()
            .with_context(|| format!("{}:{}: bad account", path.display(), lineno + 1))?;
        if accounts.contains(&account) {
            tracing::warn!(%account, line = lineno + 1, "duplicate account skipped");
            continue;
        }
        accounts.push(account);
    }
    Ok(accounts)
}

fn build_manifest(accounts: &[Account]) -> Result<AllowlistManifest> {
    let tree = AllowlistTree::from_accounts(accounts);
    let root = tree.root_hex().context("allowlist is empty")?;
    let mut proofs = BTreeMap::new();
    for (index, account) in accounts.iter().enumerate() {
        let proof = tree.proof(index)?;
        proofs.insert(
            *account,
            ProofEntry {
                proof: proof.siblings,
            },
        );
    }
    Ok(AllowlistManifest {
        root,
        size: accounts.len(),
        proofs,
    })
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Build { accounts, out } => {
            let accounts = read_accounts(&accounts)?;
            let manifest = build_manifest(&accounts)?;
            tracing::info!(root = %manifest.root, size = manifest.size, "allowlist built");
            let json = serde_json::to_string_pretty(&manifest)?;
            match out {
                Some(path) => {
                    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?
                }
                None => println!("{json}"),
            }
        }
        Command::Verify {
            root,
            account,
            proof,
        } => {
            let valid = merkle::verify(&root, &account.leaf(), &proof);
            println!("{}", serde_json::json!({ "account": account, "valid": valid }));
            if !valid {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
