use std::collections::{BTreeMap, BTreeSet};

use mintgate_core::{merkle, Account, Digest};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::access::{AccessGate, Unauthorized};
use crate::config::LedgerConfig;
use crate::metadata::{MetadataResolver, NotFound};

/// Native-currency amount in its smallest unit (wei).
pub type Amount = U256;
/// Sequential unit identifier, starting at zero.
pub type UnitId = u64;

const UNSET_ROOT: Digest = [0u8; 32];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("incorrect price: expected {expected} wei, got {got} wei")]
    WrongPayment { expected: Amount, got: Amount },
    #[error("max supply of {max_supply} reached")]
    SupplyExhausted { max_supply: u64 },
    #[error("minting {requested} would exceed max supply ({issued}/{max_supply} issued)")]
    SupplyExceeded {
        requested: u64,
        issued: u64,
        max_supply: u64,
    },
    #[error("minting is paused")]
    MintingPaused,
    #[error("account {account} is not whitelisted")]
    NotWhitelisted { account: Account },
    #[error("account {account} already claimed its free unit")]
    AlreadyClaimed { account: Account },
    #[error(transparent)]
    Unauthorized(#[from] Unauthorized),
    #[error("insufficient treasury: requested {requested} wei, available {available} wei")]
    InsufficientTreasury { requested: Amount, available: Amount },
    #[error("treasury balance would overflow")]
    TreasuryOverflow,
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error("max supply {requested} is below the {issued} units already issued")]
    MaxSupplyBelowIssued { requested: u64, issued: u64 },
    #[error("the zero account cannot hold the authority role")]
    InvalidAuthority,
    #[error("batch mint count must be positive")]
    InvalidCount,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Minted {
        account: Account,
        unit_id: UnitId,
    },
    BatchMinted {
        account: Account,
        start_id: UnitId,
        count: u64,
    },
    Withdrawn {
        to: Account,
        amount: Amount,
    },
    AuthorityTransferred {
        previous: Account,
        current: Account,
    },
}

/// Funds released by [`IssuanceLedger::withdraw`] for the host to send.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payout {
    pub to: Account,
    pub amount: Amount,
}

/// Authority-controlled issuance ledger for a single finite collection.
///
/// Every operation checks all of its preconditions before the first write,
/// so a rejected call leaves the ledger exactly as it was and emits nothing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuanceLedger {
    total_issued: u64,
    max_supply: u64,
    unit_price: Amount,
    paused: bool,
    #[serde(with = "merkle::serde_digest")]
    allowlist_root: Digest,
    treasury_balance: Amount,
    balances: BTreeMap<Account, u64>,
    claimed: BTreeSet<Account>,
    /// First unit of each ownership run. A unit belongs to the nearest run
    /// start at or below it.
    ownership: BTreeMap<UnitId, Account>,
    gate: AccessGate,
    metadata: MetadataResolver,
    events: Vec<LedgerEvent>,
}

impl IssuanceLedger {
    pub fn new(authority: Account, config: &LedgerConfig) -> Self {
        Self {
            total_issued: 0,
            max_supply: config.max_supply,
            unit_price: config.unit_price,
            paused: false,
            allowlist_root: UNSET_ROOT,
            treasury_balance: Amount::zero(),
            balances: BTreeMap::new(),
            claimed: BTreeSet::new(),
            ownership: BTreeMap::new(),
            gate: AccessGate::new(authority),
            metadata: MetadataResolver::new(config.base_locator.clone()),
            events: Vec::new(),
        }
    }

    // ---------------------------------------------------------------- reads

    pub fn balance_of(&self, account: &Account) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn max_supply(&self) -> u64 {
        self.max_supply
    }

    pub fn total_issued(&self) -> u64 {
        self.total_issued
    }

    pub fn unit_price(&self) -> Amount {
        self.unit_price
    }

    pub fn treasury_balance(&self) -> Amount {
        self.treasury_balance
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The committed allowlist root, or `None` before one is set.
    pub fn allowlist_root(&self) -> Option<Digest> {
        (self.allowlist_root != UNSET_ROOT).then_some(self.allowlist_root)
    }

    pub fn has_claimed(&self, account: &Account) -> bool {
        self.claimed.contains(account)
    }

    pub fn owner(&self) -> Account {
        self.gate.authority()
    }

    pub fn base_locator(&self) -> &str {
        self.metadata.base_locator()
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn token_uri(&self, unit_id: UnitId) -> Result<String, LedgerError> {
        Ok(self.metadata.describe(unit_id, self.total_issued)?)
    }

    pub fn owner_of(&self, unit_id: UnitId) -> Result<Account, LedgerError> {
        if unit_id >= self.total_issued {
            return Err(NotFound { unit_id }.into());
        }
        self.ownership
            .range(..=unit_id)
            .next_back()
            .map(|(_, owner)| *owner)
            .ok_or_else(|| NotFound { unit_id }.into())
    }

    // -------------------------------------------------------------- minting

    /// Paid public mint of one unit. Returns the issued unit id.
    pub fn mint(&mut self, account: Account, payment: Amount) -> Result<UnitId, LedgerError> {
        if self.paused {
            return Err(LedgerError::MintingPaused);
        }
        if payment != self.unit_price {
            return Err(LedgerError::WrongPayment {
                expected: self.unit_price,
                got: payment,
            });
        }
        self.ensure_one_left()?;
        let treasury = self
            .treasury_balance
            .checked_add(payment)
            .ok_or(LedgerError::TreasuryOverflow)?;

        let unit_id = self.issue(account, 1);
        self.treasury_balance = treasury;
        self.emit(LedgerEvent::Minted { account, unit_id });
        Ok(unit_id)
    }

    /// Free mint for allowlisted accounts, one claim per account.
    pub fn free_mint(&mut self, account: Account, proof: &[Digest]) -> Result<UnitId, LedgerError> {
        if self.paused {
            return Err(LedgerError::MintingPaused);
        }
        let member = self
            .allowlist_root()
            .is_some_and(|root| merkle::verify(&root, &account.leaf(), proof));
        if !member {
            tracing::warn!(%account, "allowlist proof rejected");
            return Err(LedgerError::NotWhitelisted { account });
        }
        if self.claimed.contains(&account) {
            return Err(LedgerError::AlreadyClaimed { account });
        }
        self.ensure_one_left()?;

        let unit_id = self.issue(account, 1);
        self.claimed.insert(account);
        self.emit(LedgerEvent::Minted { account, unit_id });
        Ok(unit_id)
    }

    /// Authority-only batch mint of `count` units to `account`. Returns the
    /// first issued unit id.
    pub fn admin_mint(
        &mut self,
        caller: &Account,
        account: Account,
        count: u64,
    ) -> Result<UnitId, LedgerError> {
        self.gate.authorize(caller)?;
        if count == 0 {
            return Err(LedgerError::InvalidCount);
        }
        let fits = self
            .total_issued
            .checked_add(count)
            .is_some_and(|after| after <= self.max_supply);
        if !fits {
            return Err(LedgerError::SupplyExceeded {
                requested: count,
                issued: self.total_issued,
                max_supply: self.max_supply,
            });
        }

        let start_id = self.issue(account, count);
        self.emit(LedgerEvent::BatchMinted {
            account,
            start_id,
            count,
        });
        Ok(start_id)
    }

    // ---------------------------------------------------------- parameters

    pub fn set_allowlist_root(&mut self, caller: &Account, root: Digest) -> Result<(), LedgerError> {
        self.gate.authorize(caller)?;
        self.allowlist_root = root;
        tracing::info!(root = %merkle::digest_hex(&root), "allowlist root updated");
        Ok(())
    }

    pub fn update_unit_price(&mut self, caller: &Account, price: Amount) -> Result<(), LedgerError> {
        self.gate.authorize(caller)?;
        self.unit_price = price;
        tracing::info!(%price, "unit price updated");
        Ok(())
    }

    pub fn update_max_supply(&mut self, caller: &Account, max_supply: u64) -> Result<(), LedgerError> {
        self.gate.authorize(caller)?;
        if max_supply < self.total_issued {
            return Err(LedgerError::MaxSupplyBelowIssued {
                requested: max_supply,
                issued: self.total_issued,
            });
        }
        self.max_supply = max_supply;
        tracing::info!(max_supply, "max supply updated");
        Ok(())
    }

    pub fn set_base_locator(&mut self, caller: &Account, base: String) -> Result<(), LedgerError> {
        self.gate.authorize(caller)?;
        tracing::info!(base = %base, "base locator updated");
        self.metadata.set_base_locator(base);
        Ok(())
    }

    pub fn pause(&mut self, caller: &Account) -> Result<(), LedgerError> {
        self.gate.authorize(caller)?;
        self.paused = true;
        tracing::info!("minting paused");
        Ok(())
    }

    pub fn resume(&mut self, caller: &Account) -> Result<(), LedgerError> {
        self.gate.authorize(caller)?;
        self.paused = false;
        tracing::info!("minting resumed");
        Ok(())
    }

    // ------------------------------------------------------------- treasury

    /// Release `amount` from the treasury to the authority.
    pub fn withdraw(&mut self, caller: &Account, amount: Amount) -> Result<Payout, LedgerError> {
        self.gate.authorize(caller)?;
        if amount > self.treasury_balance {
            return Err(LedgerError::InsufficientTreasury {
                requested: amount,
                available: self.treasury_balance,
            });
        }
        self.treasury_balance -= amount;
        let to = self.gate.authority();
        self.emit(LedgerEvent::Withdrawn { to, amount });
        Ok(Payout { to, amount })
    }

    pub fn transfer_authority(&mut self, caller: &Account, next: Account) -> Result<(), LedgerError> {
        self.gate.authorize(caller)?;
        if next.is_zero() {
            return Err(LedgerError::InvalidAuthority);
        }
        let previous = self.gate.transfer(caller, next)?;
        self.emit(LedgerEvent::AuthorityTransferred {
            previous,
            current: next,
        });
        Ok(())
    }

    // -------------------------------------------------------------- helpers

    fn ensure_one_left(&self) -> Result<(), LedgerError> {
        if self.total_issued >= self.max_supply {
            return Err(LedgerError::SupplyExhausted {
                max_supply: self.max_supply,
            });
        }
        Ok(())
    }

    /// Callers have already checked the cap.
    fn issue(&mut self, account: Account, count: u64) -> UnitId {
        let start_id = self.total_issued;
        let continues_run = self
            .ownership
            .range(..start_id)
            .next_back()
            .is_some_and(|(_, owner)| *owner == account);
        if !continues_run {
            self.ownership.insert(start_id, account);
        }
        self.total_issued += count;
        *self.balances.entry(account).or_default() += count;
        start_id
    }

    fn emit(&mut self, event: LedgerEvent) {
        tracing::info!(?event, "ledger event");
        self.events.push(event);
    }
}
