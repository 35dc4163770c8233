use mintgate_core::Account;
use serde::{Deserialize, Serialize};

/// Raised when a non-authority account calls an administrative operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("caller {caller} is not the authority")]
pub struct Unauthorized {
    pub caller: Account,
}

/// Holds the single account allowed to administer the ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessGate {
    authority: Account,
}

impl AccessGate {
    pub fn new(authority: Account) -> Self {
        Self { authority }
    }

    pub fn authority(&self) -> Account {
        self.authority
    }

    /// Succeeds only for the current authority. Administrative entry points
    /// call this before touching any state.
    pub fn authorize(&self, caller: &Account) -> Result<(), Unauthorized> {
        if *caller != self.authority {
            tracing::warn!(%caller, authority = %self.authority, "rejected administrative call");
            return Err(Unauthorized { caller: *caller });
        }
        Ok(())
    }

    /// Hand the role to `next` and return the previous holder.
    pub fn transfer(&mut self, caller: &Account, next: Account) -> Result<Account, Unauthorized> {
        self.authorize(caller)?;
        Ok(std::mem::replace(&mut self.authority, next))
    }
}
