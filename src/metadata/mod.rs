use serde::{Deserialize, Serialize};

use crate::ledger::UnitId;

/// Appended to every unit descriptor.
pub const METADATA_SUFFIX: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unit {unit_id} does not exist")]
pub struct NotFound {
    pub unit_id: UnitId,
}

/// Maps unit ids to descriptor locators under a configurable base.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataResolver {
    base_locator: String,
}

impl MetadataResolver {
    pub fn new(base_locator: impl Into<String>) -> Self {
        Self {
            base_locator: base_locator.into(),
        }
    }

    pub fn base_locator(&self) -> &str {
        &self.base_locator
    }

    pub fn set_base_locator(&mut self, base_locator: impl Into<String>) {
        self.base_locator = base_locator.into();
    }

    /// `base + id + ".json"` for an issued unit. Units are numbered from zero,
    /// so `unit_id` exists iff it is below `total_issued`. With no base
    /// configured the descriptor is empty.
    pub fn describe(&self, unit_id: UnitId, total_issued: u64) -> Result<String, NotFound> {
        if unit_id >= total_issued {
            return Err(NotFound { unit_id });
        }
        if self.base_locator.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{}{}{}", self.base_locator, unit_id, METADATA_SUFFIX))
    }
}
