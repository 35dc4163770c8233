use std::path::Path;

use mintgate_core::Account;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::ledger::Amount;

pub const DEFAULT_MAX_SUPPLY: u64 = 50;
pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;
const ETHER_DECIMALS: usize = 18;

/// 0.01 ether.
pub fn default_unit_price() -> Amount {
    U256::from(WEI_PER_ETHER / 100)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config")]
    Io(#[from] std::io::Error),
    #[error("malformed config")]
    Json(#[from] serde_json::Error),
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    #[error("no authority configured")]
    MissingAuthority,
}

/// Initial ledger parameters. Every field is optional in the JSON file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    pub authority: Option<Account>,
    pub max_supply: u64,
    pub unit_price: Amount,
    pub base_locator: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            authority: None,
            max_supply: DEFAULT_MAX_SUPPLY,
            unit_price: default_unit_price(),
            base_locator: String::new(),
        }
    }
}

impl LedgerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn authority(&self) -> Result<Account, ConfigError> {
        self.authority.ok_or(ConfigError::MissingAuthority)
    }
}

/// Parse a wei amount. Plain integers are wei; a trailing `ether`/`eth`
/// accepts up to 18 decimals (`"0.01ether"`).
pub fn parse_amount(input: &str) -> Result<Amount, ConfigError> {
    let invalid = || ConfigError::InvalidAmount(input.to_string());
    let s = input.trim();
    let ether = s
        .strip_suffix("ether")
        .or_else(|| s.strip_suffix("eth"))
        .map(str::trim);

    let digits = match ether {
        None => s.to_string(),
        Some(value) => {
            let (whole, frac) = value.split_once('.').unwrap_or((value, ""));
            if frac.len() > ETHER_DECIMALS || (whole.is_empty() && frac.is_empty()) {
                return Err(invalid());
            }
            let whole = if whole.is_empty() { "0" } else { whole };
            format!("{whole}{frac:0<width$}", width = ETHER_DECIMALS)
        }
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    U256::from_dec_str(&digits).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_collection_launch_parameters() {
        let config = LedgerConfig::default();
        assert_eq!(config.max_supply, 50);
        assert_eq!(config.unit_price, U256::from(10_000_000_000_000_000u64));
        assert!(config.base_locator.is_empty());
        assert!(matches!(config.authority(), Err(ConfigError::MissingAuthority)));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: LedgerConfig = serde_json::from_str(
            r#"{"authority":"0x0101010101010101010101010101010101010101","max_supply":100}"#,
        )
        .unwrap();
        assert_eq!(config.max_supply, 100);
        assert_eq!(config.unit_price, default_unit_price());
        assert_eq!(config.authority().unwrap(), Account([1u8; 20]));
    }

    #[test]
    fn read_error_is_rendered_once() {
        let err = ConfigError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(format!("{:#}", anyhow::Error::from(err)), "failed to read config: gone");
    }

    #[test]
    fn parses_wei_and_ether_amounts() {
        assert_eq!(parse_amount("42").unwrap(), U256::from(42));
        assert_eq!(parse_amount("0.01ether").unwrap(), default_unit_price());
        assert_eq!(parse_amount("1 eth").unwrap(), U256::from(WEI_PER_ETHER));
        assert_eq!(parse_amount(".5ether").unwrap(), U256::from(WEI_PER_ETHER / 2));
        assert_eq!(parse_amount("2ether").unwrap(), U256::from(2 * WEI_PER_ETHER));
    }

    #[test]
    fn rejects_garbage_amounts() {
        for bad in ["", "ether", "-1", "1.5", "0.0000000000000000001ether", "abc"] {
            assert!(parse_amount(bad).is_err(), "{bad}");
        }
    }
}
