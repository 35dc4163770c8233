use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::merkle::{keccak256, Digest};

/// A 20-byte account identifier supplied by the host's authentication layer.
///
/// Accounts render as `0x`-prefixed lowercase hex and serialize the same way,
/// which keeps them usable as JSON map keys.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Account(pub [u8; 20]);

impl Account {
    /// The all-zero account. Never a valid authority.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Build an account from a slice, rejecting anything but 20 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CoreError> {
        let bytes: [u8; 20] = slice
            .try_into()
            .map_err(|_| CoreError::InvalidAccount(slice.len()))?;
        Ok(Self(bytes))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Allowlist leaf for this account: `keccak256(raw account bytes)`.
    pub fn leaf(&self) -> Digest {
        keccak256(&self.0)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Account {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| CoreError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for Account {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Account {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_prefix() {
        let a: Account = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        let b: Account = "00000000000000000000000000000000000000FF".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.0[19], 0xff);
        assert_eq!(a.to_string(), "0x00000000000000000000000000000000000000ff");
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            "0x1234".parse::<Account>(),
            Err(CoreError::InvalidAccount(2))
        );
        assert!(matches!(
            "0xzz".parse::<Account>(),
            Err(CoreError::InvalidHex(_))
        ));
    }

    #[test]
    fn serializes_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Account([7u8; 20]), 3u64);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            "{\"0x0707070707070707070707070707070707070707\":3}"
        );
        let back: std::collections::BTreeMap<Account, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn leaf_is_keccak_of_raw_bytes() {
        let account = Account([1u8; 20]);
        assert_eq!(account.leaf(), keccak256(&[1u8; 20]));
        assert!(Account::ZERO.is_zero());
        assert!(!account.is_zero());
    }
}
