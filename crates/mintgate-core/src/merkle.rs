use hex::ToHex;
use rs_merkle::{Hasher, MerkleTree};
use serde::{Deserialize, Serialize};
use sha3::{Digest as _, Keccak256};

use crate::account::Account;
use crate::error::CoreError;

/// A 32-byte Keccak-256 digest.
pub type Digest = [u8; 32];

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> Digest {
    Keccak256::digest(data).into()
}

/// Hash two nodes after ordering them lexicographically.
///
/// Ordering the pair makes a proof independent of whether a node sat on the
/// left or right, so proofs carry no position bits. Builder and verifier must
/// both go through this function.
pub fn hash_pair(a: &Digest, b: &Digest) -> Digest {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Keccak256::new();
    hasher.update(lo);
    hasher.update(hi);
    hasher.finalize().into()
}

/// Keccak-256 hasher compatible with `rs_merkle`, using sorted pairs.
#[derive(Debug, Clone, Copy)]
pub struct SortedKeccak;

impl Hasher for SortedKeccak {
    type Hash = Digest;

    fn hash(data: &[u8]) -> Self::Hash {
        keccak256(data)
    }

    fn concat_and_hash(left: &Self::Hash, right: Option<&Self::Hash>) -> Self::Hash {
        match right {
            Some(right) => hash_pair(left, right),
            // odd node at the end of a layer is promoted unchanged
            None => *left,
        }
    }
}

/// Recompute a root from `leaf` and `proof` and compare it with `root`.
///
/// An empty proof only verifies a single-leaf tree, where the leaf is the root.
pub fn verify(root: &Digest, leaf: &Digest, proof: &[Digest]) -> bool {
    let computed = proof
        .iter()
        .fold(*leaf, |node, sibling| hash_pair(&node, sibling));
    tracing::debug!(
        root = %hex::encode(root),
        leaf = %hex::encode(leaf),
        depth = proof.len(),
        "recomputed merkle root"
    );
    computed == *root
}

/// Like [`verify`] but over raw byte slices. Any element that is not exactly
/// 32 bytes makes the whole check fail.
pub fn verify_slices<R, L, P>(root: R, leaf: L, proof: &[P]) -> bool
where
    R: AsRef<[u8]>,
    L: AsRef<[u8]>,
    P: AsRef<[u8]>,
{
    let Ok(root) = to_digest(root.as_ref()) else {
        return false;
    };
    let Ok(leaf) = to_digest(leaf.as_ref()) else {
        return false;
    };
    let mut siblings = Vec::with_capacity(proof.len());
    for element in proof {
        match to_digest(element.as_ref()) {
            Ok(digest) => siblings.push(digest),
            Err(_) => return false,
        }
    }
    verify(&root, &leaf, &siblings)
}

fn to_digest(bytes: &[u8]) -> Result<Digest, CoreError> {
    bytes
        .try_into()
        .map_err(|_| CoreError::InvalidDigest(bytes.len()))
}

/// Parse a `0x`-optional hex string into a digest.
pub fn parse_digest(s: &str) -> Result<Digest, CoreError> {
    let s = s.trim();
    let raw = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(raw).map_err(|e| CoreError::InvalidHex(e.to_string()))?;
    to_digest(&bytes)
}

/// Render a digest as `0x`-prefixed hex.
pub fn digest_hex(digest: &Digest) -> String {
    format!("0x{}", digest.encode_hex::<String>())
}

/// Inclusion proof for one allowlist leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    #[serde(with = "serde_digest")]
    pub leaf: Digest,
    /// Sibling digests, bottom-up.
    #[serde(with = "serde_digest_vec")]
    pub siblings: Vec<Digest>,
}

impl MerkleProof {
    pub fn verify(&self, root: &Digest) -> bool {
        verify(root, &self.leaf, &self.siblings)
    }
}

/// Sorted-pair Keccak Merkle tree over allowlist leaves.
#[derive(Clone, Debug)]
pub struct AllowlistTree {
    leaves: Vec<Digest>,
    root: Option<Digest>,
}

impl AllowlistTree {
    /// Build a tree from pre-hashed leaves, kept in input order.
    pub fn from_leaves(leaves: Vec<Digest>) -> Self {
        let tree = MerkleTree::<SortedKeccak>::from_leaves(&leaves);
        Self {
            root: tree.root(),
            leaves,
        }
    }

    /// Hash each account into its leaf and build the tree.
    pub fn from_accounts(accounts: &[Account]) -> Self {
        Self::from_leaves(accounts.iter().map(Account::leaf).collect())
    }

    /// The root, if any leaves were provided.
    pub fn root(&self) -> Option<Digest> {
        self.root
    }

    pub fn root_hex(&self) -> Option<String> {
        self.root.as_ref().map(digest_hex)
    }

    /// Proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<MerkleProof, CoreError> {
        let leaf = *self
            .leaves
            .get(index)
            .ok_or_else(|| CoreError::Merkle("leaf index out of range".into()))?;
        let tree = MerkleTree::<SortedKeccak>::from_leaves(&self.leaves);
        Ok(MerkleProof {
            leaf,
            siblings: tree.proof(&[index]).proof_hashes().to_vec(),
        })
    }

    /// Proof for `account`, if it is one of the leaves.
    pub fn proof_for(&self, account: &Account) -> Result<MerkleProof, CoreError> {
        let leaf = account.leaf();
        let index = self
            .leaves
            .iter()
            .position(|candidate| *candidate == leaf)
            .ok_or_else(|| CoreError::Merkle(format!("{account} is not in the allowlist")))?;
        self.proof(index)
    }
}

/// Serde adapter storing a digest as `0x` hex.
pub mod serde_digest {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::{digest_hex, parse_digest, Digest};

    pub fn serialize<S>(value: &Digest, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&digest_hex(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Digest, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        parse_digest(&encoded).map_err(D::Error::custom)
    }
}

/// Serde adapter storing a list of digests as `0x` hex strings.
pub mod serde_digest_vec {
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    use super::{digest_hex, parse_digest, Digest};

    pub fn serialize<S>(value: &[Digest], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(value.len()))?;
        for digest in value {
            seq.serialize_element(&digest_hex(digest))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Digest>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| parse_digest(s).map_err(D::Error::custom))
            .collect()
    }
}
