use crate::{Hash256, VersionedHash};
use ethereum_hashing::hash;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use ssz::{Decode, DecodeError, Encode};
use std::fmt;
use std::str::FromStr;
use tree_hash::{PackedEncoding, TreeHash, TreeHashType};

pub const BYTES_PER_COMMITMENT: usize = 48;

/// Version byte prefixing the hash of a KZG commitment when it is referenced
/// from the execution layer.
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// Commitment to a data blob carried by a Deneb block.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KzgCommitment(pub [u8; BYTES_PER_COMMITMENT]);

impl KzgCommitment {
    /// Hash of the commitment with its leading byte replaced by the KZG
    /// version marker. Pure and order-independent; used to cross-reference
    /// blobs from execution payloads.
    pub fn calculate_versioned_hash(&self) -> VersionedHash {
        let mut versioned_hash = hash(&self.0);
        versioned_hash[0] = VERSIONED_HASH_VERSION_KZG;
        Hash256::from_slice(&versioned_hash)
    }

}

impl fmt::Display for KzgCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_utils::hex::encode(self.0))
    }
}

impl fmt::Debug for KzgCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KzgCommitment({})", self)
    }
}

impl FromStr for KzgCommitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = serde_utils::hex::decode(s).map_err(|e| format!("{:?}", e))?;
        if bytes.len() != BYTES_PER_COMMITMENT {
            return Err(format!(
                "invalid commitment length: expected {}, got {}",
                BYTES_PER_COMMITMENT,
                bytes.len()
            ));
        }
        let mut out = [0; BYTES_PER_COMMITMENT];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl Serialize for KzgCommitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KzgCommitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(D::Error::custom)
    }
}

impl Encode for KzgCommitment {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        BYTES_PER_COMMITMENT
    }

    fn ssz_bytes_len(&self) -> usize {
        BYTES_PER_COMMITMENT
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0)
    }
}

impl Decode for KzgCommitment {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        BYTES_PER_COMMITMENT
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != BYTES_PER_COMMITMENT {
            return Err(DecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: BYTES_PER_COMMITMENT,
            });
        }
        let mut out = [0; BYTES_PER_COMMITMENT];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }
}

impl TreeHash for KzgCommitment {
    fn tree_hash_type() -> TreeHashType {
        TreeHashType::Vector
    }

    fn tree_hash_packed_encoding(&self) -> PackedEncoding {
        unreachable!("Vector should never be packed.")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("Vector should never be packed.")
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        tree_hash::merkle_root(&self.0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_hash_replaces_leading_byte() {
        let commitment = KzgCommitment([0x1b; BYTES_PER_COMMITMENT]);
        let versioned_hash = commitment.calculate_versioned_hash();

        let content_hash = hash(&commitment.0);
        assert_eq!(versioned_hash[0], VERSIONED_HASH_VERSION_KZG);
        assert_eq!(&versioned_hash.as_slice()[1..], &content_hash[1..]);
    }

    #[test]
    fn versioned_hash_is_deterministic() {
        let commitment = KzgCommitment([0x7f; BYTES_PER_COMMITMENT]);
        assert_eq!(
            commitment.calculate_versioned_hash(),
            commitment.calculate_versioned_hash()
        );
    }

    #[test]
    fn hex_serde_round_trip() {
        let commitment = KzgCommitment([0x0c; BYTES_PER_COMMITMENT]);
        let json = serde_json::to_string(&commitment).unwrap();
        assert_eq!(
            serde_json::from_str::<KzgCommitment>(&json).unwrap(),
            commitment
        );
    }
}
