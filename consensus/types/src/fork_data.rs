use crate::{ForkVersion, Hash256};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Container hashed to derive signing domains from a fork version and the
/// genesis validators root.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct ForkData {
    #[serde(with = "serde_utils::bytes_4_hex")]
    pub current_version: ForkVersion,
    pub genesis_validators_root: Hash256,
}
