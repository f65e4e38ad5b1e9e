use crate::Hash256;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Contains data obtained from the Eth1 chain.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Hash, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct Eth1Data {
    pub deposit_root: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub deposit_count: u64,
    pub block_hash: Hash256,
}
