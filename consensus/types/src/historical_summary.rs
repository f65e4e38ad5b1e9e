use crate::Hash256;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Capella replacement for `historical_roots`: summarises a completed era of
/// block and state roots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct HistoricalSummary {
    pub block_summary_root: Hash256,
    pub state_summary_root: Hash256,
}
