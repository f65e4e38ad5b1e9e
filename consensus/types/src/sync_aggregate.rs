use crate::{BitVector, EthSpec, SignatureBytes};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Aggregated sync committee votes carried in an Altair (or later) block body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "E: EthSpec")]
pub struct SyncAggregate<E: EthSpec> {
    pub sync_committee_bits: BitVector<E::SyncCommitteeSize>,
    pub sync_committee_signature: SignatureBytes,
}

impl<E: EthSpec> Default for SyncAggregate<E> {
    fn default() -> Self {
        Self {
            sync_committee_bits: BitVector::default(),
            sync_committee_signature: SignatureBytes::empty(),
        }
    }
}
