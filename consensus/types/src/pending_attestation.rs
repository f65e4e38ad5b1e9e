use crate::{AttestationData, BitList, EthSpec, Slot};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// An attestation that has been included in the state but not yet fully
/// processed. Only exists in the genesis-fork state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "E: EthSpec")]
pub struct PendingAttestation<E: EthSpec> {
    pub aggregation_bits: BitList<E::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub inclusion_delay: Slot,
    #[serde(with = "serde_utils::quoted_u64")]
    pub proposer_index: u64,
}

impl<E: EthSpec> Default for PendingAttestation<E> {
    fn default() -> Self {
        Self {
            aggregation_bits: BitList::with_capacity(0).unwrap(),
            data: AttestationData::default(),
            inclusion_delay: Slot::new(0),
            proposer_index: 0,
        }
    }
}
