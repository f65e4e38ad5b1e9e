use crate::beacon_state::Error;
use crate::{
    BeaconBlockAltair, BeaconBlockBase, BeaconBlockBellatrix, BeaconBlockCapella, BeaconBlockDeneb,
    BeaconBlockHeader, BeaconBlockRef, ChainSpec, EthSpec, ExecutionPayloadRef, ForkName,
    ForkVersionDeserialize, Hash256, InconsistentFork, KzgCommitments, SignatureBytes, Slot,
    VersionedHash, Withdrawals,
};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use superstruct::superstruct;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// A signed header of a `BeaconBlock`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct SignedBeaconBlockHeader {
    pub message: BeaconBlockHeader,
    pub signature: SignatureBytes,
}

/// A `BeaconBlock` and a signature from its proposer.
#[superstruct(
    variants(Base, Altair, Bellatrix, Capella, Deneb),
    variant_attributes(
        derive(
            Debug,
            Clone,
            PartialEq,
            Default,
            Serialize,
            Deserialize,
            Encode,
            Decode,
            TreeHash,
        ),
        serde(bound = "E: EthSpec", deny_unknown_fields),
    ),
    cast_error(ty = "Error", expr = "Error::IncorrectBlockVariant"),
    partial_getter_error(ty = "Error", expr = "Error::IncorrectBlockVariant")
)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, TreeHash)]
#[serde(bound = "E: EthSpec", untagged)]
#[tree_hash(enum_behaviour = "transparent")]
#[ssz(enum_behaviour = "transparent")]
pub struct SignedBeaconBlock<E: EthSpec> {
    #[superstruct(only(Base), partial_getter(rename = "message_base"))]
    pub message: BeaconBlockBase<E>,
    #[superstruct(only(Altair), partial_getter(rename = "message_altair"))]
    pub message: BeaconBlockAltair<E>,
    #[superstruct(only(Bellatrix), partial_getter(rename = "message_bellatrix"))]
    pub message: BeaconBlockBellatrix<E>,
    #[superstruct(only(Capella), partial_getter(rename = "message_capella"))]
    pub message: BeaconBlockCapella<E>,
    #[superstruct(only(Deneb), partial_getter(rename = "message_deneb"))]
    pub message: BeaconBlockDeneb<E>,
    pub signature: SignatureBytes,
}

impl<E: EthSpec> SignedBeaconBlock<E> {
    /// Accessor for the block's `message` field as a ref.
    pub fn message(&self) -> BeaconBlockRef<'_, E> {
        match self {
            SignedBeaconBlock::Base(inner) => BeaconBlockRef::Base(&inner.message),
            SignedBeaconBlock::Altair(inner) => BeaconBlockRef::Altair(&inner.message),
            SignedBeaconBlock::Bellatrix(inner) => BeaconBlockRef::Bellatrix(&inner.message),
            SignedBeaconBlock::Capella(inner) => BeaconBlockRef::Capella(&inner.message),
            SignedBeaconBlock::Deneb(inner) => BeaconBlockRef::Deneb(&inner.message),
        }
    }

    /// Returns the name of the fork dictated by the block's own variant.
    pub fn fork_name_unchecked(&self) -> ForkName {
        match self {
            SignedBeaconBlock::Base(_) => ForkName::Base,
            SignedBeaconBlock::Altair(_) => ForkName::Altair,
            SignedBeaconBlock::Bellatrix(_) => ForkName::Bellatrix,
            SignedBeaconBlock::Capella(_) => ForkName::Capella,
            SignedBeaconBlock::Deneb(_) => ForkName::Deneb,
        }
    }

    /// Returns the name of the fork pertaining to `self`.
    ///
    /// Will return an `Err` if `self` has been instantiated to a variant
    /// conflicting with the fork dictated by `self.slot()`.
    pub fn fork_name(&self, spec: &ChainSpec) -> Result<ForkName, InconsistentFork> {
        let fork_at_slot = spec.fork_name_at_slot(self.slot(), E::slots_per_epoch());
        let object_fork = self.fork_name_unchecked();

        if fork_at_slot == object_fork {
            Ok(object_fork)
        } else {
            Err(InconsistentFork {
                fork_at_slot,
                object_fork,
            })
        }
    }

    /// Convenience accessor for the block's slot.
    pub fn slot(&self) -> Slot {
        self.message().slot()
    }

    /// Convenience accessor for the block's proposer index.
    pub fn proposer_index(&self) -> u64 {
        self.message().proposer_index()
    }

    /// Convenience accessor for the block's parent root.
    pub fn parent_root(&self) -> Hash256 {
        self.message().parent_root()
    }

    /// Convenience accessor for the block's state root.
    pub fn state_root(&self) -> Hash256 {
        self.message().state_root()
    }

    /// Returns the `tree_hash_root` of the block message.
    ///
    /// This is the root signed by the proposer and served by the block-root
    /// endpoint, not the root of the signed container.
    pub fn canonical_root(&self) -> Hash256 {
        match self {
            SignedBeaconBlock::Base(block) => block.message.tree_hash_root(),
            SignedBeaconBlock::Altair(block) => block.message.tree_hash_root(),
            SignedBeaconBlock::Bellatrix(block) => block.message.tree_hash_root(),
            SignedBeaconBlock::Capella(block) => block.message.tree_hash_root(),
            SignedBeaconBlock::Deneb(block) => block.message.tree_hash_root(),
        }
    }

    /// Produce a signed beacon block header corresponding to this block.
    pub fn signed_block_header(&self) -> SignedBeaconBlockHeader {
        SignedBeaconBlockHeader {
            message: self.message().block_header(),
            signature: self.signature().clone(),
        }
    }

    /// Returns `true` if the block's fork carries an execution payload.
    pub fn contains_execution_payload(&self) -> bool {
        self.fork_name_unchecked().execution_enabled()
    }

    /// Returns `true` if the block's fork carries blob KZG commitments.
    pub fn contains_kzg_commitments(&self) -> bool {
        self.fork_name_unchecked().blobs_enabled()
    }

    /// Access the block's execution payload.
    ///
    /// Fails with `Error::IncorrectBlockVariant` on pre-Bellatrix blocks,
    /// which have no payload to speak of.
    pub fn execution_payload(&self) -> Result<ExecutionPayloadRef<'_, E>, Error> {
        self.message().body().execution_payload()
    }

    /// The execution block hash of the block's payload, or `None` on
    /// pre-Bellatrix blocks.
    pub fn execution_payload_block_hash(&self) -> Option<Hash256> {
        match self {
            SignedBeaconBlock::Base(_) | SignedBeaconBlock::Altair(_) => None,
            SignedBeaconBlock::Bellatrix(block) => {
                Some(block.message.body.execution_payload.block_hash)
            }
            SignedBeaconBlock::Capella(block) => {
                Some(block.message.body.execution_payload.block_hash)
            }
            SignedBeaconBlock::Deneb(block) => {
                Some(block.message.body.execution_payload.block_hash)
            }
        }
    }

    /// The withdrawals paid out by the block's payload, or `None` on forks
    /// without withdrawals.
    pub fn withdrawals(&self) -> Option<&Withdrawals<E>> {
        match self {
            SignedBeaconBlock::Base(_)
            | SignedBeaconBlock::Altair(_)
            | SignedBeaconBlock::Bellatrix(_) => None,
            SignedBeaconBlock::Capella(block) => {
                Some(&block.message.body.execution_payload.withdrawals)
            }
            SignedBeaconBlock::Deneb(block) => {
                Some(&block.message.body.execution_payload.withdrawals)
            }
        }
    }

    /// The blob KZG commitments included in the block, or `None` on forks
    /// without blobs.
    pub fn blob_kzg_commitments(&self) -> Option<&KzgCommitments<E>> {
        match self {
            SignedBeaconBlock::Deneb(block) => Some(&block.message.body.blob_kzg_commitments),
            _ => None,
        }
    }

    /// The versioned hashes of the block's blob commitments, in commitment
    /// order. `None` on forks without blobs.
    pub fn kzg_commitment_versioned_hashes(&self) -> Option<Vec<VersionedHash>> {
        self.blob_kzg_commitments().map(|commitments| {
            commitments
                .iter()
                .map(|commitment| commitment.calculate_versioned_hash())
                .collect()
        })
    }
}

impl<E: EthSpec> ForkVersionDeserialize for SignedBeaconBlock<E> {
    fn deserialize_by_fork(
        value: serde_json::Value,
        fork_name: ForkName,
    ) -> Result<Self, serde_json::Error> {
        Ok(match fork_name {
            ForkName::Base => SignedBeaconBlock::Base(serde_json::from_value(value)?),
            ForkName::Altair => SignedBeaconBlock::Altair(serde_json::from_value(value)?),
            ForkName::Bellatrix => SignedBeaconBlock::Bellatrix(serde_json::from_value(value)?),
            ForkName::Capella => SignedBeaconBlock::Capella(serde_json::from_value(value)?),
            ForkName::Deneb => SignedBeaconBlock::Deneb(serde_json::from_value(value)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BeaconBlockBodyDeneb, BeaconBlockCapella, BeaconBlockDeneb, KzgCommitment, MinimalEthSpec,
        Withdrawal,
    };

    type E = MinimalEthSpec;

    fn deneb_block_with_commitments(commitments: Vec<KzgCommitment>) -> SignedBeaconBlock<E> {
        SignedBeaconBlock::Deneb(SignedBeaconBlockDeneb {
            message: BeaconBlockDeneb {
                body: BeaconBlockBodyDeneb {
                    blob_kzg_commitments: commitments.into(),
                    ..BeaconBlockBodyDeneb::default()
                },
                ..BeaconBlockDeneb::default()
            },
            signature: SignatureBytes::empty(),
        })
    }

    #[test]
    fn pre_merge_blocks_have_no_payload() {
        let block = SignedBeaconBlock::<E>::Base(SignedBeaconBlockBase::default());
        assert!(!block.contains_execution_payload());
        assert!(block.execution_payload().is_err());
        assert_eq!(block.execution_payload_block_hash(), None);
        assert_eq!(block.withdrawals(), None);
        assert_eq!(block.blob_kzg_commitments(), None);
        assert_eq!(block.kzg_commitment_versioned_hashes(), None);
    }

    #[test]
    fn payload_block_hash_round_trips() {
        let block_hash = Hash256::repeat_byte(0x1d);
        let mut inner = SignedBeaconBlockBellatrix::<E>::default();
        inner.message.body.execution_payload.block_hash = block_hash;
        let block = SignedBeaconBlock::Bellatrix(inner);

        assert!(block.contains_execution_payload());
        assert!(!block.contains_kzg_commitments());
        assert_eq!(block.execution_payload_block_hash(), Some(block_hash));
        // Bellatrix payloads predate withdrawals.
        assert_eq!(block.withdrawals(), None);
    }

    #[test]
    fn capella_blocks_expose_their_withdrawals() {
        let withdrawal = Withdrawal {
            index: 3,
            validator_index: 5,
            address: crate::Address::repeat_byte(0xaa),
            amount: 1_000_000_000,
        };
        let mut inner = SignedBeaconBlockCapella::<E>::default();
        inner.message.body.execution_payload.withdrawals = vec![withdrawal].into();
        let block = SignedBeaconBlock::Capella(inner);

        assert_eq!(block.withdrawals().unwrap().len(), 1);
        assert_eq!(block.withdrawals().unwrap()[0], withdrawal);
    }

    #[test]
    fn versioned_hashes_preserve_length_and_order() {
        let commitments = vec![
            KzgCommitment([0x11; 48]),
            KzgCommitment([0x22; 48]),
            KzgCommitment([0x33; 48]),
        ];
        let block = deneb_block_with_commitments(commitments.clone());

        let hashes = block.kzg_commitment_versioned_hashes().unwrap();
        assert_eq!(hashes.len(), commitments.len());
        for (hash, commitment) in hashes.iter().zip(&commitments) {
            assert_eq!(*hash, commitment.calculate_versioned_hash());
            assert_eq!(hash[0], crate::VERSIONED_HASH_VERSION_KZG);
        }
    }

    #[test]
    fn accessors_agree_with_message() {
        let mut inner = SignedBeaconBlockCapella::<E>::default();
        inner.message.slot = Slot::new(64);
        inner.message.proposer_index = 9;
        inner.message.parent_root = Hash256::repeat_byte(0x01);
        inner.message.state_root = Hash256::repeat_byte(0x02);
        let block = SignedBeaconBlock::Capella(inner);

        assert_eq!(block.slot(), Slot::new(64));
        assert_eq!(block.proposer_index(), 9);
        assert_eq!(block.parent_root(), Hash256::repeat_byte(0x01));
        assert_eq!(block.state_root(), Hash256::repeat_byte(0x02));
        assert_eq!(block.fork_name_unchecked(), ForkName::Capella);

        let header = block.signed_block_header().message;
        assert_eq!(header.slot, block.slot());
        assert_eq!(header.parent_root, block.parent_root());
    }

    #[test]
    fn canonical_root_is_message_root() {
        let block = SignedBeaconBlock::<E>::Capella(SignedBeaconBlockCapella {
            message: BeaconBlockCapella {
                slot: Slot::new(12),
                ..BeaconBlockCapella::default()
            },
            signature: SignatureBytes([0xff; 96]),
        });
        // The signature must not change the canonical root.
        let mut resigned = block.clone();
        if let SignedBeaconBlock::Capella(inner) = &mut resigned {
            inner.signature = SignatureBytes::empty();
        }
        assert_eq!(block.canonical_root(), resigned.canonical_root());
    }
}
