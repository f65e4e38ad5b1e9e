use crate::beacon_state::Error;
use crate::{
    BeaconBlockBodyAltair, BeaconBlockBodyBase, BeaconBlockBodyBellatrix, BeaconBlockBodyCapella,
    BeaconBlockBodyDeneb, BeaconBlockBodyRef, BeaconBlockHeader, ChainSpec, EthSpec, ForkName,
    Hash256, InconsistentFork, Slot,
};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use superstruct::superstruct;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// A block of the beacon chain, prior to signing.
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
    ref_attributes(
        derive(Debug, PartialEq, TreeHash),
        tree_hash(enum_behaviour = "transparent")
    ),
    cast_error(ty = "Error", expr = "Error::IncorrectBlockVariant"),
    partial_getter_error(ty = "Error", expr = "Error::IncorrectBlockVariant")
)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, TreeHash)]
#[serde(bound = "E: EthSpec", untagged)]
#[tree_hash(enum_behaviour = "transparent")]
#[ssz(enum_behaviour = "transparent")]
pub struct BeaconBlock<E: EthSpec> {
    #[superstruct(getter(copy))]
    pub slot: Slot,
    #[superstruct(getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub proposer_index: u64,
    #[superstruct(getter(copy))]
    pub parent_root: Hash256,
    #[superstruct(getter(copy))]
    pub state_root: Hash256,
    #[superstruct(only(Base), partial_getter(rename = "body_base"))]
    pub body: BeaconBlockBodyBase<E>,
    #[superstruct(only(Altair), partial_getter(rename = "body_altair"))]
    pub body: BeaconBlockBodyAltair<E>,
    #[superstruct(only(Bellatrix), partial_getter(rename = "body_bellatrix"))]
    pub body: BeaconBlockBodyBellatrix<E>,
    #[superstruct(only(Capella), partial_getter(rename = "body_capella"))]
    pub body: BeaconBlockBodyCapella<E>,
    #[superstruct(only(Deneb), partial_getter(rename = "body_deneb"))]
    pub body: BeaconBlockBodyDeneb<E>,
}

impl<E: EthSpec> BeaconBlock<E> {
    /// Convenience accessor for the block's body as a `BeaconBlockBodyRef`.
    pub fn body(&self) -> BeaconBlockBodyRef<'_, E> {
        self.to_ref().body()
    }

    /// Returns the name of the fork dictated by the object's own variant,
    /// without consulting the fork schedule.
    pub fn fork_name_unchecked(&self) -> ForkName {
        match self {
            BeaconBlock::Base(_) => ForkName::Base,
            BeaconBlock::Altair(_) => ForkName::Altair,
            BeaconBlock::Bellatrix(_) => ForkName::Bellatrix,
            BeaconBlock::Capella(_) => ForkName::Capella,
            BeaconBlock::Deneb(_) => ForkName::Deneb,
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

    /// Returns the `tree_hash_root` of the block.
    pub fn canonical_root(&self) -> Hash256 {
        self.tree_hash_root()
    }

    /// Returns a full `BeaconBlockHeader` of this block.
    pub fn block_header(&self) -> BeaconBlockHeader {
        self.to_ref().block_header()
    }
}

impl<'a, E: EthSpec> BeaconBlockRef<'a, E> {
    /// Convenience accessor for the `body` as a `BeaconBlockBodyRef`.
    pub fn body(&self) -> BeaconBlockBodyRef<'a, E> {
        match self {
            BeaconBlockRef::Base(block) => BeaconBlockBodyRef::Base(&block.body),
            BeaconBlockRef::Altair(block) => BeaconBlockBodyRef::Altair(&block.body),
            BeaconBlockRef::Bellatrix(block) => BeaconBlockBodyRef::Bellatrix(&block.body),
            BeaconBlockRef::Capella(block) => BeaconBlockBodyRef::Capella(&block.body),
            BeaconBlockRef::Deneb(block) => BeaconBlockBodyRef::Deneb(&block.body),
        }
    }

    /// Returns a full `BeaconBlockHeader` of this block.
    pub fn block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot(),
            proposer_index: self.proposer_index(),
            parent_root: self.parent_root(),
            state_root: self.state_root(),
            body_root: self.body().tree_hash_root(),
        }
    }
}

