use crate::beacon_state::Error;
use crate::{
    Attestation, AttesterSlashing, Deposit, Eth1Data, EthSpec, ExecutionPayloadBellatrix,
    ExecutionPayloadCapella, ExecutionPayloadDeneb, ExecutionPayloadRef, Graffiti, Hash256,
    KzgCommitments, ProposerSlashing, SignatureBytes, SignedBlsToExecutionChange,
    SignedVoluntaryExit, SyncAggregate, VariableList,
};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use superstruct::superstruct;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// The body of a `BeaconBlock`, containing operations.
///
/// Every fork adds operations on top of the previous fork's body: Altair the
/// sync aggregate, Bellatrix the execution payload, Capella the credential
/// change list and Deneb the blob commitments.
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
    ref_attributes(derive(Debug, PartialEq)),
    cast_error(ty = "Error", expr = "Error::IncorrectBlockVariant"),
    partial_getter_error(ty = "Error", expr = "Error::IncorrectBlockVariant")
)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, TreeHash)]
#[serde(bound = "E: EthSpec", untagged)]
#[tree_hash(enum_behaviour = "transparent")]
#[ssz(enum_behaviour = "transparent")]
pub struct BeaconBlockBody<E: EthSpec> {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    #[superstruct(getter(copy))]
    pub graffiti: Graffiti,
    pub proposer_slashings: VariableList<ProposerSlashing, E::MaxProposerSlashings>,
    pub attester_slashings: VariableList<AttesterSlashing<E>, E::MaxAttesterSlashings>,
    pub attestations: VariableList<Attestation<E>, E::MaxAttestations>,
    pub deposits: VariableList<Deposit, E::MaxDeposits>,
    pub voluntary_exits: VariableList<SignedVoluntaryExit, E::MaxVoluntaryExits>,
    #[superstruct(only(Altair, Bellatrix, Capella, Deneb))]
    pub sync_aggregate: SyncAggregate<E>,
    #[superstruct(only(Bellatrix), partial_getter(rename = "execution_payload_bellatrix"))]
    pub execution_payload: ExecutionPayloadBellatrix<E>,
    #[superstruct(only(Capella), partial_getter(rename = "execution_payload_capella"))]
    pub execution_payload: ExecutionPayloadCapella<E>,
    #[superstruct(only(Deneb), partial_getter(rename = "execution_payload_deneb"))]
    pub execution_payload: ExecutionPayloadDeneb<E>,
    #[superstruct(only(Capella, Deneb))]
    pub bls_to_execution_changes:
        VariableList<SignedBlsToExecutionChange, E::MaxBlsToExecutionChanges>,
    #[superstruct(only(Deneb))]
    pub blob_kzg_commitments: KzgCommitments<E>,
}

impl<E: EthSpec> BeaconBlockBody<E> {
    pub fn execution_payload(&self) -> Result<ExecutionPayloadRef<'_, E>, Error> {
        self.to_ref().execution_payload()
    }
}

impl<'a, E: EthSpec> BeaconBlockBodyRef<'a, E> {
    /// Return the tree hash root of the enclosed body.
    pub fn tree_hash_root(&self) -> Hash256 {
        match self {
            BeaconBlockBodyRef::Base(body) => body.tree_hash_root(),
            BeaconBlockBodyRef::Altair(body) => body.tree_hash_root(),
            BeaconBlockBodyRef::Bellatrix(body) => body.tree_hash_root(),
            BeaconBlockBodyRef::Capella(body) => body.tree_hash_root(),
            BeaconBlockBodyRef::Deneb(body) => body.tree_hash_root(),
        }
    }

    /// Access the execution payload from the body, if the body's fork has
    /// one.
    pub fn execution_payload(&self) -> Result<ExecutionPayloadRef<'a, E>, Error> {
        match self {
            BeaconBlockBodyRef::Base(_) | BeaconBlockBodyRef::Altair(_) => {
                Err(Error::IncorrectBlockVariant)
            }
            BeaconBlockBodyRef::Bellatrix(body) => {
                Ok(ExecutionPayloadRef::Bellatrix(&body.execution_payload))
            }
            BeaconBlockBodyRef::Capella(body) => {
                Ok(ExecutionPayloadRef::Capella(&body.execution_payload))
            }
            BeaconBlockBodyRef::Deneb(body) => {
                Ok(ExecutionPayloadRef::Deneb(&body.execution_payload))
            }
        }
    }
}
