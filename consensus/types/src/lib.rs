//! Types for the beacon chain consensus layer as they appear on the standard
//! Beacon API wire, organised per protocol fork.
//!
//! Containers carry serde implementations matching the Beacon API JSON
//! encoding (quoted integers, `0x`-prefixed hex) alongside SSZ and tree-hash
//! implementations so canonical roots can be recomputed locally from fetched
//! payloads.

pub mod attestation;
pub mod beacon_block;
pub mod beacon_block_body;
pub mod beacon_block_header;
pub mod beacon_state;
pub mod bls;
pub mod bls_to_execution_change;
pub mod chain_spec;
pub mod checkpoint;
pub mod deposit;
pub mod eth1_data;
pub mod eth_spec;
pub mod execution_payload;
pub mod execution_payload_header;
pub mod fork;
pub mod fork_data;
pub mod fork_name;
pub mod fork_versioned_response;
pub mod historical_summary;
pub mod kzg_commitment;
pub mod participation_flags;
pub mod pending_attestation;
pub mod signed_beacon_block;
pub mod slot_epoch;
pub mod sync_aggregate;
pub mod sync_committee;
pub mod validator;
pub mod voluntary_exit;
pub mod withdrawal;

pub use crate::attestation::{
    Attestation, AttestationData, AttesterSlashing, IndexedAttestation, ProposerSlashing,
};
pub use crate::beacon_block::{
    BeaconBlock, BeaconBlockAltair, BeaconBlockBase, BeaconBlockBellatrix, BeaconBlockCapella,
    BeaconBlockDeneb, BeaconBlockRef,
};
pub use crate::beacon_block_body::{
    BeaconBlockBody, BeaconBlockBodyAltair, BeaconBlockBodyBase, BeaconBlockBodyBellatrix,
    BeaconBlockBodyCapella, BeaconBlockBodyDeneb, BeaconBlockBodyRef,
};
pub use crate::beacon_block_header::BeaconBlockHeader;
pub use crate::beacon_state::{
    BeaconState, BeaconStateAltair, BeaconStateBase, BeaconStateBellatrix, BeaconStateCapella,
    BeaconStateDeneb, Error as BeaconStateError,
};
pub use crate::bls::{PublicKeyBytes, SignatureBytes};
pub use crate::bls_to_execution_change::{BlsToExecutionChange, SignedBlsToExecutionChange};
pub use crate::chain_spec::{ChainSpec, Config, Domain};
pub use crate::checkpoint::Checkpoint;
pub use crate::deposit::{Deposit, DepositData};
pub use crate::eth1_data::Eth1Data;
pub use crate::eth_spec::{EthSpec, EthSpecId, MainnetEthSpec, MinimalEthSpec};
pub use crate::execution_payload::{
    ExecutionPayload, ExecutionPayloadBellatrix, ExecutionPayloadCapella, ExecutionPayloadDeneb,
    ExecutionPayloadRef, Transaction, Transactions,
};
pub use crate::execution_payload_header::{
    ExecutionPayloadHeader, ExecutionPayloadHeaderBellatrix, ExecutionPayloadHeaderCapella,
    ExecutionPayloadHeaderDeneb, ExecutionPayloadHeaderRef,
};
pub use crate::fork::Fork;
pub use crate::fork_data::ForkData;
pub use crate::fork_name::{ForkName, InconsistentFork};
pub use crate::fork_versioned_response::{
    ExecutionOptimisticFinalizedForkVersionedResponse, ForkVersionDeserialize,
    ForkVersionedResponse,
};
pub use crate::historical_summary::HistoricalSummary;
pub use crate::kzg_commitment::{KzgCommitment, VERSIONED_HASH_VERSION_KZG};
pub use crate::participation_flags::ParticipationFlags;
pub use crate::pending_attestation::PendingAttestation;
pub use crate::signed_beacon_block::{
    SignedBeaconBlock, SignedBeaconBlockAltair, SignedBeaconBlockBase, SignedBeaconBlockBellatrix,
    SignedBeaconBlockCapella, SignedBeaconBlockDeneb, SignedBeaconBlockHeader,
};
pub use crate::slot_epoch::{Epoch, Slot};
pub use crate::sync_aggregate::SyncAggregate;
pub use crate::sync_committee::SyncCommittee;
pub use crate::validator::Validator;
pub use crate::voluntary_exit::{SignedVoluntaryExit, VoluntaryExit};
pub use crate::withdrawal::Withdrawal;

pub use ssz_types::{typenum, typenum::Unsigned, BitList, BitVector, FixedVector, VariableList};

pub type Hash256 = alloy_primitives::B256;
pub type Address = alloy_primitives::Address;
pub type Uint256 = alloy_primitives::U256;

/// A block hash from the execution chain, embedded in consensus containers.
pub type ExecutionBlockHash = Hash256;
/// A blob commitment hash tagged with a version byte.
pub type VersionedHash = Hash256;
/// Four-byte fork version identifier.
pub type ForkVersion = [u8; 4];
/// Arbitrary 32 bytes chosen by the block proposer.
pub type Graffiti = Hash256;

pub type ValidatorIndex = u64;
pub type CommitteeIndex = u64;
pub type Gwei = u64;

pub type Validators<E> = VariableList<Validator, <E as EthSpec>::ValidatorRegistryLimit>;
pub type Balances<E> = VariableList<u64, <E as EthSpec>::ValidatorRegistryLimit>;
pub type Withdrawals<E> = VariableList<Withdrawal, <E as EthSpec>::MaxWithdrawalsPerPayload>;
pub type KzgCommitments<E> =
    VariableList<KzgCommitment, <E as EthSpec>::MaxBlobCommitmentsPerBlock>;
