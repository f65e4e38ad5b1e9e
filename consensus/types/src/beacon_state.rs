use crate::{
    BeaconBlockHeader, BitVector, ChainSpec, Checkpoint, Epoch, Eth1Data, EthSpec,
    ExecutionPayloadHeaderBellatrix, ExecutionPayloadHeaderCapella, ExecutionPayloadHeaderDeneb,
    ExecutionPayloadHeaderRef, FixedVector, Fork, ForkName, ForkVersionDeserialize, Hash256,
    HistoricalSummary, InconsistentFork, ParticipationFlags, PendingAttestation, Slot,
    SyncCommittee, Validator, VariableList,
};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use superstruct::superstruct;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// An accessor was asked for a field that does not exist on the state or
/// block variant it was called on, or an index fell outside the registry.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// A state for a different hard-fork was required -- a severe logic error.
    IncorrectStateVariant,
    /// A block for a different hard-fork was required.
    IncorrectBlockVariant,
    UnknownValidator(usize),
    BalancesOutOfBounds(usize),
}

/// The state of the beacon chain at some slot, as served whole by the debug
/// state endpoint.
///
/// Every variant carries a superset of the previous variant's fields.
/// Accessors for fields shared by all five schemas are generated as total
/// functions; fork-scoped fields get partial getters returning
/// `Error::IncorrectStateVariant` on the wrong variant.
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
    cast_error(ty = "Error", expr = "Error::IncorrectStateVariant"),
    partial_getter_error(ty = "Error", expr = "Error::IncorrectStateVariant")
)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, TreeHash)]
#[serde(bound = "E: EthSpec", untagged)]
#[tree_hash(enum_behaviour = "transparent")]
#[ssz(enum_behaviour = "transparent")]
pub struct BeaconState<E>
where
    E: EthSpec,
{
    // Versioning
    #[superstruct(getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub genesis_time: u64,
    #[superstruct(getter(copy))]
    pub genesis_validators_root: Hash256,
    #[superstruct(getter(copy))]
    pub slot: Slot,
    #[superstruct(getter(copy))]
    pub fork: Fork,

    // History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: FixedVector<Hash256, E::SlotsPerHistoricalRoot>,
    pub state_roots: FixedVector<Hash256, E::SlotsPerHistoricalRoot>,
    // Frozen in Capella, replaced by historical_summaries
    pub historical_roots: VariableList<Hash256, E::HistoricalRootsLimit>,

    // Ethereum 1.0 chain data
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: VariableList<Eth1Data, E::SlotsPerEth1VotingPeriod>,
    #[superstruct(getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub eth1_deposit_index: u64,

    // Registry
    pub validators: VariableList<Validator, E::ValidatorRegistryLimit>,
    #[serde(with = "ssz_types::serde_utils::quoted_u64_var_list")]
    pub balances: VariableList<u64, E::ValidatorRegistryLimit>,

    // Randomness
    pub randao_mixes: FixedVector<Hash256, E::EpochsPerHistoricalVector>,

    // Slashings
    #[serde(with = "ssz_types::serde_utils::quoted_u64_fixed_vec")]
    pub slashings: FixedVector<u64, E::EpochsPerSlashingsVector>,

    // Attestations (genesis fork only)
    #[superstruct(only(Base))]
    pub previous_epoch_attestations:
        VariableList<PendingAttestation<E>, E::MaxPendingAttestations>,
    #[superstruct(only(Base))]
    pub current_epoch_attestations: VariableList<PendingAttestation<E>, E::MaxPendingAttestations>,

    // Participation (Altair and later)
    #[superstruct(only(Altair, Bellatrix, Capella, Deneb))]
    pub previous_epoch_participation:
        VariableList<ParticipationFlags, E::ValidatorRegistryLimit>,
    #[superstruct(only(Altair, Bellatrix, Capella, Deneb))]
    pub current_epoch_participation: VariableList<ParticipationFlags, E::ValidatorRegistryLimit>,

    // Finality
    pub justification_bits: BitVector<E::JustificationBitsLength>,
    #[superstruct(getter(copy))]
    pub previous_justified_checkpoint: Checkpoint,
    #[superstruct(getter(copy))]
    pub current_justified_checkpoint: Checkpoint,
    #[superstruct(getter(copy))]
    pub finalized_checkpoint: Checkpoint,

    // Inactivity
    #[superstruct(only(Altair, Bellatrix, Capella, Deneb))]
    #[serde(with = "ssz_types::serde_utils::quoted_u64_var_list")]
    pub inactivity_scores: VariableList<u64, E::ValidatorRegistryLimit>,

    // Light-client sync committees
    #[superstruct(only(Altair, Bellatrix, Capella, Deneb))]
    pub current_sync_committee: SyncCommittee<E>,
    #[superstruct(only(Altair, Bellatrix, Capella, Deneb))]
    pub next_sync_committee: SyncCommittee<E>,

    // Execution
    #[superstruct(
        only(Bellatrix),
        partial_getter(rename = "latest_execution_payload_header_bellatrix")
    )]
    pub latest_execution_payload_header: ExecutionPayloadHeaderBellatrix<E>,
    #[superstruct(
        only(Capella),
        partial_getter(rename = "latest_execution_payload_header_capella")
    )]
    pub latest_execution_payload_header: ExecutionPayloadHeaderCapella<E>,
    #[superstruct(
        only(Deneb),
        partial_getter(rename = "latest_execution_payload_header_deneb")
    )]
    pub latest_execution_payload_header: ExecutionPayloadHeaderDeneb<E>,

    // Capella
    #[superstruct(only(Capella, Deneb), partial_getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub next_withdrawal_index: u64,
    #[superstruct(only(Capella, Deneb), partial_getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub next_withdrawal_validator_index: u64,
    // Deep history valid from Capella onwards.
    #[superstruct(only(Capella, Deneb))]
    pub historical_summaries: VariableList<HistoricalSummary, E::HistoricalRootsLimit>,
}

impl<E: EthSpec> BeaconState<E> {
    /// The epoch corresponding to `self.slot()`.
    pub fn current_epoch(&self) -> Epoch {
        self.slot().epoch(E::slots_per_epoch())
    }

    /// The epoch prior to `self.current_epoch()`, clamped to the genesis
    /// epoch.
    pub fn previous_epoch(&self) -> Epoch {
        self.current_epoch().saturating_sub(1u64)
    }

    /// Returns the name of the fork dictated by the state's own variant,
    /// without consulting the fork schedule.
    pub fn fork_name_unchecked(&self) -> ForkName {
        match self {
            BeaconState::Base(_) => ForkName::Base,
            BeaconState::Altair(_) => ForkName::Altair,
            BeaconState::Bellatrix(_) => ForkName::Bellatrix,
            BeaconState::Capella(_) => ForkName::Capella,
            BeaconState::Deneb(_) => ForkName::Deneb,
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

    /// Recompute the canonical tree hash root of the entire state.
    ///
    /// Must match the root served by the node for the same state, which makes
    /// it usable for state identity comparisons across clients.
    pub fn canonical_root(&self) -> Hash256 {
        self.tree_hash_root()
    }

    /// Safe indexing into the validator registry.
    pub fn get_validator(&self, validator_index: usize) -> Result<&Validator, Error> {
        self.validators()
            .get(validator_index)
            .ok_or(Error::UnknownValidator(validator_index))
    }

    /// Safe indexing into the balances list.
    ///
    /// A registry index without a balance is a data-integrity violation, so
    /// the two lists are deliberately indexed independently.
    pub fn get_balance(&self, validator_index: usize) -> Result<u64, Error> {
        self.balances()
            .get(validator_index)
            .copied()
            .ok_or(Error::BalancesOutOfBounds(validator_index))
    }

    /// Access the latest execution payload header on post-merge states.
    pub fn latest_execution_payload_header(
        &self,
    ) -> Result<ExecutionPayloadHeaderRef<'_, E>, Error> {
        match self {
            BeaconState::Base(_) | BeaconState::Altair(_) => Err(Error::IncorrectStateVariant),
            BeaconState::Bellatrix(state) => Ok(ExecutionPayloadHeaderRef::Bellatrix(
                &state.latest_execution_payload_header,
            )),
            BeaconState::Capella(state) => Ok(ExecutionPayloadHeaderRef::Capella(
                &state.latest_execution_payload_header,
            )),
            BeaconState::Deneb(state) => Ok(ExecutionPayloadHeaderRef::Deneb(
                &state.latest_execution_payload_header,
            )),
        }
    }

    /// The execution block hash recorded in the state, or `None` on
    /// pre-merge states which have no execution content.
    pub fn latest_execution_payload_header_hash(&self) -> Option<Hash256> {
        self.latest_execution_payload_header()
            .ok()
            .map(|header| header.block_hash())
    }
}

impl<E: EthSpec> ForkVersionDeserialize for BeaconState<E> {
    fn deserialize_by_fork(
        value: serde_json::Value,
        fork_name: ForkName,
    ) -> Result<Self, serde_json::Error> {
        Ok(match fork_name {
            ForkName::Base => BeaconState::Base(serde_json::from_value(value)?),
            ForkName::Altair => BeaconState::Altair(serde_json::from_value(value)?),
            ForkName::Bellatrix => BeaconState::Bellatrix(serde_json::from_value(value)?),
            ForkName::Capella => BeaconState::Capella(serde_json::from_value(value)?),
            ForkName::Deneb => BeaconState::Deneb(serde_json::from_value(value)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MinimalEthSpec;

    type E = MinimalEthSpec;

    fn state_for_each_fork() -> Vec<BeaconState<E>> {
        vec![
            BeaconState::Base(BeaconStateBase {
                slot: Slot::new(1),
                ..BeaconStateBase::default()
            }),
            BeaconState::Altair(BeaconStateAltair {
                slot: Slot::new(2),
                ..BeaconStateAltair::default()
            }),
            BeaconState::Bellatrix(BeaconStateBellatrix {
                slot: Slot::new(3),
                ..BeaconStateBellatrix::default()
            }),
            BeaconState::Capella(BeaconStateCapella {
                slot: Slot::new(4),
                ..BeaconStateCapella::default()
            }),
            BeaconState::Deneb(BeaconStateDeneb {
                slot: Slot::new(5),
                ..BeaconStateDeneb::default()
            }),
        ]
    }

    #[test]
    fn common_accessors_are_total_over_all_variants() {
        for (i, state) in state_for_each_fork().into_iter().enumerate() {
            assert_eq!(state.slot(), Slot::new(i as u64 + 1));
            assert_eq!(state.genesis_time(), 0);
            assert_eq!(state.finalized_checkpoint(), Checkpoint::default());
            assert!(state.validators().is_empty());
            assert!(state.balances().is_empty());
        }
    }

    #[test]
    fn fork_scoped_accessors_fail_on_earlier_variants() {
        let base = BeaconState::<E>::Base(BeaconStateBase::default());
        assert_eq!(
            base.inactivity_scores().unwrap_err(),
            Error::IncorrectStateVariant
        );
        assert_eq!(
            base.current_sync_committee().unwrap_err(),
            Error::IncorrectStateVariant
        );
        assert_eq!(
            base.next_withdrawal_index().unwrap_err(),
            Error::IncorrectStateVariant
        );
        assert!(base.latest_execution_payload_header().is_err());
        assert_eq!(base.latest_execution_payload_header_hash(), None);
        assert!(base.previous_epoch_attestations().is_ok());

        let altair = BeaconState::<E>::Altair(BeaconStateAltair::default());
        assert!(altair.previous_epoch_attestations().is_err());
        assert!(altair.inactivity_scores().is_ok());
        assert!(altair.current_sync_committee().is_ok());
        assert_eq!(altair.latest_execution_payload_header_hash(), None);

        let bellatrix = BeaconState::<E>::Bellatrix(BeaconStateBellatrix::default());
        assert!(bellatrix.latest_execution_payload_header().is_ok());
        assert_eq!(
            bellatrix.next_withdrawal_index().unwrap_err(),
            Error::IncorrectStateVariant
        );
    }

    #[test]
    fn withdrawal_cursors_round_trip_on_capella_and_deneb() {
        let capella = BeaconState::<E>::Capella(BeaconStateCapella {
            next_withdrawal_index: 7,
            next_withdrawal_validator_index: 11,
            ..BeaconStateCapella::default()
        });
        assert_eq!(capella.next_withdrawal_index().unwrap(), 7);
        assert_eq!(capella.next_withdrawal_validator_index().unwrap(), 11);

        let deneb = BeaconState::<E>::Deneb(BeaconStateDeneb {
            next_withdrawal_index: 13,
            ..BeaconStateDeneb::default()
        });
        assert_eq!(deneb.next_withdrawal_index().unwrap(), 13);
    }

    #[test]
    fn execution_payload_header_hash_round_trips() {
        let block_hash = Hash256::repeat_byte(0x42);
        let state = BeaconState::<E>::Capella(BeaconStateCapella {
            latest_execution_payload_header: ExecutionPayloadHeaderCapella {
                block_hash,
                ..ExecutionPayloadHeaderCapella::default()
            },
            ..BeaconStateCapella::default()
        });
        assert_eq!(state.latest_execution_payload_header_hash(), Some(block_hash));
    }

    #[test]
    fn registry_indexing_is_checked() {
        let state = BeaconState::<E>::Capella(BeaconStateCapella {
            validators: vec![Validator::default()].into(),
            balances: vec![32_000_000_000].into(),
            ..BeaconStateCapella::default()
        });
        assert!(state.get_validator(0).is_ok());
        assert_eq!(state.get_balance(0), Ok(32_000_000_000));
        assert_eq!(state.get_validator(1).unwrap_err(), Error::UnknownValidator(1));
        assert_eq!(
            state.get_balance(7).unwrap_err(),
            Error::BalancesOutOfBounds(7)
        );
    }

    #[test]
    fn fork_name_unchecked_matches_variant() {
        let names: Vec<ForkName> = state_for_each_fork()
            .iter()
            .map(BeaconState::fork_name_unchecked)
            .collect();
        assert_eq!(names, ForkName::list_all());
    }

    #[test]
    fn canonical_root_commits_to_contents() {
        let mut state = BeaconStateCapella::<E>::default();
        let root_a = BeaconState::Capella(state.clone()).canonical_root();
        state.slot = Slot::new(99);
        let root_b = BeaconState::Capella(state).canonical_root();
        assert_ne!(root_a, root_b);
    }

    #[test]
    fn deserialize_by_fork_honours_the_tag() {
        let state = BeaconState::<E>::Altair(BeaconStateAltair::default());
        let value = serde_json::to_value(&state).unwrap();

        let decoded = BeaconState::<E>::deserialize_by_fork(value.clone(), ForkName::Altair);
        assert_eq!(decoded.unwrap().fork_name_unchecked(), ForkName::Altair);

        // The same JSON refuses to decode under a schema with more fields.
        assert!(BeaconState::<E>::deserialize_by_fork(value, ForkName::Capella).is_err());
    }
}
