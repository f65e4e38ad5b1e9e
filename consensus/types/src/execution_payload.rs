use crate::beacon_state::Error;
use crate::{
    Address, EthSpec, FixedVector, ForkName, ForkVersionDeserialize, Hash256, Uint256,
    VariableList, Withdrawals,
};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use superstruct::superstruct;
use tree_hash_derive::TreeHash;

pub type Transaction<N> = VariableList<u8, N>;
pub type Transactions<E> = VariableList<
    Transaction<<E as EthSpec>::MaxBytesPerTransaction>,
    <E as EthSpec>::MaxTransactionsPerPayload,
>;

/// The execution-chain block embedded in a post-merge beacon block body.
///
/// Capella adds the withdrawals list, Deneb adds the blob gas accounting
/// fields.
#[superstruct(
    variants(Bellatrix, Capella, Deneb),
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
pub struct ExecutionPayload<E: EthSpec> {
    #[superstruct(getter(copy))]
    pub parent_hash: Hash256,
    #[superstruct(getter(copy))]
    pub fee_recipient: Address,
    #[superstruct(getter(copy))]
    pub state_root: Hash256,
    #[superstruct(getter(copy))]
    pub receipts_root: Hash256,
    #[serde(with = "ssz_types::serde_utils::hex_fixed_vec")]
    pub logs_bloom: FixedVector<u8, E::BytesPerLogsBloom>,
    #[superstruct(getter(copy))]
    pub prev_randao: Hash256,
    #[superstruct(getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub block_number: u64,
    #[superstruct(getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_limit: u64,
    #[superstruct(getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_used: u64,
    #[superstruct(getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub timestamp: u64,
    #[serde(with = "ssz_types::serde_utils::hex_var_list")]
    pub extra_data: VariableList<u8, E::MaxExtraDataBytes>,
    #[superstruct(getter(copy))]
    #[serde(with = "serde_utils::quoted_u256")]
    pub base_fee_per_gas: Uint256,
    #[superstruct(getter(copy))]
    pub block_hash: Hash256,
    #[serde(with = "ssz_types::serde_utils::list_of_hex_var_list")]
    pub transactions: Transactions<E>,
    #[superstruct(only(Capella, Deneb))]
    pub withdrawals: Withdrawals<E>,
    #[superstruct(only(Deneb), partial_getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub blob_gas_used: u64,
    #[superstruct(only(Deneb), partial_getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub excess_blob_gas: u64,
}

impl<E: EthSpec> ForkVersionDeserialize for ExecutionPayload<E> {
    fn deserialize_by_fork(
        value: serde_json::Value,
        fork_name: ForkName,
    ) -> Result<Self, serde_json::Error> {
        Ok(match fork_name {
            ForkName::Base | ForkName::Altair => {
                return Err(serde::de::Error::custom(format_args!(
                    "ExecutionPayload can't be deserialized for pre-merge fork {fork_name}"
                )))
            }
            ForkName::Bellatrix => ExecutionPayload::Bellatrix(serde_json::from_value(value)?),
            ForkName::Capella => ExecutionPayload::Capella(serde_json::from_value(value)?),
            ForkName::Deneb => ExecutionPayload::Deneb(serde_json::from_value(value)?),
        })
    }
}

impl<E: EthSpec> ExecutionPayload<E> {
    /// Returns `true` if this payload variant carries a withdrawals list.
    pub fn has_withdrawals(&self) -> bool {
        match self {
            ExecutionPayload::Bellatrix(_) => false,
            ExecutionPayload::Capella(_) | ExecutionPayload::Deneb(_) => true,
        }
    }
}
