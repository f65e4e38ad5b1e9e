//! This module exposes a superset of the `types` crate. It adds additional
//! types that are only required for the HTTP API.

use crate::Error as ServerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
pub use types::*;

/// An API error serializable to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub stacktraces: Vec<String>,
}

/// The version of a single API endpoint, e.g. the `v1` in `/eth/v1/beacon/blocks`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointVersion(pub u64);

impl fmt::Display for EndpointVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisData {
    #[serde(with = "serde_utils::quoted_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: Hash256,
    #[serde(with = "serde_utils::bytes_4_hex")]
    pub genesis_fork_version: ForkVersion,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockId {
    Head,
    Genesis,
    Finalized,
    Justified,
    Slot(Slot),
    Root(Hash256),
}

impl FromStr for BlockId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(BlockId::Head),
            "genesis" => Ok(BlockId::Genesis),
            "finalized" => Ok(BlockId::Finalized),
            "justified" => Ok(BlockId::Justified),
            other => {
                if other.starts_with("0x") {
                    Hash256::from_str(other)
                        .map(BlockId::Root)
                        .map_err(|e| format!("{} cannot be parsed as a root: {}", other, e))
                } else {
                    u64::from_str(other)
                        .map(Slot::new)
                        .map(BlockId::Slot)
                        .map_err(|_| format!("{} cannot be parsed as a slot", other))
                }
            }
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Head => write!(f, "head"),
            BlockId::Genesis => write!(f, "genesis"),
            BlockId::Finalized => write!(f, "finalized"),
            BlockId::Justified => write!(f, "justified"),
            BlockId::Slot(slot) => write!(f, "{}", slot),
            BlockId::Root(root) => write!(f, "{:?}", root),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StateId {
    Head,
    Genesis,
    Finalized,
    Justified,
    Slot(Slot),
    Root(Hash256),
}

impl FromStr for StateId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(StateId::Head),
            "genesis" => Ok(StateId::Genesis),
            "finalized" => Ok(StateId::Finalized),
            "justified" => Ok(StateId::Justified),
            other => {
                if other.starts_with("0x") {
                    Hash256::from_str(other)
                        .map(StateId::Root)
                        .map_err(|e| format!("{} cannot be parsed as a root: {}", other, e))
                } else {
                    u64::from_str(other)
                        .map(Slot::new)
                        .map(StateId::Slot)
                        .map_err(|_| format!("{} cannot be parsed as a slot", other))
                }
            }
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateId::Head => write!(f, "head"),
            StateId::Genesis => write!(f, "genesis"),
            StateId::Finalized => write!(f, "finalized"),
            StateId::Justified => write!(f, "justified"),
            StateId::Slot(slot) => write!(f, "{}", slot),
            StateId::Root(root) => write!(f, "{:?}", root),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + serde::de::DeserializeOwned")]
pub struct GenericResponse<T: Serialize + serde::de::DeserializeOwned> {
    pub data: T,
}

impl<T: Serialize + serde::de::DeserializeOwned> From<T> for GenericResponse<T> {
    fn from(data: T) -> Self {
        Self { data }
    }
}

/// Response wrapper reporting whether the requested object sits on an
/// optimistically imported (not yet execution-verified) part of the chain.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + serde::de::DeserializeOwned")]
pub struct ExecutionOptimisticFinalizedResponse<T: Serialize + serde::de::DeserializeOwned> {
    pub execution_optimistic: Option<bool>,
    pub finalized: Option<bool>,
    pub data: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootData {
    pub root: Hash256,
}

impl From<Hash256> for RootData {
    fn from(root: Hash256) -> Self {
        Self { root }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalityCheckpointsData {
    pub previous_justified: Checkpoint,
    pub current_justified: Checkpoint,
    pub finalized: Checkpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandaoMix {
    pub randao: Hash256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidatorId {
    PublicKey(PublicKeyBytes),
    Index(#[serde(with = "serde_utils::quoted_u64")] u64),
}

impl FromStr for ValidatorId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") {
            PublicKeyBytes::from_str(s)
                .map(ValidatorId::PublicKey)
                .map_err(|e| format!("{} cannot be parsed as a public key: {}", s, e))
        } else {
            u64::from_str(s)
                .map(ValidatorId::Index)
                .map_err(|e| format!("{} cannot be parsed as an index: {}", s, e))
        }
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorId::PublicKey(pubkey) => write!(f, "{}", pubkey),
            ValidatorId::Index(index) => write!(f, "{}", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorData {
    #[serde(with = "serde_utils::quoted_u64")]
    pub index: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub balance: u64,
    pub status: ValidatorStatus,
    pub validator: Validator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorBalanceData {
    #[serde(with = "serde_utils::quoted_u64")]
    pub index: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub balance: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
    PendingInitialized,
    PendingQueued,
    ActiveOngoing,
    ActiveExiting,
    ActiveSlashed,
    ExitedUnslashed,
    ExitedSlashed,
    WithdrawalPossible,
    WithdrawalDone,
    Active,
    Pending,
    Exited,
    Withdrawal,
}

impl fmt::Display for ValidatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidatorStatus::PendingInitialized => "pending_initialized",
            ValidatorStatus::PendingQueued => "pending_queued",
            ValidatorStatus::ActiveOngoing => "active_ongoing",
            ValidatorStatus::ActiveExiting => "active_exiting",
            ValidatorStatus::ActiveSlashed => "active_slashed",
            ValidatorStatus::ExitedUnslashed => "exited_unslashed",
            ValidatorStatus::ExitedSlashed => "exited_slashed",
            ValidatorStatus::WithdrawalPossible => "withdrawal_possible",
            ValidatorStatus::WithdrawalDone => "withdrawal_done",
            ValidatorStatus::Active => "active",
            ValidatorStatus::Pending => "pending",
            ValidatorStatus::Exited => "exited",
            ValidatorStatus::Withdrawal => "withdrawal",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeaderData {
    pub root: Hash256,
    #[serde(default)]
    pub canonical: bool,
    pub header: SignedBeaconBlockHeader,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposerData {
    pub pubkey: PublicKeyBytes,
    #[serde(with = "serde_utils::quoted_u64")]
    pub validator_index: u64,
    pub slot: Slot,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + serde::de::DeserializeOwned")]
pub struct DutiesResponse<T: Serialize + serde::de::DeserializeOwned> {
    pub dependent_root: Hash256,
    pub data: T,
}

/// A fork-versioned response in its raw wire shape: version tag unparsed and
/// payload undecoded.
///
/// Keeping the tag as a string lets the client surface an unknown version as
/// `Error::UnknownConsensusVersion` *before* any schema is applied to the
/// payload, instead of guessing one.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForkVersionedResponse {
    pub version: Option<String>,
    #[serde(default)]
    pub execution_optimistic: Option<bool>,
    #[serde(default)]
    pub finalized: Option<bool>,
    pub data: serde_json::Value,
}

impl RawForkVersionedResponse {
    /// Decode the payload under the schema named by the version tag.
    pub fn parse<T: ForkVersionDeserialize + serde::de::DeserializeOwned>(
        self,
    ) -> Result<ExecutionOptimisticFinalizedForkVersionedResponse<T>, ServerError> {
        let version = self
            .version
            .map(|version| {
                ForkName::from_str(&version)
                    .map_err(|_| ServerError::UnknownConsensusVersion(version))
            })
            .transpose()?;
        let data = match version {
            Some(fork_name) => T::deserialize_by_fork(self.data, fork_name),
            None => serde_json::from_value(self.data),
        }
        .map_err(ServerError::InvalidJson)?;
        Ok(ExecutionOptimisticFinalizedForkVersionedResponse {
            version,
            execution_optimistic: self.execution_optimistic,
            finalized: self.finalized,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn block_id_round_trips_through_strings() {
        for id in ["head", "genesis", "finalized", "justified", "42"] {
            let parsed = BlockId::from_str(id).unwrap();
            assert_eq!(parsed.to_string(), id);
        }
        let root = "0x0101010101010101010101010101010101010101010101010101010101010101";
        assert_eq!(
            BlockId::from_str(root).unwrap(),
            BlockId::Root(Hash256::repeat_byte(1))
        );
        assert!(BlockId::from_str("nonsense").is_err());
    }

    #[test]
    fn state_id_parses_slots_and_roots() {
        assert_eq!(
            StateId::from_str("128").unwrap(),
            StateId::Slot(Slot::new(128))
        );
        assert!(StateId::from_str("0xnotahash").is_err());
    }

    #[test]
    fn validator_id_string_forms() {
        assert_eq!(ValidatorId::from_str("7").unwrap(), ValidatorId::Index(7));
        assert_eq!(ValidatorId::Index(7).to_string(), "7");
        let pubkey = ValidatorId::PublicKey(PublicKeyBytes::empty());
        assert!(pubkey.to_string().starts_with("0x"));
    }

    #[test]
    fn genesis_data_wire_format() {
        let genesis: GenesisData = serde_json::from_value(json!({
            "genesis_time": "1606824023",
            "genesis_validators_root":
                "0x4b363db94e286120d76eb905340fdd4e54bfe9f06bf33ff6cf5ad27f511bfe95",
            "genesis_fork_version": "0x00000000"
        }))
        .unwrap();
        assert_eq!(genesis.genesis_time, 1606824023);
        assert_eq!(genesis.genesis_fork_version, [0; 4]);
    }

    #[test]
    fn validator_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ValidatorStatus::ActiveOngoing).unwrap(),
            "\"active_ongoing\""
        );
        assert_eq!(ValidatorStatus::WithdrawalPossible.to_string(), "withdrawal_possible");
        let status: ValidatorStatus = serde_json::from_str("\"exited_unslashed\"").unwrap();
        assert_eq!(status, ValidatorStatus::ExitedUnslashed);
    }

    #[test]
    fn raw_fork_versioned_response_rejects_unknown_version() {
        let raw: RawForkVersionedResponse = serde_json::from_value(json!({
            "version": "electra",
            "execution_optimistic": false,
            "data": {}
        }))
        .unwrap();

        match raw.parse::<SignedBeaconBlock<MainnetEthSpec>>() {
            Err(ServerError::UnknownConsensusVersion(version)) => {
                assert_eq!(version, "electra")
            }
            other => panic!("expected UnknownConsensusVersion, got {:?}", other),
        }
    }
}
