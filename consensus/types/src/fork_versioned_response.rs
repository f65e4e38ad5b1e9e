use crate::ForkName;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Deserialization directed by an out-of-band fork tag instead of guessing a
/// schema from the object's shape.
///
/// Guessing is not an option for versioned payloads: a state decoded under
/// the wrong variant would corrupt every root and withdrawal computation made
/// from it.
pub trait ForkVersionDeserialize: Sized {
    fn deserialize_by_fork(value: Value, fork_name: ForkName) -> Result<Self, serde_json::Error>;
}

/// A `data` payload wrapped with the fork version it was serialized under.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct ForkVersionedResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<ForkName>,
    pub data: T,
}

/// Fork-versioned payload which also reports the node's optimistic-sync and
/// finality status for the requested object.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct ExecutionOptimisticFinalizedForkVersionedResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<ForkName>,
    pub execution_optimistic: Option<bool>,
    pub finalized: Option<bool>,
    pub data: T,
}

fn parse_fork_name<E: serde::de::Error>(version: Option<String>) -> Result<Option<ForkName>, E> {
    version
        .map(|version| {
            ForkName::from_str(&version)
                .map_err(|_| E::custom(format_args!("unknown fork name: {version}")))
        })
        .transpose()
}

fn deserialize_data<F: ForkVersionDeserialize, E: serde::de::Error>(
    version: Option<ForkName>,
    data: Value,
) -> Result<F, E>
where
    F: serde::de::DeserializeOwned,
{
    match version {
        Some(fork_name) => F::deserialize_by_fork(data, fork_name).map_err(E::custom),
        None => serde_json::from_value(data).map_err(E::custom),
    }
}

impl<'de, F> Deserialize<'de> for ForkVersionedResponse<F>
where
    F: ForkVersionDeserialize + serde::de::DeserializeOwned,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Helper {
            version: Option<String>,
            data: Value,
        }

        let helper = Helper::deserialize(deserializer)?;
        let version = parse_fork_name(helper.version)?;
        let data = deserialize_data(version, helper.data)?;

        Ok(ForkVersionedResponse { version, data })
    }
}

impl<'de, F> Deserialize<'de> for ExecutionOptimisticFinalizedForkVersionedResponse<F>
where
    F: ForkVersionDeserialize + serde::de::DeserializeOwned,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Helper {
            version: Option<String>,
            execution_optimistic: Option<bool>,
            finalized: Option<bool>,
            data: Value,
        }

        let helper = Helper::deserialize(deserializer)?;
        let version = parse_fork_name(helper.version)?;
        let data = deserialize_data(version, helper.data)?;

        Ok(ExecutionOptimisticFinalizedForkVersionedResponse {
            version,
            execution_optimistic: helper.execution_optimistic,
            finalized: helper.finalized,
            data,
        })
    }
}

#[cfg(test)]
mod fork_version_response_tests {
    use crate::{
        ExecutionPayload, ExecutionPayloadBellatrix, ForkName, ForkVersionedResponse,
        MainnetEthSpec,
    };
    use serde_json::json;

    #[test]
    fn fork_versioned_response_deserialize_correct_fork() {
        type E = MainnetEthSpec;

        let response_json =
            serde_json::to_string(&json!(ForkVersionedResponse::<ExecutionPayload<E>> {
                version: Some(ForkName::Bellatrix),
                data: ExecutionPayload::Bellatrix(ExecutionPayloadBellatrix::default()),
            }))
            .unwrap();

        let result: Result<ForkVersionedResponse<ExecutionPayload<E>>, _> =
            serde_json::from_str(&response_json);

        assert!(result.is_ok());
    }

    #[test]
    fn fork_versioned_response_deserialize_incorrect_fork() {
        type E = MainnetEthSpec;

        let response_json =
            serde_json::to_string(&json!(ForkVersionedResponse::<ExecutionPayload<E>> {
                version: Some(ForkName::Capella),
                data: ExecutionPayload::Bellatrix(ExecutionPayloadBellatrix::default()),
            }))
            .unwrap();

        let result: Result<ForkVersionedResponse<ExecutionPayload<E>>, _> =
            serde_json::from_str(&response_json);

        assert!(result.is_err());
    }

    #[test]
    fn fork_versioned_response_unknown_fork_is_an_error() {
        let response_json = serde_json::to_string(&json!({
            "version": "electra",
            "data": {}
        }))
        .unwrap();

        let result: Result<ForkVersionedResponse<ExecutionPayload<MainnetEthSpec>>, _> =
            serde_json::from_str(&response_json);

        let error = format!("{}", result.unwrap_err());
        assert!(error.contains("unknown fork name"), "{}", error);
    }
}
