use crate::{Epoch, EthSpecId, ForkData, ForkName, ForkVersion, Hash256, Slot};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tree_hash::TreeHash;

/// Each of the BLS signature domains.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Domain {
    BeaconProposer,
    BeaconAttester,
    Randao,
    Deposit,
    VoluntaryExit,
    SyncCommittee,
    BlsToExecutionChange,
}

impl Domain {
    fn as_u32(&self) -> u32 {
        match self {
            Domain::BeaconProposer => 0,
            Domain::BeaconAttester => 1,
            Domain::Randao => 2,
            Domain::Deposit => 3,
            Domain::VoluntaryExit => 4,
            Domain::SyncCommittee => 7,
            Domain::BlsToExecutionChange => 10,
        }
    }
}

/// Runtime parameters of a beacon network.
///
/// Resolved once per client instance, either from defaults or from the
/// `/eth/v1/config/spec` endpoint, and treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSpec {
    pub config_name: Option<String>,
    pub preset_base: EthSpecId,
    pub seconds_per_slot: u64,

    /*
     * Fork schedule
     */
    pub genesis_fork_version: ForkVersion,
    pub altair_fork_version: ForkVersion,
    pub altair_fork_epoch: Option<Epoch>,
    pub bellatrix_fork_version: ForkVersion,
    pub bellatrix_fork_epoch: Option<Epoch>,
    pub capella_fork_version: ForkVersion,
    pub capella_fork_epoch: Option<Epoch>,
    pub deneb_fork_version: ForkVersion,
    pub deneb_fork_epoch: Option<Epoch>,

    /*
     * Validator economics
     */
    pub max_effective_balance: u64,

    /*
     * Withdrawals
     */
    pub max_validators_per_withdrawals_sweep: u64,
    pub bls_withdrawal_prefix_byte: u8,
    pub eth1_address_withdrawal_prefix_byte: u8,

    pub far_future_epoch: Epoch,
}

impl ChainSpec {
    /// Returns a `ChainSpec` compatible with the Ethereum Foundation mainnet.
    pub fn mainnet() -> Self {
        Self {
            config_name: Some("mainnet".to_string()),
            preset_base: EthSpecId::Mainnet,
            seconds_per_slot: 12,
            genesis_fork_version: [0, 0, 0, 0],
            altair_fork_version: [1, 0, 0, 0],
            altair_fork_epoch: Some(Epoch::new(74240)),
            bellatrix_fork_version: [2, 0, 0, 0],
            bellatrix_fork_epoch: Some(Epoch::new(144896)),
            capella_fork_version: [3, 0, 0, 0],
            capella_fork_epoch: Some(Epoch::new(194048)),
            deneb_fork_version: [4, 0, 0, 0],
            deneb_fork_epoch: Some(Epoch::new(269568)),
            max_effective_balance: 32_000_000_000,
            max_validators_per_withdrawals_sweep: 16384,
            bls_withdrawal_prefix_byte: 0x00,
            eth1_address_withdrawal_prefix_byte: 0x01,
            far_future_epoch: Epoch::max_value(),
        }
    }

    /// Returns a `ChainSpec` compatible with the minimal preset. Fork epochs
    /// are unscheduled; interop testnets set them via the config endpoint.
    pub fn minimal() -> Self {
        Self {
            config_name: Some("minimal".to_string()),
            preset_base: EthSpecId::Minimal,
            seconds_per_slot: 6,
            genesis_fork_version: [0, 0, 0, 1],
            altair_fork_version: [1, 0, 0, 1],
            altair_fork_epoch: None,
            bellatrix_fork_version: [2, 0, 0, 1],
            bellatrix_fork_epoch: None,
            capella_fork_version: [3, 0, 0, 1],
            capella_fork_epoch: None,
            deneb_fork_version: [4, 0, 0, 1],
            deneb_fork_epoch: None,
            max_effective_balance: 32_000_000_000,
            max_validators_per_withdrawals_sweep: 16,
            bls_withdrawal_prefix_byte: 0x00,
            eth1_address_withdrawal_prefix_byte: 0x01,
            far_future_epoch: Epoch::max_value(),
        }
    }

    /// Builds a `ChainSpec` from a config fetched off a running node,
    /// overlaying the values onto the preset named by `PRESET_BASE`.
    ///
    /// Returns `None` for preset bases this crate has no compiled parameters
    /// for.
    pub fn from_config(config: &Config) -> Option<Self> {
        let mut spec = match EthSpecId::from_str(&config.preset_base).ok()? {
            EthSpecId::Mainnet => Self::mainnet(),
            EthSpecId::Minimal => Self::minimal(),
        };

        let epoch_or_none = |epoch: u64| {
            if epoch == u64::MAX {
                None
            } else {
                Some(Epoch::new(epoch))
            }
        };

        spec.config_name = config.config_name.clone();
        spec.seconds_per_slot = config.seconds_per_slot;
        spec.genesis_fork_version = config.genesis_fork_version;
        spec.altair_fork_version = config.altair_fork_version;
        spec.altair_fork_epoch = epoch_or_none(config.altair_fork_epoch);
        spec.bellatrix_fork_version = config.bellatrix_fork_version;
        spec.bellatrix_fork_epoch = epoch_or_none(config.bellatrix_fork_epoch);
        spec.capella_fork_version = config.capella_fork_version;
        spec.capella_fork_epoch = epoch_or_none(config.capella_fork_epoch);
        spec.deneb_fork_version = config.deneb_fork_version;
        spec.deneb_fork_epoch = epoch_or_none(config.deneb_fork_epoch);
        spec.max_effective_balance = config.max_effective_balance;
        spec.max_validators_per_withdrawals_sweep = config.max_validators_per_withdrawals_sweep;

        Some(spec)
    }

    /// Returns the name of the fork which is active at `epoch`.
    pub fn fork_name_at_epoch(&self, epoch: Epoch) -> ForkName {
        match self.deneb_fork_epoch {
            Some(fork_epoch) if epoch >= fork_epoch => ForkName::Deneb,
            _ => match self.capella_fork_epoch {
                Some(fork_epoch) if epoch >= fork_epoch => ForkName::Capella,
                _ => match self.bellatrix_fork_epoch {
                    Some(fork_epoch) if epoch >= fork_epoch => ForkName::Bellatrix,
                    _ => match self.altair_fork_epoch {
                        Some(fork_epoch) if epoch >= fork_epoch => ForkName::Altair,
                        _ => ForkName::Base,
                    },
                },
            },
        }
    }

    pub fn fork_name_at_slot(&self, slot: Slot, slots_per_epoch: u64) -> ForkName {
        self.fork_name_at_epoch(slot.epoch(slots_per_epoch))
    }

    /// Returns the fork version active in the fork named by `fork_name`.
    pub fn fork_version_for_name(&self, fork_name: ForkName) -> ForkVersion {
        match fork_name {
            ForkName::Base => self.genesis_fork_version,
            ForkName::Altair => self.altair_fork_version,
            ForkName::Bellatrix => self.bellatrix_fork_version,
            ForkName::Capella => self.capella_fork_version,
            ForkName::Deneb => self.deneb_fork_version,
        }
    }

    /// Compute the 32-byte signing domain: the 4-byte domain type followed by
    /// the first 28 bytes of the fork data root.
    pub fn compute_domain(
        &self,
        domain: Domain,
        fork_version: ForkVersion,
        genesis_validators_root: Hash256,
    ) -> Hash256 {
        let fork_data_root = ForkData {
            current_version: fork_version,
            genesis_validators_root,
        }
        .tree_hash_root();

        let mut domain_bytes = [0; 32];
        domain_bytes[..4].copy_from_slice(&domain.as_u32().to_le_bytes());
        domain_bytes[4..].copy_from_slice(&fork_data_root.as_slice()[..28]);
        Hash256::from(domain_bytes)
    }

    /// Duration of a single slot on this network.
    pub fn slot_duration(&self) -> Duration {
        Duration::from_secs(self.seconds_per_slot)
    }
}

fn default_far_future_epoch() -> u64 {
    u64::MAX
}

fn default_max_effective_balance() -> u64 {
    32_000_000_000
}

fn default_max_validators_per_withdrawals_sweep() -> u64 {
    16384
}

/// Subset of the `/eth/v1/config/spec` response consumed by this crate.
///
/// The endpoint reports every spec constant; unknown keys are ignored. Fork
/// parameters missing from the response are treated as unscheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Config {
    #[serde(default)]
    pub config_name: Option<String>,
    pub preset_base: String,
    #[serde(with = "serde_utils::quoted_u64")]
    pub seconds_per_slot: u64,

    #[serde(with = "serde_utils::bytes_4_hex")]
    pub genesis_fork_version: ForkVersion,
    #[serde(default, with = "serde_utils::bytes_4_hex")]
    pub altair_fork_version: ForkVersion,
    #[serde(default = "default_far_future_epoch", with = "serde_utils::quoted_u64")]
    pub altair_fork_epoch: u64,
    #[serde(default, with = "serde_utils::bytes_4_hex")]
    pub bellatrix_fork_version: ForkVersion,
    #[serde(default = "default_far_future_epoch", with = "serde_utils::quoted_u64")]
    pub bellatrix_fork_epoch: u64,
    #[serde(default, with = "serde_utils::bytes_4_hex")]
    pub capella_fork_version: ForkVersion,
    #[serde(default = "default_far_future_epoch", with = "serde_utils::quoted_u64")]
    pub capella_fork_epoch: u64,
    #[serde(default, with = "serde_utils::bytes_4_hex")]
    pub deneb_fork_version: ForkVersion,
    #[serde(default = "default_far_future_epoch", with = "serde_utils::quoted_u64")]
    pub deneb_fork_epoch: u64,

    #[serde(
        default = "default_max_effective_balance",
        with = "serde_utils::quoted_u64"
    )]
    pub max_effective_balance: u64,
    #[serde(
        default = "default_max_validators_per_withdrawals_sweep",
        with = "serde_utils::quoted_u64"
    )]
    pub max_validators_per_withdrawals_sweep: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn devnet_config() -> Config {
        serde_json::from_value(json!({
            "CONFIG_NAME": "withdrawals-devnet",
            "PRESET_BASE": "minimal",
            "SECONDS_PER_SLOT": "6",
            "GENESIS_FORK_VERSION": "0x00000001",
            "ALTAIR_FORK_VERSION": "0x01000001",
            "ALTAIR_FORK_EPOCH": "0",
            "BELLATRIX_FORK_VERSION": "0x02000001",
            "BELLATRIX_FORK_EPOCH": "0",
            "CAPELLA_FORK_VERSION": "0x03000001",
            "CAPELLA_FORK_EPOCH": "1",
            "DENEB_FORK_VERSION": "0x04000001",
            "DENEB_FORK_EPOCH": "18446744073709551615",
            "MAX_EFFECTIVE_BALANCE": "32000000000",
            "MAX_VALIDATORS_PER_WITHDRAWALS_SWEEP": "16",
            "SOME_UNKNOWN_FUTURE_KEY": "42"
        }))
        .unwrap()
    }

    #[test]
    fn config_overlays_preset() {
        let spec = ChainSpec::from_config(&devnet_config()).unwrap();
        assert_eq!(spec.preset_base, EthSpecId::Minimal);
        assert_eq!(spec.altair_fork_epoch, Some(Epoch::new(0)));
        assert_eq!(spec.capella_fork_epoch, Some(Epoch::new(1)));
        assert_eq!(spec.deneb_fork_epoch, None);
        assert_eq!(spec.config_name.as_deref(), Some("withdrawals-devnet"));
    }

    #[test]
    fn unknown_preset_base_is_rejected() {
        let mut config = devnet_config();
        config.preset_base = "gnosis".to_string();
        assert_eq!(ChainSpec::from_config(&config), None);
    }

    #[test]
    fn fork_name_at_epoch_boundaries() {
        let spec = ChainSpec::from_config(&devnet_config()).unwrap();
        assert_eq!(spec.fork_name_at_epoch(Epoch::new(0)), ForkName::Bellatrix);
        assert_eq!(spec.fork_name_at_epoch(Epoch::new(1)), ForkName::Capella);
        assert_eq!(spec.fork_name_at_epoch(Epoch::new(100)), ForkName::Capella);

        let mainnet = ChainSpec::mainnet();
        assert_eq!(mainnet.fork_name_at_epoch(Epoch::new(0)), ForkName::Base);
        assert_eq!(
            mainnet.fork_name_at_epoch(Epoch::new(74240)),
            ForkName::Altair
        );
        assert_eq!(
            mainnet.fork_name_at_epoch(Epoch::new(269568)),
            ForkName::Deneb
        );
    }

    #[test]
    fn compute_domain_embeds_domain_type() {
        let spec = ChainSpec::mainnet();
        let root = Hash256::repeat_byte(0xab);
        let domain = spec.compute_domain(Domain::VoluntaryExit, [3, 0, 0, 0], root);
        assert_eq!(&domain.as_slice()[..4], &[4, 0, 0, 0]);

        // Different fork versions must yield different domains.
        let other = spec.compute_domain(Domain::VoluntaryExit, [2, 0, 0, 0], root);
        assert_ne!(domain, other);
    }
}
