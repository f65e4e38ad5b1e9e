use crate::{Address, ChainSpec, Epoch, Hash256, PublicKeyBytes};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Information about a `BeaconChain` validator.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub effective_balance: u64,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl Validator {
    /// Returns `true` if the validator is considered active at some epoch.
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    /// Returns `true` if the validator is able to withdraw at some epoch.
    pub fn is_withdrawable_at(&self, epoch: Epoch) -> bool {
        epoch >= self.withdrawable_epoch
    }

    /// Returns `true` if the validator has a 0x01 prefixed "eth1" withdrawal
    /// credential.
    pub fn has_eth1_withdrawal_credential(&self, spec: &ChainSpec) -> bool {
        self.withdrawal_credentials
            .as_slice()
            .first()
            .map(|byte| *byte == spec.eth1_address_withdrawal_prefix_byte)
            .unwrap_or(false)
    }

    /// Get the execution withdrawal address if this validator has one
    /// initialized.
    pub fn get_eth1_withdrawal_address(&self, spec: &ChainSpec) -> Option<Address> {
        self.has_eth1_withdrawal_credential(spec)
            .then(|| Address::from_slice(&self.withdrawal_credentials.as_slice()[12..]))
    }

    /// Returns `true` if the validator is fully withdrawable at some epoch.
    pub fn is_fully_withdrawable_at(&self, balance: u64, epoch: Epoch, spec: &ChainSpec) -> bool {
        self.has_eth1_withdrawal_credential(spec)
            && self.withdrawable_epoch <= epoch
            && balance > 0
    }

    /// Returns `true` if the validator is partially withdrawable.
    pub fn is_partially_withdrawable_validator(&self, balance: u64, spec: &ChainSpec) -> bool {
        let has_max_effective_balance = self.effective_balance == spec.max_effective_balance;
        let has_excess_balance = balance > spec.max_effective_balance;
        self.has_eth1_withdrawal_credential(spec) && has_max_effective_balance && has_excess_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth1_credentials(address_byte: u8) -> Hash256 {
        let mut credentials = [0u8; 32];
        credentials[0] = 0x01;
        credentials[12..].copy_from_slice(&[address_byte; 20]);
        Hash256::from(credentials)
    }

    #[test]
    fn default_validator_has_no_eth1_credential() {
        let spec = ChainSpec::mainnet();
        let validator = Validator::default();
        assert!(!validator.has_eth1_withdrawal_credential(&spec));
        assert_eq!(validator.get_eth1_withdrawal_address(&spec), None);
    }

    #[test]
    fn eth1_withdrawal_address_drops_prefix_bytes() {
        let spec = ChainSpec::mainnet();
        let validator = Validator {
            withdrawal_credentials: eth1_credentials(0xfe),
            ..Validator::default()
        };
        assert_eq!(
            validator.get_eth1_withdrawal_address(&spec),
            Some(Address::from_slice(&[0xfe; 20]))
        );
    }

    #[test]
    fn fully_withdrawable_requires_credential_epoch_and_balance() {
        let spec = ChainSpec::mainnet();
        let validator = Validator {
            withdrawal_credentials: eth1_credentials(0x01),
            withdrawable_epoch: Epoch::new(10),
            ..Validator::default()
        };

        assert!(validator.is_fully_withdrawable_at(32, Epoch::new(10), &spec));
        assert!(validator.is_fully_withdrawable_at(32, Epoch::new(11), &spec));
        assert!(!validator.is_fully_withdrawable_at(32, Epoch::new(9), &spec));
        assert!(!validator.is_fully_withdrawable_at(0, Epoch::new(10), &spec));

        let bls_validator = Validator {
            withdrawable_epoch: Epoch::new(10),
            ..Validator::default()
        };
        assert!(!bls_validator.is_fully_withdrawable_at(32, Epoch::new(10), &spec));
    }

    #[test]
    fn partially_withdrawable_requires_max_effective_balance() {
        let spec = ChainSpec::mainnet();
        let validator = Validator {
            withdrawal_credentials: eth1_credentials(0x01),
            effective_balance: spec.max_effective_balance,
            ..Validator::default()
        };

        assert!(validator.is_partially_withdrawable_validator(33_000_000_000, &spec));
        assert!(!validator.is_partially_withdrawable_validator(32_000_000_000, &spec));

        let under_effective = Validator {
            effective_balance: spec.max_effective_balance - 1,
            ..validator
        };
        assert!(!under_effective.is_partially_withdrawable_validator(33_000_000_000, &spec));
    }
}
