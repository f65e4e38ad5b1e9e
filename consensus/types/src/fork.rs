use crate::{Epoch, ForkVersion};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Specifies a fork of the beacon chain, to prevent replay attacks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct Fork {
    #[serde(with = "serde_utils::bytes_4_hex")]
    pub previous_version: ForkVersion,
    #[serde(with = "serde_utils::bytes_4_hex")]
    pub current_version: ForkVersion,
    pub epoch: Epoch,
}

impl Fork {
    /// Return the fork version active at the given `epoch`.
    pub fn get_fork_version(&self, epoch: Epoch) -> ForkVersion {
        if epoch < self.epoch {
            return self.previous_version;
        }
        self.current_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_fork_version() {
        let previous_version = [1; 4];
        let current_version = [2; 4];
        let epoch = Epoch::new(10);

        let fork = Fork {
            previous_version,
            current_version,
            epoch,
        };

        assert_eq!(fork.get_fork_version(epoch - 1), previous_version);
        assert_eq!(fork.get_fork_version(epoch), current_version);
        assert_eq!(fork.get_fork_version(epoch + 1), current_version);
    }

    #[test]
    fn serde_hex_versions() {
        let fork: Fork = serde_json::from_value(serde_json::json!({
            "previous_version": "0x00000000",
            "current_version": "0x01000000",
            "epoch": "74240"
        }))
        .unwrap();
        assert_eq!(fork.current_version, [1, 0, 0, 0]);
        assert_eq!(fork.epoch, Epoch::new(74240));
    }
}
