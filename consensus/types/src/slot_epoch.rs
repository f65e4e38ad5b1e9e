//! The `Slot` and `Epoch` types are wrappers around `u64` so the two time
//! units cannot be mixed up in function signatures. Arithmetic saturates
//! rather than wrapping, since slot math on remote data must never panic in
//! the middle of a poll loop.

use serde::{Deserialize, Serialize};
use ssz::{Decode, DecodeError, Encode};
use std::fmt;
use std::str::FromStr;
use tree_hash::{PackedEncoding, TreeHash, TreeHashType};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Slot(#[serde(with = "serde_utils::quoted_u64")] u64);

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Epoch(#[serde(with = "serde_utils::quoted_u64")] u64);

macro_rules! impl_common {
    ($type: ident) => {
        impl $type {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub const fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub const fn max_value() -> Self {
                Self(u64::MAX)
            }

            pub fn saturating_sub<T: Into<u64>>(&self, other: T) -> Self {
                Self(self.0.saturating_sub(other.into()))
            }

            pub fn saturating_add<T: Into<u64>>(&self, other: T) -> Self {
                Self(self.0.saturating_add(other.into()))
            }
        }

        impl From<u64> for $type {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$type> for u64 {
            fn from(value: $type) -> u64 {
                value.0
            }
        }

        impl std::ops::Add<u64> for $type {
            type Output = Self;

            fn add(self, rhs: u64) -> Self {
                Self(self.0.saturating_add(rhs))
            }
        }

        impl std::ops::Add<$type> for $type {
            type Output = Self;

            fn add(self, rhs: $type) -> Self {
                Self(self.0.saturating_add(rhs.0))
            }
        }

        impl std::ops::AddAssign<u64> for $type {
            fn add_assign(&mut self, rhs: u64) {
                self.0 = self.0.saturating_add(rhs);
            }
        }

        impl std::ops::Sub<u64> for $type {
            type Output = Self;

            fn sub(self, rhs: u64) -> Self {
                Self(self.0.saturating_sub(rhs))
            }
        }

        impl std::ops::Rem<u64> for $type {
            type Output = Self;

            fn rem(self, rhs: u64) -> Self {
                Self(self.0 % rhs)
            }
        }

        impl PartialEq<u64> for $type {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl PartialOrd<u64> for $type {
            fn partial_cmp(&self, other: &u64) -> Option<std::cmp::Ordering> {
                self.0.partial_cmp(other)
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $type {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                u64::from_str(s).map(Self)
            }
        }

        impl Encode for $type {
            fn is_ssz_fixed_len() -> bool {
                <u64 as Encode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as Encode>::ssz_fixed_len()
            }

            fn ssz_bytes_len(&self) -> usize {
                self.0.ssz_bytes_len()
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                self.0.ssz_append(buf)
            }
        }

        impl Decode for $type {
            fn is_ssz_fixed_len() -> bool {
                <u64 as Decode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as Decode>::ssz_fixed_len()
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
                u64::from_ssz_bytes(bytes).map(Self)
            }
        }

        impl TreeHash for $type {
            fn tree_hash_type() -> TreeHashType {
                <u64 as TreeHash>::tree_hash_type()
            }

            fn tree_hash_packed_encoding(&self) -> PackedEncoding {
                self.0.tree_hash_packed_encoding()
            }

            fn tree_hash_packing_factor() -> usize {
                <u64 as TreeHash>::tree_hash_packing_factor()
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                self.0.tree_hash_root()
            }
        }
    };
}

impl_common!(Slot);
impl_common!(Epoch);

impl Slot {
    /// Returns the epoch this slot belongs to.
    pub fn epoch(self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0 / slots_per_epoch)
    }
}

impl Epoch {
    /// Returns the first slot of this epoch.
    pub fn start_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }

    /// Returns the last slot of this epoch.
    pub fn end_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(
            self.0
                .saturating_add(1)
                .saturating_mul(slots_per_epoch)
                .saturating_sub(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_to_epoch() {
        assert_eq!(Slot::new(0).epoch(32), Epoch::new(0));
        assert_eq!(Slot::new(31).epoch(32), Epoch::new(0));
        assert_eq!(Slot::new(32).epoch(32), Epoch::new(1));
        assert_eq!(Slot::new(127).epoch(32), Epoch::new(3));
    }

    #[test]
    fn epoch_slot_bounds() {
        assert_eq!(Epoch::new(3).start_slot(32), Slot::new(96));
        assert_eq!(Epoch::new(3).end_slot(32), Slot::new(127));
    }

    #[test]
    fn saturating_arithmetic() {
        assert_eq!(Slot::new(0) - 10, Slot::new(0));
        assert_eq!(Epoch::max_value() + 1, Epoch::max_value());
    }

    #[test]
    fn quoted_serde_round_trip() {
        let slot: Slot = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(slot, Slot::new(42));
        assert_eq!(serde_json::to_string(&slot).unwrap(), "\"42\"");
    }

    #[test]
    fn ssz_round_trip() {
        let epoch = Epoch::new(u64::MAX);
        assert_eq!(Epoch::from_ssz_bytes(&epoch.as_ssz_bytes()).unwrap(), epoch);
    }
}
