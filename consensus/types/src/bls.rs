//! Opaque BLS public key and signature containers.
//!
//! The rig never verifies or produces signatures (keys stay with the test
//! driver), so these are raw byte containers that round-trip the wire
//! encodings and hash correctly, without a BLS backend behind them.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use ssz::{Decode, DecodeError, Encode};
use std::fmt;
use std::str::FromStr;
use tree_hash::{PackedEncoding, TreeHash, TreeHashType};

pub const PUBLIC_KEY_BYTES_LEN: usize = 48;
pub const SIGNATURE_BYTES_LEN: usize = 96;

macro_rules! bytes_struct {
    ($name: ident, $byte_size: expr, $kind: expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; $byte_size]);

        impl $name {
            pub fn empty() -> Self {
                Self([0; $byte_size])
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn deserialize(bytes: &[u8]) -> Result<Self, String> {
                if bytes.len() != $byte_size {
                    return Err(format!(
                        "invalid {} length: expected {}, got {}",
                        $kind,
                        $byte_size,
                        bytes.len()
                    ));
                }
                let mut out = [0; $byte_size];
                out.copy_from_slice(bytes);
                Ok(Self(out))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", serde_utils::hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = serde_utils::hex::decode(s).map_err(|e| format!("{:?}", e))?;
                Self::deserialize(&bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_str(&s).map_err(D::Error::custom)
            }
        }

        impl Encode for $name {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $byte_size
            }

            fn ssz_bytes_len(&self) -> usize {
                $byte_size
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.0)
            }
        }

        impl Decode for $name {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $byte_size
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
                if bytes.len() != $byte_size {
                    return Err(DecodeError::InvalidByteLength {
                        len: bytes.len(),
                        expected: $byte_size,
                    });
                }
                let mut out = [0; $byte_size];
                out.copy_from_slice(bytes);
                Ok(Self(out))
            }
        }

        impl TreeHash for $name {
            fn tree_hash_type() -> TreeHashType {
                TreeHashType::Vector
            }

            fn tree_hash_packed_encoding(&self) -> PackedEncoding {
                unreachable!("Vector should never be packed.")
            }

            fn tree_hash_packing_factor() -> usize {
                unreachable!("Vector should never be packed.")
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                tree_hash::merkle_root(&self.0, 0)
            }
        }
    };
}

bytes_struct!(PublicKeyBytes, PUBLIC_KEY_BYTES_LEN, "public key");
bytes_struct!(SignatureBytes, SIGNATURE_BYTES_LEN, "signature");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pubkey_hex_round_trip() {
        let mut bytes = [0; PUBLIC_KEY_BYTES_LEN];
        bytes[0] = 0xaa;
        bytes[47] = 0x01;
        let pubkey = PublicKeyBytes(bytes);

        let json = serde_json::to_string(&pubkey).unwrap();
        assert!(json.starts_with("\"0xaa"));
        assert_eq!(serde_json::from_str::<PublicKeyBytes>(&json).unwrap(), pubkey);
    }

    #[test]
    fn signature_rejects_bad_length() {
        assert!(SignatureBytes::from_str("0xdeadbeef").is_err());
        assert!(serde_json::from_str::<SignatureBytes>("\"0x00\"").is_err());
    }

    #[test]
    fn ssz_round_trip() {
        let sig = SignatureBytes([0x42; SIGNATURE_BYTES_LEN]);
        assert_eq!(
            SignatureBytes::from_ssz_bytes(&sig.as_ssz_bytes()).unwrap(),
            sig
        );
    }
}
