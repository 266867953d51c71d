//! core value types for the settlement engine

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// balance in smallest currency unit
pub type Balance = u128;

/// unix timestamp in seconds
pub type Timestamp = u64;

/// round identifier, assigned by the creator
pub type RoundId = String;

/// lottery numbers are drawn from [1, MAX_NUMBER]
pub const MAX_NUMBER: u64 = 100;

/// minimum ticket price in smallest units
pub const MIN_TICKET_PRICE: Balance = 1_000;

/// minimum round duration in seconds (10 minutes)
pub const MIN_DURATION: u64 = 600;

/// maximum round duration in seconds (30 days)
pub const MAX_DURATION: u64 = 30 * 24 * 60 * 60;

/// 32-byte account identifier, supplied by the wallet layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// opaque reference to an encrypted integer held by the co-processor;
/// the engine stores and forwards these, never the plaintext
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ValueHandle(pub [u8; 32]);

impl ValueHandle {
    pub fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

// both ids serialize as lowercase hex so they read the same in the event
// log, the api and the store

macro_rules! hex_serde {
    ($ty:ident, $expecting:expr) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct HexVisitor;

                impl<'de> Visitor<'de> for HexVisitor {
                    type Value = $ty;

                    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                        write!(f, $expecting)
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<$ty, E> {
                        $ty::from_hex(v)
                            .ok_or_else(|| E::custom(concat!("invalid ", stringify!($ty))))
                    }
                }

                deserializer.deserialize_str(HexVisitor)
            }
        }
    };
}

hex_serde!(AccountId, "a 64-character hex account id");
hex_serde!(ValueHandle, "a 64-character hex value handle");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_hex_roundtrip() {
        let id = AccountId::from_raw([7u8; 32]);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(AccountId::from_hex(&hex), Some(id));
    }

    #[test]
    fn test_account_id_rejects_bad_hex() {
        assert!(AccountId::from_hex("zz").is_none());
        assert!(AccountId::from_hex("0011").is_none());
    }

    #[test]
    fn test_handle_serde_as_hex() {
        let handle = ValueHandle::from_raw([0xab; 32]);
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: ValueHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
    }
}
