use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;

use crate::types::{RpcFilter, RpcMemcmp};

/// Value compared by a memcmp filter, normalized to raw bytes by [`MemcmpValue::to_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemcmpValue {
    Bytes(Vec<u8>),
    /// UTF-8 bytes of the string.
    Str(String),
    Address(Pubkey),
    /// Little-endian, matching the on-chain struct layout.
    I32(i32),
    U8(u8),
}

impl MemcmpValue {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes.clone(),
            Self::Str(s) => s.as_bytes().to_vec(),
            Self::Address(address) => address.to_bytes().to_vec(),
            Self::I32(n) => n.to_le_bytes().to_vec(),
            Self::U8(b) => vec![*b],
        }
    }
}

impl From<Vec<u8>> for MemcmpValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for MemcmpValue {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for MemcmpValue {
    fn from(bytes: [u8; N]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<&str> for MemcmpValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for MemcmpValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Pubkey> for MemcmpValue {
    fn from(address: Pubkey) -> Self {
        Self::Address(address)
    }
}

impl From<&Pubkey> for MemcmpValue {
    fn from(address: &Pubkey) -> Self {
        Self::Address(*address)
    }
}

impl From<i32> for MemcmpValue {
    fn from(n: i32) -> Self {
        Self::I32(n)
    }
}

impl From<u8> for MemcmpValue {
    fn from(b: u8) -> Self {
        Self::U8(b)
    }
}

/// One server-side predicate. Predicates in a query are ANDed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountFilter {
    Memcmp { offset: u32, bytes: Vec<u8> },
    DataSize(u32),
}

impl AccountFilter {
    pub fn memcmp(offset: u32, value: impl Into<MemcmpValue>) -> Self {
        Self::Memcmp {
            offset,
            bytes: value.into().to_bytes(),
        }
    }

    pub fn data_size(size: u32) -> Self {
        Self::DataSize(size)
    }

    /// Wire form; memcmp patterns are base58-encoded here and nowhere earlier.
    pub fn to_rpc(&self) -> RpcFilter {
        match self {
            Self::Memcmp { offset, bytes } => RpcFilter::Memcmp {
                memcmp: RpcMemcmp {
                    offset: *offset,
                    bytes: bs58::encode(bytes).into_string(),
                },
            },
            Self::DataSize(size) => RpcFilter::DataSize { data_size: *size },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_pattern_is_little_endian() {
        let filter = AccountFilter::memcmp(4, 258_i32);
        assert_eq!(
            filter,
            AccountFilter::Memcmp {
                offset: 4,
                bytes: vec![0x02, 0x01, 0x00, 0x00],
            }
        );
        assert_eq!(
            filter.to_rpc(),
            RpcFilter::Memcmp {
                memcmp: RpcMemcmp {
                    offset: 4,
                    bytes: bs58::encode([0x02, 0x01, 0x00, 0x00]).into_string(),
                },
            }
        );
    }

    #[test]
    fn negative_int_pattern() {
        assert_eq!(MemcmpValue::from(-1_i32).to_bytes(), vec![0xff; 4]);
    }

    #[test]
    fn every_value_kind_normalizes_to_bytes() {
        let address = Pubkey::new_from_array([7; 32]);
        assert_eq!(MemcmpValue::from(address).to_bytes(), vec![7; 32]);
        assert_eq!(MemcmpValue::from(&address).to_bytes(), vec![7; 32]);
        assert_eq!(MemcmpValue::from("abc").to_bytes(), b"abc".to_vec());
        assert_eq!(MemcmpValue::from(4_u8).to_bytes(), vec![4]);
        assert_eq!(MemcmpValue::from([1_u8, 2, 3]).to_bytes(), vec![1, 2, 3]);
        assert_eq!(MemcmpValue::from(&[9_u8][..]).to_bytes(), vec![9]);
    }

    #[test]
    fn address_pattern_serializes_as_address_string() {
        let address = Pubkey::new_from_array([7; 32]);
        let RpcFilter::Memcmp { memcmp } = AccountFilter::memcmp(8, address).to_rpc() else {
            unreachable!("memcmp filter");
        };
        assert_eq!(memcmp.offset, 8);
        assert_eq!(memcmp.bytes, address.to_string());
    }

    #[test]
    fn empty_pattern_passes_through() {
        let filter = AccountFilter::memcmp(0, Vec::new());
        assert_eq!(
            filter.to_rpc(),
            RpcFilter::Memcmp {
                memcmp: RpcMemcmp {
                    offset: 0,
                    bytes: String::new(),
                },
            }
        );
    }

    #[test]
    fn data_size_has_no_offset() {
        assert_eq!(
            AccountFilter::data_size(165).to_rpc(),
            RpcFilter::DataSize { data_size: 165 }
        );
    }
}
