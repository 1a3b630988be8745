use std::marker::PhantomData;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use borsh::BorshDeserialize;
use solana_pubkey::Pubkey;

use crate::error::{CodecError, Error};
use crate::types::{AccountEncoding, RpcAccountData, RpcKeyedAccount};

/// Turns raw account bytes into a typed payload.
///
/// Codecs are zero-sized marker types; the builder never instantiates them,
/// it only calls [`AccountCodec::decode`] on each returned account.
pub trait AccountCodec {
    type Output: Send;

    fn decode(data: &[u8]) -> Result<Self::Output, CodecError>;
}

/// Borsh layout read from the start of the data. Trailing bytes are ignored,
/// since on-chain accounts are often allocated larger than their struct.
pub struct BorshCodec<T>(PhantomData<T>);

impl<T: BorshDeserialize + Send> AccountCodec for BorshCodec<T> {
    type Output = T;

    fn decode(data: &[u8]) -> Result<T, CodecError> {
        let mut buf = data;
        Ok(T::deserialize(&mut buf)?)
    }
}

/// The data bytes unchanged.
pub struct RawBytes;

impl AccountCodec for RawBytes {
    type Output = Vec<u8>;

    fn decode(data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }
}

/// Accepts any payload, including an empty one from `without_data`.
pub struct IgnoreData;

impl AccountCodec for IgnoreData {
    type Output = ();

    fn decode(_data: &[u8]) -> Result<(), CodecError> {
        Ok(())
    }
}

/// Reads a single address from the first 32 bytes of the data.
pub struct AddressCodec;

impl AccountCodec for AddressCodec {
    type Output = Pubkey;

    fn decode(data: &[u8]) -> Result<Pubkey, CodecError> {
        read_address(data)
    }
}

pub(crate) fn read_address(data: &[u8]) -> Result<Pubkey, CodecError> {
    let bytes = data.first_chunk::<32>().ok_or(CodecError::TooShort {
        expected: 32,
        actual: data.len(),
    })?;
    Ok(Pubkey::new_from_array(*bytes))
}

/// One matched program account with its decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAccount<T> {
    pub address: Pubkey,
    pub lamports: u64,
    pub owner: Pubkey,
    pub executable: bool,
    pub data: T,
}

impl<T> DecodedAccount<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DecodedAccount<U> {
        DecodedAccount {
            address: self.address,
            lamports: self.lamports,
            owner: self.owner,
            executable: self.executable,
            data: f(self.data),
        }
    }
}

pub fn decode_account_data(data: &RpcAccountData) -> Result<Vec<u8>, CodecError> {
    let RpcAccountData(payload, encoding) = data;
    match encoding {
        AccountEncoding::Base64 => Ok(STANDARD.decode(payload)?),
        AccountEncoding::Base58 => Ok(bs58::decode(payload).into_vec()?),
        AccountEncoding::Base64Zstd => {
            let compressed = STANDARD.decode(payload)?;
            // a zero-length slice can come back as an empty string
            if compressed.is_empty() {
                return Ok(compressed);
            }
            zstd::decode_all(compressed.as_slice()).map_err(CodecError::Zstd)
        }
    }
}

pub fn decode_account<C: AccountCodec>(
    raw: RpcKeyedAccount,
) -> Result<DecodedAccount<C::Output>, Error> {
    let address = Pubkey::from_str(&raw.pubkey).map_err(|e| Error::decode(&raw.pubkey, e))?;
    let owner = Pubkey::from_str(&raw.account.owner)
        .map_err(|e| Error::decode(&raw.pubkey, format!("owner: {e}")))?;
    let data = decode_account_data(&raw.account.data)
        .and_then(|bytes| C::decode(&bytes))
        .map_err(|e| {
            tracing::warn!(address = %raw.pubkey, error = %e, "account payload failed to decode");
            Error::decode(&raw.pubkey, e)
        })?;

    Ok(DecodedAccount {
        address,
        lamports: raw.account.lamports,
        owner,
        executable: raw.account.executable,
        data,
    })
}

/// Decode every account, in order. The first failure fails the whole batch.
pub fn decode_accounts<C: AccountCodec>(
    raw: Vec<RpcKeyedAccount>,
) -> Result<Vec<DecodedAccount<C::Output>>, Error> {
    raw.into_iter().map(decode_account::<C>).collect()
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]
mod tests {
    use super::*;
    use crate::types::RpcAccount;

    #[derive(BorshDeserialize, Debug, PartialEq)]
    struct Counter {
        authority: [u8; 32],
        count: u64,
    }

    fn keyed(pubkey: &Pubkey, data: &[u8]) -> RpcKeyedAccount {
        RpcKeyedAccount {
            pubkey: pubkey.to_string(),
            account: RpcAccount {
                lamports: 1_000,
                owner: Pubkey::new_from_array([0; 32]).to_string(),
                data: RpcAccountData(STANDARD.encode(data), AccountEncoding::Base64),
                executable: false,
                rent_epoch: 0,
                space: Some(data.len() as u64),
            },
        }
    }

    #[test]
    fn borsh_codec_reads_prefix_and_ignores_tail() {
        let mut data = vec![5_u8; 32];
        data.extend_from_slice(&42_u64.to_le_bytes());
        data.extend_from_slice(&[0xaa; 16]);

        let counter = BorshCodec::<Counter>::decode(&data).unwrap();
        assert_eq!(counter.authority, [5; 32]);
        assert_eq!(counter.count, 42);
    }

    #[test]
    fn borsh_codec_rejects_short_data() {
        assert!(matches!(
            BorshCodec::<Counter>::decode(&[1, 2, 3]),
            Err(CodecError::Borsh(_))
        ));
    }

    #[test]
    fn address_codec_needs_32_bytes() {
        let address = Pubkey::new_from_array([3; 32]);
        let mut data = address.to_bytes().to_vec();
        data.push(0);
        assert_eq!(AddressCodec::decode(&data).unwrap(), address);

        match AddressCodec::decode(&[1; 31]) {
            Err(CodecError::TooShort { expected, actual }) => {
                assert_eq!((expected, actual), (32, 31));
            }
            other => panic!("expected TooShort, got {other:?}"),
        }
    }

    #[test]
    fn ignore_data_accepts_empty_payload() {
        assert!(IgnoreData::decode(&[]).is_ok());
    }

    #[test]
    fn account_data_encodings() {
        let base58 = RpcAccountData(
            bs58::encode([1, 2, 3]).into_string(),
            AccountEncoding::Base58,
        );
        assert_eq!(decode_account_data(&base58).unwrap(), vec![1, 2, 3]);

        let base64 = RpcAccountData("AQID".to_string(), AccountEncoding::Base64);
        assert_eq!(decode_account_data(&base64).unwrap(), vec![1, 2, 3]);

        let compressed = zstd::encode_all(&[1_u8, 2, 3][..], 0).unwrap();
        let zstd_data = RpcAccountData(STANDARD.encode(compressed), AccountEncoding::Base64Zstd);
        assert_eq!(decode_account_data(&zstd_data).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn zstd_payload_edge_cases() {
        let empty = RpcAccountData(String::new(), AccountEncoding::Base64Zstd);
        assert!(decode_account_data(&empty).unwrap().is_empty());

        let garbage = RpcAccountData("AQID".to_string(), AccountEncoding::Base64Zstd);
        assert!(matches!(
            decode_account_data(&garbage),
            Err(CodecError::Zstd(_))
        ));
    }

    #[test]
    fn decode_accounts_keeps_order_and_metadata() {
        let first = Pubkey::new_from_array([1; 32]);
        let second = Pubkey::new_from_array([2; 32]);
        let decoded =
            decode_accounts::<RawBytes>(vec![keyed(&second, &[2]), keyed(&first, &[1])]).unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].address, second);
        assert_eq!(decoded[0].data, vec![2]);
        assert_eq!(decoded[1].address, first);
        assert_eq!(decoded[1].lamports, 1_000);
        assert_eq!(decoded[1].owner, Pubkey::new_from_array([0; 32]));
    }

    #[test]
    fn one_bad_account_fails_the_batch() {
        let good = Pubkey::new_from_array([1; 32]);
        let bad = Pubkey::new_from_array([2; 32]);
        let result =
            decode_accounts::<AddressCodec>(vec![keyed(&good, &[9; 32]), keyed(&bad, &[9; 4])]);

        match result {
            Err(Error::Decode { address, reason }) => {
                assert_eq!(address, bad.to_string());
                assert!(reason.contains("32"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_address_is_a_decode_error() {
        let mut raw = keyed(&Pubkey::new_from_array([1; 32]), &[]);
        raw.pubkey = "not-a-key".to_string();
        assert!(matches!(
            decode_account::<IgnoreData>(raw),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn decoded_account_map_keeps_address() {
        let account = DecodedAccount {
            address: Pubkey::new_from_array([4; 32]),
            lamports: 1,
            owner: Pubkey::new_from_array([0; 32]),
            executable: false,
            data: vec![1_u8, 2],
        };
        let mapped = account.clone().map(|data| data.len());
        assert_eq!(mapped.address, account.address);
        assert_eq!(mapped.data, 2);
    }
}
