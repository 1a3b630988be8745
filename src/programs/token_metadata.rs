//! Token Metadata program: metadata account layout, the metadata query, and the
//! [`Token`] model built from a decoded metadata account.
//!
//! Fixed offsets below assume the program's padded layout (name 32 bytes,
//! symbol 10, uri 200), which every account written by the program uses.

use borsh::BorshDeserialize;
use solana_pubkey::Pubkey;

use crate::codec::{AccountCodec, DecodedAccount};
use crate::error::{CodecError, Error};
use crate::programs::{Program, require_program};
use crate::query::builder::{GpaBuilder, ProgramAccountQuery};
use crate::transport::SharedTransport;

pub const KEY_OFFSET: u32 = 0;
pub const UPDATE_AUTHORITY_OFFSET: u32 = 1;
pub const MINT_OFFSET: u32 = 33;
pub const FIRST_CREATOR_OFFSET: u32 = 326;

/// Account discriminator byte stored at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::FromRepr, strum_macros::Display)]
#[repr(u8)]
pub enum MetadataKey {
    Uninitialized = 0,
    EditionV1 = 1,
    MasterEditionV1 = 2,
    ReservationListV1 = 3,
    MetadataV1 = 4,
    ReservationListV2 = 5,
    MasterEditionV2 = 6,
    EditionMarker = 7,
    UseAuthorityRecord = 8,
    CollectionAuthorityRecord = 9,
    TokenOwnedEscrow = 10,
    TokenRecord = 11,
    MetadataDelegate = 12,
    EditionMarkerV2 = 13,
    HolderDelegate = 14,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::FromRepr)]
#[repr(u8)]
pub enum TokenStandard {
    NonFungible = 0,
    FungibleAsset = 1,
    Fungible = 2,
    NonFungibleEdition = 3,
    ProgrammableNonFungible = 4,
    ProgrammableNonFungibleEdition = 5,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    pub share: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub verified: bool,
    pub key: Pubkey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataData {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Vec<Creator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataAccount {
    pub key: MetadataKey,
    pub update_authority: Pubkey,
    pub mint: Pubkey,
    pub data: MetadataData,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
    pub edition_nonce: Option<u8>,
    pub token_standard: Option<TokenStandard>,
    pub collection: Option<Collection>,
}

#[derive(BorshDeserialize)]
struct RawCreator {
    address: [u8; 32],
    verified: bool,
    share: u8,
}

#[derive(BorshDeserialize)]
struct RawCollection {
    verified: bool,
    key: [u8; 32],
}

/// Fields present in every metadata account version.
#[derive(BorshDeserialize)]
struct RawMetadataHead {
    key: u8,
    update_authority: [u8; 32],
    mint: [u8; 32],
    name: String,
    symbol: String,
    uri: String,
    seller_fee_basis_points: u16,
    creators: Option<Vec<RawCreator>>,
    primary_sale_happened: bool,
    is_mutable: bool,
}

/// Optional trailing field: accounts written before the field existed end early.
fn read_tail<T: BorshDeserialize>(buf: &mut &[u8]) -> Result<Option<T>, CodecError> {
    if buf.is_empty() {
        return Ok(None);
    }
    Ok(Option::<T>::deserialize(buf)?)
}

fn invalid_data(message: String) -> CodecError {
    CodecError::Borsh(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    ))
}

fn trim_padding(s: String) -> String {
    s.trim_end_matches('\0').to_string()
}

pub struct MetadataCodec;

impl AccountCodec for MetadataCodec {
    type Output = MetadataAccount;

    fn decode(data: &[u8]) -> Result<MetadataAccount, CodecError> {
        let mut buf = data;
        let head = RawMetadataHead::deserialize(&mut buf)?;

        let key = MetadataKey::from_repr(head.key)
            .ok_or_else(|| invalid_data(format!("unknown metadata key {}", head.key)))?;
        if key != MetadataKey::MetadataV1 {
            let reason = format!("expected a MetadataV1 account, found {key}");
            return Err(invalid_data(reason));
        }
        let edition_nonce = read_tail::<u8>(&mut buf)?;
        let token_standard = read_tail::<u8>(&mut buf)?
            .map(|raw| {
                TokenStandard::from_repr(raw)
                    .ok_or_else(|| invalid_data(format!("unknown token standard {raw}")))
            })
            .transpose()?;
        let collection = read_tail::<RawCollection>(&mut buf)?.map(|raw| Collection {
            verified: raw.verified,
            key: Pubkey::new_from_array(raw.key),
        });

        Ok(MetadataAccount {
            key,
            update_authority: Pubkey::new_from_array(head.update_authority),
            mint: Pubkey::new_from_array(head.mint),
            data: MetadataData {
                name: trim_padding(head.name),
                symbol: trim_padding(head.symbol),
                uri: trim_padding(head.uri),
                seller_fee_basis_points: head.seller_fee_basis_points,
                creators: head
                    .creators
                    .unwrap_or_default()
                    .into_iter()
                    .map(|raw| Creator {
                        address: Pubkey::new_from_array(raw.address),
                        verified: raw.verified,
                        share: raw.share,
                    })
                    .collect(),
            },
            primary_sale_happened: head.primary_sale_happened,
            is_mutable: head.is_mutable,
            edition_nonce,
            token_standard,
            collection,
        })
    }
}

/// A token as described by its on-chain metadata account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Address of the metadata account this token was read from.
    pub metadata_address: Pubkey,
    pub update_authority: Pubkey,
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Vec<Creator>,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
    pub edition_nonce: Option<u8>,
    pub token_standard: Option<TokenStandard>,
    pub collection: Option<Collection>,
}

pub type FungibleToken = Token;

impl Token {
    pub fn from_metadata(metadata_address: Pubkey, metadata: MetadataAccount) -> Self {
        Self {
            metadata_address,
            update_authority: metadata.update_authority,
            mint: metadata.mint,
            name: metadata.data.name,
            symbol: metadata.data.symbol,
            uri: metadata.data.uri,
            seller_fee_basis_points: metadata.data.seller_fee_basis_points,
            creators: metadata.data.creators,
            primary_sale_happened: metadata.primary_sale_happened,
            is_mutable: metadata.is_mutable,
            edition_nonce: metadata.edition_nonce,
            token_standard: metadata.token_standard,
            collection: metadata.collection,
        }
    }
}

impl From<DecodedAccount<MetadataAccount>> for Token {
    fn from(account: DecodedAccount<MetadataAccount>) -> Self {
        Self::from_metadata(account.address, account.data)
    }
}

/// Metadata accounts of the Token Metadata program.
#[derive(Debug, Clone)]
pub struct MetadataQuery {
    builder: GpaBuilder,
}

impl MetadataQuery {
    pub fn new(connection: SharedTransport) -> Self {
        Self {
            builder: GpaBuilder::new(connection, Program::TokenMetadata.program_id()),
        }
    }

    /// Only `MetadataV1` accounts, skipping editions and records.
    pub fn metadata_v1(self) -> Self {
        self.where_u8(KEY_OFFSET, MetadataKey::MetadataV1 as u8)
    }

    pub fn where_update_authority(self, authority: &Pubkey) -> Self {
        self.where_address(UPDATE_AUTHORITY_OFFSET, authority)
    }

    pub fn where_mint(self, mint: &Pubkey) -> Self {
        self.where_address(MINT_OFFSET, mint)
    }

    pub fn where_first_creator(self, creator: &Pubkey) -> Self {
        self.where_address(FIRST_CREATOR_OFFSET, creator)
    }

    pub async fn fetch_tokens(self) -> Result<Vec<Token>, Error> {
        self.fetch_and_map::<MetadataCodec, _, _>(|accounts| {
            accounts.into_iter().map(Token::from).collect::<Vec<_>>()
        })
        .await
    }

    /// Mints referenced by the matched metadata accounts; only the mint bytes are transferred.
    pub async fn fetch_mints(self) -> Result<Vec<Pubkey>, Error> {
        self.slice(MINT_OFFSET as usize, 32)
            .fetch_embedded_addresses()
            .await
    }
}

impl ProgramAccountQuery for MetadataQuery {
    fn spawn(connection: SharedTransport, program_id: Pubkey) -> Result<Self, Error> {
        require_program("MetadataQuery", &program_id, &[Program::TokenMetadata])?;
        Ok(Self {
            builder: GpaBuilder::new(connection, program_id),
        })
    }

    fn builder(&self) -> &GpaBuilder {
        &self.builder
    }

    fn builder_mut(&mut self) -> &mut GpaBuilder {
        &mut self.builder
    }

    fn into_builder(self) -> GpaBuilder {
        self.builder
    }
}


#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::fixture::metadata_bytes;
    use super::*;
    use crate::error::TransportError;
    use crate::query::filter::AccountFilter;
    use crate::transport::ProgramAccountsTransport;
    use crate::types::{GetProgramAccountsRequest, RpcKeyedAccount};

    struct Unreachable;

    #[async_trait]
    impl ProgramAccountsTransport for Unreachable {
        async fn get_program_accounts(
            &self,
            _request: GetProgramAccountsRequest,
        ) -> Result<Vec<RpcKeyedAccount>, TransportError> {
            Err("offline".into())
        }
    }

    #[test]
    fn first_creator_offset_matches_padded_layout() {
        let creator = Pubkey::new_from_array([7; 32]);
        let data = metadata_bytes(
            &Pubkey::new_from_array([1; 32]),
            &Pubkey::new_from_array([2; 32]),
            "Name",
            &[(creator, true, 100)],
            &[],
        );
        let offset = FIRST_CREATOR_OFFSET as usize;
        assert_eq!(&data[offset..offset + 32], creator.to_bytes().as_slice());
        let mint_offset = MINT_OFFSET as usize;
        assert_eq!(&data[mint_offset..mint_offset + 32], &[2; 32]);
    }

    #[test]
    fn decodes_full_metadata_account() {
        let creator = Pubkey::new_from_array([7; 32]);
        let collection = Pubkey::new_from_array([8; 32]);
        let mut tail = vec![1, 254, 1, 4, 1, 1];
        tail.extend_from_slice(&collection.to_bytes());
        tail.resize(tail.len() + 40, 0);

        let data = metadata_bytes(
            &Pubkey::new_from_array([1; 32]),
            &Pubkey::new_from_array([2; 32]),
            "Degen Ape #1",
            &[(creator, true, 100)],
            &tail,
        );
        let metadata = MetadataCodec::decode(&data).unwrap();

        assert_eq!(metadata.key, MetadataKey::MetadataV1);
        assert_eq!(metadata.data.name, "Degen Ape #1");
        assert_eq!(metadata.data.symbol, "SYM");
        assert_eq!(metadata.data.uri, "https://example.com/meta.json");
        assert_eq!(metadata.data.seller_fee_basis_points, 500);
        assert_eq!(
            metadata.data.creators,
            vec![Creator {
                address: creator,
                verified: true,
                share: 100
            }]
        );
        assert!(metadata.primary_sale_happened);
        assert!(metadata.is_mutable);
        assert_eq!(metadata.edition_nonce, Some(254));
        assert_eq!(
            metadata.token_standard,
            Some(TokenStandard::ProgrammableNonFungible)
        );
        assert_eq!(
            metadata.collection,
            Some(Collection {
                verified: true,
                key: collection
            })
        );
    }

    #[test]
    fn legacy_account_without_tail_decodes() {
        let data = metadata_bytes(
            &Pubkey::new_from_array([1; 32]),
            &Pubkey::new_from_array([2; 32]),
            "Old",
            &[],
            &[],
        );
        let metadata = MetadataCodec::decode(&data).unwrap();
        assert!(metadata.data.creators.is_empty());
        assert_eq!(metadata.edition_nonce, None);
        assert_eq!(metadata.token_standard, None);
        assert_eq!(metadata.collection, None);
    }

    #[test]
    fn unknown_token_standard_is_rejected() {
        let data = metadata_bytes(
            &Pubkey::new_from_array([1; 32]),
            &Pubkey::new_from_array([2; 32]),
            "Odd",
            &[],
            &[0, 1, 42],
        );
        match MetadataCodec::decode(&data) {
            Err(CodecError::Borsh(e)) => assert!(e.to_string().contains("token standard 42")),
            other => panic!("expected invalid data, got {other:?}"),
        }
    }

    #[test]
    fn edition_account_is_not_decoded_as_metadata() {
        let mut data = metadata_bytes(
            &Pubkey::new_from_array([1; 32]),
            &Pubkey::new_from_array([2; 32]),
            "Edition",
            &[],
            &[],
        );
        data[0] = MetadataKey::MasterEditionV2 as u8;
        match MetadataCodec::decode(&data) {
            Err(CodecError::Borsh(e)) => assert!(e.to_string().contains("found MasterEditionV2")),
            other => panic!("expected invalid data, got {other:?}"),
        }
    }

    #[test]
    fn token_copies_metadata_fields() {
        let data = metadata_bytes(
            &Pubkey::new_from_array([1; 32]),
            &Pubkey::new_from_array([2; 32]),
            "Gold",
            &[],
            &[],
        );
        let address = Pubkey::new_from_array([3; 32]);
        let token: FungibleToken =
            Token::from_metadata(address, MetadataCodec::decode(&data).unwrap());
        assert_eq!(token.metadata_address, address);
        assert_eq!(token.mint, Pubkey::new_from_array([2; 32]));
        assert_eq!(token.update_authority, Pubkey::new_from_array([1; 32]));
        assert_eq!(token.name, "Gold");
    }

    #[test]
    fn query_filters_use_metadata_offsets() {
        let authority = Pubkey::new_from_array([1; 32]);
        let creator = Pubkey::new_from_array([7; 32]);
        let query = MetadataQuery::new(Arc::new(Unreachable))
            .metadata_v1()
            .where_update_authority(&authority)
            .where_first_creator(&creator);

        assert_eq!(
            query.config().filters(),
            &[
                AccountFilter::memcmp(0, 4_u8),
                AccountFilter::memcmp(1, authority),
                AccountFilter::memcmp(326, creator),
            ]
        );
    }

    #[test]
    fn spawn_refuses_other_programs() {
        let result = MetadataQuery::spawn(Arc::new(Unreachable), Program::Token.program_id());
        match result {
            Err(Error::Construction { reason }) => {
                assert!(reason.contains("MetadataQuery"));
                assert!(reason.contains(crate::programs::TOKEN_PROGRAM_ID));
            }
            other => panic!("expected construction error, got {other:?}"),
        }
    }
}
