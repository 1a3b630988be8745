use borsh::BorshDeserialize;
use solana_pubkey::Pubkey;

use crate::codec::{AccountCodec, DecodedAccount};
use crate::error::{CodecError, Error};
use crate::programs::{Program, require_program};
use crate::query::builder::{GpaBuilder, ProgramAccountQuery};
use crate::transport::SharedTransport;

pub const TOKEN_ACCOUNT_SIZE: u32 = 165;
pub const MINT_OFFSET: u32 = 0;
pub const OWNER_OFFSET: u32 = 32;

/// Leading fields of an SPL token account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

#[derive(BorshDeserialize)]
struct TokenAccountPrefix {
    mint: [u8; 32],
    owner: [u8; 32],
    amount: u64,
}

pub struct TokenAccountCodec;

impl AccountCodec for TokenAccountCodec {
    type Output = TokenAccount;

    fn decode(data: &[u8]) -> Result<TokenAccount, CodecError> {
        let mut buf = data;
        let prefix = TokenAccountPrefix::deserialize(&mut buf)?;
        Ok(TokenAccount {
            mint: Pubkey::new_from_array(prefix.mint),
            owner: Pubkey::new_from_array(prefix.owner),
            amount: prefix.amount,
        })
    }
}

/// Token accounts of the SPL Token (or Token-2022) program.
#[derive(Debug, Clone)]
pub struct TokenAccountQuery {
    builder: GpaBuilder,
}

impl TokenAccountQuery {
    pub fn new(connection: SharedTransport) -> Self {
        Self {
            builder: GpaBuilder::new(connection, Program::Token.program_id()),
        }
    }

    /// Only plain token accounts, excluding mints and multisigs.
    pub fn token_accounts(self) -> Self {
        self.where_size(TOKEN_ACCOUNT_SIZE)
    }

    pub fn where_mint(self, mint: &Pubkey) -> Self {
        self.where_address(MINT_OFFSET, mint)
    }

    pub fn where_owner(self, owner: &Pubkey) -> Self {
        self.where_address(OWNER_OFFSET, owner)
    }

    pub async fn fetch_token_accounts(self) -> Result<Vec<DecodedAccount<TokenAccount>>, Error> {
        self.fetch::<TokenAccountCodec>().await
    }

    /// Mints of the matched accounts; only the mint bytes are transferred.
    pub async fn fetch_mints(self) -> Result<Vec<Pubkey>, Error> {
        self.slice(MINT_OFFSET as usize, 32)
            .fetch_embedded_addresses()
            .await
    }

    pub async fn fetch_owners(self) -> Result<Vec<Pubkey>, Error> {
        self.slice(OWNER_OFFSET as usize, 32)
            .fetch_embedded_addresses()
            .await
    }
}

impl ProgramAccountQuery for TokenAccountQuery {
    fn spawn(connection: SharedTransport, program_id: Pubkey) -> Result<Self, Error> {
        require_program(
            "TokenAccountQuery",
            &program_id,
            &[Program::Token, Program::Token2022],
        )?;
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
