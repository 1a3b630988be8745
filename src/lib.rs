#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]

pub mod codec;
pub mod error;
pub mod programs;
pub mod query;
pub mod transport;
pub mod types;

pub use codec::{
    AccountCodec, AddressCodec, BorshCodec, DecodedAccount, IgnoreData, RawBytes, decode_accounts,
};
pub use error::{CodecError, Error, TransportError};
pub use programs::spl_token::{TokenAccount, TokenAccountCodec, TokenAccountQuery};
pub use programs::token_metadata::{
    FungibleToken, MetadataAccount, MetadataCodec, MetadataQuery, Token, TokenStandard,
};
pub use programs::{Program, TOKEN_2022_PROGRAM_ID, TOKEN_METADATA_PROGRAM_ID, TOKEN_PROGRAM_ID};
pub use query::QueryConfig;
pub use query::builder::{GpaBuilder, ProgramAccountQuery, derive_query};
pub use query::filter::{AccountFilter, MemcmpValue};
pub use solana_pubkey::Pubkey;
pub use transport::{ProgramAccountsTransport, SharedTransport};
pub use types::{
    AccountEncoding, CommitmentLevel, DataSlice, GetProgramAccountsRequest, RpcKeyedAccount,
    parse_json_rpc_response,
};
