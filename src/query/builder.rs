use std::fmt;

use solana_pubkey::Pubkey;

use crate::codec::{AccountCodec, AddressCodec, DecodedAccount, IgnoreData, decode_accounts};
use crate::error::Error;
use crate::query::QueryConfig;
use crate::query::filter::{AccountFilter, MemcmpValue};
use crate::transport::SharedTransport;
use crate::types::{AccountEncoding, CommitmentLevel, DataSlice, GetProgramAccountsRequest};

/// Generic `getProgramAccounts` query for one program.
///
/// Chained calls take the builder by value and hand it back; the terminal
/// `fetch*` calls consume it, so a dispatched builder cannot be reused.
#[derive(Clone)]
pub struct GpaBuilder {
    connection: SharedTransport,
    program_id: Pubkey,
    config: QueryConfig,
}

impl fmt::Debug for GpaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpaBuilder")
            .field("program_id", &self.program_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GpaBuilder {
    pub fn new(connection: SharedTransport, program_id: Pubkey) -> Self {
        Self {
            connection,
            program_id,
            config: QueryConfig::default(),
        }
    }

    /// Snapshot of the request this builder would dispatch right now.
    pub fn request(&self) -> GetProgramAccountsRequest {
        GetProgramAccountsRequest {
            program_id: self.program_id,
            config: self.config.to_rpc_config(),
        }
    }

    async fn dispatch<C: AccountCodec>(self) -> Result<Vec<DecodedAccount<C::Output>>, Error> {
        let request = self.request();
        tracing::debug!(
            program_id = %request.program_id,
            commitment = %request.config.commitment,
            filters = self.config.filters().len(),
            "dispatching getProgramAccounts"
        );

        let raw = self
            .connection
            .get_program_accounts(request)
            .await
            .map_err(Error::Transport)?;
        tracing::debug!(
            program_id = %self.program_id,
            accounts = raw.len(),
            "getProgramAccounts returned"
        );

        decode_accounts::<C>(raw)
    }
}

impl ProgramAccountQuery for GpaBuilder {
    fn spawn(connection: SharedTransport, program_id: Pubkey) -> Result<Self, Error> {
        Ok(Self::new(connection, program_id))
    }

    fn builder(&self) -> &GpaBuilder {
        self
    }

    fn builder_mut(&mut self) -> &mut GpaBuilder {
        self
    }

    fn into_builder(self) -> GpaBuilder {
        self
    }
}

fn replace_config<Q: ProgramAccountQuery>(
    mut query: Q,
    f: impl FnOnce(&QueryConfig) -> QueryConfig,
) -> Q {
    let builder = query.builder_mut();
    builder.config = f(&builder.config);
    query
}

/// Chainable query surface shared by [`GpaBuilder`] and every program-specific
/// builder wrapping one.
///
/// Implementors supply the constructor capability ([`spawn`](Self::spawn)) and
/// access to the inner [`GpaBuilder`]; everything else is provided and returns
/// `Self`, so a specialized builder keeps its own convenience methods after
/// any generic call.
pub trait ProgramAccountQuery: Sized {
    /// Build an empty query for `program_id` on `connection`.
    ///
    /// Returns [`Error::Construction`] when this builder type cannot query
    /// that program.
    fn spawn(connection: SharedTransport, program_id: Pubkey) -> Result<Self, Error>;

    fn builder(&self) -> &GpaBuilder;

    fn builder_mut(&mut self) -> &mut GpaBuilder;

    fn into_builder(self) -> GpaBuilder;

    fn connection(&self) -> &SharedTransport {
        &self.builder().connection
    }

    fn program_id(&self) -> Pubkey {
        self.builder().program_id
    }

    fn config(&self) -> &QueryConfig {
        &self.builder().config
    }

    fn merge_config(self, config: &QueryConfig) -> Self {
        replace_config(self, |current| current.merge(config))
    }

    /// Only return `length` bytes of each account's data starting at `offset`.
    fn slice(self, offset: usize, length: usize) -> Self {
        replace_config(self, |current| {
            current.with_data_slice(Some(DataSlice { offset, length }))
        })
    }

    /// Zero-length slice, for queries that only need addresses.
    fn without_data(self) -> Self {
        self.slice(0, 0)
    }

    fn with_commitment(self, commitment: CommitmentLevel) -> Self {
        replace_config(self, |current| {
            current.with_replaced_fields(None, Some(commitment), None)
        })
    }

    fn with_encoding(self, encoding: AccountEncoding) -> Self {
        replace_config(self, |current| {
            current.with_replaced_fields(Some(encoding), None, None)
        })
    }

    fn add_filter(self, filter: AccountFilter) -> Self {
        replace_config(self, |current| current.with_filter(filter))
    }

    /// Match `value` at `offset` in the account data.
    fn where_eq(self, offset: u32, value: impl Into<MemcmpValue>) -> Self {
        self.add_filter(AccountFilter::memcmp(offset, value))
    }

    fn where_bytes(self, offset: u32, bytes: &[u8]) -> Self {
        self.where_eq(offset, bytes)
    }

    fn where_str(self, offset: u32, s: &str) -> Self {
        self.where_eq(offset, s)
    }

    fn where_address(self, offset: u32, address: &Pubkey) -> Self {
        self.where_eq(offset, address)
    }

    fn where_i32(self, offset: u32, n: i32) -> Self {
        self.where_eq(offset, n)
    }

    fn where_u8(self, offset: u32, byte: u8) -> Self {
        self.where_eq(offset, byte)
    }

    fn where_size(self, size: u32) -> Self {
        self.add_filter(AccountFilter::data_size(size))
    }

    /// Re-home the accumulated configuration onto another builder type.
    fn into_query<Q: ProgramAccountQuery>(self) -> Result<Q, Error> {
        derive_query(&self)
    }

    /// Run the query and decode every account with `C`.
    fn fetch<C: AccountCodec>(
        self,
    ) -> impl Future<Output = Result<Vec<DecodedAccount<C::Output>>, Error>> + Send {
        self.into_builder().dispatch::<C>()
    }

    /// [`fetch`](Self::fetch), then reshape the successful result.
    fn fetch_and_map<C, R, F>(self, transform: F) -> impl Future<Output = Result<R, Error>> + Send
    where
        C: AccountCodec,
        F: FnOnce(Vec<DecodedAccount<C::Output>>) -> R + Send,
    {
        let fetch = self.fetch::<C>();
        async move { fetch.await.map(transform) }
    }

    /// Like [`fetch_and_map`](Self::fetch_and_map) for transforms that can fail;
    /// their error becomes [`Error::Transform`].
    fn fetch_and_try_map<C, R, E, F>(
        self,
        transform: F,
    ) -> impl Future<Output = Result<R, Error>> + Send
    where
        C: AccountCodec,
        E: fmt::Display,
        F: FnOnce(Vec<DecodedAccount<C::Output>>) -> Result<R, E> + Send,
    {
        let fetch = self.fetch::<C>();
        async move {
            let accounts = fetch.await?;
            transform(accounts).map_err(|e| Error::Transform {
                reason: e.to_string(),
            })
        }
    }

    /// Addresses of the matched accounts.
    fn fetch_addresses(self) -> impl Future<Output = Result<Vec<Pubkey>, Error>> + Send {
        self.fetch_and_map::<IgnoreData, _, _>(|accounts| {
            accounts
                .into_iter()
                .map(|account| account.address)
                .collect::<Vec<_>>()
        })
    }

    /// The address stored at the start of each matched account's data.
    fn fetch_embedded_addresses(self) -> impl Future<Output = Result<Vec<Pubkey>, Error>> + Send {
        self.fetch_and_map::<AddressCodec, _, _>(|accounts| {
            accounts
                .into_iter()
                .map(|account| account.data)
                .collect::<Vec<_>>()
        })
    }
}

/// Build a `Q` for the same connection and program as `source`, seeded with
/// `source`'s configuration. `source` is left untouched.
pub fn derive_query<Q: ProgramAccountQuery>(source: &impl ProgramAccountQuery) -> Result<Q, Error> {
    let query = Q::spawn(source.connection().clone(), source.program_id())?;
    Ok(query.merge_config(source.config()))
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::codec::RawBytes;
    use crate::error::TransportError;
    use crate::transport::ProgramAccountsTransport;
    use crate::types::{RpcAccount, RpcAccountData, RpcFilter, RpcKeyedAccount};

    #[derive(Default)]
    struct RecordingTransport {
        accounts: Vec<RpcKeyedAccount>,
        fail_with: Option<String>,
        requests: Mutex<Vec<GetProgramAccountsRequest>>,
    }

    #[async_trait]
    impl ProgramAccountsTransport for RecordingTransport {
        async fn get_program_accounts(
            &self,
            request: GetProgramAccountsRequest,
        ) -> Result<Vec<RpcKeyedAccount>, TransportError> {
            self.requests.lock().unwrap().push(request);
            match &self.fail_with {
                Some(message) => Err(message.clone().into()),
                None => Ok(self.accounts.clone()),
            }
        }
    }

    fn program() -> Pubkey {
        Pubkey::new_from_array([9; 32])
    }

    fn raw(address: &Pubkey, data: &[u8]) -> RpcKeyedAccount {
        RpcKeyedAccount {
            pubkey: address.to_string(),
            account: RpcAccount {
                lamports: 2_039_280,
                owner: program().to_string(),
                data: RpcAccountData(bs58::encode(data).into_string(), AccountEncoding::Base58),
                executable: false,
                rent_epoch: 0,
                space: None,
            },
        }
    }

    fn builder(transport: &Arc<RecordingTransport>) -> GpaBuilder {
        GpaBuilder::new(transport.clone(), program())
    }

    /// Specialized builder that refuses every program but one.
    #[derive(Debug, Clone)]
    struct CounterQuery {
        builder: GpaBuilder,
    }

    impl CounterQuery {
        fn where_authority(self, authority: &Pubkey) -> Self {
            self.where_address(8, authority)
        }
    }

    impl ProgramAccountQuery for CounterQuery {
        fn spawn(connection: SharedTransport, program_id: Pubkey) -> Result<Self, Error> {
            if program_id != program() {
                return Err(Error::Construction {
                    reason: format!("counter accounts live under {}", program()),
                });
            }
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

    #[test]
    fn filters_accumulate_in_call_order() {
        let transport = Arc::new(RecordingTransport::default());
        let address = Pubkey::new_from_array([1; 32]);
        let query = builder(&transport)
            .where_size(165)
            .where_address(32, &address)
            .where_u8(0, 4)
            .where_i32(4, 258)
            .where_str(8, "hi")
            .where_bytes(10, &[1, 2]);

        assert_eq!(
            query.config().filters(),
            &[
                AccountFilter::DataSize(165),
                AccountFilter::memcmp(32, address),
                AccountFilter::memcmp(0, 4_u8),
                AccountFilter::Memcmp {
                    offset: 4,
                    bytes: vec![0x02, 0x01, 0x00, 0x00],
                },
                AccountFilter::memcmp(8, b"hi".to_vec()),
                AccountFilter::memcmp(10, vec![1, 2]),
            ]
        );
    }

    #[test]
    fn size_filter_and_without_data_coexist() {
        let transport = Arc::new(RecordingTransport::default());
        let request = builder(&transport).where_size(0).without_data().request();

        assert_eq!(
            request.config.filters,
            Some(vec![RpcFilter::DataSize { data_size: 0 }])
        );
        assert_eq!(
            request.config.data_slice,
            Some(DataSlice {
                offset: 0,
                length: 0
            })
        );

        let reversed = builder(&transport).without_data().where_size(0).request();
        assert_eq!(reversed, request);
    }

    #[test]
    fn slice_is_carried_into_the_request() {
        let transport = Arc::new(RecordingTransport::default());
        let request = builder(&transport).slice(32, 32).request();
        assert_eq!(
            request.config.data_slice,
            Some(DataSlice {
                offset: 32,
                length: 32
            })
        );
    }

    #[test]
    fn commitment_and_encoding_overrides() {
        let transport = Arc::new(RecordingTransport::default());
        let request = builder(&transport)
            .with_commitment(CommitmentLevel::Finalized)
            .with_encoding(AccountEncoding::Base58)
            .request();
        assert_eq!(request.config.commitment, CommitmentLevel::Finalized);
        assert_eq!(request.config.encoding, AccountEncoding::Base58);
        assert_eq!(request.program_id, program());
    }

    #[test]
    fn derived_builders_do_not_alias_filters() {
        let transport = Arc::new(RecordingTransport::default());
        let base = builder(&transport).where_size(40);

        let derived: CounterQuery = derive_query(&base).unwrap();
        let derived = derived.where_authority(&Pubkey::new_from_array([2; 32]));

        assert_eq!(base.config().filters().len(), 1);
        assert_eq!(derived.config().filters().len(), 2);
        assert_eq!(derived.config().filters()[0], AccountFilter::DataSize(40));
    }

    #[test]
    fn specialized_builder_keeps_its_type_through_generic_calls() {
        let transport = Arc::new(RecordingTransport::default());
        let query = CounterQuery::spawn(transport.clone(), program())
            .unwrap()
            .where_size(40)
            .with_commitment(CommitmentLevel::Confirmed)
            .where_authority(&Pubkey::new_from_array([2; 32]));
        assert_eq!(query.config().filters().len(), 2);
        assert_eq!(query.config().commitment(), CommitmentLevel::Confirmed);
    }

    #[test]
    fn into_query_refuses_foreign_program() {
        let transport = Arc::new(RecordingTransport::default());
        let foreign = GpaBuilder::new(transport, Pubkey::new_from_array([3; 32])).where_size(1);
        match foreign.into_query::<CounterQuery>() {
            Err(Error::Construction { reason }) => assert!(reason.contains("counter")),
            other => panic!("expected construction error, got {other:?}"),
        }
    }

    #[test]
    fn merge_config_seeds_a_fresh_builder() {
        let transport = Arc::new(RecordingTransport::default());
        let source = builder(&transport)
            .where_size(8)
            .with_commitment(CommitmentLevel::Finalized);
        let seeded = builder(&transport).merge_config(source.config());
        assert_eq!(seeded.config(), source.config());
    }

    #[tokio::test]
    async fn fetch_dispatches_one_snapshot_request() {
        let first = Pubkey::new_from_array([1; 32]);
        let transport = Arc::new(RecordingTransport {
            accounts: vec![raw(&first, &[1, 2, 3])],
            ..RecordingTransport::default()
        });

        let query = builder(&transport).where_u8(0, 1);
        let expected = query.request();
        let accounts = query.fetch::<RawBytes>().await.unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, first);
        assert_eq!(accounts[0].data, vec![1, 2, 3]);
        assert_eq!(accounts[0].lamports, 2_039_280);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0], expected);
    }

    #[tokio::test]
    async fn clone_before_dispatch_is_an_independent_query() {
        let transport = Arc::new(RecordingTransport::default());
        let query = builder(&transport).where_size(10);
        let wider = query.clone().where_u8(0, 1);

        query.fetch_addresses().await.unwrap();
        wider.fetch_addresses().await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].config.filters.as_ref().map(Vec::len), Some(1));
        assert_eq!(requests[1].config.filters.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn embedded_addresses_come_from_account_data() {
        let pointer = Pubkey::new_from_array([1; 32]);
        let target = Pubkey::new_from_array([8; 32]);
        let transport = Arc::new(RecordingTransport {
            accounts: vec![raw(&pointer, &target.to_bytes())],
            ..RecordingTransport::default()
        });

        let addresses = builder(&transport)
            .fetch_embedded_addresses()
            .await
            .unwrap();
        assert_eq!(addresses, vec![target]);
    }

    #[tokio::test]
    async fn failing_transform_surfaces_as_error() {
        let transport = Arc::new(RecordingTransport {
            accounts: vec![raw(&Pubkey::new_from_array([1; 32]), &[])],
            ..RecordingTransport::default()
        });

        let result = builder(&transport)
            .fetch_and_try_map::<IgnoreData, usize, _, _>(|accounts| {
                Err(format!("expected none, got {}", accounts.len()))
            })
            .await;
        match result {
            Err(Error::Transform { reason }) => assert_eq!(reason, "expected none, got 1"),
            other => panic!("expected transform error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_is_wrapped_not_swallowed() {
        let transport = Arc::new(RecordingTransport {
            fail_with: Some("connection reset".to_string()),
            ..RecordingTransport::default()
        });

        match builder(&transport).fetch::<RawBytes>().await {
            Err(Error::Transport(source)) => assert_eq!(source.to_string(), "connection reset"),
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
