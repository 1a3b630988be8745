use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::{GetProgramAccountsRequest, RpcKeyedAccount};

/// The single RPC capability the query builders need.
///
/// Implementations own timeouts, retries and connection management; whatever
/// they fail with is surfaced unchanged as [`Error::Transport`](crate::Error::Transport).
#[async_trait]
pub trait ProgramAccountsTransport: Send + Sync {
    async fn get_program_accounts(
        &self,
        request: GetProgramAccountsRequest,
    ) -> Result<Vec<RpcKeyedAccount>, TransportError>;
}

/// Connection handle shared by any number of builders.
pub type SharedTransport = Arc<dyn ProgramAccountsTransport>;
