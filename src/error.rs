/// Boxed failure reported by a [`ProgramAccountsTransport`](crate::ProgramAccountsTransport).
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// Error member of a JSON-RPC response, produced by
    /// [`parse_json_rpc_response`](crate::parse_json_rpc_response). Fetches
    /// never return it directly: it travels as the source of
    /// [`Error::Transport`] because the transport owns the wire format.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("decode error for account {address}: {reason}")]
    Decode { address: String, reason: String },

    #[error("construction error: {reason}")]
    Construction { reason: String },

    #[error("transform error: {reason}")]
    Transform { reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single [`AccountCodec`](crate::AccountCodec) run over one payload.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("borsh: {0}")]
    Borsh(#[from] std::io::Error),

    #[error("expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("zstd: {0}")]
    Zstd(#[source] std::io::Error),

    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("base58: {0}")]
    Base58(#[from] bs58::decode::Error),
}

impl Error {
    pub(crate) fn decode(address: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            address: address.into(),
            reason: reason.to_string(),
        }
    }
}
