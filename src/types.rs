use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;

use crate::error::Error;

/// Encoding of account data on the wire.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
pub enum AccountEncoding {
    #[serde(rename = "base58")]
    #[strum(serialize = "base58")]
    Base58,
    #[default]
    #[serde(rename = "base64")]
    #[strum(serialize = "base64")]
    Base64,
    #[serde(rename = "base64+zstd")]
    #[strum(serialize = "base64+zstd")]
    Base64Zstd,
}

/// Ledger finality requested for the read.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CommitmentLevel {
    #[default]
    Processed,
    Confirmed,
    Finalized,
}

/// Byte range of each matched account's data to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSlice {
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcMemcmp {
    pub offset: u32,
    /// Base58-encoded pattern.
    pub bytes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcFilter {
    Memcmp {
        memcmp: RpcMemcmp,
    },
    DataSize {
        #[serde(rename = "dataSize")]
        data_size: u32,
    },
}

/// Second positional parameter of `getProgramAccounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcProgramAccountsConfig {
    pub encoding: AccountEncoding,
    pub commitment: CommitmentLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<RpcFilter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_slice: Option<DataSlice>,
}

/// A fully resolved `getProgramAccounts` call, captured when a builder dispatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetProgramAccountsRequest {
    pub program_id: Pubkey,
    pub config: RpcProgramAccountsConfig,
}

impl GetProgramAccountsRequest {
    pub const METHOD: &'static str = "getProgramAccounts";

    /// Positional params: `[programId, config]`.
    pub fn to_params(&self) -> Result<serde_json::Value, Error> {
        Ok(serde_json::Value::Array(vec![
            serde_json::Value::String(self.program_id.to_string()),
            serde_json::to_value(&self.config)?,
        ]))
    }

    /// Full JSON-RPC 2.0 request body.
    pub fn to_json_rpc(&self, id: u64) -> Result<serde_json::Value, Error> {
        Ok(serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": Self::METHOD,
            "params": self.to_params()?,
        }))
    }
}

/// Account data as returned by the node: `[payload, encoding]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcAccountData(pub String, pub AccountEncoding);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcAccount {
    pub lamports: u64,
    /// Owning program (base58).
    pub owner: String,
    pub data: RpcAccountData,
    pub executable: bool,
    #[serde(default)]
    pub rent_epoch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<u64>,
}

/// One entry of the `getProgramAccounts` result array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcKeyedAccount {
    /// Account address (base58).
    pub pubkey: String,
    pub account: RpcAccount,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Vec<RpcKeyedAccount>>,
    error: Option<JsonRpcErrorObject>,
}

/// Unwrap a JSON-RPC response body for `getProgramAccounts`.
///
/// An `error` member becomes [`Error::Rpc`]; a body with neither `result` nor
/// `error` is a JSON error.
///
/// Meant for transport implementations. Whatever a transport returns reaches
/// the caller boxed inside [`Error::Transport`], so an RPC error surfaces there
/// and is recovered with `downcast_ref::<Error>()` on the source.
pub fn parse_json_rpc_response(body: serde_json::Value) -> Result<Vec<RpcKeyedAccount>, Error> {
    let response: JsonRpcResponse = serde_json::from_value(body)?;
    if let Some(err) = response.error {
        return Err(Error::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    response
        .result
        .ok_or_else(|| Error::Json(serde::de::Error::missing_field("result")))
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]
mod tests {
    use super::*;

    #[test]
    fn commitment_and_encoding_strings() {
        assert_eq!(CommitmentLevel::default().to_string(), "processed");
        assert_eq!(
            "finalized".parse::<CommitmentLevel>().ok(),
            Some(CommitmentLevel::Finalized)
        );
        assert_eq!("final".parse::<CommitmentLevel>().ok(), None);
        assert_eq!(AccountEncoding::Base64Zstd.as_ref(), "base64+zstd");
        assert_eq!(
            serde_json::to_value(AccountEncoding::Base64Zstd).unwrap(),
            serde_json::json!("base64+zstd")
        );
    }

    #[test]
    fn config_omits_absent_fields() {
        let config = RpcProgramAccountsConfig {
            encoding: AccountEncoding::Base64,
            commitment: CommitmentLevel::Processed,
            filters: None,
            data_slice: None,
        };
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            serde_json::json!({"encoding": "base64", "commitment": "processed"})
        );
    }

    #[test]
    fn filters_serialize_to_wire_shape() {
        let filters = vec![
            RpcFilter::Memcmp {
                memcmp: RpcMemcmp {
                    offset: 8,
                    bytes: "2".to_string(),
                },
            },
            RpcFilter::DataSize { data_size: 165 },
        ];
        assert_eq!(
            serde_json::to_value(&filters).unwrap(),
            serde_json::json!([
                {"memcmp": {"offset": 8, "bytes": "2"}},
                {"dataSize": 165}
            ])
        );
    }

    #[test]
    fn json_rpc_request_body() {
        let request = GetProgramAccountsRequest {
            program_id: Pubkey::new_from_array([0; 32]),
            config: RpcProgramAccountsConfig {
                encoding: AccountEncoding::Base64,
                commitment: CommitmentLevel::Confirmed,
                filters: Some(vec![RpcFilter::DataSize { data_size: 0 }]),
                data_slice: Some(DataSlice {
                    offset: 0,
                    length: 0,
                }),
            },
        };
        let body = request.to_json_rpc(7).unwrap();
        assert_eq!(body["method"], "getProgramAccounts");
        assert_eq!(body["id"], 7);
        assert_eq!(body["params"][0], "11111111111111111111111111111111");
        assert_eq!(body["params"][1]["commitment"], "confirmed");
        assert_eq!(
            body["params"][1]["dataSlice"],
            serde_json::json!({"offset": 0, "length": 0})
        );
        assert_eq!(
            body["params"][1]["filters"],
            serde_json::json!([{"dataSize": 0}])
        );
    }

    #[test]
    fn parse_response_result_and_error() {
        let ok = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": [{
                "pubkey": "11111111111111111111111111111111",
                "account": {
                    "lamports": 10,
                    "owner": "11111111111111111111111111111111",
                    "data": ["", "base64"],
                    "executable": false,
                    "rentEpoch": 18_446_744_073_709_551_615_u64,
                    "space": 0
                }
            }]
        });
        let accounts = parse_json_rpc_response(ok).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account.data.1, AccountEncoding::Base64);
        assert_eq!(accounts[0].account.rent_epoch, u64::MAX);

        let err = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32010, "message": "excluded from account secondary indexes"}
        });
        match parse_json_rpc_response(err) {
            Err(Error::Rpc { code, message }) => {
                assert_eq!(code, -32010);
                assert!(message.contains("secondary indexes"));
            }
            other => panic!("expected rpc error, got {other:?}"),
        }

        let empty = serde_json::json!({"jsonrpc": "2.0", "id": 1});
        assert!(matches!(
            parse_json_rpc_response(empty),
            Err(Error::Json(_))
        ));
    }
}
