//! Tendermint JSON-RPC transport.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use cosmos_sdk_proto::cosmos::base::abci::v1beta1::TxResponse;
use serde::{de::DeserializeOwned, Deserialize};
use sha2::{Digest, Sha256};

use crate::{
    client_builder::BroadcastMode,
    error::{ConfigError, RpcError},
};

/// Codespace and codes the Cosmos SDK assigns to mempool rejections.
const SDK_CODESPACE: &str = "sdk";
const CODE_TX_IN_MEMPOOL_CACHE: u32 = 19;
const CODE_MEMPOOL_IS_FULL: u32 = 20;
const CODE_TX_TOO_LARGE: u32 = 21;

/// The two node calls a [crate::Client] needs.
///
/// [HttpRpc] is the real implementation. Anything else, such as an in-memory
/// stub, can be plugged in with [crate::Client::with_transport].
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Run an ABCI query and return the raw protobuf response value.
    ///
    /// A non-zero ABCI code is reported as [RpcError::AbciQuery].
    async fn abci_query(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>, RpcError>;

    /// Broadcast signed transaction bytes.
    ///
    /// A transaction rejected by the chain is still `Ok`, with a non-zero `code`.
    async fn broadcast_tx(
        &self,
        mode: BroadcastMode,
        tx_bytes: Vec<u8>,
    ) -> Result<TxResponse, RpcError>;
}

/// Uppercase hex SHA-256 of transaction bytes, the way the chain names transactions.
pub fn tx_hash(tx_bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(tx_bytes))
}

/// A single HTTP connection to a node's Tendermint RPC endpoint.
#[derive(Clone, Debug)]
pub struct HttpRpc {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpRpc {
    pub fn new(endpoint: url::Url, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|source| ConfigError::HttpClient { source })?;
        Ok(HttpRpc { client, endpoint })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    async fn call<Params, Res>(
        &self,
        method: &'static str,
        params: Params,
    ) -> Result<Res, RpcError>
    where
        Params: serde::Serialize,
        Res: DeserializeOwned,
    {
        let req = Request {
            jsonrpc: "2.0",
            method,
            id: rand::random(),
            params,
        };

        let raw_body = self
            .client
            .post(self.endpoint.clone())
            .json(&req)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| RpcError::Http { method, source })?
            .text()
            .await
            .map_err(|source| RpcError::Http { method, source })?;

        parse_response(method, &raw_body)
    }
}

#[async_trait]
impl RpcTransport for HttpRpc {
    async fn abci_query(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        tracing::debug!("abci_query {path} with {} bytes", data.len());
        let res: AbciQueryResult = self
            .call(
                "abci_query",
                AbciQueryParams {
                    path,
                    data: hex::encode(data),
                    height: "0",
                    prove: false,
                },
            )
            .await?;
        res.response.into_value(path)
    }

    async fn broadcast_tx(
        &self,
        mode: BroadcastMode,
        tx_bytes: Vec<u8>,
    ) -> Result<TxResponse, RpcError> {
        let method = mode.rpc_method();
        let txhash = tx_hash(&tx_bytes);
        let params = BroadcastParams {
            tx: base64::engine::general_purpose::STANDARD.encode(&tx_bytes),
        };
        let res = match mode {
            BroadcastMode::FireAndForget | BroadcastMode::WaitForSync => self
                .call::<_, BroadcastSyncResult>(method, params)
                .await
                .map(BroadcastSyncResult::into_tx_response),
            BroadcastMode::WaitForCommit => self
                .call::<_, BroadcastCommitResult>(method, params)
                .await
                .and_then(|res| res.into_tx_response(method)),
        };
        match res {
            Err(e) => match mempool_rejection(&e, &txhash) {
                Some(res) => {
                    tracing::warn!(
                        "{method} of {txhash} rejected by the mempool with code {}: {}",
                        res.code,
                        res.raw_log
                    );
                    Ok(res)
                }
                None => Err(e),
            },
            res => res,
        }
    }
}

/// Turn the JSON-RPC errors the mempool raises into regular responses carrying
/// the matching Cosmos SDK error code.
fn mempool_rejection(err: &RpcError, txhash: &str) -> Option<TxResponse> {
    let (message, data) = match err {
        RpcError::JsonRpc { message, data, .. } => (message, data),
        _ => return None,
    };
    let text = format!("{message} {data}").to_lowercase();
    let code = if text.contains("tx already exists in cache") {
        CODE_TX_IN_MEMPOOL_CACHE
    } else if text.contains("mempool is full") {
        CODE_MEMPOOL_IS_FULL
    } else if text.contains("tx too large") {
        CODE_TX_TOO_LARGE
    } else {
        return None;
    };
    Some(TxResponse {
        txhash: txhash.to_owned(),
        codespace: SDK_CODESPACE.to_owned(),
        code,
        raw_log: data.clone(),
        ..TxResponse::default()
    })
}

fn parse_response<Res: DeserializeOwned>(
    method: &'static str,
    raw_body: &str,
) -> Result<Res, RpcError> {
    let res: Response<Res> =
        serde_json::from_str(raw_body).map_err(|source| RpcError::InvalidJson {
            method,
            body: raw_body.to_owned(),
            source,
        })?;
    match (res.result, res.error) {
        (_, Some(error)) => Err(RpcError::JsonRpc {
            method,
            code: error.code,
            message: error.message,
            data: match error.data {
                None => String::new(),
                Some(serde_json::Value::String(s)) => s,
                Some(other) => other.to_string(),
            },
        }),
        (Some(result), None) => Ok(result),
        (None, None) => Err(RpcError::InvalidResponse {
            method,
            message: "neither result nor error present".to_owned(),
        }),
    }
}

#[derive(serde::Serialize)]
struct Request<Params> {
    jsonrpc: &'static str,
    method: &'static str,
    id: u32,
    params: Params,
}

#[derive(serde::Serialize)]
struct AbciQueryParams<'a> {
    path: &'a str,
    data: String,
    height: &'static str,
    prove: bool,
}

#[derive(serde::Serialize)]
struct BroadcastParams {
    tx: String,
}

#[derive(Deserialize)]
struct Response<Res> {
    result: Option<Res>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct AbciQueryResult {
    response: AbciQueryResponse,
}

#[derive(Deserialize)]
struct AbciQueryResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    codespace: String,
}

impl AbciQueryResponse {
    fn into_value(self, path: &str) -> Result<Vec<u8>, RpcError> {
        if self.code != 0 {
            return Err(RpcError::AbciQuery {
                path: path.to_owned(),
                code: self.code,
                codespace: self.codespace,
                log: self.log,
            });
        }
        decode_base64("abci_query", self.value.as_deref().unwrap_or_default())
    }
}

#[derive(Deserialize)]
struct BroadcastSyncResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    log: String,
    #[serde(default)]
    codespace: String,
    hash: String,
}

impl BroadcastSyncResult {
    /// Unlike the commit result, `data` here is already hex.
    fn into_tx_response(self) -> TxResponse {
        let data = self.data.unwrap_or_default();
        TxResponse {
            txhash: self.hash,
            code: self.code,
            codespace: self.codespace,
            data: match hex::decode(&data) {
                Ok(bytes) => hex::encode_upper(bytes),
                Err(_) => data,
            },
            raw_log: self.log,
            ..TxResponse::default()
        }
    }
}

#[derive(Deserialize)]
struct BroadcastCommitResult {
    check_tx: ExecTxResult,
    #[serde(alias = "tx_result")]
    deliver_tx: ExecTxResult,
    hash: String,
    #[serde(deserialize_with = "string_or_number")]
    height: i64,
}

impl BroadcastCommitResult {
    fn into_tx_response(self, method: &'static str) -> Result<TxResponse, RpcError> {
        // A failed CheckTx never reached a block, report it instead of the empty DeliverTx.
        let result = if self.check_tx.code != 0 {
            self.check_tx
        } else {
            self.deliver_tx
        };
        Ok(TxResponse {
            height: self.height,
            txhash: self.hash,
            codespace: result.codespace,
            code: result.code,
            data: data_to_hex(method, result.data.as_deref())?,
            raw_log: result.log,
            info: result.info,
            gas_wanted: result.gas_wanted,
            gas_used: result.gas_used,
            ..TxResponse::default()
        })
    }
}

#[derive(Deserialize)]
struct ExecTxResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    log: String,
    #[serde(default)]
    info: String,
    #[serde(default, deserialize_with = "string_or_number")]
    gas_wanted: i64,
    #[serde(default, deserialize_with = "string_or_number")]
    gas_used: i64,
    #[serde(default)]
    codespace: String,
}

fn decode_base64(method: &'static str, value: &str) -> Result<Vec<u8>, RpcError> {
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| RpcError::InvalidResponse {
            method,
            message: format!("invalid base64 {value:?}: {e}"),
        })
}

fn data_to_hex(method: &'static str, data: Option<&str>) -> Result<String, RpcError> {
    decode_base64(method, data.unwrap_or_default()).map(hex::encode_upper)
}

/// Tendermint encodes 64-bit integers as JSON strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}
