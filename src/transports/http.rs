//! A low-level JSON-RPC client over HTTP.

use crate::provider::{JsonRpcClient, JsonRpcError, ProviderError};

use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt::Debug,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};
use thiserror::Error;
use url::Url;

/// A JSON-RPC client over HTTP.
///
/// ```no_run
/// use ledger_provider::{Http, JsonRpcClient};
/// use std::str::FromStr;
///
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Http::from_str("http://localhost:8545")?;
/// let block_number: ledger_provider::types::U64 =
///     client.request("eth_blockNumber", ()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Http {
    id: AtomicU64,
    client: Client,
    url: Url,
}

/// Error thrown when sending an HTTP request
#[derive(Error, Debug)]
pub enum ClientError {
    /// Thrown if the request failed
    #[error(transparent)]
    ReqwestError(#[from] ReqwestError),
    #[error(transparent)]
    /// Thrown if the response could not be parsed
    JsonRpcError(#[from] JsonRpcError),
    #[error(transparent)]
    /// Thrown if the request parameters were not serializable
    SerdeJson(#[from] serde_json::Error),
}

impl From<ClientError> for ProviderError {
    fn from(src: ClientError) -> Self {
        ProviderError::JsonRpcClientError(Box::new(src))
    }
}

#[async_trait]
impl JsonRpcClient for Http {
    type Error = ClientError;

    /// Sends a POST request with the provided method and the params serialized as JSON
    /// over HTTP
    async fn request<T, R>(&self, method: &str, params: T) -> Result<R, ClientError>
    where
        T: Debug + Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let next_id = self.id.fetch_add(1, Ordering::SeqCst);
        let params = match serde_json::to_value(params)? {
            // a missing params member and an empty list read the same on the
            // node side
            Value::Null => Value::Array(vec![]),
            params => params,
        };
        let payload = Request::new(next_id, method, params);

        let res = self.client.post(self.url.as_ref()).json(&payload).send().await?;
        let res = res.json::<Response<R>>().await?;

        Ok(res.data.into_result()?)
    }
}

impl Http {
    /// Initializes a new HTTP Client
    pub fn new(url: impl Into<Url>) -> Self {
        Self { id: AtomicU64::new(1), client: Client::new(), url: url.into() }
    }
}

impl FromStr for Http {
    type Err = url::ParseError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(src)?;
        Ok(Http::new(url))
    }
}

impl Clone for Http {
    fn clone(&self) -> Self {
        Self { id: AtomicU64::new(1), client: self.client.clone(), url: self.url.clone() }
    }
}

#[derive(Serialize, Deserialize, Debug)]
/// A JSON-RPC request
struct Request<'a> {
    id: u64,
    jsonrpc: &'a str,
    method: &'a str,
    params: Value,
}

impl<'a> Request<'a> {
    /// Creates a new JSON RPC request
    fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self { id, jsonrpc: "2.0", method, params }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Response<T> {
    id: u64,
    jsonrpc: String,
    #[serde(flatten)]
    data: ResponseData<T>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
enum ResponseData<R> {
    Error { error: JsonRpcError },
    Success { result: R },
}

impl<R> ResponseData<R> {
    /// Consume response and return value
    fn into_result(self) -> Result<R, JsonRpcError> {
        match self {
            ResponseData::Success { result } => Ok(result),
            ResponseData::Error { error } => Err(error),
        }
    }
}
