//! JSON-RPC provider surface over a Ledger signer.
//!
//! [`LedgerProvider`] wraps any [`JsonRpcClient`] and intercepts the account
//! and signing methods: `eth_accounts` answers with the device address,
//! `eth_sendTransaction` is filled, signed on the device and re-submitted as
//! `eth_sendRawTransaction`, `personal_sign` goes to the device. Everything
//! else is forwarded to the inner client untouched.

use crate::{
    device::{
        events::DisconnectSubscription,
        transport::{DeviceId, TransportProvider},
    },
    resolution::{NoopResolver, TransactionResolver},
    signer::{LedgerError, LedgerSigner},
    types::{Address, TransactionParams, TxHash, U256, U64},
    utils::to_checksum,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Debug};
use thiserror::Error;
use tracing::{debug, trace};

/// A JSON-RPC 2.0 error
#[derive(Serialize, Deserialize, Debug, Clone, Error)]
pub struct JsonRpcError {
    /// The error code
    pub code: i64,
    /// The error message
    pub message: String,
    /// Additional data
    pub data: Option<Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(code: {}, message: {}, data: {:?})", self.code, self.message, self.data)
    }
}

/// An error thrown when making a call to the provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// An internal error in the JSON-RPC client
    #[error(transparent)]
    JsonRpcClientError(Box<dyn std::error::Error + Send + Sync>),
    /// An error during signing or device interaction
    #[error(transparent)]
    Signer(#[from] LedgerError),
    /// A (de)serialization error
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// Parameters did not match the intercepted method's shape
    #[error("invalid parameters for {method}: {message}")]
    InvalidParams { method: String, message: String },
}

#[async_trait]
/// Trait which must be implemented by data transports to be used with the
/// Ethereum JSON-RPC provider.
pub trait JsonRpcClient: Debug + Send + Sync {
    /// A JSON-RPC Error
    type Error: std::error::Error + Into<ProviderError> + Send + Sync;

    /// Sends a request with the provided JSON-RPC and parameters serialized as JSON
    async fn request<T, R>(&self, method: &str, params: T) -> Result<R, Self::Error>
    where
        T: Debug + Serialize + Send + Sync,
        R: DeserializeOwned + Send;
}

/// A JSON-RPC provider that signs with a Ledger hardware wallet.
#[derive(Debug)]
pub struct LedgerProvider<C, P: TransportProvider, R: TransactionResolver = NoopResolver> {
    inner: C,
    signer: LedgerSigner<P, R>,
}

impl<C, P, R> LedgerProvider<C, P, R>
where
    C: JsonRpcClient,
    P: TransportProvider,
    R: TransactionResolver,
{
    pub fn new(inner: C, signer: LedgerSigner<P, R>) -> Self {
        Self { inner, signer }
    }

    /// The device signer behind this provider.
    pub fn signer(&self) -> &LedgerSigner<P, R> {
        &self.signer
    }

    /// The wrapped JSON-RPC client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Resolves the device address, connecting to the device on first use.
    pub async fn enable(&self) -> Result<Address, ProviderError> {
        Ok(self.signer.get_address().await?)
    }

    /// The provider's account list: the single device-derived address,
    /// checksummed.
    pub async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        let address = self.signer.get_address().await?;
        Ok(vec![to_checksum(&address, None)])
    }

    /// Registers a listener for physical device disconnects. Dropping the
    /// guard unsubscribes.
    pub fn on_disconnect(
        &self,
        callback: impl Fn(&DeviceId) + Send + Sync + 'static,
    ) -> DisconnectSubscription {
        self.signer.on_disconnect(callback)
    }

    /// Fills, signs and broadcasts a transaction, returning its hash.
    pub async fn send_transaction(
        &self,
        mut params: TransactionParams,
    ) -> Result<TxHash, ProviderError> {
        self.fill_transaction(&mut params).await?;
        let raw = self.signer.sign_transaction(params).await?;
        debug!(raw_len = raw.len(), "broadcasting signed transaction");
        self.inner.request("eth_sendRawTransaction", [raw]).await.map_err(Into::into)
    }

    /// Signs a personal message on the device, returning the 65-byte
    /// signature as `0x`-prefixed hex.
    pub async fn sign_message(&self, message: impl AsRef<[u8]> + Send + Sync) -> Result<String, ProviderError> {
        let signature = self.signer.sign_message(message).await?;
        Ok(format!("0x{signature}"))
    }

    /// Resolves the fields the caller left out: chain id, nonce, gas limit
    /// and the fee fields matching the request's shape. Failures propagate;
    /// nothing is silently defaulted.
    pub async fn fill_transaction(
        &self,
        params: &mut TransactionParams,
    ) -> Result<(), ProviderError> {
        if params.chain_id.is_none() {
            let chain_id: U64 =
                self.inner.request("eth_chainId", ()).await.map_err(Into::into)?;
            params.chain_id = Some(chain_id);
        }

        if params.nonce.is_none() {
            let from = self.signer.get_address().await?;
            if params.from.is_none() {
                params.from = Some(from);
            }
            let nonce: U256 = self
                .inner
                .request("eth_getTransactionCount", (from, "pending"))
                .await
                .map_err(Into::into)?;
            params.nonce = Some(nonce);
        }

        if params.gas_limit().is_none() {
            let gas: U256 = self
                .inner
                .request("eth_estimateGas", [&*params])
                .await
                .map_err(Into::into)?;
            params.gas_limit = Some(gas);
        }

        if params.is_eip1559() {
            if params.max_fee_per_gas.is_none() {
                let gas_price: U256 =
                    self.inner.request("eth_gasPrice", ()).await.map_err(Into::into)?;
                params.max_fee_per_gas = Some(gas_price);
            }
            if params.max_priority_fee_per_gas.is_none() {
                let priority_fee: U256 = self
                    .inner
                    .request("eth_maxPriorityFeePerGas", ())
                    .await
                    .map_err(Into::into)?;
                params.max_priority_fee_per_gas = Some(priority_fee);
            }
        } else if params.gas_price.is_none() {
            let gas_price: U256 =
                self.inner.request("eth_gasPrice", ()).await.map_err(Into::into)?;
            params.gas_price = Some(gas_price);
        }

        Ok(())
    }

    fn transaction_params(method: &str, params: Value) -> Result<TransactionParams, ProviderError> {
        match params {
            Value::Array(mut list) if !list.is_empty() => {
                Ok(serde_json::from_value(list.swap_remove(0))?)
            }
            value @ Value::Object(_) => Ok(serde_json::from_value(value)?),
            other => Err(ProviderError::InvalidParams {
                method: method.to_owned(),
                message: format!("expected a transaction object, got {other}"),
            }),
        }
    }

    fn message_param(method: &str, params: Value) -> Result<Vec<u8>, ProviderError> {
        let raw = params
            .as_array()
            .and_then(|list| list.first())
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::InvalidParams {
                method: method.to_owned(),
                message: "expected [message, address]".to_owned(),
            })?;

        // hex data per EIP-1193; anything else is treated as UTF-8 text
        Ok(raw
            .parse::<crate::types::Bytes>()
            .map(|bytes| bytes.to_vec())
            .unwrap_or_else(|_| raw.as_bytes().to_vec()))
    }
}

#[async_trait]
impl<C, P, R> JsonRpcClient for LedgerProvider<C, P, R>
where
    C: JsonRpcClient,
    P: TransportProvider + Debug,
    R: TransactionResolver + Debug,
{
    type Error = ProviderError;

    async fn request<T, Res>(&self, method: &str, params: T) -> Result<Res, ProviderError>
    where
        T: Debug + Serialize + Send + Sync,
        Res: DeserializeOwned + Send,
    {
        match method {
            "eth_accounts" | "eth_requestAccounts" => {
                let accounts = self.accounts().await?;
                Ok(serde_json::from_value(serde_json::to_value(accounts)?)?)
            }
            "eth_sendTransaction" => {
                let tx = Self::transaction_params(method, serde_json::to_value(params)?)?;
                let hash = self.send_transaction(tx).await?;
                Ok(serde_json::from_value(serde_json::to_value(hash)?)?)
            }
            "personal_sign" => {
                let message = Self::message_param(method, serde_json::to_value(params)?)?;
                let signature = self.sign_message(message).await?;
                Ok(serde_json::from_value(Value::String(signature))?)
            }
            method if method.starts_with("eth_signTypedData") => {
                Err(LedgerError::UnsupportedOperation {
                    message: "EIP-712 typed-data signing is not supported by this signer"
                        .to_owned(),
                    status: None,
                }
                .into())
            }
            method => {
                trace!(method, "forwarding request to the node");
                self.inner.request(method, params).await.map_err(Into::into)
            }
        }
    }
}
