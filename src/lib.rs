#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
//! # Ledger hardware wallet signing provider for Ethereum
//!
//! This crate signs Ethereum transactions and personal messages with a
//! physically-connected Ledger device while presenting a standard JSON-RPC
//! provider interface to callers.
//!
//! The pipeline behind [`LedgerSigner::sign_transaction`]: a loose
//! [`TransactionParams`] request is normalized into the canonical
//! [`TypedTransaction`] shape (legacy/EIP-155 or EIP-1559, decided by field
//! presence), serialized to its canonical RLP encoding, optionally annotated
//! by an external [`TransactionResolver`], signed on the device, and
//! reassembled into the broadcast-ready signed encoding.
//!
//! ```no_run
//! # #[cfg(feature = "hid")]
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! use ledger_provider::{HDPath, Http, JsonRpcClient, LedgerProvider, LedgerSigner};
//! use ledger_provider::device::HidTransportProvider;
//! use std::str::FromStr;
//!
//! let signer = LedgerSigner::new(HidTransportProvider, HDPath::LedgerLive(0))?;
//! let provider = LedgerProvider::new(Http::from_str("http://localhost:8545")?, signer);
//!
//! let accounts: Vec<String> = provider.request("eth_accounts", ()).await?;
//!
//! let tx_hash: ledger_provider::types::TxHash = provider
//!     .request(
//!         "eth_sendTransaction",
//!         [serde_json::json!({
//!             "to": "0x2ed7afa17473e17ac59908f088b4371d28585476",
//!             "value": "0xde0b6b3a7640000",
//!         })],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! The physical transport and the RPC node are both consumed through narrow
//! capability traits ([`device::TransportProvider`], [`JsonRpcClient`]), so
//! the entire pipeline runs against the in-crate mocks without hardware.

pub mod device;
mod provider;
pub mod resolution;
mod signer;
pub mod transports;
pub mod types;
pub mod utils;

pub use device::types::DerivationType as HDPath;
pub use provider::{JsonRpcClient, JsonRpcError, LedgerProvider, ProviderError};
pub use resolution::{
    LoadConfig, NoopResolver, ResolutionConfig, ResolutionObject, TransactionResolver,
};
pub use signer::{LedgerError, LedgerSigner};
pub use transports::{Http, MockRpc};
pub use types::{Bytes, Signature, TransactionParams, TypedTransaction};
