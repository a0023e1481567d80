//! Ethereum data types used across the signing pipeline.

/// A transaction Hash
pub use ethereum_types::H256 as TxHash;

pub use ethereum_types::{Address, H160, H256, U256, U64};

mod bytes;
pub use self::bytes::{Bytes, ParseBytesError};

mod signature;
pub use signature::{Signature, SignatureError};

pub mod transaction;
pub use transaction::{
    eip1559::Eip1559TransactionRequest,
    params::{EncodingError, TransactionParams},
    request::TransactionRequest,
    typed::TypedTransaction,
};
