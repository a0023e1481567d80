use super::{eip1559::Eip1559TransactionRequest, request::TransactionRequest, typed::TypedTransaction};
use crate::types::{Address, Bytes, U256, U64};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error produced while normalizing or encoding a transaction request.
///
/// Everything here fails before any device interaction.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The request carries no nonce and none was filled in upstream.
    #[error("transaction request is missing a nonce")]
    MissingNonce,
    /// The nonce does not fit the 64-bit range the wire format expects.
    #[error("transaction nonce {0} does not fit in 64 bits")]
    NonceOutOfRange(U256),
    /// A fee-market transaction was requested without a chain id.
    #[error("EIP-1559 transaction request is missing a chain id")]
    MissingChainId,
    /// An envelope type this wallet does not produce.
    #[error("unsupported transaction type {0}")]
    UnsupportedType(u64),
    /// The derivation path cannot be encoded for the device.
    #[error("invalid derivation path: {0}")]
    InvalidDerivationPath(String),
    /// When decoding a canonical encoding
    #[error(transparent)]
    Rlp(#[from] rlp::DecoderError),
}

/// The loosely-typed transaction request accepted over the provider surface,
/// mirroring the `eth_sendTransaction` parameter object.
///
/// All fields are optional; [`TypedTransaction`] is produced from it via
/// `TryFrom`, which decides the envelope type from the populated fields.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(default, rename_all = "camelCase")]
pub struct TransactionParams {
    /// Sender address; accepted for JSON-RPC compatibility and used for gas
    /// estimation, never part of the unsigned encoding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,

    /// Gas limit under its canonical name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<U256>,

    /// Gas limit under its JSON-RPC alias; used when `gasLimit` is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,

    /// Requested envelope type; 2 forces the fee-market shape.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<U64>,
}

impl TransactionParams {
    /// Whether the request selects the EIP-1559 shape.
    ///
    /// This is a pure function of field presence: `type == 2`, or either
    /// fee-market field populated. Nothing else participates.
    pub fn is_eip1559(&self) -> bool {
        self.transaction_type == Some(U64::from(2)) ||
            self.max_fee_per_gas.is_some() ||
            self.max_priority_fee_per_gas.is_some()
    }

    /// The gas limit, falling back to the `gas` alias.
    pub fn gas_limit(&self) -> Option<U256> {
        self.gas_limit.or(self.gas)
    }

    fn checked_nonce(&self) -> Result<U256, EncodingError> {
        let nonce = self.nonce.ok_or(EncodingError::MissingNonce)?;
        if nonce.bits() > 64 {
            return Err(EncodingError::NonceOutOfRange(nonce))
        }
        Ok(nonce)
    }
}

impl TryFrom<TransactionParams> for TypedTransaction {
    type Error = EncodingError;

    fn try_from(params: TransactionParams) -> Result<Self, Self::Error> {
        let nonce = params.checked_nonce()?;
        let gas = params.gas_limit();
        let value = Some(params.value.unwrap_or_default());
        let fee_market = params.is_eip1559();
        // empty calldata and absent calldata occupy the same slot in the
        // canonical encoding
        let data = params.data.filter(|data| !data.is_empty());

        if fee_market {
            let chain_id = params.chain_id.ok_or(EncodingError::MissingChainId)?;
            return Ok(Eip1559TransactionRequest {
                to: params.to,
                gas,
                value,
                data,
                nonce: Some(nonce),
                max_priority_fee_per_gas: params.max_priority_fee_per_gas,
                max_fee_per_gas: params.max_fee_per_gas,
                chain_id: Some(chain_id),
            }
            .into())
        }

        match params.transaction_type.map(|t| t.as_u64()) {
            None | Some(0) => {}
            Some(other) => return Err(EncodingError::UnsupportedType(other)),
        }

        Ok(TransactionRequest {
            to: params.to,
            gas,
            gas_price: params.gas_price,
            value,
            data,
            nonce: Some(nonce),
            chain_id: params.chain_id,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> TransactionParams {
        TransactionParams {
            to: Some("abcabcabcabcabcabcabcabcabcabcabcabcabca".parse().unwrap()),
            value: Some(U256::zero()),
            data: Some("0x".parse().unwrap()),
            gas_limit: Some(21000.into()),
            gas_price: Some(1_000_000_000u64.into()),
            nonce: Some(U256::zero()),
            chain_id: Some(1.into()),
            ..Default::default()
        }
    }

    #[test]
    fn legacy_request_normalizes_to_type_zero() {
        let tx = TypedTransaction::try_from(base_params()).unwrap();
        assert_eq!(tx.type_id(), 0);
        assert_eq!(tx.gas_price(), Some(&U256::from(1_000_000_000u64)));
        // empty calldata collapses to the absent slot
        assert_eq!(tx.data(), None);
    }

    #[test]
    fn fee_fields_force_the_fee_market_shape() {
        let mut params = base_params();
        params.max_fee_per_gas = Some(2_000_000_000u64.into());
        params.max_priority_fee_per_gas = Some(1_000_000_000u64.into());

        let tx = TypedTransaction::try_from(params).unwrap();
        assert_eq!(tx.type_id(), 2);
        // gasPrice is dropped even though the request carried one
        assert_eq!(tx.gas_price(), None);
        assert_eq!(tx.max_fee_per_gas(), Some(&U256::from(2_000_000_000u64)));
    }

    #[test]
    fn detection_matches_field_presence() {
        let mut by_type = base_params();
        by_type.transaction_type = Some(2.into());
        assert!(by_type.is_eip1559());

        let mut by_max_fee = base_params();
        by_max_fee.max_fee_per_gas = Some(1.into());
        assert!(by_max_fee.is_eip1559());

        let mut by_priority = base_params();
        by_priority.max_priority_fee_per_gas = Some(1.into());
        assert!(by_priority.is_eip1559());

        assert!(!base_params().is_eip1559());
    }

    #[test]
    fn gas_alias_fills_gas_limit() {
        let mut params = base_params();
        params.gas_limit = None;
        params.gas = Some(30000.into());
        let tx = TypedTransaction::try_from(params).unwrap();
        assert_eq!(tx.gas(), Some(&U256::from(30000)));
    }

    #[test]
    fn canonical_gas_limit_wins_over_alias() {
        let mut params = base_params();
        params.gas = Some(30000.into());
        let tx = TypedTransaction::try_from(params).unwrap();
        assert_eq!(tx.gas(), Some(&U256::from(21000)));
    }

    #[test]
    fn nonce_is_required_and_range_checked() {
        let mut params = base_params();
        params.nonce = None;
        assert!(matches!(
            TypedTransaction::try_from(params).unwrap_err(),
            EncodingError::MissingNonce
        ));

        let mut params = base_params();
        params.nonce = Some(U256::from(u64::MAX) + 1);
        assert!(matches!(
            TypedTransaction::try_from(params).unwrap_err(),
            EncodingError::NonceOutOfRange(_)
        ));
    }

    #[test]
    fn eip1559_requires_chain_id() {
        let mut params = base_params();
        params.transaction_type = Some(2.into());
        params.chain_id = None;
        assert!(matches!(
            TypedTransaction::try_from(params).unwrap_err(),
            EncodingError::MissingChainId
        ));
    }

    #[test]
    fn access_list_type_is_rejected() {
        let mut params = base_params();
        params.transaction_type = Some(1.into());
        assert!(matches!(
            TypedTransaction::try_from(params).unwrap_err(),
            EncodingError::UnsupportedType(1)
        ));
    }

    #[test]
    fn deserializes_json_rpc_shape() {
        let params: TransactionParams = serde_json::from_value(serde_json::json!({
            "to": "0xabcabcabcabcabcabcabcabcabcabcabcabcabca",
            "gas": "0x5208",
            "maxFeePerGas": "0x77359400",
            "nonce": "0x0",
            "chainId": "0x1",
            "type": "0x2"
        }))
        .unwrap();
        assert!(params.is_eip1559());
        assert_eq!(params.gas_limit(), Some(U256::from(21000)));
    }
}
