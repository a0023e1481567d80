use super::{
    eip1559::Eip1559TransactionRequest, params::EncodingError, request::TransactionRequest,
};
use crate::{
    types::{Address, Bytes, Signature, H256, U256, U64},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};

/// The canonical unsigned transaction, tagged by its envelope type.
///
/// The tag is decided once, by the normalizer; downstream consumers match on
/// the variant instead of re-inspecting field presence.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(tag = "type")]
pub enum TypedTransaction {
    // 0x00
    #[serde(rename = "0x00")]
    Legacy(TransactionRequest),
    // 0x02
    #[serde(rename = "0x02")]
    Eip1559(Eip1559TransactionRequest),
}

use TypedTransaction::*;

impl TypedTransaction {
    /// The numeric envelope type tag (0 or 2).
    pub fn type_id(&self) -> u64 {
        match self {
            Legacy(_) => 0,
            Eip1559(_) => 2,
        }
    }

    pub fn to(&self) -> Option<&Address> {
        match self {
            Legacy(inner) => inner.to.as_ref(),
            Eip1559(inner) => inner.to.as_ref(),
        }
    }

    pub fn nonce(&self) -> Option<&U256> {
        match self {
            Legacy(inner) => inner.nonce.as_ref(),
            Eip1559(inner) => inner.nonce.as_ref(),
        }
    }

    pub fn value(&self) -> Option<&U256> {
        match self {
            Legacy(inner) => inner.value.as_ref(),
            Eip1559(inner) => inner.value.as_ref(),
        }
    }

    pub fn data(&self) -> Option<&Bytes> {
        match self {
            Legacy(inner) => inner.data.as_ref(),
            Eip1559(inner) => inner.data.as_ref(),
        }
    }

    pub fn gas(&self) -> Option<&U256> {
        match self {
            Legacy(inner) => inner.gas.as_ref(),
            Eip1559(inner) => inner.gas.as_ref(),
        }
    }

    /// Gas price of the legacy variant; the fee-market variant never carries
    /// one.
    pub fn gas_price(&self) -> Option<&U256> {
        match self {
            Legacy(inner) => inner.gas_price.as_ref(),
            Eip1559(_) => None,
        }
    }

    pub fn max_fee_per_gas(&self) -> Option<&U256> {
        match self {
            Legacy(_) => None,
            Eip1559(inner) => inner.max_fee_per_gas.as_ref(),
        }
    }

    pub fn max_priority_fee_per_gas(&self) -> Option<&U256> {
        match self {
            Legacy(_) => None,
            Eip1559(inner) => inner.max_priority_fee_per_gas.as_ref(),
        }
    }

    pub fn chain_id(&self) -> Option<U64> {
        match self {
            Legacy(inner) => inner.chain_id,
            Eip1559(inner) => inner.chain_id,
        }
    }

    /// The canonical unsigned encoding: a bare RLP list for the legacy
    /// variant, the `0x02`-prefixed payload for the fee-market variant.
    pub fn rlp(&self) -> Bytes {
        let mut encoded = vec![];
        match self {
            Legacy(inner) => {
                encoded.extend_from_slice(inner.rlp().as_ref());
            }
            Eip1559(inner) => {
                encoded.extend_from_slice(&[0x2]);
                encoded.extend_from_slice(inner.rlp().as_ref());
            }
        };

        encoded.into()
    }

    /// The canonical signed encoding with `v, r, s` appended per the
    /// envelope type's rules.
    pub fn rlp_signed(&self, signature: &Signature) -> Bytes {
        let mut encoded = vec![];
        match self {
            Legacy(inner) => {
                encoded.extend_from_slice(inner.rlp_signed(signature).as_ref());
            }
            Eip1559(inner) => {
                encoded.extend_from_slice(&[0x2]);
                encoded.extend_from_slice(inner.rlp_signed(signature).as_ref());
            }
        };
        encoded.into()
    }

    /// Hashes the transaction's canonical unsigned encoding.
    pub fn sighash(&self) -> H256 {
        keccak256(self.rlp()).into()
    }

    /// Decodes a canonical unsigned encoding back into the typed shape.
    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        match bytes.first() {
            None => Err(rlp::DecoderError::RlpIsTooShort.into()),
            Some(0x02) => {
                let tx = Eip1559TransactionRequest::decode_unsigned_rlp(&rlp::Rlp::new(
                    &bytes[1..],
                ))?;
                Ok(Eip1559(tx))
            }
            Some(byte) if *byte >= 0xc0 => {
                let tx = TransactionRequest::decode_unsigned_rlp(&rlp::Rlp::new(bytes))?;
                Ok(Legacy(tx))
            }
            Some(byte) => Err(EncodingError::UnsupportedType((*byte).into())),
        }
    }

    /// Decodes a canonical signed encoding, returning the transaction and its
    /// signature components.
    pub fn decode_signed(bytes: &[u8]) -> Result<(Self, Signature), EncodingError> {
        match bytes.first() {
            None => Err(rlp::DecoderError::RlpIsTooShort.into()),
            Some(0x02) => {
                let (tx, sig) =
                    Eip1559TransactionRequest::decode_signed_rlp(&rlp::Rlp::new(&bytes[1..]))?;
                Ok((Eip1559(tx), sig))
            }
            Some(byte) if *byte >= 0xc0 => {
                let (tx, sig) = TransactionRequest::decode_signed_rlp(&rlp::Rlp::new(bytes))?;
                Ok((Legacy(tx), sig))
            }
            Some(byte) => Err(EncodingError::UnsupportedType((*byte).into())),
        }
    }
}

impl From<TransactionRequest> for TypedTransaction {
    fn from(src: TransactionRequest) -> TypedTransaction {
        TypedTransaction::Legacy(src)
    }
}

impl From<Eip1559TransactionRequest> for TypedTransaction {
    fn from(src: Eip1559TransactionRequest) -> TypedTransaction {
        TypedTransaction::Eip1559(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy() -> TypedTransaction {
        TransactionRequest::new()
            .to("3535353535353535353535353535353535353535".parse::<Address>().unwrap())
            .value(0)
            .gas(21000)
            .gas_price(1_000_000_000u64)
            .nonce(0)
            .chain_id(1)
            .into()
    }

    fn eip1559() -> TypedTransaction {
        Eip1559TransactionRequest::new()
            .to("3535353535353535353535353535353535353535".parse::<Address>().unwrap())
            .value(0)
            .gas(21000)
            .max_fee_per_gas(2_000_000_000u64)
            .max_priority_fee_per_gas(1_000_000_000u64)
            .nonce(0)
            .chain_id(1)
            .into()
    }

    #[test]
    fn legacy_encoding_has_no_envelope_byte() {
        let encoded = legacy().rlp();
        assert!(encoded.as_ref()[0] >= 0xc0);
    }

    #[test]
    fn eip1559_encoding_is_enveloped() {
        let encoded = eip1559().rlp();
        assert_eq!(encoded.as_ref()[0], 0x02);
    }

    #[test]
    fn unsigned_roundtrip() {
        for tx in [legacy(), eip1559()] {
            let decoded = TypedTransaction::decode(tx.rlp().as_ref()).unwrap();
            assert_eq!(decoded, tx);
        }
    }

    #[test]
    fn stripping_a_signed_encoding_reproduces_the_unsigned_bytes() {
        let sig = Signature { v: 0, r: U256::from(1), s: U256::from(2) };
        for tx in [legacy(), eip1559()] {
            let signed = tx.rlp_signed(&sig);
            let (stripped, _) = TypedTransaction::decode_signed(signed.as_ref()).unwrap();
            assert_eq!(stripped.rlp(), tx.rlp());
        }
    }

    #[test]
    fn unknown_envelope_type_is_rejected() {
        let err = TypedTransaction::decode(&[0x01, 0xc0]).unwrap_err();
        assert!(matches!(err, EncodingError::UnsupportedType(1)));
    }

    #[test]
    fn serde_tagging() {
        let tx = eip1559();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "0x02");
        let back: TypedTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }
}
