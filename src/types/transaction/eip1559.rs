use super::{decode_to, normalize_v, rlp_opt};
use crate::types::{Address, Bytes, Signature, U256, U64};
use rlp::RlpStream;
use serde::{Deserialize, Serialize};

/// EIP-1559 transactions have 9 fields
const NUM_TX_FIELDS: usize = 9;

/// Parameters for an EIP-1559 (type 2) fee-market transaction.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub struct Eip1559TransactionRequest {
    /// Recipient address (None for contract creation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,

    /// Supplied gas limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,

    /// Transferred value (None for no transfer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,

    /// The compiled code of a contract OR the first 4 bytes of the hash of the
    /// invoked method signature and encoded parameters. For details see Ethereum Contract ABI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,

    /// Transaction nonce
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,

    /// Represents the maximum tx fee that will go to the miner as part of the user's
    /// fee payment.
    #[serde(rename = "maxPriorityFeePerGas", default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,

    /// Represents the maximum amount that a user is willing to pay for their tx (inclusive of
    /// baseFeePerGas and maxPriorityFeePerGas). The difference between maxFeePerGas and
    /// baseFeePerGas + maxPriorityFeePerGas is refunded to the user.
    #[serde(rename = "maxFeePerGas", default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,

    /// Chain id, mandatory for the type-2 payload
    #[serde(rename = "chainId", default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
}

impl Eip1559TransactionRequest {
    /// Creates an empty transaction request with all fields left empty
    pub fn new() -> Self {
        Self::default()
    }

    // Builder pattern helpers

    /// Sets the `to` field in the transaction to the provided value
    #[must_use]
    pub fn to<T: Into<Address>>(mut self, to: T) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Sets the `gas` field in the transaction to the provided value
    #[must_use]
    pub fn gas<T: Into<U256>>(mut self, gas: T) -> Self {
        self.gas = Some(gas.into());
        self
    }

    /// Sets the `max_priority_fee_per_gas` field in the transaction to the provided value
    #[must_use]
    pub fn max_priority_fee_per_gas<T: Into<U256>>(mut self, max_priority_fee_per_gas: T) -> Self {
        self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas.into());
        self
    }

    /// Sets the `max_fee_per_gas` field in the transaction to the provided value
    #[must_use]
    pub fn max_fee_per_gas<T: Into<U256>>(mut self, max_fee_per_gas: T) -> Self {
        self.max_fee_per_gas = Some(max_fee_per_gas.into());
        self
    }

    /// Sets the `value` field in the transaction to the provided value
    #[must_use]
    pub fn value<T: Into<U256>>(mut self, value: T) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Sets the `data` field in the transaction to the provided value
    #[must_use]
    pub fn data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Sets the `nonce` field in the transaction to the provided value
    #[must_use]
    pub fn nonce<T: Into<U256>>(mut self, nonce: T) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the `chain_id` field in the transaction to the provided value
    #[must_use]
    pub fn chain_id<T: Into<U64>>(mut self, chain_id: T) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    /// Gets the unsigned transaction's type-2 payload RLP encoding, without
    /// the `0x02` envelope byte.
    pub fn rlp(&self) -> Bytes {
        let mut rlp = RlpStream::new();
        rlp.begin_list(NUM_TX_FIELDS);
        self.rlp_base(&mut rlp);
        rlp.out().freeze().into()
    }

    /// Produces the payload RLP encoding of the transaction with the provided
    /// signature, without the `0x02` envelope byte. The signature `v` is
    /// normalized down to the raw recovery parity.
    pub fn rlp_signed(&self, signature: &Signature) -> Bytes {
        let mut rlp = RlpStream::new();
        rlp.begin_unbounded_list();
        self.rlp_base(&mut rlp);

        rlp.append(&normalize_v(signature.v));
        rlp.append(&signature.r);
        rlp.append(&signature.s);
        rlp.finalize_unbounded_list();
        rlp.out().freeze().into()
    }

    pub(crate) fn rlp_base(&self, rlp: &mut RlpStream) {
        rlp.append(&self.chain_id.unwrap_or_else(U64::one));
        rlp_opt(rlp, &self.nonce);
        rlp_opt(rlp, &self.max_priority_fee_per_gas);
        rlp_opt(rlp, &self.max_fee_per_gas);
        rlp_opt(rlp, &self.gas);
        rlp_opt(rlp, &self.to);
        rlp_opt(rlp, &self.value);
        rlp_opt(rlp, &self.data.as_ref().map(|d| d.as_ref()));
        // access list slot is mandatory in the payload and always empty here
        rlp.append_list::<u8, u8>(&[]);
    }

    pub(crate) fn decode_base_rlp(
        rlp: &rlp::Rlp,
        offset: &mut usize,
    ) -> Result<Self, rlp::DecoderError> {
        let mut tx = Self::new();
        tx.chain_id = Some(rlp.at(*offset)?.as_val()?);
        *offset += 1;
        tx.nonce = Some(rlp.at(*offset)?.as_val()?);
        *offset += 1;
        tx.max_priority_fee_per_gas = Some(rlp.at(*offset)?.as_val()?);
        *offset += 1;
        tx.max_fee_per_gas = Some(rlp.at(*offset)?.as_val()?);
        *offset += 1;
        tx.gas = Some(rlp.at(*offset)?.as_val()?);
        *offset += 1;

        tx.to = decode_to(rlp, offset)?;
        tx.value = Some(rlp.at(*offset)?.as_val()?);
        *offset += 1;

        let data = rlp::Rlp::new(rlp.at(*offset)?.as_raw()).data()?;
        tx.data = match data.len() {
            0 => None,
            _ => Some(Bytes::from(data.to_vec())),
        };
        *offset += 1;

        let access_list = rlp.at(*offset)?;
        if !access_list.is_list() {
            return Err(rlp::DecoderError::RlpExpectedToBeList)
        }
        *offset += 1;

        Ok(tx)
    }

    /// Decodes the unsigned payload RLP (without the `0x02` envelope byte).
    pub fn decode_unsigned_rlp(rlp: &rlp::Rlp) -> Result<Self, rlp::DecoderError> {
        let mut offset = 0;
        Self::decode_base_rlp(rlp, &mut offset)
    }

    /// Decodes the signed payload RLP (without the `0x02` envelope byte).
    pub fn decode_signed_rlp(
        rlp: &rlp::Rlp,
    ) -> Result<(Self, Signature), rlp::DecoderError> {
        let mut offset = 0;
        let tx = Self::decode_base_rlp(rlp, &mut offset)?;
        let sig = super::decode_signature(rlp, &mut offset)?;
        Ok((tx, sig))
    }
}

impl rlp::Decodable for Eip1559TransactionRequest {
    fn decode(rlp: &rlp::Rlp) -> Result<Self, rlp::DecoderError> {
        Self::decode_unsigned_rlp(rlp)
    }
}
