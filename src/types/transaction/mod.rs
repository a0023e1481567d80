//! Canonical transaction shapes and their RLP encodings.

pub mod eip1559;
pub mod params;
pub mod request;
pub mod typed;

use crate::types::{Address, Signature, U64};

// Number of legacy tx fields with the EIP-155 chain id placeholder appended
pub(crate) const NUM_TX_FIELDS: usize = 9;

pub(super) fn rlp_opt<T: rlp::Encodable>(rlp: &mut rlp::RlpStream, opt: &Option<T>) {
    if let Some(inner) = opt {
        rlp.append(inner);
    } else {
        rlp.append(&"");
    }
}

/// Normalizes any `v` the device may report down to the raw recovery parity.
pub(crate) fn normalize_v(v: u64) -> u64 {
    match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        v if v >= 35 => (v - 1) % 2,
        v => v & 1,
    }
}

/// Applies [EIP-155](https://github.com/ethereum/EIPs/blob/master/EIPS/eip-155.md)
pub(crate) fn to_eip155_v(recovery_id: u64, chain_id: Option<U64>) -> u64 {
    match chain_id {
        // When signing with a chain ID, add chain replay protection.
        Some(chain_id) => recovery_id + 35 + chain_id.as_u64() * 2,
        // Otherwise, convert to 'Electrum' notation.
        None => recovery_id + 27,
    }
}

/// extracts the chainid from the signature v value based on EIP-155
pub(crate) fn extract_chain_id(v: u64) -> Option<U64> {
    // https://eips.ethereum.org/EIPS/eip-155
    // if chainid is available, v = {0, 1} + CHAIN_ID * 2 + 35
    if v >= 35 {
        return Some(U64::from((v - 35) >> 1))
    }
    None
}

/// Decodes the signature portion of the RLP encoding based on the RLP offset passed.
/// Increments the offset for each element parsed.
#[inline]
fn decode_signature(rlp: &rlp::Rlp, offset: &mut usize) -> Result<Signature, rlp::DecoderError> {
    let sig = Signature {
        v: rlp.val_at(*offset)?,
        r: rlp.val_at(*offset + 1)?,
        s: rlp.val_at(*offset + 2)?,
    };
    *offset += 3;
    Ok(sig)
}

/// Decodes the `to` field of the RLP encoding based on the RLP offset passed. Increments the offset
/// by one.
#[inline]
fn decode_to(rlp: &rlp::Rlp, offset: &mut usize) -> Result<Option<Address>, rlp::DecoderError> {
    let to = {
        let to = rlp.at(*offset)?;
        if to.is_empty() {
            if to.is_data() {
                None
            } else {
                return Err(rlp::DecoderError::RlpExpectedToBeData)
            }
        } else {
            Some(to.as_val()?)
        }
    };
    *offset += 1;

    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlp::RlpStream;

    #[test]
    fn test_rlp_opt_none() {
        let mut stream = RlpStream::new_list(1);
        let empty_chainid: Option<U64> = None;
        rlp_opt(&mut stream, &empty_chainid);
        let out = stream.out();
        assert_eq!(out, vec![0xc1, 0x80]);
    }

    #[test]
    fn v_normalization() {
        assert_eq!(normalize_v(0), 0);
        assert_eq!(normalize_v(1), 1);
        assert_eq!(normalize_v(27), 0);
        assert_eq!(normalize_v(28), 1);
        assert_eq!(normalize_v(37), 0);
        assert_eq!(normalize_v(38), 1);
    }

    #[test]
    fn eip155_v_roundtrip() {
        for parity in [0u64, 1] {
            let v = to_eip155_v(parity, Some(U64::from(1)));
            assert_eq!(v, parity + 37);
            assert_eq!(extract_chain_id(v), Some(U64::from(1)));
            assert_eq!(normalize_v(v), parity);
        }
        assert_eq!(to_eip155_v(1, None), 28);
        assert_eq!(extract_chain_id(28), None);
    }
}
