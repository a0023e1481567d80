#![allow(clippy::upper_case_acronyms)]
//! Helpers for interacting with the Ethereum Ledger App
//! [Official Docs](https://github.com/LedgerHQ/app-ethereum/blob/master/doc/ethapp.asc)
use super::{apdu::status_message, transport::TransportError};
use crate::types::EncodingError;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Ledger wallet type
pub enum DerivationType {
    /// Ledger Live-generated HD path
    LedgerLive(usize),
    /// Legacy generated HD Path
    Legacy(usize),
    /// Any other path
    Other(String),
}

impl Default for DerivationType {
    /// The Ethereum standard path for account 0, `m/44'/60'/0'/0/0`.
    fn default() -> Self {
        DerivationType::LedgerLive(0)
    }
}

impl fmt::Display for DerivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                DerivationType::Legacy(index) => format!("m/44'/60'/0'/{index}"),
                DerivationType::LedgerLive(index) => format!("m/44'/60'/{index}'/0/0"),
                DerivationType::Other(inner) => inner.to_owned(),
            }
        )
    }
}

impl DerivationType {
    /// Encodes the path into the BIP-32 byte form the device expects:
    /// a depth byte followed by one big-endian `u32` per component, with the
    /// hardened bit set for `'`-suffixed components.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        let derivation = self.to_string();
        let invalid = || EncodingError::InvalidDerivationPath(derivation.clone());

        let mut components = derivation.split('/');
        if components.next() != Some("m") {
            return Err(invalid())
        }

        let elements = components.collect::<Vec<_>>();
        if elements.is_empty() || elements.len() > 10 {
            return Err(invalid())
        }

        let mut bytes = vec![elements.len() as u8];
        for derivation_index in elements {
            let hardened = derivation_index.ends_with('\'');
            let index = derivation_index
                .trim_end_matches('\'')
                .parse::<u32>()
                .map_err(|_| invalid())?;
            let index = if hardened { index | 0x8000_0000 } else { index };

            bytes.extend(index.to_be_bytes());
        }

        Ok(bytes)
    }
}

/// The device application's configuration, reported during the session
/// handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfiguration {
    /// Whether blind signing of arbitrary contract data is enabled on the
    /// device.
    pub arbitrary_data_enabled: bool,
    /// Whether the app requires ERC-20 token provisioning before signing.
    pub erc20_provisioning_necessary: bool,
    /// App version as `major.minor.patch`.
    pub version: String,
}

#[derive(Error, Debug)]
/// Error produced while talking to the device application.
pub enum DeviceError {
    /// Underlying transport error
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The device reported a status word other than success.
    #[error("device returned status {status:#06x}: {}", status_message(*status))]
    Status { status: u16 },
    /// Device response was unexpectedly none
    #[error("received unexpected response from device, expected data in response, found none")]
    UnexpectedNullResponse,
    /// Got a response, but it didn't contain as much data as expected
    #[error("cannot deserialize device response, insufficient bytes, got {got} expected at least {at_least}")]
    ShortResponse { got: usize, at_least: usize },
    /// The app on the device is too old for the requested operation.
    #[error("Ledger Ethereum app {found} is too old, version {required} or newer is required")]
    UnsupportedAppVersion { found: String, required: &'static str },
    #[error(transparent)]
    /// Error when converting from a hex string
    HexError(#[from] hex::FromHexError),
    #[error(transparent)]
    /// Error when parsing the app version
    SemVerError(#[from] semver::Error),
}

pub const P1_FIRST: u8 = 0x00;

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum INS {
    GET_PUBLIC_KEY = 0x02,
    SIGN = 0x04,
    GET_APP_CONFIGURATION = 0x06,
    SIGN_PERSONAL_MESSAGE = 0x08,
    PROVIDE_ERC20_TOKEN_INFORMATION = 0x0A,
    SET_EXTERNAL_PLUGIN = 0x12,
    PROVIDE_NFT_INFORMATION = 0x14,
    SET_PLUGIN = 0x16,
}

impl fmt::Display for INS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            INS::GET_PUBLIC_KEY => write!(f, "GET_PUBLIC_KEY"),
            INS::SIGN => write!(f, "SIGN"),
            INS::GET_APP_CONFIGURATION => write!(f, "GET_APP_CONFIGURATION"),
            INS::SIGN_PERSONAL_MESSAGE => write!(f, "SIGN_PERSONAL_MESSAGE"),
            INS::PROVIDE_ERC20_TOKEN_INFORMATION => write!(f, "PROVIDE_ERC20_TOKEN_INFORMATION"),
            INS::SET_EXTERNAL_PLUGIN => write!(f, "SET_EXTERNAL_PLUGIN"),
            INS::PROVIDE_NFT_INFORMATION => write!(f, "PROVIDE_NFT_INFORMATION"),
            INS::SET_PLUGIN => write!(f, "SET_PLUGIN"),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum P1 {
    NON_CONFIRM = 0x00,
    MORE = 0x80,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum P2 {
    NO_CHAINCODE = 0x00,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_ledger_live_account_zero() {
        assert_eq!(DerivationType::default().to_string(), "m/44'/60'/0'/0/0");
    }

    #[test]
    fn path_byte_encoding() {
        let bytes = DerivationType::LedgerLive(0).to_bytes().unwrap();
        assert_eq!(bytes.len(), 1 + 5 * 4);
        assert_eq!(bytes[0], 5);
        // first component: 44'
        assert_eq!(bytes[1..5], (44u32 | 0x8000_0000).to_be_bytes()[..]);
        // last component: 0, non-hardened
        assert_eq!(bytes[17..21], 0u32.to_be_bytes()[..]);
    }

    #[test]
    fn legacy_path_depth() {
        let bytes = DerivationType::Legacy(3).to_bytes().unwrap();
        assert_eq!(bytes[0], 4);
        assert_eq!(bytes[13..17], 3u32.to_be_bytes()[..]);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for path in ["", "44'/60'/0'/0/0", "m", "m/44'/x/0"] {
            let err = DerivationType::Other(path.to_owned()).to_bytes().unwrap_err();
            assert!(matches!(err, EncodingError::InvalidDerivationPath(_)));
        }
    }
}
