//! Client for the Ethereum application running on the device.
//!
//! Speaks the app's APDU protocol over an acquired [`Transport`]: address
//! derivation, personal-message signing and transaction signing, plus the
//! annotation instructions that let the device display token and contract
//! context before asking for confirmation.

use super::{
    apdu::{sw, ApduAnswer, ApduCommand},
    transport::Transport,
    types::{AppConfiguration, DeviceError, INS, P1, P1_FIRST, P2},
};
use crate::{
    resolution::ResolutionObject,
    types::{Address, Signature, U256},
};
use tracing::trace;

/// Minimum app version able to sign EIP-1559 payloads.
const EIP1559_MIN_APP_VERSION: &str = "1.9.2";

/// A session-scoped handle to the Ethereum app over one acquired transport.
#[derive(Debug)]
pub struct Eth<T> {
    transport: T,
    config: Option<AppConfiguration>,
}

impl<T: Transport> Eth<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, config: None }
    }

    /// Releases the underlying transport. Must run on every exit path; the
    /// signing session owns that guarantee.
    pub async fn close(self) {
        self.transport.close().await
    }

    /// The configuration reported by the app during the handshake, if it ran.
    pub fn config(&self) -> Option<&AppConfiguration> {
        self.config.as_ref()
    }

    /// Queries the app configuration, confirming the Ethereum app is open and
    /// responsive. Remembered for the lifetime of this handle.
    pub async fn app_configuration(&mut self) -> Result<AppConfiguration, DeviceError> {
        let result = self
            .exchange(ApduCommand {
                ins: INS::GET_APP_CONFIGURATION as u8,
                p1: P1::NON_CONFIRM as u8,
                p2: P2::NO_CHAINCODE as u8,
                data: vec![],
            })
            .await?;

        if result.len() < 4 {
            return Err(DeviceError::ShortResponse { got: result.len(), at_least: 4 })
        }

        let config = AppConfiguration {
            arbitrary_data_enabled: result[0] & 0x01 != 0,
            erc20_provisioning_necessary: result[0] & 0x02 != 0,
            version: format!("{}.{}.{}", result[1], result[2], result[3]),
        };
        self.config = Some(config.clone());

        Ok(config)
    }

    /// Gets the account which corresponds to the given BIP-32-encoded
    /// derivation path.
    pub async fn get_address(&mut self, path: &[u8]) -> Result<Address, DeviceError> {
        let result = self
            .exchange(ApduCommand {
                ins: INS::GET_PUBLIC_KEY as u8,
                p1: P1::NON_CONFIRM as u8,
                p2: P2::NO_CHAINCODE as u8,
                data: path.to_vec(),
            })
            .await?;

        // response layout: pubkey length prefix, pubkey, address length
        // prefix, ascii-hex address
        let pubkey_end = 1 + *result.first().ok_or(DeviceError::UnexpectedNullResponse)? as usize;
        if result.len() <= pubkey_end {
            return Err(DeviceError::ShortResponse { got: result.len(), at_least: pubkey_end + 1 })
        }
        let addr_len = result[pubkey_end] as usize;
        let addr_end = pubkey_end + 1 + addr_len;
        if result.len() < addr_end {
            return Err(DeviceError::ShortResponse { got: result.len(), at_least: addr_end })
        }

        let addr_bytes = hex::decode(&result[pubkey_end + 1..addr_end])?;
        if addr_bytes.len() != 20 {
            return Err(DeviceError::ShortResponse { got: addr_bytes.len(), at_least: 20 })
        }

        let mut address = [0; 20];
        address.copy_from_slice(&addr_bytes);
        Ok(Address::from(address))
    }

    /// Signs an ethereum personal message (requires confirmation on the
    /// device).
    pub async fn sign_personal_message(
        &mut self,
        path: &[u8],
        message: &[u8],
    ) -> Result<Signature, DeviceError> {
        let mut payload = path.to_vec();
        payload.extend_from_slice(&(message.len() as u32).to_be_bytes());
        payload.extend_from_slice(message);

        self.sign_payload(INS::SIGN_PERSONAL_MESSAGE, payload).await
    }

    /// Signs a canonical unsigned transaction encoding (requires confirmation
    /// on the device), replaying the resolution annotations first so the
    /// device can display what is being signed.
    pub async fn sign_transaction(
        &mut self,
        path: &[u8],
        raw_tx: &[u8],
        resolution: &ResolutionObject,
    ) -> Result<Signature, DeviceError> {
        if raw_tx.first() == Some(&0x02) {
            self.ensure_eip1559_support()?;
        }

        self.apply_resolution(resolution).await?;

        let mut payload = path.to_vec();
        payload.extend_from_slice(raw_tx);
        self.sign_payload(INS::SIGN, payload).await
    }

    fn ensure_eip1559_support(&self) -> Result<(), DeviceError> {
        let config = match &self.config {
            Some(config) => config,
            None => return Ok(()),
        };

        let found = semver::Version::parse(&config.version)?;
        let required = semver::Version::parse(EIP1559_MIN_APP_VERSION)?;
        if found < required {
            return Err(DeviceError::UnsupportedAppVersion {
                found: config.version.clone(),
                required: EIP1559_MIN_APP_VERSION,
            })
        }
        Ok(())
    }

    /// Replays each annotation payload ahead of the signing exchange. Apps too
    /// old to know an annotation instruction answer `INS_NOT_SUPPORTED` or
    /// `INCORRECT_DATA`; those annotations are skipped and the signing
    /// exchange still requires on-device confirmation.
    async fn apply_resolution(&mut self, resolution: &ResolutionObject) -> Result<(), DeviceError> {
        for plugin in &resolution.plugin {
            self.annotate(INS::SET_PLUGIN, hex::decode(plugin)?).await?;
        }
        for plugin in &resolution.external_plugin {
            let mut data = hex::decode(&plugin.payload)?;
            data.extend(hex::decode(&plugin.signature)?);
            self.annotate(INS::SET_EXTERNAL_PLUGIN, data).await?;
        }
        for nft in &resolution.nfts {
            self.annotate(INS::PROVIDE_NFT_INFORMATION, hex::decode(nft)?).await?;
        }
        for token in &resolution.erc20_tokens {
            self.annotate(INS::PROVIDE_ERC20_TOKEN_INFORMATION, hex::decode(token)?).await?;
        }
        Ok(())
    }

    async fn annotate(&mut self, ins: INS, data: Vec<u8>) -> Result<(), DeviceError> {
        let answer = self
            .transport
            .exchange(&ApduCommand {
                ins: ins as u8,
                p1: P1::NON_CONFIRM as u8,
                p2: P2::NO_CHAINCODE as u8,
                data,
            })
            .await?;

        match answer.status {
            sw::OK | sw::INS_NOT_SUPPORTED | sw::INCORRECT_DATA => Ok(()),
            status => Err(DeviceError::Status { status }),
        }
    }

    // Helper function for signing either transaction data or personal messages
    async fn sign_payload(
        &mut self,
        command: INS,
        mut payload: Vec<u8>,
    ) -> Result<Signature, DeviceError> {
        let mut command = ApduCommand {
            ins: command as u8,
            p1: P1_FIRST,
            p2: P2::NO_CHAINCODE as u8,
            data: vec![],
        };

        let mut result = Vec::new();

        // Iterate in 255 byte chunks
        while !payload.is_empty() {
            let chunk_size = std::cmp::min(payload.len(), 255);
            command.data = payload.drain(0..chunk_size).collect();

            result = self.exchange(command.clone()).await?;

            // We need more data
            command.p1 = P1::MORE as u8;
        }

        if result.len() < 65 {
            return Err(DeviceError::ShortResponse { got: result.len(), at_least: 65 })
        }

        let v = result[0] as u64;
        let r = U256::from_big_endian(&result[1..33]);
        let s = U256::from_big_endian(&result[33..65]);
        Ok(Signature { r, s, v })
    }

    async fn exchange(&mut self, command: ApduCommand) -> Result<Vec<u8>, DeviceError> {
        trace!(ins = command.ins, payload_len = command.data.len(), "apdu exchange");
        let ApduAnswer { data, status } = self.transport.exchange(&command).await?;
        if status != sw::OK {
            return Err(DeviceError::Status { status })
        }
        Ok(data)
    }
}
