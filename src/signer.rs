//! The device signing session.
//!
//! [`LedgerSigner`] owns one derivation path and drives every exchange with
//! the hardware wallet through the same discipline: acquire the transport,
//! confirm the Ethereum app is responsive, run exactly one operation, release
//! the transport — on every path, including failures. Device-reported errors
//! are translated to [`LedgerError`] here and nowhere else.

use crate::{
    device::{
        apdu::{status_message, sw},
        eth::Eth,
        events::{DisconnectEvents, DisconnectSubscription},
        transport::{DeviceId, Transport, TransportError, TransportProvider},
        types::{DerivationType, DeviceError},
    },
    resolution::{LoadConfig, NoopResolver, ResolutionConfig, ResolutionError, TransactionResolver},
    types::{Address, Bytes, EncodingError, Signature, TransactionParams, TypedTransaction},
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

/// Error when signing with the Ledger device.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The transport could not be acquired: device not connected, not
    /// permitted, or held elsewhere. Not retried automatically.
    #[error("Ledger device unavailable: {0}")]
    DeviceUnavailable(String),
    /// The device firmware cannot perform the request: app missing, app too
    /// old, or a signing variant this wallet does not support.
    #[error("unsupported operation: {message}")]
    UnsupportedOperation {
        message: String,
        /// Originating status word, when the device reported one.
        status: Option<u16>,
    },
    /// Confirmation was declined on the device.
    #[error("signing request was rejected on the Ledger device")]
    UserRejected,
    /// Malformed or inconsistent request; raised before any device
    /// interaction.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The external resolver could not annotate the payload; no device call
    /// was attempted.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// The device went away mid-operation.
    #[error("Ledger transport closed unexpectedly: {0}")]
    TransportClosed(String),
    /// The device answered, but not in the shape the protocol promises.
    #[error("unexpected device response: {0}")]
    UnexpectedResponse(String),
    /// Any other device-reported status word.
    #[error("Ledger device returned status {status:#06x}: {message}")]
    Device { status: u16, message: String },
}

impl LedgerError {
    /// The device status word this error originated from, preserved for
    /// programmatic handling.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LedgerError::UserRejected => Some(sw::DENIED),
            LedgerError::UnsupportedOperation { status, .. } => *status,
            LedgerError::Device { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A signer backed by a Ledger hardware wallet.
///
/// The device address is resolved lazily, at most once per signer; build a
/// new signer to re-derive it. The physical transport is never held between
/// operations.
#[derive(Debug)]
pub struct LedgerSigner<P: TransportProvider, R: TransactionResolver = NoopResolver> {
    transport: P,
    resolver: R,
    derivation: DerivationType,
    path_bytes: Vec<u8>,
    address: OnceCell<Address>,
    events: Arc<DisconnectEvents>,
}

impl<P: TransportProvider> LedgerSigner<P, NoopResolver> {
    /// Creates a signer over the given transport provider and derivation
    /// path, with no transaction resolution.
    pub fn new(transport: P, derivation: DerivationType) -> Result<Self, LedgerError> {
        Self::with_resolver(transport, derivation, NoopResolver)
    }
}

impl<P, R> LedgerSigner<P, R>
where
    P: TransportProvider,
    R: TransactionResolver,
{
    /// Creates a signer that annotates transactions through `resolver`
    /// before handing them to the device.
    pub fn with_resolver(
        transport: P,
        derivation: DerivationType,
        resolver: R,
    ) -> Result<Self, LedgerError> {
        let path_bytes = derivation.to_bytes()?;
        Ok(Self {
            transport,
            resolver,
            derivation,
            path_bytes,
            address: OnceCell::new(),
            events: Arc::new(DisconnectEvents::new()),
        })
    }

    /// The derivation path this signer operates on.
    pub fn derivation(&self) -> &DerivationType {
        &self.derivation
    }

    /// Registers a listener for physical disconnects observed during device
    /// operations. Fires once per disconnect, deduplicated by device
    /// identity; dropping the guard unsubscribes.
    pub fn on_disconnect(
        &self,
        callback: impl Fn(&DeviceId) + Send + Sync + 'static,
    ) -> DisconnectSubscription {
        self.events.subscribe(callback)
    }

    /// The device-derived address for this signer's path.
    ///
    /// Queried from the device at most once and memoized; concurrent first
    /// calls coalesce into a single device query.
    pub async fn get_address(&self) -> Result<Address, LedgerError> {
        self.address
            .get_or_try_init(|| async {
                debug!(path = %self.derivation, "querying address from the Ledger device");
                let (mut app, device) = self.open_app().await?;
                let result = app.get_address(&self.path_bytes).await;
                self.finish(app, &device, result).await
            })
            .await
            .copied()
    }

    /// Signs an EIP-191 personal message (requires confirmation on the
    /// device). Text input is treated as its UTF-8 bytes.
    pub async fn sign_message<S: Send + Sync + AsRef<[u8]>>(
        &self,
        message: S,
    ) -> Result<Signature, LedgerError> {
        let message = message.as_ref();
        debug!(len = message.len(), "signing personal message on the Ledger device");

        let (mut app, device) = self.open_app().await?;
        let result = app.sign_personal_message(&self.path_bytes, message).await;
        self.finish(app, &device, result).await
    }

    /// Signs a transaction request (requires confirmation on the device) and
    /// returns the canonical signed encoding.
    pub async fn sign_transaction(
        &self,
        params: TransactionParams,
    ) -> Result<Bytes, LedgerError> {
        self.sign_transaction_with_config(
            params,
            &LoadConfig::default(),
            &ResolutionConfig::default(),
        )
        .await
    }

    /// Signs a transaction request with explicit resolution configuration.
    ///
    /// Pipeline: normalize to the canonical unsigned shape, encode, resolve
    /// display annotations, obtain the device signature over the encoding,
    /// reassemble the signed encoding.
    pub async fn sign_transaction_with_config(
        &self,
        params: TransactionParams,
        load_config: &LoadConfig,
        resolution_config: &ResolutionConfig,
    ) -> Result<Bytes, LedgerError> {
        let tx = TypedTransaction::try_from(params)?;
        let raw = tx.rlp();

        let resolution = self
            .resolver
            .resolve_transaction(&hex::encode(raw.as_ref()), load_config, resolution_config)
            .await?;

        debug!(tx_type = tx.type_id(), "signing transaction on the Ledger device");
        let (mut app, device) = self.open_app().await?;
        let result = app.sign_transaction(&self.path_bytes, raw.as_ref(), &resolution).await;
        let signature = self.finish(app, &device, result).await?;

        Ok(tx.rlp_signed(&signature))
    }

    /// EIP-712 typed-data signing is not supported by this signer.
    pub fn sign_typed_data(&self, _payload: &serde_json::Value) -> Result<Signature, LedgerError> {
        Err(LedgerError::UnsupportedOperation {
            message: "EIP-712 typed-data signing is not supported, \
                      use personal-message or transaction signing"
                .to_owned(),
            status: None,
        })
    }

    /// Acquires the transport and confirms the app is responsive. The
    /// transport is released before an error is returned.
    async fn open_app(&self) -> Result<(Eth<P::Transport>, DeviceId), LedgerError> {
        let transport = self
            .transport
            .acquire()
            .await
            .map_err(|err| LedgerError::DeviceUnavailable(err.to_string()))?;
        let device = transport.device_id();
        self.events.arm(&device);

        let mut app = Eth::new(transport);
        if let Err(err) = app.app_configuration().await {
            app.close().await;
            return Err(self.translate(&device, err))
        }

        Ok((app, device))
    }

    /// Releases the transport and translates the operation outcome. Runs for
    /// successes and failures alike; release is unconditional.
    async fn finish<T>(
        &self,
        app: Eth<P::Transport>,
        device: &DeviceId,
        result: Result<T, DeviceError>,
    ) -> Result<T, LedgerError> {
        app.close().await;
        result.map_err(|err| self.translate(device, err))
    }

    /// The single point where device-reported failures become [`LedgerError`].
    fn translate(&self, device: &DeviceId, err: DeviceError) -> LedgerError {
        match err {
            DeviceError::Transport(TransportError::Closed(reason)) => {
                self.events.notify(device);
                LedgerError::TransportClosed(reason)
            }
            DeviceError::Transport(TransportError::Unavailable(reason)) => {
                LedgerError::DeviceUnavailable(reason)
            }
            DeviceError::Status { status: sw::DENIED } => LedgerError::UserRejected,
            DeviceError::Status { status }
                if matches!(
                    status,
                    sw::APP_NOT_OPEN | sw::CLA_NOT_SUPPORTED | sw::INS_NOT_SUPPORTED
                ) =>
            {
                LedgerError::UnsupportedOperation {
                    message: format!(
                        "{}, open the Ethereum app on the device and retry",
                        status_message(status)
                    ),
                    status: Some(status),
                }
            }
            DeviceError::UnsupportedAppVersion { found, required } => {
                LedgerError::UnsupportedOperation {
                    message: format!(
                        "Ledger Ethereum app {found} is too old for this transaction, \
                         version {required} or newer is required"
                    ),
                    status: None,
                }
            }
            DeviceError::Status { status } => LedgerError::Device {
                status,
                message: status_message(status).to_owned(),
            },
            err @ (DeviceError::UnexpectedNullResponse |
            DeviceError::ShortResponse { .. } |
            DeviceError::HexError(_) |
            DeviceError::SemVerError(_)) => LedgerError::UnexpectedResponse(err.to_string()),
        }
    }
}
