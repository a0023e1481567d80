//! Capability traits over the physical device transport.
//!
//! The signing session is generic over these traits so the whole pipeline can
//! run against a scripted mock; the `hid` feature provides the real adapter.

use super::apdu::{ApduAnswer, ApduCommand};
use async_trait::async_trait;
use thiserror::Error;

/// Identity of a physical device, used to deduplicate disconnect
/// notifications.
pub type DeviceId = String;

/// An error raised by the transport layer itself, as opposed to a status word
/// reported by the device application.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The transport could not be acquired: not connected, not permitted, or
    /// already held by another process.
    #[error("device transport unavailable: {0}")]
    Unavailable(String),
    /// The device went away while an exchange was in flight.
    #[error("device transport closed unexpectedly: {0}")]
    Closed(String),
}

/// An exclusively-held communication channel to the device.
///
/// A handle is acquired per operation and must be closed on every exit path;
/// the session guarantees the `close` call, implementations only have to make
/// it release the underlying channel.
#[async_trait]
pub trait Transport: Send {
    /// Performs one APDU exchange.
    async fn exchange(&mut self, command: &ApduCommand) -> Result<ApduAnswer, TransportError>;

    /// Identity of the device behind this handle.
    fn device_id(&self) -> DeviceId;

    /// Releases the channel.
    async fn close(self);
}

/// Hands out transport handles, one per signing-session operation.
#[async_trait]
pub trait TransportProvider: Send + Sync {
    type Transport: Transport;

    /// Opens a fresh exclusive channel to the device.
    async fn acquire(&self) -> Result<Self::Transport, TransportError>;
}
