//! Native HID adapter over `coins-ledger`.

use super::{
    apdu::{ApduAnswer, ApduCommand},
    transport::{DeviceId, Transport, TransportError, TransportProvider},
};
use async_trait::async_trait;
use coins_ledger::{
    common::{APDUCommand, APDUData},
    transports::{Ledger, LedgerAsync},
};

/// Opens HID channels to a connected Ledger device.
#[derive(Clone, Copy, Debug, Default)]
pub struct HidTransportProvider;

#[async_trait]
impl TransportProvider for HidTransportProvider {
    type Transport = HidTransport;

    async fn acquire(&self) -> Result<Self::Transport, TransportError> {
        let inner = Ledger::init()
            .await
            .map_err(|err| TransportError::Unavailable(err.to_string()))?;
        Ok(HidTransport { inner })
    }
}

/// An exclusively-held HID channel.
pub struct HidTransport {
    inner: Ledger,
}

impl std::fmt::Debug for HidTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HidTransport {
    async fn exchange(&mut self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        let apdu = APDUCommand {
            ins: command.ins,
            p1: command.p1,
            p2: command.p2,
            data: APDUData::new(&command.data),
            response_len: None,
        };

        let answer = self
            .inner
            .exchange(&apdu)
            .await
            .map_err(|err| TransportError::Closed(err.to_string()))?;

        Ok(ApduAnswer {
            status: answer.retcode(),
            data: answer.data().map(|data| data.to_vec()).unwrap_or_default(),
        })
    }

    fn device_id(&self) -> DeviceId {
        // coins-ledger binds to one device per process
        "hid-ledger".to_owned()
    }

    async fn close(self) {
        drop(self.inner)
    }
}
