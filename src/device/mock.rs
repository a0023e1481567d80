//! Scripted device used in test environments.

use super::{
    apdu::{sw, ApduAnswer, ApduCommand},
    transport::{DeviceId, Transport, TransportError, TransportProvider},
};
use crate::types::Address;
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

#[derive(Debug)]
struct MockState {
    answers: VecDeque<Result<ApduAnswer, TransportError>>,
    exchanges: Vec<ApduCommand>,
    acquires: usize,
    closes: usize,
    refuse_acquire: bool,
    device_id: DeviceId,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            answers: VecDeque::new(),
            exchanges: Vec::new(),
            acquires: 0,
            closes: 0,
            refuse_acquire: false,
            device_id: "mock-ledger-0".to_owned(),
        }
    }
}

/// A scripted [`TransportProvider`].
///
/// Answers are consumed in FIFO order, one per exchange; commands, acquires
/// and closes are recorded so tests can assert on the session's transport
/// discipline.
#[derive(Clone, Debug, Default)]
pub struct MockDevice {
    shared: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw answer.
    pub fn push_answer(&self, status: u16, data: Vec<u8>) {
        self.state().answers.push_back(Ok(ApduAnswer { data, status }));
    }

    /// Queues a data-less status word, e.g. a user rejection.
    pub fn push_status(&self, status: u16) {
        self.push_answer(status, vec![]);
    }

    /// Queues a mid-exchange transport loss.
    pub fn push_transport_closed(&self, reason: &str) {
        self.state().answers.push_back(Err(TransportError::Closed(reason.to_owned())));
    }

    /// Queues a `GET_APP_CONFIGURATION` answer.
    pub fn push_app_configuration(&self, flags: u8, version: (u8, u8, u8)) {
        self.push_answer(sw::OK, vec![flags, version.0, version.1, version.2]);
    }

    /// Queues a `GET_PUBLIC_KEY` answer resolving to the given address.
    pub fn push_address(&self, address: &Address) {
        let mut data = vec![65];
        data.extend([0x04; 65]);
        data.push(40);
        data.extend(hex::encode(address.as_bytes()).into_bytes());
        self.push_answer(sw::OK, data);
    }

    /// Queues a signing answer with the given components.
    pub fn push_signature(&self, v: u8, r: [u8; 32], s: [u8; 32]) {
        let mut data = vec![v];
        data.extend(r);
        data.extend(s);
        self.push_answer(sw::OK, data);
    }

    /// Makes subsequent `acquire` calls fail with `Unavailable`.
    pub fn refuse_acquire(&self, refuse: bool) {
        self.state().refuse_acquire = refuse;
    }

    pub fn set_device_id(&self, id: impl Into<DeviceId>) {
        self.state().device_id = id.into();
    }

    /// Commands exchanged so far, in order.
    pub fn exchanges(&self) -> Vec<ApduCommand> {
        self.state().exchanges.clone()
    }

    /// Number of successful transport acquisitions.
    pub fn acquires(&self) -> usize {
        self.state().acquires
    }

    /// Number of transport releases.
    pub fn closes(&self) -> usize {
        self.state().closes
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.shared.lock().expect("mock device state poisoned")
    }
}

#[async_trait]
impl TransportProvider for MockDevice {
    type Transport = MockTransport;

    async fn acquire(&self) -> Result<Self::Transport, TransportError> {
        let mut state = self.state();
        if state.refuse_acquire {
            return Err(TransportError::Unavailable("mock device refused the connection".into()))
        }
        state.acquires += 1;
        Ok(MockTransport { shared: Arc::clone(&self.shared) })
    }
}

/// The handle side of [`MockDevice`].
#[derive(Debug)]
pub struct MockTransport {
    shared: Arc<Mutex<MockState>>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn exchange(&mut self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        let mut state = self.shared.lock().expect("mock device state poisoned");
        state.exchanges.push(command.clone());
        state
            .answers
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Closed("scripted answers exhausted".into())))
    }

    fn device_id(&self) -> DeviceId {
        self.shared.lock().expect("mock device state poisoned").device_id.clone()
    }

    async fn close(self) {
        self.shared.lock().expect("mock device state poisoned").closes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_exchanges_and_closes() {
        let mock = MockDevice::new();
        mock.push_answer(sw::OK, vec![1, 2, 3]);

        let mut transport = mock.acquire().await.unwrap();
        let answer = transport
            .exchange(&ApduCommand { ins: 0x06, p1: 0, p2: 0, data: vec![] })
            .await
            .unwrap();
        assert_eq!(answer.data, vec![1, 2, 3]);
        transport.close().await;

        assert_eq!(mock.acquires(), 1);
        assert_eq!(mock.closes(), 1);
        assert_eq!(mock.exchanges().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_script_reads_as_disconnect() {
        let mock = MockDevice::new();
        let mut transport = mock.acquire().await.unwrap();
        let err = transport
            .exchange(&ApduCommand { ins: 0x06, p1: 0, p2: 0, data: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed(_)));
    }

    #[tokio::test]
    async fn refusing_acquire() {
        let mock = MockDevice::new();
        mock.refuse_acquire(true);
        let err = mock.acquire().await.unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
    }
}
