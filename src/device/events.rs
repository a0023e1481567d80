//! Disconnect notification for the provider layer.
//!
//! The transport layer reports a physical disconnect as a
//! [`TransportError::Closed`](super::transport::TransportError) failure of the
//! in-flight operation; the session funnels that into this registry, which
//! fires each subscriber exactly once per disconnect. Deduplication works by
//! arming a device identity when its transport is acquired and disarming it on
//! the first notification, so repeated failure reports for the same unplug
//! stay silent until the device is acquired again.

use super::transport::DeviceId;
use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, Mutex},
};

type Callback = Arc<dyn Fn(&DeviceId) + Send + Sync>;

/// Subscription registry for device disconnect events.
#[derive(Default)]
pub struct DisconnectEvents {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    armed: HashSet<DeviceId>,
    subscribers: Vec<(u64, Callback)>,
    next_id: u64,
}

impl DisconnectEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the device as connected; the next notification for it will fire.
    pub(crate) fn arm(&self, device: &DeviceId) {
        let mut inner = self.inner.lock().expect("disconnect registry poisoned");
        inner.armed.insert(device.clone());
    }

    /// Fires subscribers for the device, once per arm. Returns whether the
    /// notification was delivered.
    pub(crate) fn notify(&self, device: &DeviceId) -> bool {
        let subscribers = {
            let mut inner = self.inner.lock().expect("disconnect registry poisoned");
            if !inner.armed.remove(device) {
                return false
            }
            inner.subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect::<Vec<_>>()
        };

        for subscriber in subscribers {
            subscriber(device);
        }
        true
    }

    /// Registers a disconnect listener. Dropping the returned guard removes
    /// the listener deterministically.
    pub fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(&DeviceId) + Send + Sync + 'static,
    ) -> DisconnectSubscription {
        let id = {
            let mut inner = self.inner.lock().expect("disconnect registry poisoned");
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, Arc::new(callback)));
            id
        };

        DisconnectSubscription { events: Arc::clone(self), id }
    }
}

impl fmt::Debug for DisconnectEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().expect("disconnect registry poisoned");
        f.debug_struct("DisconnectEvents")
            .field("armed", &inner.armed)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Guard for a registered disconnect listener; unsubscribes on drop.
#[derive(Debug)]
pub struct DisconnectSubscription {
    events: Arc<DisconnectEvents>,
    id: u64,
}

impl DisconnectSubscription {
    /// Removes the listener now instead of at drop time.
    pub fn unsubscribe(self) {}
}

impl Drop for DisconnectSubscription {
    fn drop(&mut self) {
        let mut inner = self.events.inner.lock().expect("disconnect registry poisoned");
        inner.subscribers.retain(|(id, _)| *id != self.id);
    }
}
