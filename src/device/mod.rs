//! Device-facing layer: APDU framing, transport capability traits, the
//! Ethereum app client and disconnect eventing.

pub mod apdu;
pub mod eth;
pub mod events;
#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;
pub mod mock;
pub mod transport;
pub mod types;

pub use apdu::{ApduAnswer, ApduCommand};
pub use eth::Eth;
pub use events::{DisconnectEvents, DisconnectSubscription};
#[cfg(feature = "hid")]
pub use hid::{HidTransport, HidTransportProvider};
pub use mock::{MockDevice, MockTransport};
pub use transport::{DeviceId, Transport, TransportError, TransportProvider};
pub use types::{AppConfiguration, DerivationType, DeviceError};
