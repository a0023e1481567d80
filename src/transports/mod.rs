//! JSON-RPC client implementations.

mod http;
pub use self::http::{ClientError, Http};

mod mock;
pub use mock::{MockError, MockResponse, MockRpc};
