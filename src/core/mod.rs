//! Authenticated transport layer.
//!
//! Data flows one way: the [`signer`] produces headers for a payload, the
//! [`transport`] executes the exchange, and for streaming responses the
//! [`stream`] demultiplexer turns raw bytes into events.

pub mod messages;
pub mod signer;
pub mod stream;
pub mod transport;

pub use signer::{Credentials, SignedHeaders, Tc3Signer};
pub use stream::{SseDemuxer, StreamEvent};
pub use transport::{EventStream, HttpTransport, RequestEnvelope};
