//! The `connector` module is the client side of the relay.
//!
//! A [`Connector`] is bound to exactly one channel. It waits for its
//! connection to open, sends a `subscribe` frame for that channel and then
//! lets its owner publish and receive `message` frames. It talks to the
//! broker only through the wire protocol.

pub mod handshake;
pub mod pubsub_connector;
pub mod transport;

pub use handshake::{RetryPolicy, wait_for_open};
pub use pubsub_connector::{Connector, HandshakeState};
pub use transport::{ReadyState, Transport};

#[cfg(test)]
pub(crate) mod testing;
