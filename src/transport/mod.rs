//! The `transport` module moves frames over WebSockets.
//!
//! - `websocket`: the broker-side server. Accepts connections, registers
//!   them with the [`Broker`](crate::broker::Broker) and feeds it every text
//!   frame.
//! - `ws_client`: the client-side [`Transport`](crate::connector::Transport)
//!   used by connectors.

pub mod websocket;
pub mod ws_client;

pub use websocket::{serve, start_websocket_server};
pub use ws_client::WsTransport;

#[cfg(test)]
mod tests;
