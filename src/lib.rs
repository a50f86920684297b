//! # chatrelay
//!
//! `chatrelay` is a channel-based publish/subscribe relay for chat
//! conversations. Browser clients and a backend conversation process each
//! hold a WebSocket connection to the broker, subscribe to the channel named
//! after their conversation, and exchange `message` frames through it.
//! Delivery is in-memory and ephemeral.
//!
//! ## Modules
//!
//! - `broker`: subscription index, frame dispatch and fan-out.
//! - `connection`: identities for live broker connections.
//! - `connector`: the client side: connect, subscribe with a bounded wait, publish.
//! - `conversation`: a connector owner that logs messages and answers them.
//! - `config`: settings loaded from file and environment.
//! - `transport`: the WebSocket server and the WebSocket client transport.
//! - `utils`: errors, logging and the diagnostics hook.

pub mod broker;
pub mod config;
pub mod connection;
pub mod connector;
pub mod conversation;
pub mod transport;
pub mod utils;
